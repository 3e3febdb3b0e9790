//! Content promotion
//!
//! Moves artifact sets between stores with dry run, resume and rollback, and
//! promotes whole stores into group membership.

pub mod group;
pub mod manager;
pub mod model;

pub use manager::PromotionManager;
pub use model::{GroupPromoteRequest, GroupPromoteResult, PromoteRequest, PromoteResult};
