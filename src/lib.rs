//! Depot - artifact repository storage core
//!
//! Store registry and group resolution, repository filters, merged group
//! metadata, content promotion between stores, and content tracking.

pub mod cli;
pub mod clock;
pub mod config;
pub mod content;
pub mod error;
pub mod filter;
pub mod promote;
pub mod store;
pub mod tracking;

pub use error::{DepotError, DepotResult};
