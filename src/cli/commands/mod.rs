//! CLI command implementations

pub mod config;
pub mod group;
pub mod members;
pub mod merge;
pub mod promote;
pub mod track;

pub use config::execute as config;
pub use group::execute as group;
pub use members::execute as members;
pub use merge::execute as merge;
pub use promote::{promote, resume, rollback};
pub use track::execute as track;
