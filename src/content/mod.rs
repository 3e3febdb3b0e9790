//! Content storage
//!
//! Backends implement [`ContentStorage`]; everything above this module
//! (promotion, merged content, tracking reports) depends only on the trait.

pub mod digest;
pub mod filesystem;
pub mod memory;
pub mod merge;
pub mod storage;

pub use digest::ContentDigest;
pub use filesystem::FileStorage;
pub use memory::{FaultOp, MemoryStorage};
pub use merge::{ContentMerger, GroupMergeHelper, ListingMerger, MD5_SUFFIX, MERGEINFO_SUFFIX, SHA_SUFFIX};
pub use storage::{normalize_path, ContentStorage, ContentStream, Transfer};
