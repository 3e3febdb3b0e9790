//! Content tracking
//!
//! Attributes every fetch and store to a tracking key so a session's content
//! can be reported on later.

pub mod cache;
pub mod listener;
pub mod model;
pub mod persist;
pub mod report;
pub mod sweep;

pub use cache::TrackingCache;
pub use listener::TrackingListener;
pub use model::{
    AffectedStoreRecord, StoreEffect, TrackedContentEntry, TrackedContentRecord, TrackingKey, TrackingReport,
};
pub use persist::{FileRecordPersistence, RecordPersistence};
pub use report::TrackingReporter;
pub use sweep::{spawn_sweeper, SweeperHandle};
