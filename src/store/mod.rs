//! Store model and membership
//!
//! Stores come in three flavors: hosted (writable), remote (proxy of an
//! upstream origin) and group (ordered aggregation of other stores).

pub mod artifact;
pub mod group;
pub mod key;
pub mod registry;

pub use artifact::{ArtifactStore, StoreKind};
pub use group::GroupResolver;
pub use key::{StoreKey, StoreType, DEFAULT_PACKAGE_TYPE};
pub use registry::{MemoryStoreRegistry, StoreRegistry};
