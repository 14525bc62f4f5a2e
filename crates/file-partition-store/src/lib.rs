//! File-based partitioned blob store
//!
//! Stores binary cache entries in named partitions on disk so that every
//! entry belonging to one partition can be deleted in a single operation.
//! The store enforces a byte capacity and refuses writes that would exceed
//! it; it never evicts on its own.

mod error;
mod store;
mod types;

pub use error::{Result, StoreError};
pub use store::{FsPartitionStore, Partition};
pub use types::{CacheEntry, MatchOptions};
