//! Scoped write-through/read-through caching for imaging series responses
//!
//! Responses are cached in partitions derived from their URL, one per
//! series, so that related resources can be evicted together with a single
//! partition delete. Per-scope byte usage is accumulated in memory and
//! flushed to a durable index on a debounce timer, off the read and write
//! paths. Store overflow is reported through events carrying enough
//! context to retry; deciding what to evict is the subscriber's job, never
//! this crate's.

mod error;
mod events;
mod headers;
mod layer;
mod pool;
mod read;
mod scope;
mod types;
mod write;

pub use error::{CacheError, Result};
pub use events::{
    CacheEvent, EventSender, IndexHeadroomReleased, IndexWriteFailure, WriteQuotaExceeded,
};
pub use headers::parse_raw_headers;
pub use layer::CacheLayer;
pub use pool::{UsagePool, UsageSnapshot, DEFAULT_FLUSH_QUIET};
pub use read::CacheReadProxy;
pub use scope::{resolve_scope, DEFAULT_SCOPE};
pub use types::{CacheConfig, CacheOptions, FetchedResponse};
pub use write::CacheWriteProxy;

pub use file_partition_store::{CacheEntry, FsPartitionStore, MatchOptions, Partition, StoreError};
pub use scope_usage_index::{FsUsageIndex, UsageRecord};
