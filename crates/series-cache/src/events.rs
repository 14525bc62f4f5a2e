//! Recoverable-error events emitted by the cache
//!
//! Events are delivered over an mpsc channel, fire-and-forget. Payloads
//! carry the context a subscriber needs to decide on recovery and to
//! re-enter the failed operation ([`CacheWriteProxy::retry`] for writes,
//! [`UsagePool::retry_flush`] for flushes); they never carry callables.
//!
//! [`CacheWriteProxy::retry`]: crate::CacheWriteProxy::retry
//! [`UsagePool::retry_flush`]: crate::UsagePool::retry_flush

use crate::pool::UsageSnapshot;
use crate::types::FetchedResponse;
use file_partition_store::Partition;
use tokio::sync::mpsc;

/// Sender half used by the cache to publish events.
pub type EventSender = mpsc::Sender<CacheEvent>;

/// A write was refused because the partition store is full.
#[derive(Debug, Clone)]
pub struct WriteQuotaExceeded {
    pub scope: String,
    pub partition: Partition,
    /// The response that could not be cached, kept whole for the retry.
    pub response: FetchedResponse,
}

/// The index headroom reservation was released to keep the usage index
/// writable on a full device.
#[derive(Debug, Clone)]
pub struct IndexHeadroomReleased {
    pub scope: String,
    pub message: String,
}

/// A flush batch failed to persist. `snapshot` is the already-reduced
/// batch to hand back for a retry; the live pool has long been cleared
/// and is never consulted again for this batch.
#[derive(Debug, Clone)]
pub struct IndexWriteFailure {
    pub message: String,
    pub failed_scopes: Vec<String>,
    pub snapshot: UsageSnapshot,
}

/// Recoverable cache errors, published to whoever owns recovery policy.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    WriteQuotaExceeded(WriteQuotaExceeded),
    IndexHeadroomReleased(IndexHeadroomReleased),
    IndexWriteFailure(IndexWriteFailure),
}

impl CacheEvent {
    /// Wire name for subscribers bridging to a string-keyed notifier.
    pub fn name(&self) -> &'static str {
        match self {
            CacheEvent::WriteQuotaExceeded(_) => "quota-exceeded-on-write",
            CacheEvent::IndexHeadroomReleased(_) => "quota-exceeded-on-index-write-dummy",
            CacheEvent::IndexWriteFailure(_) => "index-write-failure",
        }
    }
}
