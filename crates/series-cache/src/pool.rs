//! Debounced per-scope usage accounting
//!
//! Mutations append signed byte deltas to an in-memory map and re-arm a
//! single flush deadline; once the quiet interval elapses after the most
//! recent mutation, the pending map is snapshotted and cleared under the
//! lock, reduced to per-scope sums and persisted to the usage index.
//! Mutations arriving during an in-flight flush start a fresh
//! accumulation. Because each scope's net delta is a sum, interleaving
//! order never changes the persisted value.

use crate::error::Result;
use crate::events::{CacheEvent, EventSender, IndexHeadroomReleased, IndexWriteFailure};
use chrono::Utc;
use scope_usage_index::{FsUsageIndex, UsageRecord};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, error};

/// Reduced form of one flush batch: net byte delta per scope.
pub type UsageSnapshot = HashMap<String, i64>;

/// Default quiet interval between the last mutation and the flush.
pub const DEFAULT_FLUSH_QUIET: Duration = Duration::from_millis(100);

/// Debounced accumulator of per-scope byte deltas.
///
/// Cheap to clone; clones share the pending map and scheduler.
#[derive(Clone)]
pub struct UsagePool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    pending: Mutex<PendingDeltas>,
    wakeup: Notify,
    index: FsUsageIndex,
    event_tx: EventSender,
    quiet: Duration,
}

#[derive(Default)]
struct PendingDeltas {
    deltas: HashMap<String, Vec<i64>>,
    deadline: Option<Instant>,
}

impl UsagePool {
    /// Create a pool and spawn its flush scheduler.
    pub fn spawn(index: FsUsageIndex, event_tx: EventSender, quiet: Duration) -> Self {
        let inner = Arc::new(PoolInner {
            pending: Mutex::new(PendingDeltas::default()),
            wakeup: Notify::new(),
            index,
            event_tx,
            quiet,
        });
        tokio::spawn(run_scheduler(inner.clone()));
        Self { inner }
    }

    /// Record `delta` bytes for `scope` and re-arm the flush deadline.
    pub async fn add(&self, scope: &str, delta: i64) {
        let mut pending = self.inner.pending.lock().await;
        pending
            .deltas
            .entry(scope.to_string())
            .or_default()
            .push(delta);
        pending.deadline = Some(Instant::now() + self.inner.quiet);
        drop(pending);
        self.inner.wakeup.notify_one();
    }

    /// Record the removal of `bytes` from `scope`.
    pub async fn remove(&self, scope: &str, bytes: i64) {
        self.add(scope, -bytes).await;
    }

    /// Re-run persistence for a snapshot whose flush previously failed.
    ///
    /// The whole batch is re-applied, not only its failed scopes, matching
    /// the flush itself; the live pending map is never consulted. Another
    /// failure emits a fresh [`CacheEvent::IndexWriteFailure`].
    pub async fn retry_flush(&self, snapshot: UsageSnapshot) -> Result<()> {
        self.inner.persist(snapshot).await
    }
}

async fn run_scheduler(inner: Arc<PoolInner>) {
    loop {
        let deadline = inner.pending.lock().await.deadline;
        match deadline {
            None => inner.wakeup.notified().await,
            Some(deadline) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => {
                        let snapshot = inner.take_snapshot().await;
                        if !snapshot.is_empty() {
                            let _ = inner.persist(snapshot).await;
                        }
                    }
                    // A mutation moved the deadline; pick it up.
                    _ = inner.wakeup.notified() => {}
                }
            }
        }
    }
}

impl PoolInner {
    /// Snapshot and clear the live pending map, reduced to per-scope sums.
    /// Runs entirely under the lock, so no mutation is split across
    /// batches.
    async fn take_snapshot(&self) -> UsageSnapshot {
        let mut pending = self.pending.lock().await;
        pending.deadline = None;
        let deltas = std::mem::take(&mut pending.deltas);
        drop(pending);
        deltas
            .into_iter()
            .map(|(scope, deltas)| (scope, deltas.into_iter().sum()))
            .collect()
    }

    async fn persist(&self, snapshot: UsageSnapshot) -> Result<()> {
        let mut failed_scopes = Vec::new();
        let mut first_error = None;
        for (scope, delta) in &snapshot {
            match self.persist_scope(scope, *delta).await {
                Ok(()) => {}
                Err(e) => {
                    error!(scope = %scope, error = %e, "usage record write failed");
                    if e.is_out_of_space() && self.index.release_headroom().await {
                        let _ = self
                            .event_tx
                            .send(CacheEvent::IndexHeadroomReleased(IndexHeadroomReleased {
                                scope: scope.clone(),
                                message: e.to_string(),
                            }))
                            .await;
                    }
                    failed_scopes.push(scope.clone());
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        match first_error {
            None => {
                debug!(scopes = snapshot.len(), "usage snapshot flushed");
                Ok(())
            }
            Some(e) => {
                let _ = self
                    .event_tx
                    .send(CacheEvent::IndexWriteFailure(IndexWriteFailure {
                        message: e.to_string(),
                        failed_scopes,
                        snapshot,
                    }))
                    .await;
                Err(e.into())
            }
        }
    }

    async fn persist_scope(&self, scope: &str, delta: i64) -> scope_usage_index::Result<()> {
        let mut record = self
            .index
            .get(scope)
            .await?
            .unwrap_or_else(|| UsageRecord::new(scope));
        record.byte_estimate += delta;
        record.last_access = Utc::now();
        self.index.set(scope, &record).await
    }
}
