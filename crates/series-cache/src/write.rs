//! Write-through path
//!
//! Stores fetched responses into their scope partition and feeds the usage
//! pool. Failures never abort the caller's fetch flow; quota refusals
//! surface as events carrying everything a subscriber needs to retry once
//! space has been freed.

use crate::error::Result;
use crate::events::{CacheEvent, EventSender, WriteQuotaExceeded};
use crate::headers::parse_raw_headers;
use crate::pool::UsagePool;
use crate::scope::resolve_scope;
use crate::types::FetchedResponse;
use chrono::Utc;
use file_partition_store::{CacheEntry, FsPartitionStore, StoreError};
use tracing::{debug, error, warn};

/// Write-through proxy for fetched responses.
#[derive(Clone)]
pub struct CacheWriteProxy {
    store: Option<FsPartitionStore>,
    pool: UsagePool,
    event_tx: EventSender,
}

impl CacheWriteProxy {
    /// `store: None` yields a proxy that silently drops every write.
    pub fn new(store: Option<FsPartitionStore>, pool: UsagePool, event_tx: EventSender) -> Self {
        Self {
            store,
            pool,
            event_tx,
        }
    }

    /// Store a response in its scope partition and record its size.
    ///
    /// The returned error is advisory: the fetch path that produced
    /// `response` is expected to carry on regardless.
    pub async fn store_response(&self, response: &FetchedResponse) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let scope = resolve_scope(&response.url);
        self.store_in_scope(store, &scope, response).await
    }

    /// Re-enter a write that was refused for lack of space.
    ///
    /// Restarts from the open-partition step; the size delta is recorded
    /// only if this attempt commits, so a successful retry counts the
    /// write exactly once.
    pub async fn retry(&self, failed: &WriteQuotaExceeded) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        self.store_in_scope(store, &failed.scope, &failed.response).await
    }

    async fn store_in_scope(
        &self,
        store: &FsPartitionStore,
        scope: &str,
        response: &FetchedResponse,
    ) -> Result<()> {
        let partition = match store.partition(scope).await {
            Ok(partition) => partition,
            Err(e) => {
                error!(scope = %scope, error = %e, "failed to open partition");
                return Err(e.into());
            }
        };
        let entry = CacheEntry {
            key: response.url.clone(),
            payload: response.body.clone(),
            headers: parse_raw_headers(&response.raw_headers),
            put_date: Utc::now(),
            last_viewed_date: None,
            content_length: Some(response.body.len() as u64),
        };
        match partition.put(&entry).await {
            Ok(()) => {
                self.pool.add(scope, response.body.len() as i64).await;
                debug!(scope = %scope, url = %response.url, size = response.body.len(), "response cached");
                Ok(())
            }
            Err(e @ StoreError::QuotaExceeded { .. }) => {
                warn!(scope = %scope, url = %response.url, "partition store full, write refused");
                let _ = self
                    .event_tx
                    .send(CacheEvent::WriteQuotaExceeded(WriteQuotaExceeded {
                        scope: scope.to_string(),
                        partition,
                        response: response.clone(),
                    }))
                    .await;
                Err(e.into())
            }
            Err(e) => {
                error!(scope = %scope, url = %response.url, error = %e, "cache write failed");
                Err(e.into())
            }
        }
    }
}
