//! Read-through path
//!
//! Serves cached responses and refreshes their access metadata without
//! making the caller wait for the refresh.

use crate::scope::resolve_scope;
use chrono::Utc;
use file_partition_store::{CacheEntry, FsPartitionStore, MatchOptions};
use tracing::{debug, error, warn};

/// Series resources are immutable per URL path, so lookups ignore header
/// variance, method and query-string differences.
const LOOKUP_OPTIONS: MatchOptions = MatchOptions {
    ignore_search: true,
    ignore_method: true,
    ignore_vary: true,
};

/// Read-through proxy over the partition store.
#[derive(Clone)]
pub struct CacheReadProxy {
    store: Option<FsPartitionStore>,
}

impl CacheReadProxy {
    /// `store: None` yields a proxy that reports every lookup as a miss.
    pub fn new(store: Option<FsPartitionStore>) -> Self {
        Self { store }
    }

    /// Look up a resource, returning the stored entry on a hit.
    ///
    /// Misses and failures both come back as `None`; only failures are
    /// logged. A hit schedules a best-effort refresh of the entry's
    /// last-viewed date which the caller never waits for.
    pub async fn lookup(&self, url: &str) -> Option<CacheEntry> {
        let store = self.store.as_ref()?;
        let scope = resolve_scope(url);
        let entry = match find(store, &scope, url).await {
            Ok(found) => found?,
            Err(e) => {
                error!(scope = %scope, url = %url, error = %e, "cache lookup failed");
                return None;
            }
        };
        debug!(scope = %scope, url = %url, size = entry.payload.len(), "cache hit");
        spawn_refresh(store.clone(), scope, entry.clone());
        Some(entry)
    }
}

async fn find(
    store: &FsPartitionStore,
    scope: &str,
    url: &str,
) -> file_partition_store::Result<Option<CacheEntry>> {
    let partition = store.partition(scope).await?;
    partition.match_entry(url, LOOKUP_OPTIONS).await
}

/// Re-store the entry with a fresh last-viewed date. A failure here only
/// loses the metadata refresh, never the already-served read.
fn spawn_refresh(store: FsPartitionStore, scope: String, mut entry: CacheEntry) {
    tokio::spawn(async move {
        entry.last_viewed_date = Some(Utc::now());
        let result = async { store.partition(&scope).await?.put(&entry).await }.await;
        if let Err(e) = result {
            warn!(scope = %scope, key = %entry.key, error = %e, "last-viewed refresh failed");
        }
    });
}
