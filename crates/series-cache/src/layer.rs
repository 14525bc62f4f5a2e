//! Cache layer assembly
//!
//! Owns the store, the usage pool and both proxies, and gates them on the
//! configured options. One instance per hosting process; nothing here is
//! global.

use crate::error::Result;
use crate::events::EventSender;
use crate::pool::UsagePool;
use crate::read::CacheReadProxy;
use crate::types::{CacheConfig, CacheOptions, FetchedResponse};
use crate::write::CacheWriteProxy;
use file_partition_store::{CacheEntry, FsPartitionStore};
use scope_usage_index::FsUsageIndex;
use tracing::{info, warn};

/// Assembled caching layer: read/write proxies sharing one store, one
/// usage pool and one event channel.
pub struct CacheLayer {
    options: CacheOptions,
    read: CacheReadProxy,
    write: CacheWriteProxy,
    pool: UsagePool,
}

impl CacheLayer {
    /// Build the layer from configuration.
    ///
    /// A store that cannot be opened degrades the layer to an always-miss,
    /// no-op-write passthrough instead of failing: the cache is an
    /// optimization, never a prerequisite. An index that cannot be
    /// initialized leaves flushes failing recoverably through events.
    pub async fn open(config: CacheConfig, event_tx: EventSender) -> Self {
        let store =
            match FsPartitionStore::open(config.cache_dir.clone(), config.max_store_bytes).await {
                Ok(store) => Some(store),
                Err(e) => {
                    warn!(dir = ?config.cache_dir, error = %e, "partition store unavailable, caching disabled");
                    None
                }
            };
        let index = FsUsageIndex::new(config.index_dir.clone());
        if let Err(e) = index.init().await {
            warn!(dir = ?config.index_dir, error = %e, "usage index init failed, flushes will surface as events");
        }
        let pool = UsagePool::spawn(index, event_tx.clone(), config.flush_quiet);
        let read = CacheReadProxy::new(store.clone());
        let write = CacheWriteProxy::new(store, pool.clone(), event_tx);
        info!(
            read_cache = config.options.read_cache,
            write_cache = config.options.write_cache,
            "cache layer ready"
        );
        Self {
            options: config.options,
            read,
            write,
            pool,
        }
    }

    /// Read-through lookup. `None` when the read path is disabled, the
    /// store is unavailable or the resource is not cached.
    pub async fn read(&self, url: &str) -> Option<CacheEntry> {
        if !self.options.read_cache {
            return None;
        }
        self.read.lookup(url).await
    }

    /// Write-through store. A no-op when the write path is disabled.
    pub async fn write(&self, response: &FetchedResponse) -> Result<()> {
        if !self.options.write_cache {
            return Ok(());
        }
        self.write.store_response(response).await
    }

    /// The usage pool shared by this layer, for subscribers that evict
    /// entries and need to report the freed bytes.
    pub fn pool(&self) -> &UsagePool {
        &self.pool
    }

    /// The write proxy, for subscribers retrying a refused write.
    pub fn write_proxy(&self) -> &CacheWriteProxy {
        &self.write
    }
}
