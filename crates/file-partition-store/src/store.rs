//! Partitioned blob storage on the filesystem
//!
//! Layout: one directory per partition under the store root, named by the
//! sha256 of the partition scope and holding a `partition.json` manifest
//! that records the scope. Each entry is a payload file plus a JSON
//! metadata sidecar, both named by the sha256 of the entry's path-level
//! key (query and fragment stripped).

use crate::error::{Result, StoreError};
use crate::types::{CacheEntry, EntryMeta, MatchOptions};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

const MANIFEST_FILE: &str = "partition.json";
const PAYLOAD_EXT: &str = "bin";
const META_EXT: &str = "json";

#[derive(Debug, Serialize, Deserialize)]
struct PartitionManifest {
    scope: String,
}

/// Store of named partitions sharing one byte capacity.
///
/// Cheap to clone; clones share the same accounting.
#[derive(Debug, Clone)]
pub struct FsPartitionStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    root: PathBuf,
    capacity: u64,
    /// Payload bytes per partition, keyed by scope.
    sizes: Mutex<HashMap<String, u64>>,
}

fn hash_name(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Reduce a key to its path-level form: query and fragment stripped.
fn path_level(key: &str) -> String {
    match Url::parse(key) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.into()
        }
        Err(_) => {
            let end = key.find(['?', '#']).unwrap_or(key.len());
            key[..end].to_string()
        }
    }
}

async fn scan_payload_bytes(dir: &Path) -> Result<u64> {
    let mut total = 0;
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(PAYLOAD_EXT) {
            total += entry.metadata().await?.len();
        }
    }
    Ok(total)
}

impl FsPartitionStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    /// Existing partitions are scanned back into the size accounting.
    pub async fn open(root: PathBuf, capacity: u64) -> Result<Self> {
        fs::create_dir_all(&root).await?;
        let mut sizes = HashMap::new();
        let mut dirs = fs::read_dir(&root).await?;
        while let Some(dir) = dirs.next_entry().await? {
            if !dir.file_type().await?.is_dir() {
                continue;
            }
            let manifest_path = dir.path().join(MANIFEST_FILE);
            let manifest: PartitionManifest = match fs::read(&manifest_path).await {
                Ok(bytes) => serde_json::from_slice(&bytes)?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!(dir = ?dir.path(), "partition directory without manifest, skipping");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let size = scan_payload_bytes(&dir.path()).await?;
            sizes.insert(manifest.scope, size);
        }
        info!(root = ?root, partitions = sizes.len(), "partition store opened");
        Ok(Self {
            inner: Arc::new(StoreInner {
                root,
                capacity,
                sizes: Mutex::new(sizes),
            }),
        })
    }

    /// Open or create the partition for `scope`.
    pub async fn partition(&self, scope: &str) -> Result<Partition> {
        let dir = self.inner.root.join(hash_name(scope));
        fs::create_dir_all(&dir).await?;
        let manifest_path = dir.join(MANIFEST_FILE);
        // First open writes the manifest so the scope survives restarts.
        if fs::metadata(&manifest_path).await.is_err() {
            let manifest = PartitionManifest {
                scope: scope.to_string(),
            };
            fs::write(&manifest_path, serde_json::to_vec(&manifest)?).await?;
            self.inner
                .sizes
                .lock()
                .await
                .entry(scope.to_string())
                .or_insert(0);
            debug!(scope = %scope, "partition created");
        }
        Ok(Partition {
            scope: scope.to_string(),
            dir,
            store: self.clone(),
        })
    }

    /// Delete a partition and everything in it. Returns whether it existed.
    ///
    /// This is the bulk-eviction hook for whatever owns cache policy; the
    /// cache core itself never calls it.
    pub async fn delete_partition(&self, scope: &str) -> Result<bool> {
        let dir = self.inner.root.join(hash_name(scope));
        let existed = match fs::remove_dir_all(&dir).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        self.inner.sizes.lock().await.remove(scope);
        if existed {
            info!(scope = %scope, "partition deleted");
        }
        Ok(existed)
    }

    /// Total payload bytes across all partitions.
    pub async fn total_bytes(&self) -> u64 {
        self.inner.sizes.lock().await.values().sum()
    }

    pub fn capacity(&self) -> u64 {
        self.inner.capacity
    }
}

/// Handle to one named partition. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Partition {
    scope: String,
    dir: PathBuf,
    store: FsPartitionStore,
}

impl Partition {
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Store an entry under its path-level key.
    ///
    /// Replacing an existing key credits the old payload size before the
    /// capacity check. Nothing is written when the write would pass the
    /// store capacity.
    pub async fn put(&self, entry: &CacheEntry) -> Result<()> {
        let stem = hash_name(&path_level(&entry.key));
        let payload_path = self.dir.join(format!("{stem}.{PAYLOAD_EXT}"));
        let meta_path = self.dir.join(format!("{stem}.{META_EXT}"));
        let new_size = entry.payload.len() as u64;

        let mut sizes = self.store.inner.sizes.lock().await;
        let old_size = match fs::metadata(&payload_path).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };
        let total: u64 = sizes.values().sum();
        let projected = total.saturating_sub(old_size) + new_size;
        if projected > self.store.inner.capacity {
            return Err(StoreError::QuotaExceeded {
                scope: self.scope.clone(),
                needed: new_size,
                capacity: self.store.inner.capacity,
            });
        }

        let meta = EntryMeta {
            key: entry.key.clone(),
            headers: entry.headers.clone(),
            put_date: entry.put_date,
            last_viewed_date: entry.last_viewed_date,
            content_length: entry.content_length,
            payload_size: new_size,
        };
        fs::write(&payload_path, &entry.payload).await?;
        fs::write(&meta_path, serde_json::to_vec(&meta)?).await?;

        let partition_size = sizes.entry(self.scope.clone()).or_insert(0);
        *partition_size = partition_size.saturating_sub(old_size) + new_size;
        debug!(scope = %self.scope, key = %entry.key, size = new_size, "entry stored");
        Ok(())
    }

    /// Look up an entry by key. `None` on a clean miss.
    pub async fn match_entry(&self, key: &str, options: MatchOptions) -> Result<Option<CacheEntry>> {
        let stem = hash_name(&path_level(key));
        let meta_path = self.dir.join(format!("{stem}.{META_EXT}"));
        let meta_bytes = match fs::read(&meta_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta: EntryMeta = serde_json::from_slice(&meta_bytes)?;
        if !options.ignore_search && meta.key != key {
            return Ok(None);
        }
        if !options.ignore_vary
            && meta.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("vary"))
        {
            // Stored entries carry no request-header context to satisfy Vary.
            return Ok(None);
        }
        let payload_path = self.dir.join(format!("{stem}.{PAYLOAD_EXT}"));
        let payload = fs::read(&payload_path).await?;
        debug!(scope = %self.scope, key = %key, size = payload.len(), "entry matched");
        Ok(Some(CacheEntry {
            key: meta.key,
            payload,
            headers: meta.headers,
            put_date: meta.put_date,
            last_viewed_date: meta.last_viewed_date,
            content_length: meta.content_length,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn entry(key: &str, payload: &[u8]) -> CacheEntry {
        CacheEntry {
            key: key.to_string(),
            payload: payload.to_vec(),
            headers: vec![("Content-Type".to_string(), "application/dicom".to_string())],
            put_date: Utc::now(),
            last_viewed_date: None,
            content_length: Some(payload.len() as u64),
        }
    }

    fn loose() -> MatchOptions {
        MatchOptions {
            ignore_search: true,
            ignore_method: true,
            ignore_vary: true,
        }
    }

    #[test]
    fn test_path_level_strips_query_and_fragment() {
        assert_eq!(
            path_level("https://pacs.example.org/series/1/i/2?frame=1#x"),
            "https://pacs.example.org/series/1/i/2"
        );
    }

    #[test]
    fn test_path_level_handles_non_url_identifiers() {
        assert_eq!(path_level("local/series/1/i/2?x=1"), "local/series/1/i/2");
        assert_eq!(path_level("local/series/1/i/2"), "local/series/1/i/2");
    }

    #[test]
    fn test_hash_name_is_stable_hex() {
        let a = hash_name("scope-a");
        assert_eq!(a, hash_name("scope-a"));
        assert_ne!(a, hash_name("scope-b"));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_put_and_match_round_trip() {
        let dir = tempdir().unwrap();
        let store = FsPartitionStore::open(dir.path().to_path_buf(), 1024 * 1024)
            .await
            .unwrap();
        let partition = store.partition("pacs/series/1.2").await.unwrap();

        let stored = entry("https://pacs.example.org/series/1.2/i/3", b"pixel data");
        partition.put(&stored).await.unwrap();

        let found = partition
            .match_entry("https://pacs.example.org/series/1.2/i/3", loose())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.payload, b"pixel data");
        assert_eq!(found.header("content-type"), Some("application/dicom"));
        assert_eq!(found.content_length, Some(10));
        assert!(found.last_viewed_date.is_none());
    }

    #[tokio::test]
    async fn test_match_miss_returns_none() {
        let dir = tempdir().unwrap();
        let store = FsPartitionStore::open(dir.path().to_path_buf(), 1024)
            .await
            .unwrap();
        let partition = store.partition("pacs/series/1.2").await.unwrap();

        let found = partition
            .match_entry("https://pacs.example.org/series/1.2/i/9", loose())
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_match_ignores_query_when_asked() {
        let dir = tempdir().unwrap();
        let store = FsPartitionStore::open(dir.path().to_path_buf(), 1024)
            .await
            .unwrap();
        let partition = store.partition("pacs/series/1.2").await.unwrap();

        partition
            .put(&entry("https://pacs.example.org/series/1.2/i/3?accept=a", b"x"))
            .await
            .unwrap();

        // Same path, different query.
        let found = partition
            .match_entry("https://pacs.example.org/series/1.2/i/3?accept=b", loose())
            .await
            .unwrap();
        assert!(found.is_some());

        // Strict matching requires the exact stored key.
        let strict = partition
            .match_entry(
                "https://pacs.example.org/series/1.2/i/3?accept=b",
                MatchOptions::default(),
            )
            .await
            .unwrap();
        assert!(strict.is_none());

        let exact = partition
            .match_entry(
                "https://pacs.example.org/series/1.2/i/3?accept=a",
                MatchOptions::default(),
            )
            .await
            .unwrap();
        assert!(exact.is_some());
    }

    #[tokio::test]
    async fn test_vary_header_blocks_strict_match() {
        let dir = tempdir().unwrap();
        let store = FsPartitionStore::open(dir.path().to_path_buf(), 1024)
            .await
            .unwrap();
        let partition = store.partition("pacs/series/1.2").await.unwrap();

        let mut varied = entry("https://pacs.example.org/series/1.2/i/3", b"x");
        varied
            .headers
            .push(("Vary".to_string(), "Accept".to_string()));
        partition.put(&varied).await.unwrap();

        let strict = partition
            .match_entry(
                "https://pacs.example.org/series/1.2/i/3",
                MatchOptions::default(),
            )
            .await
            .unwrap();
        assert!(strict.is_none());

        let found = partition
            .match_entry("https://pacs.example.org/series/1.2/i/3", loose())
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_put_over_capacity_is_refused_and_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = FsPartitionStore::open(dir.path().to_path_buf(), 8)
            .await
            .unwrap();
        let partition = store.partition("pacs/series/1.2").await.unwrap();

        let err = partition
            .put(&entry("https://pacs.example.org/series/1.2/i/3", b"way too large"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { .. }));

        let found = partition
            .match_entry("https://pacs.example.org/series/1.2/i/3", loose())
            .await
            .unwrap();
        assert!(found.is_none());
        assert_eq!(store.total_bytes().await, 0);
    }

    #[tokio::test]
    async fn test_replace_credits_old_size() {
        let dir = tempdir().unwrap();
        let store = FsPartitionStore::open(dir.path().to_path_buf(), 10)
            .await
            .unwrap();
        let partition = store.partition("pacs/series/1.2").await.unwrap();
        let key = "https://pacs.example.org/series/1.2/i/3";

        partition.put(&entry(key, b"12345678")).await.unwrap();
        // 9 bytes would not fit next to the old 8, but replaces them.
        partition.put(&entry(key, b"123456789")).await.unwrap();

        assert_eq!(store.total_bytes().await, 9);
        let found = partition.match_entry(key, loose()).await.unwrap().unwrap();
        assert_eq!(found.payload, b"123456789");
    }

    #[tokio::test]
    async fn test_capacity_is_shared_across_partitions() {
        let dir = tempdir().unwrap();
        let store = FsPartitionStore::open(dir.path().to_path_buf(), 10)
            .await
            .unwrap();

        let first = store.partition("pacs/series/1").await.unwrap();
        first
            .put(&entry("https://pacs.example.org/series/1/i/1", b"123456"))
            .await
            .unwrap();

        let second = store.partition("pacs/series/2").await.unwrap();
        let err = second
            .put(&entry("https://pacs.example.org/series/2/i/1", b"123456"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { .. }));
    }

    #[tokio::test]
    async fn test_delete_partition_frees_capacity() {
        let dir = tempdir().unwrap();
        let store = FsPartitionStore::open(dir.path().to_path_buf(), 10)
            .await
            .unwrap();

        let partition = store.partition("pacs/series/1").await.unwrap();
        partition
            .put(&entry("https://pacs.example.org/series/1/i/1", b"123456"))
            .await
            .unwrap();

        assert!(store.delete_partition("pacs/series/1").await.unwrap());
        assert!(!store.delete_partition("pacs/series/1").await.unwrap());
        assert_eq!(store.total_bytes().await, 0);

        // Freed space can be used by another partition.
        let other = store.partition("pacs/series/2").await.unwrap();
        other
            .put(&entry("https://pacs.example.org/series/2/i/1", b"123456"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reopen_rescans_existing_partitions() {
        let dir = tempdir().unwrap();
        {
            let store = FsPartitionStore::open(dir.path().to_path_buf(), 1024)
                .await
                .unwrap();
            let partition = store.partition("pacs/series/1").await.unwrap();
            partition
                .put(&entry("https://pacs.example.org/series/1/i/1", b"123456"))
                .await
                .unwrap();
        }

        let reopened = FsPartitionStore::open(dir.path().to_path_buf(), 1024)
            .await
            .unwrap();
        assert_eq!(reopened.total_bytes().await, 6);

        let partition = reopened.partition("pacs/series/1").await.unwrap();
        let found = partition
            .match_entry("https://pacs.example.org/series/1/i/1", loose())
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_partition_scope_accessor() {
        let dir = tempdir().unwrap();
        let store = FsPartitionStore::open(dir.path().to_path_buf(), 1024)
            .await
            .unwrap();
        let partition = store.partition("pacs/series/1").await.unwrap();
        assert_eq!(partition.scope(), "pacs/series/1");
        assert_eq!(store.capacity(), 1024);
    }
}
