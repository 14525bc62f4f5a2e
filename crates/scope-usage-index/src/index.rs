//! File-backed usage index
//!
//! One JSON document per scope, named by the sha256 of the scope so any
//! scope string maps to a filesystem-safe name.

use crate::error::Result;
use crate::types::UsageRecord;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, warn};

/// Size of the headroom reservation written at init.
pub const HEADROOM_BYTES: usize = 5 * 1024 * 1024;

const HEADROOM_FILE: &str = "headroom.bin";

/// Durable scope to [`UsageRecord`] store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct FsUsageIndex {
    dir: PathBuf,
}

impl FsUsageIndex {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Create the index directory and the headroom reservation.
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let headroom = self.dir.join(HEADROOM_FILE);
        if fs::metadata(&headroom).await.is_err() {
            fs::write(&headroom, vec![0u8; HEADROOM_BYTES]).await?;
        }
        info!(dir = ?self.dir, "usage index initialized");
        Ok(())
    }

    fn record_path(&self, scope: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(scope.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(hasher.finalize())))
    }

    pub async fn get(&self, scope: &str) -> Result<Option<UsageRecord>> {
        match fs::read(self.record_path(scope)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn set(&self, scope: &str, record: &UsageRecord) -> Result<()> {
        fs::write(self.record_path(scope), serde_json::to_vec(record)?).await?;
        debug!(scope = %scope, byte_estimate = record.byte_estimate, "usage record written");
        Ok(())
    }

    /// All persisted records, in no particular order. Unreadable documents
    /// are skipped with a warning rather than failing the listing.
    pub async fn records(&self) -> Result<Vec<UsageRecord>> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = ?path, error = %e, "skipping unreadable usage record");
                    continue;
                }
            };
            match serde_json::from_slice(&bytes) {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = ?path, error = %e, "skipping malformed usage record"),
            }
        }
        Ok(records)
    }

    /// Delete the headroom reservation so index writes can proceed on a
    /// full device. Returns whether a reservation was released.
    pub async fn release_headroom(&self) -> bool {
        match fs::remove_file(self.dir.join(HEADROOM_FILE)).await {
            Ok(()) => {
                warn!(dir = ?self.dir, "headroom reservation released");
                true
            }
            Err(_) => false,
        }
    }
}
