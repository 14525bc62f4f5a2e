//! Entry types for the partition store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A binary response entry held by a partition.
///
/// The partition owns the stored copy; this value is what crosses the
/// store boundary on put and match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Resource identifier the entry was stored under (effective URL).
    pub key: String,
    pub payload: Vec<u8>,
    /// Response headers in their original order.
    pub headers: Vec<(String, String)>,
    pub put_date: DateTime<Utc>,
    /// Absent until the first read-path refresh.
    pub last_viewed_date: Option<DateTime<Utc>>,
    /// Absent when the payload length was unknown at store time.
    pub content_length: Option<u64>,
}

impl CacheEntry {
    /// Look up a stored response header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Lookup options for [`Partition::match_entry`](crate::Partition::match_entry).
///
/// Entries are stored method-less (GET semantics), so `ignore_method`
/// cannot exclude anything; it is accepted for interface compatibility.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchOptions {
    /// Match on the path-level key alone, ignoring query differences.
    pub ignore_search: bool,
    pub ignore_method: bool,
    /// Accept entries whose stored headers include `Vary`.
    pub ignore_vary: bool,
}

/// On-disk metadata sidecar for one entry.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct EntryMeta {
    pub key: String,
    pub headers: Vec<(String, String)>,
    pub put_date: DateTime<Utc>,
    pub last_viewed_date: Option<DateTime<Utc>>,
    pub content_length: Option<u64>,
    pub payload_size: u64,
}
