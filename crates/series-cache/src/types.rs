//! Shared types and configuration for the series cache

use std::path::PathBuf;
use std::time::Duration;

use crate::pool::DEFAULT_FLUSH_QUIET;

/// A fetched network response as handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// Effective URL the response was served from.
    pub url: String,
    pub body: Vec<u8>,
    /// Raw response header text as reported by the transport.
    pub raw_headers: String,
}

/// Gates for the read and write cache paths. A disabled path is a no-op
/// passthrough.
#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
    pub read_cache: bool,
    /// Off by default; prefetch flows opt in.
    pub write_cache: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            read_cache: true,
            write_cache: false,
        }
    }
}

/// Configuration for assembling a [`CacheLayer`](crate::CacheLayer).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub cache_dir: PathBuf,
    pub index_dir: PathBuf,
    pub max_store_bytes: u64,
    /// Quiet interval between the last usage mutation and its flush.
    pub flush_quiet: Duration,
    pub options: CacheOptions,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./cache/responses"),
            index_dir: PathBuf::from("./cache/usage"),
            max_store_bytes: 1024 * 1024 * 1024, // 1GB
            flush_quiet: DEFAULT_FLUSH_QUIET,
            options: CacheOptions::default(),
        }
    }
}

impl CacheConfig {
    /// Load configuration from the environment, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: std::env::var("SERIES_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            index_dir: std::env::var("SERIES_CACHE_INDEX_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.index_dir),
            max_store_bytes: std::env::var("SERIES_CACHE_MAX_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_store_bytes),
            flush_quiet: std::env::var("SERIES_CACHE_FLUSH_QUIET_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.flush_quiet),
            options: CacheOptions {
                read_cache: std::env::var("SERIES_CACHE_READ")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.options.read_cache),
                write_cache: std::env::var("SERIES_CACHE_WRITE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.options.write_cache),
            },
        }
    }
}
