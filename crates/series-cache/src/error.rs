//! Error types for the series cache

use std::fmt;

use file_partition_store::StoreError;
use scope_usage_index::IndexError;

#[derive(Debug)]
pub enum CacheError {
    Store(StoreError),
    Index(IndexError),
}

impl CacheError {
    /// Whether the error is the store refusing a write for lack of space.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, CacheError::Store(StoreError::QuotaExceeded { .. }))
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Store(err) => write!(f, "Store error: {}", err),
            CacheError::Index(err) => write!(f, "Index error: {}", err),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Store(err) => Some(err),
            CacheError::Index(err) => Some(err),
        }
    }
}

impl From<StoreError> for CacheError {
    fn from(err: StoreError) -> Self {
        CacheError::Store(err)
    }
}

impl From<IndexError> for CacheError {
    fn from(err: IndexError) -> Self {
        CacheError::Index(err)
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
