//! Error types for the partition store

use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    QuotaExceeded {
        scope: String,
        needed: u64,
        capacity: u64,
    },
    Io(Box<std::io::Error>),
    Json(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::QuotaExceeded {
                scope,
                needed,
                capacity,
            } => write!(
                f,
                "Store quota exceeded: {} more bytes for partition {} would pass the {} byte capacity",
                needed, scope, capacity
            ),
            StoreError::Io(err) => write!(f, "IO error: {}", err),
            StoreError::Json(msg) => write!(f, "JSON error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(Box::new(err))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Json(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
