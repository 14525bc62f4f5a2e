//! Error types for the usage index

use std::fmt;

#[derive(Debug)]
pub enum IndexError {
    Io(Box<std::io::Error>),
    Json(String),
}

impl IndexError {
    /// Whether this error reports the underlying device being full.
    pub fn is_out_of_space(&self) -> bool {
        match self {
            IndexError::Io(err) => {
                matches!(
                    err.kind(),
                    std::io::ErrorKind::StorageFull | std::io::ErrorKind::QuotaExceeded
                ) || err.raw_os_error() == Some(28) // ENOSPC
            }
            IndexError::Json(_) => false,
        }
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::Io(err) => write!(f, "IO error: {}", err),
            IndexError::Json(msg) => write!(f, "JSON error: {}", msg),
        }
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IndexError::Io(err) => Some(err.as_ref()),
            IndexError::Json(_) => None,
        }
    }
}

impl From<std::io::Error> for IndexError {
    fn from(err: std::io::Error) -> Self {
        IndexError::Io(Box::new(err))
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(err: serde_json::Error) -> Self {
        IndexError::Json(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
