//! Usage record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted byte-usage aggregate for one cache scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub scope: String,
    /// Net payload bytes attributed to the scope. May go negative
    /// transiently; clamping is the policy layer's concern.
    pub byte_estimate: i64,
    pub last_access: DateTime<Utc>,
}

impl UsageRecord {
    /// Zero-valued record for a scope not seen before.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            byte_estimate: 0,
            last_access: Utc::now(),
        }
    }
}
