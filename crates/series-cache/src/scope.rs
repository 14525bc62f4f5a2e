//! Scope derivation for cache partitioning
//!
//! A scope groups every resource of one series into the same partition so
//! the whole series can be evicted with one partition delete.

/// Scope shared by identifiers that carry no series segment.
pub const DEFAULT_SCOPE: &str = "default-series-cache";

const SERIES_DELIMITER: &str = "series/";

/// Derive the cache scope for a resource identifier.
///
/// The scope is everything up to and including the first `series/`
/// occurrence plus the first `/`-terminated segment after it; the segment
/// may be empty when the delimiter ends the identifier. Identifiers
/// without the delimiter share [`DEFAULT_SCOPE`].
pub fn resolve_scope(identifier: &str) -> String {
    match identifier.split_once(SERIES_DELIMITER) {
        None => DEFAULT_SCOPE.to_string(),
        Some((prefix, rest)) => {
            let segment = rest.split('/').next().unwrap_or("");
            format!("{prefix}{SERIES_DELIMITER}{segment}")
        }
    }
}
