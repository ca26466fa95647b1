//! Error types for the fetch cache.

use thiserror::Error;

/// Errors that can occur when reading or populating the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error accessing the cache directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The cache key contains characters or segments that cannot map to a path.
    #[error("invalid cache key {0:?}")]
    InvalidKey(String),

    /// The fetch closure for a key failed.
    #[error("fetch for cache key {key:?} failed: {reason}")]
    FetchFailed {
        /// Key whose fetch failed.
        key: String,
        /// Failure description from the fetcher.
        reason: String,
    },

    /// Cache metadata sidecar could not be parsed.
    #[error("cache metadata is corrupt: {0}")]
    CorruptMetadata(#[from] serde_json::Error),

    /// A lock was poisoned (a thread panicked while holding it).
    #[error("cache lock was poisoned")]
    LockPoisoned,
}
