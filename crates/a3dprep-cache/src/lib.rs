//! # a3dprep-cache
//!
//! Fetch infrastructure shared by the pipeline's data providers: a
//! disk-backed, content-addressed cache with single-flight download
//! coordination, and a bounded retry-with-backoff policy for network calls.
//!
//! The cache is passed by reference into each provider rather than held as
//! global state. Entries are keyed by stable identifiers (tile coordinates,
//! catalog query digests); concurrent requests for the same key trigger at
//! most one underlying fetch, and a cache hit returns bytes byte-identical
//! to the fresh fetch that populated it.
//!
//! ## Example
//!
//! ```no_run
//! use a3dprep_cache::FetchCache;
//!
//! let cache = FetchCache::open("./cache")?;
//! let bytes = cache.get_or_fetch("dem/12/2137/1446", None, || {
//!     // network fetch happens at most once per key
//!     Ok(vec![0u8; 4])
//! })?;
//! # Ok::<(), a3dprep_cache::CacheError>(())
//! ```

mod error;
mod retry;
mod store;

pub use error::CacheError;
pub use retry::{RetryExhausted, RetryPolicy};
pub use store::{content_key, EntryMeta, FetchCache};

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
