//! Disk-backed fetch cache with single-flight download coordination.

use crate::{CacheError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex};
use tracing::{debug, warn};

/// Name of the JSON sidecar describing cached entries.
const METADATA_FILE: &str = "metadata.json";

/// Compute the SHA-256 hex digest of a byte buffer.
///
/// Used both for entry verification and for deriving content-addressed key
/// components (e.g. hashing a catalog query string).
pub fn content_key(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Metadata recorded for one cached entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMeta {
    /// Source the bytes came from, when the fetcher supplied one.
    pub origin: Option<String>,
    /// Entry size in bytes.
    pub bytes: u64,
    /// SHA-256 hex digest of the entry, verified on every read.
    pub sha256: String,
    /// RFC 3339 timestamp of when the entry was cached.
    pub cached_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheMetadata {
    entries: BTreeMap<String, EntryMeta>,
}

/// Status of an in-flight fetch for a key.
#[derive(Clone)]
enum FetchStatus {
    /// A thread is currently fetching this key.
    InProgress,
    /// Fetch completed; bytes are on disk.
    Complete,
    /// Fetch failed with an error message.
    Failed(String),
}

/// Content-addressed fetch cache shared by the pipeline's providers.
///
/// The cache is read-shared by concurrent tasks, but at most one fetch per
/// key runs at a time: a request for a key that is already being fetched
/// blocks until the fetch finishes, then reads the cached bytes. A cache hit
/// is byte-identical to a fresh fetch for the same key; the SHA-256 digest
/// in the metadata sidecar is verified on every read and mismatching entries
/// are evicted and refetched.
pub struct FetchCache {
    root: PathBuf,
    metadata: Mutex<CacheMetadata>,
    in_flight: Mutex<HashMap<String, FetchStatus>>,
    fetch_done: Condvar,
}

impl std::fmt::Debug for FetchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCache").field("root", &self.root).finish()
    }
}

impl FetchCache {
    /// Open (or create) a cache rooted at `root`.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let metadata_path = root.join(METADATA_FILE);
        let metadata = if metadata_path.exists() {
            match fs::read(&metadata_path) {
                Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                    warn!(path = %metadata_path.display(), %err, "cache metadata unreadable, starting empty");
                    CacheMetadata::default()
                }),
                Err(err) => {
                    warn!(path = %metadata_path.display(), %err, "cache metadata unreadable, starting empty");
                    CacheMetadata::default()
                }
            }
        } else {
            CacheMetadata::default()
        };

        Ok(Self {
            root,
            metadata: Mutex::new(metadata),
            in_flight: Mutex::new(HashMap::new()),
            fetch_done: Condvar::new(),
        })
    }

    /// Root directory of the cache.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a verified entry for `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        match self.entry_path(key) {
            Ok(path) => path.exists(),
            Err(_) => false,
        }
    }

    /// Metadata for a cached entry, if present.
    pub fn entry_meta(&self, key: &str) -> Option<EntryMeta> {
        let metadata = self.metadata.lock().ok()?;
        metadata.entries.get(key).cloned()
    }

    /// Return the cached bytes for `key`, fetching them with `fetch` on a miss.
    ///
    /// Concurrent calls for the same key coordinate: only one thread runs its
    /// fetch closure, the others wait and then read the cached result. When a
    /// fetch fails nothing is cached; the failure is returned to the fetching
    /// caller, one waiter receives it as [`CacheError::FetchFailed`], and
    /// remaining waiters retry with their own closures.
    pub fn get_or_fetch<F>(&self, key: &str, origin: Option<&str>, fetch: F) -> Result<Vec<u8>>
    where
        F: FnOnce() -> std::result::Result<Vec<u8>, String>,
    {
        let path = self.entry_path(key)?;

        loop {
            if let Some(bytes) = self.read_verified(key, &path)? {
                return Ok(bytes);
            }

            let mut flight = self.in_flight.lock().map_err(|_| CacheError::LockPoisoned)?;
            match flight.get(key) {
                Some(FetchStatus::InProgress) => {
                    // Another thread is fetching this key; wait for it.
                    let _guard = self
                        .fetch_done
                        .wait(flight)
                        .map_err(|_| CacheError::LockPoisoned)?;
                    continue;
                }
                Some(FetchStatus::Complete) => {
                    flight.remove(key);
                    continue;
                }
                Some(FetchStatus::Failed(reason)) => {
                    let reason = reason.clone();
                    flight.remove(key);
                    return Err(CacheError::FetchFailed {
                        key: key.to_string(),
                        reason,
                    });
                }
                None => {
                    flight.insert(key.to_string(), FetchStatus::InProgress);
                    break;
                }
            }
        }

        // This thread owns the fetch for the key; others wait on the condvar.
        let outcome = fetch();
        let result = match outcome {
            Ok(bytes) => self
                .store(key, &path, &bytes, origin)
                .map(|_| bytes)
                .map_err(|err| (key.to_string(), err.to_string())),
            Err(reason) => Err((key.to_string(), reason)),
        };

        {
            let mut flight = self.in_flight.lock().map_err(|_| CacheError::LockPoisoned)?;
            match &result {
                Ok(_) => flight.insert(key.to_string(), FetchStatus::Complete),
                Err((_, reason)) => flight.insert(key.to_string(), FetchStatus::Failed(reason.clone())),
            };
        }
        self.fetch_done.notify_all();

        result.map_err(|(key, reason)| CacheError::FetchFailed { key, reason })
    }

    /// Map a key like `dem/12/2137/1446` to a path under the cache root.
    fn entry_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey(key.to_string()));
        }
        let mut path = self.root.clone();
        for segment in key.split('/') {
            let valid = !segment.is_empty()
                && segment != "."
                && segment != ".."
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
            if !valid {
                return Err(CacheError::InvalidKey(key.to_string()));
            }
            path.push(segment);
        }
        Ok(path)
    }

    /// Read an entry and verify its digest. Mismatching entries are evicted.
    fn read_verified(&self, key: &str, path: &Path) -> Result<Option<Vec<u8>>> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        let digest = content_key(&bytes);

        let mut metadata = self.metadata.lock().map_err(|_| CacheError::LockPoisoned)?;
        match metadata.entries.get(key) {
            Some(entry) if entry.sha256 == digest => Ok(Some(bytes)),
            Some(_) => {
                warn!(key, "cached entry digest mismatch, evicting");
                metadata.entries.remove(key);
                drop(metadata);
                fs::remove_file(path)?;
                Ok(None)
            }
            None => {
                // Entry present without a sidecar record (e.g. sidecar lost);
                // backfill the record from the bytes on disk.
                metadata.entries.insert(
                    key.to_string(),
                    EntryMeta {
                        origin: None,
                        bytes: bytes.len() as u64,
                        sha256: digest,
                        cached_at: chrono::Utc::now().to_rfc3339(),
                    },
                );
                self.save_metadata(&metadata)?;
                Ok(Some(bytes))
            }
        }
    }

    /// Write fetched bytes and record them in the metadata sidecar.
    fn store(&self, key: &str, path: &Path, bytes: &[u8], origin: Option<&str>) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        file.write_all(bytes)?;

        let mut metadata = self.metadata.lock().map_err(|_| CacheError::LockPoisoned)?;
        metadata.entries.insert(
            key.to_string(),
            EntryMeta {
                origin: origin.map(str::to_string),
                bytes: bytes.len() as u64,
                sha256: content_key(bytes),
                cached_at: chrono::Utc::now().to_rfc3339(),
            },
        );
        self.save_metadata(&metadata)?;
        debug!(key, bytes = bytes.len(), "cached entry");
        Ok(())
    }

    fn save_metadata(&self, metadata: &CacheMetadata) -> Result<()> {
        let path = self.root.join(METADATA_FILE);
        let json = serde_json::to_vec_pretty(metadata)?;
        fs::write(path, json)?;
        Ok(())
    }
}
