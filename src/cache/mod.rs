//! Keyed blob cache with TTL semantics.
//!
//! The release catalog is small but fetched at the start of every install,
//! so the raw payload is kept in a filesystem-backed store for a short TTL
//! (see [`crate::constants::CATALOG_CACHE_TTL`]). The store is deliberately
//! dumb: byte blobs in, byte blobs out. Interpretation of the payload -
//! including deciding that a cached payload is corrupt - belongs to the
//! caller; an unreadable *store* is merely a miss.
//!
//! # Expiry
//!
//! An entry is a hit iff `now - fetch timestamp < TTL`. The fetch timestamp
//! is the blob file's modification time, so expiry needs no sidecar
//! metadata and survives process restarts. Expired entries are treated as
//! absent, never returned.
//!
//! # Concurrency
//!
//! Multiple CLI invocations may race on the same cache path. Writes go
//! through a temporary file in the same directory followed by an atomic
//! rename, so a reader never observes a half-written payload.
//!
//! # Locations
//!
//! - **Linux/macOS**: `~/.cache/scaffold/`
//! - **Windows**: `%LOCALAPPDATA%\scaffold\`
//! - **Override**: the `cache_dir` field of the global config
//!
//! When no writable location exists the pipeline still has to work, so
//! [`open_default`] degrades to [`NoopStore`], an always-miss store.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::core::ScaffoldError;

/// Keyed byte-blob store with TTL semantics.
///
/// `get` returns `None` for missing *and* expired entries. `put` failures
/// surface as errors so callers can decide whether caching is load-bearing;
/// for the catalog it is not, and the error is logged and dropped.
pub trait BlobStore: Send + Sync {
    /// Return the payload stored under `key` if it exists and is fresh.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `payload` under `key`, atomically replacing any previous entry.
    fn put(&self, key: &str, payload: &[u8]) -> Result<(), ScaffoldError>;
}

/// Filesystem-backed [`BlobStore`].
///
/// One file per key under `root`; freshness is judged from the file's
/// mtime against the store's TTL.
pub struct FileStore {
    root: PathBuf,
    ttl: Duration,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>, ttl: Duration) -> Result<Self, ScaffoldError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root, ttl })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn is_fresh(&self, path: &Path) -> bool {
        let Ok(modified) = std::fs::metadata(path).and_then(|m| m.modified()) else {
            return false;
        };
        match SystemTime::now().duration_since(modified) {
            Ok(age) => age < self.ttl,
            // mtime in the future means the clock moved; treat as stale
            Err(_) => false,
        }
    }
}

impl BlobStore for FileStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(key);
        if !self.is_fresh(&path) {
            debug!(key, "cache miss");
            return None;
        }
        match std::fs::read(&path) {
            Ok(payload) => {
                debug!(key, bytes = payload.len(), "cache hit");
                Some(payload)
            }
            Err(_) => None,
        }
    }

    fn put(&self, key: &str, payload: &[u8]) -> Result<(), ScaffoldError> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.write_all(payload)?;
        tmp.persist(self.entry_path(key)).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Always-miss [`BlobStore`] used when no writable cache path exists.
pub struct NoopStore;

impl BlobStore for NoopStore {
    fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    fn put(&self, _key: &str, _payload: &[u8]) -> Result<(), ScaffoldError> {
        Ok(())
    }
}

/// Open the default cache store.
///
/// Uses `override_dir` when given, otherwise the platform cache directory.
/// Falls back to [`NoopStore`] when neither can be created, so callers
/// never have to special-case a disabled cache.
pub fn open_default(ttl: Duration, override_dir: Option<&Path>) -> Box<dyn BlobStore> {
    let root = override_dir
        .map(Path::to_path_buf)
        .or_else(|| dirs::cache_dir().map(|d| d.join("scaffold")));

    if let Some(root) = root {
        match FileStore::open(&root, ttl) {
            Ok(store) => return Box::new(store),
            Err(e) => debug!(path = %root.display(), error = %e, "cache disabled"),
        }
    }

    Box::new(NoopStore)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(ttl: Duration) -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::open(dir.path(), ttl).expect("open store");
        (dir, store)
    }

    #[test]
    fn round_trip_within_ttl_is_byte_identical() {
        let (_dir, store) = store(Duration::from_secs(60));
        let payload = b"{\"3.x\": {}}".to_vec();

        store.put("versions.json", &payload).expect("put");
        assert_eq!(store.get("versions.json"), Some(payload));
    }

    #[test]
    fn expired_entry_behaves_as_a_miss() {
        // Zero TTL: any entry is already expired at read time.
        let (_dir, store) = store(Duration::ZERO);

        store.put("versions.json", b"payload").expect("put");
        assert_eq!(store.get("versions.json"), None);
    }

    #[test]
    fn missing_key_is_a_miss() {
        let (_dir, store) = store(Duration::from_secs(60));
        assert_eq!(store.get("absent"), None);
    }

    #[test]
    fn put_replaces_previous_payload() {
        let (_dir, store) = store(Duration::from_secs(60));

        store.put("key", b"first").expect("put");
        store.put("key", b"second").expect("put");
        assert_eq!(store.get("key"), Some(b"second".to_vec()));
    }

    #[test]
    fn noop_store_never_hits() {
        let store = NoopStore;
        store.put("key", b"payload").expect("put is accepted");
        assert_eq!(store.get("key"), None);
    }

    #[test]
    fn open_default_prefers_override_dir() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = open_default(Duration::from_secs(60), Some(dir.path()));

        store.put("key", b"payload").expect("put");
        assert_eq!(store.get("key"), Some(b"payload".to_vec()));
        assert!(dir.path().join("key").exists());
    }
}
