//! JSON document persistence shared by the conversion and profile caches
//!
//! Each cache keeps its whole index in one JSON document. The document is
//! read entirely into memory, mutated, and written back through a temp file
//! that is atomically renamed over the original, so readers never observe a
//! partially written index.

use crate::error::{DataMcpError, DataMcpResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// Current on-disk format tag
pub const DOCUMENT_VERSION: u32 = 1;

/// Number of rename attempts before a save is abandoned
const RENAME_ATTEMPTS: u32 = 3;

/// Delay before the first rename retry, doubled on each further attempt
const RENAME_BASE_DELAY: Duration = Duration::from_millis(50);

/// Common view over the entries of a cache document
pub trait CacheEntry {
    /// Bytes this entry counts against the cache budget
    fn footprint(&self) -> u64;

    /// When the entry was created (or last touched)
    fn created_at(&self) -> DateTime<Utc>;
}

/// On-disk cache index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheDocument<E> {
    /// Format tag, see [`DOCUMENT_VERSION`]
    pub version: u32,

    /// Entries in insertion order
    pub entries: Vec<E>,

    /// Sum of entry footprints, recomputed rather than trusted
    #[serde(default)]
    pub total_size: u64,

    /// Set when the file on disk was unreadable and replaced by an empty document
    #[serde(skip)]
    pub recovered: bool,
}

impl<E> Default for CacheDocument<E> {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            entries: Vec::new(),
            total_size: 0,
            recovered: false,
        }
    }
}

impl<E: CacheEntry> CacheDocument<E> {
    /// Recompute `total_size` from the current entries
    pub fn recompute_total(&mut self) {
        self.total_size = self.entries.iter().map(CacheEntry::footprint).sum();
    }
}

/// Location and persistence rules for one cache document
#[derive(Debug, Clone)]
pub struct DocumentStore {
    path: PathBuf,
}

impl DocumentStore {
    /// Create a store for the document at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the canonical document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, returning an empty one if it is missing or unusable
    ///
    /// A corrupt document is logged and replaced in memory by an empty one
    /// with `recovered` set, so the next save overwrites the bad file.
    pub async fn load<E>(&self) -> CacheDocument<E>
    where
        E: CacheEntry + DeserializeOwned,
    {
        match self.try_load().await {
            Ok(Some(mut doc)) => {
                doc.recompute_total();
                doc
            }
            Ok(None) => CacheDocument::default(),
            Err(e) => {
                warn!(
                    "Discarding unreadable cache document {}: {}",
                    self.path.display(),
                    e
                );
                CacheDocument {
                    recovered: true,
                    ..CacheDocument::default()
                }
            }
        }
    }

    async fn try_load<E: DeserializeOwned>(&self) -> DataMcpResult<Option<CacheDocument<E>>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(DataMcpError::io(
                    format!("reading cache document {}", self.path.display()),
                    e,
                ))
            }
        };

        let doc: CacheDocument<E> = serde_json::from_str(&content)?;
        if doc.version != DOCUMENT_VERSION {
            return Err(DataMcpError::CacheDocument {
                path: self.path.clone(),
                reason: format!("unsupported version {}", doc.version),
            });
        }

        Ok(Some(doc))
    }

    /// Atomically replace the document on disk
    pub async fn save<E: Serialize>(&self, doc: &CacheDocument<E>) -> DataMcpResult<()> {
        let content = serde_json::to_string_pretty(doc)?;
        let tmp = self.temp_path();

        if let Err(e) = fs::write(&tmp, content).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(DataMcpError::io(
                format!("writing cache temp file {}", tmp.display()),
                e,
            ));
        }
        restrict_permissions(&tmp).await;

        let mut delay = RENAME_BASE_DELAY;
        let mut attempt = 1;
        loop {
            match fs::rename(&tmp, &self.path).await {
                Ok(()) => break,
                Err(e) if attempt < RENAME_ATTEMPTS => {
                    debug!(
                        "Rename of {} failed (attempt {}): {}, retrying in {:?}",
                        tmp.display(),
                        attempt,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => {
                    if let Err(cleanup) = fs::remove_file(&tmp).await {
                        debug!("Could not remove temp file {}: {}", tmp.display(), cleanup);
                    }
                    return Err(DataMcpError::CacheSave {
                        path: self.path.clone(),
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }

        // Rename may not carry the mode over on every platform
        restrict_permissions(&self.path).await;
        debug!("Saved cache document {}", self.path.display());
        Ok(())
    }

    /// Delete the document; a missing file is not an error
    pub async fn remove(&self) -> DataMcpResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DataMcpError::io(
                format!("removing cache document {}", self.path.display()),
                e,
            )),
        }
    }

    /// Delete this document's temp files that are older than `max_age`
    ///
    /// Returns the number of files removed. Temp files left behind by a
    /// crashed writer are the only expected match.
    pub async fn remove_stale_temp_files(&self, max_age: Duration) -> DataMcpResult<usize> {
        let prefix = self.temp_prefix();
        let dir = self.directory();
        let now = SystemTime::now();
        let mut removed = 0;

        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| DataMcpError::io(format!("reading directory {}", dir.display()), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DataMcpError::io("reading directory entry", e))?
        {
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(&prefix) {
                continue;
            }

            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    debug!("Skipping temp file {:?}: {}", name, e);
                    continue;
                }
            };
            let age = now.duration_since(modified).unwrap_or_default();
            if age <= max_age {
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => {
                    debug!("Removed stale temp file {}", entry.path().display());
                    removed += 1;
                }
                Err(e) => warn!(
                    "Failed to remove stale temp file {}: {}",
                    entry.path().display(),
                    e
                ),
            }
        }

        Ok(removed)
    }

    fn directory(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    fn temp_prefix(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}.tmp.", name)
    }

    fn temp_path(&self) -> PathBuf {
        self.directory().join(format!(
            "{}{}.{}",
            self.temp_prefix(),
            std::process::id(),
            Uuid::new_v4().simple()
        ))
    }
}

/// Restrict a cache file to owner read/write; failures are logged only
async fn restrict_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        if let Err(e) = fs::set_permissions(path, perms).await {
            debug!("Could not restrict permissions on {}: {}", path.display(), e);
        }
    }
    #[cfg(not(unix))]
    let _ = path;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        size: u64,
        created_at: DateTime<Utc>,
    }

    impl CacheEntry for Item {
        fn footprint(&self) -> u64 {
            self.size
        }

        fn created_at(&self) -> DateTime<Utc> {
            self.created_at
        }
    }

    fn store(dir: &TempDir) -> DocumentStore {
        DocumentStore::new(dir.path().join(".test-cache.json"))
    }

    fn doc_with(sizes: &[u64]) -> CacheDocument<Item> {
        let mut doc = CacheDocument::default();
        doc.entries = sizes
            .iter()
            .map(|&size| Item {
                size,
                created_at: Utc::now(),
            })
            .collect();
        doc.recompute_total();
        doc
    }

    #[tokio::test]
    async fn missing_document_loads_empty() {
        let dir = TempDir::new().unwrap();
        let doc: CacheDocument<Item> = store(&dir).load().await;

        assert_eq!(doc.version, DOCUMENT_VERSION);
        assert!(doc.entries.is_empty());
        assert_eq!(doc.total_size, 0);
        assert!(!doc.recovered);
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.save(&doc_with(&[10, 20])).await.unwrap();
        let loaded: CacheDocument<Item> = store.load().await;

        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(loaded.total_size, 30);
    }

    #[tokio::test]
    async fn saved_document_uses_camel_case_keys() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.save(&doc_with(&[5])).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["totalSize"], 5);
        assert!(value.get("recovered").is_none());
    }

    #[tokio::test]
    async fn total_size_is_recomputed_on_load() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let mut doc = doc_with(&[7, 8]);
        doc.total_size = 9999;
        store.save(&doc).await.unwrap();

        let loaded: CacheDocument<Item> = store.load().await;
        assert_eq!(loaded.total_size, 15);
    }

    #[tokio::test]
    async fn corrupt_document_loads_empty_and_recovered() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::write(store.path(), b"\x00not json{{").unwrap();

        let doc: CacheDocument<Item> = store.load().await;
        assert!(doc.entries.is_empty());
        assert!(doc.recovered);
    }

    #[tokio::test]
    async fn wrong_or_missing_version_is_discarded() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        std::fs::write(store.path(), r#"{"version": 2, "entries": [], "totalSize": 0}"#).unwrap();
        let doc: CacheDocument<Item> = store.load().await;
        assert!(doc.recovered);

        std::fs::write(store.path(), r#"{"entries": [], "totalSize": 0}"#).unwrap();
        let doc: CacheDocument<Item> = store.load().await;
        assert!(doc.recovered);

        std::fs::write(store.path(), r#"{"version": 1, "entries": {}, "totalSize": 0}"#).unwrap();
        let doc: CacheDocument<Item> = store.load().await;
        assert!(doc.recovered);
    }

    #[tokio::test]
    async fn save_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.save(&doc_with(&[1])).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![".test-cache.json".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn saved_document_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.save(&doc_with(&[1])).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn save_into_missing_directory_fails_without_temp_litter() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path().join("missing").join(".doc.json"));

        let err = store.save(&doc_with(&[1])).await.unwrap_err();
        assert!(matches!(err, DataMcpError::Io { .. }));
        assert!(!dir.path().join("missing").exists());
    }

    #[tokio::test]
    async fn blocked_rename_gives_up_after_retries() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        // A non-empty directory at the document path makes every rename fail
        std::fs::create_dir(store.path()).unwrap();
        std::fs::write(store.path().join("keep"), b"x").unwrap();

        let err = store.save(&doc_with(&[1])).await.unwrap_err();

        match err {
            DataMcpError::CacheSave { path, attempts, .. } => {
                assert_eq!(path, store.path());
                assert_eq!(attempts, RENAME_ATTEMPTS);
            }
            other => panic!("unexpected error: {}", other),
        }
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![".test-cache.json".to_string()]);
        assert!(store.path().join("keep").exists());
    }

    #[tokio::test]
    async fn remove_ignores_missing_document() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.remove().await.unwrap();

        store.save(&doc_with(&[1])).await.unwrap();
        store.remove().await.unwrap();
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn stale_temp_files_are_removed() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let stale = dir.path().join(".test-cache.json.tmp.1234.deadbeef");
        let unrelated = dir.path().join("data.csv.tmp.1.abc");
        std::fs::write(&stale, b"{}").unwrap();
        std::fs::write(&unrelated, b"a,b").unwrap();

        // Fresh files survive a one-hour threshold
        let removed = store
            .remove_stale_temp_files(Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(removed, 0);
        assert!(stale.exists());

        tokio::time::sleep(Duration::from_millis(20)).await;
        let removed = store
            .remove_stale_temp_files(Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(!stale.exists());
        assert!(unrelated.exists());
    }
}
