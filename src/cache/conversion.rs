//! Converted-file cache
//!
//! Remembers which CSV artifact was produced from which source file
//! (spreadsheet, JSON-lines) so repeat requests skip the conversion. Every
//! failure inside this cache is logged and turned into a miss or a no-op:
//! it exists only to make repeats faster.

use crate::cache::eviction::evict_to_budget;
use crate::cache::staleness::SourceStat;
use crate::cache::store::{CacheDocument, CacheEntry, DocumentStore};
use crate::error::DataMcpResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

/// Document file name inside the working directory
pub const CONVERTED_CACHE_FILE: &str = ".datamcp-converted-cache.json";

/// Temp files older than this are assumed abandoned by a crashed writer
pub const STALE_TEMP_AGE: Duration = Duration::from_secs(60 * 60);

/// One source to artifact pairing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionEntry {
    /// Absolute path of the source file, unique within the document
    pub source_path: PathBuf,

    /// Source mtime when the artifact was registered
    pub source_timestamp: DateTime<Utc>,

    /// Artifact size in bytes
    pub size: u64,

    /// Absolute path of the converted artifact
    pub converted_path: PathBuf,

    /// Registration time, refreshed when the artifact is reused
    pub created_at: DateTime<Utc>,
}

impl CacheEntry for ConversionEntry {
    fn footprint(&self) -> u64 {
        self.size
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Result of an orphan cleanup pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrphanCleanup {
    /// Entries dropped because their artifact no longer exists
    pub orphaned_entries: usize,
    /// Abandoned temp files deleted
    pub stale_temp_files: usize,
}

/// Cache of converted artifacts for one working directory
#[derive(Debug, Clone)]
pub struct ConversionCache {
    working_dir: PathBuf,
    store: DocumentStore,
    max_size_bytes: u64,
}

impl ConversionCache {
    /// Create a cache whose document lives in `working_dir`
    pub fn new(working_dir: impl Into<PathBuf>, max_size_bytes: u64) -> Self {
        let working_dir = working_dir.into();
        Self {
            store: DocumentStore::new(working_dir.join(CONVERTED_CACHE_FILE)),
            working_dir,
            max_size_bytes,
        }
    }

    /// Path of the backing document
    pub fn document_path(&self) -> &Path {
        self.store.path()
    }

    /// Configured size budget in bytes
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Current entries in insertion order
    pub async fn entries(&self) -> Vec<ConversionEntry> {
        self.store.load::<ConversionEntry>().await.entries
    }

    /// Artifact path registered for `source`, if any
    ///
    /// The path is not validated; pass it to [`Self::get_valid_artifact`].
    pub async fn lookup(&self, source: &Path) -> Option<PathBuf> {
        let source = self.resolve(source);
        self.store
            .load::<ConversionEntry>()
            .await
            .entries
            .into_iter()
            .find(|e| e.source_path == source)
            .map(|e| e.converted_path)
    }

    /// Return `artifact` if it exists and the source is not newer than it
    ///
    /// Compares file timestamps directly rather than the recorded entry, so
    /// callers may check a candidate that was never registered.
    pub async fn get_valid_artifact(&self, source: &Path, artifact: &Path) -> Option<PathBuf> {
        let artifact_stat = match SourceStat::read(&self.resolve(artifact)).await {
            Ok(stat) => stat,
            Err(e) => {
                debug!("Conversion cache miss for {}: {}", source.display(), e);
                return None;
            }
        };
        let source_stat = match SourceStat::read(&self.resolve(source)).await {
            Ok(stat) => stat,
            Err(e) => {
                debug!("Conversion cache miss for {}: {}", source.display(), e);
                return None;
            }
        };

        if source_stat.modified > artifact_stat.modified {
            debug!(
                "Source {} is newer than artifact {}",
                source.display(),
                artifact.display()
            );
            return None;
        }

        Some(artifact.to_path_buf())
    }

    /// Record `artifact` as the conversion of `source`, then enforce the budget
    pub async fn register_artifact(&self, source: &Path, artifact: &Path) {
        if let Err(e) = self.try_register(source, artifact).await {
            warn!(
                "Failed to register conversion of {}: {}",
                source.display(),
                e
            );
        }
    }

    async fn try_register(&self, source: &Path, artifact: &Path) -> DataMcpResult<()> {
        let source = self.resolve(source);
        let artifact = self.resolve(artifact);
        let source_stat = SourceStat::read(&source).await?;
        let artifact_stat = SourceStat::read(&artifact).await?;

        let mut doc = self.store.load::<ConversionEntry>().await;
        let (superseded, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut doc.entries)
            .into_iter()
            .partition(|e| e.source_path == source);
        doc.entries = kept;

        for old in superseded {
            if old.converted_path != artifact {
                remove_artifact(&old.converted_path).await;
            }
        }

        doc.entries.push(ConversionEntry {
            source_path: source.clone(),
            source_timestamp: source_stat.modified,
            size: artifact_stat.size,
            converted_path: artifact.clone(),
            created_at: Utc::now(),
        });

        let evicted = evict_to_budget(&mut doc.entries, self.max_size_bytes);
        if !evicted.is_empty() {
            info!(
                "Evicted {} converted file(s) to stay under {} bytes",
                evicted.len(),
                self.max_size_bytes
            );
        }
        for entry in &evicted {
            // The caller is about to use the artifact it just registered
            if entry.converted_path == artifact {
                debug!(
                    "Converted file {} exceeds the cache budget, not indexing it",
                    artifact.display()
                );
                continue;
            }
            remove_artifact(&entry.converted_path).await;
        }

        self.save(&mut doc).await?;
        debug!(
            "Registered conversion {} -> {}",
            source.display(),
            artifact.display()
        );
        Ok(())
    }

    /// Refresh `created_at` of the entry for `source` so it ages from now
    pub async fn touch(&self, source: &Path) {
        if let Err(e) = self.try_touch(source).await {
            warn!("Failed to touch conversion of {}: {}", source.display(), e);
        }
    }

    async fn try_touch(&self, source: &Path) -> DataMcpResult<()> {
        let source = self.resolve(source);
        let mut doc = self.store.load::<ConversionEntry>().await;

        let touched = match doc.entries.iter_mut().find(|e| e.source_path == source) {
            Some(entry) => {
                entry.created_at = Utc::now();
                true
            }
            None => false,
        };

        if touched || doc.recovered {
            self.save(&mut doc).await?;
        }
        Ok(())
    }

    /// Drop entries whose artifact vanished and delete abandoned temp files
    pub async fn cleanup_orphans(&self) -> OrphanCleanup {
        let mut report = OrphanCleanup::default();

        match self.try_drop_orphans().await {
            Ok(orphaned) => report.orphaned_entries = orphaned,
            Err(e) => warn!("Conversion cache orphan cleanup failed: {}", e),
        }

        match self.store.remove_stale_temp_files(STALE_TEMP_AGE).await {
            Ok(removed) => report.stale_temp_files = removed,
            Err(e) => warn!("Conversion cache temp file cleanup failed: {}", e),
        }

        if report != OrphanCleanup::default() {
            info!(
                "Conversion cache cleanup removed {} orphaned entries and {} temp files",
                report.orphaned_entries, report.stale_temp_files
            );
        }
        report
    }

    async fn try_drop_orphans(&self) -> DataMcpResult<usize> {
        let mut doc = self.store.load::<ConversionEntry>().await;
        let before = doc.entries.len();

        let mut kept = Vec::with_capacity(before);
        for entry in std::mem::take(&mut doc.entries) {
            // An unknown existence state keeps the entry
            if matches!(fs::try_exists(&entry.converted_path).await, Ok(false)) {
                debug!(
                    "Dropping orphaned conversion entry for {}",
                    entry.source_path.display()
                );
            } else {
                kept.push(entry);
            }
        }
        doc.entries = kept;

        let orphaned = before - doc.entries.len();
        if orphaned > 0 || doc.recovered {
            self.save(&mut doc).await?;
        }
        Ok(orphaned)
    }

    async fn save(&self, doc: &mut CacheDocument<ConversionEntry>) -> DataMcpResult<()> {
        doc.recompute_total();
        self.store.save(doc).await
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}

/// Delete an artifact file; failures are logged and otherwise ignored
async fn remove_artifact(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!("Removed converted file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove converted file {}: {}", path.display(), e),
    }
}
