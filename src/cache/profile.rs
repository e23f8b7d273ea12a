//! Profile cache
//!
//! Stores computed profile text per (source file, request options). An entry
//! is valid while the source keeps the size and mtime recorded when it was
//! cached and its age stays within the TTL. Stale and expired entries are
//! removed from the document as soon as a lookup notices them.

use crate::cache::eviction::{evict_to_budget, expire_older_than, is_expired};
use crate::cache::staleness::SourceStat;
use crate::cache::store::{CacheDocument, CacheEntry, DocumentStore};
use crate::cache::STALE_TEMP_AGE;
use crate::error::DataMcpResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Document file name inside the working directory
pub const PROFILE_CACHE_FILE: &str = ".datamcp-profile-cache.json";

/// Estimated JSON bookkeeping per entry, added to the profile text length
pub const ENTRY_OVERHEAD_BYTES: u64 = 256;

/// Request options that change the profile output
///
/// Only the fields compared in [`ProfileOptions::matches`] take part in the
/// cache key. A new option must be added there too, or requests differing
/// only in that option will share a cached profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOptions {
    /// Maximum distinct values reported per column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    /// Column selection passed to the tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<String>,

    /// Skip summary statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_stats: Option<bool>,
}

impl ProfileOptions {
    /// Whether two option records select the same cached profile
    pub fn matches(&self, other: &Self) -> bool {
        self.limit == other.limit && self.columns == other.columns && self.no_stats == other.no_stats
    }
}

/// One cached profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileEntry {
    /// Absolute path of the profiled file
    pub source_path: PathBuf,

    /// Source mtime when the profile was cached
    pub source_timestamp: DateTime<Utc>,

    /// Source size when the profile was cached
    pub source_size: u64,

    /// Options the profile was computed with
    pub options: ProfileOptions,

    /// Profile text
    pub profile: String,

    /// Byte length of `profile`
    pub size: u64,

    /// When the profile was cached
    pub created_at: DateTime<Utc>,
}

impl CacheEntry for ProfileEntry {
    fn footprint(&self) -> u64 {
        self.size + ENTRY_OVERHEAD_BYTES
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Snapshot of the in-memory profile cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProfileCacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub errors: u64,
}

impl ProfileCacheMetrics {
    /// Fraction of lookups served from cache
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        self.hits as f64 / lookups as f64
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    errors: AtomicU64,
}

impl Counters {
    fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ProfileCacheMetrics {
        ProfileCacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.evictions,
            &self.expirations,
            &self.errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Result of a maintenance pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProfileCleanup {
    /// Entries removed for exceeding the TTL
    pub expired: usize,
    /// Entries removed for the size budget
    pub evicted: usize,
    /// Abandoned temp files deleted
    pub stale_temp_files: usize,
}

/// Cache of profile text for one working directory
#[derive(Debug)]
pub struct ProfileCache {
    working_dir: PathBuf,
    store: DocumentStore,
    max_size_bytes: u64,
    ttl: Duration,
    metrics: Counters,
}

impl ProfileCache {
    /// Create a cache whose document lives in `working_dir`
    pub fn new(working_dir: impl Into<PathBuf>, max_size_bytes: u64, ttl: Duration) -> Self {
        let working_dir = working_dir.into();
        Self {
            store: DocumentStore::new(working_dir.join(PROFILE_CACHE_FILE)),
            working_dir,
            max_size_bytes,
            ttl,
            metrics: Counters::default(),
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

    /// Configured entry lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current entries in insertion order
    pub async fn entries(&self) -> Vec<ProfileEntry> {
        self.store.load::<ProfileEntry>().await.entries
    }

    /// Return the cached profile for `source` and `options` if still valid
    pub async fn get_cached_profile(&self, source: &Path, options: &ProfileOptions) -> Option<String> {
        let source = self.resolve(source);
        let stat = match SourceStat::read(&source).await {
            Ok(stat) => stat,
            Err(e) => {
                debug!("Profile cache miss for {}: {}", source.display(), e);
                Counters::add(&self.metrics.misses, 1);
                return None;
            }
        };

        let mut doc = self.store.load::<ProfileEntry>().await;
        let position = doc
            .entries
            .iter()
            .position(|e| e.source_path == source && e.options.matches(options));

        let Some(index) = position else {
            if doc.recovered {
                self.persist(&mut doc).await;
            }
            Counters::add(&self.metrics.misses, 1);
            return None;
        };

        let entry = &doc.entries[index];
        let stale = stat.differs_from(entry.source_size, entry.source_timestamp);
        let expired = !stale && is_expired(entry.created_at, self.ttl, Utc::now());

        if stale || expired {
            if expired {
                debug!("Profile for {} expired", source.display());
                Counters::add(&self.metrics.expirations, 1);
            } else {
                debug!("Profile for {} is stale, source changed", source.display());
            }
            doc.entries.remove(index);
            self.persist(&mut doc).await;
            Counters::add(&self.metrics.misses, 1);
            return None;
        }

        Counters::add(&self.metrics.hits, 1);
        debug!("Profile cache hit for {}", source.display());
        Some(doc.entries.swap_remove(index).profile)
    }

    /// Store `profile` for `source` and `options`, then enforce TTL and budget
    pub async fn cache_profile(&self, source: &Path, options: &ProfileOptions, profile: &str) {
        if let Err(e) = self.try_cache_profile(source, options, profile).await {
            Counters::add(&self.metrics.errors, 1);
            warn!("Failed to cache profile for {}: {}", source.display(), e);
        }
    }

    async fn try_cache_profile(
        &self,
        source: &Path,
        options: &ProfileOptions,
        profile: &str,
    ) -> DataMcpResult<()> {
        let source = self.resolve(source);
        let stat = SourceStat::read(&source).await?;

        let mut doc = self.store.load::<ProfileEntry>().await;
        doc.entries
            .retain(|e| !(e.source_path == source && e.options.matches(options)));
        doc.entries.push(ProfileEntry {
            source_path: source.clone(),
            source_timestamp: stat.modified,
            source_size: stat.size,
            options: options.clone(),
            profile: profile.to_string(),
            size: profile.len() as u64,
            created_at: Utc::now(),
        });

        self.enforce_limits(&mut doc);
        doc.recompute_total();
        self.store.save(&doc).await?;
        debug!("Cached profile for {}", source.display());
        Ok(())
    }

    /// Remove every cached profile of `source`, whatever its options
    ///
    /// Returns the number of entries removed.
    pub async fn invalidate(&self, source: &Path) -> usize {
        let source = self.resolve(source);
        let mut doc = self.store.load::<ProfileEntry>().await;
        let before = doc.entries.len();
        doc.entries.retain(|e| e.source_path != source);
        let removed = before - doc.entries.len();

        if removed > 0 || doc.recovered {
            self.persist(&mut doc).await;
        }
        if removed > 0 {
            debug!("Invalidated {} profile(s) for {}", removed, source.display());
        }
        removed
    }

    /// Apply TTL and budget without adding an entry, and drop abandoned temp files
    pub async fn cleanup(&self) -> ProfileCleanup {
        let mut doc = self.store.load::<ProfileEntry>().await;
        let (expired, evicted) = self.enforce_limits(&mut doc);
        if expired + evicted > 0 || doc.recovered {
            self.persist(&mut doc).await;
        }

        let stale_temp_files = match self.store.remove_stale_temp_files(STALE_TEMP_AGE).await {
            Ok(removed) => removed,
            Err(e) => {
                Counters::add(&self.metrics.errors, 1);
                warn!("Profile cache temp file cleanup failed: {}", e);
                0
            }
        };

        let report = ProfileCleanup {
            expired,
            evicted,
            stale_temp_files,
        };
        if report != ProfileCleanup::default() {
            info!(
                "Profile cache cleanup: {} expired, {} evicted, {} temp files",
                expired, evicted, stale_temp_files
            );
        }
        report
    }

    /// Delete the whole document
    pub async fn clear(&self) {
        match self.store.remove().await {
            Ok(()) => info!("Cleared profile cache {}", self.store.path().display()),
            Err(e) => {
                Counters::add(&self.metrics.errors, 1);
                warn!("Failed to clear profile cache: {}", e);
            }
        }
    }

    /// Current counters
    pub fn metrics(&self) -> ProfileCacheMetrics {
        self.metrics.snapshot()
    }

    /// Zero all counters
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// TTL sweep followed by oldest-first eviction; returns (expired, evicted)
    fn enforce_limits(&self, doc: &mut CacheDocument<ProfileEntry>) -> (usize, usize) {
        let expired = expire_older_than(&mut doc.entries, self.ttl, Utc::now()).len();
        let evicted = evict_to_budget(&mut doc.entries, self.max_size_bytes).len();

        Counters::add(&self.metrics.expirations, expired);
        Counters::add(&self.metrics.evictions, evicted);
        if evicted > 0 {
            debug!(
                "Evicted {} profile(s) to stay under {} bytes",
                evicted, self.max_size_bytes
            );
        }
        (expired, evicted)
    }

    async fn persist(&self, doc: &mut CacheDocument<ProfileEntry>) {
        doc.recompute_total();
        if let Err(e) = self.store.save(doc).await {
            Counters::add(&self.metrics.errors, 1);
            warn!("Failed to save profile cache: {}", e);
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}
