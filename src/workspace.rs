//! Per-directory cache ownership
//!
//! A `Workspace` owns the conversion and profile caches of one working
//! directory. Whoever serves requests for that directory constructs it and
//! keeps it for as long as the directory is active.

use crate::cache::{ConversionCache, OrphanCleanup, ProfileCache, ProfileCleanup, ProfileOptions};
use crate::config::CacheConfig;
use crate::error::DataMcpResult;
use crate::tool::{self, CommandRunner};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Caches and settings for one working directory
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    caching: bool,
    conversion: ConversionCache,
    profile: ProfileCache,
}

/// Combined result of a maintenance pass over both caches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkspaceCleanup {
    pub conversion: OrphanCleanup,
    pub profile: ProfileCleanup,
}

impl Workspace {
    /// Create the caches for `dir` using `config`
    pub fn new(dir: impl Into<PathBuf>, config: &CacheConfig) -> Self {
        let dir = dir.into();
        Self {
            conversion: ConversionCache::new(&dir, config.converted_max_bytes),
            profile: ProfileCache::new(&dir, config.profile_max_bytes, config.profile_ttl()),
            caching: config.enabled,
            dir,
        }
    }

    /// Working directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether request handlers consult the caches
    pub fn caching_enabled(&self) -> bool {
        self.caching
    }

    /// Conversion cache of this directory
    pub fn conversion_cache(&self) -> &ConversionCache {
        &self.conversion
    }

    /// Profile cache of this directory
    pub fn profile_cache(&self) -> &ProfileCache {
        &self.profile
    }

    /// Resolve `path` against the working directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        }
    }

    /// CSV path for `source`, converting through the tool when necessary
    ///
    /// When a fresh conversion replaces a registered artifact, profiles keyed
    /// on the old artifact are dropped with it.
    pub async fn ensure_csv(
        &self,
        runner: &dyn CommandRunner,
        source: &Path,
    ) -> DataMcpResult<PathBuf> {
        let source = self.resolve(source);
        if !self.caching {
            return tool::ensure_csv(runner, None, &source).await;
        }

        let previous = self.conversion.lookup(&source).await;
        let csv = tool::ensure_csv(runner, Some(&self.conversion), &source).await?;
        if let Some(old) = previous.filter(|old| *old != csv) {
            self.profile.invalidate(&old).await;
        }
        Ok(csv)
    }

    /// Profile text for `source`, computing it on a cache miss
    ///
    /// Non-CSV inputs are converted first; the profile is keyed on the file
    /// that was actually profiled.
    pub async fn profile(
        &self,
        runner: &dyn CommandRunner,
        source: &Path,
        options: &ProfileOptions,
    ) -> DataMcpResult<String> {
        let csv = self.ensure_csv(runner, source).await?;
        let cache = self.caching.then_some(&self.profile);
        tool::profile(runner, cache, &csv, options).await
    }

    /// Run maintenance on both caches
    pub async fn cleanup(&self) -> WorkspaceCleanup {
        WorkspaceCleanup {
            conversion: self.conversion.cleanup_orphans().await,
            profile: self.profile.cleanup().await,
        }
    }
}
