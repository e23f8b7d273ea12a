//! Conversion of non-CSV inputs through the data tool
//!
//! Spreadsheets and JSON-lines files are turned into CSV artifacts next to
//! the source. The conversion cache is consulted first so a repeated request
//! for an unchanged source reuses the previous artifact.

use crate::cache::ConversionCache;
use crate::error::{DataMcpError, DataMcpResult};
use crate::tool::runner::CommandRunner;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

/// Input formats the handler knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// xlsx, xls, xlsm, xlsb, ods
    Spreadsheet,
    /// jsonl, ndjson
    JsonLines,
    /// Anything the tool reads directly
    Native,
}

impl SourceFormat {
    /// Detect the format from the file extension
    pub fn detect(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Self::Spreadsheet,
            "jsonl" | "ndjson" => Self::JsonLines,
            _ => Self::Native,
        }
    }

    /// Tool subcommand that converts this format to CSV
    pub fn command(&self) -> Option<&'static str> {
        match self {
            Self::Spreadsheet => Some("excel"),
            Self::JsonLines => Some("jsonl"),
            Self::Native => None,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spreadsheet => write!(f, "spreadsheet"),
            Self::JsonLines => write!(f, "jsonl"),
            Self::Native => write!(f, "native"),
        }
    }
}

/// Fresh artifact path next to `source`: `<name>.converted.<token>.csv`
pub fn artifact_path(source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    let token = Uuid::new_v4().simple().to_string();
    source.with_file_name(format!("{}.converted.{}.csv", name, &token[..16]))
}

/// Fixed artifact path next to `source`: `<name>.converted.csv`
///
/// Used when nothing records the artifact, so repeat conversions overwrite
/// one file instead of accumulating new ones.
pub fn scratch_artifact_path(source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    source.with_file_name(format!("{}.converted.csv", name))
}

/// Return a CSV path for `source`, converting it if needed
///
/// Native inputs are returned unchanged. With a cache, a registered artifact
/// that is still valid is reused and touched; otherwise the conversion runs
/// and its output is registered. Without a cache the output always goes to
/// [`scratch_artifact_path`].
pub async fn ensure_csv(
    runner: &dyn CommandRunner,
    cache: Option<&ConversionCache>,
    source: &Path,
) -> DataMcpResult<PathBuf> {
    let format = SourceFormat::detect(source);
    let Some(command) = format.command() else {
        return Ok(source.to_path_buf());
    };

    if !fs::try_exists(source).await.unwrap_or(false) {
        return Err(DataMcpError::PathNotFound(source.to_path_buf()));
    }

    if let Some(cache) = cache {
        if let Some(candidate) = cache.lookup(source).await {
            if let Some(artifact) = cache.get_valid_artifact(source, &candidate).await {
                cache.touch(source).await;
                info!("Reusing converted file {}", artifact.display());
                return Ok(artifact);
            }
        }
    }

    let artifact = match cache {
        Some(_) => artifact_path(source),
        None => scratch_artifact_path(source),
    };
    let args = vec![
        source.to_string_lossy().into_owned(),
        "--output".to_string(),
        artifact.to_string_lossy().into_owned(),
    ];

    debug!("Converting {} input {}", format, source.display());
    let output = runner.run(command, &args).await?;
    if !output.success() {
        // The tool may leave a partial file behind
        let _ = fs::remove_file(&artifact).await;
        return Err(DataMcpError::ConversionFailed {
            source_path: source.to_path_buf(),
            code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        });
    }

    if let Some(cache) = cache {
        cache.register_artifact(source, &artifact).await;
    }
    info!("Converted {} to {}", source.display(), artifact.display());
    Ok(artifact)
}
