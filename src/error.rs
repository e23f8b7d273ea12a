//! Error types for datamcp
//!
//! All modules use `DataMcpResult<T>` as their return type. The cache
//! subsystem returns these internally but never lets them escape its public
//! lookup and registration operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for datamcp operations
pub type DataMcpResult<T> = Result<T, DataMcpError>;

/// All errors that can occur in datamcp
#[derive(Error, Debug)]
pub enum DataMcpError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Cache errors
    #[error("Failed to persist cache document {path} after {attempts} attempt(s)")]
    CacheSave {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid cache document {path}: {reason}")]
    CacheDocument { path: PathBuf, reason: String },

    // Tool errors
    #[error("Data tool not found: {0}")]
    ToolNotFound(String),

    #[error("Conversion of {source_path} failed (exit code {code}): {stderr}")]
    ConversionFailed {
        source_path: PathBuf,
        code: i32,
        stderr: String,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl DataMcpError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ToolNotFound(_) => {
                Some("Install the data tool or set [tool].binary in config.toml")
            }
            Self::ConfigInvalid { .. } => Some("Run: datamcp config show"),
            _ => None,
        }
    }
}
