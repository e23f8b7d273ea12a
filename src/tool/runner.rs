//! Data tool command runner
//!
//! Provides a trait for invoking the external data tool so handlers can be
//! exercised against a fake runner in tests.

use crate::error::{DataMcpError, DataMcpResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Captured result of one tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit code, -1 when terminated by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with code 0
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Abstract interface to the data tool
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` (a tool subcommand such as `excel`) with `args`
    async fn run(&self, command: &str, args: &[String]) -> DataMcpResult<CommandOutput>;
}

/// Runs the configured data tool binary
#[derive(Debug, Clone)]
pub struct ToolRunner {
    binary: PathBuf,
}

impl ToolRunner {
    /// Create a runner for `binary`
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl CommandRunner for ToolRunner {
    async fn run(&self, command: &str, args: &[String]) -> DataMcpResult<CommandOutput> {
        debug!("Executing: {} {} {:?}", self.binary.display(), command, args);

        let output = Command::new(&self.binary)
            .arg(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DataMcpError::ToolNotFound(self.binary.display().to_string())
                } else {
                    DataMcpError::command_failed(
                        format!("{} {}", self.binary.display(), command),
                        e,
                    )
                }
            })?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_tool_not_found() {
        let runner = ToolRunner::new("/nonexistent/datamcp-test-tool");
        let err = runner.run("stats", &[]).await.unwrap_err();
        assert!(matches!(err, DataMcpError::ToolNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_exit_code_and_output() {
        let runner = ToolRunner::new("sh");
        let output = runner
            .run("-c", &["echo out; echo err >&2; exit 3".to_string()])
            .await
            .unwrap();

        assert_eq!(output.exit_code, 3);
        assert!(!output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }
}
