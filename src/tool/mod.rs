//! Data tool integration
//!
//! Request handlers that sit in front of the external data tool:
//! - conversion of spreadsheets and JSON-lines to CSV
//! - profiling of tabular files
//!
//! Both consult their cache before invoking the tool.

pub mod convert;
pub mod profile;
mod runner;

pub use convert::{artifact_path, ensure_csv, scratch_artifact_path, SourceFormat};
pub use profile::{compute_profile, profile, profile_commands};
pub use runner::{CommandOutput, CommandRunner, ToolRunner};
