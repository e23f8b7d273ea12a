//! datamcp - data tool middleware for AI agents
//!
//! Exposes an external command-line data tool to agent clients and caches
//! the expensive derived artifacts (CSV conversions, profiles) it produces.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod tool;
pub mod workspace;

pub use error::{DataMcpError, DataMcpResult};
pub use workspace::Workspace;
