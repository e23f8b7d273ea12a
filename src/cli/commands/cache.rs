//! Cache command - inspect and maintain the derived-artifact caches

use crate::cache::CacheEntry;
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::error::DataMcpResult;
use crate::workspace::{Workspace, WorkspaceCleanup};
use console::style;
use serde::Serialize;
use std::path::PathBuf;

/// Execute the cache command
pub async fn execute(args: CacheArgs, workspace: &Workspace) -> DataMcpResult<()> {
    match args.action {
        CacheAction::Status { format } => show_status(workspace, format).await,
        CacheAction::Cleanup { format } => {
            let report = workspace.cleanup().await;
            print_cleanup(&report, format)
        }
        CacheAction::Clear => {
            workspace.profile_cache().clear().await;
            println!("{} Profile cache cleared", style("[OK]").green());
            Ok(())
        }
    }
}

/// Format bytes as human-readable size (e.g., "1.5 MB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[derive(Debug, Serialize)]
struct CacheStatus {
    name: &'static str,
    document: PathBuf,
    entries: usize,
    total_bytes: u64,
    limit_bytes: u64,
}

/// Totals are entry footprints, the figure each budget is enforced against
async fn collect_status(workspace: &Workspace) -> [CacheStatus; 2] {
    let conversion = workspace.conversion_cache();
    let conversions = conversion.entries().await;
    let profile = workspace.profile_cache();
    let profiles = profile.entries().await;

    [
        CacheStatus {
            name: "conversion",
            document: conversion.document_path().to_path_buf(),
            entries: conversions.len(),
            total_bytes: conversions.iter().map(CacheEntry::footprint).sum(),
            limit_bytes: conversion.max_size_bytes(),
        },
        CacheStatus {
            name: "profile",
            document: profile.document_path().to_path_buf(),
            entries: profiles.len(),
            total_bytes: profiles.iter().map(CacheEntry::footprint).sum(),
            limit_bytes: profile.max_size_bytes(),
        },
    ]
}

async fn show_status(workspace: &Workspace, format: OutputFormat) -> DataMcpResult<()> {
    let statuses = collect_status(workspace).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&statuses)?),
        OutputFormat::Table => {
            println!(
                "{:<12} {:<8} {:<12} {:<12} {}",
                style("CACHE").bold(),
                style("ENTRIES").bold(),
                style("SIZE").bold(),
                style("LIMIT").bold(),
                style("DOCUMENT").bold()
            );
            println!("{}", "-".repeat(80));
            for status in &statuses {
                println!(
                    "{:<12} {:<8} {:<12} {:<12} {}",
                    status.name,
                    status.entries,
                    format_bytes(status.total_bytes),
                    format_bytes(status.limit_bytes),
                    status.document.display()
                );
            }
            if !workspace.caching_enabled() {
                println!();
                println!("{} Caching is disabled in config", style("[WARN]").yellow());
            }
        }
    }

    Ok(())
}

fn print_cleanup(report: &WorkspaceCleanup, format: OutputFormat) -> DataMcpResult<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Table => {
            println!(
                "{} Conversion cache: {} orphaned entries, {} temp files removed",
                style("[OK]").green(),
                report.conversion.orphaned_entries,
                report.conversion.stale_temp_files
            );
            println!(
                "{} Profile cache: {} expired, {} evicted, {} temp files removed",
                style("[OK]").green(),
                report.profile.expired,
                report.profile.evicted,
                report.profile.stale_temp_files
            );
        }
    }
    Ok(())
}
