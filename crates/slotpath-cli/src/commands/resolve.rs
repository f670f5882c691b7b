//! Resolve command implementations
//!
//! Handles single queries, enumeration of every static location, and batch
//! resolution from a file.

use crate::cli::OutputFormat;
use crate::formatters::{format_resolved, format_resolved_all, load_layout, write_output};
use anyhow::{Context, Result};
use slotpath_core::SlotResolver;
use slotpath_ethereum::SolidityResolver;
use std::path::Path;
use tracing::{error, info};

/// Execute resolve command
pub fn cmd_resolve(
    query: &str,
    layout_path: &Path,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    info!(
        "Resolving query '{}' with layout {}",
        query,
        layout_path.display()
    );

    let layout = load_layout(layout_path)?;
    let address = SolidityResolver.resolve(&layout, query)?;

    let content = format_resolved(&address, format)?;
    write_output(&content, output)?;
    Ok(())
}

/// Execute resolve-all command
pub fn cmd_resolve_all(
    layout_path: &Path,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    info!("Resolving all locations from layout {}", layout_path.display());

    let layout = load_layout(layout_path)?;
    let addresses = SolidityResolver.resolve_all(&layout)?;
    info!("Resolved {} locations", addresses.len());

    let content = format_resolved_all(&addresses, format)?;
    write_output(&content, output)?;
    Ok(())
}

/// Execute batch-resolve command
///
/// Blank lines and lines starting with `#` are skipped. Every query is
/// attempted; the command fails after writing the successful results if any
/// query did not resolve.
pub fn cmd_batch_resolve(
    queries_file: &Path,
    layout_path: &Path,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    info!(
        "Resolving queries from {} with layout {}",
        queries_file.display(),
        layout_path.display()
    );

    let queries = std::fs::read_to_string(queries_file)
        .with_context(|| format!("Failed to read {}", queries_file.display()))?;
    let layout = load_layout(layout_path)?;

    let mut results = Vec::new();
    let mut failed = 0usize;
    for query in queries
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
    {
        match SolidityResolver.resolve(&layout, query) {
            Ok(address) => results.push(address),
            Err(e) => {
                error!("Failed to resolve '{}': {}", query, e);
                failed += 1;
            }
        }
    }

    let content = format_resolved_all(&results, format)?;
    write_output(&content, output)?;

    if failed > 0 {
        anyhow::bail!("{} of {} queries failed", failed, failed + results.len());
    }
    info!("Resolved {} queries", results.len());
    Ok(())
}
