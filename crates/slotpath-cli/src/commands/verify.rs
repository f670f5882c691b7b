//! Verify-layout command implementation

use crate::formatters::{load_layout, write_output};
use anyhow::{Context, Result};
use serde_json::json;
use slotpath_ethereum::{verify_layout, SolcStorageLayout};
use std::path::Path;
use tracing::{error, info};

/// Execute verify-layout command
///
/// Fails when the computed layout and the compiler's disagree.
pub fn cmd_verify_layout(descriptor: &Path, solc_path: &Path, output: Option<&Path>) -> Result<()> {
    info!(
        "Verifying {} against {}",
        descriptor.display(),
        solc_path.display()
    );

    let layout = load_layout(descriptor)?;
    let content = std::fs::read_to_string(solc_path)
        .with_context(|| format!("Failed to read {}", solc_path.display()))?;
    let reference = SolcStorageLayout::from_json(&content)?.to_layout_info(&layout.contract_name);
    if let Err(e) = reference.validate() {
        error!("Reference layout is inconsistent: {}", e);
    }

    let mismatches = verify_layout(&layout, &reference);
    let report = json!({
        "contract_name": layout.contract_name,
        "variables": layout.entries.len(),
        "matches": mismatches.is_empty(),
        "mismatches": mismatches.iter().map(ToString::to_string).collect::<Vec<_>>(),
    });
    write_output(&serde_json::to_string_pretty(&report)?, output)?;

    if !mismatches.is_empty() {
        for mismatch in &mismatches {
            error!("{}", mismatch);
        }
        anyhow::bail!("{} layout mismatches", mismatches.len());
    }
    Ok(())
}
