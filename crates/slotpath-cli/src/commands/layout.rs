//! Layout command implementation

use crate::cli::LayoutFormat;
use crate::formatters::{format_layout, load_layout, write_output};
use anyhow::Result;
use std::path::Path;
use tracing::info;

/// Execute layout command
pub fn cmd_layout(descriptor: &Path, format: LayoutFormat, output: Option<&Path>) -> Result<()> {
    info!("Assigning base slots for {}", descriptor.display());

    let layout = load_layout(descriptor)?;
    let content = format_layout(&layout, format)?;
    write_output(&content, output)?;

    if output.is_some() {
        println!("Storage layout assigned successfully:");
        println!("  • Contract: {}", layout.contract_name);
        println!("  • Variables: {}", layout.entries.len());
        println!("  • Slots used: {}", layout.total_slots());
        println!("  • Commitment: {}", hex::encode(layout.commitment()));
    }

    Ok(())
}
