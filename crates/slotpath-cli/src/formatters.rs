//! Output formatting and file helpers
//!
//! This module converts layouts and resolved addresses into the output
//! formats and handles writing to files or stdout.

use crate::cli::{LayoutFormat, OutputFormat};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use slotpath_core::{ContractDescriptor, ResolvedAddress, SlotLayout};
use slotpath_ethereum::assign_base_slots;
use std::path::Path;

/// Hex-encoded form of a resolved address
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotQuery {
    /// Original query string
    pub query: String,
    /// Slot index as a 32-byte hex key
    pub slot: String,
    /// Byte offset within the slot, from the low-order end
    pub offset: u8,
    /// Value width in bytes
    pub size: u8,
    /// Layout commitment (hex encoded)
    pub layout_commitment: String,
}

impl From<&ResolvedAddress> for SlotQuery {
    fn from(address: &ResolvedAddress) -> Self {
        SlotQuery {
            query: address.query.clone(),
            slot: format!("0x{}", hex::encode(address.slot_key())),
            offset: address.offset,
            size: address.size,
            layout_commitment: hex::encode(address.layout_commitment),
        }
    }
}

/// TOML documents need a table at the top level
#[derive(Serialize)]
struct AddressList<'a, T> {
    addresses: &'a [T],
}

pub fn write_output(content: &str, output_path: Option<&Path>) -> Result<()> {
    if let Some(path) = output_path {
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Output written to {}", path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

pub fn load_descriptor(path: &Path) -> Result<ContractDescriptor> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read descriptor {}", path.display()))?;
    ContractDescriptor::from_json(&content)
        .with_context(|| format!("Failed to parse descriptor {}", path.display()))
}

/// Load a descriptor and assign its base slots
pub fn load_layout(path: &Path) -> Result<SlotLayout> {
    let descriptor = load_descriptor(path)?;
    Ok(assign_base_slots(&descriptor)?)
}

pub fn format_layout(layout: &SlotLayout, format: LayoutFormat) -> Result<String> {
    match format {
        LayoutFormat::Json => Ok(serde_json::to_string_pretty(layout)?),
        LayoutFormat::Toml => Ok(toml::to_string_pretty(layout)?),
        LayoutFormat::Solc => Ok(serde_json::to_string_pretty(&layout.to_layout_info())?),
    }
}

pub fn format_resolved(address: &ResolvedAddress, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(address)?),
        OutputFormat::Compact => Ok(serde_json::to_string_pretty(&SlotQuery::from(address))?),
        OutputFormat::Toml => Ok(toml::to_string_pretty(address)?),
    }
}

pub fn format_resolved_all(addresses: &[ResolvedAddress], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(addresses)?),
        OutputFormat::Compact => {
            let compact: Vec<SlotQuery> = addresses.iter().map(SlotQuery::from).collect();
            Ok(serde_json::to_string_pretty(&compact)?)
        }
        OutputFormat::Toml => Ok(toml::to_string_pretty(&AddressList { addresses })?),
    }
}
