//! Read command implementation
//!
//! Resolves a query and fetches the value from a node with
//! `eth_getStorageAt`.

use crate::config::Config;
use crate::formatters::{load_layout, write_output};
use alloy_primitives::Address;
use anyhow::{anyhow, Context, Result};
use serde_json::json;
use slotpath_core::{SlotResolver, TypeTag};
use slotpath_ethereum::{decode, RpcSlotReader, SolidityResolver, StorageInspector};
use std::path::Path;
use tracing::info;

/// Connection settings for a read, after layering flags over config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadTarget {
    pub rpc_url: String,
    pub contract: Address,
    pub block: Option<String>,
}

impl ReadTarget {
    pub fn from_args(
        config: &Config,
        contract: Option<&str>,
        rpc: Option<&str>,
        block: Option<&str>,
    ) -> Result<Self> {
        let rpc_url = rpc
            .map(str::to_string)
            .or_else(|| config.rpc_url.clone())
            .ok_or_else(|| anyhow!("No RPC endpoint: pass --rpc or set SLOTPATH_RPC_URL"))?;
        let contract = contract
            .map(str::to_string)
            .or_else(|| config.contract.clone())
            .ok_or_else(|| anyhow!("No contract: pass --contract or set SLOTPATH_CONTRACT"))?;
        let contract: Address = contract
            .parse()
            .with_context(|| format!("Invalid contract address '{}'", contract))?;
        let block = block.map(str::to_string).or_else(|| config.block.clone());

        Ok(ReadTarget {
            rpc_url,
            contract,
            block,
        })
    }

    /// Decimal block numbers are sent as hex quantities, anything else as a tag
    pub fn reader(&self) -> RpcSlotReader {
        let reader = RpcSlotReader::new(self.rpc_url.clone());
        match self.block.as_deref() {
            None => reader,
            Some(block) => match block.parse::<u64>() {
                Ok(number) => reader.with_block_number(number),
                Err(_) => reader.with_block(block),
            },
        }
    }
}

/// Execute read command
pub async fn cmd_read(
    query: &str,
    layout_path: &Path,
    target: ReadTarget,
    output: Option<&Path>,
) -> Result<()> {
    info!(
        "Reading '{}' from {} via {}",
        query, target.contract, target.rpc_url
    );

    let layout = load_layout(layout_path)?;
    let address = SolidityResolver.resolve(&layout, query)?;
    let reader = target.reader();

    let word = reader.read_slot_async(target.contract, address.slot).await?;
    let value = match address.type_tag {
        // Long byte strings span several slots, read them off the runtime
        TypeTag::Bytes | TypeTag::String => {
            let query = query.to_string();
            let is_string = address.type_tag == TypeTag::String;
            let contract = target.contract;
            tokio::task::spawn_blocking(move || -> Result<String> {
                let inspector = StorageInspector::new(&layout, &reader, contract);
                if is_string {
                    Ok(inspector.read_string(&query)?)
                } else {
                    Ok(format!("0x{}", hex::encode(inspector.read_bytes(&query)?)))
                }
            })
            .await??
        }
        _ => decode(&address.type_tag, &word, address.offset)?.to_string(),
    };

    let result = json!({
        "query": query,
        "contract": target.contract.to_string(),
        "slot": format!("0x{}", hex::encode(address.slot_key())),
        "offset": address.offset,
        "type": address.type_tag.to_string(),
        "word": format!("0x{}", hex::encode(word)),
        "value": value,
    });
    write_output(&serde_json::to_string_pretty(&result)?, output)?;
    Ok(())
}
