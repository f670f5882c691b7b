//! Slot readers
//!
//! [`MemorySlotReader`] keeps storage in a map and is what tests and offline
//! tools read from. [`RpcSlotReader`] (feature `client`) asks a node with
//! `eth_getStorageAt`.

use alloy_primitives::{Address, U256};
use slotpath_core::{word_range, LayoutError, SlotReader};
use std::collections::HashMap;

/// In-memory contract storage; slots never written read as zero
#[derive(Debug, Clone, Default)]
pub struct MemorySlotReader {
    slots: HashMap<(Address, U256), [u8; 32]>,
}

impl MemorySlotReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a whole word
    pub fn store(&mut self, contract: Address, slot: U256, word: [u8; 32]) {
        self.slots.insert((contract, slot), word);
    }

    /// Store a full-width unsigned value
    pub fn store_uint(&mut self, contract: Address, slot: U256, value: U256) {
        self.store(contract, slot, value.to_be_bytes::<32>());
    }

    /// Write `bytes` at `offset` (from the low-order end) into an existing word
    pub fn store_packed(
        &mut self,
        contract: Address,
        slot: U256,
        offset: u8,
        bytes: &[u8],
    ) -> Result<(), LayoutError> {
        let Ok(size) = u8::try_from(bytes.len()) else {
            return Err(LayoutError::InvalidLayout(format!(
                "{} bytes do not fit in a slot",
                bytes.len()
            )));
        };
        if offset as usize + size as usize > 32 {
            return Err(LayoutError::InvalidLayout(format!(
                "{} bytes at offset {} cross the slot boundary",
                size, offset
            )));
        }
        let word = self.slots.entry((contract, slot)).or_insert([0u8; 32]);
        word[word_range(offset, size)].copy_from_slice(bytes);
        Ok(())
    }

    /// Number of slots holding a value
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl SlotReader for MemorySlotReader {
    fn read_slot(&self, contract: Address, slot: U256) -> Result<[u8; 32], LayoutError> {
        Ok(self
            .slots
            .get(&(contract, slot))
            .copied()
            .unwrap_or([0u8; 32]))
    }
}

#[cfg(feature = "client")]
pub use rpc::RpcSlotReader;

#[cfg(feature = "client")]
mod rpc {
    use crate::EthereumError;
    use alloy_primitives::{Address, U256};
    use slotpath_core::{LayoutError, SlotReader};
    use tracing::{debug, warn};

    /// Slot reader backed by a node's JSON-RPC endpoint
    ///
    /// # Usage
    ///
    /// ```rust,ignore
    /// let reader = RpcSlotReader::new("http://localhost:8545").with_block_number(19_000_000);
    /// let word = reader.read_slot(contract, U256::ZERO)?;
    /// ```
    #[derive(Debug, Clone)]
    pub struct RpcSlotReader {
        /// RPC endpoint URL for the node
        pub rpc_url: String,
        /// Block parameter passed to `eth_getStorageAt`
        pub block: String,
        client: reqwest::Client,
    }

    impl RpcSlotReader {
        pub fn new(rpc_url: impl Into<String>) -> Self {
            RpcSlotReader {
                rpc_url: rpc_url.into(),
                block: "latest".to_string(),
                client: reqwest::Client::new(),
            }
        }

        /// Read at a block tag (`latest`, `safe`, `finalized`, ...) or hex number
        pub fn with_block(mut self, block: impl Into<String>) -> Self {
            self.block = block.into();
            self
        }

        pub fn with_block_number(self, number: u64) -> Self {
            self.with_block(format!("{:#x}", number))
        }

        /// Read one storage word over JSON-RPC
        pub async fn read_slot_async(
            &self,
            contract: Address,
            slot: U256,
        ) -> Result<[u8; 32], EthereumError> {
            let request = serde_json::json!({
                "jsonrpc": "2.0",
                "method": "eth_getStorageAt",
                "params": [
                    contract.to_string(),
                    format!("{:#x}", slot),
                    self.block,
                ],
                "id": 1
            });
            debug!(%contract, %slot, block = %self.block, "eth_getStorageAt");

            let response = self
                .client
                .post(&self.rpc_url)
                .json(&request)
                .send()
                .await
                .map_err(|e| EthereumError::Request(e.to_string()))?;

            let body: serde_json::Value = response
                .json()
                .await
                .map_err(|e| EthereumError::MalformedResponse(e.to_string()))?;

            parse_storage_response(&body)
        }
    }

    impl SlotReader for RpcSlotReader {
        fn read_slot(&self, contract: Address, slot: U256) -> Result<[u8; 32], LayoutError> {
            match tokio::runtime::Handle::try_current() {
                Ok(_handle) => {
                    // Blocking inside a runtime would stall it, run on a fresh thread
                    warn!("read_slot called inside a tokio runtime, prefer read_slot_async");
                    let reader = self.clone();
                    std::thread::spawn(move || {
                        let rt = tokio::runtime::Runtime::new()
                            .map_err(|e| EthereumError::Runtime(e.to_string()))?;
                        rt.block_on(reader.read_slot_async(contract, slot))
                    })
                    .join()
                    .map_err(|_| LayoutError::SlotRead("reader thread panicked".to_string()))?
                    .map_err(LayoutError::from)
                }
                Err(_) => {
                    let rt = tokio::runtime::Runtime::new()
                        .map_err(|e| EthereumError::Runtime(e.to_string()))?;
                    Ok(rt.block_on(self.read_slot_async(contract, slot))?)
                }
            }
        }
    }

    /// Extract the storage word from an `eth_getStorageAt` response body
    pub(crate) fn parse_storage_response(
        body: &serde_json::Value,
    ) -> Result<[u8; 32], EthereumError> {
        if let Some(error) = body.get("error") {
            return Err(EthereumError::Rpc {
                code: error.get("code").and_then(|c| c.as_i64()).unwrap_or_default(),
                message: error
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        let result = body
            .get("result")
            .and_then(|v| v.as_str())
            .ok_or_else(|| EthereumError::MalformedResponse("no result".to_string()))?;
        let digits = result.strip_prefix("0x").unwrap_or(result);
        // Nodes may drop leading zeros
        let digits = if digits.len() % 2 == 1 {
            format!("0{}", digits)
        } else {
            digits.to_string()
        };
        let bytes = hex::decode(digits)?;
        if bytes.len() > 32 {
            return Err(EthereumError::MalformedResponse(format!(
                "storage value of {} bytes",
                bytes.len()
            )));
        }

        let mut word = [0u8; 32];
        word[32 - bytes.len()..].copy_from_slice(&bytes);
        Ok(word)
    }

}
