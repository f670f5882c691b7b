//! Reading typed values of a deployed contract

use crate::{
    slots::resolve_dynamic_bytes_or_string,
    value::{decode, ByteStringEncoding, SlotValue},
    SolidityResolver,
};
use alloy_primitives::{Address, U256};
use slotpath_core::{LayoutError, ResolvedAddress, SlotLayout, SlotReader, SlotResolver, TypeTag};
use tracing::debug;

/// Resolves queries against a layout and reads them from one contract
///
/// # Examples
///
/// ```rust,ignore
/// let inspector = StorageInspector::new(&layout, &reader, contract);
/// let supply = inspector.read_value("totalSupply")?;
/// let holders = inspector.read_array("holders")?;
/// ```
pub struct StorageInspector<'a, R> {
    layout: &'a SlotLayout,
    reader: R,
    contract: Address,
    max_slots: u64,
}

/// Default cap on the slots a single array or byte-string read may touch
pub const DEFAULT_MAX_READ_SLOTS: u64 = 1 << 16;

impl<'a, R: SlotReader> StorageInspector<'a, R> {
    pub fn new(layout: &'a SlotLayout, reader: R, contract: Address) -> Self {
        StorageInspector {
            layout,
            reader,
            contract,
            max_slots: DEFAULT_MAX_READ_SLOTS,
        }
    }

    /// Cap the number of slots `read_array` and `read_bytes` may read
    pub fn with_max_slots(mut self, max_slots: u64) -> Self {
        self.max_slots = max_slots;
        self
    }

    /// Lengths come from storage and are untrusted
    fn check_slot_count(&self, query: &str, slots: U256) -> Result<u64, LayoutError> {
        match u64::try_from(slots) {
            Ok(count) if count <= self.max_slots => Ok(count),
            _ => Err(LayoutError::InvalidLayout(format!(
                "'{}' would read {} slots, limit is {}",
                query, slots, self.max_slots
            ))),
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn resolve(&self, query: &str) -> Result<ResolvedAddress, LayoutError> {
        SolidityResolver.resolve(self.layout, query)
    }

    /// Raw word holding the queried value
    pub fn read_word(&self, query: &str) -> Result<[u8; 32], LayoutError> {
        let address = self.resolve(query)?;
        self.reader.read_slot(self.contract, address.slot)
    }

    /// Decoded value; non-value types yield their base word
    pub fn read_value(&self, query: &str) -> Result<SlotValue, LayoutError> {
        let address = self.resolve(query)?;
        let word = self.reader.read_slot(self.contract, address.slot)?;
        decode(&address.type_tag, &word, address.offset)
    }

    /// Length of a dynamic array, or the declared length of a fixed one
    pub fn array_len(&self, query: &str) -> Result<U256, LayoutError> {
        let address = self.resolve(query)?;
        match &address.type_tag {
            TypeTag::DynamicArray(_) => {
                let word = self.reader.read_slot(self.contract, address.slot)?;
                Ok(U256::from_be_bytes(word))
            }
            TypeTag::FixedArray(_, len) => Ok(U256::from(*len)),
            other => Err(LayoutError::PathResolution(format!(
                "'{}' is {}, not an array",
                query, other
            ))),
        }
    }

    /// Every element of a value-type array
    pub fn read_array(&self, query: &str) -> Result<Vec<SlotValue>, LayoutError> {
        let len = self.check_slot_count(query, self.array_len(query)?)?;
        debug!(query, len, "reading array");

        (0..len)
            .map(|i| self.read_value(&format!("{}[{}]", query.trim(), i)))
            .collect()
    }

    /// Full contents of a `bytes` or `string` value, short or long form
    pub fn read_bytes(&self, query: &str) -> Result<Vec<u8>, LayoutError> {
        let address = self.resolve(query)?;
        if !matches!(address.type_tag, TypeTag::Bytes | TypeTag::String) {
            return Err(LayoutError::PathResolution(format!(
                "'{}' is {}, not bytes or string",
                query, address.type_tag
            )));
        }

        let word = self.reader.read_slot(self.contract, address.slot)?;
        match ByteStringEncoding::decode(&word)? {
            ByteStringEncoding::Short { len } => Ok(word[..len].to_vec()),
            ByteStringEncoding::Long { len } => {
                self.check_slot_count(query, U256::from(len.div_ceil(32)))?;
                let location = resolve_dynamic_bytes_or_string(address.slot);
                let mut data = Vec::with_capacity(len);
                for slot in location.data_slots(len) {
                    data.extend_from_slice(&self.reader.read_slot(self.contract, slot)?);
                }
                data.truncate(len);
                Ok(data)
            }
        }
    }

    /// `read_bytes` as UTF-8
    pub fn read_string(&self, query: &str) -> Result<String, LayoutError> {
        String::from_utf8(self.read_bytes(query)?)
            .map_err(|e| LayoutError::Serialization(format!("'{}' is not UTF-8: {}", query, e)))
    }
}
