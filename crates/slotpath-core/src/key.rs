//! Resolved storage coordinates
//!
//! These are the values a resolver hands to a slot reader: a 256-bit slot
//! index plus the byte range inside the 32-byte word that holds the value.

use crate::TypeTag;
use alloc::{string::String, vec::Vec};
use alloy_primitives::U256;
use core::ops::Range;
use serde::{Deserialize, Serialize};

/// A resolved storage location
///
/// `offset` follows the compiler convention: it counts bytes from the
/// low-order (rightmost) end of the big-endian word, so a `bool` packed after
/// an `address` has offset 20 and occupies word byte 11.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedAddress {
    /// The query this address was resolved from
    pub query: String,
    /// Slot holding the value (first slot for multi-slot values)
    pub slot: U256,
    /// Byte offset within the slot, from the low-order end
    pub offset: u8,
    /// Width of the value inside the slot in bytes
    pub size: u8,
    /// Number of slots the addressed value spans
    pub slots: U256,
    /// Type of the addressed value
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
    /// Commitment of the layout this address was resolved against
    pub layout_commitment: [u8; 32],
}

impl ResolvedAddress {
    /// The slot index as a 32-byte big-endian key
    pub fn slot_key(&self) -> [u8; 32] {
        self.slot.to_be_bytes::<32>()
    }
}

/// Byte range `[32 - offset - size, 32 - offset)` of a packed value
///
/// Callers guarantee `offset + size <= 32`.
pub fn word_range(offset: u8, size: u8) -> Range<usize> {
    let end = 32 - offset as usize;
    end - size as usize..end
}

/// Storage coordinates of a dynamic `bytes` or `string` value
///
/// The base slot holds the length (and, for values shorter than 32 bytes, the
/// data itself). Long values are stored out of line starting at `data_start`,
/// 32 bytes per slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ByteStringLocation {
    /// Slot holding the length word
    pub length_slot: U256,
    /// First slot of the out-of-line data
    pub data_start: U256,
}

impl ByteStringLocation {
    /// Slots holding `len` bytes of out-of-line data
    pub fn data_slots(&self, len: usize) -> Vec<U256> {
        (0..len.div_ceil(32))
            .map(|i| self.data_start.wrapping_add(U256::from(i)))
            .collect()
    }
}
