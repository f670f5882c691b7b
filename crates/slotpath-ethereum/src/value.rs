//! Decoding values out of storage words

use alloy_primitives::{Address, B256, I256, U256};
use slotpath_core::{word_range, LayoutError, TypeTag, WORD_BYTES};
use std::fmt;

/// Bytes `[32 - offset - size, 32 - offset)` of a big-endian storage word
pub fn extract(word: &[u8; 32], offset: u8, size: u8) -> Result<&[u8], LayoutError> {
    if offset as usize + size as usize > WORD_BYTES {
        return Err(LayoutError::InvalidLayout(format!(
            "{} bytes at offset {} cross the slot boundary",
            size, offset
        )));
    }
    Ok(&word[word_range(offset, size)])
}

/// A value decoded from storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotValue {
    Uint(U256),
    Int(I256),
    Address(Address),
    Bool(bool),
    FixedBytes(Vec<u8>),
    /// Whole word of a non-value type (length, mapping placeholder, ...)
    Raw(B256),
}

impl fmt::Display for SlotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotValue::Uint(value) => write!(f, "{}", value),
            SlotValue::Int(value) => write!(f, "{}", value),
            SlotValue::Address(address) => write!(f, "{}", address),
            SlotValue::Bool(value) => write!(f, "{}", value),
            SlotValue::FixedBytes(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            SlotValue::Raw(word) => write!(f, "{}", word),
        }
    }
}

/// Decode the value of type `ty` stored at `offset` in `word`
///
/// Non-value types decode to [`SlotValue::Raw`] with the whole word.
pub fn decode(ty: &TypeTag, word: &[u8; 32], offset: u8) -> Result<SlotValue, LayoutError> {
    let Some(size) = ty.value_bytes() else {
        return Ok(SlotValue::Raw(B256::from(*word)));
    };
    let bytes = extract(word, offset, size)?;

    Ok(match ty {
        TypeTag::Uint(_) => SlotValue::Uint(U256::from_be_slice(bytes)),
        TypeTag::Int(_) => {
            let fill = if bytes[0] & 0x80 != 0 { 0xff } else { 0x00 };
            let mut full = [fill; 32];
            full[32 - bytes.len()..].copy_from_slice(bytes);
            SlotValue::Int(I256::from_raw(U256::from_be_bytes(full)))
        }
        TypeTag::Address => SlotValue::Address(Address::from_slice(bytes)),
        TypeTag::Bool => SlotValue::Bool(bytes[0] != 0),
        _ => SlotValue::FixedBytes(bytes.to_vec()),
    })
}

/// Encoding of a `bytes`/`string` base word
///
/// Values of up to 31 bytes live in the high-order bytes of the base slot with
/// `2 * len` in the lowest byte. Longer values store `2 * len + 1` in the base
/// slot and their data out of line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteStringEncoding {
    Short { len: usize },
    Long { len: usize },
}

impl ByteStringEncoding {
    pub fn decode(word: &[u8; 32]) -> Result<Self, LayoutError> {
        let low = word[31];
        if low & 1 == 0 {
            let len = (low / 2) as usize;
            if len > 31 || word[..31].iter().skip(len).any(|b| *b != 0) {
                return Err(LayoutError::InvalidLayout(format!(
                    "malformed short byte string word {}",
                    B256::from(*word)
                )));
            }
            return Ok(ByteStringEncoding::Short { len });
        }

        let len = (U256::from_be_bytes(*word) - U256::from(1)) / U256::from(2);
        let len = usize::try_from(len).map_err(|_| {
            LayoutError::InvalidLayout(format!("byte string length {} is too large", len))
        })?;
        Ok(ByteStringEncoding::Long { len })
    }

    pub fn len(&self) -> usize {
        match self {
            ByteStringEncoding::Short { len } | ByteStringEncoding::Long { len } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
