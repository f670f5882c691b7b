//! Mapping key and array index encoding
//!
//! Solidity hashes a mapping key together with the mapping's slot. Value-type
//! keys are first widened to a full 32-byte word, each according to its own
//! rule:
//!
//! | key type  | encoding                                   |
//! |-----------|--------------------------------------------|
//! | `uintN`   | big-endian, left-padded with zeros         |
//! | `intN`    | two's complement, sign-extended to 256 bit |
//! | `address` | left-padded with zeros                     |
//! | `bool`    | `0` or `1`, left-padded                    |
//! | `bytesN`  | right-padded with zeros                    |
//!
//! `bytes` and `string` keys are hashed as their raw, unpadded contents.

use alloy_primitives::{Address, B256, U256};
use slotpath_core::{LayoutError, TypeTag};

/// A mapping key encoded for hashing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MappingKey {
    /// Fixed-width key widened to a full word
    Word([u8; 32]),
    /// `bytes` or `string` key, hashed without padding
    Packed(Vec<u8>),
}

impl MappingKey {
    /// Parse a textual key for the declared key type
    ///
    /// Integers accept decimal or `0x` hex (and a leading `-` for signed
    /// types), addresses and fixed bytes accept hex with or without `0x`,
    /// booleans accept `true`/`false`/`1`/`0`, strings are taken verbatim with
    /// optional surrounding double quotes, and dynamic `bytes` are hex.
    ///
    /// # Errors
    ///
    /// `LayoutError::KeyEncoding` if the text does not denote a value of the
    /// key type, or the type cannot be a mapping key.
    pub fn parse(key_type: &TypeTag, raw: &str) -> Result<Self, LayoutError> {
        let raw = raw.trim();
        match key_type {
            TypeTag::Uint(bits) => Self::from_uint(parse_uint(raw)?, *bits),
            TypeTag::Int(bits) => {
                let (negative, magnitude) = match raw.strip_prefix('-') {
                    Some(rest) => (true, parse_uint(rest.trim())?),
                    None => (false, parse_uint(raw)?),
                };
                Self::from_int(negative, magnitude, *bits)
            }
            TypeTag::Address => {
                let bytes = decode_hex(raw)?;
                if bytes.len() != 20 {
                    return Err(LayoutError::key_encoding(format!(
                        "address key must be 20 bytes, got {}",
                        bytes.len()
                    )));
                }
                Ok(Address::from_slice(&bytes).into())
            }
            TypeTag::Bool => match raw {
                "true" | "1" => Ok(true.into()),
                "false" | "0" => Ok(false.into()),
                _ => Err(LayoutError::key_encoding(format!(
                    "'{}' is not a boolean",
                    raw
                ))),
            },
            TypeTag::FixedBytes(width) => {
                let bytes = decode_hex(raw)?;
                if bytes.len() > *width as usize {
                    return Err(LayoutError::key_encoding(format!(
                        "{} bytes do not fit in bytes{}",
                        bytes.len(),
                        width
                    )));
                }
                let mut word = [0u8; 32];
                word[..bytes.len()].copy_from_slice(&bytes);
                Ok(MappingKey::Word(word))
            }
            TypeTag::String => {
                let text = raw
                    .strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .unwrap_or(raw);
                Ok(MappingKey::Packed(text.as_bytes().to_vec()))
            }
            TypeTag::Bytes => Ok(MappingKey::Packed(decode_hex(raw)?)),
            other => Err(LayoutError::key_encoding(format!(
                "type {} cannot be used as a mapping key",
                other
            ))),
        }
    }

    /// Encode an unsigned integer key, checking it fits in `bits`
    pub fn from_uint(value: U256, bits: u16) -> Result<Self, LayoutError> {
        if bits < 256 && value >> (bits as usize) != U256::ZERO {
            return Err(LayoutError::key_encoding(format!(
                "{} does not fit in uint{}",
                value, bits
            )));
        }
        Ok(MappingKey::Word(value.to_be_bytes::<32>()))
    }

    /// Encode a signed integer key given as sign and magnitude
    pub fn from_int(negative: bool, magnitude: U256, bits: u16) -> Result<Self, LayoutError> {
        let limit = U256::from(1) << ((bits - 1) as usize);
        let in_range = if negative {
            magnitude <= limit
        } else {
            magnitude < limit
        };
        if !in_range {
            return Err(LayoutError::key_encoding(format!(
                "{}{} does not fit in int{}",
                if negative { "-" } else { "" },
                magnitude,
                bits
            )));
        }
        let value = if negative {
            U256::ZERO.wrapping_sub(magnitude)
        } else {
            magnitude
        };
        Ok(MappingKey::Word(value.to_be_bytes::<32>()))
    }

    /// Bytes fed to the hash ahead of the slot word
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            MappingKey::Word(word) => word,
            MappingKey::Packed(bytes) => bytes,
        }
    }
}

impl From<U256> for MappingKey {
    fn from(value: U256) -> Self {
        MappingKey::Word(value.to_be_bytes::<32>())
    }
}

impl From<u64> for MappingKey {
    fn from(value: u64) -> Self {
        U256::from(value).into()
    }
}

impl From<Address> for MappingKey {
    fn from(address: Address) -> Self {
        MappingKey::Word(address.into_word().0)
    }
}

impl From<bool> for MappingKey {
    fn from(value: bool) -> Self {
        U256::from(value as u8).into()
    }
}

impl From<B256> for MappingKey {
    fn from(value: B256) -> Self {
        MappingKey::Word(value.0)
    }
}

impl From<&str> for MappingKey {
    fn from(value: &str) -> Self {
        MappingKey::Packed(value.as_bytes().to_vec())
    }
}

/// Parse an array index (decimal or `0x` hex)
pub fn parse_index(raw: &str) -> Result<U256, LayoutError> {
    parse_uint(raw.trim())
}

fn parse_uint(raw: &str) -> Result<U256, LayoutError> {
    let (digits, radix) = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (raw, 10),
    };
    if digits.is_empty() {
        return Err(LayoutError::key_encoding(format!(
            "'{}' is not an integer",
            raw
        )));
    }
    U256::from_str_radix(digits, radix)
        .map_err(|e| LayoutError::key_encoding(format!("'{}' is not a 256-bit integer: {}", raw, e)))
}

fn decode_hex(raw: &str) -> Result<Vec<u8>, LayoutError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    hex::decode(digits).map_err(|e| LayoutError::key_encoding(format!("'{}': {}", raw, e)))
}
