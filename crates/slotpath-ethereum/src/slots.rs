//! Keccak slot derivation for dynamic containers
//!
//! Values whose size is not known when the contract is compiled live at
//! addresses derived from their container's base slot:
//!
//! - dynamic array element `i`: `keccak256(pad32(base)) + i * slotsPerElement`
//! - mapping entry: `keccak256(encode(key) ++ pad32(base))`
//! - long `bytes`/`string` data: `keccak256(pad32(base))`, 32 bytes per slot
//!
//! All additions wrap modulo 2^256, as the EVM's slot space does.

use crate::MappingKey;
use alloy_primitives::U256;
use slotpath_core::ByteStringLocation;
use tiny_keccak::{Hasher, Keccak};
use tracing::debug;

/// 32-byte Keccak256 hash of the input
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

/// First slot of the out-of-line data of a container at `base_slot`
pub fn element_root(base_slot: U256) -> U256 {
    let root = U256::from_be_bytes(keccak256(&base_slot.to_be_bytes::<32>()));
    debug!(base = %base_slot, root = %root, "derived element root");
    root
}

/// Slots taken by one array element of `element_bytes` bytes, at least one
pub fn slots_per_element(element_bytes: u64) -> U256 {
    U256::from(element_bytes.div_ceil(32).max(1))
}

/// Slot of element `index` of a dynamic array declared at `base_slot`
pub fn resolve_dynamic_array_element(
    base_slot: U256,
    index: U256,
    slots_per_element: U256,
) -> U256 {
    element_root(base_slot).wrapping_add(index.wrapping_mul(slots_per_element))
}

/// Slot of `array[i][j]...` for nested dynamic arrays of single-slot elements
///
/// Every level but the last holds the length of an inner array at
/// `root + i`, which in turn is the base slot for the next level.
pub fn resolve_nested_dynamic_array_element(base_slot: U256, indices: &[U256]) -> U256 {
    indices.iter().fold(base_slot, |slot, index| {
        element_root(slot).wrapping_add(*index)
    })
}

/// Slot of `mapping[key]` for a mapping declared at `base_slot`
pub fn resolve_mapping_entry(base_slot: U256, key: &MappingKey) -> U256 {
    let key_bytes = key.as_bytes();
    let mut data = Vec::with_capacity(key_bytes.len() + 32);
    data.extend_from_slice(key_bytes);
    data.extend_from_slice(&base_slot.to_be_bytes::<32>());
    let slot = U256::from_be_bytes(keccak256(&data));
    debug!(base = %base_slot, slot = %slot, "derived mapping entry");
    slot
}

/// Slot of `mapping[k1][k2]...`, derived one level at a time
pub fn resolve_nested_mapping_entry(base_slot: U256, keys: &[MappingKey]) -> U256 {
    keys.iter()
        .fold(base_slot, |slot, key| resolve_mapping_entry(slot, key))
}

/// Length slot and data start of a `bytes`/`string` at `base_slot`
pub fn resolve_dynamic_bytes_or_string(base_slot: U256) -> ByteStringLocation {
    ByteStringLocation {
        length_slot: base_slot,
        data_start: element_root(base_slot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    fn root_of_zero() -> U256 {
        b256!("290decd9548b62a8d60345a988386fc84ba6bc95484008f6362f93160ef3e563").into()
    }

    #[test]
    fn test_keccak256() {
        let result = keccak256(b"hello");
        let expected =
            hex::decode("1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8")
                .unwrap();
        assert_eq!(result.to_vec(), expected);
    }

    #[test]
    fn test_element_root_of_known_slots() {
        assert_eq!(element_root(U256::ZERO), root_of_zero());
        let root_of_one: U256 =
            b256!("b10e2d527612073b26eecdfd717e6a320cf44b4afac2b0732d9fcbe2b7fa0cf6").into();
        assert_eq!(element_root(U256::from(1)), root_of_one);
    }

    #[test]
    fn test_dynamic_array_stride() {
        let first = resolve_dynamic_array_element(U256::ZERO, U256::ZERO, U256::from(1));
        assert_eq!(first, root_of_zero());

        let third = resolve_dynamic_array_element(U256::ZERO, U256::from(2), U256::from(3));
        assert_eq!(third, root_of_zero() + U256::from(6));
    }

    #[test]
    fn test_dynamic_array_wraps() {
        let huge = resolve_dynamic_array_element(U256::ZERO, U256::MAX, U256::from(2));
        // MAX * 2 wraps to MAX - 1
        assert_eq!(huge, root_of_zero().wrapping_add(U256::MAX - U256::from(1)));
    }

    #[test]
    fn test_slots_per_element() {
        assert_eq!(slots_per_element(0), U256::from(1));
        assert_eq!(slots_per_element(32), U256::from(1));
        assert_eq!(slots_per_element(33), U256::from(2));
        assert_eq!(slots_per_element(96), U256::from(3));
    }

    #[test]
    fn test_nested_array_is_two_step() {
        let base = U256::from(12);
        let outer = element_root(base).wrapping_add(U256::from(1));
        let expected = element_root(outer).wrapping_add(U256::from(4));
        assert_eq!(
            resolve_nested_dynamic_array_element(base, &[U256::from(1), U256::from(4)]),
            expected
        );
    }

    #[test]
    fn test_mapping_entry_uint_key() {
        // balances[0] with the mapping at slot 0 hashes two zero words
        let slot = resolve_mapping_entry(U256::ZERO, &MappingKey::from(0u64));
        assert_eq!(slot, U256::from_be_bytes(keccak256(&[0u8; 64])));
    }

    #[test]
    fn test_nested_mapping_is_not_tuple_hash() {
        let owner = address!("742d35Cc6634C0532925a3b8D97C2e0D8b2D9C00");
        let keys = [MappingKey::from(1u64), MappingKey::from(owner)];
        let nested = resolve_nested_mapping_entry(U256::from(11), &keys);

        let first = resolve_mapping_entry(U256::from(11), &keys[0]);
        assert_eq!(nested, resolve_mapping_entry(first, &keys[1]));

        let mut tuple = Vec::new();
        tuple.extend_from_slice(keys[0].as_bytes());
        tuple.extend_from_slice(keys[1].as_bytes());
        tuple.extend_from_slice(&U256::from(11).to_be_bytes::<32>());
        assert_ne!(nested, U256::from_be_bytes(keccak256(&tuple)));
    }

    #[test]
    fn test_string_key_is_unpadded() {
        let slot = resolve_mapping_entry(U256::from(3), &MappingKey::from("abc"));
        let mut data = b"abc".to_vec();
        data.extend_from_slice(&U256::from(3).to_be_bytes::<32>());
        assert_eq!(slot, U256::from_be_bytes(keccak256(&data)));
    }

    #[test]
    fn test_byte_string_location() {
        let location = resolve_dynamic_bytes_or_string(U256::ZERO);
        assert_eq!(location.length_slot, U256::ZERO);
        assert_eq!(location.data_start, root_of_zero());
        assert_eq!(
            location.data_slots(40),
            vec![root_of_zero(), root_of_zero() + U256::from(1)]
        );
    }
}
