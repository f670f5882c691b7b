//! Solidity storage layout rules and keccak slot derivation
//!
//! This crate implements the core traits for contracts compiled by solc:
//! base-slot assignment with packing, keccak derivation for mappings, dynamic
//! arrays and byte strings, a query resolver, and readers for pulling the
//! resolved words out of a node or an in-memory store.

mod allocator;
mod encoding;
mod error;
mod inspector;
mod reader;
mod resolver;
mod solc;
pub mod slots;
pub mod value;

pub use allocator::{assign_base_slots, Footprint, SolidityLayoutAllocator};
pub use encoding::{parse_index, MappingKey};
pub use error::EthereumError;
pub use inspector::{StorageInspector, DEFAULT_MAX_READ_SLOTS};
pub use reader::MemorySlotReader;
#[cfg(feature = "client")]
pub use reader::RpcSlotReader;
pub use resolver::SolidityResolver;
pub use slots::{
    element_root, keccak256, resolve_dynamic_array_element, resolve_dynamic_bytes_or_string,
    resolve_mapping_entry, resolve_nested_dynamic_array_element, resolve_nested_mapping_entry,
    slots_per_element,
};
pub use solc::{verify_layout, LayoutMismatch, SolcStorageItem, SolcStorageLayout, SolcType};
pub use value::{decode, extract, ByteStringEncoding, SlotValue};
