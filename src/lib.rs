//! Deterministic storage-slot address derivation for Solidity contract state
//!
//! This facade re-exports the workspace crates so downstream users can depend
//! on a single package:
//!
//! - [`core`]: chain-independent descriptors, layouts, resolved addresses and traits
//! - [`ethereum`]: Solidity slot allocation, keccak derivation and slot readers
//!
//! ```toml
//! [dependencies]
//! slotpath = { version = "0.1", features = ["ethereum"] }
//! ```

pub use slotpath_core as core;

#[cfg(feature = "ethereum")]
pub use slotpath_ethereum as ethereum;

pub use slotpath_core::{
    ContractDescriptor, LayoutError, ResolvedAddress, SlotLayout, TypeTag, VariableDescriptor,
};
