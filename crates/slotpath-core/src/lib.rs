//! Core types and traits for storage-slot address derivation
//!
//! This crate provides the chain-independent vocabulary of the resolver:
//! state-variable descriptors, assigned slot layouts, resolved addresses, and
//! the traits implemented by compiler-specific allocators and resolvers.
//!
//! # Features
//!
//! - **no_std compatible**: usable wherever `alloc` is available
//! - **Deterministic**: layout commitments identify the layout an address came from
//! - **Pure**: nothing in this crate performs I/O; reading slots goes through [`SlotReader`]
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! slotpath-core = { version = "0.1", default-features = false }
//! ```

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod descriptor;
pub mod error;
pub mod key;
pub mod layout;
pub mod traits;

pub use descriptor::{ContractDescriptor, StructDef, TypeTag, VariableDescriptor};
pub use error::LayoutError;
pub use key::{word_range, ByteStringLocation, ResolvedAddress};
pub use layout::{LayoutInfo, SlotAssignment, SlotLayout, StorageEntry, TypeInfo};
pub use traits::{LayoutAllocator, SlotReader, SlotResolver};

/// Width of a storage word in bytes
pub const WORD_BYTES: usize = 32;
