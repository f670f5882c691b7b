//! Trait definitions for slotpath-core
//!
//! This module contains the interfaces at the seams of the system: slot
//! assignment, address resolution, and reading slots from an execution
//! environment.

use crate::{ContractDescriptor, LayoutError, ResolvedAddress, SlotLayout};
use alloc::vec::Vec;
use alloy_primitives::{Address, U256};

/// Trait for assigning base slots to a contract's state variables
///
/// Implementations encode one compiler's allocation rules. Assignment is a
/// pure function of the descriptor.
pub trait LayoutAllocator {
    /// Assign a base slot (and byte offset, for packed values) to every variable
    ///
    /// # Errors
    ///
    /// * `LayoutError::InvalidDescriptor` - unrecognized type tag, unknown or
    ///   recursive struct, or a declared byte width that does not match
    fn assign_base_slots(&self, contract: &ContractDescriptor) -> Result<SlotLayout, LayoutError>;
}

/// Trait for resolving queries into storage coordinates
///
/// Supports:
/// - Simple variables (`owner`, `totalSupply`)
/// - Mapping entries (`balances[0x742d...]`, `allowances[owner][spender]`)
/// - Array elements (`items[5]`, `matrix[1][3]`)
/// - Struct members (`config.fee`)
/// - Dynamic metadata (`name.length`, `items.data`)
///
/// # Examples
///
/// ```rust,ignore
/// let address = resolver.resolve(&layout, "nestedMapping[1][0x742d35Cc6634C0532925a3b8D97C2e0D8b2D9C00]")?;
/// println!("slot: {:#x}", address.slot);
/// ```
pub trait SlotResolver {
    /// Resolve a query string into a storage address
    fn resolve(&self, layout: &SlotLayout, query: &str) -> Result<ResolvedAddress, LayoutError>;

    /// Resolve every statically addressable location of a layout
    ///
    /// Mapping entries and dynamic array elements need runtime keys and are
    /// represented only by their base slot.
    fn resolve_all(&self, layout: &SlotLayout) -> Result<Vec<ResolvedAddress>, LayoutError>;
}

/// Capability to read one 32-byte storage word of a deployed contract
///
/// Supplied by the execution environment (an RPC node, a local VM, a test
/// double). Independent reads carry no ordering guarantees.
pub trait SlotReader {
    /// Read the word stored at `slot` of `contract`
    ///
    /// Slots that were never written read as zero.
    fn read_slot(&self, contract: Address, slot: U256) -> Result<[u8; 32], LayoutError>;
}

impl<R: SlotReader + ?Sized> SlotReader for &R {
    fn read_slot(&self, contract: Address, slot: U256) -> Result<[u8; 32], LayoutError> {
        (**self).read_slot(contract, slot)
    }
}
