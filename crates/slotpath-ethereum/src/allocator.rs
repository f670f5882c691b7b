//! Solidity base-slot assignment
//!
//! State variables are laid out in declaration order starting at slot 0.
//! Value types are packed into the current slot while they fit; structs,
//! arrays, mappings and dynamic byte strings always begin a fresh slot and the
//! variable after them does too. Struct members follow the same rules relative
//! to the struct's first slot.

use alloy_primitives::U256;
use slotpath_core::{
    ContractDescriptor, LayoutAllocator, LayoutError, SlotAssignment, SlotLayout, StructDef,
    TypeTag, VariableDescriptor,
};
use std::collections::BTreeSet;
use tracing::debug;

/// Storage footprint of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footprint {
    /// In-slot width for value types, 32 otherwise
    pub bytes: u8,
    /// Whole slots consumed
    pub slots: U256,
    /// Whether the type is a value type that may share a slot
    pub packable: bool,
}

impl Footprint {
    fn value(bytes: u8) -> Self {
        Footprint {
            bytes,
            slots: U256::from(1),
            packable: true,
        }
    }

    fn slots(slots: U256) -> Self {
        Footprint {
            bytes: 32,
            slots,
            packable: false,
        }
    }

    /// Whether several elements of this type share a slot inside an array
    pub fn packs_in_arrays(&self) -> bool {
        self.packable && self.bytes <= 16
    }

    /// Slot and offset of element `index` of an array whose data starts at `root`
    pub fn element_location(&self, root: U256, index: U256) -> (U256, u8) {
        if self.packs_in_arrays() {
            let per_slot = U256::from(32 / self.bytes);
            let slot = root.wrapping_add(index / per_slot);
            let position = (index % per_slot).saturating_to::<u8>();
            (slot, position * self.bytes)
        } else {
            (root.wrapping_add(index.wrapping_mul(self.slots)), 0)
        }
    }
}

/// Layout allocator implementing solc's storage rules
#[derive(Debug, Default, Clone, Copy)]
pub struct SolidityLayoutAllocator;

impl SolidityLayoutAllocator {
    /// Storage footprint of `ty`, looking struct names up in `structs`
    ///
    /// # Errors
    ///
    /// `LayoutError::InvalidDescriptor` for unknown, empty or directly
    /// recursive structs and for sizes beyond the slot address space.
    pub fn footprint(&self, ty: &TypeTag, structs: &[StructDef]) -> Result<Footprint, LayoutError> {
        self.footprint_inner(ty, structs, &mut Vec::new())
    }

    /// Member assignments of struct `name`, relative to the struct's first slot
    pub fn struct_members(
        &self,
        name: &str,
        structs: &[StructDef],
    ) -> Result<Vec<SlotAssignment>, LayoutError> {
        let def = find_struct(name, structs)?;
        let mut stack = vec![name.to_string()];
        let (members, _) = self.place(&def.members, structs, &mut stack)?;
        Ok(members)
    }

    fn footprint_inner(
        &self,
        ty: &TypeTag,
        structs: &[StructDef],
        stack: &mut Vec<String>,
    ) -> Result<Footprint, LayoutError> {
        if let Some(bytes) = ty.value_bytes() {
            return Ok(Footprint::value(bytes));
        }

        match ty {
            TypeTag::Bytes | TypeTag::String | TypeTag::DynamicArray(_) | TypeTag::Mapping(_, _) => {
                Ok(Footprint::slots(U256::from(1)))
            }
            TypeTag::FixedArray(element, len) => {
                let element = self.footprint_inner(element, structs, stack)?;
                let len = U256::from(*len);
                let slots = if element.packs_in_arrays() {
                    let per_slot = U256::from(32 / element.bytes);
                    (len + per_slot - U256::from(1)) / per_slot
                } else {
                    len.checked_mul(element.slots).ok_or_else(|| {
                        LayoutError::invalid_descriptor(format!(
                            "{} exceeds the slot address space",
                            ty
                        ))
                    })?
                };
                Ok(Footprint::slots(slots))
            }
            TypeTag::Struct(name) => {
                if stack.iter().any(|s| s == name) {
                    return Err(LayoutError::invalid_descriptor(format!(
                        "struct {} contains itself",
                        name
                    )));
                }
                let def = find_struct(name, structs)?;
                stack.push(name.clone());
                let (_, slots) = self.place(&def.members, structs, stack)?;
                stack.pop();
                Ok(Footprint::slots(slots))
            }
            other => Err(LayoutError::invalid_descriptor(format!(
                "no storage rule for {}",
                other
            ))),
        }
    }

    /// Lay out `members` from slot 0, returning the assignments and the slots used
    fn place(
        &self,
        members: &[VariableDescriptor],
        structs: &[StructDef],
        stack: &mut Vec<String>,
    ) -> Result<(Vec<SlotAssignment>, U256), LayoutError> {
        let mut entries = Vec::with_capacity(members.len());
        let mut slot = U256::ZERO;
        let mut used: u8 = 0;

        for var in members {
            let ty = var.type_tag()?;
            let footprint = self.footprint_inner(&ty, structs, stack)?;
            check_declared_width(var, &ty, &footprint)?;

            if footprint.packable {
                if used as u16 + footprint.bytes as u16 > 32 {
                    slot = advance(slot, U256::from(1))?;
                    used = 0;
                }
                entries.push(SlotAssignment {
                    name: var.name.clone(),
                    type_tag: ty,
                    slot,
                    offset: used,
                    bytes: footprint.bytes,
                    slots: U256::from(1),
                });
                used += footprint.bytes;
            } else {
                if used > 0 {
                    slot = advance(slot, U256::from(1))?;
                    used = 0;
                }
                entries.push(SlotAssignment {
                    name: var.name.clone(),
                    type_tag: ty,
                    slot,
                    offset: 0,
                    bytes: 32,
                    slots: footprint.slots,
                });
                slot = advance(slot, footprint.slots)?;
            }
        }

        let total = if used > 0 {
            advance(slot, U256::from(1))?
        } else {
            slot
        };
        Ok((entries, total))
    }
}

impl LayoutAllocator for SolidityLayoutAllocator {
    fn assign_base_slots(&self, contract: &ContractDescriptor) -> Result<SlotLayout, LayoutError> {
        let mut checked = BTreeSet::new();
        for var in &contract.variables {
            check_references(&var.type_tag()?, &contract.structs, &mut checked)?;
        }

        let (entries, total) = self.place(&contract.variables, &contract.structs, &mut Vec::new())?;
        debug!(
            contract = %contract.contract_name,
            variables = entries.len(),
            slots = %total,
            "assigned base slots"
        );

        Ok(SlotLayout {
            contract_name: contract.contract_name.clone(),
            entries,
            structs: contract.structs.clone(),
        })
    }
}

/// Assign base slots with the Solidity allocator
pub fn assign_base_slots(contract: &ContractDescriptor) -> Result<SlotLayout, LayoutError> {
    SolidityLayoutAllocator.assign_base_slots(contract)
}

fn find_struct<'a>(name: &str, structs: &'a [StructDef]) -> Result<&'a StructDef, LayoutError> {
    let def = structs
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| LayoutError::invalid_descriptor(format!("unknown struct {}", name)))?;
    if def.members.is_empty() {
        return Err(LayoutError::invalid_descriptor(format!(
            "struct {} has no members",
            name
        )));
    }
    Ok(def)
}

/// Check every struct reachable from `ty`, including behind mappings and
/// dynamic arrays where the footprint walk does not look
fn check_references(
    ty: &TypeTag,
    structs: &[StructDef],
    checked: &mut BTreeSet<String>,
) -> Result<(), LayoutError> {
    match ty {
        TypeTag::FixedArray(element, _) | TypeTag::DynamicArray(element) => {
            check_references(element, structs, checked)
        }
        TypeTag::Mapping(key, value) => {
            check_references(key, structs, checked)?;
            check_references(value, structs, checked)
        }
        TypeTag::Struct(name) => {
            if !checked.insert(name.clone()) {
                return Ok(());
            }
            let def = find_struct(name, structs)?;
            for member in &def.members {
                check_references(&member.type_tag()?, structs, checked)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn check_declared_width(
    var: &VariableDescriptor,
    ty: &TypeTag,
    footprint: &Footprint,
) -> Result<(), LayoutError> {
    let Some(declared) = var.declared_bytes else {
        return Ok(());
    };
    let actual = if footprint.packable {
        U256::from(footprint.bytes)
    } else {
        footprint.slots.saturating_mul(U256::from(32))
    };
    if U256::from(declared) != actual {
        return Err(LayoutError::invalid_descriptor(format!(
            "variable '{}' declares {} bytes but {} occupies {}",
            var.name, declared, ty, actual
        )));
    }
    Ok(())
}

fn advance(slot: U256, by: U256) -> Result<U256, LayoutError> {
    slot.checked_add(by).ok_or_else(|| {
        LayoutError::invalid_descriptor("layout exceeds the 2^256 slot address space")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, ty: &str) -> VariableDescriptor {
        VariableDescriptor::new(name, ty)
    }

    fn layout(vars: Vec<VariableDescriptor>) -> SlotLayout {
        assign_base_slots(&ContractDescriptor::new("Test", vars)).unwrap()
    }

    fn coords(layout: &SlotLayout, name: &str) -> (u64, u8) {
        let entry = layout.get(name).unwrap();
        (entry.slot.to::<u64>(), entry.offset)
    }

    #[test]
    fn test_sequential_full_width() {
        let layout = layout(vec![var("a", "uint256"), var("b", "uint256")]);
        assert_eq!(coords(&layout, "a"), (0, 0));
        assert_eq!(coords(&layout, "b"), (1, 0));
        assert_eq!(layout.total_slots(), U256::from(2));
    }

    #[test]
    fn test_packing_into_one_slot() {
        let layout = layout(vec![
            var("owner", "address"),
            var("flag", "bool"),
            var("small", "uint8"),
            var("next", "uint128"),
        ]);
        assert_eq!(coords(&layout, "owner"), (0, 0));
        assert_eq!(coords(&layout, "flag"), (0, 20));
        assert_eq!(coords(&layout, "small"), (0, 21));
        // 22 + 16 > 32
        assert_eq!(coords(&layout, "next"), (1, 0));
    }

    #[test]
    fn test_exact_fit_shares_slot() {
        let layout = layout(vec![var("lo", "uint128"), var("hi", "uint128"), var("c", "uint8")]);
        assert_eq!(coords(&layout, "lo"), (0, 0));
        assert_eq!(coords(&layout, "hi"), (0, 16));
        assert_eq!(coords(&layout, "c"), (1, 0));
    }

    #[test]
    fn test_dynamic_types_take_fresh_slots() {
        let layout = layout(vec![
            var("a", "uint8"),
            var("items", "uint256[]"),
            var("b", "uint8"),
            var("name", "string"),
            var("c", "bool"),
            var("map", "mapping(address => uint256)"),
            var("d", "bool"),
        ]);
        assert_eq!(coords(&layout, "a"), (0, 0));
        assert_eq!(coords(&layout, "items"), (1, 0));
        assert_eq!(coords(&layout, "b"), (2, 0));
        assert_eq!(coords(&layout, "name"), (3, 0));
        assert_eq!(coords(&layout, "c"), (4, 0));
        assert_eq!(coords(&layout, "map"), (5, 0));
        assert_eq!(coords(&layout, "d"), (6, 0));
    }

    #[test]
    fn test_fixed_array_sizes() {
        let layout = layout(vec![
            var("words", "uint256[3]"),
            var("small", "uint8[40]"),
            var("pairs", "uint128[3]"),
            var("wide", "bytes17[2]"),
            var("after", "bool"),
        ]);
        assert_eq!(coords(&layout, "words"), (0, 0));
        assert_eq!(layout.get("words").unwrap().slots, U256::from(3));
        // 40 one-byte elements need two slots
        assert_eq!(coords(&layout, "small"), (3, 0));
        assert_eq!(layout.get("small").unwrap().slots, U256::from(2));
        assert_eq!(coords(&layout, "pairs"), (5, 0));
        assert_eq!(layout.get("pairs").unwrap().slots, U256::from(2));
        assert_eq!(coords(&layout, "wide"), (7, 0));
        assert_eq!(layout.get("wide").unwrap().slots, U256::from(2));
        assert_eq!(coords(&layout, "after"), (9, 0));
    }

    #[test]
    fn test_struct_layout() {
        let contract = ContractDescriptor::new(
            "Pool",
            vec![
                var("flag", "bool"),
                var("position", "struct Position"),
                var("after", "uint8"),
            ],
        )
        .with_struct(StructDef {
            name: "Position".into(),
            members: vec![
                var("owner", "address"),
                var("active", "bool"),
                var("amount", "uint256"),
                var("fee", "uint24"),
            ],
        });
        let layout = assign_base_slots(&contract).unwrap();
        assert_eq!(coords(&layout, "flag"), (0, 0));
        assert_eq!(coords(&layout, "position"), (1, 0));
        assert_eq!(layout.get("position").unwrap().slots, U256::from(3));
        assert_eq!(coords(&layout, "after"), (4, 0));

        let members = SolidityLayoutAllocator
            .struct_members("Position", &layout.structs)
            .unwrap();
        let offsets: Vec<(u64, u8)> = members
            .iter()
            .map(|m| (m.slot.to::<u64>(), m.offset))
            .collect();
        assert_eq!(offsets, vec![(0, 0), (0, 20), (1, 0), (2, 0)]);
    }

    #[test]
    fn test_recursive_struct_rejected() {
        let contract = ContractDescriptor::new("Bad", vec![var("node", "struct Node")])
            .with_struct(StructDef {
                name: "Node".into(),
                members: vec![var("value", "uint256"), var("next", "struct Node")],
            });
        let err = assign_base_slots(&contract).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidDescriptor(_)));
    }

    #[test]
    fn test_recursion_through_mapping_allowed() {
        let contract = ContractDescriptor::new("Tree", vec![var("root", "struct Node")])
            .with_struct(StructDef {
                name: "Node".into(),
                members: vec![
                    var("value", "uint256"),
                    var("children", "mapping(uint256 => struct Node)"),
                    var("list", "struct Node[]"),
                ],
            });
        let layout = assign_base_slots(&contract).unwrap();
        assert_eq!(layout.get("root").unwrap().slots, U256::from(3));
    }

    #[test]
    fn test_unknown_struct_rejected() {
        let contract = ContractDescriptor::new(
            "Bad",
            vec![var("map", "mapping(address => struct Missing)")],
        );
        let err = assign_base_slots(&contract).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidDescriptor(msg) if msg.contains("Missing")));
    }

    #[test]
    fn test_unrecognized_type_rejected() {
        let err = assign_base_slots(&ContractDescriptor::new(
            "Bad",
            vec![var("x", "uint7")],
        ))
        .unwrap_err();
        assert!(matches!(err, LayoutError::InvalidDescriptor(_)));
    }

    #[test]
    fn test_declared_width_checked() {
        let ok = vec![
            var("a", "uint64").with_declared_bytes(8),
            var("b", "uint256[2]").with_declared_bytes(64),
        ];
        assert!(assign_base_slots(&ContractDescriptor::new("Ok", ok)).is_ok());

        let bad = vec![var("a", "uint64").with_declared_bytes(32)];
        let err = assign_base_slots(&ContractDescriptor::new("Bad", bad)).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidDescriptor(_)));
    }

    #[test]
    fn test_slot_space_overflow_rejected() {
        let max = u64::MAX;
        let vars = vec![var(
            "huge",
            &format!("uint256[{max}][{max}][{max}][{max}][{max}]"),
        )];
        let err = assign_base_slots(&ContractDescriptor::new("Big", vars)).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidDescriptor(_)));
    }

    #[test]
    fn test_element_location_packed_and_strided() {
        let root = U256::from(100);
        let byte = Footprint::value(1);
        assert_eq!(byte.element_location(root, U256::from(33)), (U256::from(101), 1));

        let pair = Footprint::value(16);
        assert_eq!(pair.element_location(root, U256::from(3)), (U256::from(101), 16));

        let address = Footprint::value(20);
        assert_eq!(address.element_location(root, U256::from(2)), (U256::from(102), 0));

        let wide = Footprint::slots(U256::from(3));
        assert_eq!(wide.element_location(root, U256::from(2)), (U256::from(106), 0));
    }
}
