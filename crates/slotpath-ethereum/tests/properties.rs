//! Property tests for slot assignment and derivation

use alloy_primitives::{Address, U256};
use proptest::prelude::*;
use slotpath_core::{ContractDescriptor, SlotResolver, VariableDescriptor};
use slotpath_ethereum::{
    assign_base_slots, resolve_dynamic_array_element, resolve_mapping_entry,
    resolve_nested_mapping_entry, MappingKey, SolidityResolver,
};

// -- PROPTEST STRATEGIES ------------------------------------------------------

fn arb_value_type() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u16..=32).prop_map(|n| format!("uint{}", n * 8)),
        (1u16..=32).prop_map(|n| format!("int{}", n * 8)),
        (1u8..=32).prop_map(|n| format!("bytes{}", n)),
        Just("address".to_string()),
        Just("bool".to_string()),
    ]
}

fn arb_any_type() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => arb_value_type(),
        1 => Just("uint256[]".to_string()),
        1 => Just("string".to_string()),
        1 => Just("bytes".to_string()),
        1 => Just("mapping(address => uint256)".to_string()),
        1 => (1u64..=8).prop_map(|n| format!("uint64[{}]", n)),
        1 => (1u64..=4).prop_map(|n| format!("uint256[{}]", n)),
    ]
}

prop_compose! {
    fn arb_contract(max_len: usize, types: BoxedStrategy<String>)
                   (generated in prop::collection::vec(types, 1..=max_len))
                   -> ContractDescriptor {
        let variables = generated
            .into_iter()
            .enumerate()
            .map(|(i, ty)| VariableDescriptor::new(format!("v{}", i), ty))
            .collect();
        ContractDescriptor::new("Generated", variables)
    }
}

fn arb_slot() -> impl Strategy<Value = U256> {
    any::<[u64; 4]>().prop_map(U256::from_limbs)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn proptest_value_types_pack_greedily(contract in arb_contract(24, arb_value_type().boxed())) {
        let layout = assign_base_slots(&contract).unwrap();
        prop_assert_eq!(layout.entries[0].slot, U256::ZERO);
        prop_assert_eq!(layout.entries[0].offset, 0);

        for pair in layout.entries.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let used = a.offset as u16 + a.bytes as u16;
            prop_assert!(b.slot >= a.slot, "slots must not decrease");
            if used + b.bytes as u16 <= 32 {
                prop_assert_eq!(b.slot, a.slot, "{} should share a slot with {}", b.name, a.name);
                prop_assert_eq!(b.offset as u16, used);
            } else {
                prop_assert_eq!(b.slot, a.slot + U256::from(1));
                prop_assert_eq!(b.offset, 0);
            }
        }
    }

    #[test]
    fn proptest_containers_take_fresh_slots(contract in arb_contract(16, arb_any_type().boxed())) {
        let layout = assign_base_slots(&contract).unwrap();

        for pair in layout.entries.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let a_is_value = a.type_tag.is_value_type();
            let b_is_value = b.type_tag.is_value_type();
            if !a_is_value {
                prop_assert!(b.slot >= a.slot + a.slots, "{} overlaps {}", b.name, a.name);
            }
            if !b_is_value {
                prop_assert_eq!(b.offset, 0);
                prop_assert!(b.slot > a.slot, "{} must start a fresh slot", b.name);
            }
        }
    }

    #[test]
    fn proptest_mapping_entries_are_distinct(base in arb_slot(), a in any::<u64>(), b in any::<u64>()) {
        prop_assume!(a != b);
        let slot_a = resolve_mapping_entry(base, &MappingKey::from(a));
        let slot_b = resolve_mapping_entry(base, &MappingKey::from(b));
        prop_assert_ne!(slot_a, slot_b);
        prop_assert_eq!(slot_a, resolve_mapping_entry(base, &MappingKey::from(a)));
    }

    #[test]
    fn proptest_mapping_entries_differ_across_bases(key in any::<[u8; 20]>(), x in arb_slot(), y in arb_slot()) {
        prop_assume!(x != y);
        let key = MappingKey::from(Address::from(key));
        prop_assert_ne!(resolve_mapping_entry(x, &key), resolve_mapping_entry(y, &key));
    }

    #[test]
    fn proptest_nested_mapping_is_stepwise(base in arb_slot(), outer in any::<u64>(), inner in any::<[u8; 20]>()) {
        let keys = [MappingKey::from(outer), MappingKey::from(Address::from(inner))];
        let stepwise = resolve_mapping_entry(resolve_mapping_entry(base, &keys[0]), &keys[1]);
        prop_assert_eq!(resolve_nested_mapping_entry(base, &keys), stepwise);
    }

    #[test]
    fn proptest_array_elements_are_contiguous(base in arb_slot(), index in arb_slot(), stride in 1u64..=8) {
        let stride = U256::from(stride);
        let here = resolve_dynamic_array_element(base, index, stride);
        let next = resolve_dynamic_array_element(base, index.wrapping_add(U256::from(1)), stride);
        prop_assert_eq!(next.wrapping_sub(here), stride);
    }

    #[test]
    fn proptest_resolved_elements_follow_stride(index in 0u64..1_000_000) {
        let contract = ContractDescriptor::new(
            "Arrays",
            vec![VariableDescriptor::new("items", "uint256[]")],
        );
        let layout = assign_base_slots(&contract).unwrap();
        let here = SolidityResolver.resolve(&layout, &format!("items[{}]", index)).unwrap();
        let next = SolidityResolver.resolve(&layout, &format!("items[{}]", index + 1)).unwrap();
        prop_assert_eq!(next.slot.wrapping_sub(here.slot), U256::from(1));
        prop_assert_eq!(
            here.slot,
            resolve_dynamic_array_element(U256::ZERO, U256::from(index), U256::from(1))
        );
    }
}
