//! Interop with solc's `storageLayout` output
//!
//! `solc --storage-layout` (or the `storageLayout` output selection in
//! standard JSON) reports the compiler's own slot assignment. Parsing it lets a
//! computed layout be checked against the compiler's.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use slotpath_core::{LayoutError, LayoutInfo, SlotLayout, StorageEntry, TypeInfo};
use std::{collections::BTreeMap, fmt};
use tracing::warn;

/// solc `storageLayout` object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SolcStorageLayout {
    pub storage: Vec<SolcStorageItem>,
    /// `null` when the contract has no state variables
    #[serde(default)]
    pub types: Option<BTreeMap<String, SolcType>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SolcStorageItem {
    #[serde(rename = "astId", default, skip_serializing_if = "Option::is_none")]
    pub ast_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
    pub label: String,
    pub offset: u8,
    pub slot: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SolcType {
    pub encoding: String,
    pub label: String,
    #[serde(rename = "numberOfBytes")]
    pub number_of_bytes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<SolcStorageItem>>,
}

impl SolcStorageLayout {
    /// Parse either a bare `storageLayout` object or a compiler artifact that
    /// contains one under `storageLayout`
    pub fn from_json(content: &str) -> Result<Self, LayoutError> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        let layout = match value.get("storageLayout") {
            Some(inner) => inner.clone(),
            None => value,
        };
        Ok(serde_json::from_value(layout)?)
    }

    /// Convert to the compiler-style representation used for validation
    pub fn to_layout_info(&self, contract_name: &str) -> LayoutInfo {
        let storage = self
            .storage
            .iter()
            .map(|item| StorageEntry {
                label: item.label.clone(),
                slot: item.slot.clone(),
                offset: item.offset,
                type_name: item.type_name.clone(),
            })
            .collect();

        let types = self
            .types
            .iter()
            .flatten()
            .map(|(id, ty)| TypeInfo {
                label: id.clone(),
                number_of_bytes: ty.number_of_bytes.clone(),
                encoding: ty.encoding.clone(),
                base: ty.base.clone(),
                key: ty.key.clone(),
                value: ty.value.clone(),
            })
            .collect();

        LayoutInfo {
            contract_name: contract_name.to_string(),
            storage,
            types,
        }
    }
}

/// A difference between a computed layout and a reference layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutMismatch {
    /// Present in the reference, absent from the computed layout
    Missing { label: String },
    /// Present in the computed layout, absent from the reference
    Unexpected { label: String },
    Slot {
        label: String,
        expected: String,
        actual: U256,
    },
    Offset {
        label: String,
        expected: u8,
        actual: u8,
    },
}

impl fmt::Display for LayoutMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutMismatch::Missing { label } => write!(f, "{}: missing from computed layout", label),
            LayoutMismatch::Unexpected { label } => write!(f, "{}: not in reference layout", label),
            LayoutMismatch::Slot {
                label,
                expected,
                actual,
            } => write!(f, "{}: slot {} expected, computed {}", label, expected, actual),
            LayoutMismatch::Offset {
                label,
                expected,
                actual,
            } => write!(
                f,
                "{}: offset {} expected, computed {}",
                label, expected, actual
            ),
        }
    }
}

/// Compare a computed layout with a reference (usually the compiler's)
///
/// Variables are matched by name; types are not compared because compiler
/// type identifiers embed AST ids.
pub fn verify_layout(computed: &SlotLayout, reference: &LayoutInfo) -> Vec<LayoutMismatch> {
    let mut mismatches = Vec::new();

    for expected in &reference.storage {
        let Some(actual) = computed.get(&expected.label) else {
            mismatches.push(LayoutMismatch::Missing {
                label: expected.label.clone(),
            });
            continue;
        };

        match expected.slot.parse::<U256>() {
            Ok(slot) if slot == actual.slot => {}
            Ok(_) => mismatches.push(LayoutMismatch::Slot {
                label: expected.label.clone(),
                expected: expected.slot.clone(),
                actual: actual.slot,
            }),
            Err(_) => {
                warn!(label = %expected.label, slot = %expected.slot, "unparseable reference slot");
                mismatches.push(LayoutMismatch::Slot {
                    label: expected.label.clone(),
                    expected: expected.slot.clone(),
                    actual: actual.slot,
                });
            }
        }

        if expected.offset != actual.offset {
            mismatches.push(LayoutMismatch::Offset {
                label: expected.label.clone(),
                expected: expected.offset,
                actual: actual.offset,
            });
        }
    }

    for entry in &computed.entries {
        if !reference.storage.iter().any(|s| s.label == entry.name) {
            mismatches.push(LayoutMismatch::Unexpected {
                label: entry.name.clone(),
            });
        }
    }

    mismatches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assign_base_slots;
    use slotpath_core::{ContractDescriptor, VariableDescriptor};

    const SOLC_OUTPUT: &str = r#"{
        "storageLayout": {
            "storage": [
                {"astId": 3, "contract": "Vault.sol:Vault", "label": "owner", "offset": 0, "slot": "0", "type": "t_address"},
                {"astId": 5, "contract": "Vault.sol:Vault", "label": "locked", "offset": 20, "slot": "0", "type": "t_bool"},
                {"astId": 9, "contract": "Vault.sol:Vault", "label": "deposits", "offset": 0, "slot": "1", "type": "t_mapping(t_address,t_uint256)"}
            ],
            "types": {
                "t_address": {"encoding": "inplace", "label": "address", "numberOfBytes": "20"},
                "t_bool": {"encoding": "inplace", "label": "bool", "numberOfBytes": "1"},
                "t_mapping(t_address,t_uint256)": {"encoding": "mapping", "key": "t_address", "label": "mapping(address => uint256)", "numberOfBytes": "32", "value": "t_uint256"},
                "t_uint256": {"encoding": "inplace", "label": "uint256", "numberOfBytes": "32"}
            }
        }
    }"#;

    fn vault(vars: Vec<VariableDescriptor>) -> SlotLayout {
        assign_base_slots(&ContractDescriptor::new("Vault", vars)).unwrap()
    }

    #[test]
    fn test_parse_artifact() {
        let layout = SolcStorageLayout::from_json(SOLC_OUTPUT).unwrap();
        assert_eq!(layout.storage.len(), 3);
        assert_eq!(layout.storage[1].offset, 20);

        let info = layout.to_layout_info("Vault");
        assert!(info.validate().is_ok());
        assert_eq!(
            info.find_type("t_mapping(t_address,t_uint256)").unwrap().key,
            Some("t_address".to_string())
        );
    }

    #[test]
    fn test_parse_empty_layout() {
        let layout = SolcStorageLayout::from_json(r#"{"storage": [], "types": null}"#).unwrap();
        assert!(layout.to_layout_info("Empty").storage.is_empty());
    }

    #[test]
    fn test_verify_matching_layout() {
        let computed = vault(vec![
            VariableDescriptor::new("owner", "address"),
            VariableDescriptor::new("locked", "bool"),
            VariableDescriptor::new("deposits", "mapping(address => uint256)"),
        ]);
        let reference = SolcStorageLayout::from_json(SOLC_OUTPUT)
            .unwrap()
            .to_layout_info("Vault");
        assert!(verify_layout(&computed, &reference).is_empty());
    }

    #[test]
    fn test_verify_reports_mismatches() {
        let computed = vault(vec![
            VariableDescriptor::new("owner", "address"),
            VariableDescriptor::new("locked", "uint256"),
            VariableDescriptor::new("extra", "bool"),
        ]);
        let reference = SolcStorageLayout::from_json(SOLC_OUTPUT)
            .unwrap()
            .to_layout_info("Vault");

        let mismatches = verify_layout(&computed, &reference);
        assert_eq!(
            mismatches,
            vec![
                LayoutMismatch::Slot {
                    label: "locked".into(),
                    expected: "0".into(),
                    actual: U256::from(1),
                },
                LayoutMismatch::Offset {
                    label: "locked".into(),
                    expected: 20,
                    actual: 0,
                },
                LayoutMismatch::Missing {
                    label: "deposits".into()
                },
                LayoutMismatch::Unexpected {
                    label: "extra".into()
                },
            ]
        );
        assert_eq!(
            mismatches[0].to_string(),
            "locked: slot 0 expected, computed 1"
        );
    }

    #[test]
    fn test_computed_layout_round_trips_through_layout_info() {
        let computed = vault(vec![
            VariableDescriptor::new("owner", "address"),
            VariableDescriptor::new("locked", "bool"),
        ]);
        assert!(verify_layout(&computed, &computed.to_layout_info()).is_empty());
    }
}
