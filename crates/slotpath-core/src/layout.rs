//! Layout types and data structures
//!
//! [`SlotLayout`] is the result of assigning base slots to a contract's state
//! variables. [`LayoutInfo`] is the flatter, compiler-style representation
//! (the shape of solc's `storageLayout` output) used for interchange and for
//! cross-checking a computed layout against a compiler's.

use crate::{StructDef, TypeTag};
use alloc::{
    collections::{BTreeMap, BTreeSet},
    format,
    string::{String, ToString},
    vec::Vec,
};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Base coordinates assigned to one state variable
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotAssignment {
    /// Variable name as it appears in the contract source
    pub name: String,
    /// Parsed type of the variable
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
    /// Base slot index
    pub slot: U256,
    /// Byte offset inside the slot, counted from the low-order end
    pub offset: u8,
    /// Width in bytes inside the slot (32 for anything that is not a packed value)
    pub bytes: u8,
    /// Number of consecutive slots the variable occupies from `slot`
    pub slots: U256,
}

impl SlotAssignment {
    /// First slot after this variable
    pub fn end_slot(&self) -> U256 {
        self.slot.saturating_add(self.slots)
    }
}

/// Base slot assignment for a whole contract
///
/// Entries are kept in declaration order. The struct definitions are carried
/// along so that member access can be resolved without the original
/// descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotLayout {
    /// Name of the contract
    pub contract_name: String,
    /// One entry per state variable, in declaration order
    pub entries: Vec<SlotAssignment>,
    /// Struct definitions referenced by entries
    #[serde(default)]
    pub structs: Vec<StructDef>,
}

impl SlotLayout {
    /// Look up a variable by name
    pub fn get(&self, name: &str) -> Option<&SlotAssignment> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn find_struct(&self, name: &str) -> Option<&StructDef> {
        self.structs.iter().find(|s| s.name == name)
    }

    /// Number of slots covered by the static part of the layout
    pub fn total_slots(&self) -> U256 {
        self.entries
            .iter()
            .map(SlotAssignment::end_slot)
            .max()
            .unwrap_or(U256::ZERO)
    }

    /// Compute the layout commitment hash
    ///
    /// A deterministic SHA256 over the contract name and every assignment in
    /// declaration order. Resolved addresses carry it so a consumer can tell
    /// which layout produced them.
    pub fn commitment(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        update_prefixed(&mut hasher, self.contract_name.as_bytes());
        hasher.update((self.entries.len() as u32).to_le_bytes());

        for entry in &self.entries {
            update_prefixed(&mut hasher, entry.name.as_bytes());
            update_prefixed(&mut hasher, entry.type_tag.to_string().as_bytes());
            hasher.update(entry.slot.to_be_bytes::<32>());
            hasher.update([entry.offset, entry.bytes]);
            hasher.update(entry.slots.to_be_bytes::<32>());
        }

        hasher.finalize().into()
    }

    /// Convert to the compiler-style representation
    ///
    /// The types table lists each distinct top-level type once.
    pub fn to_layout_info(&self) -> LayoutInfo {
        let mut types: BTreeMap<String, TypeInfo> = BTreeMap::new();
        let storage = self
            .entries
            .iter()
            .map(|entry| {
                let label = entry.type_tag.solc_label();
                types
                    .entry(label.clone())
                    .or_insert_with(|| TypeInfo::for_assignment(entry));
                StorageEntry {
                    label: entry.name.clone(),
                    slot: entry.slot.to_string(),
                    offset: entry.offset,
                    type_name: label,
                }
            })
            .collect();

        LayoutInfo {
            contract_name: self.contract_name.clone(),
            storage,
            types: types.into_values().collect(),
        }
    }
}

fn update_prefixed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u32).to_le_bytes());
    hasher.update(bytes);
}

/// Compiler-style storage layout of a contract
///
/// # Layout Commitment
///
/// The layout commitment is a SHA256 hash over the storage entries, used to
/// check that two parties are talking about the same layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayoutInfo {
    /// Name of the contract
    pub contract_name: String,
    /// Storage layout entries mapping variable names to storage locations
    pub storage: Vec<StorageEntry>,
    /// Type information for proper field size calculation
    pub types: Vec<TypeInfo>,
}

impl LayoutInfo {
    /// Validate the storage layout for consistency and correctness
    ///
    /// This performs sanity checks on the layout to catch common errors:
    /// - Validates packed fields don't overflow slot boundaries
    /// - Ensures referenced types exist
    /// - Checks for valid slot numbers
    /// - Rejects duplicate names and overlapping fields
    pub fn validate(&self) -> Result<(), String> {
        let mut spans: Vec<(&StorageEntry, U256, U256, u64)> = Vec::new();

        for entry in &self.storage {
            let slot = entry
                .slot
                .parse::<U256>()
                .map_err(|_| format!("Invalid slot format '{}' for field '{}'", entry.slot, entry.label))?;

            let type_info = self
                .find_type(&entry.type_name)
                .ok_or_else(|| format!("Type '{}' not found for field '{}'", entry.type_name, entry.label))?;

            let type_size = type_info.number_of_bytes.parse::<u64>().map_err(|_| {
                format!(
                    "Invalid size '{}' for type '{}'",
                    type_info.number_of_bytes, type_info.label
                )
            })?;
            if type_size == 0 {
                return Err(format!("Type '{}' has zero size", type_info.label));
            }

            if type_size <= 32 {
                if entry.offset as u64 + type_size > 32 {
                    return Err(format!(
                        "Field '{}' with offset {} and size {} exceeds slot boundary",
                        entry.label, entry.offset, type_size
                    ));
                }
            } else if entry.offset != 0 {
                return Err(format!(
                    "Multi-slot field '{}' should have offset 0, found {}",
                    entry.label, entry.offset
                ));
            }

            match type_info.encoding.as_str() {
                "inplace" => {
                    if type_info.key.is_some() || type_info.value.is_some() {
                        return Err(format!(
                            "Inplace type '{}' should not have key/value fields",
                            type_info.label
                        ));
                    }
                }
                "mapping" => {
                    if type_info.key.is_none() || type_info.value.is_none() {
                        return Err(format!(
                            "Mapping type '{}' must have both key and value types",
                            type_info.label
                        ));
                    }
                }
                "dynamic_array" => {
                    if type_info.base.is_none() {
                        return Err(format!(
                            "Dynamic array type '{}' must have a base type",
                            type_info.label
                        ));
                    }
                }
                "bytes" => {}
                other => {
                    return Err(format!(
                        "Unknown encoding '{}' for type '{}'",
                        other, type_info.label
                    ))
                }
            }

            let slots = U256::from(type_size.div_ceil(32));
            spans.push((entry, slot, slot.saturating_add(slots), type_size));
        }

        let mut seen_labels = BTreeSet::new();
        for entry in &self.storage {
            if !seen_labels.insert(&entry.label) {
                return Err(format!("Duplicate field name '{}'", entry.label));
            }
        }

        for (i, (entry1, start1, end1, size1)) in spans.iter().enumerate() {
            for (entry2, start2, end2, size2) in spans.iter().skip(i + 1) {
                if start1 >= end2 || start2 >= end1 {
                    continue;
                }
                // Slot ranges intersect; two in-slot values may still sit side by side
                if *size1 <= 32 && *size2 <= 32 && start1 == start2 {
                    let a = (entry1.offset as u64, entry1.offset as u64 + size1);
                    let b = (entry2.offset as u64, entry2.offset as u64 + size2);
                    if a.0 >= b.1 || b.0 >= a.1 {
                        continue;
                    }
                }
                return Err(format!(
                    "Fields '{}' and '{}' overlap in slot {}",
                    entry1.label,
                    entry2.label,
                    start1.max(start2)
                ));
            }
        }

        Ok(())
    }

    pub fn find_type(&self, label: &str) -> Option<&TypeInfo> {
        self.types.iter().find(|t| t.label == label)
    }

    /// Compute the layout commitment hash
    ///
    /// Deterministic across environments: every string is length-prefixed and
    /// entries are hashed in order.
    ///
    /// ```rust
    /// use slotpath_core::LayoutInfo;
    ///
    /// let layout = LayoutInfo {
    ///     contract_name: "MyContract".into(),
    ///     storage: vec![],
    ///     types: vec![],
    /// };
    /// assert_eq!(layout.commitment().len(), 32);
    /// ```
    pub fn commitment(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        update_prefixed(&mut hasher, self.contract_name.as_bytes());
        hasher.update((self.storage.len() as u32).to_le_bytes());

        for entry in &self.storage {
            update_prefixed(&mut hasher, entry.label.as_bytes());
            update_prefixed(&mut hasher, entry.slot.as_bytes());
            hasher.update((entry.offset as u32).to_le_bytes());
            update_prefixed(&mut hasher, entry.type_name.as_bytes());
        }

        hasher.finalize().into()
    }
}

/// A single entry in the compiler-style storage layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageEntry {
    /// Variable name as it appears in the contract source
    pub label: String,
    /// Storage slot index as a decimal string
    pub slot: String,
    /// Byte offset within the slot (for packed variables)
    pub offset: u8,
    /// Type identifier referencing an entry in the types array
    pub type_name: String,
}

/// Type information in the compiler-style layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeInfo {
    /// Type identifier that matches storage entries
    pub label: String,
    /// Number of bytes this type occupies in storage
    pub number_of_bytes: String,
    /// Encoding type ("inplace", "mapping", "dynamic_array", "bytes")
    pub encoding: String,
    /// Base type for arrays
    pub base: Option<String>,
    /// Key type for mappings
    pub key: Option<String>,
    /// Value type for mappings
    pub value: Option<String>,
}

impl TypeInfo {
    fn for_assignment(entry: &SlotAssignment) -> Self {
        let number_of_bytes = if entry.type_tag.is_value_type() {
            entry.bytes.to_string()
        } else {
            entry.slots.saturating_mul(U256::from(32)).to_string()
        };

        let (encoding, base, key, value) = match &entry.type_tag {
            TypeTag::Mapping(k, v) => ("mapping", None, Some(k.solc_label()), Some(v.solc_label())),
            TypeTag::DynamicArray(b) => ("dynamic_array", Some(b.solc_label()), None, None),
            TypeTag::Bytes | TypeTag::String => ("bytes", None, None, None),
            TypeTag::FixedArray(b, _) => ("inplace", Some(b.solc_label()), None, None),
            _ => ("inplace", None, None, None),
        };

        TypeInfo {
            label: entry.type_tag.solc_label(),
            number_of_bytes,
            encoding: encoding.to_string(),
            base,
            key,
            value,
        }
    }
}
