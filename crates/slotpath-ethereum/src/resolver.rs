//! Query resolution against a Solidity slot layout
//!
//! A query names a state variable followed by any chain of accessors:
//!
//! - `totalSupply`: the variable's own coordinates
//! - `balances[0x742d...]`, `allowances[owner][spender]`: mapping entries
//! - `items[5]`, `matrix[1][3]`: array elements
//! - `position.owner`: struct members
//! - `name.length`, `name.data`: length slot and data root of dynamic values
//!
//! Every step derives new coordinates from the previous ones, so accessors
//! compose freely (`holdings[0xabc..][1].amount`).

use crate::{
    encoding::parse_index,
    slots::{element_root, resolve_mapping_entry},
    MappingKey, SolidityLayoutAllocator,
};
use alloy_primitives::U256;
use slotpath_core::{LayoutError, ResolvedAddress, SlotLayout, SlotResolver, TypeTag};
use tracing::debug;

/// Resolver implementing Solidity's derivation rules
///
/// # Examples
///
/// ```rust,ignore
/// use slotpath_ethereum::{assign_base_slots, SolidityResolver};
/// use slotpath_core::SlotResolver;
///
/// let layout = assign_base_slots(&contract)?;
/// let address = SolidityResolver.resolve(&layout, "balances[0x742d35Cc6634C0532925a3b8D97C2e0D8b2D9C00]")?;
/// println!("{:#x}", address.slot);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct SolidityResolver;

/// One accessor of a query
#[derive(Debug, Clone, PartialEq, Eq)]
enum Accessor {
    /// `[key]`, mapping key or array index as written
    Index(String),
    /// `.name`
    Member(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Query {
    variable: String,
    accessors: Vec<Accessor>,
}

/// Coordinates reached so far while walking a query
struct Cursor {
    slot: U256,
    offset: u8,
    ty: TypeTag,
}

impl SolidityResolver {
    /// Parse `name[key].member...` into its parts
    ///
    /// # Errors
    ///
    /// `LayoutError::InvalidQuery` for empty names, unbalanced brackets,
    /// empty keys or stray characters.
    fn parse_query(&self, query: &str) -> Result<Query, LayoutError> {
        let query = query.trim();
        let end = query.find(['[', '.']).unwrap_or(query.len());
        let variable = &query[..end];
        if !is_identifier(variable) {
            return Err(LayoutError::InvalidQuery(format!(
                "'{}' does not start with a variable name",
                query
            )));
        }

        let mut accessors = Vec::new();
        let mut rest = &query[end..];
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('[') {
                let close = after.find(']').ok_or_else(|| {
                    LayoutError::InvalidQuery(format!("unclosed '[' in '{}'", query))
                })?;
                let key = after[..close].trim();
                if key.is_empty() {
                    return Err(LayoutError::InvalidQuery(format!("empty key in '{}'", query)));
                }
                accessors.push(Accessor::Index(key.to_string()));
                rest = &after[close + 1..];
            } else if let Some(after) = rest.strip_prefix('.') {
                let end = after.find(['[', '.']).unwrap_or(after.len());
                let member = &after[..end];
                if !is_identifier(member) {
                    return Err(LayoutError::InvalidQuery(format!(
                        "invalid member name '{}' in '{}'",
                        member, query
                    )));
                }
                accessors.push(Accessor::Member(member.to_string()));
                rest = &after[end..];
            } else {
                return Err(LayoutError::InvalidQuery(format!(
                    "unexpected '{}' in '{}'",
                    rest, query
                )));
            }
        }

        Ok(Query {
            variable: variable.to_string(),
            accessors,
        })
    }

    /// Apply one accessor; returns whether the result ends the query
    fn step(
        &self,
        layout: &SlotLayout,
        cursor: Cursor,
        accessor: &Accessor,
    ) -> Result<(Cursor, bool), LayoutError> {
        let allocator = SolidityLayoutAllocator;

        match (accessor, cursor.ty) {
            (Accessor::Index(raw), TypeTag::Mapping(key, value)) => {
                let key = MappingKey::parse(&key, raw)?;
                let slot = resolve_mapping_entry(cursor.slot, &key);
                Ok((Cursor { slot, offset: 0, ty: *value }, false))
            }
            (Accessor::Index(raw), TypeTag::DynamicArray(element)) => {
                let index = parse_index(raw)?;
                let footprint = allocator.footprint(&element, &layout.structs)?;
                let (slot, offset) = footprint.element_location(element_root(cursor.slot), index);
                Ok((Cursor { slot, offset, ty: *element }, false))
            }
            (Accessor::Index(raw), TypeTag::FixedArray(element, len)) => {
                let index = parse_index(raw)?;
                if index >= U256::from(len) {
                    return Err(LayoutError::PathResolution(format!(
                        "index {} out of bounds for {}[{}]",
                        index, element, len
                    )));
                }
                let footprint = allocator.footprint(&element, &layout.structs)?;
                let (slot, offset) = footprint.element_location(cursor.slot, index);
                Ok((Cursor { slot, offset, ty: *element }, false))
            }
            (Accessor::Index(_), ty) => Err(LayoutError::PathResolution(format!(
                "{} cannot be indexed",
                ty
            ))),
            (Accessor::Member(member), TypeTag::DynamicArray(_) | TypeTag::Bytes | TypeTag::String)
                if member == "length" =>
            {
                Ok((
                    Cursor {
                        slot: cursor.slot,
                        offset: 0,
                        ty: TypeTag::Uint(256),
                    },
                    true,
                ))
            }
            (Accessor::Member(member), TypeTag::DynamicArray(_) | TypeTag::Bytes | TypeTag::String)
                if member == "data" =>
            {
                Ok((
                    Cursor {
                        slot: element_root(cursor.slot),
                        offset: 0,
                        ty: TypeTag::FixedBytes(32),
                    },
                    true,
                ))
            }
            (Accessor::Member(member), TypeTag::Struct(name)) => {
                let members = allocator.struct_members(&name, &layout.structs)?;
                let found = members
                    .into_iter()
                    .find(|m| &m.name == member)
                    .ok_or_else(|| {
                        LayoutError::PathResolution(format!(
                            "struct {} has no member '{}'",
                            name, member
                        ))
                    })?;
                Ok((
                    Cursor {
                        slot: cursor.slot.wrapping_add(found.slot),
                        offset: found.offset,
                        ty: found.type_tag,
                    },
                    false,
                ))
            }
            (Accessor::Member(member), ty) => Err(LayoutError::PathResolution(format!(
                "{} has no member '{}'",
                ty, member
            ))),
        }
    }

    /// Queries for every struct member below `prefix`, depth first
    fn member_queries(
        &self,
        layout: &SlotLayout,
        prefix: &str,
        ty: &TypeTag,
        out: &mut Vec<String>,
    ) -> Result<(), LayoutError> {
        if let TypeTag::Struct(name) = ty {
            for member in SolidityLayoutAllocator.struct_members(name, &layout.structs)? {
                let query = format!("{}.{}", prefix, member.name);
                out.push(query.clone());
                self.member_queries(layout, &query, &member.type_tag, out)?;
            }
        }
        Ok(())
    }
}

impl SlotResolver for SolidityResolver {
    fn resolve(&self, layout: &SlotLayout, query: &str) -> Result<ResolvedAddress, LayoutError> {
        let parsed = self.parse_query(query)?;
        let entry = layout.get(&parsed.variable).ok_or_else(|| {
            LayoutError::PathResolution(format!("Variable not found: {}", parsed.variable))
        })?;

        let mut cursor = Cursor {
            slot: entry.slot,
            offset: entry.offset,
            ty: entry.type_tag.clone(),
        };
        let mut accessors = parsed.accessors.iter();
        while let Some(accessor) = accessors.next() {
            let (next, terminal) = self.step(layout, cursor, accessor)?;
            cursor = next;
            if terminal && accessors.len() > 0 {
                return Err(LayoutError::PathResolution(format!(
                    "nothing can follow .length or .data in '{}'",
                    query
                )));
            }
        }

        let footprint = SolidityLayoutAllocator.footprint(&cursor.ty, &layout.structs)?;
        debug!(query, slot = %cursor.slot, offset = cursor.offset, "resolved query");

        Ok(ResolvedAddress {
            query: query.trim().to_string(),
            slot: cursor.slot,
            offset: cursor.offset,
            size: footprint.bytes,
            slots: footprint.slots,
            type_tag: cursor.ty,
            layout_commitment: layout.commitment(),
        })
    }

    fn resolve_all(&self, layout: &SlotLayout) -> Result<Vec<ResolvedAddress>, LayoutError> {
        let mut queries = Vec::new();
        for entry in &layout.entries {
            queries.push(entry.name.clone());
            self.member_queries(layout, &entry.name, &entry.type_tag, &mut queries)?;
        }

        queries
            .iter()
            .map(|query| self.resolve(layout, query))
            .collect()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
