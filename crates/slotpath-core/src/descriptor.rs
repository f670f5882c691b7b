//! State-variable descriptors and type tags
//!
//! A contract's storage is described by its state variables in declaration
//! order. Each variable carries a Solidity type string (`uint256`,
//! `mapping(address => uint256[])`, `struct Position`, ...) that is parsed into
//! a [`TypeTag`] when the layout is assigned, so an unrecognized tag surfaces
//! as [`LayoutError::InvalidDescriptor`] at that point rather than at load time.

use crate::LayoutError;
use alloc::{
    boxed::Box,
    format,
    string::{String, ToString},
    vec::Vec,
};
use core::{fmt, str::FromStr};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Type of a state variable as far as storage allocation is concerned
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// `uintN`, bit width in 8..=256
    Uint(u16),
    /// `intN`, bit width in 8..=256
    Int(u16),
    /// 20-byte account address
    Address,
    /// Single-byte boolean
    Bool,
    /// `bytesN`, N in 1..=32
    FixedBytes(u8),
    /// Dynamic `bytes`
    Bytes,
    /// Dynamic `string`
    String,
    /// `T[N]`
    FixedArray(Box<TypeTag>, u64),
    /// `T[]`
    DynamicArray(Box<TypeTag>),
    /// `mapping(K => V)`
    Mapping(Box<TypeTag>, Box<TypeTag>),
    /// Reference to a struct definition by name
    Struct(String),
}

impl TypeTag {
    /// Whether values of this type live inline in a single slot and may be packed
    pub fn is_value_type(&self) -> bool {
        matches!(
            self,
            TypeTag::Uint(_) | TypeTag::Int(_) | TypeTag::Address | TypeTag::Bool | TypeTag::FixedBytes(_)
        )
    }

    /// In-slot width in bytes for value types, `None` for everything else
    pub fn value_bytes(&self) -> Option<u8> {
        match self {
            TypeTag::Uint(bits) | TypeTag::Int(bits) => Some((bits / 8) as u8),
            TypeTag::Address => Some(20),
            TypeTag::Bool => Some(1),
            TypeTag::FixedBytes(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether this type keeps only metadata in its base slot (length or nothing)
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            TypeTag::Bytes | TypeTag::String | TypeTag::DynamicArray(_) | TypeTag::Mapping(_, _)
        )
    }

    /// Whether this type may appear as a mapping key
    pub fn is_mapping_key(&self) -> bool {
        self.is_value_type() || matches!(self, TypeTag::Bytes | TypeTag::String)
    }

    /// Compiler-style type identifier (`t_uint256`, `t_mapping(t_address,t_uint256)`, ...)
    pub fn solc_label(&self) -> String {
        match self {
            TypeTag::Uint(bits) => format!("t_uint{}", bits),
            TypeTag::Int(bits) => format!("t_int{}", bits),
            TypeTag::Address => "t_address".to_string(),
            TypeTag::Bool => "t_bool".to_string(),
            TypeTag::FixedBytes(n) => format!("t_bytes{}", n),
            TypeTag::Bytes => "t_bytes_storage".to_string(),
            TypeTag::String => "t_string_storage".to_string(),
            TypeTag::FixedArray(base, len) => {
                format!("t_array({}){}_storage", base.solc_label(), len)
            }
            TypeTag::DynamicArray(base) => format!("t_array({})dyn_storage", base.solc_label()),
            TypeTag::Mapping(key, value) => {
                format!("t_mapping({},{})", key.solc_label(), value.solc_label())
            }
            TypeTag::Struct(name) => format!("t_struct({})_storage", name),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Uint(bits) => write!(f, "uint{}", bits),
            TypeTag::Int(bits) => write!(f, "int{}", bits),
            TypeTag::Address => f.write_str("address"),
            TypeTag::Bool => f.write_str("bool"),
            TypeTag::FixedBytes(n) => write!(f, "bytes{}", n),
            TypeTag::Bytes => f.write_str("bytes"),
            TypeTag::String => f.write_str("string"),
            TypeTag::FixedArray(base, len) => write!(f, "{}[{}]", base, len),
            TypeTag::DynamicArray(base) => write!(f, "{}[]", base),
            TypeTag::Mapping(key, value) => write!(f, "mapping({} => {})", key, value),
            TypeTag::Struct(name) => write!(f, "struct {}", name),
        }
    }
}

impl FromStr for TypeTag {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_type(s)
    }
}

impl Serialize for TypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn parse_type(input: &str) -> Result<TypeTag, LayoutError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(LayoutError::invalid_descriptor("empty type tag"));
    }

    let (mut ty, mut rest) = if let Some(body) = s.strip_prefix("mapping") {
        let body = body.trim_start();
        if !body.starts_with('(') {
            return Err(LayoutError::invalid_descriptor(format!(
                "malformed mapping type '{}'",
                s
            )));
        }
        let close = matching_paren(body).ok_or_else(|| {
            LayoutError::invalid_descriptor(format!("unbalanced parentheses in '{}'", s))
        })?;
        let (key, value) = split_arrow(&body[1..close]).ok_or_else(|| {
            LayoutError::invalid_descriptor(format!("mapping '{}' is missing '=>'", s))
        })?;

        let key = parse_type(key)?;
        if !key.is_mapping_key() {
            return Err(LayoutError::invalid_descriptor(format!(
                "'{}' cannot be used as a mapping key",
                key
            )));
        }
        let value = parse_type(value)?;
        (
            TypeTag::Mapping(Box::new(key), Box::new(value)),
            &body[close + 1..],
        )
    } else {
        let end = s.find('[').unwrap_or(s.len());
        (parse_elementary(&s[..end])?, &s[end..])
    };

    // Array suffixes apply left to right: `uint8[2][]` is a dynamic array of `uint8[2]`
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        if !rest.starts_with('[') {
            return Err(LayoutError::invalid_descriptor(format!(
                "unexpected '{}' in type '{}'",
                rest, s
            )));
        }
        let close = rest.find(']').ok_or_else(|| {
            LayoutError::invalid_descriptor(format!("unclosed bracket in type '{}'", s))
        })?;
        let dim = rest[1..close].trim();
        ty = if dim.is_empty() {
            TypeTag::DynamicArray(Box::new(ty))
        } else {
            let len = dim.parse::<u64>().map_err(|_| {
                LayoutError::invalid_descriptor(format!("invalid array length '{}' in '{}'", dim, s))
            })?;
            if len == 0 {
                return Err(LayoutError::invalid_descriptor(format!(
                    "zero-length array in '{}'",
                    s
                )));
            }
            TypeTag::FixedArray(Box::new(ty), len)
        };
        rest = &rest[close + 1..];
    }

    Ok(ty)
}

fn parse_elementary(raw: &str) -> Result<TypeTag, LayoutError> {
    let name = raw.trim();
    let unrecognized = || LayoutError::invalid_descriptor(format!("unrecognized type tag '{}'", name));

    match name {
        "address" | "address payable" => return Ok(TypeTag::Address),
        "bool" => return Ok(TypeTag::Bool),
        "bytes" => return Ok(TypeTag::Bytes),
        "string" => return Ok(TypeTag::String),
        "uint" => return Ok(TypeTag::Uint(256)),
        "int" => return Ok(TypeTag::Int(256)),
        _ => {}
    }

    if let Some(struct_name) = name.strip_prefix("struct ") {
        let struct_name = struct_name.trim();
        let valid = !struct_name.is_empty()
            && struct_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.');
        return if valid {
            Ok(TypeTag::Struct(struct_name.to_string()))
        } else {
            Err(unrecognized())
        };
    }

    if let Some(bits) = name.strip_prefix("uint") {
        return parse_bits(bits).map(TypeTag::Uint).ok_or_else(unrecognized);
    }
    if let Some(bits) = name.strip_prefix("int") {
        return parse_bits(bits).map(TypeTag::Int).ok_or_else(unrecognized);
    }
    if let Some(width) = name.strip_prefix("bytes") {
        return match width.parse::<u8>() {
            Ok(n) if (1..=32).contains(&n) && !width.starts_with('0') => Ok(TypeTag::FixedBytes(n)),
            _ => Err(unrecognized()),
        };
    }

    Err(unrecognized())
}

fn parse_bits(raw: &str) -> Option<u16> {
    if raw.starts_with('0') {
        return None;
    }
    let bits = raw.parse::<u16>().ok()?;
    (bits >= 8 && bits <= 256 && bits % 8 == 0).then_some(bits)
}

/// Index of the `)` matching the `(` at position 0
fn matching_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split `K => V` at the first top-level arrow
fn split_arrow(s: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    let bytes = s.as_bytes();
    for i in 0..bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b'=' if depth == 0 && bytes.get(i + 1) == Some(&b'>') => {
                return Some((&s[..i], &s[i + 2..]));
            }
            _ => {}
        }
    }
    None
}

/// A single state variable in declaration order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VariableDescriptor {
    /// Variable name as it appears in the contract source
    pub name: String,
    /// Solidity type string, parsed into a [`TypeTag`] on use
    #[serde(rename = "type")]
    pub type_name: String,
    /// Optional byte width the caller expects; checked against the type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_bytes: Option<u32>,
}

impl VariableDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            declared_bytes: None,
        }
    }

    /// Attach the byte width the declaration is expected to occupy
    pub fn with_declared_bytes(mut self, bytes: u32) -> Self {
        self.declared_bytes = Some(bytes);
        self
    }

    /// Parse the type string, naming the variable in the error
    pub fn type_tag(&self) -> Result<TypeTag, LayoutError> {
        self.type_name.parse().map_err(|err| match err {
            LayoutError::InvalidDescriptor(msg) => {
                LayoutError::InvalidDescriptor(format!("variable '{}': {}", self.name, msg))
            }
            other => other,
        })
    }
}

/// Named struct definition referenced by `struct Name` type tags
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StructDef {
    pub name: String,
    pub members: Vec<VariableDescriptor>,
}

/// Complete storage declaration of a contract: the input of slot assignment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractDescriptor {
    /// Name of the contract
    pub contract_name: String,
    /// Struct definitions referenced by the variables
    #[serde(default)]
    pub structs: Vec<StructDef>,
    /// State variables in declaration order
    pub variables: Vec<VariableDescriptor>,
}

impl ContractDescriptor {
    pub fn new(contract_name: impl Into<String>, variables: Vec<VariableDescriptor>) -> Self {
        Self {
            contract_name: contract_name.into(),
            structs: Vec::new(),
            variables,
        }
    }

    /// Register a struct definition
    pub fn with_struct(mut self, def: StructDef) -> Self {
        self.structs.push(def);
        self
    }

    pub fn find_struct(&self, name: &str) -> Option<&StructDef> {
        self.structs.iter().find(|s| s.name == name)
    }

    /// Load a descriptor from its JSON representation
    pub fn from_json(content: &str) -> Result<Self, LayoutError> {
        Ok(serde_json::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn parse(s: &str) -> TypeTag {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_elementary_types() {
        assert_eq!(parse("uint256"), TypeTag::Uint(256));
        assert_eq!(parse("uint"), TypeTag::Uint(256));
        assert_eq!(parse("uint8"), TypeTag::Uint(8));
        assert_eq!(parse("int24"), TypeTag::Int(24));
        assert_eq!(parse("address payable"), TypeTag::Address);
        assert_eq!(parse("bool"), TypeTag::Bool);
        assert_eq!(parse("bytes32"), TypeTag::FixedBytes(32));
        assert_eq!(parse("bytes"), TypeTag::Bytes);
        assert_eq!(parse("string"), TypeTag::String);
        assert_eq!(parse("struct Position"), TypeTag::Struct("Position".into()));
    }

    #[test]
    fn test_parse_containers() {
        assert_eq!(
            parse("uint256[3]"),
            TypeTag::FixedArray(Box::new(TypeTag::Uint(256)), 3)
        );
        assert_eq!(
            parse("uint256[][]"),
            TypeTag::DynamicArray(Box::new(TypeTag::DynamicArray(Box::new(TypeTag::Uint(256)))))
        );
        // Suffixes nest left to right
        assert_eq!(
            parse("uint8[2][]"),
            TypeTag::DynamicArray(Box::new(TypeTag::FixedArray(Box::new(TypeTag::Uint(8)), 2)))
        );
        assert_eq!(
            parse("mapping(uint256 => mapping(address => uint256))"),
            TypeTag::Mapping(
                Box::new(TypeTag::Uint(256)),
                Box::new(TypeTag::Mapping(
                    Box::new(TypeTag::Address),
                    Box::new(TypeTag::Uint(256))
                ))
            )
        );
        assert_eq!(
            parse("mapping(address=>uint256[])"),
            TypeTag::Mapping(
                Box::new(TypeTag::Address),
                Box::new(TypeTag::DynamicArray(Box::new(TypeTag::Uint(256))))
            )
        );
    }

    #[test]
    fn test_display_roundtrips_through_parser() {
        for s in [
            "uint128",
            "int8",
            "bytes4",
            "address[5]",
            "mapping(bytes32 => struct Order)",
            "mapping(string => uint256)[]",
        ] {
            let ty = parse(s);
            assert_eq!(parse(&ty.to_string()), ty);
        }
    }

    #[test]
    fn test_rejects_unrecognized_tags() {
        for bad in [
            "", "uint7", "uint264", "uint08", "bytes0", "bytes33", "float", "uint256[0]",
            "uint256[", "mapping(uint256)", "mapping(uint256 => uint256",
            "mapping(uint256[] => uint256)", "struct ", "uint256]x",
        ] {
            let result = bad.parse::<TypeTag>();
            assert!(
                matches!(result, Err(LayoutError::InvalidDescriptor(_))),
                "expected '{}' to be rejected, got {:?}",
                bad,
                result
            );
        }
    }

    #[test]
    fn test_value_bytes() {
        assert_eq!(TypeTag::Uint(128).value_bytes(), Some(16));
        assert_eq!(TypeTag::Address.value_bytes(), Some(20));
        assert_eq!(TypeTag::Bool.value_bytes(), Some(1));
        assert_eq!(TypeTag::String.value_bytes(), None);
        assert!(TypeTag::Mapping(Box::new(TypeTag::Bool), Box::new(TypeTag::Bool)).is_dynamic());
    }

    #[test]
    fn test_solc_labels() {
        assert_eq!(parse("uint256").solc_label(), "t_uint256");
        assert_eq!(
            parse("mapping(address => uint256)").solc_label(),
            "t_mapping(t_address,t_uint256)"
        );
        assert_eq!(parse("uint256[]").solc_label(), "t_array(t_uint256)dyn_storage");
        assert_eq!(parse("uint256[3]").solc_label(), "t_array(t_uint256)3_storage");
    }

    #[test]
    fn test_descriptor_json() {
        let json = r#"{
            "contract_name": "Vault",
            "structs": [{ "name": "Position", "members": [{ "name": "size", "type": "uint128" }] }],
            "variables": [
                { "name": "owner", "type": "address", "declared_bytes": 20 },
                { "name": "positions", "type": "mapping(address => struct Position)" }
            ]
        }"#;
        let contract = ContractDescriptor::from_json(json).unwrap();
        assert_eq!(contract.contract_name, "Vault");
        assert_eq!(contract.variables[0].declared_bytes, Some(20));
        assert!(contract.find_struct("Position").is_some());
        assert!(contract.find_struct("Missing").is_none());

        let tag = contract.variables[1].type_tag().unwrap();
        assert!(matches!(tag, TypeTag::Mapping(_, _)));
    }

    #[test]
    fn test_type_tag_error_names_variable() {
        let var = VariableDescriptor::new("counter", "uint3");
        let err = var.type_tag().unwrap_err();
        match err {
            LayoutError::InvalidDescriptor(msg) => assert!(msg.contains("counter")),
            other => panic!("unexpected error {:?}", other),
        }

        let contract = ContractDescriptor::new("C", vec![var]);
        assert_eq!(contract.variables.len(), 1);
    }
}
