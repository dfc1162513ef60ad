//! ABI type model and the mapping of ABI types onto target-language types
//!
//! Tuples are registered as named structs in a [`StructRegistry`] shared by every
//! constructor, method, event and error of a generation run.

use std::collections::HashMap;
use std::fmt;

use ethabi::param_type::{ParamType, Reader};
use serde::Serialize;

use super::lang::Language;
use super::normalize::{resolve_name_conflict, Normalizer};
use super::parser::AbiParameter;
use abibind_core::{Error, Result};

/// Maximum nesting of arrays and tuples accepted from an ABI
pub const MAX_TYPE_DEPTH: usize = 32;

/// An ABI type descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbiType {
    Address,
    Bool,
    String,
    Bytes,
    FixedBytes(usize),
    Int { signed: bool, bits: usize },
    Array(Box<AbiType>, usize),
    Slice(Box<AbiType>),
    Tuple {
        /// Struct name taken from `internalType`, empty when unknown
        raw_name: String,
        fields: Vec<TupleField>,
    },
}

/// A named member of a tuple type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TupleField {
    pub name: String,
    pub ty: AbiType,
}

impl AbiType {
    /// Parse the type of an ABI parameter, including tuple components
    pub fn from_param(param: &AbiParameter) -> Result<Self> {
        Self::from_param_at(param, 0)
    }

    /// Parse a non-tuple type string such as `uint256[2][]`
    pub fn parse(type_str: &str) -> Result<Self> {
        let kind = Reader::read(type_str)
            .map_err(|e| Error::parse(format!("invalid ABI type '{}': {}", type_str, e)))?;
        Self::from_param_type(&kind, 0)
    }

    fn from_param_at(param: &AbiParameter, depth: usize) -> Result<Self> {
        if depth > MAX_TYPE_DEPTH {
            return Err(Error::parse(format!(
                "type of '{}' nests deeper than {} levels",
                param.name, MAX_TYPE_DEPTH
            )));
        }

        if !param.param_type.starts_with("tuple") {
            return Self::parse(&param.param_type);
        }

        let (base, dims) = split_array_suffix(&param.param_type)?;
        if base != "tuple" {
            return Err(Error::parse(format!("invalid ABI type '{}'", param.param_type)));
        }

        let components = param.components.as_deref().unwrap_or_default();
        let fields = components
            .iter()
            .map(|component| {
                Ok(TupleField {
                    name: component.name.clone(),
                    ty: Self::from_param_at(component, depth + 1)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let raw_name = param
            .internal_type
            .as_deref()
            .map(tuple_raw_name)
            .unwrap_or_default();

        let mut ty = AbiType::Tuple { raw_name, fields };
        for dim in dims {
            ty = match dim {
                Some(size) => AbiType::Array(Box::new(ty), size),
                None => AbiType::Slice(Box::new(ty)),
            };
        }
        Ok(ty)
    }

    fn from_param_type(kind: &ParamType, depth: usize) -> Result<Self> {
        if depth > MAX_TYPE_DEPTH {
            return Err(Error::parse(format!("type {} nests too deeply", kind)));
        }
        Ok(match kind {
            ParamType::Address => AbiType::Address,
            ParamType::Bool => AbiType::Bool,
            ParamType::String => AbiType::String,
            ParamType::Bytes => AbiType::Bytes,
            ParamType::FixedBytes(size) => {
                if !(1..=32).contains(size) {
                    return Err(Error::parse(format!("invalid fixed bytes width in {}", kind)));
                }
                AbiType::FixedBytes(*size)
            }
            ParamType::Int(bits) => AbiType::Int { signed: true, bits: check_int_width(kind, *bits)? },
            ParamType::Uint(bits) => AbiType::Int { signed: false, bits: check_int_width(kind, *bits)? },
            ParamType::Array(inner) => {
                AbiType::Slice(Box::new(Self::from_param_type(inner, depth + 1)?))
            }
            ParamType::FixedArray(inner, size) => {
                if *size == 0 {
                    return Err(Error::parse(format!("zero-length array in {}", kind)));
                }
                AbiType::Array(Box::new(Self::from_param_type(inner, depth + 1)?), *size)
            }
            ParamType::Tuple(members) => AbiType::Tuple {
                raw_name: String::new(),
                fields: members
                    .iter()
                    .map(|member| {
                        Ok(TupleField {
                            name: String::new(),
                            ty: Self::from_param_type(member, depth + 1)?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            },
        })
    }

    /// Canonical ABI string used in signatures and struct identity
    pub fn canonical(&self) -> String {
        match self {
            AbiType::Address => "address".to_string(),
            AbiType::Bool => "bool".to_string(),
            AbiType::String => "string".to_string(),
            AbiType::Bytes => "bytes".to_string(),
            AbiType::FixedBytes(size) => format!("bytes{}", size),
            AbiType::Int { signed: true, bits } => format!("int{}", bits),
            AbiType::Int { signed: false, bits } => format!("uint{}", bits),
            AbiType::Array(inner, size) => format!("{}[{}]", inner.canonical(), size),
            AbiType::Slice(inner) => format!("{}[]", inner.canonical()),
            AbiType::Tuple { fields, .. } => {
                let inner: Vec<String> = fields.iter().map(|f| f.ty.canonical()).collect();
                format!("({})", inner.join(","))
            }
        }
    }
}

/// Integer widths must be a multiple of 8 between 8 and 256
fn check_int_width(kind: &ParamType, bits: usize) -> Result<usize> {
    if bits % 8 != 0 || !(8..=256).contains(&bits) {
        return Err(Error::parse(format!("invalid integer width in {}", kind)));
    }
    Ok(bits)
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Split `tuple[2][]` into `("tuple", [Some(2), None])`
fn split_array_suffix(type_str: &str) -> Result<(&str, Vec<Option<usize>>)> {
    let base_end = type_str.find('[').unwrap_or(type_str.len());
    let (base, mut rest) = type_str.split_at(base_end);
    let mut dims = Vec::new();

    while !rest.is_empty() {
        let close = rest
            .find(']')
            .ok_or_else(|| Error::parse(format!("unbalanced brackets in '{}'", type_str)))?;
        let size = &rest[1..close];
        if size.is_empty() {
            dims.push(None);
        } else {
            let size = size
                .parse::<usize>()
                .ok()
                .filter(|&size| size > 0)
                .ok_or_else(|| Error::parse(format!("invalid array size in '{}'", type_str)))?;
            dims.push(Some(size));
        }
        rest = &rest[close + 1..];
        if !rest.is_empty() && !rest.starts_with('[') {
            return Err(Error::parse(format!("invalid ABI type '{}'", type_str)));
        }
    }

    Ok((base, dims))
}

/// `struct Lib.Point[]` becomes `LibPoint`
fn tuple_raw_name(internal_type: &str) -> String {
    let Some(name) = internal_type.strip_prefix("struct ") else {
        return String::new();
    };
    let name = name.split('[').next().unwrap_or_default();
    name.replace('.', "")
}

/// Language-neutral target type selected for an ABI type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundType {
    Address,
    Bool,
    String,
    Bytes,
    /// 32-byte hash standing in for an indexed dynamic value
    Hash,
    FixedBytes(usize),
    /// Fits a native fixed-width integer
    Int { signed: bool, bits: usize },
    /// Needs an arbitrary-precision integer
    BigInt { signed: bool, bits: usize },
    Array(Box<BoundType>, usize),
    Slice(Box<BoundType>),
    Struct { name: String, canonical: String },
}

impl BoundType {
    /// Re-derive the ABI type string this target type was chosen for
    pub fn abi_type_string(&self) -> String {
        match self {
            BoundType::Address => "address".to_string(),
            BoundType::Bool => "bool".to_string(),
            BoundType::String => "string".to_string(),
            BoundType::Bytes => "bytes".to_string(),
            BoundType::Hash => "bytes32".to_string(),
            BoundType::FixedBytes(size) => format!("bytes{}", size),
            BoundType::Int { signed, bits } | BoundType::BigInt { signed, bits } => {
                format!("{}int{}", if *signed { "" } else { "u" }, bits)
            }
            BoundType::Array(inner, size) => format!("{}[{}]", inner.abi_type_string(), size),
            BoundType::Slice(inner) => format!("{}[]", inner.abi_type_string()),
            BoundType::Struct { canonical, .. } => canonical.clone(),
        }
    }
}

/// Identity of a tuple type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructKey {
    pub raw_name: String,
    pub canonical: String,
}

/// A generated struct definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructDef {
    pub name: String,
    pub raw_name: String,
    pub canonical: String,
    pub fields: Vec<StructField>,
}

/// A field of a generated struct
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructField {
    pub name: String,
    pub original_name: String,
    pub bound: BoundType,
    /// Field type rendered in the target language
    pub ty: String,
}

/// Struct definitions keyed by tuple identity, in registration order
#[derive(Debug, Default)]
pub struct StructRegistry {
    defs: Vec<StructDef>,
    index: HashMap<StructKey, usize>,
}

impl StructRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a struct by tuple identity
    pub fn get(&self, raw_name: &str, canonical: &str) -> Option<&StructDef> {
        let key = StructKey {
            raw_name: raw_name.to_string(),
            canonical: canonical.to_string(),
        };
        self.index.get(&key).map(|&i| &self.defs[i])
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StructDef> {
        self.defs.iter()
    }

    pub fn into_vec(self) -> Vec<StructDef> {
        self.defs
    }

    fn contains_name(&self, name: &str) -> bool {
        self.defs.iter().any(|def| def.name == name)
    }

    fn insert(&mut self, key: StructKey, def: StructDef) {
        self.index.insert(key, self.defs.len());
        self.defs.push(def);
    }
}

/// Maps ABI types onto target types for one language
pub struct TypeMapper<'a> {
    lang: &'a dyn Language,
}

impl<'a> TypeMapper<'a> {
    pub fn new(lang: &'a dyn Language) -> Self {
        Self { lang }
    }

    /// Map an ABI type, registering every tuple it contains
    pub fn map_type(&self, ty: &AbiType, registry: &mut StructRegistry) -> BoundType {
        match ty {
            AbiType::Address => BoundType::Address,
            AbiType::Bool => BoundType::Bool,
            AbiType::String => BoundType::String,
            AbiType::Bytes => BoundType::Bytes,
            AbiType::FixedBytes(size) => BoundType::FixedBytes(*size),
            AbiType::Int { signed, bits } => match bits {
                8 | 16 | 32 | 64 => BoundType::Int { signed: *signed, bits: *bits },
                _ => BoundType::BigInt { signed: *signed, bits: *bits },
            },
            AbiType::Array(inner, size) => {
                BoundType::Array(Box::new(self.map_type(inner, registry)), *size)
            }
            AbiType::Slice(inner) => BoundType::Slice(Box::new(self.map_type(inner, registry))),
            AbiType::Tuple { .. } => BoundType::Struct {
                name: self.register_struct(ty, registry),
                canonical: ty.canonical(),
            },
        }
    }

    /// Map the type of an indexed event parameter.
    ///
    /// Logs store the keccak hash of strings and dynamic bytes rather than the value.
    /// Indexed arrays and structs are hashed as well but are still bound by value.
    pub fn map_topic_type(&self, ty: &AbiType, registry: &mut StructRegistry) -> BoundType {
        match ty {
            AbiType::String | AbiType::Bytes => BoundType::Hash,
            _ => self.map_type(ty, registry),
        }
    }

    /// Register a tuple (and its nested tuples, depth first) and return the struct name.
    ///
    /// # Panics
    ///
    /// Panics if `ty` is not a tuple.
    pub fn register_struct(&self, ty: &AbiType, registry: &mut StructRegistry) -> String {
        let AbiType::Tuple { raw_name, fields } = ty else {
            panic!("register_struct called on non-tuple type {}", ty);
        };

        let canonical = ty.canonical();
        if let Some(existing) = registry.get(raw_name, &canonical) {
            return existing.name.clone();
        }

        let bound: Vec<BoundType> = fields
            .iter()
            .map(|field| self.map_type(&field.ty, registry))
            .collect();

        let raws: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        let names = Normalizer::new(self.lang).field_names(&raws);

        let base = if raw_name.is_empty() {
            format!("Struct{}", registry.len())
        } else {
            self.lang.normalize_type_name(raw_name)
        };
        let name = resolve_name_conflict(&base, |candidate| registry.contains_name(candidate));

        let fields = fields
            .iter()
            .zip(names)
            .zip(bound)
            .map(|((field, name), bound)| StructField {
                name,
                original_name: field.name.clone(),
                ty: self.lang.bind_type(&bound),
                bound,
            })
            .collect();

        registry.insert(
            StructKey {
                raw_name: raw_name.clone(),
                canonical: canonical.clone(),
            },
            StructDef {
                name: name.clone(),
                raw_name: raw_name.clone(),
                canonical,
                fields,
            },
        );
        name
    }
}
