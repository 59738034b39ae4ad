//! Scalar element types stored in table columns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semantic scalar kind of a column.
///
/// String columns carry their fixed storage width in bytes, so every column
/// has a fixed per-element stride that codecs can rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "width", rename_all = "lowercase")]
pub enum ElementType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// Fixed-width string; the width is the storage width in bytes.
    Str(usize),
}

impl ElementType {
    /// Returns the canonical lowercase name (without string width).
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Bool => "bool",
            ElementType::Int8 => "int8",
            ElementType::Int16 => "int16",
            ElementType::Int32 => "int32",
            ElementType::Int64 => "int64",
            ElementType::UInt8 => "uint8",
            ElementType::UInt16 => "uint16",
            ElementType::UInt32 => "uint32",
            ElementType::UInt64 => "uint64",
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
            ElementType::Str(_) => "str",
        }
    }

    /// Storage size of one element in bytes.
    pub fn byte_width(&self) -> usize {
        match self {
            ElementType::Bool | ElementType::Int8 | ElementType::UInt8 => 1,
            ElementType::Int16 | ElementType::UInt16 => 2,
            ElementType::Int32 | ElementType::UInt32 | ElementType::Float32 => 4,
            ElementType::Int64 | ElementType::UInt64 | ElementType::Float64 => 8,
            ElementType::Str(width) => *width,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, ElementType::Str(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ElementType::Float32 | ElementType::Float64)
    }

    pub fn is_signed_integer(&self) -> bool {
        matches!(
            self,
            ElementType::Int8 | ElementType::Int16 | ElementType::Int32 | ElementType::Int64
        )
    }

    pub fn is_unsigned_integer(&self) -> bool {
        matches!(
            self,
            ElementType::UInt8 | ElementType::UInt16 | ElementType::UInt32 | ElementType::UInt64
        )
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Smallest signed integer type that holds every value in `min..=max`.
    pub fn smallest_signed(min: i64, max: i64) -> ElementType {
        if min >= i64::from(i8::MIN) && max <= i64::from(i8::MAX) {
            ElementType::Int8
        } else if min >= i64::from(i16::MIN) && max <= i64::from(i16::MAX) {
            ElementType::Int16
        } else if min >= i64::from(i32::MIN) && max <= i64::from(i32::MAX) {
            ElementType::Int32
        } else {
            ElementType::Int64
        }
    }

    /// Smallest unsigned integer type that holds `max`.
    pub fn smallest_unsigned(max: u64) -> ElementType {
        if max <= u64::from(u8::MAX) {
            ElementType::UInt8
        } else if max <= u64::from(u16::MAX) {
            ElementType::UInt16
        } else if max <= u64::from(u32::MAX) {
            ElementType::UInt32
        } else {
            ElementType::UInt64
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Str(width) => write!(f, "str{width}"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

impl FromStr for ElementType {
    type Err = String;

    /// Parse a type name such as `int32`, `float64`, or `str12`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "bool" | "boolean" => Ok(ElementType::Bool),
            "int8" => Ok(ElementType::Int8),
            "int16" => Ok(ElementType::Int16),
            "int32" => Ok(ElementType::Int32),
            "int64" => Ok(ElementType::Int64),
            "uint8" => Ok(ElementType::UInt8),
            "uint16" => Ok(ElementType::UInt16),
            "uint32" => Ok(ElementType::UInt32),
            "uint64" => Ok(ElementType::UInt64),
            "float32" => Ok(ElementType::Float32),
            "float64" => Ok(ElementType::Float64),
            other => other
                .strip_prefix("str")
                .and_then(|width| width.parse::<usize>().ok())
                .map(ElementType::Str)
                .ok_or_else(|| format!("Unknown element type: {s}")),
        }
    }
}
