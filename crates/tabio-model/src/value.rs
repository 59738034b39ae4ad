//! Scalar values: native column values, plain cells, and keyword values.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::element::ElementType;
use crate::error::{ModelError, Result};

/// A single value in its native storage representation.
///
/// Vector columns yield [`Value::Array`] for one row. Equality is NaN-aware:
/// two NaN floats of the same width compare equal, which is the comparison
/// column descriptors need for null sentinels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Str(String),
    Array(Vec<Value>),
}

impl Value {
    /// Element type of a scalar value; `None` for arrays.
    ///
    /// Strings report their byte length as the width.
    pub fn element_type(&self) -> Option<ElementType> {
        Some(match self {
            Value::Bool(_) => ElementType::Bool,
            Value::Int8(_) => ElementType::Int8,
            Value::Int16(_) => ElementType::Int16,
            Value::Int32(_) => ElementType::Int32,
            Value::Int64(_) => ElementType::Int64,
            Value::UInt8(_) => ElementType::UInt8,
            Value::UInt16(_) => ElementType::UInt16,
            Value::UInt32(_) => ElementType::UInt32,
            Value::UInt64(_) => ElementType::UInt64,
            Value::Float32(_) => ElementType::Float32,
            Value::Float64(_) => ElementType::Float64,
            Value::Str(s) => ElementType::Str(s.len()),
            Value::Array(_) => return None,
        })
    }

    pub fn is_nan(&self) -> bool {
        match self {
            Value::Float32(v) => v.is_nan(),
            Value::Float64(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Numeric view as `f64` (booleans map to 0/1).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::Int8(v) => Some(f64::from(*v)),
            Value::Int16(v) => Some(f64::from(*v)),
            Value::Int32(v) => Some(f64::from(*v)),
            Value::Int64(v) => Some(*v as f64),
            Value::UInt8(v) => Some(f64::from(*v)),
            Value::UInt16(v) => Some(f64::from(*v)),
            Value::UInt32(v) => Some(f64::from(*v)),
            Value::UInt64(v) => Some(*v as f64),
            Value::Float32(v) => Some(f64::from(*v)),
            Value::Float64(v) => Some(*v),
            Value::Str(_) | Value::Array(_) => None,
        }
    }

    /// Integer view as `i64` when the value is an integer or boolean.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(v) => Some(i64::from(*v)),
            Value::Int8(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            Value::UInt8(v) => Some(i64::from(*v)),
            Value::UInt16(v) => Some(i64::from(*v)),
            Value::UInt32(v) => Some(i64::from(*v)),
            Value::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Parse text into a value of the given element type.
    ///
    /// Surrounding whitespace is ignored for non-string types. Strings are
    /// kept verbatim (truncation to the storage width happens on insertion).
    pub fn parse_as(text: &str, target: ElementType) -> Result<Value> {
        let trimmed = text.trim();
        let fail = || ModelError::cast(text, target);
        Ok(match target {
            ElementType::Bool => Value::Bool(parse_bool(trimmed).ok_or_else(fail)?),
            ElementType::Int8 => Value::Int8(trimmed.parse().map_err(|_| fail())?),
            ElementType::Int16 => Value::Int16(trimmed.parse().map_err(|_| fail())?),
            ElementType::Int32 => Value::Int32(trimmed.parse().map_err(|_| fail())?),
            ElementType::Int64 => Value::Int64(trimmed.parse().map_err(|_| fail())?),
            ElementType::UInt8 => Value::UInt8(trimmed.parse().map_err(|_| fail())?),
            ElementType::UInt16 => Value::UInt16(trimmed.parse().map_err(|_| fail())?),
            ElementType::UInt32 => Value::UInt32(trimmed.parse().map_err(|_| fail())?),
            ElementType::UInt64 => Value::UInt64(trimmed.parse().map_err(|_| fail())?),
            ElementType::Float32 => Value::Float32(trimmed.parse().map_err(|_| fail())?),
            ElementType::Float64 => Value::Float64(trimmed.parse().map_err(|_| fail())?),
            ElementType::Str(_) => Value::Str(text.to_string()),
        })
    }
}

/// Parse common boolean spellings (case-insensitive).
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int8(a), Value::Int8(b)) => a == b,
            (Value::Int16(a), Value::Int16(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::UInt8(a), Value::UInt8(b)) => a == b,
            (Value::UInt16(a), Value::UInt16(b)) => a == b,
            (Value::UInt32(a), Value::UInt32(b)) => a == b,
            (Value::UInt64(a), Value::UInt64(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Float64(a), Value::Float64(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::Array(values) => {
                write!(f, "[")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
        }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

impl_value_from!(
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    String => Str,
);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

/// A value converted to plain scalar types.
///
/// NaN floats and masked entries become [`Cell::Null`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    List(Vec<Cell>),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl From<Value> for Cell {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(v) => Cell::Bool(v),
            Value::Int8(v) => Cell::Int(i64::from(v)),
            Value::Int16(v) => Cell::Int(i64::from(v)),
            Value::Int32(v) => Cell::Int(i64::from(v)),
            Value::Int64(v) => Cell::Int(v),
            Value::UInt8(v) => Cell::UInt(u64::from(v)),
            Value::UInt16(v) => Cell::UInt(u64::from(v)),
            Value::UInt32(v) => Cell::UInt(u64::from(v)),
            Value::UInt64(v) => Cell::UInt(v),
            Value::Float32(v) if v.is_nan() => Cell::Null,
            Value::Float32(v) => Cell::Float(f64::from(v)),
            Value::Float64(v) if v.is_nan() => Cell::Null,
            Value::Float64(v) => Cell::Float(v),
            Value::Str(v) => Cell::Str(v),
            Value::Array(values) => Cell::List(values.into_iter().map(Cell::from).collect()),
        }
    }
}

/// Scalar metadata value attached to a table or table set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeywordValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl KeywordValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            KeywordValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            KeywordValue::Int(v) => Some(*v),
            KeywordValue::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            KeywordValue::Int(v) => Some(*v as f64),
            KeywordValue::Float(v) => Some(*v),
            KeywordValue::Str(s) => s.trim().parse().ok(),
            KeywordValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            KeywordValue::Bool(v) => Some(*v),
            KeywordValue::Str(s) => parse_bool(s),
            _ => None,
        }
    }

    /// Infer the most specific keyword type from text (int, float, bool, string).
    pub fn infer(text: &str) -> Self {
        let trimmed = text.trim();
        if let Ok(v) = trimmed.parse::<i64>() {
            KeywordValue::Int(v)
        } else if let Ok(v) = trimmed.parse::<f64>() {
            KeywordValue::Float(v)
        } else if trimmed.eq_ignore_ascii_case("true") {
            KeywordValue::Bool(true)
        } else if trimmed.eq_ignore_ascii_case("false") {
            KeywordValue::Bool(false)
        } else {
            KeywordValue::Str(trimmed.to_string())
        }
    }
}

impl fmt::Display for KeywordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeywordValue::Bool(v) => write!(f, "{v}"),
            KeywordValue::Int(v) => write!(f, "{v}"),
            KeywordValue::Float(v) => write!(f, "{v}"),
            KeywordValue::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for KeywordValue {
    fn from(value: bool) -> Self {
        KeywordValue::Bool(value)
    }
}

impl From<i64> for KeywordValue {
    fn from(value: i64) -> Self {
        KeywordValue::Int(value)
    }
}

impl From<i32> for KeywordValue {
    fn from(value: i32) -> Self {
        KeywordValue::Int(i64::from(value))
    }
}

impl From<f64> for KeywordValue {
    fn from(value: f64) -> Self {
        KeywordValue::Float(value)
    }
}

impl From<String> for KeywordValue {
    fn from(value: String) -> Self {
        KeywordValue::Str(value)
    }
}

impl From<&str> for KeywordValue {
    fn from(value: &str) -> Self {
        KeywordValue::Str(value.to_string())
    }
}
