//! Typed column-major storage.
//!
//! [`ColumnData`] holds the flat element buffer of one column. Vector
//! columns store `rows * width` elements row by row; the per-row width lives
//! in the column descriptor, so row-level helpers take it as an argument.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::element::ElementType;
use crate::error::{ModelError, Result};
use crate::value::{Value, parse_bool};

/// Flat, homogeneously typed element buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum ColumnData {
    Bool(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    /// Fixed-width strings; no value is longer than `width` bytes.
    Str { width: usize, values: Vec<String> },
}

/// Run an expression against the inner `Vec` of any variant.
macro_rules! with_values {
    ($data:expr, $values:ident => $body:expr) => {
        match $data {
            ColumnData::Bool($values) => $body,
            ColumnData::Int8($values) => $body,
            ColumnData::Int16($values) => $body,
            ColumnData::Int32($values) => $body,
            ColumnData::Int64($values) => $body,
            ColumnData::UInt8($values) => $body,
            ColumnData::UInt16($values) => $body,
            ColumnData::UInt32($values) => $body,
            ColumnData::UInt64($values) => $body,
            ColumnData::Float32($values) => $body,
            ColumnData::Float64($values) => $body,
            ColumnData::Str {
                values: $values, ..
            } => $body,
        }
    };
}

/// Rebuild the same variant from an expression over the inner `Vec`.
macro_rules! map_values {
    ($data:expr, $values:ident => $body:expr) => {
        match $data {
            ColumnData::Bool($values) => ColumnData::Bool($body),
            ColumnData::Int8($values) => ColumnData::Int8($body),
            ColumnData::Int16($values) => ColumnData::Int16($body),
            ColumnData::Int32($values) => ColumnData::Int32($body),
            ColumnData::Int64($values) => ColumnData::Int64($body),
            ColumnData::UInt8($values) => ColumnData::UInt8($body),
            ColumnData::UInt16($values) => ColumnData::UInt16($body),
            ColumnData::UInt32($values) => ColumnData::UInt32($body),
            ColumnData::UInt64($values) => ColumnData::UInt64($body),
            ColumnData::Float32($values) => ColumnData::Float32($body),
            ColumnData::Float64($values) => ColumnData::Float64($body),
            ColumnData::Str {
                width,
                values: $values,
            } => ColumnData::Str {
                width: *width,
                values: $body,
            },
        }
    };
}

/// Numeric element conversion with `as`-cast semantics.
trait NumericElement: Copy {
    fn from_i128(value: i128) -> Self;
    fn from_f64(value: f64) -> Self;
    fn parse_text(text: &str) -> Option<Self>;
}

macro_rules! impl_numeric_element {
    ($($ty:ty),*) => {
        $(
            impl NumericElement for $ty {
                fn from_i128(value: i128) -> Self {
                    value as $ty
                }
                fn from_f64(value: f64) -> Self {
                    value as $ty
                }
                fn parse_text(text: &str) -> Option<Self> {
                    text.parse().ok()
                }
            }
        )*
    };
}

impl_numeric_element!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

fn integer_of(value: &Value) -> Option<i128> {
    match value {
        Value::Bool(v) => Some(i128::from(*v)),
        Value::Int8(v) => Some(i128::from(*v)),
        Value::Int16(v) => Some(i128::from(*v)),
        Value::Int32(v) => Some(i128::from(*v)),
        Value::Int64(v) => Some(i128::from(*v)),
        Value::UInt8(v) => Some(i128::from(*v)),
        Value::UInt16(v) => Some(i128::from(*v)),
        Value::UInt32(v) => Some(i128::from(*v)),
        Value::UInt64(v) => Some(i128::from(*v)),
        _ => None,
    }
}

fn convert_numeric<T: NumericElement>(value: &Value, target: ElementType) -> Result<T> {
    if let Some(int) = integer_of(value) {
        return Ok(T::from_i128(int));
    }
    match value {
        Value::Float32(v) => Ok(T::from_f64(f64::from(*v))),
        Value::Float64(v) => Ok(T::from_f64(*v)),
        Value::Str(s) => T::parse_text(s.trim()).ok_or_else(|| ModelError::cast(s.as_str(), target)),
        other => Err(ModelError::cast(other.to_string(), target)),
    }
}

fn convert_bool(value: &Value) -> Result<bool> {
    if let Some(int) = integer_of(value) {
        return Ok(int != 0);
    }
    match value {
        Value::Float32(v) => Ok(*v != 0.0),
        Value::Float64(v) => Ok(*v != 0.0),
        Value::Str(s) => parse_bool(s).ok_or_else(|| ModelError::cast(s.as_str(), ElementType::Bool)),
        other => Err(ModelError::cast(other.to_string(), ElementType::Bool)),
    }
}

fn collect_numeric<T: NumericElement>(values: &[Value], target: ElementType) -> Result<Vec<T>> {
    values
        .iter()
        .map(|value| convert_numeric(value, target))
        .collect()
}

/// Truncate a string to at most `width` bytes on a character boundary.
pub fn fit_str(mut text: String, width: usize) -> String {
    if text.len() > width {
        let mut end = width;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}

fn cmp_float(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

impl ColumnData {
    /// Build a string column sized to its longest element.
    pub fn strings<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        let width = values.iter().map(String::len).max().unwrap_or(0);
        ColumnData::Str { width, values }
    }

    /// Build a column of `len` zero (or empty string) elements.
    pub fn zeros(element_type: ElementType, len: usize) -> Self {
        match element_type {
            ElementType::Bool => ColumnData::Bool(vec![false; len]),
            ElementType::Int8 => ColumnData::Int8(vec![0; len]),
            ElementType::Int16 => ColumnData::Int16(vec![0; len]),
            ElementType::Int32 => ColumnData::Int32(vec![0; len]),
            ElementType::Int64 => ColumnData::Int64(vec![0; len]),
            ElementType::UInt8 => ColumnData::UInt8(vec![0; len]),
            ElementType::UInt16 => ColumnData::UInt16(vec![0; len]),
            ElementType::UInt32 => ColumnData::UInt32(vec![0; len]),
            ElementType::UInt64 => ColumnData::UInt64(vec![0; len]),
            ElementType::Float32 => ColumnData::Float32(vec![0.0; len]),
            ElementType::Float64 => ColumnData::Float64(vec![0.0; len]),
            ElementType::Str(width) => ColumnData::Str {
                width,
                values: vec![String::new(); len],
            },
        }
    }

    /// Build a column of the target type, converting every value.
    pub fn from_values(target: ElementType, values: &[Value]) -> Result<Self> {
        Ok(match target {
            ElementType::Bool => {
                ColumnData::Bool(values.iter().map(convert_bool).collect::<Result<_>>()?)
            }
            ElementType::Int8 => ColumnData::Int8(collect_numeric(values, target)?),
            ElementType::Int16 => ColumnData::Int16(collect_numeric(values, target)?),
            ElementType::Int32 => ColumnData::Int32(collect_numeric(values, target)?),
            ElementType::Int64 => ColumnData::Int64(collect_numeric(values, target)?),
            ElementType::UInt8 => ColumnData::UInt8(collect_numeric(values, target)?),
            ElementType::UInt16 => ColumnData::UInt16(collect_numeric(values, target)?),
            ElementType::UInt32 => ColumnData::UInt32(collect_numeric(values, target)?),
            ElementType::UInt64 => ColumnData::UInt64(collect_numeric(values, target)?),
            ElementType::Float32 => ColumnData::Float32(collect_numeric(values, target)?),
            ElementType::Float64 => ColumnData::Float64(collect_numeric(values, target)?),
            ElementType::Str(width) => ColumnData::Str {
                width,
                values: values
                    .iter()
                    .map(|value| match value {
                        Value::Array(_) => Err(ModelError::cast(value.to_string(), target)),
                        other => Ok(fit_str(other.to_string(), width)),
                    })
                    .collect::<Result<_>>()?,
            },
        })
    }

    /// Parse text cells into a column of the target type.
    pub fn parse_texts<S: AsRef<str>>(target: ElementType, texts: &[S]) -> Result<Self> {
        let values = texts
            .iter()
            .map(|text| Value::parse_as(text.as_ref(), target))
            .collect::<Result<Vec<_>>>()?;
        Self::from_values(target, &values)
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            ColumnData::Bool(_) => ElementType::Bool,
            ColumnData::Int8(_) => ElementType::Int8,
            ColumnData::Int16(_) => ElementType::Int16,
            ColumnData::Int32(_) => ElementType::Int32,
            ColumnData::Int64(_) => ElementType::Int64,
            ColumnData::UInt8(_) => ElementType::UInt8,
            ColumnData::UInt16(_) => ElementType::UInt16,
            ColumnData::UInt32(_) => ElementType::UInt32,
            ColumnData::UInt64(_) => ElementType::UInt64,
            ColumnData::Float32(_) => ElementType::Float32,
            ColumnData::Float64(_) => ElementType::Float64,
            ColumnData::Str { width, .. } => ElementType::Str(*width),
        }
    }

    /// Number of elements (not rows).
    pub fn len(&self) -> usize {
        with_values!(self, values => values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at a flat index.
    pub fn get(&self, index: usize) -> Option<Value> {
        Some(match self {
            ColumnData::Bool(v) => Value::Bool(*v.get(index)?),
            ColumnData::Int8(v) => Value::Int8(*v.get(index)?),
            ColumnData::Int16(v) => Value::Int16(*v.get(index)?),
            ColumnData::Int32(v) => Value::Int32(*v.get(index)?),
            ColumnData::Int64(v) => Value::Int64(*v.get(index)?),
            ColumnData::UInt8(v) => Value::UInt8(*v.get(index)?),
            ColumnData::UInt16(v) => Value::UInt16(*v.get(index)?),
            ColumnData::UInt32(v) => Value::UInt32(*v.get(index)?),
            ColumnData::UInt64(v) => Value::UInt64(*v.get(index)?),
            ColumnData::Float32(v) => Value::Float32(*v.get(index)?),
            ColumnData::Float64(v) => Value::Float64(*v.get(index)?),
            ColumnData::Str { values, .. } => Value::Str(values.get(index)?.clone()),
        })
    }

    /// One row as a value: a scalar when `width == 1`, otherwise an array.
    pub fn row(&self, row: usize, width: usize) -> Option<Value> {
        if width == 1 {
            return self.get(row);
        }
        let start = row.checked_mul(width)?;
        (start..start + width)
            .map(|index| self.get(index))
            .collect::<Option<Vec<_>>>()
            .map(Value::Array)
    }

    /// All elements as values.
    pub fn values(&self) -> Vec<Value> {
        (0..self.len()).filter_map(|index| self.get(index)).collect()
    }

    /// Whether the element at a flat index is a floating-point NaN.
    pub fn is_nan(&self, index: usize) -> bool {
        match self {
            ColumnData::Float32(v) => v.get(index).is_some_and(|x| x.is_nan()),
            ColumnData::Float64(v) => v.get(index).is_some_and(|x| x.is_nan()),
            _ => false,
        }
    }

    /// Convert every element to another element type.
    pub fn cast(&self, target: ElementType) -> Result<Self> {
        if self.element_type() == target {
            return Ok(self.clone());
        }
        Self::from_values(target, &self.values())
    }

    /// Gather whole rows (each `width` elements long) in the given order.
    ///
    /// Indices must be in range; callers validate them against the row count.
    pub fn take_rows(&self, rows: &[usize], width: usize) -> Self {
        map_values!(self, values => rows
            .iter()
            .flat_map(|&row| values[row * width..(row + 1) * width].iter().cloned())
            .collect())
    }

    /// Append the elements of another buffer of the same type.
    pub fn extend_from(&mut self, other: &ColumnData) -> Result<()> {
        let mismatch = ModelError::TypeMismatch {
            expected: self.element_type(),
            actual: other.element_type(),
        };
        match (&mut *self, other) {
            (ColumnData::Bool(a), ColumnData::Bool(b)) => a.extend_from_slice(b),
            (ColumnData::Int8(a), ColumnData::Int8(b)) => a.extend_from_slice(b),
            (ColumnData::Int16(a), ColumnData::Int16(b)) => a.extend_from_slice(b),
            (ColumnData::Int32(a), ColumnData::Int32(b)) => a.extend_from_slice(b),
            (ColumnData::Int64(a), ColumnData::Int64(b)) => a.extend_from_slice(b),
            (ColumnData::UInt8(a), ColumnData::UInt8(b)) => a.extend_from_slice(b),
            (ColumnData::UInt16(a), ColumnData::UInt16(b)) => a.extend_from_slice(b),
            (ColumnData::UInt32(a), ColumnData::UInt32(b)) => a.extend_from_slice(b),
            (ColumnData::UInt64(a), ColumnData::UInt64(b)) => a.extend_from_slice(b),
            (ColumnData::Float32(a), ColumnData::Float32(b)) => a.extend_from_slice(b),
            (ColumnData::Float64(a), ColumnData::Float64(b)) => a.extend_from_slice(b),
            (
                ColumnData::Str { width, values },
                ColumnData::Str {
                    width: other_width,
                    values: other_values,
                },
            ) if width == other_width => values.extend_from_slice(other_values),
            _ => return Err(mismatch),
        }
        Ok(())
    }

    /// Compare two elements; NaN sorts after every number.
    pub fn compare_elements(&self, a: usize, b: usize) -> Ordering {
        match self {
            ColumnData::Bool(v) => v[a].cmp(&v[b]),
            ColumnData::Int8(v) => v[a].cmp(&v[b]),
            ColumnData::Int16(v) => v[a].cmp(&v[b]),
            ColumnData::Int32(v) => v[a].cmp(&v[b]),
            ColumnData::Int64(v) => v[a].cmp(&v[b]),
            ColumnData::UInt8(v) => v[a].cmp(&v[b]),
            ColumnData::UInt16(v) => v[a].cmp(&v[b]),
            ColumnData::UInt32(v) => v[a].cmp(&v[b]),
            ColumnData::UInt64(v) => v[a].cmp(&v[b]),
            ColumnData::Float32(v) => cmp_float(f64::from(v[a]), f64::from(v[b])),
            ColumnData::Float64(v) => cmp_float(v[a], v[b]),
            ColumnData::Str { values, .. } => values[a].as_bytes().cmp(values[b].as_bytes()),
        }
    }

    /// Lexicographic comparison of two rows of `width` elements.
    pub fn compare_rows(&self, a: usize, b: usize, width: usize) -> Ordering {
        (0..width)
            .map(|offset| self.compare_elements(a * width + offset, b * width + offset))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Inclusive value range of an integer column; `None` when empty or not integer.
    pub fn integer_bounds(&self) -> Option<(i128, i128)> {
        fn bounds<T: Copy + Into<i128>>(values: &[T]) -> Option<(i128, i128)> {
            values.iter().fold(None, |acc, &value| {
                let value: i128 = value.into();
                Some(match acc {
                    None => (value, value),
                    Some((lo, hi)) => (lo.min(value), hi.max(value)),
                })
            })
        }
        match self {
            ColumnData::Int8(v) => bounds(v),
            ColumnData::Int16(v) => bounds(v),
            ColumnData::Int32(v) => bounds(v),
            ColumnData::Int64(v) => bounds(v),
            ColumnData::UInt8(v) => bounds(v),
            ColumnData::UInt16(v) => bounds(v),
            ColumnData::UInt32(v) => bounds(v),
            ColumnData::UInt64(v) => bounds(v),
            _ => None,
        }
    }

    /// Longest string in bytes (0 for non-string columns).
    pub fn longest_str(&self) -> usize {
        match self {
            ColumnData::Str { values, .. } => values.iter().map(String::len).max().unwrap_or(0),
            _ => 0,
        }
    }
}

macro_rules! impl_slice_accessors {
    ($($method:ident => $variant:ident : $ty:ty),* $(,)?) => {
        impl ColumnData {
            $(
                pub fn $method(&self) -> Option<&[$ty]> {
                    match self {
                        ColumnData::$variant(values) => Some(values),
                        _ => None,
                    }
                }
            )*

            pub fn as_strings(&self) -> Option<&[String]> {
                match self {
                    ColumnData::Str { values, .. } => Some(values),
                    _ => None,
                }
            }
        }
    };
}

impl_slice_accessors!(
    as_bools => Bool: bool,
    as_i8 => Int8: i8,
    as_i16 => Int16: i16,
    as_i32 => Int32: i32,
    as_i64 => Int64: i64,
    as_u8 => UInt8: u8,
    as_u16 => UInt16: u16,
    as_u32 => UInt32: u32,
    as_u64 => UInt64: u64,
    as_f32 => Float32: f32,
    as_f64 => Float64: f64,
);

impl PartialEq for ColumnData {
    fn eq(&self, other: &Self) -> bool {
        fn floats_eq<T: PartialEq + Copy>(a: &[T], b: &[T], is_nan: fn(T) -> bool) -> bool {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|(&x, &y)| x == y || (is_nan(x) && is_nan(y)))
        }
        match (self, other) {
            (ColumnData::Float32(a), ColumnData::Float32(b)) => floats_eq(a, b, f32::is_nan),
            (ColumnData::Float64(a), ColumnData::Float64(b)) => floats_eq(a, b, f64::is_nan),
            (ColumnData::Bool(a), ColumnData::Bool(b)) => a == b,
            (ColumnData::Int8(a), ColumnData::Int8(b)) => a == b,
            (ColumnData::Int16(a), ColumnData::Int16(b)) => a == b,
            (ColumnData::Int32(a), ColumnData::Int32(b)) => a == b,
            (ColumnData::Int64(a), ColumnData::Int64(b)) => a == b,
            (ColumnData::UInt8(a), ColumnData::UInt8(b)) => a == b,
            (ColumnData::UInt16(a), ColumnData::UInt16(b)) => a == b,
            (ColumnData::UInt32(a), ColumnData::UInt32(b)) => a == b,
            (ColumnData::UInt64(a), ColumnData::UInt64(b)) => a == b,
            (
                ColumnData::Str { width, values },
                ColumnData::Str {
                    width: other_width,
                    values: other_values,
                },
            ) => width == other_width && values == other_values,
            _ => false,
        }
    }
}

macro_rules! impl_from_vec {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for ColumnData {
                fn from(values: Vec<$ty>) -> Self {
                    ColumnData::$variant(values)
                }
            }
        )*
    };
}

impl_from_vec!(
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
);

impl From<Vec<String>> for ColumnData {
    fn from(values: Vec<String>) -> Self {
        ColumnData::strings(values)
    }
}

impl From<Vec<&str>> for ColumnData {
    fn from(values: Vec<&str>) -> Self {
        ColumnData::strings(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strings_width_is_longest() {
        let data = ColumnData::strings(["a", "abc", ""]);
        assert_eq!(data.element_type(), ElementType::Str(3));
        assert_eq!(ColumnData::strings(Vec::<String>::new()).element_type(), ElementType::Str(0));
    }

    #[test]
    fn test_cast_numeric_and_text() {
        let data = ColumnData::from(vec![1.9_f64, -2.5]);
        assert_eq!(
            data.cast(ElementType::Int32).unwrap(),
            ColumnData::Int32(vec![1, -2])
        );
        let text = ColumnData::strings(["1", " 2 ", "3"]);
        assert_eq!(
            text.cast(ElementType::UInt8).unwrap(),
            ColumnData::UInt8(vec![1, 2, 3])
        );
        let bad = ColumnData::strings(["1", "x"]);
        assert!(matches!(
            bad.cast(ElementType::Int64),
            Err(ModelError::Cast { .. })
        ));
    }

    #[test]
    fn test_cast_to_narrow_string_truncates_on_char_boundary() {
        let data = ColumnData::strings(["héllo"]);
        let narrowed = data.cast(ElementType::Str(2)).unwrap();
        assert_eq!(narrowed.as_strings().unwrap(), &["h".to_string()]);
    }

    #[test]
    fn test_take_rows_of_vector_column() {
        let data = ColumnData::from(vec![1_i16, 2, 3, 4, 5, 6]);
        let taken = data.take_rows(&[2, 0, 2], 2);
        assert_eq!(taken, ColumnData::Int16(vec![5, 6, 1, 2, 5, 6]));
    }

    #[test]
    fn test_compare_puts_nan_last() {
        let data = ColumnData::from(vec![f64::NAN, 1.0]);
        assert_eq!(data.compare_elements(0, 1), Ordering::Greater);
        assert_eq!(data.compare_elements(1, 0), Ordering::Less);
    }

    #[test]
    fn test_extend_rejects_mismatched_types() {
        let mut data = ColumnData::from(vec![1_i32]);
        assert!(data.extend_from(&ColumnData::from(vec![2_i64])).is_err());
        data.extend_from(&ColumnData::from(vec![2_i32])).unwrap();
        assert_eq!(data.as_i32().unwrap(), &[1, 2]);
    }

    #[test]
    fn test_nan_aware_equality() {
        assert_eq!(
            ColumnData::from(vec![f32::NAN, 1.0]),
            ColumnData::from(vec![f32::NAN, 1.0])
        );
    }

    #[test]
    fn test_integer_bounds() {
        let data = ColumnData::from(vec![5_u64, 2, 9]);
        assert_eq!(data.integer_bounds(), Some((2, 9)));
        assert_eq!(ColumnData::from(vec![1.0_f32]).integer_bounds(), None);
    }
}
