//! Per-column metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::ColumnData;
use crate::element::ElementType;
use crate::error::{ModelError, Result};
use crate::format::DisplayFormat;
use crate::value::Value;

/// Type, shape, and presentation metadata of one column.
///
/// The element type, shape, and null sentinel are fixed when the descriptor is
/// built. Unit, description, and display format can be edited afterwards. For
/// string columns the format width always tracks the storage width.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    element_type: ElementType,
    shape: usize,
    unit: Option<String>,
    description: Option<String>,
    null: Option<Value>,
    format: DisplayFormat,
}

impl ColumnDescriptor {
    /// Scalar column with the default display format for its type.
    pub fn new(element_type: ElementType) -> Self {
        Self {
            element_type,
            shape: 1,
            unit: None,
            description: None,
            null: None,
            format: DisplayFormat::default_for(element_type),
        }
    }

    /// Elements per row; values below 1 are treated as 1.
    pub fn with_shape(mut self, shape: usize) -> Self {
        self.shape = shape.max(1);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.set_unit(Some(unit.into()));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.set_description(Some(description.into()));
        self
    }

    /// Attach a null sentinel, converted to the column's element type.
    pub fn with_null(mut self, null: Value) -> Result<Self> {
        let converted = ColumnData::from_values(self.element_type, std::slice::from_ref(&null))?;
        self.null = converted.get(0);
        if self.null.is_none() {
            return Err(ModelError::cast(null.to_string(), self.element_type));
        }
        Ok(self)
    }

    pub fn with_format(mut self, format: DisplayFormat) -> Self {
        self.set_format(format);
        self
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn shape(&self) -> usize {
        self.shape
    }

    pub fn is_vector(&self) -> bool {
        self.shape > 1
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn null(&self) -> Option<&Value> {
        self.null.as_ref()
    }

    pub fn format(&self) -> &DisplayFormat {
        &self.format
    }

    pub fn set_unit(&mut self, unit: Option<String>) {
        self.unit = unit.filter(|u| !u.is_empty());
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description.filter(|d| !d.is_empty());
    }

    /// Replace the display format; string columns keep their storage width.
    pub fn set_format(&mut self, mut format: DisplayFormat) {
        if let ElementType::Str(width) = self.element_type {
            format.width = width;
        }
        self.format = format;
    }
}

impl PartialEq for ColumnDescriptor {
    fn eq(&self, other: &Self) -> bool {
        // Value equality already treats two NaN sentinels as equal.
        self.element_type == other.element_type
            && self.shape == other.shape
            && self.unit == other.unit
            && self.description == other.description
            && self.null == other.null
            && self.format == other.format
    }
}

impl fmt::Display for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type={}", self.element_type)?;
        if self.shape > 1 {
            write!(f, "[{}]", self.shape)?;
        }
        if let Some(unit) = &self.unit {
            write!(f, ", unit={unit}")?;
        }
        if let Some(null) = &self.null {
            write!(f, ", null={null}")?;
        }
        if let Some(description) = &self.description {
            write!(f, ", description={description}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_format_width_tracks_storage() {
        let mut descriptor = ColumnDescriptor::new(ElementType::Str(8));
        assert_eq!(descriptor.format(), &DisplayFormat::new(8, "s"));
        descriptor.set_format(DisplayFormat::new(3, "s"));
        assert_eq!(descriptor.format().width, 8);
    }

    #[test]
    fn test_null_is_cast_to_column_type() {
        let descriptor = ColumnDescriptor::new(ElementType::Int16)
            .with_null(Value::Float64(-99.0))
            .unwrap();
        assert_eq!(descriptor.null(), Some(&Value::Int16(-99)));
        assert!(
            ColumnDescriptor::new(ElementType::Int16)
                .with_null(Value::from("none"))
                .is_err()
        );
    }

    #[test]
    fn test_equality_treats_nan_nulls_as_equal() {
        let a = ColumnDescriptor::new(ElementType::Float64)
            .with_null(Value::Float64(f64::NAN))
            .unwrap();
        let b = a.clone();
        assert_eq!(a, b);
        let c = b.with_unit("deg");
        assert_ne!(a, c);
    }

    #[test]
    fn test_display() {
        let descriptor = ColumnDescriptor::new(ElementType::Float32)
            .with_unit("mag")
            .with_description("V band");
        assert_eq!(
            descriptor.to_string(),
            "type=float32, unit=mag, description=V band"
        );
        let vector = ColumnDescriptor::new(ElementType::Int32).with_shape(3);
        assert_eq!(vector.to_string(), "type=int32[3]");
    }
}
