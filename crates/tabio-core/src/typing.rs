//! Column type decisions.
//!
//! Turns caller input plus [`ColumnOptions`] into a fully described
//! [`Column`]: resolves the storage type, the display format, and the null
//! representation for masked or sentinel tables.

use tabio_model::{ColumnData, ColumnDescriptor, DisplayFormat, ElementType, ModelError, Value};

use crate::column::Column;
use crate::diagnostics::{self, Diagnostic};
use crate::error::{Result, SchemaError};

/// Data supplied for a new column.
#[derive(Debug, Clone)]
pub enum ColumnInput {
    /// Typed scalar data, one element per row.
    Data(ColumnData),
    /// Heterogeneous values; stored as strings unless a dtype is given.
    Objects(Vec<Value>),
    /// Flat typed data holding `width` elements per row.
    Vector { data: ColumnData, width: usize },
}

impl From<ColumnData> for ColumnInput {
    fn from(data: ColumnData) -> Self {
        ColumnInput::Data(data)
    }
}

impl From<Vec<Value>> for ColumnInput {
    fn from(values: Vec<Value>) -> Self {
        ColumnInput::Objects(values)
    }
}

macro_rules! impl_input_from_vec {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for ColumnInput {
                fn from(values: Vec<$ty>) -> Self {
                    ColumnInput::Data(ColumnData::from(values))
                }
            }
        )*
    };
}

impl_input_from_vec!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String, &str);

/// Where a new column goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    Before(String),
    After(String),
    /// Zero-based index; indices past the end append.
    Index(usize),
}

/// Optional arguments for adding a column.
#[derive(Debug, Clone, Default)]
pub struct ColumnOptions {
    pub dtype: Option<ElementType>,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub null: Option<Value>,
    pub format: Option<DisplayFormat>,
    /// Descriptor of a source column; overrides the individual arguments.
    pub header: Option<ColumnDescriptor>,
    /// Missing-value mask (masked tables only).
    pub mask: Option<Vec<bool>>,
    /// Fill value (masked tables only).
    pub fill: Option<Value>,
    pub position: Option<Position>,
}

impl ColumnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dtype(mut self, dtype: ElementType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn null(mut self, null: impl Into<Value>) -> Self {
        self.null = Some(null.into());
        self
    }

    pub fn format(mut self, format: DisplayFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn header(mut self, header: ColumnDescriptor) -> Self {
        self.header = Some(header);
        self
    }

    pub fn mask(mut self, mask: Vec<bool>) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn fill(mut self, fill: impl Into<Value>) -> Self {
        self.fill = Some(fill.into());
        self
    }

    pub fn before(mut self, name: impl Into<String>) -> Self {
        self.position = Some(Position::Before(name.into()));
        self
    }

    pub fn after(mut self, name: impl Into<String>) -> Self {
        self.position = Some(Position::After(name.into()));
        self
    }

    pub fn at(mut self, index: usize) -> Self {
        self.position = Some(Position::Index(index));
        self
    }
}

/// Fill value used for masked columns when none is supplied.
///
/// Integer types too narrow for 999999 use their maximum.
pub fn default_fill(element_type: ElementType) -> Value {
    let fill = match element_type {
        ElementType::Bool => Value::Bool(true),
        ElementType::Float32 | ElementType::Float64 => Value::Float64(1e20),
        ElementType::Str(_) => Value::from("N/A"),
        ElementType::Int8 => Value::Int8(i8::MAX),
        ElementType::Int16 => Value::Int16(i16::MAX),
        ElementType::UInt8 => Value::UInt8(u8::MAX),
        ElementType::UInt16 => Value::UInt16(u16::MAX),
        _ => Value::Int64(999_999),
    };
    cast_scalar(&fill, element_type).unwrap_or(fill)
}

fn cast_scalar(value: &Value, element_type: ElementType) -> Option<Value> {
    ColumnData::from_values(element_type, std::slice::from_ref(value))
        .ok()
        .and_then(|data| data.get(0))
}

/// Replace an argument with the header's value, warning if one was supplied.
fn take_from_header<T>(column: &str, field: &'static str, argument: &mut Option<T>, header: Option<T>) {
    if argument.is_some() {
        diagnostics::emit(Diagnostic::HeaderOverride {
            column: column.to_string(),
            field,
        });
    }
    *argument = header;
}

/// Resolve input and options into a column for a table with the given mode.
pub(crate) fn build_column(
    name: &str,
    input: ColumnInput,
    options: ColumnOptions,
    masked: bool,
) -> Result<Column> {
    let ColumnOptions {
        mut dtype,
        mut unit,
        mut description,
        mut null,
        mut format,
        header,
        mask,
        fill,
        position: _,
    } = options;

    let mut header_width = None;
    if let Some(header) = header {
        take_from_header(name, "dtype", &mut dtype, Some(header.element_type()));
        take_from_header(name, "unit", &mut unit, header.unit().map(str::to_string));
        take_from_header(name, "null", &mut null, header.null().cloned());
        take_from_header(
            name,
            "description",
            &mut description,
            header.description().map(str::to_string),
        );
        take_from_header(name, "format", &mut format, Some(header.format().clone()));
        header_width = Some(header.shape());
    }

    let (data, explicit_width) = match input {
        ColumnInput::Data(data) => (data, None),
        ColumnInput::Vector { data, width } => (data, Some(width)),
        ColumnInput::Objects(values) => match dtype {
            Some(target) => (ColumnData::from_values(target, &values)?, None),
            None => (
                ColumnData::strings(values.iter().map(ToString::to_string)),
                None,
            ),
        },
    };
    let width = explicit_width.or(header_width).unwrap_or(1);
    if width == 0 || data.len() % width != 0 {
        return Err(ModelError::VectorWidth {
            len: data.len(),
            width,
        }
        .into());
    }

    let data = match dtype {
        Some(target) => data.cast(target)?,
        None => data,
    };
    let element_type = data.element_type();

    let mut descriptor = ColumnDescriptor::new(element_type)
        .with_shape(width)
        .with_format(format.unwrap_or_else(|| DisplayFormat::default_for(element_type)));
    descriptor.set_unit(unit);
    descriptor.set_description(description);

    if masked {
        if null.is_some() {
            diagnostics::emit(Diagnostic::NullIgnored {
                column: name.to_string(),
            });
        }
        let mask = match mask {
            Some(mask) if mask.len() != data.len() => {
                return Err(SchemaError::MissingMask {
                    name: name.to_string(),
                    expected: data.len(),
                    actual: mask.len(),
                }
                .into());
            }
            Some(mask) => mask,
            None => vec![false; data.len()],
        };
        let fill = match fill {
            Some(fill) => cast_scalar(&fill, element_type).ok_or_else(|| {
                ModelError::cast(fill.to_string(), element_type)
            })?,
            None => default_fill(element_type),
        };
        return Ok(Column {
            descriptor,
            data,
            mask: Some(mask),
            fill: Some(fill),
        });
    }

    if mask.as_ref().is_some_and(|mask| mask.iter().any(|&m| m)) {
        diagnostics::emit(Diagnostic::MaskIgnored {
            column: name.to_string(),
        });
    }
    if let Some(null) = null {
        let text = null.to_string();
        descriptor = descriptor
            .with_null(null)
            .map_err(|_| SchemaError::InvalidNull {
                name: name.to_string(),
                value: text,
            })?;
    }
    Ok(Column {
        descriptor,
        data,
        mask: None,
        fill: None,
    })
}
