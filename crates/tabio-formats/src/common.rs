//! Helpers shared by the text-based codecs.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tabio_core::diagnostics::{self, Diagnostic};
use tabio_core::{
    Column, ColumnData, ColumnInput, ColumnOptions, ElementType, IoRequest, Result, Table,
    TableError, Value, ensure_writable,
};

/// Strip a UTF-8 byte order mark and surrounding whitespace.
pub(crate) fn normalize_cell(raw: &str) -> String {
    raw.trim_matches('\u{feff}').trim().to_string()
}

/// Infer a column type from text cells: bool (`true`/`false` in any case),
/// int64, uint64, float, then string.
///
/// Missing cells are skipped. A non-empty column with no values at all is
/// float so its nulls can be NaN.
pub(crate) fn infer_type(cells: &[Option<String>]) -> ElementType {
    let present: Vec<&str> = cells.iter().flatten().map(|cell| cell.trim()).collect();
    if present.is_empty() {
        return if cells.is_empty() {
            ElementType::Str(0)
        } else {
            ElementType::Float64
        };
    }
    let is_bool =
        |text: &&str| text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false");
    if present.iter().all(is_bool) {
        ElementType::Bool
    } else if present.iter().all(|text| text.parse::<i64>().is_ok()) {
        ElementType::Int64
    } else if present.iter().all(|text| text.parse::<u64>().is_ok()) {
        ElementType::UInt64
    } else if present.iter().all(|text| text.parse::<f64>().is_ok()) {
        ElementType::Float64
    } else {
        ElementType::Str(0)
    }
}

/// Text stored in place of a missing cell.
fn placeholder(element_type: ElementType) -> &'static str {
    match element_type {
        ElementType::Bool => "false",
        ElementType::Float32 | ElementType::Float64 => "NaN",
        ElementType::Str(_) => "",
        _ => "0",
    }
}

/// A column read as text cells, not yet typed.
pub(crate) struct TextColumn<'a> {
    pub name: &'a str,
    /// Flat elements; `None` marks a missing element.
    pub cells: Vec<Option<String>>,
    /// Declared type, or `None` to infer one.
    pub element_type: Option<ElementType>,
    /// Elements per row.
    pub width: usize,
    /// Sentinel text declared by the source, if any.
    pub null: Option<&'a str>,
    pub options: ColumnOptions,
}

impl<'a> TextColumn<'a> {
    pub(crate) fn new(name: &'a str, cells: Vec<Option<String>>) -> Self {
        Self {
            name,
            cells,
            element_type: None,
            width: 1,
            null: None,
            options: ColumnOptions::new(),
        }
    }
}

/// Type the cells of a text column and add it to the table.
///
/// Masked tables get a mask over the missing cells. Otherwise a parseable
/// sentinel fills missing cells, floats use NaN, and integer columns with
/// missing cells but no sentinel are stored as float64.
pub(crate) fn add_text_column(table: &mut Table, format: &str, column: TextColumn<'_>) -> Result<()> {
    let TextColumn {
        name,
        cells,
        element_type,
        width,
        null,
        mut options,
    } = column;
    let mut target = element_type.unwrap_or_else(|| infer_type(&cells));
    let has_nulls = cells.iter().any(Option::is_none);
    let mut fill = placeholder(target).to_string();

    if table.is_masked() {
        if has_nulls {
            options = options.mask(cells.iter().map(Option::is_none).collect());
        }
    } else {
        let sentinel = null.and_then(|text| {
            Value::parse_as(text, target)
                .ok()
                .filter(|value| !value.is_nan())
                .map(|value| (text, value))
        });
        match sentinel {
            Some((text, value)) => {
                if !target.is_float() {
                    fill = text.to_string();
                }
                options = options.null(value);
            }
            None if has_nulls && target.is_integer() => {
                diagnostics::emit(Diagnostic::codec(
                    format,
                    format!("column {name:?} has missing values and no null value, storing it as float64"),
                ));
                target = ElementType::Float64;
                fill = placeholder(target).to_string();
            }
            None if has_nulls && target == ElementType::Bool => {
                diagnostics::emit(Diagnostic::codec(
                    format,
                    format!("column {name:?} has missing values and no null value, storing them as false"),
                ));
            }
            None => {}
        }
    }

    let texts: Vec<String> = cells
        .into_iter()
        .map(|cell| cell.unwrap_or_else(|| fill.clone()))
        .collect();
    let data = if target.is_string() {
        ColumnData::strings(texts)
    } else {
        ColumnData::parse_texts(target, &texts)
            .map_err(|err| TableError::format(format, format!("column {name:?}: {err}")))?
    };
    let input = if width > 1 {
        ColumnInput::Vector { data, width }
    } else {
        ColumnInput::Data(data)
    };
    table.add_column(name, input, options)
}

/// Text of the element at a flat index, or `None` when it is missing.
///
/// Masked elements and NaN are missing; sentinel values are written as stored.
pub(crate) fn element_text(column: &Column, index: usize) -> Option<String> {
    if column.is_masked(index) || column.data().is_nan(index) {
        return None;
    }
    column.data().get(index).map(|value| value.to_string())
}

/// Whether any element of the column is masked or NaN.
pub(crate) fn has_missing(column: &Column) -> bool {
    (0..column.data().len()).any(|index| column.is_masked(index) || column.data().is_nan(index))
}

/// Create the output file after checking the overwrite policy.
pub(crate) fn create_output(request: &IoRequest) -> Result<BufWriter<File>> {
    let path: &Path = request.location();
    ensure_writable(path, request.allows_overwrite())?;
    Ok(BufWriter::new(File::create(path)?))
}
