//! IPAC fixed-width tables.
//!
//! Layout:
//!
//! ```text
//! \keyword=value
//! \ comment
//! |  name|  type|  unit|  null|
//!  value   value  ...
//! ```
//!
//! Header rows after the names are optional and positional: types, units,
//! then null values. Data rows are aligned under the pipes of the name row.

use std::io::Write;

use tabio_core::{
    ColumnData, ColumnOptions, ElementType, IoRequest, KeywordValue, Result, Table, TableError,
    ensure_no_vector_columns,
};
use tracing::debug;

use crate::common::{
    TextColumn, add_text_column, create_output, element_text, has_missing, normalize_cell,
};

const FORMAT: &str = "ipac";

/// Null text written for masked or NaN cells of columns without a sentinel.
const DEFAULT_NULL: &str = "null";

/// Which column owns the characters directly below a pipe symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Definition {
    /// The column on the left; characters under the first pipe belong to
    /// the first column.
    Left,
    /// The column on the right.
    Right,
    /// Neither; such characters are ignored.
    Neither,
}

impl Definition {
    fn from_option(value: Option<usize>) -> Result<Self> {
        match value {
            None | Some(3) => Ok(Definition::Neither),
            Some(1) => Ok(Definition::Left),
            Some(2) => Ok(Definition::Right),
            Some(other) => Err(TableError::format(
                FORMAT,
                format!("definition should be one of 1, 2 or 3, got {other}"),
            )),
        }
    }

    /// Byte range of column `index` given the pipe positions; `None` for
    /// the end means "to the end of the line".
    fn bounds(self, pipes: &[usize], index: usize) -> (usize, Option<usize>) {
        let (mut first, mut last) = (pipes[index] + 1, pipes[index + 1]);
        match self {
            Definition::Left => {
                last += 1;
                if first == 1 {
                    first = 0;
                }
            }
            Definition::Right => first -= 1,
            Definition::Neither => {}
        }
        if index + 2 == pipes.len() {
            (first, None)
        } else {
            (first, Some(last))
        }
    }
}

/// Read an IPAC table. Option `definition` (1, 2 or 3) sets how characters
/// under pipe symbols are assigned.
pub fn read_ipac(table: &mut Table, request: &IoRequest) -> Result<()> {
    let definition = Definition::from_option(request.usize_option(FORMAT, "definition")?)?;
    let text = std::fs::read_to_string(request.location())?;
    parse_ipac(table, &text, definition)
}

fn parse_ipac(table: &mut Table, text: &str, definition: Definition) -> Result<()> {
    let mut lines = text.lines().peekable();

    while let Some(line) = lines.next_if(|line| line.starts_with('\\')) {
        let body = &line[1..];
        match body.split_once('=') {
            Some((key, value)) if !body.starts_with(' ') => {
                let value = value.replace(['\'', '"'], "");
                table.add_keyword(key.trim(), KeywordValue::infer(&value));
            }
            _ => table.add_comment(body),
        }
    }

    let mut header = Vec::new();
    while let Some(line) = lines.next_if(|line| line.starts_with('|')) {
        header.push(line.trim_end());
    }
    let Some(name_row) = header.first().copied() else {
        return Err(TableError::format(FORMAT, "missing column name row"));
    };
    let pipes: Vec<usize> = name_row.match_indices('|').map(|(index, _)| index).collect();
    let names: Vec<String> = header_fields(name_row)
        .into_iter()
        .map(|field| field.replace('-', " ").trim().to_string())
        .collect();
    if names.is_empty() || pipes.len() != names.len() + 1 {
        return Err(TableError::format(FORMAT, "malformed column name row"));
    }
    if let Some(position) = names.iter().position(String::is_empty) {
        return Err(TableError::format(
            FORMAT,
            format!("column {} has no name", position + 1),
        ));
    }

    let row_fields = |row: usize| -> Vec<String> {
        header
            .get(row)
            .map(|line| header_fields(line))
            .unwrap_or_default()
    };
    let types = row_fields(1)
        .iter()
        .map(|field| parse_type(&field.replace('-', " ")))
        .collect::<Result<Vec<_>>>()?;
    let units = row_fields(2);
    let nulls = row_fields(3);

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
    for (row, line) in lines.enumerate() {
        if line.trim().is_empty() || line.starts_with('\\') {
            continue;
        }
        for (index, column) in cells.iter_mut().enumerate() {
            let (first, last) = definition.bounds(&pipes, index);
            let item = slice(line, first, last).ok_or_else(|| {
                TableError::format(
                    FORMAT,
                    format!("data row {} does not align with the header", row + 1),
                )
            })?;
            let item = item.trim();
            let null = nulls.get(index).map(String::as_str).unwrap_or("");
            let is_string = matches!(types.get(index), Some(Some(ElementType::Str(_))));
            let missing = (!null.is_empty() && item == null) || (item.is_empty() && !is_string);
            column.push((!missing).then(|| item.to_string()));
        }
    }
    debug!(columns = names.len(), rows = cells.first().map_or(0, Vec::len), "parsed ipac table");

    for (index, (name, column_cells)) in names.iter().zip(cells).enumerate() {
        let mut options = ColumnOptions::new();
        if let Some(unit) = units.get(index).filter(|unit| !unit.is_empty()) {
            options = options.unit(unit.clone());
        }
        let mut column = TextColumn::new(name, column_cells);
        column.element_type = types.get(index).copied().flatten();
        column.null = nulls
            .get(index)
            .map(String::as_str)
            .filter(|null| !null.is_empty());
        column.options = options;
        add_text_column(table, FORMAT, column)?;
    }
    Ok(())
}

/// Trimmed fields between the first and last pipe of a header row.
fn header_fields(line: &str) -> Vec<String> {
    let parts: Vec<&str> = line.trim().split('|').collect();
    if parts.len() < 2 {
        return Vec::new();
    }
    parts[1..parts.len() - 1]
        .iter()
        .map(|field| normalize_cell(field))
        .collect()
}

fn parse_type(name: &str) -> Result<Option<ElementType>> {
    let name = name.trim().to_lowercase();
    Ok(Some(match name.as_str() {
        "" => return Ok(None),
        "i" | "int" | "integer" | "l" | "long" => ElementType::Int64,
        "d" | "double" => ElementType::Float64,
        "f" | "float" | "r" | "real" => ElementType::Float32,
        "c" | "char" | "date" | "s" | "string" => ElementType::Str(0),
        other => {
            return Err(TableError::format(
                FORMAT,
                format!("unknown column type {other:?}"),
            ));
        }
    }))
}

/// IPAC has no boolean type and reads `int` as int64, so booleans and
/// uint64 values above `i64::MAX` cannot be written without changing them.
fn ensure_ipac_types(table: &Table) -> Result<()> {
    for (name, column) in table.columns() {
        let problem = match column.data() {
            ColumnData::Bool(_) => Some("bool columns have no IPAC type, cast them to int or string first"),
            ColumnData::UInt64(values) if values.iter().any(|&value| i64::try_from(value).is_err()) => {
                Some("uint64 values above the int64 range cannot be read back")
            }
            _ => None,
        };
        if let Some(problem) = problem {
            return Err(TableError::format(FORMAT, format!("column {name:?}: {problem}")));
        }
    }
    Ok(())
}

fn type_name(element_type: ElementType) -> &'static str {
    match element_type {
        ElementType::Float32 => "float",
        ElementType::Float64 => "double",
        ElementType::Str(_) => "char",
        _ => "int",
    }
}

/// Byte slice clamped to the line; `None` off a character boundary.
fn slice(line: &str, first: usize, last: Option<usize>) -> Option<&str> {
    let end = last.map_or(line.len(), |last| last.min(line.len()));
    if first >= end {
        return Some("");
    }
    line.get(first..end)
}

fn pad_left(text: &str, width: usize) -> String {
    let mut padded = " ".repeat(width.saturating_sub(text.len()));
    padded.push_str(text);
    padded
}

/// Write an IPAC table. Vector columns are rejected.
pub fn write_ipac(table: &Table, request: &IoRequest) -> Result<()> {
    ensure_no_vector_columns(table)?;
    ensure_ipac_types(table)?;
    let mut out = create_output(request)?;
    out.write_all(render_ipac(table).as_bytes())?;
    out.flush()?;
    Ok(())
}

struct Layout {
    width: usize,
    header: [String; 4],
    cells: Vec<String>,
}

fn render_ipac(table: &Table) -> String {
    let mut text = String::new();
    for (key, value) in table.keywords() {
        text.push_str(&format!("\\{key}={value}\n"));
    }
    for comment in table.comments() {
        text.push_str(&format!("\\ {comment}\n"));
    }

    let layouts: Vec<Layout> = table
        .columns()
        .map(|(name, column)| {
            let descriptor = column.descriptor();
            let null = match descriptor.null() {
                Some(value) => value.to_string(),
                None if has_missing(column) => DEFAULT_NULL.to_string(),
                None => String::new(),
            };
            let cells: Vec<String> = (0..column.rows())
                .map(|row| match (element_text(column, row), column.value(row)) {
                    (Some(_), Some(value)) => descriptor.format().render_unpadded(&value),
                    _ => null.clone(),
                })
                .collect();
            let header = [
                name.to_string(),
                type_name(column.element_type()).to_string(),
                descriptor.unit().unwrap_or_default().to_string(),
                null,
            ];
            let width = header
                .iter()
                .chain(&cells)
                .map(String::len)
                .fold(descriptor.format().width, usize::max);
            Layout {
                width,
                header,
                cells,
            }
        })
        .collect();

    let has_units = layouts.iter().any(|layout| !layout.header[2].is_empty());
    let has_nulls = layouts.iter().any(|layout| !layout.header[3].is_empty());
    let header_rows = if has_nulls {
        4
    } else if has_units {
        3
    } else {
        2
    };
    for row in 0..header_rows {
        for layout in &layouts {
            text.push('|');
            text.push_str(&pad_left(&layout.header[row], layout.width));
        }
        text.push_str("|\n");
    }
    for row in 0..table.len() {
        for layout in &layouts {
            text.push(' ');
            text.push_str(&pad_left(&layout.cells[row], layout.width));
        }
        text.push_str(" \n");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabio_core::{Nullability, Value};

    const SAMPLE: &str = concat!(
        "\\catalog='2MASS'\n",
        "\\ produced by hand\n",
        "|  ra   |  dec  | name | n  |\n",
        "| double| float | char | int|\n",
        "|  deg  |  deg  |      |    |\n",
        "|       |       | null | -1 |\n",
        "    10.5   -3.25    abc    7\n",
        "    11.0           null   -1\n",
    );

    #[test]
    fn test_parse_header_and_rows() {
        let mut table = Table::new();
        parse_ipac(&mut table, SAMPLE, Definition::Neither).unwrap();
        assert_eq!(table.keywords()["catalog"], KeywordValue::from("2MASS"));
        assert_eq!(table.comments(), &["produced by hand".to_string()]);
        assert_eq!(table.column_names(), vec!["ra", "dec", "name", "n"]);
        assert_eq!(
            table.get_column("ra").unwrap().data(),
            &ColumnData::Float64(vec![10.5, 11.0])
        );
        assert_eq!(table.column("ra").unwrap().unit(), Some("deg"));

        let dec = table.get_column("dec").unwrap();
        assert_eq!(dec.element_type(), ElementType::Float32);
        assert!(dec.is_null(1));

        let name = table.get_column("name").unwrap();
        assert_eq!(name.nullability(), Nullability::Sentinel(&Value::from("null")));
        assert!(name.is_null(1));

        let n = table.get_column("n").unwrap();
        assert_eq!(n.data(), &ColumnData::Int64(vec![7, -1]));
        assert_eq!(n.nullability(), Nullability::Sentinel(&Value::Int64(-1)));
    }

    #[test]
    fn test_definitions_assign_pipe_columns() {
        let text = "|a  |b  |\n|int|int|\n  1234567\n";
        let read = |definition| {
            let mut table = Table::new();
            parse_ipac(&mut table, text, definition).unwrap();
            (
                table.get_column("a").unwrap().data().clone(),
                table.get_column("b").unwrap().data().clone(),
            )
        };
        assert_eq!(
            read(Definition::Left),
            (ColumnData::Int64(vec![123]), ColumnData::Int64(vec![4567]))
        );
        assert_eq!(
            read(Definition::Right),
            (ColumnData::Int64(vec![12]), ColumnData::Int64(vec![34567]))
        );
        assert_eq!(
            read(Definition::Neither),
            (ColumnData::Int64(vec![12]), ColumnData::Int64(vec![4567]))
        );
    }

    #[test]
    fn test_definition_option_is_validated() {
        assert_eq!(Definition::from_option(None).unwrap(), Definition::Neither);
        assert_eq!(Definition::from_option(Some(1)).unwrap(), Definition::Left);
        assert!(Definition::from_option(Some(4)).is_err());
    }

    #[test]
    fn test_missing_header_is_an_error() {
        let mut table = Table::new();
        assert!(parse_ipac(&mut table, "\\a=1\n 1 2\n", Definition::Neither).is_err());
        assert!(parse_ipac(&mut table, "|a|\n|blob|\n", Definition::Neither).is_err());
    }

    #[test]
    fn test_render_layout() {
        let mut table = Table::new();
        table
            .add_column("id", vec![1_i32, 22], ColumnOptions::new())
            .unwrap();
        table
            .add_column("name", vec!["a", "bcd"], ColumnOptions::new())
            .unwrap();
        table.add_keyword("telescope", "VLA");
        table.add_comment("calibrated");

        let expected = [
            "\\telescope=VLA\n".to_string(),
            "\\ calibrated\n".to_string(),
            format!("|{:>12}|{:>4}|\n", "id", "name"),
            format!("|{:>12}|{:>4}|\n", "int", "char"),
            format!(" {:>12} {:>4} \n", "1", "a"),
            format!(" {:>12} {:>4} \n", "22", "bcd"),
        ]
        .concat();
        assert_eq!(render_ipac(&table), expected);
    }

    #[test]
    fn test_types_without_ipac_equivalent_are_rejected() {
        let mut table = Table::new();
        table
            .add_column("flag", vec![true, false], ColumnOptions::new())
            .unwrap();
        assert!(ensure_ipac_types(&table).unwrap_err().to_string().contains("\"flag\""));

        let mut table = Table::new();
        table
            .add_column("id", vec![1_u64, 2], ColumnOptions::new())
            .unwrap();
        ensure_ipac_types(&table).unwrap();
        table
            .add_column("big", vec![u64::MAX, 2], ColumnOptions::new())
            .unwrap();
        assert!(ensure_ipac_types(&table).is_err());
    }

    #[test]
    fn test_render_writes_units_row_when_only_nulls_exist() {
        let mut table = Table::new();
        table
            .add_column("x", vec![1.0_f64, f64::NAN], ColumnOptions::new())
            .unwrap();
        let text = render_ipac(&table);
        let header: Vec<&str> = text.lines().filter(|line| line.starts_with('|')).collect();
        assert_eq!(header.len(), 4);
        assert!(header[3].ends_with("null|"));

        let mut back = Table::new();
        parse_ipac(&mut back, &text, Definition::Neither).unwrap();
        assert!(back.get_column("x").unwrap().is_null(1));
    }
}
