use std::collections::HashSet;
use std::io::{self, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tabio_core::diagnostics::{self, Diagnostic};
use tabio_core::{
    Column, ElementType, IoRequest, KeywordValue, Result, Table, TableError, TableSet, Value,
};
use tracing::debug;

use super::{COMMENT_INFO, FORMAT};
use crate::common::create_output;

const VOTABLE_VERSION: &str = "1.2";
const VOTABLE_NAMESPACE: &str = "http://www.ivoa.net/xml/VOTable/v1.2";

/// `FIELD` attributes planned for one column.
#[derive(Debug, PartialEq)]
struct FieldSpec {
    datatype: &'static str,
    arraysize: Option<String>,
    /// Text written for masked elements that cannot be an empty `TD`.
    marker: Option<String>,
}

/// Write one table as a single-resource document.
pub fn write_votable(table: &Table, request: &IoRequest) -> Result<()> {
    let fields = field_specs(table)?;
    let mut xml = Writer::new_with_indent(create_output(request)?, b' ', 2);
    start_document(&mut xml)?;
    write_event(&mut xml, Event::Start(BytesStart::new("RESOURCE")))?;
    write_table(&mut xml, table, &fields)?;
    write_event(&mut xml, Event::End(BytesEnd::new("RESOURCE")))?;
    write_event(&mut xml, Event::End(BytesEnd::new("VOTABLE")))?;
    xml.into_inner().flush()?;
    Ok(())
}

/// Write every table of a set into one resource. Set keywords and comments
/// go on the resource.
pub fn write_votable_set(set: &TableSet, request: &IoRequest) -> Result<()> {
    let plans = set
        .tables()
        .map(|table| field_specs(table).map(|fields| (table, fields)))
        .collect::<Result<Vec<_>>>()?;
    let mut xml = Writer::new_with_indent(create_output(request)?, b' ', 2);
    start_document(&mut xml)?;
    write_event(&mut xml, Event::Start(BytesStart::new("RESOURCE")))?;
    for comment in set.comments() {
        write_comment(&mut xml, comment)?;
    }
    for (key, value) in set.keywords() {
        write_param(&mut xml, key, value)?;
    }
    for (table, fields) in &plans {
        write_table(&mut xml, table, fields)?;
    }
    write_event(&mut xml, Event::End(BytesEnd::new("RESOURCE")))?;
    write_event(&mut xml, Event::End(BytesEnd::new("VOTABLE")))?;
    xml.into_inner().flush()?;
    debug!(tables = plans.len(), "wrote VOTable set");
    Ok(())
}

/// Datatype and arraysize for every column, checked before anything is written.
fn field_specs(table: &Table) -> Result<Vec<FieldSpec>> {
    table
        .columns()
        .map(|(name, column)| {
            let element_type = column.element_type();
            let widened = |datatype: &'static str| {
                diagnostics::emit(Diagnostic::codec(
                    FORMAT,
                    format!("column {name:?}: {element_type} is written as {datatype}"),
                ));
                datatype
            };
            let datatype = match element_type {
                ElementType::Bool => "boolean",
                ElementType::UInt8 => "unsignedByte",
                ElementType::Int16 => "short",
                ElementType::Int32 => "int",
                ElementType::Int64 => "long",
                ElementType::Float32 => "float",
                ElementType::Float64 => "double",
                ElementType::Str(_) => "char",
                ElementType::Int8 => widened("short"),
                ElementType::UInt16 => widened("int"),
                ElementType::UInt32 => widened("long"),
                ElementType::UInt64 => {
                    return Err(TableError::format(
                        FORMAT,
                        format!("column {name:?}: uint64 has no VOTable datatype"),
                    ));
                }
            };
            let arraysize = match (element_type.is_string(), column.width()) {
                (true, 1) => Some("*".to_string()),
                (true, _) => {
                    return Err(TableError::format(
                        FORMAT,
                        format!("column {name:?}: vector string columns are not supported"),
                    ));
                }
                (false, 1) => None,
                (false, width) => Some(width.to_string()),
            };
            Ok(FieldSpec {
                datatype,
                arraysize,
                marker: masked_marker(name, column)?,
            })
        })
        .collect()
}

/// Marker for masked elements that an empty `TD` cannot carry: masked
/// strings (an empty `TD` is the empty string) and masked elements of a
/// vector cell that also holds values. The marker is a value of the column's
/// type that no unmasked element has; booleans use `?`.
fn masked_marker(name: &str, column: &Column) -> Result<Option<String>> {
    let element_type = column.element_type();
    let width = column.width();
    let needed = if element_type.is_string() {
        (0..column.data().len()).any(|index| column.is_masked(index))
    } else {
        width > 1
            && (0..column.rows()).any(|row| {
                let masked = (row * width..(row + 1) * width)
                    .filter(|&index| column.is_masked(index))
                    .count();
                masked > 0 && masked < width
            })
    };
    if !needed {
        return Ok(None);
    }
    if element_type == ElementType::Bool {
        return Ok(Some("?".to_string()));
    }

    let present: HashSet<String> = (0..column.data().len())
        .filter(|&index| !column.is_masked(index))
        .filter_map(|index| column.data().get(index))
        .map(|value| value.to_string())
        .collect();
    let limit = present.len() + 1;
    let candidates: Box<dyn Iterator<Item = String>> = match integer_range(element_type) {
        Some((lo, hi)) => Box::new(
            (0..limit as i128)
                .flat_map(move |offset| [hi - offset, lo + offset])
                .filter(move |&value| (lo..=hi).contains(&value))
                .map(|value| value.to_string()),
        ),
        None if element_type.is_float() => Box::new(
            ["NaN", "inf", "-inf"]
                .into_iter()
                .map(str::to_string)
                .chain((1..=limit).map(|n| format!("-{n}e30"))),
        ),
        None => Box::new(
            std::iter::once("N/A".to_string()).chain((1..=limit).map(|n| format!("N/A.{n}"))),
        ),
    };
    candidates
        .filter_map(|text| Value::parse_as(&text, element_type).ok())
        .map(|value| value.to_string())
        .find(|text| !present.contains(text))
        .map(Some)
        .ok_or_else(|| {
            TableError::format(
                FORMAT,
                format!("column {name:?}: no {element_type} value is free to mark masked elements"),
            )
        })
}

fn integer_range(element_type: ElementType) -> Option<(i128, i128)> {
    Some(match element_type {
        ElementType::Int8 => (i8::MIN.into(), i8::MAX.into()),
        ElementType::Int16 => (i16::MIN.into(), i16::MAX.into()),
        ElementType::Int32 => (i32::MIN.into(), i32::MAX.into()),
        ElementType::Int64 => (i64::MIN.into(), i64::MAX.into()),
        ElementType::UInt8 => (0, u8::MAX.into()),
        ElementType::UInt16 => (0, u16::MAX.into()),
        ElementType::UInt32 => (0, u32::MAX.into()),
        ElementType::UInt64 => (0, u64::MAX.into()),
        _ => return None,
    })
}

fn write_event<W: Write>(xml: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    xml.write_event(event)
        .map_err(|err| TableError::Io(io::Error::other(err.to_string())))
}

fn write_text_element<W: Write>(xml: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    write_event(xml, Event::Start(BytesStart::new(name)))?;
    write_event(xml, Event::Text(BytesText::new(text)))?;
    write_event(xml, Event::End(BytesEnd::new(name)))
}

fn start_document<W: Write>(xml: &mut Writer<W>) -> Result<()> {
    write_event(xml, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut root = BytesStart::new("VOTABLE");
    root.push_attribute(("version", VOTABLE_VERSION));
    root.push_attribute(("xmlns", VOTABLE_NAMESPACE));
    write_event(xml, Event::Start(root))
}

fn write_comment<W: Write>(xml: &mut Writer<W>, comment: &str) -> Result<()> {
    let mut info = BytesStart::new("INFO");
    info.push_attribute(("name", COMMENT_INFO));
    info.push_attribute(("value", comment));
    write_event(xml, Event::Empty(info))
}

fn write_param<W: Write>(xml: &mut Writer<W>, key: &str, value: &KeywordValue) -> Result<()> {
    let mut param = BytesStart::new("PARAM");
    param.push_attribute(("name", key));
    let datatype = match value {
        KeywordValue::Bool(_) => "boolean",
        KeywordValue::Int(_) => "long",
        KeywordValue::Float(_) => "double",
        KeywordValue::Str(_) => "char",
    };
    param.push_attribute(("datatype", datatype));
    if matches!(value, KeywordValue::Str(_)) {
        param.push_attribute(("arraysize", "*"));
    }
    param.push_attribute(("value", value.to_string().as_str()));
    write_event(xml, Event::Empty(param))
}

fn write_table<W: Write>(xml: &mut Writer<W>, table: &Table, fields: &[FieldSpec]) -> Result<()> {
    let mut element = BytesStart::new("TABLE");
    if let Some(name) = table.name() {
        element.push_attribute(("name", name));
    }
    write_event(xml, Event::Start(element))?;
    for comment in table.comments() {
        write_comment(xml, comment)?;
    }
    for (key, value) in table.keywords() {
        write_param(xml, key, value)?;
    }
    for ((name, column), spec) in table.columns().zip(fields) {
        write_field(xml, name, column, spec)?;
    }

    write_event(xml, Event::Start(BytesStart::new("DATA")))?;
    write_event(xml, Event::Start(BytesStart::new("TABLEDATA")))?;
    for row in 0..table.len() {
        write_event(xml, Event::Start(BytesStart::new("TR")))?;
        for ((_, column), spec) in table.columns().zip(fields) {
            let text = cell_text(column, row, spec.marker.as_deref());
            if text.is_empty() {
                write_event(xml, Event::Empty(BytesStart::new("TD")))?;
            } else {
                write_text_element(xml, "TD", &text)?;
            }
        }
        write_event(xml, Event::End(BytesEnd::new("TR")))?;
    }
    write_event(xml, Event::End(BytesEnd::new("TABLEDATA")))?;
    write_event(xml, Event::End(BytesEnd::new("DATA")))?;
    write_event(xml, Event::End(BytesEnd::new("TABLE")))
}

fn write_field<W: Write>(
    xml: &mut Writer<W>,
    name: &str,
    column: &Column,
    spec: &FieldSpec,
) -> Result<()> {
    let descriptor = column.descriptor();
    let mut field = BytesStart::new("FIELD");
    field.push_attribute(("ID", name));
    field.push_attribute(("name", name));
    field.push_attribute(("datatype", spec.datatype));
    if let Some(arraysize) = &spec.arraysize {
        field.push_attribute(("arraysize", arraysize.as_str()));
    }
    if let Some(unit) = descriptor.unit() {
        field.push_attribute(("unit", unit));
    }

    let description = descriptor.description();
    let null = descriptor.null().map(ToString::to_string).or_else(|| {
        spec.marker
            .clone()
            .filter(|_| column.element_type() != ElementType::Bool)
    });
    if description.is_none() && null.is_none() {
        return write_event(xml, Event::Empty(field));
    }
    write_event(xml, Event::Start(field))?;
    if let Some(description) = description {
        write_text_element(xml, "DESCRIPTION", description)?;
    }
    if let Some(null) = null {
        let mut values = BytesStart::new("VALUES");
        values.push_attribute(("null", null.as_str()));
        write_event(xml, Event::Empty(values))?;
    }
    write_event(xml, Event::End(BytesEnd::new("FIELD")))
}

/// `TD` text for one row; empty when every element of a non-string cell
/// is masked. Other masked elements are written as the column's marker.
fn cell_text(column: &Column, row: usize, marker: Option<&str>) -> String {
    let width = column.width();
    let indices = row * width..(row + 1) * width;
    if !column.element_type().is_string() && indices.clone().all(|index| column.is_masked(index)) {
        return String::new();
    }
    indices
        .map(|index| match column.data().get(index) {
            _ if column.is_masked(index) => marker.unwrap_or_default().to_string(),
            Some(value) => value.to_string(),
            None => String::new(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabio_core::{ColumnData, ColumnInput, ColumnOptions};

    fn render(table: &Table) -> String {
        let fields = field_specs(table).unwrap();
        let mut xml = Writer::new_with_indent(Vec::new(), b' ', 2);
        write_table(&mut xml, table, &fields).unwrap();
        String::from_utf8(xml.into_inner()).unwrap()
    }

    #[test]
    fn test_field_specs() {
        let mut table = Table::new();
        table
            .add_column("flag", vec![true], ColumnOptions::new())
            .unwrap();
        table
            .add_column(
                "pos",
                ColumnInput::Vector {
                    data: ColumnData::Float64(vec![1.0, 2.0]),
                    width: 2,
                },
                ColumnOptions::new(),
            )
            .unwrap();
        table.add_column("tag", vec!["a"], ColumnOptions::new()).unwrap();
        let specs = field_specs(&table).unwrap();
        assert_eq!(specs[0].datatype, "boolean");
        assert_eq!(specs[1].arraysize.as_deref(), Some("2"));
        assert_eq!(specs[2].arraysize.as_deref(), Some("*"));
    }

    #[test]
    fn test_narrow_types_are_widened_with_a_warning() {
        let mut table = Table::new();
        table.add_column("b", vec![1_i8], ColumnOptions::new()).unwrap();
        let (specs, diagnostics) = diagnostics::capture(|| field_specs(&table));
        assert_eq!(specs.unwrap()[0].datatype, "short");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_unsupported_columns_fail() {
        let mut table = Table::new();
        table.add_column("u", vec![1_u64], ColumnOptions::new()).unwrap();
        assert!(field_specs(&table).is_err());

        let mut table = Table::new();
        table
            .add_column(
                "s",
                ColumnInput::Vector {
                    data: ColumnData::from(vec!["a", "b"]),
                    width: 2,
                },
                ColumnOptions::new(),
            )
            .unwrap();
        assert!(field_specs(&table).is_err());
    }

    #[test]
    fn test_missing_cells_are_empty() {
        let mut table = Table::new().named("t");
        table
            .add_column("x", vec![1.5_f64, f64::NAN], ColumnOptions::new().unit("mag"))
            .unwrap();
        table
            .add_column("n", vec![3_i32, -1], ColumnOptions::new().null(-1_i32))
            .unwrap();
        let xml = render(&table);
        assert!(xml.contains(r#"<TABLE name="t">"#));
        assert!(xml.contains(r#"<FIELD ID="x" name="x" datatype="double" unit="mag"/>"#));
        assert!(xml.contains(r#"<VALUES null="-1"/>"#));
        assert!(xml.contains("<TD>1.5</TD>"));
        assert!(xml.contains("<TD>NaN</TD>"));
        assert!(xml.contains("<TD>-1</TD>"));
    }

    #[test]
    fn test_partially_masked_vector_cells_use_a_marker() {
        let mut table = Table::with_masked(true);
        table
            .add_column(
                "v",
                ColumnInput::Vector {
                    data: ColumnData::Int32(vec![1, 42, 3, 4, 5, 6]),
                    width: 2,
                },
                ColumnOptions::new().mask(vec![false, true, false, false, true, true]),
            )
            .unwrap();
        let specs = field_specs(&table).unwrap();
        assert_eq!(specs[0].marker.as_deref(), Some("2147483647"));
        let xml = render(&table);
        assert!(xml.contains(r#"<VALUES null="2147483647"/>"#));
        assert!(xml.contains("<TD>1 2147483647</TD>"));
        assert!(xml.contains("<TD>3 4</TD>"));
        assert!(xml.contains("<TD/>"));
        assert!(!xml.contains("42"));
    }

    #[test]
    fn test_marker_avoids_unmasked_values() {
        let mut table = Table::with_masked(true);
        table
            .add_column(
                "v",
                ColumnInput::Vector {
                    data: ColumnData::Int8(vec![127, 0, -128, 9]),
                    width: 2,
                },
                ColumnOptions::new().mask(vec![false, true, false, false]),
            )
            .unwrap();
        table
            .add_column(
                "f",
                ColumnInput::Vector {
                    data: ColumnData::Float64(vec![f64::NAN, 1.0, 2.0, 3.0]),
                    width: 2,
                },
                ColumnOptions::new().mask(vec![false, false, true, false]),
            )
            .unwrap();
        let specs = field_specs(&table).unwrap();
        assert_eq!(specs[0].marker.as_deref(), Some("126"));
        assert_eq!(specs[1].marker.as_deref(), Some("inf"));
    }

    #[test]
    fn test_masked_strings_use_a_marker() {
        let mut table = Table::with_masked(true);
        table
            .add_column(
                "s",
                vec!["", "N/A", "x"],
                ColumnOptions::new().mask(vec![false, false, true]),
            )
            .unwrap();
        let xml = render(&table);
        assert!(xml.contains(r#"<VALUES null="N/A.1"/>"#));
        assert!(xml.contains("<TD/>"));
        assert!(xml.contains("<TD>N/A</TD>"));
        assert!(xml.contains("<TD>N/A.1</TD>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let mut table = Table::new();
        table
            .add_column("s", vec!["a < b & c"], ColumnOptions::new())
            .unwrap();
        table.add_comment("\"quoted\"");
        let xml = render(&table);
        assert!(xml.contains("<TD>a &lt; b &amp; c</TD>"));
        assert!(xml.contains("value=\"&quot;quoted&quot;\""));
    }
}
