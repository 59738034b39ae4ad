use tabio_core::diagnostics::{self, Diagnostic};
use tabio_core::{
    ColumnOptions, ElementType, IoRequest, KeywordValue, Result, Table, TableError, TableSet,
    parse_bool,
};
use tracing::debug;

use super::{COMMENT_INFO, FORMAT, SELECTOR, element_type};
use crate::common::{TextColumn, add_text_column};
use crate::xml::{Element, parse_document};

/// Read one table. Documents with several tables need the `tid` option
/// (zero-based index in document order).
pub fn read_votable(table: &mut Table, request: &IoRequest) -> Result<()> {
    let root = load(request)?;
    let tables = root.descendants_named("TABLE");
    let index = match request.usize_option(FORMAT, SELECTOR)? {
        Some(index) => index,
        None => match tables.len() {
            0 => return Err(TableError::format(FORMAT, "no tables present")),
            1 => 0,
            _ => {
                return Err(TableError::AmbiguousSource {
                    selector: SELECTOR.to_string(),
                    candidates: tables
                        .iter()
                        .enumerate()
                        .map(|(index, element)| {
                            (index, table_name(element).unwrap_or_default().to_string())
                        })
                        .collect(),
                });
            }
        },
    };
    let element = tables.get(index).ok_or_else(|| {
        TableError::format(
            FORMAT,
            format!("no table with {SELECTOR}={index}, found {}", tables.len()),
        )
    })?;
    read_table(table, element)
}

/// Read every table, plus document and resource level keywords and comments.
pub fn read_votable_set(set: &mut TableSet, request: &IoRequest) -> Result<()> {
    let root = load(request)?;
    for container in std::iter::once(&root).chain(root.descendants_named("RESOURCE")) {
        let (keywords, comments) = metadata(container);
        for (key, value) in keywords {
            set.add_keyword(&key, value);
        }
        for comment in comments {
            set.add_comment(&comment);
        }
    }
    for element in root.descendants_named("TABLE") {
        let mut table = set.new_table();
        read_table(&mut table, element)?;
        set.append(table)?;
    }
    Ok(())
}

fn load(request: &IoRequest) -> Result<Element> {
    let text = std::fs::read_to_string(request.location())?;
    parse_votable(&text)
}

fn parse_votable(text: &str) -> Result<Element> {
    let root = parse_document(FORMAT, text)?;
    if root.name != "VOTABLE" {
        return Err(TableError::format(
            FORMAT,
            format!("root element is {:?}, expected \"VOTABLE\"", root.name),
        ));
    }
    Ok(root)
}

fn table_name(element: &Element) -> Option<&str> {
    element
        .attribute("ID")
        .or_else(|| element.attribute("name"))
        .filter(|name| !name.is_empty())
}

/// `PARAM` keywords and `INFO` comments directly under an element.
fn metadata(element: &Element) -> (Vec<(String, KeywordValue)>, Vec<String>) {
    let keywords = element
        .children_named("PARAM")
        .filter_map(|param| {
            let key = param.attribute("name").or_else(|| param.attribute("ID"))?;
            Some((key.to_string(), param_value(param)))
        })
        .collect();
    let comments = element
        .children_named("INFO")
        .filter(|info| info.attribute("name") == Some(COMMENT_INFO))
        .map(|info| match info.attribute("value") {
            Some(value) => value.to_string(),
            None => info.text.trim().to_string(),
        })
        .collect();
    (keywords, comments)
}

fn param_value(param: &Element) -> KeywordValue {
    let value = param.attribute("value").unwrap_or_default();
    let typed = match param.attribute("datatype").unwrap_or("char") {
        "boolean" => parse_bool(value).map(KeywordValue::Bool),
        "unsignedByte" | "short" | "int" | "long" => value.trim().parse().ok().map(KeywordValue::Int),
        "float" | "double" => value.trim().parse().ok().map(KeywordValue::Float),
        "char" | "unicodeChar" => Some(KeywordValue::Str(value.to_string())),
        _ => None,
    };
    typed.unwrap_or_else(|| KeywordValue::infer(value))
}

/// Column layout declared by a `FIELD`.
struct Field<'a> {
    name: &'a str,
    element_type: ElementType,
    /// Elements per row; `None` for variable-length arrays.
    width: Option<usize>,
    unit: Option<&'a str>,
    description: Option<String>,
    null: Option<&'a str>,
}

impl<'a> Field<'a> {
    fn parse(element: &'a Element) -> Result<Self> {
        let name = table_name(element)
            .ok_or_else(|| TableError::format(FORMAT, "FIELD without a name or ID"))?;
        let datatype = element.attribute("datatype").ok_or_else(|| {
            TableError::format(FORMAT, format!("FIELD {name:?} has no datatype"))
        })?;
        let element_type = element_type(datatype)?;
        let width = match element.attribute("arraysize") {
            _ if element_type.is_string() => Some(1),
            None => Some(1),
            Some(size) if size.ends_with('*') => None,
            Some(size) => Some(parse_arraysize(size).ok_or_else(|| {
                TableError::format(
                    FORMAT,
                    format!("FIELD {name:?} has an invalid arraysize {size:?}"),
                )
            })?),
        };
        Ok(Self {
            name,
            element_type,
            width,
            unit: element.attribute("unit").filter(|unit| !unit.is_empty()),
            description: element
                .child("DESCRIPTION")
                .map(|description| description.text.trim().to_string()),
            null: element
                .child("VALUES")
                .and_then(|values| values.attribute("null")),
        })
    }

    /// Strings are missing only when they equal the declared null.
    fn is_missing(&self, text: &str) -> bool {
        if self.element_type.is_string() {
            return self.null == Some(text);
        }
        let text = text.trim();
        text.is_empty()
            || (self.element_type == ElementType::Bool && text == "?")
            || self.null == Some(text)
    }

    /// Cells of this field, one `TD` text per row.
    fn text_column(&self, texts: &[&str]) -> Result<TextColumn<'a>> {
        let mut options = ColumnOptions::new();
        if let Some(unit) = self.unit {
            options = options.unit(unit);
        }
        if let Some(description) = &self.description {
            options = options.description(description.clone());
        }
        let mut column = TextColumn::new(self.name, Vec::with_capacity(texts.len()));
        column.options = options;

        let Some(width) = self.width else {
            diagnostics::emit(Diagnostic::codec(
                FORMAT,
                format!("variable-length column {:?} is stored as text", self.name),
            ));
            column.element_type = Some(ElementType::Str(0));
            column.cells = texts
                .iter()
                .map(|text| {
                    let text = text.trim();
                    (!text.is_empty()).then(|| text.to_string())
                })
                .collect();
            return Ok(column);
        };

        column.element_type = Some(self.element_type);
        column.width = width;
        column.null = self.null;
        for (row, text) in texts.iter().enumerate() {
            if width == 1 {
                let cell = if self.element_type.is_string() {
                    text.to_string()
                } else {
                    text.trim().to_string()
                };
                column.cells.push((!self.is_missing(text)).then_some(cell));
            } else if text.trim().is_empty() {
                column.cells.extend(std::iter::repeat_n(None, width));
            } else {
                let parts: Vec<&str> = text.split_whitespace().collect();
                if parts.len() != width {
                    return Err(TableError::format(
                        FORMAT,
                        format!(
                            "row {}: column {:?} expects {width} values, found {}",
                            row + 1,
                            self.name,
                            parts.len()
                        ),
                    ));
                }
                column.cells.extend(
                    parts
                        .into_iter()
                        .map(|part| (!self.is_missing(part)).then(|| part.to_string())),
                );
            }
        }
        Ok(column)
    }
}

/// Element count of an arraysize such as `3` or `2x3`.
fn parse_arraysize(size: &str) -> Option<usize> {
    size.split('x')
        .map(|dimension| dimension.trim().parse::<usize>().ok().filter(|&d| d > 0))
        .product()
}

fn read_table(table: &mut Table, element: &Element) -> Result<()> {
    if let Some(name) = table_name(element) {
        table.set_name(Some(name.to_string()));
    }
    let (keywords, comments) = metadata(element);
    for (key, value) in keywords {
        table.add_keyword(&key, value);
    }
    for comment in comments {
        table.add_comment(&comment);
    }

    let fields = element
        .children_named("FIELD")
        .map(Field::parse)
        .collect::<Result<Vec<_>>>()?;
    let rows = table_rows(element)?;
    if let Some((row, cells)) = rows
        .iter()
        .enumerate()
        .find(|(_, cells)| cells.len() != fields.len())
    {
        return Err(TableError::format(
            FORMAT,
            format!(
                "row {} has {} cells, expected {}",
                row + 1,
                cells.len(),
                fields.len()
            ),
        ));
    }
    debug!(fields = fields.len(), rows = rows.len(), "parsed VOTable table");

    for (index, field) in fields.iter().enumerate() {
        let texts: Vec<&str> = rows.iter().map(|cells| cells[index]).collect();
        let column = field.text_column(&texts)?;
        add_text_column(table, FORMAT, column)?;
    }
    Ok(())
}

fn table_rows(element: &Element) -> Result<Vec<Vec<&str>>> {
    let Some(data) = element.child("DATA") else {
        return Ok(Vec::new());
    };
    let Some(tabledata) = data.child("TABLEDATA") else {
        return Err(TableError::format(
            FORMAT,
            "only TABLEDATA serialization is supported",
        ));
    };
    Ok(tabledata
        .children_named("TR")
        .map(|row| row.children_named("TD").map(|cell| cell.text.as_str()).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabio_core::{ColumnData, Nullability, Value};

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<VOTABLE version="1.2" xmlns="http://www.ivoa.net/xml/VOTable/v1.2">
  <RESOURCE>
    <INFO name="comment" value="survey run"/>
    <TABLE name="stars">
      <INFO name="comment" value="first pass"/>
      <PARAM name="epoch" datatype="double" value="2000.0"/>
      <PARAM name="observer" datatype="char" arraysize="*" value="K. Lee"/>
      <FIELD ID="id" datatype="int">
        <VALUES null="-1"/>
      </FIELD>
      <FIELD ID="pos" datatype="double" arraysize="2" unit="deg">
        <DESCRIPTION>position</DESCRIPTION>
      </FIELD>
      <FIELD ID="label" datatype="char" arraysize="*"/>
      <FIELD ID="flag" datatype="boolean"/>
      <DATA>
        <TABLEDATA>
          <TR><TD>1</TD><TD>10.5 -3.25</TD><TD>a &amp; b</TD><TD>T</TD></TR>
          <TR><TD/><TD></TD><TD>c</TD><TD>F</TD></TR>
        </TABLEDATA>
      </DATA>
    </TABLE>
    <TABLE name="galaxies"/>
  </RESOURCE>
</VOTABLE>"#;

    fn first_table(masked: bool) -> Table {
        let root = parse_votable(DOCUMENT).unwrap();
        let tables = root.descendants_named("TABLE");
        let mut table = Table::with_masked(masked);
        read_table(&mut table, tables[0]).unwrap();
        table
    }

    #[test]
    fn test_read_table_fields() {
        let table = first_table(false);
        assert_eq!(table.name(), Some("stars"));
        assert_eq!(table.column_names(), vec!["id", "pos", "label", "flag"]);
        assert_eq!(table.keywords()["epoch"], KeywordValue::Float(2000.0));
        assert_eq!(table.keywords()["observer"], KeywordValue::from("K. Lee"));
        assert_eq!(table.comments(), &["first pass".to_string()]);

        let id = table.get_column("id").unwrap();
        assert_eq!(id.data(), &ColumnData::Int32(vec![1, -1]));
        assert_eq!(id.nullability(), Nullability::Sentinel(&Value::Int32(-1)));

        let pos = table.get_column("pos").unwrap();
        assert_eq!(pos.width(), 2);
        assert_eq!(table.column("pos").unwrap().unit(), Some("deg"));
        assert_eq!(table.column("pos").unwrap().description(), Some("position"));
        assert_eq!(pos.value(0), Some(Value::Array(vec![Value::Float64(10.5), Value::Float64(-3.25)])));
        assert!(pos.is_null(2) && pos.is_null(3));

        assert_eq!(
            table.get_column("label").unwrap().data().as_strings().unwrap(),
            &["a & b".to_string(), "c".to_string()]
        );
        assert_eq!(
            table.get_column("flag").unwrap().data(),
            &ColumnData::Bool(vec![true, false])
        );
    }

    #[test]
    fn test_masked_read_drops_sentinels() {
        let table = first_table(true);
        let id = table.get_column("id").unwrap();
        assert_eq!(id.nullability(), Nullability::Mask(&[false, true]));
        assert_eq!(table.column("id").unwrap().null(), None);
    }

    #[test]
    fn test_resource_metadata() {
        let root = parse_votable(DOCUMENT).unwrap();
        let resources = root.descendants_named("RESOURCE");
        let (keywords, comments) = metadata(resources[0]);
        assert!(keywords.is_empty());
        assert_eq!(comments, vec!["survey run".to_string()]);
    }

    #[test]
    fn test_ragged_rows_fail() {
        let document = r#"<VOTABLE><RESOURCE><TABLE><FIELD name="a" datatype="int"/>
            <DATA><TABLEDATA><TR><TD>1</TD><TD>2</TD></TR></TABLEDATA></DATA></TABLE></RESOURCE></VOTABLE>"#;
        let root = parse_votable(document).unwrap();
        let mut table = Table::new();
        let err = read_table(&mut table, root.descendants_named("TABLE")[0]).unwrap_err();
        assert!(err.to_string().contains("row 1 has 2 cells"));
    }

    #[test]
    fn test_binary_serialization_is_rejected() {
        let document = r#"<VOTABLE><RESOURCE><TABLE><FIELD name="a" datatype="int"/>
            <DATA><BINARY/></DATA></TABLE></RESOURCE></VOTABLE>"#;
        let root = parse_votable(document).unwrap();
        let mut table = Table::new();
        assert!(read_table(&mut table, root.descendants_named("TABLE")[0]).is_err());
    }

    #[test]
    fn test_variable_length_columns_become_text() {
        let document = r#"<VOTABLE><RESOURCE><TABLE><FIELD name="v" datatype="int" arraysize="*"/>
            <DATA><TABLEDATA><TR><TD>1 2 3</TD></TR></TABLEDATA></DATA></TABLE></RESOURCE></VOTABLE>"#;
        let root = parse_votable(document).unwrap();
        let mut table = Table::new();
        let (result, diagnostics) = diagnostics::capture(|| {
            read_table(&mut table, root.descendants_named("TABLE")[0])
        });
        result.unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            table.get_column("v").unwrap().data().as_strings().unwrap(),
            &["1 2 3".to_string()]
        );
    }

    #[test]
    fn test_string_cells_are_kept_verbatim() {
        let document = r#"<VOTABLE><RESOURCE><TABLE>
            <FIELD name="s" datatype="char" arraysize="*"><VALUES null="N/A.1"/></FIELD>
            <DATA><TABLEDATA><TR><TD/></TR><TR><TD>  </TD></TR><TR><TD>N/A.1</TD></TR></TABLEDATA></DATA>
            </TABLE></RESOURCE></VOTABLE>"#;
        let root = parse_votable(document).unwrap();
        let mut table = Table::with_masked(true);
        read_table(&mut table, root.descendants_named("TABLE")[0]).unwrap();
        let column = table.get_column("s").unwrap();
        assert_eq!(column.nullability(), Nullability::Mask(&[false, false, true]));
        assert_eq!(column.data().as_strings().unwrap()[..2], ["".to_string(), "  ".to_string()]);
    }

    #[test]
    fn test_nan_null_is_not_a_sentinel() {
        let document = r#"<VOTABLE><RESOURCE><TABLE>
            <FIELD name="f" datatype="double" arraysize="2"><VALUES null="NaN"/></FIELD>
            <DATA><TABLEDATA><TR><TD>1.5 NaN</TD></TR></TABLEDATA></DATA>
            </TABLE></RESOURCE></VOTABLE>"#;
        let root = parse_votable(document).unwrap();
        let mut table = Table::new();
        read_table(&mut table, root.descendants_named("TABLE")[0]).unwrap();
        let column = table.get_column("f").unwrap();
        assert_eq!(column.nullability(), Nullability::NoNulls);
        assert!(column.is_null(1));
        assert!(!column.is_null(0));
    }

    #[test]
    fn test_parse_arraysize() {
        assert_eq!(parse_arraysize("3"), Some(3));
        assert_eq!(parse_arraysize("2x3"), Some(6));
        assert_eq!(parse_arraysize("0"), None);
        assert_eq!(parse_arraysize("x"), None);
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        assert!(parse_votable("<TABLE/>").is_err());
    }
}
