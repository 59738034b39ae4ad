//! Delimited text tables: comma-separated `ascii` and tab-separated `rdb`.
//!
//! Leading `#` lines are comments. RDB files carry a second header row of
//! column kinds (`N` numeric, `S` string, optionally prefixed by a width).
//! Column types are inferred as int, then float, then string; empty cells
//! are missing values.

use std::io::Write;

use csv::{ReaderBuilder, WriterBuilder};
use tabio_core::{
    ElementType, IoRequest, Result, Table, TableError, ensure_no_vector_columns,
};
use tracing::debug;

use crate::common::{TextColumn, add_text_column, create_output, element_text, normalize_cell};

#[derive(Debug, Clone, Copy)]
struct Dialect {
    format: &'static str,
    delimiter: u8,
    type_row: bool,
}

const ASCII: Dialect = Dialect {
    format: "ascii",
    delimiter: b',',
    type_row: false,
};

const RDB: Dialect = Dialect {
    format: "rdb",
    delimiter: b'\t',
    type_row: true,
};

/// Read comma-separated text. Option `delimiter` selects another single-byte
/// separator.
pub fn read_ascii(table: &mut Table, request: &IoRequest) -> Result<()> {
    ASCII.configured(request)?.read(table, request)
}

/// Write comma-separated text. Option `delimiter` selects another separator.
pub fn write_ascii(table: &Table, request: &IoRequest) -> Result<()> {
    ASCII.configured(request)?.write(table, request)
}

/// Read a tab-separated RDB table.
pub fn read_rdb(table: &mut Table, request: &IoRequest) -> Result<()> {
    RDB.read(table, request)
}

/// Write a tab-separated RDB table.
pub fn write_rdb(table: &Table, request: &IoRequest) -> Result<()> {
    RDB.write(table, request)
}

fn normalize_header(raw: &str) -> String {
    normalize_cell(raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Kind declared in an RDB type row: `None` for numeric (inferred), `B` for
/// booleans.
fn rdb_kind(format: &str, token: &str) -> Result<Option<ElementType>> {
    let token = token.trim();
    let kind = token.trim_start_matches(|c: char| c.is_ascii_digit());
    match kind.to_ascii_uppercase().as_str() {
        "N" => Ok(None),
        "S" => Ok(Some(ElementType::Str(0))),
        "B" => Ok(Some(ElementType::Bool)),
        _ => Err(TableError::format(
            format,
            format!("unknown column kind {token:?} in type row"),
        )),
    }
}

impl Dialect {
    fn configured(self, request: &IoRequest) -> Result<Self> {
        let Some(option) = request.get_option("delimiter") else {
            return Ok(self);
        };
        match option.as_str().map(str::as_bytes) {
            Some([byte]) if byte.is_ascii() => Ok(Self {
                delimiter: *byte,
                ..self
            }),
            _ => Err(TableError::format(
                self.format,
                format!("delimiter must be a single ASCII character, got {option}"),
            )),
        }
    }

    fn csv_error(&self, err: csv::Error) -> TableError {
        TableError::format(self.format, err.to_string())
    }

    fn read(&self, table: &mut Table, request: &IoRequest) -> Result<()> {
        let text = std::fs::read_to_string(request.location())?;
        self.parse(table, &text)
    }

    fn parse(&self, table: &mut Table, text: &str) -> Result<()> {
        for line in text.lines() {
            match line.strip_prefix('#') {
                Some(comment) => table.add_comment(comment),
                None if line.trim().is_empty() => {}
                None => break,
            }
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .comment(Some(b'#'))
            .from_reader(text.as_bytes());
        let names: Vec<String> = reader
            .headers()
            .map_err(|err| self.csv_error(err))?
            .iter()
            .map(normalize_header)
            .collect();
        let mut records = reader.records();

        let kinds = if self.type_row {
            let record = records
                .next()
                .transpose()
                .map_err(|err| self.csv_error(err))?
                .ok_or_else(|| TableError::format(self.format, "missing type row"))?;
            record
                .iter()
                .map(|token| rdb_kind(self.format, token))
                .collect::<Result<Vec<_>>>()?
        } else {
            vec![None; names.len()]
        };

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
        for record in records {
            let record = record.map_err(|err| self.csv_error(err))?;
            for (index, column) in cells.iter_mut().enumerate() {
                let cell = record.get(index).map(normalize_cell).unwrap_or_default();
                column.push((!cell.is_empty()).then_some(cell));
            }
        }
        debug!(format = self.format, columns = names.len(), "parsed delimited table");

        for ((name, column_cells), kind) in names.iter().zip(cells).zip(kinds) {
            let mut column = TextColumn::new(name, column_cells);
            column.element_type = kind;
            add_text_column(table, self.format, column)?;
        }
        Ok(())
    }

    fn write(&self, table: &Table, request: &IoRequest) -> Result<()> {
        ensure_no_vector_columns(table)?;
        let mut out = create_output(request)?;
        for comment in table.comments() {
            writeln!(out, "# {comment}")?;
        }
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(out);
        writer
            .write_record(table.column_names())
            .map_err(|err| self.csv_error(err))?;
        if self.type_row {
            let kinds = table.columns().map(|(_, column)| match column.element_type() {
                ElementType::Bool => "B",
                element_type if element_type.is_numeric() => "N",
                _ => "S",
            });
            writer
                .write_record(kinds)
                .map_err(|err| self.csv_error(err))?;
        }
        for row in 0..table.len() {
            let cells = table
                .columns()
                .map(|(_, column)| element_text(column, row).unwrap_or_default());
            writer
                .write_record(cells)
                .map_err(|err| self.csv_error(err))?;
        }
        writer.flush()?;
        Ok(())
    }
}
