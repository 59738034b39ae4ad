//! Command implementations. Each returns the text to print so the binary
//! stays a thin dispatcher.

use std::path::Path;

use anyhow::{Context, Result, bail};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table as TextTable};
use serde_json::json;
use tabio_core::{IoRequest, KeywordValue, Operation, Registry, Table, TableConfig, TableSet};
use tabio_formats::builtin_registry;
use tracing::info;

use crate::cli::{ConvertArgs, DescribeArgs};

/// Option key selecting one table of a multi-table VOTable.
const TABLE_SELECTOR: &str = "tid";

/// Load the `--config` file, or defaults when none was given.
pub fn load_config(path: Option<&Path>) -> Result<TableConfig> {
    match path {
        Some(path) => TableConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display())),
        None => Ok(TableConfig::default()),
    }
}

/// Parse a `KEY=VALUE` codec option. `\t` stands for a tab character.
pub fn parse_option(text: &str) -> Result<(String, KeywordValue)> {
    let Some((key, value)) = text.split_once('=') else {
        bail!("option {text:?} is not of the form KEY=VALUE");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("option {text:?} has an empty key");
    }
    let value = match value {
        "\\t" => KeywordValue::Str("\t".to_string()),
        other => KeywordValue::infer(other),
    };
    Ok((key.to_string(), value))
}

fn build_request(
    location: &Path,
    format: Option<&str>,
    table: Option<usize>,
    options: &[String],
    verbose: bool,
) -> Result<IoRequest> {
    let mut request = IoRequest::new(location).verbose(verbose);
    if let Some(format) = format {
        request = request.with_format(format);
    }
    for text in options {
        let (key, value) = parse_option(text)?;
        request = request.option(&key, value);
    }
    if let Some(index) = table {
        let index = i64::try_from(index).context("table index out of range")?;
        request = request.option(TABLE_SELECTOR, index);
    }
    Ok(request)
}

/// Read the table named by `args` and render its description.
pub fn run_describe(args: &DescribeArgs, config: &TableConfig, verbose: bool) -> Result<String> {
    let registry = builtin_registry()?;
    let request = build_request(
        &args.file,
        args.format.as_deref(),
        args.table,
        &args.options,
        verbose,
    )?;
    let mut table = Table::with_config(config);
    table
        .read(&registry, &request)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    if args.json {
        Ok(serde_json::to_string_pretty(&describe_json(&table))?)
    } else {
        Ok(describe_text(&table))
    }
}

/// Machine-readable description of a table.
pub fn describe_json(table: &Table) -> serde_json::Value {
    let columns: Vec<serde_json::Value> = table
        .columns()
        .map(|(name, column)| {
            let descriptor = column.descriptor();
            json!({
                "name": name,
                "type": descriptor.element_type().to_string(),
                "shape": descriptor.shape(),
                "unit": descriptor.unit(),
                "description": descriptor.description(),
                "null": descriptor.null().map(ToString::to_string),
                "format": descriptor.format().to_string(),
            })
        })
        .collect();
    json!({
        "name": table.name(),
        "rows": table.len(),
        "masked": table.is_masked(),
        "columns": columns,
        "keywords": table.keywords(),
        "comments": table.comments(),
    })
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn text_table(headers: &[&str]) -> TextTable {
    let mut grid = TextTable::new();
    grid.load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|label| header_cell(label)));
    grid
}

fn describe_text(table: &Table) -> String {
    let mut text = format!("{}\nRows: {}\n", table.describe(), table.len());
    if !table.keywords().is_empty() {
        let mut grid = text_table(&["Keyword", "Value"]);
        for (key, value) in table.keywords() {
            grid.add_row(vec![Cell::new(key), Cell::new(value)]);
        }
        text.push_str(&format!("{grid}\n"));
    }
    for comment in table.comments() {
        text.push_str(&format!("# {comment}\n"));
    }
    text
}

/// Outcome of a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertSummary {
    pub source_format: String,
    pub target_format: String,
    pub tables: usize,
    pub rows: usize,
}

impl std::fmt::Display for ConvertSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "converted {} table(s), {} row(s): {} -> {}",
            self.tables, self.rows, self.source_format, self.target_format
        )
    }
}

/// Read `args.input` and write it to `args.output`.
pub fn run_convert(args: &ConvertArgs, config: &TableConfig, verbose: bool) -> Result<ConvertSummary> {
    let registry = builtin_registry()?;
    let source = build_request(
        &args.input,
        args.from.as_deref(),
        args.table,
        &args.options,
        verbose,
    )?;
    let target = build_request(
        &args.output,
        args.to.as_deref(),
        None,
        &args.write_options,
        verbose,
    )?
    .overwrite(args.overwrite);
    let source_format = source.resolve_format(&registry)?;
    let target_format = target.resolve_format(&registry)?;

    let (tables, rows) = if args.all {
        let mut set = TableSet::with_config(config);
        set.read(&registry, &source)
            .with_context(|| format!("failed to read {}", args.input.display()))?;
        set.write(&registry, &target)
            .with_context(|| format!("failed to write {}", args.output.display()))?;
        (set.len(), set.tables().map(Table::len).sum())
    } else {
        let mut table = Table::with_config(config);
        table
            .read(&registry, &source)
            .with_context(|| format!("failed to read {}", args.input.display()))?;
        table
            .write(&registry, &target)
            .with_context(|| format!("failed to write {}", args.output.display()))?;
        (1, table.len())
    };

    let summary = ConvertSummary {
        source_format,
        target_format,
        tables,
        rows,
    };
    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        tables = summary.tables,
        rows = summary.rows,
        "conversion finished"
    );
    Ok(summary)
}

/// Listing of the built-in formats.
pub fn run_formats() -> Result<String> {
    Ok(format_listing(&builtin_registry()?))
}

/// One row per format tag with its operations and extensions.
pub fn format_listing(registry: &Registry) -> String {
    let mut grid = text_table(&["Format", "Read", "Write", "Set read", "Set write", "Extensions"]);
    for info in registry.formats() {
        let mut row = vec![Cell::new(&info.tag)];
        for operation in [
            Operation::Read,
            Operation::Write,
            Operation::SetRead,
            Operation::SetWrite,
        ] {
            let mark = if info.supports(operation) { "yes" } else { "-" };
            row.push(Cell::new(mark).set_alignment(CellAlignment::Center));
        }
        row.push(Cell::new(info.extensions.join(", ")));
        grid.add_row(row);
    }
    grid.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_option() {
        assert_eq!(
            parse_option("definition=2").unwrap(),
            ("definition".to_string(), KeywordValue::Int(2))
        );
        assert_eq!(
            parse_option("delimiter=\\t").unwrap(),
            ("delimiter".to_string(), KeywordValue::Str("\t".to_string()))
        );
        assert!(parse_option("novalue").is_err());
        assert!(parse_option("=3").is_err());
    }

    #[test]
    fn test_table_index_becomes_selector() {
        let request = build_request(Path::new("a.xml"), Some("vo"), Some(2), &[], false).unwrap();
        assert_eq!(request.get_option("tid"), Some(&KeywordValue::Int(2)));
        assert_eq!(request.format(), Some("vo"));
        assert!(!request.is_verbose());
    }

    #[test]
    fn test_format_listing_names_every_builtin() {
        let listing = run_formats().unwrap();
        for tag in ["ipac", "vo", "ascii", "rdb", "html"] {
            assert!(listing.contains(tag), "missing {tag}");
        }
    }

    #[test]
    fn test_missing_config_is_reported() {
        let err = load_config(Some(Path::new("/nonexistent/tabio.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to load configuration"));
    }
}
