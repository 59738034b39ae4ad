//! HTML table output.

use std::io::Write;

use quick_xml::escape::escape;
use tabio_core::{Column, IoRequest, Result, Table};

use crate::common::create_output;

/// Write the table as an HTML page: a bold name row, an italic unit row,
/// then one row per record rendered with each column's display format.
pub fn write_html(table: &Table, request: &IoRequest) -> Result<()> {
    let mut out = create_output(request)?;
    out.write_all(render_html(table).as_bytes())?;
    out.flush()?;
    Ok(())
}

fn render_html(table: &Table) -> String {
    let mut html = String::from("<html>\n  <head>\n");
    if let Some(name) = table.name() {
        html.push_str(&format!("    <title>{}</title>\n", escape(name)));
    }
    html.push_str("  </head>\n  <body>\n    <table border=1>\n");

    html.push_str("    <tr>\n");
    for name in table.column_names() {
        html.push_str(&format!("      <td><b>{}</b></td>\n", escape(name)));
    }
    html.push_str("    </tr>\n");

    html.push_str("    <tr>\n");
    for (_, column) in table.columns() {
        let unit = column.descriptor().unit().unwrap_or_default();
        html.push_str(&format!("      <td><i>{}</i></td>\n", escape(unit)));
    }
    html.push_str("    </tr>\n");

    for row in 0..table.len() {
        html.push_str("    <tr>\n");
        for (_, column) in table.columns() {
            html.push_str(&format!("      <td>{}</td>\n", escape(&cell(column, row))));
        }
        html.push_str("    </tr>\n");
    }

    html.push_str("    </table>\n  </body>\n</html>\n");
    html
}

/// Formatted cell; empty when every element of the row is masked.
fn cell(column: &Column, row: usize) -> String {
    let width = column.width();
    if (row * width..(row + 1) * width).all(|index| column.is_masked(index)) {
        return String::new();
    }
    column
        .value(row)
        .map(|value| {
            column
                .descriptor()
                .format()
                .render_unpadded(&value)
                .trim()
                .to_string()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabio_core::{ColumnOptions, DisplayFormat};

    #[test]
    fn test_render_html() {
        let mut table = Table::new().named("a&b");
        table
            .add_column(
                "flux",
                vec![1.25_f64],
                ColumnOptions::new()
                    .unit("<Jy>")
                    .format(DisplayFormat::new(8, ".2f")),
            )
            .unwrap();
        table
            .add_column("note", vec!["x < y"], ColumnOptions::new())
            .unwrap();
        let html = render_html(&table);
        assert!(html.contains("<title>a&amp;b</title>"));
        assert!(html.contains("<td><b>flux</b></td>"));
        assert!(html.contains("<td><i>&lt;Jy&gt;</i></td>"));
        assert!(html.contains("<td>1.25</td>"));
        assert!(html.contains("<td>x &lt; y</td>"));
    }

    #[test]
    fn test_masked_cells_are_blank() {
        let mut table = Table::with_masked(true);
        table
            .add_column("n", vec![1_i32, 2], ColumnOptions::new().mask(vec![false, true]))
            .unwrap();
        let html = render_html(&table);
        assert!(html.contains("<td>1</td>"));
        assert!(html.contains("<td></td>"));
    }
}
