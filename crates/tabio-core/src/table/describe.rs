use std::fmt;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, ContentArrangement, Table as TextTable};

use super::Table;

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

impl Table {
    /// Text summary: the table name followed by a Name/Unit/Type/Format grid.
    pub fn describe(&self) -> String {
        let title = match self.name() {
            Some(name) => format!("Table : {name}"),
            None => "Table has no name".to_string(),
        };
        let mut grid = TextTable::new();
        grid.load_preset(UTF8_FULL_CONDENSED)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                header_cell("Name"),
                header_cell("Unit"),
                header_cell("Type"),
                header_cell("Format"),
            ]);
        for (name, column) in self.columns() {
            let descriptor = column.descriptor();
            let element_type = if descriptor.is_vector() {
                format!("{}[{}]", descriptor.element_type(), descriptor.shape())
            } else {
                descriptor.element_type().to_string()
            };
            grid.add_row(vec![
                Cell::new(name),
                Cell::new(descriptor.unit().unwrap_or("")),
                Cell::new(element_type),
                Cell::new(descriptor.format()),
            ]);
        }
        format!("{title}\n{grid}")
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Table name='{}' rows={} fields={}>",
            self.name().unwrap_or(""),
            self.len(),
            self.num_columns()
        )
    }
}
