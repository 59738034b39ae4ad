//! Structural invariants of tables and table sets.

use proptest::prelude::*;
use tabio_core::{
    Cell, ColumnData, ColumnOptions, ElementType, Nullability, SchemaError, Table, TableError,
    TableSet, Value, diagnostics,
};

fn id_value_table() -> Table {
    let mut table = Table::new().named("measurements");
    table
        .add_column("id", vec![1_i64, 2, 3], ColumnOptions::new())
        .expect("id column");
    table
        .add_column(
            "value",
            vec![0.5_f64, f64::NAN, 2.5],
            ColumnOptions::new().unit("Jy").description("flux density"),
        )
        .expect("value column");
    table.add_keyword("telescope", " VLA ");
    table.add_comment("  calibrated ");
    table
}

#[test]
fn id_value_scenario() {
    let mut table = id_value_table();
    assert_eq!(table.shape(), (3, 2));
    assert_eq!(table.format_of("value").expect("format"), "25.17e");
    assert_eq!(table.row_plain(1).expect("row"), vec![Cell::Int(2), Cell::Null]);

    assert!(matches!(
        table.set_primary_key("value"),
        Err(TableError::Schema(SchemaError::PrimaryKeyNulls { .. }))
    ));
    assert_eq!(table.primary_key(), None);
    table.set_primary_key("id").expect("unique ids");

    let picked = table.rows(&[2, 0, 0, 1]).expect("rows");
    assert_eq!(
        picked.get_column("id").expect("id").data(),
        &ColumnData::Int64(vec![3, 1, 1, 2])
    );
    assert_eq!(picked.primary_key(), None);
    assert_eq!(picked.keywords(), table.keywords());
    assert_eq!(picked.comments(), &["calibrated".to_string()]);
    assert_eq!(picked.column("value"), table.column("value"));
}

#[test]
fn nullability_view_matches_mode() {
    let mut plain = Table::new();
    plain
        .add_column("a", vec![1_i32, -1], ColumnOptions::new().null(-1_i32))
        .expect("sentinel column");
    plain
        .add_column("b", vec![1_i32, 2], ColumnOptions::new())
        .expect("plain column");
    assert_eq!(
        plain.get_column("a").expect("a").nullability(),
        Nullability::Sentinel(&Value::Int32(-1))
    );
    assert_eq!(plain.get_column("b").expect("b").nullability(), Nullability::NoNulls);
    // Sentinels are kept as stored values.
    assert_eq!(plain.row_plain(1).expect("row"), vec![Cell::Int(-1), Cell::Int(2)]);

    let mut masked = Table::with_masked(true);
    masked
        .add_column("a", vec![1_i32, 2], ColumnOptions::new().mask(vec![false, true]))
        .expect("masked column");
    assert_eq!(
        masked.get_column("a").expect("a").nullability(),
        Nullability::Mask(&[false, true])
    );
}

#[test]
fn rename_preserves_position_and_primary_key() {
    let mut table = id_value_table();
    table.set_primary_key("id").expect("primary key");
    table.rename_column("id", "source_id").expect("rename");
    assert_eq!(table.column_names(), vec!["source_id", "value"]);
    assert_eq!(table.primary_key(), Some("source_id"));
    table.remove_column("source_id").expect("remove");
    assert_eq!(table.primary_key(), None);
}

#[test]
fn keep_and_remove_are_complementary() {
    let mut kept = id_value_table();
    let mut removed = id_value_table();
    kept.keep_columns(&["value"]).expect("keep");
    removed.remove_columns(&["id"]).expect("remove");
    assert_eq!(kept, removed);
    assert!(matches!(
        kept.keep_columns(&["id"]),
        Err(TableError::Schema(SchemaError::MissingColumn { .. }))
    ));
}

#[test]
fn descriptors_stay_editable_but_typed() {
    let mut table = id_value_table();
    let descriptor = table.column_mut("value").expect("value");
    descriptor.set_unit(Some("mJy".to_string()));
    descriptor.set_format(tabio_core::DisplayFormat::new(10, ".3f"));
    assert_eq!(table.format_of("value").expect("format"), "10.3f");
    assert_eq!(
        table.column("value").expect("value").element_type(),
        ElementType::Float64
    );
}

#[test]
fn table_set_collisions() {
    let (set, diagnostics) = diagnostics::capture(|| {
        TableSet::from_tables([
            Table::new().named("X"),
            Table::new().named("X"),
            Table::new(),
            Table::new(),
        ])
    });
    let set = set.expect("table set");
    assert_eq!(set.names(), vec!["X", "X.00001", "Untitled.00001", "Untitled.00002"]);
    assert_eq!(diagnostics.len(), 3);
    assert_eq!(set.get_index(1).and_then(Table::name), Some("X.00001"));
}

fn arbitrary_table() -> impl Strategy<Value = Table> {
    (1_usize..30).prop_flat_map(|rows| {
        (
            prop::collection::vec(-50_i32..50, rows),
            prop::collection::vec(prop::num::f64::NORMAL | prop::num::f64::QUIET_NAN, rows),
            prop::collection::vec("[a-c]{0,3}", rows),
        )
            .prop_map(|(ints, floats, strings)| {
                let mut table = Table::new().named("random");
                table
                    .add_column("i", ints, ColumnOptions::new())
                    .expect("ints");
                table
                    .add_column("f", floats, ColumnOptions::new())
                    .expect("floats");
                table
                    .add_column("s", strings, ColumnOptions::new())
                    .expect("strings");
                table
            })
    })
}

proptest! {
    #[test]
    fn where_all_true_is_identity(table in arbitrary_table()) {
        let mask = vec![true; table.len()];
        let selected = table.where_mask(&mask).expect("where");
        prop_assert_eq!(selected, table);
    }

    #[test]
    fn where_keeps_exactly_selected_rows(
        (table, mask) in arbitrary_table().prop_flat_map(|table| {
            let rows = table.len();
            (Just(table), prop::collection::vec(any::<bool>(), rows))
        })
    ) {
        let selected = table.where_mask(&mask).expect("where");
        prop_assert_eq!(selected.len(), mask.iter().filter(|&&keep| keep).count());
        prop_assert_eq!(selected.column_names(), table.column_names());
        let mut next = 0;
        for (row, keep) in mask.iter().enumerate() {
            if *keep {
                prop_assert_eq!(selected.row(next).expect("row"), table.row(row).expect("row"));
                next += 1;
            }
        }
    }

    #[test]
    fn sort_orders_rows_and_preserves_content(table in arbitrary_table()) {
        let mut sorted = table.clone();
        sorted.sort(&["i"]).expect("sort");
        prop_assert_eq!(sorted.len(), table.len());
        let ints = sorted.get_column("i").expect("i").data().as_i32().expect("i32").to_vec();
        prop_assert!(ints.windows(2).all(|pair| pair[0] <= pair[1]));

        let mut original: Vec<String> = (0..table.len())
            .map(|row| format!("{:?}", table.row(row).expect("row")))
            .collect();
        let mut reordered: Vec<String> = (0..sorted.len())
            .map(|row| format!("{:?}", sorted.row(row).expect("row")))
            .collect();
        original.sort();
        reordered.sort();
        prop_assert_eq!(original, reordered);
    }

    #[test]
    fn sort_by_float_puts_nan_last(table in arbitrary_table()) {
        let mut sorted = table;
        sorted.sort(&["f"]).expect("sort");
        let floats = sorted.get_column("f").expect("f").data().as_f64().expect("f64").to_vec();
        let first_nan = floats.iter().position(|x| x.is_nan()).unwrap_or(floats.len());
        prop_assert!(floats[first_nan..].iter().all(|x| x.is_nan()));
        prop_assert!(floats[..first_nan].windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn rows_follow_requested_order(
        (table, ids) in arbitrary_table().prop_flat_map(|table| {
            let rows = table.len();
            (Just(table), prop::collection::vec(0..rows, 0..40))
        })
    ) {
        let picked = table.rows(&ids).expect("rows");
        prop_assert_eq!(picked.len(), ids.len());
        for (position, row) in ids.iter().enumerate() {
            prop_assert_eq!(picked.row(position).expect("row"), table.row(*row).expect("row"));
        }
    }
}
