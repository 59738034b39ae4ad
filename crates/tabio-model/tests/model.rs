//! Tests for tabio-model types.

use proptest::prelude::*;
use tabio_model::{
    Cell, ColumnData, ColumnDescriptor, DisplayFormat, ElementType, KeywordValue, Value,
};

#[test]
fn descriptor_serializes() {
    let descriptor = ColumnDescriptor::new(ElementType::Float64)
        .with_unit("deg")
        .with_null(Value::Int32(-99))
        .expect("numeric null");
    let json = serde_json::to_string(&descriptor).expect("serialize descriptor");
    let round: ColumnDescriptor = serde_json::from_str(&json).expect("deserialize descriptor");
    assert_eq!(round.element_type(), ElementType::Float64);
    assert_eq!(round.unit(), Some("deg"));
    assert_eq!(round.null(), Some(&Value::Float64(-99.0)));
    assert_eq!(round.format(), &DisplayFormat::new(25, ".17e"));
}

#[test]
fn vector_rows_are_arrays() {
    let data = ColumnData::from(vec![1_i32, 2, 3, 4]);
    assert_eq!(
        data.row(1, 2),
        Some(Value::Array(vec![Value::Int32(3), Value::Int32(4)]))
    );
    assert_eq!(data.row(2, 2), None);
    assert_eq!(
        Cell::from(data.row(0, 2).expect("row 0")),
        Cell::List(vec![Cell::Int(1), Cell::Int(2)])
    );
}

#[test]
fn parse_texts_builds_typed_column() {
    let data = ColumnData::parse_texts(ElementType::Float32, &["1.5", " -2 ", "nan"])
        .expect("parse floats");
    assert_eq!(data.element_type(), ElementType::Float32);
    assert!(data.is_nan(2));
    assert_eq!(data.get(1), Some(Value::Float32(-2.0)));
}

#[test]
fn keyword_values_serialize_untagged() {
    let json = serde_json::to_string(&vec![
        KeywordValue::Int(3),
        KeywordValue::from("J2000"),
        KeywordValue::Bool(true),
    ])
    .expect("serialize keywords");
    assert_eq!(json, r#"[3,"J2000",true]"#);
}

proptest! {
    #[test]
    fn take_rows_preserves_selected_values(
        values in prop::collection::vec(any::<i64>(), 1..40),
        picks in prop::collection::vec(any::<prop::sample::Index>(), 0..20),
    ) {
        let data = ColumnData::from(values.clone());
        let rows: Vec<usize> = picks.iter().map(|pick| pick.index(values.len())).collect();
        let taken = data.take_rows(&rows, 1);
        prop_assert_eq!(taken.len(), rows.len());
        for (position, row) in rows.iter().enumerate() {
            prop_assert_eq!(taken.get(position), Some(Value::Int64(values[*row])));
        }
    }

    #[test]
    fn string_cast_never_exceeds_width(text in "\\PC{0,12}", width in 0_usize..8) {
        let data = ColumnData::strings([text]);
        let narrowed = data.cast(ElementType::Str(width)).expect("string cast");
        let values = narrowed.as_strings().expect("string data");
        prop_assert!(values[0].len() <= width);
    }
}
