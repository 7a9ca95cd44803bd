//! Unit tests for field typing and batch construction

use crate::common::{build_batch, build_batch_with_constants, rows};
use codec_compare::field::{are_comparable, parse_number, Field, FieldId, Value};

#[test]
fn test_field_id_synonyms() {
    assert_eq!(FieldId::from_name("Encoded Size"), FieldId::EncodedSize);
    assert_eq!(FieldId::from_name("source-image"), FieldId::SourceImageName);
    assert_eq!(FieldId::from_name("SSIMULACRA2"), FieldId::Ssimulacra2);
    assert_eq!(FieldId::from_name("my custom column"), FieldId::Custom);
}

#[test]
fn test_custom_fields_compare_by_name() {
    assert!(are_comparable(FieldId::Custom, "Tune", FieldId::Custom, "tune"));
    assert!(!are_comparable(FieldId::Custom, "tune", FieldId::Custom, "preset"));
    assert!(are_comparable(FieldId::Width, "width", FieldId::Width, "original_width"));
    assert!(!are_comparable(FieldId::Width, "width", FieldId::Height, "height"));
}

#[test]
fn test_parse_number_rejects_non_finite() {
    assert_eq!(parse_number(" 42 "), Some(42.0));
    assert_eq!(parse_number("1e3"), Some(1000.0));
    assert_eq!(parse_number("inf"), None);
    assert_eq!(parse_number("NaN"), None);
    assert_eq!(parse_number(""), None);
}

#[test]
fn test_numeric_unique_values_are_sorted_numerically() {
    let field = Field::from_raw_values("quality", &["10", "9", "100", "9.0"]);
    assert!(field.is_number);
    assert!(!field.is_integer);
    assert_eq!(field.unique_values, vec!["9", "10", "100"]);
    assert_eq!(field.range_start, 9.0);
    assert_eq!(field.range_end, 100.0);
    assert_eq!(field.smallest_absolute_non_zero, 9.0);
}

#[test]
fn test_integer_field() {
    let field = Field::from_raw_values("effort", &["1", "7", "3"]);
    assert!(field.is_integer);
}

#[test]
fn test_smallest_absolute_non_zero_skips_zero() {
    let field = Field::from_raw_values("v", &["0", "-0.5", "2"]);
    assert_eq!(field.smallest_absolute_non_zero, 0.5);
    assert_eq!(field.range_start, -0.5);
}

#[test]
fn test_mixed_column_is_text() {
    let batch = build_batch(0, &["v"], &rows(&[&["1"], &["n/a"], &["3"]]));
    assert!(!batch.fields[0].is_number);
    assert_eq!(batch.rows[0][0], Value::Text("1".to_string()));
}

#[test]
fn test_batch_attributes_from_constants() {
    let batch = build_batch_with_constants(
        1,
        "file",
        &[
            ("codec", "avif"),
            ("version", "1.0.4"),
            ("date", "2024-01-02 03:04:05"),
            ("color", "#123456"),
        ],
        &["original_name"],
        &rows(&[&["a.png"]]),
    );
    assert_eq!(batch.codec, "avif");
    assert_eq!(batch.version, "1.0.4");
    assert_eq!(batch.color, "#123456");
    assert_eq!(
        batch.time.unwrap().format("%Y-%m-%d %H:%M:%S").to_string(),
        "2024-01-02 03:04:05"
    );
}

#[test]
fn test_codec_defaults_to_batch_name() {
    let batch = build_batch_with_constants(0, "experiment", &[], &["v"], &rows(&[&["1"]]));
    assert_eq!(batch.codec, "experiment");
    assert_eq!(batch.version, "");
    assert!(batch.time.is_none());
}

#[test]
fn test_row_attribute_prefers_field_then_constant() {
    let batch = build_batch_with_constants(
        0,
        "b",
        &[("original_path", "/images/${original_name}")],
        &["original_name"],
        &rows(&[&["a.png"], &["b.png"]]),
    );
    assert_eq!(
        batch.row_attribute(FieldId::SourceImagePath, 1).as_deref(),
        Some("/images/b.png")
    );
    assert_eq!(
        batch.row_attribute(FieldId::SourceImageName, 0).as_deref(),
        Some("a.png")
    );
    assert!(batch.row_attribute(FieldId::PreviewPath, 0).is_none());
}

#[test]
fn test_bpp_uses_frame_count() {
    let batch = build_batch(
        0,
        &["width", "height", "frame_count", "encoded_size"],
        &rows(&[&["10", "10", "2", "100"]]),
    );
    let bpp = batch.field_index(FieldId::Bpp).unwrap();
    assert_eq!(batch.rows[0][bpp], Value::Number(4.0));
}

#[test]
fn test_bpp_skipped_on_degenerate_dimensions() {
    let batch = build_batch(
        0,
        &["width", "height", "encoded_size"],
        &rows(&[&["10", "10", "100"], &["0", "10", "100"]]),
    );
    assert!(batch.field_index(FieldId::Bpp).is_none());
    assert_eq!(batch.fields.len(), 3);
}
