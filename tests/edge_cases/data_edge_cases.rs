//! Edge case tests for unusual batch content

use crate::common::{build_batch, rows, TestFixture};
use codec_compare::field::{FieldId, Value};
use codec_compare::loader::{load_batch, parse_batch};
use codec_compare::CodecCompareError;
use serde_json::json;

#[test]
fn test_row_with_wrong_arity_is_rejected() {
    let json = json!({
        "field_descriptions": [{"name": "a"}, {"name": "b"}],
        "field_values": [["1", "2"], ["3"]]
    });
    let result = parse_batch(&json.to_string(), 0, "short");
    match result {
        Err(CodecCompareError::InvalidBatch { name, message }) => {
            assert_eq!(name, "short");
            assert!(message.contains("row 1"));
        }
        other => panic!("Expected InvalidBatch, got {:?}", other.map(|b| b.name)),
    }
}

#[test]
fn test_batch_without_rows() {
    let json = json!({
        "field_descriptions": [{"name": "original_name"}, {"name": "encoded_size"}],
        "field_values": []
    });
    let batch = parse_batch(&json.to_string(), 0, "empty").unwrap();
    assert!(batch.rows.is_empty());
    assert!(!batch.fields[1].is_number);
}

#[test]
fn test_null_cells_make_a_column_textual() {
    let json = json!({
        "field_descriptions": [{"name": "ssim"}],
        "field_values": [[0.9], [null], [0.8]]
    });
    let batch = parse_batch(&json.to_string(), 0, "nulls").unwrap();
    assert!(!batch.fields[0].is_number);
    assert_eq!(batch.rows[1][0], Value::Text(String::new()));
}

#[test]
fn test_numbers_written_as_strings_are_numeric() {
    let json = json!({
        "field_descriptions": [{"name": "quality"}],
        "field_values": [["50"], [60], ["70.5"]]
    });
    let batch = parse_batch(&json.to_string(), 0, "strings").unwrap();
    assert!(batch.fields[0].is_number);
    assert_eq!(batch.rows[0][0], Value::Number(50.0));
    assert_eq!(batch.fields[0].unique_values, vec!["50", "60", "70.5"]);
}

#[test]
fn test_unicode_source_names() {
    let batch = build_batch(0, &["original_name"], &rows(&[&["café.png"], &["北京.png"], &["🚀.png"]]));
    let source = batch.field_index(FieldId::SourceImageName).unwrap();
    assert_eq!(batch.fields[source].unique_values.len(), 3);
    assert_eq!(batch.value(2, source).key(), "🚀.png");
}

#[test]
fn test_corrupted_file() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.create_corrupted_file("corrupted.json").unwrap();
    assert!(load_batch(&path, 0).is_err());
}

#[test]
fn test_missing_file() {
    let fixture = TestFixture::new().unwrap();
    let result = load_batch(&fixture.root().join("missing.json"), 0);
    assert!(matches!(result, Err(CodecCompareError::InvalidInput { .. })));
}

#[test]
fn test_wrong_json_shape() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.create_raw("array.json", "[1, 2, 3]").unwrap();
    assert!(matches!(load_batch(&path, 0), Err(CodecCompareError::Json(_))));
}
