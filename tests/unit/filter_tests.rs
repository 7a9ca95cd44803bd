//! Unit tests for row filters and their persisted form

use crate::common::{build_batch, rows};
use codec_compare::aggregation::create_common_fields;
use codec_compare::field::{Field, FieldId};
use codec_compare::filter::{FieldFilter, FilterKind};
use codec_compare::{get_filtered_row_indices, CodecCompareError};

#[test]
fn test_filtered_rows_keep_row_order() {
    let batch = build_batch(
        0,
        &["original_name", "quality"],
        &rows(&[&["a", "10"], &["b", "50"], &["c", "90"], &["d", "40"]]),
    );
    let mut filters: Vec<FieldFilter> = batch
        .fields
        .iter()
        .enumerate()
        .map(|(i, f)| FieldFilter::for_field(i, f))
        .collect();
    assert_eq!(get_filtered_row_indices(&batch, &filters, &[]), vec![0, 1, 2, 3]);

    filters[1].unserialize(&batch.fields[1], "40..90").unwrap();
    assert_eq!(get_filtered_row_indices(&batch, &filters, &[]), vec![1, 2, 3]);

    // Values sorted as a, b, c, d: keep a and d.
    filters[0].unserialize(&batch.fields[0], "9").unwrap();
    assert_eq!(get_filtered_row_indices(&batch, &filters, &[]), vec![3]);
}

#[test]
fn test_off_restores_full_domain() {
    let field = Field::from_raw_values("quality", &["10", "90"]);
    let mut filter = FieldFilter::for_field(0, &field);
    filter.unserialize(&field, "20..30").unwrap();
    filter.unserialize(&field, "off").unwrap();
    assert!(!filter.enabled);
    assert_eq!(filter, FieldFilter::for_field(0, &field));
}

#[test]
fn test_invalid_range_is_rejected() {
    let field = Field::from_raw_values("quality", &["10", "90"]);
    let mut filter = FieldFilter::for_field(0, &field);
    assert!(filter.unserialize(&field, "20").is_err());
    assert!(filter.unserialize(&field, "a..b").is_err());
    assert!(!filter.enabled);
}

#[test]
fn test_reversed_range_is_rejected() {
    let field = Field::from_raw_values("quality", &["10", "90"]);
    let mut filter = FieldFilter::for_field(0, &field);
    let result = filter.unserialize(&field, "60..40");
    assert!(matches!(result, Err(CodecCompareError::InvalidFilter { .. })));
    assert!(!filter.enabled);
    assert_eq!(filter.serialize(&field), "off");

    filter.unserialize(&field, "40..40").unwrap();
    assert!(filter.enabled);
}

#[test]
fn test_bitmask_spans_several_digits() {
    let values: Vec<String> = (0..6).map(|i| format!("img{}", i)).collect();
    let field = Field::from_raw_values("original_name", &values);
    let mut filter = FieldFilter::for_field(0, &field);
    filter.unserialize(&field, "84").unwrap();

    match &filter.kind {
        FilterKind::ValueSet { kept } => {
            let kept: Vec<&str> = kept.iter().map(String::as_str).collect();
            assert_eq!(kept, vec!["img0", "img5"]);
        }
        other => panic!("Expected a value set, got {:?}", other),
    }
    assert_eq!(filter.serialize(&field), "84");
}

#[test]
fn test_web_bpp_filter_uses_row_megapixels() {
    // 1000x1000 is one megapixel: bucket [1, 2) keeps bpp in [0.4, 4.2].
    let batch = build_batch(
        0,
        &["width", "height", "encoded_size"],
        &rows(&[&["1000", "1000", "100000"], &["1000", "1000", "1000000"]]),
    );
    let bpp = batch.field_index(FieldId::Bpp).unwrap();
    let mut filter = FieldFilter::web_bpp_jpeg(bpp);
    assert!(!filter.filters_out(&batch, 1));

    filter.unserialize(&batch.fields[bpp], "on").unwrap();
    assert_eq!(filter.serialize(&batch.fields[bpp]), "on");
    assert!(!filter.filters_out(&batch, 0));
    assert!(filter.filters_out(&batch, 1));
    assert!(filter.actually_filters_points_out(&batch.fields[bpp]));
}

#[test]
fn test_common_field_filter_applies_through_index_table() {
    let left = build_batch(0, &["original_name", "q"], &rows(&[&["a", "1"], &["b", "2"]]));
    let right = build_batch(1, &["q", "original_name"], &rows(&[&["1", "b"], &["2", "c"]]));
    let mut common = create_common_fields(&[&left, &right], FieldId::SourceImageName);
    assert_eq!(common.len(), 1);
    assert_eq!(common[0].field_indices, vec![0, 1]);
    assert_eq!(common[0].field.unique_values, vec!["a", "b", "c"]);

    // Keep only "b".
    let field = common[0].field.clone();
    common[0].filter.unserialize(&field, "4").unwrap();
    assert_eq!(get_filtered_row_indices(&left, &[], &common), vec![1]);
    assert_eq!(get_filtered_row_indices(&right, &[], &common), vec![0]);
}

#[test]
fn test_same_effect_ignores_vacuous_filters() {
    let field_a = Field::from_raw_values("quality", &["10", "90"]);
    let field_b = Field::from_raw_values("quality", &["20", "80"]);
    let mut a = FieldFilter::for_field(0, &field_a);
    let b = FieldFilter::for_field(0, &field_b);
    a.unserialize(&field_a, "0..100").unwrap();
    assert!(a.has_same_effect(&field_a, &b, &field_b));

    a.unserialize(&field_a, "15..90").unwrap();
    assert!(!a.has_same_effect(&field_a, &b, &field_b));
}
