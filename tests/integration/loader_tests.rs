//! Integration tests for loading batch files

use crate::common::{sample_data, TestFixture};
use codec_compare::field::FieldId;
use codec_compare::loader::{load_batch, load_batches};
use codec_compare::progress::ProgressReporter;

#[test]
fn test_load_batch_from_file() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_batch_file(
            "webp.json",
            &sample_data::codec_batch("webp", "1.3.2", &sample_data::webp_rows()),
        )
        .unwrap();

    let batch = load_batch(&path, 0).unwrap();
    assert_eq!(batch.name, "webp");
    assert_eq!(batch.codec, "webp");
    assert_eq!(batch.version, "1.3.2");
    assert!(batch.time.is_some());
    assert_eq!(batch.rows.len(), 4);
    assert_eq!(batch.constants.len(), 3);

    // encoded_size * 8 / (100 * 100)
    let bpp = batch.field_index(FieldId::Bpp).unwrap();
    assert_eq!(batch.value(0, bpp).as_f64(), Some(0.8));
    assert!(batch.fields[batch.field_index(FieldId::Width).unwrap()].is_integer);
}

#[test]
fn test_load_batches_keeps_file_order() {
    let fixture = TestFixture::new().unwrap();
    let paths: Vec<_> = ["webp", "jxl", "avif"]
        .iter()
        .map(|codec| {
            fixture
                .create_batch_file(
                    &format!("{}.json", codec),
                    &sample_data::codec_batch(codec, "1", &sample_data::jxl_rows()),
                )
                .unwrap()
        })
        .collect();

    let batches = load_batches(&paths, &ProgressReporter::new_minimal()).unwrap();
    let names: Vec<(usize, &str)> = batches.iter().map(|b| (b.index, b.codec.as_str())).collect();
    assert_eq!(names, vec![(0, "webp"), (1, "jxl"), (2, "avif")]);
}

#[test]
fn test_load_batches_fails_on_any_bad_file() {
    let fixture = TestFixture::new().unwrap();
    let good = fixture
        .create_batch_file(
            "good.json",
            &sample_data::codec_batch("webp", "1", &sample_data::webp_rows()),
        )
        .unwrap();
    let bad = fixture.create_raw("bad.json", "{").unwrap();

    assert!(load_batches(&[good, bad], &ProgressReporter::new_minimal()).is_err());
}
