//! Integration tests for the compare and show commands

use crate::common::{sample_data, CliTestRunner};
use codec_compare::commands::build_config;
use codec_compare::CodecCompareError;
use std::path::PathBuf;

fn write_batches(runner: &CliTestRunner) -> (PathBuf, PathBuf) {
    let fixture = runner.fixture();
    let webp = fixture
        .create_batch_file(
            "webp.json",
            &sample_data::codec_batch("webp", "1.3", &sample_data::webp_rows()),
        )
        .unwrap();
    let jxl = fixture
        .create_batch_file(
            "jxl.json",
            &sample_data::codec_batch("jxl", "0.10", &sample_data::jxl_rows()),
        )
        .unwrap();
    (webp, jxl)
}

#[test]
fn test_compare_command_basic() {
    let runner = CliTestRunner::new().unwrap();
    let (webp, jxl) = write_batches(&runner);
    runner.expect_success(&["compare", webp.to_str().unwrap(), jxl.to_str().unwrap()]);
}

#[test]
fn test_compare_command_with_options() {
    let runner = CliTestRunner::new().unwrap();
    let (webp, jxl) = write_batches(&runner);
    runner.expect_success(&[
        "compare",
        webp.to_str().unwrap(),
        jxl.to_str().unwrap(),
        "--reference",
        "jxl",
        "--match",
        "original_name",
        "--match",
        "quality=0.1",
        "--metric",
        "encoded_size",
        "--filter",
        "webp:web_bpp_jpeg=on",
        "--merge",
        "--format",
        "json",
    ]);
}

#[test]
fn test_compare_command_with_config_file() {
    let runner = CliTestRunner::new().unwrap();
    let (webp, jxl) = write_batches(&runner);
    let config = runner
        .fixture()
        .create_raw(
            "config.json",
            r#"{"reference": "jxl", "metrics": [{"field": "bpp", "enabled": false}],
                "filters": {"webp": {"quality": "40..60"}}}"#,
        )
        .unwrap();
    runner.expect_success(&[
        "compare",
        webp.to_str().unwrap(),
        jxl.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);
}

#[test]
fn test_compare_command_errors() {
    let runner = CliTestRunner::new().unwrap();
    let (webp, jxl) = write_batches(&runner);
    let (webp, jxl) = (webp.to_str().unwrap(), jxl.to_str().unwrap());

    let error = runner.expect_failure(&["compare", webp, jxl, "--reference", "avif"]);
    assert!(matches!(error, CodecCompareError::BatchNotFound { .. }));

    let error = runner.expect_failure(&["compare", webp, jxl, "--match", "original_name=0.1"]);
    assert!(matches!(error, CodecCompareError::InvalidMatcher { .. }));

    let error = runner.expect_failure(&["compare", webp, jxl, "--filter", "webp:quality=oops"]);
    assert!(matches!(error, CodecCompareError::InvalidFilter { .. }));

    let error = runner.expect_failure(&["compare", webp, jxl, "--format", "xml"]);
    assert!(matches!(error, CodecCompareError::InvalidInput { .. }));

    let missing = runner.fixture().root().join("missing.json");
    runner.expect_failure(&["compare", webp, missing.to_str().unwrap()]);
}

#[test]
fn test_show_command() {
    let runner = CliTestRunner::new().unwrap();
    let (webp, _) = write_batches(&runner);
    runner.expect_success(&["show", webp.to_str().unwrap()]);
    runner.expect_success(&["show", webp.to_str().unwrap(), "--format", "json"]);
}

#[test]
fn test_build_config_merges_command_line() {
    let runner = CliTestRunner::new().unwrap();
    let path = runner
        .fixture()
        .create_raw(
            "config.json",
            r#"{"reference": "webp", "merge": false,
                "filters": {"jxl": {"effort": "3..7"}}}"#,
        )
        .unwrap();

    let config = build_config(
        Some(&path),
        Some("jxl".to_string()),
        &["quality=0.25".to_string()],
        &[],
        &["jxl:quality=50..90".to_string()],
        true,
    )
    .unwrap();

    assert_eq!(config.reference.as_deref(), Some("jxl"));
    assert!(config.exclusive_matchers);
    assert_eq!(config.matchers[0].field, "quality");
    assert_eq!(config.matchers[0].tolerance, 0.25);
    assert!(!config.exclusive_metrics);
    assert_eq!(config.filters["jxl"]["effort"], "3..7");
    assert_eq!(config.filters["jxl"]["quality"], "50..90");
    assert!(config.merge);
}
