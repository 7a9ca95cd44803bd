//! Unit tests for CLI argument parsing and validation

use clap::Parser;
use codec_compare::cli::{Cli, Commands, FilterArg, MatcherArg, OutputFormat};
use std::path::PathBuf;

#[test]
fn test_cli_compare_command() {
    let cli = Cli::try_parse_from(["codec-compare", "compare", "a.json", "b.json"]).unwrap();
    match cli.command {
        Commands::Compare {
            files,
            reference,
            config,
            matchers,
            metrics,
            filters,
            merge,
            format,
        } => {
            assert_eq!(files, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
            assert!(reference.is_none());
            assert!(config.is_none());
            assert!(matchers.is_empty());
            assert!(metrics.is_empty());
            assert!(filters.is_empty());
            assert!(!merge);
            assert_eq!(format, "pretty");
        }
        _ => panic!("Expected Compare command"),
    }
}

#[test]
fn test_cli_compare_command_with_options() {
    let cli = Cli::try_parse_from([
        "codec-compare",
        "compare",
        "a.json",
        "b.json",
        "--reference",
        "webp",
        "--match",
        "original_name",
        "--match",
        "quality=0.1",
        "--metric",
        "encoded_size",
        "--filter",
        "webp:quality=50..90",
        "--merge",
        "--format",
        "json",
    ])
    .unwrap();

    match cli.command {
        Commands::Compare {
            reference,
            matchers,
            metrics,
            filters,
            merge,
            format,
            ..
        } => {
            assert_eq!(reference.as_deref(), Some("webp"));
            assert_eq!(matchers, vec!["original_name", "quality=0.1"]);
            assert_eq!(metrics, vec!["encoded_size"]);
            assert_eq!(filters, vec!["webp:quality=50..90"]);
            assert!(merge);
            assert_eq!(format, "json");
        }
        _ => panic!("Expected Compare command"),
    }
}

#[test]
fn test_cli_compare_requires_files() {
    assert!(Cli::try_parse_from(["codec-compare", "compare"]).is_err());
}

#[test]
fn test_cli_show_command() {
    let cli = Cli::try_parse_from(["codec-compare", "show", "a.json", "--format", "json"]).unwrap();
    match cli.command {
        Commands::Show { file, format } => {
            assert_eq!(file, PathBuf::from("a.json"));
            assert_eq!(format, "json");
        }
        _ => panic!("Expected Show command"),
    }
}

#[test]
fn test_cli_global_verbose_flag() {
    let cli = Cli::try_parse_from(["codec-compare", "show", "a.json", "--verbose"]).unwrap();
    assert!(cli.verbose);

    let cli = Cli::try_parse_from(["codec-compare", "-v", "show", "a.json"]).unwrap();
    assert!(cli.verbose);
}

#[test]
fn test_cli_unknown_command() {
    assert!(Cli::try_parse_from(["codec-compare", "snapshot"]).is_err());
}

#[test]
fn test_output_format_parse_is_case_insensitive() {
    assert_eq!(OutputFormat::parse("Pretty").unwrap(), OutputFormat::Pretty);
    assert_eq!(OutputFormat::parse("json").unwrap(), OutputFormat::Json);
    let err = OutputFormat::parse("yaml").unwrap_err();
    assert!(err.contains("yaml"));
}

#[test]
fn test_matcher_arg_whitespace() {
    let arg = MatcherArg::parse(" quality = 0.25 ").unwrap();
    assert_eq!(arg.field, "quality");
    assert_eq!(arg.tolerance, 0.25);
}

#[test]
fn test_filter_arg_keeps_bitmask_form() {
    let arg = FilterArg::parse("jxl:original_name=a8").unwrap();
    assert_eq!(arg.batch, "jxl");
    assert_eq!(arg.field, "original_name");
    assert_eq!(arg.serialized, "a8");

    let arg = FilterArg::parse("jxl:web_bpp_jpeg=on").unwrap();
    assert_eq!(arg.field, "web_bpp_jpeg");
    assert_eq!(arg.serialized, "on");
}
