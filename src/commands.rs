//! Command implementations for codec-compare CLI

use crate::cli::{Commands, FilterArg, MatcherArg, OutputFormat};
use crate::config::{CompareConfig, MatcherConfig, MetricConfig};
use crate::error::{CodecCompareError, Result};
use crate::loader::{load_batch, load_batches};
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::progress::ProgressReporter;
use crate::state::ComparisonState;
use std::path::{Path, PathBuf};

/// Execute a command
pub fn execute_command(command: Commands) -> Result<()> {
    match command {
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
            let config = build_config(
                config.as_deref(),
                reference,
                &matchers,
                &metrics,
                &filters,
                merge,
            )?;
            compare_command(&files, &config, &format)
        }
        Commands::Show { file, format } => show_command(&file, &format),
    }
}

/// Combine the config file, if any, with command-line settings. Command-line
/// settings take precedence.
pub fn build_config(
    config_path: Option<&Path>,
    reference: Option<String>,
    matchers: &[String],
    metrics: &[String],
    filters: &[String],
    merge: bool,
) -> Result<CompareConfig> {
    let mut config = match config_path {
        Some(path) => CompareConfig::load(path)?,
        None => CompareConfig::default(),
    };

    if reference.is_some() {
        config.reference = reference;
    }
    if !matchers.is_empty() {
        config.exclusive_matchers = true;
        config.matchers = matchers
            .iter()
            .map(|m| {
                let arg = MatcherArg::parse(m).map_err(CodecCompareError::invalid_input)?;
                Ok(MatcherConfig {
                    field: arg.field,
                    tolerance: arg.tolerance,
                    enabled: true,
                })
            })
            .collect::<Result<Vec<_>>>()?;
    }
    if !metrics.is_empty() {
        config.exclusive_metrics = true;
        config.metrics = metrics
            .iter()
            .map(|field| MetricConfig {
                field: field.clone(),
                enabled: true,
            })
            .collect();
    }
    for filter in filters {
        let arg = FilterArg::parse(filter).map_err(CodecCompareError::invalid_input)?;
        config
            .filters
            .entry(arg.batch)
            .or_default()
            .insert(arg.field, arg.serialized);
    }
    config.merge |= merge;
    Ok(config)
}

/// Match every batch against the reference and print aggregated metrics
fn compare_command(files: &[PathBuf], config: &CompareConfig, format: &str) -> Result<()> {
    let output_format = OutputFormat::parse(format).map_err(CodecCompareError::invalid_input)?;
    let show_progress = output_format == OutputFormat::Pretty;

    let batches = {
        let progress = if show_progress {
            ProgressReporter::new_for_load(files.len() as u64)
        } else {
            ProgressReporter::new_minimal()
        };
        load_batches(files, &progress)?
    };

    let state = {
        let progress = if show_progress {
            ProgressReporter::new_for_compare()
        } else {
            ProgressReporter::new_minimal()
        };
        let mut state = ComparisonState::new(batches)?;
        config.apply_to(&mut state)?;
        progress.finish("Matched rows");
        state
    };

    let selections = if config.merge {
        let merged = state.merged_selections();
        if merged.is_empty() {
            log::warn!("Batches could not be merged; showing them separately");
            state.selections.clone()
        } else {
            log::info!(
                "Merged {} batches into {}",
                state.selections.len(),
                merged.len()
            );
            merged
        }
    } else {
        state.selections.clone()
    };

    match output_format {
        OutputFormat::Pretty => PrettyPrinter::print_comparison(&state, &selections),
        OutputFormat::Json => println!("{}", JsonFormatter::format_comparison(&state, &selections)?),
    }
    Ok(())
}

/// Show batch information
fn show_command(file: &Path, format: &str) -> Result<()> {
    let output_format = OutputFormat::parse(format).map_err(CodecCompareError::invalid_input)?;
    let batch = load_batch(file, 0)?;

    match output_format {
        OutputFormat::Pretty => PrettyPrinter::print_batch_summary(&batch),
        OutputFormat::Json => println!("{}", JsonFormatter::format(&batch)?),
    }
    Ok(())
}
