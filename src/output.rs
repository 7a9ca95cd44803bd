//! Output formatting utilities

use crate::batch::Batch;
use crate::error::Result;
use crate::field::{format_number, FieldId};
use crate::metric::{FieldMetricStats, SourceCount};
use crate::selection::BatchSelection;
use crate::state::ComparisonState;
use std::sync::Arc;

/// Pretty printer for codec-compare output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print constants and field summaries of a batch
    pub fn print_batch_summary(batch: &Batch) {
        println!("📦 Batch: {}", batch.name);
        println!("├─ Codec: {}", batch.codec);
        if !batch.version.is_empty() {
            println!("├─ Version: {}", batch.version);
        }
        if let Some(time) = batch.time {
            println!("├─ Time: {}", time.format("%Y-%m-%d %H:%M:%S"));
        }
        println!("├─ Rows: {}", batch.rows.len());

        if !batch.constants.is_empty() {
            println!("├─ Constants:");
            for (i, constant) in batch.constants.iter().enumerate() {
                let prefix = if i == batch.constants.len() - 1 { "│  └─" } else { "│  ├─" };
                println!("{} {}: {}", prefix, constant.name, constant.value);
            }
        }

        println!("└─ Fields:");
        for (i, field) in batch.fields.iter().enumerate() {
            let prefix = if i == batch.fields.len() - 1 { "   └─" } else { "   ├─" };
            if field.is_number {
                let kind = if field.is_integer { "integer" } else { "number" };
                println!(
                    "{} {} ({}): {} to {}, {} distinct",
                    prefix,
                    field.name,
                    kind,
                    format_number(field.range_start),
                    format_number(field.range_end),
                    field.unique_values.len()
                );
            } else {
                println!(
                    "{} {} (text): {} distinct",
                    prefix,
                    field.name,
                    field.unique_values.len()
                );
            }
        }
    }

    /// Print every selection compared against the reference
    pub fn print_comparison(state: &ComparisonState, selections: &[BatchSelection]) {
        let reference = state.reference();
        println!(
            "🔍 Comparison against {} ({} rows kept)",
            reference.batch.name,
            reference.filtered_row_indices.len()
        );

        println!("├─ {}", format_matchers(state));

        for (i, selection) in selections.iter().enumerate() {
            let last = i == selections.len() - 1;
            let (prefix, indent) = if last { ("└─", "   ") } else { ("├─", "│  ") };
            Self::print_selection(state, selection, prefix, indent);
        }

        if selections.iter().any(|s| s.matched_data_points.limited) {
            println!("⚠️  Matching stopped early for some batches; their results are partial.");
        }
    }

    fn print_selection(state: &ComparisonState, selection: &BatchSelection, prefix: &str, indent: &str) {
        let batch = &selection.batch;
        let is_reference = Arc::ptr_eq(batch, &state.reference().batch);
        println!(
            "{} {}{}: {} matches, {} average error",
            prefix,
            batch.name,
            if is_reference { " (reference)" } else { "" },
            selection.match_count,
            format_percent(selection.matched_data_points.average_relative_error)
        );

        let mut lines: Vec<String> = selection
            .active_filters()
            .map(|f| format!("filter: {}", f.describe(&batch.fields[f.field_index])))
            .collect();

        for (metric_index, metric) in state.metrics.iter().enumerate() {
            if !metric.enabled {
                continue;
            }
            let Some(stats) = selection.stats.get(metric_index) else {
                continue;
            };
            let field_id = state.batches[0].fields[metric.field_indices[0]].id;
            lines.push(format!(
                "{}: {}",
                state.metric_name(metric_index),
                format_stats(stats, field_id)
            ));
        }

        let sources = format_histogram(&selection.histogram);
        if !sources.is_empty() {
            lines.push(format!("sources: {}", sources));
        }

        for (i, line) in lines.iter().enumerate() {
            let branch = if i == lines.len() - 1 { "└─" } else { "├─" };
            println!("{}{} {}", indent, branch, line);
        }
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    /// Format the comparison of `selections` against the reference as JSON
    pub fn format_comparison(state: &ComparisonState, selections: &[BatchSelection]) -> Result<String> {
        let matchers: Vec<serde_json::Value> = state
            .matchers
            .iter()
            .enumerate()
            .map(|(i, m)| {
                serde_json::json!({
                    "field": state.matcher_name(i),
                    "tolerance": m.tolerance,
                    "enabled": m.enabled
                })
            })
            .collect();

        let batches: Vec<serde_json::Value> = selections
            .iter()
            .map(|selection| {
                let stats: serde_json::Map<String, serde_json::Value> = state
                    .metrics
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| m.enabled)
                    .filter_map(|(i, _)| {
                        let stats = selection.stats.get(i)?;
                        Some((state.metric_name(i).to_string(), serde_json::to_value(stats).ok()?))
                    })
                    .collect();
                let filters: Vec<String> = selection
                    .active_filters()
                    .map(|f| f.describe(&selection.batch.fields[f.field_index]))
                    .collect();
                let points = &selection.matched_data_points;

                serde_json::json!({
                    "name": selection.batch.name,
                    "codec": selection.batch.codec,
                    "version": selection.batch.version,
                    "color": selection.batch.color,
                    "filtered_rows": selection.filtered_row_indices.len(),
                    "match_count": selection.match_count,
                    "limited": points.limited,
                    "average_relative_error": points.average_relative_error,
                    "maximum_relative_error": points.maximum_relative_error,
                    "filters": filters,
                    "stats": stats,
                    "histogram": selection.histogram
                })
            })
            .collect();

        let json = serde_json::json!({
            "reference": state.reference().batch.name,
            "matchers": matchers,
            "batches": batches
        });
        Ok(serde_json::to_string_pretty(&json)?)
    }
}

fn format_stats(stats: &FieldMetricStats, field_id: FieldId) -> String {
    let mean = if field_id == FieldId::EncodedSize {
        format_bytes(stats.absolute_arithmetic_mean)
    } else {
        format!("{:.4}", stats.absolute_arithmetic_mean)
    };
    format!(
        "×{:.3} geomean, ×{:.3} of the mean (min ×{:.3}, max ×{:.3}), mean {}",
        stats.geometric_mean,
        stats.relative_arithmetic_mean,
        stats.min_ratio,
        stats.max_ratio,
        mean
    )
}

fn format_histogram(histogram: &[SourceCount]) -> String {
    histogram
        .iter()
        .filter(|s| s.count > 0)
        .map(|s| format!("{} ({})", s.source_name, s.count))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One line listing the enabled matchers and their tolerances
fn format_matchers(state: &ComparisonState) -> String {
    let matchers: Vec<String> = state
        .matchers
        .iter()
        .enumerate()
        .filter(|(_, m)| m.enabled)
        .map(|(i, m)| {
            if m.tolerance == 0.0 {
                state.matcher_name(i).to_string()
            } else {
                format!("{} (±{})", state.matcher_name(i), format_percent(m.tolerance))
            }
        })
        .collect();
    if matchers.is_empty() {
        "Matchers: none, no rows are matched".to_string()
    } else {
        format!("Matchers: {}", matchers.join(", "))
    }
}

fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Format bytes in human-readable format
fn format_bytes(bytes: f64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{:.0} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
