//! Grouping and merging of batches
//!
//! Batches produced by the same codec version, typically one per encoder
//! setting or per corpus shard, can be merged into a single synthetic
//! selection. Merging never fails loudly: inconsistent inputs give `None` or
//! an empty list and the caller keeps showing the batches separately.

use crate::accumulators::GeometricMean;
use crate::batch::Batch;
use crate::field::{Field, FieldId};
use crate::filter::{CommonField, FieldFilter};
use crate::matcher::MatchedDataPoints;
use crate::metric::{FieldMetricStats, SourceCount};
use crate::selection::BatchSelection;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Partition selections into groups sharing the same codec and version.
/// Groups and their members keep the order in which they were first seen.
pub fn create_groups(selections: &[BatchSelection]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (index, selection) in selections.iter().enumerate() {
        let batch = &selection.batch;
        let group = groups.iter_mut().find(|group| {
            group.iter().all(|&member| {
                let other = &selections[member].batch;
                other.codec == batch.codec && other.version == batch.version
            })
        });
        match group {
            Some(group) => group.push(index),
            None => groups.push(vec![index]),
        }
    }
    groups
}

/// Merge every group of same-codec selections. Returns an empty list if any
/// group cannot be merged.
pub fn merge_batches(selections: &[BatchSelection]) -> Vec<BatchSelection> {
    let mut merged = Vec::new();
    for group in create_groups(selections) {
        let members: Vec<&BatchSelection> = group.iter().map(|&i| &selections[i]).collect();
        match merge_batches_with_same_codec(&members) {
            Some(selection) => merged.push(selection),
            None => {
                log::warn!(
                    "Cannot merge the batches of {}",
                    members[0].batch.codec
                );
                return Vec::new();
            }
        }
    }
    merged
}

/// Merge selections of one codec version into a synthetic selection whose
/// stats are weighted by each input's number of matched rows.
///
/// Returns `None` if versions or field lists differ, if a filter excludes
/// points in some inputs but not in others or with different bounds, or if
/// no input has any match.
pub fn merge_batches_with_same_codec(selections: &[&BatchSelection]) -> Option<BatchSelection> {
    let first = *selections.first()?;
    let first_batch = &first.batch;

    for selection in &selections[1..] {
        let batch = &selection.batch;
        if batch.codec != first_batch.codec || batch.version != first_batch.version {
            return None;
        }
        if batch.fields.len() != first_batch.fields.len()
            || !batch
                .fields
                .iter()
                .zip(&first_batch.fields)
                .all(|(a, b)| a.is_comparable(b))
        {
            log::debug!(
                "Fields of '{}' and '{}' differ",
                batch.name,
                first_batch.name
            );
            return None;
        }
        if !same_filter_effect(first, selection) {
            log::debug!(
                "Filters of '{}' and '{}' are inconsistent",
                batch.name,
                first_batch.name
            );
            return None;
        }
        if selection.stats.len() != first.stats.len() {
            return None;
        }
    }

    let total_weight: usize = selections.iter().map(|s| s.match_count).sum();
    if total_weight == 0 {
        return None;
    }
    let weighted: Vec<&BatchSelection> = selections
        .iter()
        .copied()
        .filter(|s| s.match_count > 0)
        .collect();

    let stats = (0..first.stats.len())
        .map(|metric| merge_stats(&weighted, metric, total_weight))
        .collect();

    let colors: Vec<&str> = selections.iter().map(|s| s.batch.color.as_str()).collect();
    let batch = Batch {
        index: first_batch.index,
        name: if first_batch.version.is_empty() {
            first_batch.codec.clone()
        } else {
            format!("{} {}", first_batch.codec, first_batch.version)
        },
        codec: first_batch.codec.clone(),
        version: first_batch.version.clone(),
        time: selections.iter().filter_map(|s| s.batch.time).max(),
        constants: first_batch.constants.clone(),
        fields: first_batch.fields.clone(),
        rows: Vec::new(),
        color: average_color(&colors),
    };

    let mut error_sum = 0.0;
    let mut maximum_relative_error: f64 = 0.0;
    for selection in &weighted {
        let points = &selection.matched_data_points;
        error_sum += points.average_relative_error * selection.match_count as f64;
        maximum_relative_error = maximum_relative_error.max(points.maximum_relative_error);
    }
    let matched_data_points = MatchedDataPoints {
        rows: Vec::new(),
        limited: selections.iter().any(|s| s.matched_data_points.limited),
        average_relative_error: error_sum / total_weight as f64,
        maximum_relative_error,
    };

    let histograms: Vec<&[SourceCount]> = selections.iter().map(|s| s.histogram.as_slice()).collect();

    Some(BatchSelection {
        batch: Arc::new(batch),
        field_filters: first.field_filters.clone(),
        filtered_row_indices: Vec::new(),
        matched_data_points,
        stats,
        histogram: merge_histograms(&histograms),
        match_count: total_weight,
    })
}

fn same_filter_effect(a: &BatchSelection, b: &BatchSelection) -> bool {
    if a.field_filters.len() != b.field_filters.len() {
        return false;
    }
    a.field_filters
        .iter()
        .zip(&b.field_filters)
        .all(|(filter_a, filter_b)| {
            match (
                a.batch.fields.get(filter_a.field_index),
                b.batch.fields.get(filter_b.field_index),
            ) {
                (Some(field_a), Some(field_b)) => {
                    filter_a.has_same_effect(field_a, filter_b, field_b)
                }
                _ => false,
            }
        })
}

fn merge_stats(selections: &[&BatchSelection], metric: usize, total_weight: usize) -> FieldMetricStats {
    let total = total_weight as f64;
    let weighted_mean = |get: fn(&FieldMetricStats) -> f64| {
        selections
            .iter()
            .map(|s| get(&s.stats[metric]) * s.match_count as f64)
            .sum::<f64>()
            / total
    };

    // Repeating each input's mean once per matched row only approximates the
    // geometric mean over all matched rows.
    let mut geometric_mean = GeometricMean::new();
    for selection in selections {
        for _ in 0..selection.match_count {
            geometric_mean.add(selection.stats[metric].geometric_mean);
        }
    }

    FieldMetricStats {
        absolute_arithmetic_mean: weighted_mean(|s| s.absolute_arithmetic_mean),
        relative_arithmetic_mean: weighted_mean(|s| s.relative_arithmetic_mean),
        geometric_mean: geometric_mean.get(),
        min_ratio: selections
            .iter()
            .map(|s| s.stats[metric].min_ratio)
            .fold(f64::INFINITY, f64::min),
        max_ratio: selections
            .iter()
            .map(|s| s.stats[metric].max_ratio)
            .fold(f64::NEG_INFINITY, f64::max),
        absolute_low_quantile: weighted_mean(|s| s.absolute_low_quantile),
        absolute_high_quantile: weighted_mean(|s| s.absolute_high_quantile),
        relative_low_quantile: weighted_mean(|s| s.relative_low_quantile),
        relative_high_quantile: weighted_mean(|s| s.relative_high_quantile),
    }
}

/// Sum the per-source counts of several histograms, sorted by source name.
/// Returns an empty list if two histograms disagree on a source's paths.
pub fn merge_histograms(histograms: &[&[SourceCount]]) -> Vec<SourceCount> {
    let mut merged: BTreeMap<String, SourceCount> = BTreeMap::new();
    for histogram in histograms {
        for source in histogram.iter() {
            let Some(entry) = merged.get_mut(&source.source_name) else {
                merged.insert(source.source_name.clone(), source.clone());
                continue;
            };
            if !merge_path(&mut entry.source_path, &source.source_path)
                || !merge_path(&mut entry.preview_path, &source.preview_path)
            {
                log::debug!("Inconsistent paths for source '{}'", source.source_name);
                return Vec::new();
            }
            entry.count += source.count;
        }
    }
    merged.into_values().collect()
}

fn merge_path(into: &mut Option<String>, from: &Option<String>) -> bool {
    match (into.as_ref(), from) {
        (Some(a), Some(b)) => a == b,
        (None, Some(b)) => {
            *into = Some(b.clone());
            true
        }
        _ => true,
    }
}

/// Reconcile the field `id` across every batch. Returns nothing if a batch
/// lacks the field.
pub fn create_common_fields<B: Borrow<Batch>>(batches: &[B], id: FieldId) -> Vec<CommonField> {
    let mut field_indices = vec![0; batches.len()];
    let mut fields: Vec<&Field> = Vec::with_capacity(batches.len());
    for batch in batches {
        let batch = batch.borrow();
        let Some(field_index) = batch.field_index(id) else {
            return Vec::new();
        };
        let Some(slot) = field_indices.get_mut(batch.index) else {
            return Vec::new();
        };
        *slot = field_index;
        fields.push(&batch.fields[field_index]);
    }
    let Some(first) = fields.first() else {
        return Vec::new();
    };

    let mut merged = Field::new(first.name.clone(), first.description.clone());
    merged.is_number = fields.iter().all(|f| f.is_number);
    if merged.is_number {
        merged.range_start = fields.iter().map(|f| f.range_start).fold(f64::INFINITY, f64::min);
        merged.range_end = fields.iter().map(|f| f.range_end).fold(f64::NEG_INFINITY, f64::max);
        merged.smallest_absolute_non_zero = fields
            .iter()
            .map(|f| f.smallest_absolute_non_zero)
            .fold(f64::INFINITY, f64::min);
    }

    let mut values: Vec<String> = fields
        .iter()
        .flat_map(|f| f.unique_values.iter().cloned())
        .collect();
    if merged.is_number {
        values.sort_by(|a, b| {
            let a = a.parse::<f64>().unwrap_or(f64::NAN);
            let b = b.parse::<f64>().unwrap_or(f64::NAN);
            a.total_cmp(&b)
        });
    } else {
        values.sort();
    }
    values.dedup();
    merged.set_unique_values(values);

    let filter = FieldFilter::for_field(0, &merged);
    vec![CommonField {
        field: merged,
        field_indices,
        filter,
    }]
}

/// Per-channel average of `#rrggbb` colors. Unparsable colors are ignored.
pub fn average_color(colors: &[&str]) -> String {
    let mut sums = [0u32; 3];
    let mut count = 0u32;
    for color in colors {
        if let Some(rgb) = parse_color(color) {
            for (sum, channel) in sums.iter_mut().zip(rgb) {
                *sum += u32::from(channel);
            }
            count += 1;
        }
    }
    if count == 0 {
        return "#000000".to_string();
    }
    let channel = |sum: u32| (f64::from(sum) / f64::from(count)).round().clamp(0.0, 255.0) as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        channel(sums[0]),
        channel(sums[1]),
        channel(sums[2])
    )
}

fn parse_color(color: &str) -> Option<[u8; 3]> {
    let hex = color.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}
