//! Statistics over matched pairs

use crate::accumulators::{GeometricMean, Quantile};
use crate::batch::Batch;
use crate::error::{CodecCompareError, Result};
use crate::field::FieldId;
use crate::matcher::MatchedDataPoints;
use indexmap::IndexMap;
use serde::Serialize;
use std::borrow::Borrow;

/// Quantile reported as the low end of a distribution.
pub const LOW_QUANTILE: f64 = 0.1;
/// Quantile reported as the high end of a distribution.
pub const HIGH_QUANTILE: f64 = 0.9;

/// Links the same semantic field across batches for statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMetric {
    /// Field index in each batch, indexed by batch index.
    pub field_indices: Vec<usize>,
    pub enabled: bool,
}

impl FieldMetric {
    pub fn new<B: Borrow<Batch>>(
        field_indices: Vec<usize>,
        batches: &[B],
        enabled: bool,
    ) -> Result<Self> {
        if field_indices.len() != batches.len() {
            return Err(CodecCompareError::invalid_metric(format!(
                "{} field indices for {} batches",
                field_indices.len(),
                batches.len()
            )));
        }
        for (batch, &field_index) in batches.iter().zip(&field_indices) {
            let batch = batch.borrow();
            match batch.fields.get(field_index) {
                Some(field) if field.is_number => {}
                Some(field) => {
                    return Err(CodecCompareError::invalid_metric(format!(
                        "field '{}' of batch '{}' is not numeric",
                        field.name, batch.name
                    )))
                }
                None => {
                    return Err(CodecCompareError::invalid_metric(format!(
                        "field index {} out of bounds in batch '{}'",
                        field_index, batch.name
                    )))
                }
            }
        }
        Ok(Self {
            field_indices,
            enabled,
        })
    }

    pub fn field_index(&self, batch: &Batch) -> Result<usize> {
        let field_index = self
            .field_indices
            .get(batch.index)
            .copied()
            .filter(|&i| i < batch.fields.len())
            .ok_or_else(|| {
                CodecCompareError::invalid_metric(format!("no field index for batch '{}'", batch.name))
            })?;
        if !batch.fields[field_index].is_number {
            return Err(CodecCompareError::invalid_metric(format!(
                "field '{}' of batch '{}' is not numeric",
                batch.fields[field_index].name, batch.name
            )));
        }
        Ok(field_index)
    }
}

/// Aggregated comparison of one metric over a set of matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMetricStats {
    /// Mean of the left values.
    pub absolute_arithmetic_mean: f64,
    /// Sum of the left values over sum of the right values.
    pub relative_arithmetic_mean: f64,
    /// Geometric mean of the per-pair ratios.
    pub geometric_mean: f64,
    pub min_ratio: f64,
    pub max_ratio: f64,
    pub absolute_low_quantile: f64,
    pub absolute_high_quantile: f64,
    pub relative_low_quantile: f64,
    pub relative_high_quantile: f64,
}

impl Default for FieldMetricStats {
    fn default() -> Self {
        Self {
            absolute_arithmetic_mean: 0.0,
            relative_arithmetic_mean: 1.0,
            geometric_mean: 1.0,
            min_ratio: 1.0,
            max_ratio: 1.0,
            absolute_low_quantile: 0.0,
            absolute_high_quantile: 0.0,
            relative_low_quantile: 1.0,
            relative_high_quantile: 1.0,
        }
    }
}

/// `a / b`, with `0 / 0 = 1` and `a / 0 = +inf`.
pub fn get_ratio(a: f64, b: f64) -> f64 {
    if a == 0.0 && b == 0.0 {
        1.0
    } else if b == 0.0 {
        f64::INFINITY
    } else {
        a / b
    }
}

/// Compute the stats of every metric over `matches`. Disabled metrics get
/// the neutral defaults.
pub fn compute_stats(
    left: &Batch,
    right: &Batch,
    matches: &MatchedDataPoints,
    metrics: &[FieldMetric],
) -> Result<Vec<FieldMetricStats>> {
    metrics
        .iter()
        .map(|metric| {
            if !metric.enabled {
                return Ok(FieldMetricStats::default());
            }
            let left_field = metric.field_index(left)?;
            let right_field = metric.field_index(right)?;
            Ok(compute_metric_stats(left, left_field, right, right_field, matches))
        })
        .collect()
}

fn compute_metric_stats(
    left: &Batch,
    left_field: usize,
    right: &Batch,
    right_field: usize,
    matches: &MatchedDataPoints,
) -> FieldMetricStats {
    if matches.rows.is_empty() {
        return FieldMetricStats::default();
    }

    let mut left_sum = 0.0;
    let mut right_sum = 0.0;
    let mut geometric_mean = GeometricMean::new();
    let mut min_ratio = f64::INFINITY;
    let mut max_ratio = f64::NEG_INFINITY;
    let mut left_quantile = Quantile::new();
    let mut right_quantile = Quantile::new();

    for pair in &matches.rows {
        let a = left
            .value(pair.left_index, left_field)
            .as_f64()
            .unwrap_or(0.0);
        let b = right
            .value(pair.right_index, right_field)
            .as_f64()
            .unwrap_or(0.0);
        let ratio = get_ratio(a, b);

        left_sum += a;
        right_sum += b;
        geometric_mean.add(ratio);
        min_ratio = min_ratio.min(ratio);
        max_ratio = max_ratio.max(ratio);
        left_quantile.add(a);
        right_quantile.add(b);
    }

    let absolute_low_quantile = left_quantile.get(LOW_QUANTILE);
    let absolute_high_quantile = left_quantile.get(HIGH_QUANTILE);
    FieldMetricStats {
        absolute_arithmetic_mean: left_sum / matches.rows.len() as f64,
        relative_arithmetic_mean: get_ratio(left_sum, right_sum),
        geometric_mean: geometric_mean.get(),
        min_ratio,
        max_ratio,
        absolute_low_quantile,
        absolute_high_quantile,
        relative_low_quantile: get_ratio(absolute_low_quantile, right_quantile.get(LOW_QUANTILE)),
        relative_high_quantile: get_ratio(
            absolute_high_quantile,
            right_quantile.get(HIGH_QUANTILE),
        ),
    }
}

/// Number of matched rows of one source image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceCount {
    pub source_name: String,
    pub source_path: Option<String>,
    pub preview_path: Option<String>,
    pub count: usize,
}

/// Count the matches of each source image of `batch`. Sources without any
/// match are listed with a count of zero.
pub fn compute_histogram(batch: &Batch, matches: &MatchedDataPoints) -> Vec<SourceCount> {
    let Some(source_field) = batch.field_index(FieldId::SourceImageName) else {
        return Vec::new();
    };

    let mut histogram: IndexMap<String, SourceCount> = IndexMap::new();
    for row in 0..batch.rows.len() {
        let source_name = batch.value(row, source_field).key();
        if histogram.contains_key(&source_name) {
            continue;
        }
        histogram.insert(
            source_name.clone(),
            SourceCount {
                source_name,
                source_path: batch.row_attribute(FieldId::SourceImagePath, row),
                preview_path: batch.row_attribute(FieldId::PreviewPath, row),
                count: 0,
            },
        );
    }

    for pair in &matches.rows {
        let source_name = batch.value(pair.left_index, source_field).key();
        match histogram.get_mut(&source_name) {
            Some(entry) => entry.count += 1,
            None => {
                log::warn!(
                    "Matched row {} of '{}' has unknown source '{}'",
                    pair.left_index,
                    batch.name,
                    source_name
                );
                return Vec::new();
            }
        }
    }
    histogram.into_values().collect()
}
