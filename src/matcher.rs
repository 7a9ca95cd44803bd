//! Pairing of rows between two filtered batches
//!
//! Rows of the left batch are greedily paired with rows of the right
//! (reference) batch. Candidates are bucketed by the value of an exact
//! matcher so that only rows that can possibly match are compared. The
//! search is bounded by [`COMPARISON_BUDGET`]; results cut short by the
//! budget are flagged as `limited`.

use crate::batch::Batch;
use crate::error::{CodecCompareError, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::borrow::Borrow;

/// Maximum number of row comparisons of a single matching run.
pub const COMPARISON_BUDGET: usize = 4096 * 4096;

/// Links the same semantic field across batches for matching.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMatcher {
    /// Field index in each batch, indexed by batch index.
    pub field_indices: Vec<usize>,
    /// Maximum relative error in `[0, 1)`. Zero means exact equality.
    pub tolerance: f64,
    pub enabled: bool,
}

impl FieldMatcher {
    /// Create a matcher after checking its index table against `batches`.
    pub fn new<B: Borrow<Batch>>(
        field_indices: Vec<usize>,
        batches: &[B],
        tolerance: f64,
        enabled: bool,
    ) -> Result<Self> {
        if field_indices.len() != batches.len() {
            return Err(CodecCompareError::invalid_matcher(format!(
                "{} field indices for {} batches",
                field_indices.len(),
                batches.len()
            )));
        }
        for (batch, &field_index) in batches.iter().zip(&field_indices) {
            let batch = batch.borrow();
            if field_index >= batch.fields.len() {
                return Err(CodecCompareError::invalid_matcher(format!(
                    "field index {} out of bounds in batch '{}'",
                    field_index, batch.name
                )));
            }
        }
        let matcher = Self {
            field_indices,
            tolerance,
            enabled,
        };
        matcher.check_tolerance(batches)?;
        Ok(matcher)
    }

    /// Tolerances must be in `[0, 1)` and only apply to numeric fields.
    pub fn check_tolerance<B: Borrow<Batch>>(&self, batches: &[B]) -> Result<()> {
        if !(0.0..1.0).contains(&self.tolerance) {
            return Err(CodecCompareError::invalid_matcher(format!(
                "tolerance {} is not in [0, 1)",
                self.tolerance
            )));
        }
        if self.tolerance > 0.0 {
            for (batch, &field_index) in batches.iter().zip(&self.field_indices) {
                let field = &batch.borrow().fields[field_index];
                if !field.is_number {
                    return Err(CodecCompareError::invalid_matcher(format!(
                        "tolerance {} on non-numeric field '{}'",
                        self.tolerance, field.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn field_index(&self, batch: &Batch) -> Result<usize> {
        self.field_indices
            .get(batch.index)
            .copied()
            .filter(|&i| i < batch.fields.len())
            .ok_or_else(|| {
                CodecCompareError::invalid_matcher(format!(
                    "no field index for batch '{}'",
                    batch.name
                ))
            })
    }
}

/// One selected pairing of a left row with a right row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Match {
    pub left_index: usize,
    pub right_index: usize,
    /// `∏(1 + relative error) - 1` over the tolerant matchers.
    pub cumulative_relative_error: f64,
}

impl Match {
    fn is_better_than(&self, other: &Match) -> bool {
        if self.cumulative_relative_error != other.cumulative_relative_error {
            return self.cumulative_relative_error < other.cumulative_relative_error;
        }
        // Keeps the selection identical when left and right are swapped.
        self.left_index + self.right_index < other.left_index + other.right_index
    }

    fn swapped(self) -> Self {
        Self {
            left_index: self.right_index,
            right_index: self.left_index,
            cumulative_relative_error: self.cumulative_relative_error,
        }
    }
}

/// Result of a matching run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchedDataPoints {
    pub rows: Vec<Match>,
    /// The comparison budget ran out before the search completed.
    pub limited: bool,
    pub average_relative_error: f64,
    pub maximum_relative_error: f64,
}

impl MatchedDataPoints {
    pub fn new(rows: Vec<Match>, limited: bool) -> Self {
        let mut sum = 0.0;
        let mut maximum: f64 = 0.0;
        for row in &rows {
            sum += row.cumulative_relative_error;
            maximum = maximum.max(row.cumulative_relative_error);
        }
        let average = if rows.is_empty() {
            0.0
        } else {
            sum / rows.len() as f64
        };
        Self {
            rows,
            limited,
            average_relative_error: average,
            maximum_relative_error: maximum,
        }
    }

    fn swapped(self) -> Self {
        Self {
            rows: self.rows.into_iter().map(Match::swapped).collect(),
            ..self
        }
    }
}

/// A batch reduced to the rows that passed its filters.
#[derive(Debug, Clone, Copy)]
pub struct FilteredBatch<'a> {
    pub batch: &'a Batch,
    pub row_indices: &'a [usize],
}

impl<'a> FilteredBatch<'a> {
    pub fn new(batch: &'a Batch, row_indices: &'a [usize]) -> Self {
        Self { batch, row_indices }
    }
}

/// A matcher with its field indices looked up for one pair of batches.
#[derive(Debug, Clone, Copy)]
struct ResolvedMatcher {
    left_field: usize,
    right_field: usize,
    tolerance: f64,
}

fn resolve_matchers(
    left: &Batch,
    right: &Batch,
    matchers: &[FieldMatcher],
) -> Result<Vec<ResolvedMatcher>> {
    matchers
        .iter()
        .filter(|m| m.enabled)
        .map(|m| {
            let resolved = ResolvedMatcher {
                left_field: m.field_index(left)?,
                right_field: m.field_index(right)?,
                tolerance: m.tolerance,
            };
            if resolved.tolerance > 0.0
                && !(left.fields[resolved.left_field].is_number
                    && right.fields[resolved.right_field].is_number)
            {
                return Err(CodecCompareError::invalid_matcher(format!(
                    "tolerance {} on non-numeric fields '{}' and '{}'",
                    resolved.tolerance,
                    left.fields[resolved.left_field].name,
                    right.fields[resolved.right_field].name
                )));
            }
            Ok(resolved)
        })
        .collect()
}

fn match_rows(
    left: &Batch,
    left_index: usize,
    right: &Batch,
    right_index: usize,
    matchers: &[ResolvedMatcher],
) -> Option<Match> {
    let mut error_product = 1.0;
    for matcher in matchers {
        let left_value = left.value(left_index, matcher.left_field);
        let right_value = right.value(right_index, matcher.right_field);
        if left_value == right_value {
            continue;
        }
        if matcher.tolerance == 0.0 {
            return None;
        }
        let (a, b) = (left_value.as_f64()?, right_value.as_f64()?);
        if (a < 0.0) != (b < 0.0) {
            return None;
        }
        let (low, high) = (a.abs().min(b.abs()), a.abs().max(b.abs()));
        let relative_error = 1.0 - low / high;
        if relative_error > matcher.tolerance {
            return None;
        }
        error_product *= 1.0 + relative_error;
    }
    Some(Match {
        left_index,
        right_index,
        cumulative_relative_error: error_product - 1.0,
    })
}

/// Check whether two rows match under every enabled matcher.
pub fn find_match(
    left: &Batch,
    left_index: usize,
    right: &Batch,
    right_index: usize,
    matchers: &[FieldMatcher],
) -> Result<Option<Match>> {
    let resolved = resolve_matchers(left, right, matchers)?;
    Ok(match_rows(left, left_index, right, right_index, &resolved))
}

/// Pair each filtered left row with at most one filtered right row.
pub fn get_data_points(
    left: FilteredBatch<'_>,
    right: FilteredBatch<'_>,
    matchers: &[FieldMatcher],
) -> Result<MatchedDataPoints> {
    get_data_points_with_budget(left, right, matchers, COMPARISON_BUDGET)
}

/// [`get_data_points`] with a custom comparison budget.
pub fn get_data_points_with_budget(
    left: FilteredBatch<'_>,
    right: FilteredBatch<'_>,
    matchers: &[FieldMatcher],
    budget: usize,
) -> Result<MatchedDataPoints> {
    let matchers = resolve_matchers(left.batch, right.batch, matchers)?;
    if matchers.is_empty() {
        return Ok(MatchedDataPoints::default());
    }

    // A tolerant matcher could spread matching values over several buckets.
    let mut bucket_key: Option<ResolvedMatcher> = None;
    for matcher in matchers.iter().filter(|m| m.tolerance == 0.0) {
        let unique_count = right.batch.fields[matcher.right_field].unique_values.len();
        let best_count = bucket_key
            .map(|m| right.batch.fields[m.right_field].unique_values.len())
            .unwrap_or(1);
        if unique_count > best_count {
            bucket_key = Some(*matcher);
        }
    }

    let mut buckets: IndexMap<String, Vec<usize>> = IndexMap::new();
    for &right_index in right.row_indices {
        let key = bucket_key
            .map(|m| right.batch.value(right_index, m.right_field).key())
            .unwrap_or_default();
        buckets.entry(key).or_default().push(right_index);
    }

    let mut rows = Vec::new();
    let mut comparisons = 0usize;
    for &left_index in left.row_indices {
        let key = bucket_key
            .map(|m| left.batch.value(left_index, m.left_field).key())
            .unwrap_or_default();
        let Some(bucket) = buckets.get_mut(&key) else {
            continue;
        };

        let mut best: Option<(usize, Match)> = None;
        for (position, &right_index) in bucket.iter().enumerate() {
            comparisons += 1;
            if comparisons >= budget {
                log::debug!(
                    "Comparison budget of {} exhausted after {} matches",
                    budget,
                    rows.len()
                );
                return Ok(MatchedDataPoints::new(rows, true));
            }

            if let Some(candidate) =
                match_rows(left.batch, left_index, right.batch, right_index, &matchers)
            {
                let replace = match &best {
                    Some((_, current)) => candidate.is_better_than(current),
                    None => true,
                };
                if replace {
                    best = Some((position, candidate));
                }
            }
        }

        if let Some((position, found)) = best {
            bucket.swap_remove(position);
            rows.push(found);
        }
    }

    log::debug!(
        "Matched {} of {} rows of '{}' against '{}' in {} comparisons",
        rows.len(),
        left.row_indices.len(),
        left.batch.name,
        right.batch.name,
        comparisons
    );
    Ok(MatchedDataPoints::new(rows, false))
}

/// Run the matching in both orientations and keep the one with the lower
/// average relative error, expressed as `(left, right)` pairs.
pub fn get_data_points_symmetric(
    left: FilteredBatch<'_>,
    right: FilteredBatch<'_>,
    matchers: &[FieldMatcher],
) -> Result<MatchedDataPoints> {
    let forward = get_data_points(left, right, matchers)?;
    let backward = get_data_points(right, left, matchers)?;
    if backward.average_relative_error < forward.average_relative_error {
        Ok(backward.swapped())
    } else {
        Ok(forward)
    }
}
