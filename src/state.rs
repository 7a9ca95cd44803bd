//! Orchestration of batches, selections, matchers and metrics
//!
//! Derived state is recomputed eagerly and in full whenever a
//! [`StateCommand`] is applied. There is no incremental update.

use crate::aggregation::{create_common_fields, merge_batches};
use crate::batch::Batch;
use crate::error::{CodecCompareError, Result};
use crate::field::FieldId;
use crate::filter::{CommonField, FilterKind, WEB_BPP_JPEG_FILTER};
use crate::matcher::FieldMatcher;
use crate::metric::FieldMetric;
use crate::selection::BatchSelection;
use std::sync::Arc;

/// Change notifications triggering a recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateCommand {
    /// A filter of one batch changed.
    FilterChanged { batch: usize },
    /// The filter of a common field changed.
    CommonFilterChanged,
    /// Another batch became the reference.
    ReferenceChanged { batch: usize },
    /// A matcher was toggled or its tolerance changed.
    MatcherChanged,
    /// A metric was toggled.
    MetricChanged,
}

/// Owns every batch and everything derived from them.
#[derive(Debug, Clone)]
pub struct ComparisonState {
    pub batches: Vec<Arc<Batch>>,
    pub reference_index: usize,
    pub matchers: Vec<FieldMatcher>,
    pub metrics: Vec<FieldMetric>,
    pub common_fields: Vec<CommonField>,
    pub selections: Vec<BatchSelection>,
}

impl ComparisonState {
    /// Set up default matchers, metrics and filters, with the first batch as
    /// reference, and compute everything once.
    pub fn new(batches: Vec<Batch>) -> Result<Self> {
        if batches.is_empty() {
            return Err(CodecCompareError::invalid_input("no batch to compare"));
        }
        if let Some((position, batch)) = batches
            .iter()
            .enumerate()
            .find(|(position, batch)| batch.index != *position)
        {
            return Err(CodecCompareError::invalid_batch(
                &batch.name,
                format!("index {} does not match its position {}", batch.index, position),
            ));
        }

        let batches: Vec<Arc<Batch>> = batches.into_iter().map(Arc::new).collect();
        let matchers = create_matchers(&batches)?;
        let metrics = create_metrics(&batches)?;
        let common_fields = create_common_fields(&batches, FieldId::SourceImageName);
        let selections = batches
            .iter()
            .map(|batch| BatchSelection::new(Arc::clone(batch)))
            .collect();

        let mut state = Self {
            batches,
            reference_index: 0,
            matchers,
            metrics,
            common_fields,
            selections,
        };
        state.recompute_all()?;
        Ok(state)
    }

    pub fn reference(&self) -> &BatchSelection {
        &self.selections[self.reference_index]
    }

    /// Recompute what depends on the change described by `command`.
    pub fn apply(&mut self, command: StateCommand) -> Result<()> {
        log::debug!("Applying {:?}", command);
        match command {
            StateCommand::FilterChanged { batch } => {
                self.check_batch_index(batch)?;
                self.selections[batch].update_filtered_rows(&self.common_fields);
                if batch == self.reference_index {
                    self.update_all_matches()
                } else {
                    self.update_matches(batch)
                }
            }
            StateCommand::CommonFilterChanged => self.recompute_all(),
            StateCommand::ReferenceChanged { batch } => {
                self.check_batch_index(batch)?;
                self.reference_index = batch;
                self.update_all_matches()
            }
            StateCommand::MatcherChanged => {
                for matcher in &self.matchers {
                    matcher.check_tolerance(&self.batches)?;
                }
                self.update_all_matches()
            }
            StateCommand::MetricChanged => {
                let reference = Arc::clone(&self.selections[self.reference_index].batch);
                for selection in &mut self.selections {
                    selection.update_stats(&reference, &self.metrics)?;
                }
                Ok(())
            }
        }
    }

    pub fn recompute_all(&mut self) -> Result<()> {
        for selection in &mut self.selections {
            selection.update_filtered_rows(&self.common_fields);
        }
        self.update_all_matches()
    }

    fn update_all_matches(&mut self) -> Result<()> {
        for index in 0..self.selections.len() {
            self.update_matches(index)?;
        }
        Ok(())
    }

    fn update_matches(&mut self, index: usize) -> Result<()> {
        let reference = &self.selections[self.reference_index];
        let matches = self.selections[index].compute_matches(reference, &self.matchers)?;
        if matches.limited {
            log::warn!(
                "Matching '{}' against '{}' hit the comparison budget; results are partial",
                self.selections[index].batch.name,
                reference.batch.name
            );
        }
        let reference_batch = Arc::clone(&reference.batch);

        let selection = &mut self.selections[index];
        selection.set_matches(matches);
        selection.update_stats(&reference_batch, &self.metrics)?;
        selection.update_histogram();
        Ok(())
    }

    fn check_batch_index(&self, batch: usize) -> Result<()> {
        if batch >= self.batches.len() {
            return Err(CodecCompareError::batch_not_found(batch.to_string()));
        }
        Ok(())
    }

    pub fn batch_index_by_name(&self, name: &str) -> Option<usize> {
        self.batches
            .iter()
            .position(|b| b.name == name)
            .or_else(|| self.batches.iter().position(|b| b.name.eq_ignore_ascii_case(name)))
    }

    /// Matcher whose field in the first batch is called `name`.
    pub fn matcher_index_by_name(&self, name: &str) -> Option<usize> {
        let field_index = self.batches[0].field_index_by_name(name)?;
        self.matchers
            .iter()
            .position(|m| m.field_indices[0] == field_index)
    }

    /// Metric whose field in the first batch is called `name`.
    pub fn metric_index_by_name(&self, name: &str) -> Option<usize> {
        let field_index = self.batches[0].field_index_by_name(name)?;
        self.metrics
            .iter()
            .position(|m| m.field_indices[0] == field_index)
    }

    /// Filter of `batch` persisted under `name`: a field name, or the name
    /// of the web JPEG bpp filter.
    pub fn filter_index_by_name(&self, batch: usize, name: &str) -> Option<usize> {
        let selection = self.selections.get(batch)?;
        if name.eq_ignore_ascii_case(WEB_BPP_JPEG_FILTER) {
            return selection
                .field_filters
                .iter()
                .position(|f| matches!(f.kind, FilterKind::BucketedRange { .. }));
        }
        selection.batch.field_index_by_name(name)
    }

    pub fn matcher_name(&self, index: usize) -> &str {
        &self.batches[0].fields[self.matchers[index].field_indices[0]].name
    }

    pub fn metric_name(&self, index: usize) -> &str {
        &self.batches[0].fields[self.metrics[index].field_indices[0]].name
    }

    /// Change a matcher, rejecting tolerances its fields cannot take.
    pub fn set_matcher(&mut self, index: usize, tolerance: f64, enabled: bool) -> Result<()> {
        let Some(current) = self.matchers.get(index) else {
            return Err(CodecCompareError::invalid_matcher(format!("no matcher {}", index)));
        };
        let updated = FieldMatcher {
            field_indices: current.field_indices.clone(),
            tolerance,
            enabled,
        };
        updated.check_tolerance(&self.batches)?;
        self.matchers[index] = updated;
        self.apply(StateCommand::MatcherChanged)
    }

    pub fn set_metric_enabled(&mut self, index: usize, enabled: bool) -> Result<()> {
        let metric = self
            .metrics
            .get_mut(index)
            .ok_or_else(|| CodecCompareError::invalid_metric(format!("no metric {}", index)))?;
        metric.enabled = enabled;
        self.apply(StateCommand::MetricChanged)
    }

    /// Restore a filter of `batch` from its serialized form.
    pub fn set_filter(&mut self, batch: usize, filter: usize, serialized: &str) -> Result<()> {
        self.check_batch_index(batch)?;
        let selection = &mut self.selections[batch];
        let field_filter = selection.field_filters.get_mut(filter).ok_or_else(|| {
            CodecCompareError::invalid_filter(format!(
                "no filter {} in batch '{}'",
                filter, selection.batch.name
            ))
        })?;
        let field = &selection.batch.fields[field_filter.field_index];
        field_filter.unserialize(field, serialized)?;
        self.apply(StateCommand::FilterChanged { batch })
    }

    /// Restore the filter of the common field from its serialized form.
    pub fn set_common_filter(&mut self, serialized: &str) -> Result<()> {
        let common = self.common_fields.first_mut().ok_or_else(|| {
            CodecCompareError::invalid_filter("the batches have no common source field")
        })?;
        common.filter.unserialize(&common.field, serialized)?;
        self.apply(StateCommand::CommonFilterChanged)
    }

    pub fn set_reference(&mut self, batch: usize) -> Result<()> {
        self.apply(StateCommand::ReferenceChanged { batch })
    }

    /// Selections merged per codec version, empty if they cannot be merged.
    pub fn merged_selections(&self) -> Vec<BatchSelection> {
        merge_batches(&self.selections)
    }
}

/// Field indices of the fields comparable to `batches[0].fields[field]` in
/// every batch, if all have one.
fn comparable_field_indices(batches: &[Arc<Batch>], field: usize) -> Option<Vec<usize>> {
    let probe = &batches[0].fields[field];
    batches
        .iter()
        .map(|batch| {
            if batch.index == 0 {
                Some(field)
            } else {
                batch.comparable_field_index(probe)
            }
        })
        .collect()
}

/// One exact matcher per field present in every batch. Source image and
/// dimensions are matched by default.
pub fn create_matchers(batches: &[Arc<Batch>]) -> Result<Vec<FieldMatcher>> {
    let mut matchers = Vec::new();
    for (field_index, field) in batches[0].fields.iter().enumerate() {
        let Some(field_indices) = comparable_field_indices(batches, field_index) else {
            continue;
        };
        let enabled = matches!(
            field.id,
            FieldId::SourceImageName | FieldId::Width | FieldId::Height
        );
        matchers.push(FieldMatcher::new(field_indices, batches, 0.0, enabled)?);
    }
    Ok(matchers)
}

/// One metric per numeric field present in every batch. Sizes, durations and
/// quality scores are enabled by default.
pub fn create_metrics(batches: &[Arc<Batch>]) -> Result<Vec<FieldMetric>> {
    let mut metrics = Vec::new();
    for (field_index, field) in batches[0].fields.iter().enumerate() {
        let Some(field_indices) = comparable_field_indices(batches, field_index) else {
            continue;
        };
        let numeric = batches
            .iter()
            .zip(&field_indices)
            .all(|(batch, &i)| batch.fields[i].is_number);
        if !numeric {
            continue;
        }
        let enabled = field.id.is_quality_metric()
            || matches!(
                field.id,
                FieldId::EncodedSize
                    | FieldId::Bpp
                    | FieldId::EncodingDuration
                    | FieldId::DecodingDuration
            );
        metrics.push(FieldMetric::new(field_indices, batches, enabled)?);
    }
    Ok(metrics)
}
