//! Derived, recomputable view of one batch

use crate::batch::Batch;
use crate::error::Result;
use crate::field::FieldId;
use crate::filter::{get_filtered_row_indices, CommonField, FieldFilter};
use crate::matcher::{get_data_points_symmetric, FieldMatcher, FilteredBatch, MatchedDataPoints};
use crate::metric::{compute_histogram, compute_stats, FieldMetric, FieldMetricStats, SourceCount};
use std::sync::Arc;

/// Filters of a batch and everything computed from them.
#[derive(Debug, Clone)]
pub struct BatchSelection {
    pub batch: Arc<Batch>,
    /// One filter per field, positionally aligned with `batch.fields`,
    /// followed by filters spanning several fields of a row.
    pub field_filters: Vec<FieldFilter>,
    pub filtered_row_indices: Vec<usize>,
    pub matched_data_points: MatchedDataPoints,
    /// One entry per metric of the owning state.
    pub stats: Vec<FieldMetricStats>,
    pub histogram: Vec<SourceCount>,
    /// Number of matched rows; for merged selections, the sum over inputs.
    pub match_count: usize,
}

impl BatchSelection {
    /// Selection with every filter disabled and nothing computed yet.
    pub fn new(batch: Arc<Batch>) -> Self {
        let mut field_filters: Vec<FieldFilter> = batch
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| FieldFilter::for_field(index, field))
            .collect();
        if let (Some(bpp), Some(_), Some(_)) = (
            batch.field_index(FieldId::Bpp),
            batch.field_index(FieldId::Width),
            batch.field_index(FieldId::Height),
        ) {
            field_filters.push(FieldFilter::web_bpp_jpeg(bpp));
        }
        let filtered_row_indices = (0..batch.rows.len()).collect();

        Self {
            batch,
            field_filters,
            filtered_row_indices,
            matched_data_points: MatchedDataPoints::default(),
            stats: Vec::new(),
            histogram: Vec::new(),
            match_count: 0,
        }
    }

    pub fn filtered(&self) -> FilteredBatch<'_> {
        FilteredBatch::new(&self.batch, &self.filtered_row_indices)
    }

    pub fn update_filtered_rows(&mut self, common_fields: &[CommonField]) {
        self.filtered_row_indices =
            get_filtered_row_indices(&self.batch, &self.field_filters, common_fields);
    }

    /// Match this selection against the reference selection.
    pub fn compute_matches(
        &self,
        reference: &BatchSelection,
        matchers: &[FieldMatcher],
    ) -> Result<MatchedDataPoints> {
        get_data_points_symmetric(self.filtered(), reference.filtered(), matchers)
    }

    pub fn set_matches(&mut self, matched_data_points: MatchedDataPoints) {
        self.match_count = matched_data_points.rows.len();
        self.matched_data_points = matched_data_points;
    }

    pub fn update_stats(&mut self, reference: &Batch, metrics: &[FieldMetric]) -> Result<()> {
        self.stats = compute_stats(&self.batch, reference, &self.matched_data_points, metrics)?;
        Ok(())
    }

    pub fn update_histogram(&mut self) {
        self.histogram = compute_histogram(&self.batch, &self.matched_data_points);
    }

    /// Filters currently excluding part of their field's domain.
    pub fn active_filters(&self) -> impl Iterator<Item = &FieldFilter> {
        self.field_filters
            .iter()
            .filter(|f| f.actually_filters_points_out(&self.batch.fields[f.field_index]))
    }
}
