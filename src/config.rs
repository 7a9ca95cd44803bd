//! Comparison settings persisted as JSON
//!
//! ```json
//! {
//!   "reference": "webp 1.3",
//!   "matchers": [{"field": "quality", "tolerance": 0.1}],
//!   "metrics": [{"field": "ssim", "enabled": false}],
//!   "filters": {"jxl 0.8": {"effort": "3..7", "web_bpp_jpeg": "on"}},
//!   "common_filter": "f8",
//!   "merge": true
//! }
//! ```

use crate::error::{CodecCompareError, Result};
use crate::state::{ComparisonState, StateCommand};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    pub field: String,
    #[serde(default)]
    pub tolerance: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    pub field: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Name of the reference batch. The first batch when absent.
    pub reference: Option<String>,
    pub matchers: Vec<MatcherConfig>,
    /// Disable every matcher not listed in `matchers`.
    pub exclusive_matchers: bool,
    pub metrics: Vec<MetricConfig>,
    /// Disable every metric not listed in `metrics`.
    pub exclusive_metrics: bool,
    /// Serialized filters by batch name, then by field name.
    pub filters: BTreeMap<String, BTreeMap<String, String>>,
    /// Serialized filter of the common source image field.
    pub common_filter: Option<String>,
    pub merge: bool,
}

impl CompareConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded comparison config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for matcher in &self.matchers {
            if !matcher.tolerance.is_finite() || matcher.tolerance < 0.0 {
                return Err(CodecCompareError::config(format!(
                    "tolerance of matcher '{}' must be a non-negative number",
                    matcher.field
                )));
            }
        }
        Ok(())
    }

    /// Apply every setting to `state`. Unknown batches and fields are
    /// configuration errors.
    pub fn apply_to(&self, state: &mut ComparisonState) -> Result<()> {
        self.validate()?;

        if self.exclusive_matchers {
            for matcher in &mut state.matchers {
                matcher.enabled = false;
            }
        }
        for entry in &self.matchers {
            let index = state.matcher_index_by_name(&entry.field).ok_or_else(|| {
                CodecCompareError::config(format!(
                    "no matcher for field '{}' (is it present in every batch?)",
                    entry.field
                ))
            })?;
            let matcher = &mut state.matchers[index];
            matcher.tolerance = entry.tolerance;
            matcher.enabled = entry.enabled;
            matcher.check_tolerance(&state.batches)?;
        }

        if self.exclusive_metrics {
            for metric in &mut state.metrics {
                metric.enabled = false;
            }
        }
        for entry in &self.metrics {
            let index = state.metric_index_by_name(&entry.field).ok_or_else(|| {
                CodecCompareError::config(format!(
                    "no metric for field '{}' (is it numeric in every batch?)",
                    entry.field
                ))
            })?;
            state.metrics[index].enabled = entry.enabled;
        }

        for (batch_name, filters) in &self.filters {
            let batch = state
                .batch_index_by_name(batch_name)
                .ok_or_else(|| CodecCompareError::batch_not_found(batch_name))?;
            for (field_name, serialized) in filters {
                let filter = state
                    .filter_index_by_name(batch, field_name)
                    .ok_or_else(|| CodecCompareError::field_not_found(field_name))?;
                let selection = &mut state.selections[batch];
                let field_filter = &mut selection.field_filters[filter];
                field_filter.unserialize(&selection.batch.fields[field_filter.field_index], serialized)?;
            }
        }

        if let Some(serialized) = &self.common_filter {
            let common = state.common_fields.first_mut().ok_or_else(|| {
                CodecCompareError::config("the batches have no common source field to filter")
            })?;
            common.filter.unserialize(&common.field, serialized)?;
        }

        if let Some(reference) = &self.reference {
            state.reference_index = state
                .batch_index_by_name(reference)
                .ok_or_else(|| CodecCompareError::batch_not_found(reference))?;
        }

        // Settings were written in place; one full pass brings everything
        // derived back in line.
        state.apply(StateCommand::CommonFilterChanged)
    }
}
