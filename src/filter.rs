//! Row inclusion predicates
//!
//! Every field of a batch gets one [`FieldFilter`], a range filter for numeric
//! fields and a kept-value set for the others. Batches with bpp and image
//! dimensions also get a bucketed filter rejecting bpp values that are not
//! plausible for JPEG images served on the web, given the image size.
//!
//! Filters have a compact string form used to persist them:
//! - range: `"<start>..<end>"`
//! - value set: lowercase hex bitmask over the field's sorted unique values,
//!   four values per digit, first value in the most significant bit
//! - bucketed range: `"on"`
//!
//! and `"off"` for any disabled filter.

use crate::batch::Batch;
use crate::error::{CodecCompareError, Result};
use crate::field::{format_number, parse_number, Field, Value};
use std::collections::BTreeSet;

/// One megapixel bucket of a bucketed range filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeBucket {
    pub min_inclusive: f64,
    pub max_exclusive: f64,
    pub filter_min_inclusive: f64,
    pub filter_max_inclusive: f64,
}

const fn bucket(min: f64, max: f64, filter_min: f64, filter_max: f64) -> RangeBucket {
    RangeBucket {
        min_inclusive: min,
        max_exclusive: max,
        filter_min_inclusive: filter_min,
        filter_max_inclusive: filter_max,
    }
}

/// Plausible JPEG bpp on the web by image size in megapixels.
/// Small images carry proportionally more header and table overhead.
pub const WEB_BPP_JPEG_BUCKETS: &[RangeBucket] = &[
    bucket(0.0, 0.1, 1.0, 11.54),
    bucket(0.1, 0.25, 0.8, 7.5),
    bucket(0.25, 0.5, 0.6, 5.8),
    bucket(0.5, 1.0, 0.5, 4.9),
    bucket(1.0, 2.0, 0.4, 4.2),
    bucket(2.0, f64::INFINITY, 0.3, 3.6),
];

/// Name under which the web JPEG bpp filter is persisted.
pub const WEB_BPP_JPEG_FILTER: &str = "web_bpp_jpeg";

/// Bucket containing `driving`, scanning boundaries in order.
pub fn find_bucket(buckets: &[RangeBucket], driving: f64) -> Option<&RangeBucket> {
    buckets
        .iter()
        .find(|b| driving >= b.min_inclusive && driving < b.max_exclusive)
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    /// Inclusive numeric bounds.
    Range { start: f64, end: f64 },
    /// Values to keep, in their canonical string form.
    ValueSet { kept: BTreeSet<String> },
    /// Per-megapixel-bucket bounds on the filtered value.
    BucketedRange { buckets: &'static [RangeBucket] },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field_index: usize,
    pub enabled: bool,
    pub kind: FilterKind,
}

impl FieldFilter {
    /// Disabled filter accepting the whole domain of `field`.
    pub fn for_field(field_index: usize, field: &Field) -> Self {
        Self {
            field_index,
            enabled: false,
            kind: full_domain(field),
        }
    }

    /// Disabled web JPEG bpp plausibility filter on the bpp field.
    pub fn web_bpp_jpeg(bpp_field_index: usize) -> Self {
        Self {
            field_index: bpp_field_index,
            enabled: false,
            kind: FilterKind::BucketedRange {
                buckets: WEB_BPP_JPEG_BUCKETS,
            },
        }
    }

    /// Whether this filter excludes part of the field's domain. An enabled
    /// filter whose bounds cover the whole domain does not.
    pub fn actually_filters_points_out(&self, field: &Field) -> bool {
        if !self.enabled {
            return false;
        }
        match &self.kind {
            FilterKind::Range { start, end } => {
                *start > field.range_start || *end < field.range_end
            }
            FilterKind::ValueSet { kept } => {
                let accepted = field
                    .unique_values
                    .iter()
                    .filter(|v| kept.contains(*v))
                    .count();
                accepted < field.unique_values.len()
            }
            // Bounds depend on another value of the row.
            FilterKind::BucketedRange { .. } => true,
        }
    }

    /// Whether a value must be excluded. `driving` is the bucket key of the
    /// row, only used by bucketed filters.
    pub fn filters_out_value(&self, value: &Value, driving: Option<f64>) -> bool {
        if !self.enabled {
            return false;
        }
        match &self.kind {
            FilterKind::Range { start, end } => match value.as_f64() {
                Some(v) => v < *start || v > *end,
                None => true,
            },
            FilterKind::ValueSet { kept } => !kept.contains(&value.key()),
            FilterKind::BucketedRange { buckets } => {
                let Some(driving) = driving else {
                    return false;
                };
                let Some(bucket) = find_bucket(buckets, driving) else {
                    return false;
                };
                match value.as_f64() {
                    Some(v) => v < bucket.filter_min_inclusive || v > bucket.filter_max_inclusive,
                    None => true,
                }
            }
        }
    }

    /// Whether a row of `batch` must be excluded.
    pub fn filters_out(&self, batch: &Batch, row: usize) -> bool {
        if !self.enabled {
            return false;
        }
        let driving = match self.kind {
            FilterKind::BucketedRange { .. } => batch.megapixels(row),
            _ => None,
        };
        self.filters_out_value(batch.value(row, self.field_index), driving)
    }

    pub fn serialize(&self, field: &Field) -> String {
        if !self.enabled {
            return "off".to_string();
        }
        match &self.kind {
            FilterKind::Range { start, end } => {
                format!("{}..{}", format_number(*start), format_number(*end))
            }
            FilterKind::ValueSet { kept } => {
                let mut mask = String::new();
                for chunk in field.unique_values.chunks(4) {
                    let mut digit = 0u32;
                    for (bit, value) in chunk.iter().enumerate() {
                        if kept.contains(value) {
                            digit |= 1 << (3 - bit);
                        }
                    }
                    if let Some(hex) = char::from_digit(digit, 16) {
                        mask.push(hex);
                    }
                }
                mask
            }
            FilterKind::BucketedRange { .. } => "on".to_string(),
        }
    }

    /// Restore the state written by [`FieldFilter::serialize`].
    pub fn unserialize(&mut self, field: &Field, serialized: &str) -> Result<()> {
        let serialized = serialized.trim();
        if serialized == "off" {
            self.enabled = false;
            if !matches!(self.kind, FilterKind::BucketedRange { .. }) {
                self.kind = full_domain(field);
            }
            return Ok(());
        }

        match &mut self.kind {
            FilterKind::Range { start, end } => {
                let (from, to) = serialized.split_once("..").ok_or_else(|| {
                    CodecCompareError::invalid_filter(format!(
                        "expected '<start>..<end>' for {}, got '{}'",
                        field.name, serialized
                    ))
                })?;
                let (Some(from), Some(to)) = (parse_number(from), parse_number(to)) else {
                    return Err(CodecCompareError::invalid_filter(format!(
                        "invalid range bounds for {}: '{}'",
                        field.name, serialized
                    )));
                };
                if from > to {
                    return Err(CodecCompareError::invalid_filter(format!(
                        "range start exceeds end for {}: '{}'",
                        field.name, serialized
                    )));
                }
                *start = from;
                *end = to;
            }
            FilterKind::ValueSet { kept } => {
                let expected_digits = field.unique_values.len().div_ceil(4);
                if serialized.len() != expected_digits {
                    return Err(CodecCompareError::invalid_filter(format!(
                        "expected {} hex digits for {}, got '{}'",
                        expected_digits, field.name, serialized
                    )));
                }
                let mut restored = BTreeSet::new();
                for (chunk, digit) in field.unique_values.chunks(4).zip(serialized.chars()) {
                    let bits = digit.to_digit(16).ok_or_else(|| {
                        CodecCompareError::invalid_filter(format!(
                            "invalid hex digit '{}' for {}",
                            digit, field.name
                        ))
                    })?;
                    for (bit, value) in chunk.iter().enumerate() {
                        if bits & (1 << (3 - bit)) != 0 {
                            restored.insert(value.clone());
                        }
                    }
                }
                *kept = restored;
            }
            FilterKind::BucketedRange { .. } => {
                if serialized != "on" {
                    return Err(CodecCompareError::invalid_filter(format!(
                        "expected 'on' or 'off' for {}, got '{}'",
                        field.name, serialized
                    )));
                }
            }
        }
        self.enabled = true;
        Ok(())
    }

    /// Human-readable summary of the filter.
    pub fn describe(&self, field: &Field) -> String {
        if !self.enabled {
            return format!("{}: any", field.name);
        }
        match &self.kind {
            FilterKind::Range { start, end } => format!(
                "{} in [{}, {}]",
                field.name,
                format_number(*start),
                format_number(*end)
            ),
            FilterKind::ValueSet { kept } => {
                let values: Vec<&str> = field
                    .unique_values
                    .iter()
                    .filter(|v| kept.contains(*v))
                    .map(String::as_str)
                    .collect();
                match values.len() {
                    0 => format!("{} is none", field.name),
                    1 => format!("{} is {}", field.name, values[0]),
                    _ => format!("{} is one of {}", field.name, values.join(", ")),
                }
            }
            FilterKind::BucketedRange { .. } => {
                format!("{} is plausible for JPEG on the web", field.name)
            }
        }
    }

    /// Whether two filters over comparable fields exclude the same points.
    pub fn has_same_effect(&self, field: &Field, other: &FieldFilter, other_field: &Field) -> bool {
        let filters = self.actually_filters_points_out(field);
        if filters != other.actually_filters_points_out(other_field) {
            return false;
        }
        if !filters {
            return true;
        }
        match (&self.kind, &other.kind) {
            (FilterKind::Range { start, end }, FilterKind::Range { start: s, end: e }) => {
                start == s && end == e
            }
            (FilterKind::ValueSet { kept }, FilterKind::ValueSet { kept: k }) => kept == k,
            (FilterKind::BucketedRange { buckets }, FilterKind::BucketedRange { buckets: b }) => {
                buckets == b
            }
            _ => false,
        }
    }
}

fn full_domain(field: &Field) -> FilterKind {
    if field.is_number {
        FilterKind::Range {
            start: field.range_start,
            end: field.range_end,
        }
    } else {
        FilterKind::ValueSet {
            kept: field.unique_values.iter().cloned().collect(),
        }
    }
}

/// A field reconciled across every batch, with one filter shared by all.
#[derive(Debug, Clone)]
pub struct CommonField {
    /// Union of the batches' fields.
    pub field: Field,
    /// Field index in each batch, indexed by batch index.
    pub field_indices: Vec<usize>,
    pub filter: FieldFilter,
}

impl CommonField {
    pub fn field_index_for(&self, batch: &Batch) -> Option<usize> {
        self.field_indices.get(batch.index).copied()
    }

    pub fn filters_out(&self, batch: &Batch, row: usize) -> bool {
        if !self.filter.enabled {
            return false;
        }
        match self.field_index_for(batch) {
            Some(field_index) => self
                .filter
                .filters_out_value(batch.value(row, field_index), None),
            None => false,
        }
    }
}

/// Indices, in row order, of the rows passing every enabled filter of the
/// batch and every enabled common field filter.
pub fn get_filtered_row_indices(
    batch: &Batch,
    filters: &[FieldFilter],
    common_fields: &[CommonField],
) -> Vec<usize> {
    (0..batch.rows.len())
        .filter(|&row| {
            filters.iter().all(|f| !f.filters_out(batch, row))
                && common_fields.iter().all(|c| !c.filters_out(batch, row))
        })
        .collect()
}
