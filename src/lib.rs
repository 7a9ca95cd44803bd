//! # codec-compare
//!
//! Row matching and metric aggregation for image codec benchmark batches.
//! Rows of each batch are paired with rows of a reference batch on
//! user-chosen fields, then numeric fields are compared over the pairs.

pub mod accumulators;
pub mod aggregation;
pub mod batch;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod field;
pub mod filter;
pub mod loader;
pub mod matcher;
pub mod metric;
pub mod output;
pub mod progress;
pub mod selection;
pub mod state;

pub use aggregation::{create_groups, merge_batches, merge_batches_with_same_codec};
pub use batch::Batch;
pub use error::{CodecCompareError, Result};
pub use field::{Field, FieldId, Value};
pub use filter::{get_filtered_row_indices, FieldFilter};
pub use matcher::{find_match, get_data_points, get_data_points_symmetric, FieldMatcher, MatchedDataPoints};
pub use metric::{compute_histogram, compute_stats, FieldMetric, FieldMetricStats};
pub use selection::BatchSelection;
pub use state::{ComparisonState, StateCommand};
