//! Error types for codec-compare operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodecCompareError>;

#[derive(Error, Debug)]
pub enum CodecCompareError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid batch {name}: {message}")]
    InvalidBatch { name: String, message: String },

    #[error("Batch not found: {name}")]
    BatchNotFound { name: String },

    #[error("Field not found: {name}")]
    FieldNotFound { name: String },

    #[error("Invalid matcher: {message}")]
    InvalidMatcher { message: String },

    #[error("Invalid metric: {message}")]
    InvalidMetric { message: String },

    #[error("Invalid filter: {message}")]
    InvalidFilter { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl CodecCompareError {
    pub fn invalid_batch(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidBatch {
            name: name.into(),
            message: msg.into(),
        }
    }

    pub fn batch_not_found(name: impl Into<String>) -> Self {
        Self::BatchNotFound { name: name.into() }
    }

    pub fn field_not_found(name: impl Into<String>) -> Self {
        Self::FieldNotFound { name: name.into() }
    }

    pub fn invalid_matcher(msg: impl Into<String>) -> Self {
        Self::InvalidMatcher {
            message: msg.into(),
        }
    }

    pub fn invalid_metric(msg: impl Into<String>) -> Self {
        Self::InvalidMetric {
            message: msg.into(),
        }
    }

    pub fn invalid_filter(msg: impl Into<String>) -> Self {
        Self::InvalidFilter {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }
}
