//! Loading of batch JSON files

use crate::batch::Batch;
use crate::error::{CodecCompareError, Result};
use crate::field::{Constant, Field};
use crate::progress::ProgressReporter;
use log::info;
use rayon::prelude::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct Description {
    name: String,
    #[serde(default)]
    description: String,
}

/// On-disk layout of one batch.
#[derive(Debug, Deserialize)]
struct BatchFile {
    #[serde(default)]
    constant_descriptions: Vec<Description>,
    #[serde(default)]
    constant_values: Vec<serde_json::Value>,
    field_descriptions: Vec<Description>,
    #[serde(default)]
    field_values: Vec<Vec<serde_json::Value>>,
}

/// Cell content as a string, the way it would have been written in text.
fn raw_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Build a batch from JSON text. `default_name` is used when no constant
/// names the batch.
pub fn parse_batch(json: &str, index: usize, default_name: &str) -> Result<Batch> {
    let file: BatchFile = serde_json::from_str(json)?;

    if file.constant_values.len() != file.constant_descriptions.len() {
        return Err(CodecCompareError::invalid_batch(
            default_name,
            format!(
                "{} constant values for {} constant descriptions",
                file.constant_values.len(),
                file.constant_descriptions.len()
            ),
        ));
    }

    let constants = file
        .constant_descriptions
        .into_iter()
        .zip(&file.constant_values)
        .map(|(d, v)| Constant::new(d.name, d.description, raw_cell(v)))
        .collect();
    let fields = file
        .field_descriptions
        .into_iter()
        .map(|d| Field::new(d.name, d.description))
        .collect();
    let rows = file
        .field_values
        .iter()
        .map(|row| row.iter().map(raw_cell).collect())
        .collect();

    Batch::from_raw(index, default_name, constants, fields, rows)
}

/// Load the batch stored at `path`.
pub fn load_batch(path: &Path, index: usize) -> Result<Batch> {
    if !path.is_file() {
        return Err(CodecCompareError::invalid_input(format!(
            "File not found: {}",
            path.display()
        )));
    }
    let json = std::fs::read_to_string(path)?;
    let default_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let batch = parse_batch(&json, index, &default_name)?;
    info!(
        "Loaded batch '{}' from {} ({} fields, {} rows)",
        batch.name,
        path.display(),
        batch.fields.len(),
        batch.rows.len()
    );
    Ok(batch)
}

/// Load several batches in parallel. Batch indices follow the order of
/// `paths`.
pub fn load_batches(paths: &[PathBuf], progress: &ProgressReporter) -> Result<Vec<Batch>> {
    let batches = paths
        .par_iter()
        .enumerate()
        .map(|(index, path)| {
            let batch = load_batch(path, index);
            progress.inc();
            batch
        })
        .collect::<Result<Vec<_>>>()?;
    progress.finish(&format!("Loaded {} batches", batches.len()));
    Ok(batches)
}
