//! Command-line interface for codec-compare

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "codec-compare")]
#[command(about = "Compare image codec benchmark batches row by row")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Match batches against a reference and aggregate metrics
    Compare {
        /// Batch JSON files
        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,

        /// Name of the reference batch (defaults to the first one)
        #[arg(long)]
        reference: Option<String>,

        /// Comparison settings file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Match rows on FIELD, optionally within a relative tolerance (e.g. "quality=0.1").
        /// Replaces the default matchers when given.
        #[arg(long = "match", value_name = "FIELD[=TOL]")]
        matchers: Vec<String>,

        /// Aggregate FIELD. Replaces the default metrics when given.
        #[arg(long = "metric", value_name = "FIELD")]
        metrics: Vec<String>,

        /// Filter a batch field with its serialized form (e.g. "jxl:effort=3..7")
        #[arg(long = "filter", value_name = "BATCH:FIELD=FORM")]
        filters: Vec<String>,

        /// Merge batches sharing codec and version
        #[arg(long)]
        merge: bool,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Show batch information
    Show {
        /// Batch JSON file
        file: PathBuf,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },
}

/// Parse output format string
#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}

/// Matcher given on the command line as `FIELD` or `FIELD=TOLERANCE`
#[derive(Debug, Clone, PartialEq)]
pub struct MatcherArg {
    pub field: String,
    pub tolerance: f64,
}

impl MatcherArg {
    pub fn parse(s: &str) -> Result<Self, String> {
        let (field, tolerance) = match s.rsplit_once('=') {
            Some((field, tolerance)) => {
                let tolerance: f64 = tolerance
                    .trim()
                    .parse()
                    .map_err(|_| format!("Invalid tolerance in '{}'", s))?;
                (field, tolerance)
            }
            None => (s, 0.0),
        };
        let field = field.trim();
        if field.is_empty() {
            return Err(format!("Missing field name in '{}'", s));
        }
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(format!("Tolerance must be a non-negative number: {}", tolerance));
        }
        Ok(Self {
            field: field.to_string(),
            tolerance,
        })
    }
}

/// Filter given on the command line as `BATCH:FIELD=FORM`
#[derive(Debug, Clone, PartialEq)]
pub struct FilterArg {
    pub batch: String,
    pub field: String,
    pub serialized: String,
}

impl FilterArg {
    pub fn parse(s: &str) -> Result<Self, String> {
        let (batch, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid filter '{}'. Use BATCH:FIELD=FORM", s))?;
        let (field, serialized) = rest
            .split_once('=')
            .ok_or_else(|| format!("Invalid filter '{}'. Use BATCH:FIELD=FORM", s))?;
        if batch.trim().is_empty() || field.trim().is_empty() {
            return Err(format!("Invalid filter '{}'. Use BATCH:FIELD=FORM", s));
        }
        Ok(Self {
            batch: batch.trim().to_string(),
            field: field.trim().to_string(),
            serialized: serialized.trim().to_string(),
        })
    }
}
