//! Typed columns and constants of a batch

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Known meaning of a field or constant, recognised from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldId {
    Codec,
    Version,
    Time,
    BatchName,
    SourceImageName,
    SourceImagePath,
    PreviewPath,
    EncodedPath,
    Width,
    Height,
    FrameCount,
    EncodedSize,
    Bpp,
    Effort,
    Quality,
    ChromaSubsampling,
    EncodingDuration,
    DecodingDuration,
    RawDecodingDuration,
    Psnr,
    Ssim,
    Dssim,
    Ssimulacra,
    Ssimulacra2,
    Butteraugli,
    Custom,
}

impl FieldId {
    /// Recognise a known identifier from a column or constant name.
    ///
    /// Matching is case-insensitive and treats spaces and dashes as
    /// underscores. Anything unrecognised is `Custom`.
    pub fn from_name(name: &str) -> Self {
        let normalized: String = name
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();

        match normalized.as_str() {
            "encoder" | "codec" | "encoder_name" | "codec_name" => Self::Codec,
            "version" | "encoder_version" | "codec_version" => Self::Version,
            "time" | "date" | "timestamp" => Self::Time,
            "name" | "batch" | "batch_name" => Self::BatchName,
            "original_name" | "source_image" | "source_image_name" | "source_name"
            | "image_name" => Self::SourceImageName,
            "original_path" | "source_image_path" | "source_path" => Self::SourceImagePath,
            "preview_path" | "preview" => Self::PreviewPath,
            "encoded_path" => Self::EncodedPath,
            "width" | "original_width" => Self::Width,
            "height" | "original_height" => Self::Height,
            "frame_count" | "frames" | "original_frame_count" => Self::FrameCount,
            "encoded_size" | "size" | "file_size" => Self::EncodedSize,
            "bpp" | "bits_per_pixel" => Self::Bpp,
            "effort" | "speed" => Self::Effort,
            "quality" | "quality_setting" => Self::Quality,
            "chroma_subsampling" | "subsampling" => Self::ChromaSubsampling,
            "encoding_duration" | "encoding_time" | "encode_duration" => Self::EncodingDuration,
            "decoding_duration" | "decoding_time" | "decode_duration" => Self::DecodingDuration,
            "raw_decoding_duration" => Self::RawDecodingDuration,
            "psnr" => Self::Psnr,
            "ssim" => Self::Ssim,
            "dssim" => Self::Dssim,
            "ssimulacra" => Self::Ssimulacra,
            "ssimulacra2" => Self::Ssimulacra2,
            "butteraugli" => Self::Butteraugli,
            _ => Self::Custom,
        }
    }

    /// Name used for fields created by the tool itself.
    pub fn default_name(self) -> &'static str {
        match self {
            Self::Codec => "encoder",
            Self::Version => "version",
            Self::Time => "time",
            Self::BatchName => "name",
            Self::SourceImageName => "original_name",
            Self::SourceImagePath => "original_path",
            Self::PreviewPath => "preview_path",
            Self::EncodedPath => "encoded_path",
            Self::Width => "width",
            Self::Height => "height",
            Self::FrameCount => "frame_count",
            Self::EncodedSize => "encoded_size",
            Self::Bpp => "bpp",
            Self::Effort => "effort",
            Self::Quality => "quality",
            Self::ChromaSubsampling => "chroma_subsampling",
            Self::EncodingDuration => "encoding_duration",
            Self::DecodingDuration => "decoding_duration",
            Self::RawDecodingDuration => "raw_decoding_duration",
            Self::Psnr => "psnr",
            Self::Ssim => "ssim",
            Self::Dssim => "dssim",
            Self::Ssimulacra => "ssimulacra",
            Self::Ssimulacra2 => "ssimulacra2",
            Self::Butteraugli => "butteraugli",
            Self::Custom => "custom",
        }
    }

    /// Distortion or similarity scores computed on the decoded image.
    pub fn is_quality_metric(self) -> bool {
        matches!(
            self,
            Self::Psnr
                | Self::Ssim
                | Self::Dssim
                | Self::Ssimulacra
                | Self::Ssimulacra2
                | Self::Butteraugli
        )
    }
}

/// Fields and constants designate the same thing if they share a known
/// identifier, or if both are custom and their names are equal ignoring case.
pub fn are_comparable(id_a: FieldId, name_a: &str, id_b: FieldId, name_b: &str) -> bool {
    if id_a != id_b {
        return false;
    }
    if id_a != FieldId::Custom {
        return true;
    }
    name_a.to_lowercase() == name_b.to_lowercase()
}

/// Parse a raw string as a finite number.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Canonical string form of a number, used as unique value and bucket key.
/// Negative zero is written as `0` so that it keys like `0.0`.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return 0.0f64.to_string();
    }
    value.to_string()
}

/// One cell of a batch row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// String form matching the owning field's unique values.
    pub fn key(&self) -> String {
        match self {
            Self::Number(v) => format_number(*v),
            Self::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{}", format_number(*v)),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A typed column descriptor built by folding over the raw column values.
#[derive(Debug, Clone, Serialize)]
pub struct Field {
    pub id: FieldId,
    pub name: String,
    pub description: String,
    pub is_number: bool,
    pub is_integer: bool,
    pub range_start: f64,
    pub range_end: f64,
    /// Infinite until a non-zero number is seen.
    pub smallest_absolute_non_zero: f64,
    /// Sorted once the field is finalized.
    pub unique_values: Vec<String>,
    #[serde(skip)]
    unique_values_set: HashSet<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: FieldId::from_name(&name),
            name,
            description: description.into(),
            is_number: false,
            is_integer: false,
            range_start: 0.0,
            range_end: 0.0,
            smallest_absolute_non_zero: f64::INFINITY,
            unique_values: Vec::new(),
            unique_values_set: HashSet::new(),
        }
    }

    /// Build and finalize a field from raw values in one go.
    pub fn from_raw_values<S: AsRef<str>>(name: impl Into<String>, values: &[S]) -> Self {
        let mut field = Self::new(name, "");
        for value in values {
            field.add_value(value.as_ref());
        }
        field.finalize();
        field
    }

    /// Register a raw value of this column.
    pub fn add_value(&mut self, raw: &str) {
        if !self.unique_values_set.insert(raw.to_string()) {
            return;
        }
        let parsed = parse_number(raw);

        if self.unique_values_set.len() == 1 {
            match parsed {
                Some(value) => {
                    self.is_number = true;
                    self.range_start = value;
                    self.range_end = value;
                    self.track_non_zero(value);
                }
                None => self.is_number = false,
            }
        } else if self.is_number {
            match parsed {
                Some(value) => {
                    self.range_start = self.range_start.min(value);
                    self.range_end = self.range_end.max(value);
                    self.track_non_zero(value);
                }
                None => {
                    self.is_number = false;
                    self.range_start = 0.0;
                    self.range_end = 0.0;
                    self.smallest_absolute_non_zero = f64::INFINITY;
                }
            }
        }
    }

    fn track_non_zero(&mut self, value: f64) {
        if value != 0.0 {
            self.smallest_absolute_non_zero = self.smallest_absolute_non_zero.min(value.abs());
        }
    }

    /// Compute `is_integer` and the sorted unique value list once every value
    /// has been added. Numeric fields are keyed by their canonical number form
    /// from then on.
    pub fn finalize(&mut self) {
        self.is_integer = self.is_number
            && self
                .unique_values_set
                .iter()
                .all(|raw| raw.trim().parse::<i64>().is_ok());

        if self.is_number {
            let mut numbers: Vec<f64> = self
                .unique_values_set
                .iter()
                .filter_map(|raw| parse_number(raw))
                .collect();
            numbers.sort_by(|a, b| a.total_cmp(b));
            numbers.dedup();
            self.unique_values = numbers.into_iter().map(format_number).collect();
        } else {
            let mut values: Vec<String> = self.unique_values_set.iter().cloned().collect();
            values.sort();
            self.unique_values = values;
        }
        self.unique_values_set = self.unique_values.iter().cloned().collect();
    }

    /// Typed cell value for a raw string of this column.
    pub fn coerce(&self, raw: &str) -> Value {
        if self.is_number {
            if let Some(value) = parse_number(raw) {
                return Value::Number(value);
            }
        }
        Value::Text(raw.to_string())
    }

    pub fn contains_value(&self, key: &str) -> bool {
        self.unique_values_set.contains(key)
    }

    pub fn is_comparable(&self, other: &Field) -> bool {
        are_comparable(self.id, &self.name, other.id, &other.name)
    }

    /// Recompute `is_integer` over an externally built value list.
    pub(crate) fn set_unique_values(&mut self, values: Vec<String>) {
        self.is_integer =
            self.is_number && values.iter().all(|raw| raw.trim().parse::<i64>().is_ok());
        self.unique_values_set = values.iter().cloned().collect();
        self.unique_values = values;
    }
}

/// A batch-wide value, optionally depending on the row through `${field}`
/// placeholders.
#[derive(Debug, Clone, Serialize)]
pub struct Constant {
    pub id: FieldId,
    pub name: String,
    pub description: String,
    pub value: String,
    pub is_number: bool,
}

impl Constant {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let value = value.into();
        Self {
            id: FieldId::from_name(&name),
            is_number: parse_number(&value).is_some(),
            name,
            description: description.into(),
            value,
        }
    }

    pub fn is_row_dependent(&self) -> bool {
        self.value.contains("${")
    }

    pub fn is_comparable(&self, other: &Constant) -> bool {
        are_comparable(self.id, &self.name, other.id, &other.name)
    }
}
