//! One experiment dataset: constants, typed fields and rows

use crate::error::{CodecCompareError, Result};
use crate::field::{format_number, Constant, Field, FieldId, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

/// Colors given to batches that do not specify one.
const DEFAULT_COLORS: &[&str] = &[
    "#4285f4", "#ea4335", "#fbbc04", "#34a853", "#ff6d01", "#46bdc6", "#7baaf7", "#f07b72",
];

/// A loaded experiment. Immutable once built, apart from the derived bpp
/// field appended by [`Batch::append_bpp_field`].
#[derive(Debug, Clone, Serialize)]
pub struct Batch {
    /// Position in the owning collection.
    pub index: usize,
    pub name: String,
    pub codec: String,
    pub version: String,
    pub time: Option<DateTime<Utc>>,
    pub constants: Vec<Constant>,
    pub fields: Vec<Field>,
    #[serde(skip)]
    pub rows: Vec<Vec<Value>>,
    pub color: String,
}

impl Batch {
    /// Build a batch from raw string cells.
    ///
    /// Every field is folded over its whole column before the rows are
    /// coerced, so a column is either entirely numeric or entirely text.
    pub fn from_raw(
        index: usize,
        name: impl Into<String>,
        constants: Vec<Constant>,
        fields: Vec<Field>,
        raw_rows: Vec<Vec<String>>,
    ) -> Result<Self> {
        let name = name.into();
        let mut fields = fields;

        for (row_index, row) in raw_rows.iter().enumerate() {
            if row.len() != fields.len() {
                return Err(CodecCompareError::invalid_batch(
                    &name,
                    format!(
                        "row {} has {} values but there are {} fields",
                        row_index,
                        row.len(),
                        fields.len()
                    ),
                ));
            }
            for (field, raw) in fields.iter_mut().zip(row) {
                field.add_value(raw);
            }
        }
        for field in &mut fields {
            field.finalize();
        }

        let rows: Vec<Vec<Value>> = raw_rows
            .iter()
            .map(|row| {
                fields
                    .iter()
                    .zip(row)
                    .map(|(field, raw)| field.coerce(raw))
                    .collect()
            })
            .collect();

        let constant_value = |id: FieldId| {
            constants
                .iter()
                .find(|c| c.id == id && !c.is_row_dependent())
                .map(|c| c.value.clone())
        };
        let codec = constant_value(FieldId::Codec).unwrap_or_else(|| name.clone());
        let version = constant_value(FieldId::Version).unwrap_or_default();
        let time = constant_value(FieldId::Time).and_then(|t| parse_time(&t));
        let display_name = constant_value(FieldId::BatchName).unwrap_or(name);
        let color = constants
            .iter()
            .find(|c| c.id == FieldId::Custom && c.name.eq_ignore_ascii_case("color"))
            .map(|c| c.value.clone())
            .unwrap_or_else(|| DEFAULT_COLORS[index % DEFAULT_COLORS.len()].to_string());

        let mut batch = Self {
            index,
            name: display_name,
            codec,
            version,
            time,
            constants,
            fields,
            rows,
            color,
        };
        batch.append_bpp_field();
        log::debug!(
            "Built batch '{}' with {} fields and {} rows",
            batch.name,
            batch.fields.len(),
            batch.rows.len()
        );
        Ok(batch)
    }

    /// Index of the first field with the given identifier.
    pub fn field_index(&self, id: FieldId) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }

    /// Index of the field designating the same thing as `other`.
    pub fn comparable_field_index(&self, other: &Field) -> Option<usize> {
        self.fields.iter().position(|f| f.is_comparable(other))
    }

    pub fn field_index_by_name(&self, name: &str) -> Option<usize> {
        let probe = Field::new(name, "");
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
            .or_else(|| self.comparable_field_index(&probe))
    }

    pub fn constant(&self, id: FieldId) -> Option<&Constant> {
        self.constants.iter().find(|c| c.id == id)
    }

    pub fn value(&self, row: usize, field: usize) -> &Value {
        &self.rows[row][field]
    }

    /// Value of a constant for one row, with `${field name}` placeholders
    /// replaced by that row's values.
    pub fn constant_value_for_row(&self, constant: &Constant, row: usize) -> String {
        if !constant.is_row_dependent() {
            return constant.value.clone();
        }
        let mut value = constant.value.clone();
        for (field_index, field) in self.fields.iter().enumerate() {
            let placeholder = format!("${{{}}}", field.name);
            if value.contains(&placeholder) {
                value = value.replace(&placeholder, &self.rows[row][field_index].key());
            }
        }
        value
    }

    /// Value of `id` for a row, looked up among fields then constants.
    pub fn row_attribute(&self, id: FieldId, row: usize) -> Option<String> {
        if let Some(field_index) = self.field_index(id) {
            return Some(self.rows[row][field_index].key());
        }
        self.constant(id)
            .map(|constant| self.constant_value_for_row(constant, row))
    }

    /// Image area of a row in millions of pixels.
    pub fn megapixels(&self, row: usize) -> Option<f64> {
        let width = self.numeric_value(FieldId::Width, row)?;
        let height = self.numeric_value(FieldId::Height, row)?;
        Some(width * height / 1_000_000.0)
    }

    fn numeric_value(&self, id: FieldId, row: usize) -> Option<f64> {
        let field_index = self.field_index(id)?;
        self.rows[row][field_index].as_f64()
    }

    /// Append a bits-per-pixel field computed from the encoded size and the
    /// image dimensions, unless one exists or it cannot be derived for every
    /// row. Returns whether the field was added.
    pub fn append_bpp_field(&mut self) -> bool {
        if self.field_index(FieldId::Bpp).is_some() {
            return false;
        }
        let (Some(size), Some(width), Some(height)) = (
            self.numeric_field_index(FieldId::EncodedSize),
            self.numeric_field_index(FieldId::Width),
            self.numeric_field_index(FieldId::Height),
        ) else {
            return false;
        };
        let frames = self.numeric_field_index(FieldId::FrameCount);

        let mut values = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let (Some(size), Some(width), Some(height)) =
                (row[size].as_f64(), row[width].as_f64(), row[height].as_f64())
            else {
                return false;
            };
            let frame_count = frames.and_then(|f| row[f].as_f64()).unwrap_or(1.0);
            let bpp = size * 8.0 / (width * height * frame_count);
            if !bpp.is_finite() {
                log::debug!("Cannot derive bpp for batch '{}': degenerate image size", self.name);
                return false;
            }
            values.push(bpp);
        }

        let mut field = Field::new(FieldId::Bpp.default_name(), "bits per pixel");
        for value in &values {
            field.add_value(&format_number(*value));
        }
        field.finalize();
        self.fields.push(field);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(Value::Number(value));
        }
        true
    }

    fn numeric_field_index(&self, id: FieldId) -> Option<usize> {
        self.field_index(id).filter(|&i| self.fields[i].is_number)
    }
}

/// Parse the batch time constant in a few common layouts.
pub fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.with_timezone(&Utc));
    }
    if let Ok(time) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(time.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|time| time.and_utc())
}
