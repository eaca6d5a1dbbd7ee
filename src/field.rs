//! Diagnostic fields and reference-field files.
//!
//! A field is an `nx * ny` grid of `f64` stored row-major with `i` (the x index)
//! as the outer index, matching the orientation reference data is produced in.
//!
//! # File formats
//!
//! ```text
//! *.json   nested array [[f64|null; ny]; nx]   (null = NaN)
//!          or an object {"nx": .., "ny": .., "values": [..]}
//! other    bincode-encoded {nx: u64, ny: u64, values: Vec<f64>}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticField {
    nx: usize,
    ny: usize,
    values: Vec<f64>,
}

impl DiagnosticField {
    pub fn new(nx: usize, ny: usize, values: Vec<f64>) -> io::Result<Self> {
        if nx.checked_mul(ny) != Some(values.len()) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("field of shape ({nx}, {ny}) cannot hold {} values", values.len()),
            ));
        }
        Ok(Self { nx, ny, values })
    }

    pub fn filled(nx: usize, ny: usize, value: f64) -> Self {
        Self {
            nx,
            ny,
            values: vec![value; nx * ny],
        }
    }

    /// Build a field from rows of equal length (outer index = x).
    pub fn from_rows(rows: Vec<Vec<f64>>) -> io::Result<Self> {
        let nx = rows.len();
        let ny = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != ny) {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "ragged field rows"));
        }
        Ok(Self {
            nx,
            ny,
            values: rows.into_iter().flatten().collect(),
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.ny + j]
    }

    /// Decode a field from its JSON representation.
    pub fn from_json_value(value: Value) -> io::Result<Self> {
        match value {
            Value::Array(_) => {
                let rows: Vec<Vec<Option<f64>>> = serde_json::from_value(value).map_err(invalid_data)?;
                let rows = rows
                    .into_iter()
                    .map(|r| r.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
                    .collect();
                Self::from_rows(rows)
            }
            Value::Object(_) => {
                #[derive(Deserialize)]
                struct Flat {
                    nx: usize,
                    ny: usize,
                    values: Vec<Option<f64>>,
                }
                let flat: Flat = serde_json::from_value(value).map_err(invalid_data)?;
                let values = flat.values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
                Self::new(flat.nx, flat.ny, values)
            }
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected a nested array or {{nx, ny, values}}, got {other}"),
            )),
        }
    }

    /// JSON nested-array representation; NaN becomes `null`.
    pub fn to_json_value(&self) -> Value {
        let row = |i: usize| {
            Value::Array(
                self.values[i * self.ny..(i + 1) * self.ny]
                    .iter()
                    .map(|v| serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number))
                    .collect(),
            )
        };
        // One entry per x index, so an `nx * 0` field keeps its `nx` empty rows.
        Value::Array((0..self.nx).map(row).collect())
    }
}

fn invalid_data<E: std::error::Error + Send + Sync + 'static>(e: E) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Load a reference field, choosing the format by file extension.
pub fn load_field<P: AsRef<Path>>(path: P) -> io::Result<DiagnosticField> {
    let path = path.as_ref();
    let reader = BufReader::with_capacity(64 * 1024, File::open(path)?);
    let field: DiagnosticField = if is_json(path) {
        let value: Value = serde_json::from_reader(reader).map_err(invalid_data)?;
        DiagnosticField::from_json_value(value)?
    } else {
        bincode::deserialize_from(reader).map_err(invalid_data)?
    };
    // Re-check the invariant for bincode input.
    DiagnosticField::new(field.nx, field.ny, field.values)
}

/// Save a field, choosing the format by file extension.
pub fn save_field<P: AsRef<Path>>(path: P, field: &DiagnosticField) -> io::Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(64 * 1024, file);
    if is_json(path) {
        serde_json::to_writer(&mut writer, &field.to_json_value()).map_err(invalid_data)?;
    } else {
        bincode::serialize_into(&mut writer, field).map_err(invalid_data)?;
    }
    writer.flush()?;
    Ok(())
}
