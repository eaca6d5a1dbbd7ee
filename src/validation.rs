//! Accuracy check of a computed field against a reference field.

use crate::error::BenchError;
use crate::field::DiagnosticField;

/// Width of the border excluded from comparison on every side.
pub const BORDER: usize = 1;

/// Mean absolute error over the border-trimmed interior.
///
/// Only pairs where both values are finite count toward the sum and the
/// denominator. Fields must share a shape; no regridding is attempted.
pub fn interior_mae(reference: &DiagnosticField, computed: &DiagnosticField) -> Result<f64, BenchError> {
    if reference.shape() != computed.shape() {
        return Err(BenchError::validation_config(format!(
            "reference field shape {:?} does not match computed field shape {:?}",
            reference.shape(),
            computed.shape()
        )));
    }

    let (nx, ny) = reference.shape();
    let mut sum = 0.0;
    let mut count = 0usize;
    for i in BORDER..nx.saturating_sub(BORDER) {
        for j in BORDER..ny.saturating_sub(BORDER) {
            let (r, c) = (reference.get(i, j), computed.get(i, j));
            if r.is_finite() && c.is_finite() {
                sum += (r - c).abs();
                count += 1;
            }
        }
    }

    if count == 0 {
        return Err(BenchError::validation_config(format!(
            "no comparable interior entries in a ({nx}, {ny}) field"
        )));
    }
    Ok(sum / count as f64)
}
