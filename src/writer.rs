use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{error, info};

use crate::error::BenchError;
use crate::schema::BenchmarkResult;

/// Encode `result` as pretty-printed JSON.
///
/// JSON has no representation for NaN or infinity, so any non-finite number is
/// a `SerializationError` naming the field.
pub fn encode_result(result: &BenchmarkResult) -> Result<String, BenchError> {
    if let Some((field, value)) = result.numeric_fields().into_iter().find(|(_, v)| !v.is_finite()) {
        return Err(BenchError::Serialization {
            reason: format!("`{field}` is {value}, which JSON cannot represent"),
            source: None,
        });
    }
    serde_json::to_string_pretty(result).map_err(|e| BenchError::Serialization {
        reason: e.to_string(),
        source: Some(e),
    })
}

/// Write `result` to `path`, creating parent directories and truncating any existing file.
///
/// Nothing is created when encoding fails.
pub fn write_result<P: AsRef<Path>>(path: P, result: &BenchmarkResult) -> Result<(), BenchError> {
    let path = path.as_ref();
    info!(path = %path.display(), "saving results");
    write_result_inner(path, result).inspect_err(|e| error!(path = %path.display(), error = %e, "error saving results"))?;
    info!("results saved");
    Ok(())
}

fn write_result_inner(path: &Path, result: &BenchmarkResult) -> Result<(), BenchError> {
    let json = encode_result(result)?;
    let io_err = |source| BenchError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    writer.write_all(json.as_bytes()).map_err(io_err)?;
    writer.write_all(b"\n").map_err(io_err)?;
    writer.flush().map_err(io_err)?;
    Ok(())
}

/// Read a result document back.
pub fn read_result<P: AsRef<Path>>(path: P) -> Result<BenchmarkResult, BenchError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| BenchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|e| BenchError::Serialization {
        reason: format!("{}: {e}", path.display()),
        source: Some(e),
    })
}
