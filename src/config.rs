//! Run-configuration loading.
//!
//! A run configuration is a JSON document:
//!
//! ```json
//! {
//!   "flow_data": { "t0": 0.0, "T": 10.0, "dt0": 0.1, "flow_str": "double_gyre" },
//!   "output_json_path": "results/double_gyre.json",
//!   "iterates_per_run": 10,
//!   "num_benchmark_runs": 3,
//!   "error_data": { "path": "ref/double_gyre.json", "t0": 0.0, "error_params": {} },
//!   "metadata": { "package_name": "builtin", "case_description": "double gyre 201x101" }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BenchError, ConfigError};
use crate::solver::TimeWindow;

/// Flow timing parameters plus the optional grid description used by the builtin solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowParams {
    pub t0: f64,
    #[serde(rename = "T")]
    pub horizon: f64,
    pub dt0: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_str: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<[[f64; 2]; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_shape: Option<[usize; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_steps: Option<usize>,
}

/// Reference data used to validate the warm-up field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    pub path: PathBuf,
    pub t0: f64,
    pub error_params: Value,
}

impl ErrorData {
    /// Interpret the raw `error_data` value. `null` and `{}` mean "no validation".
    pub fn from_value(value: Option<Value>) -> Result<Option<Self>, BenchError> {
        let value = match value {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Object(map)) if map.is_empty() => return Ok(None),
            Some(v @ Value::Object(_)) => v,
            Some(other) => {
                return Err(BenchError::validation_config(format!(
                    "expected an object with `path`, `t0` and `error_params`, got {other}"
                )))
            }
        };

        let data: ErrorData = serde_json::from_value(value)
            .map_err(|e| BenchError::validation_config(e.to_string()))?;
        if !data.t0.is_finite() {
            return Err(BenchError::validation_config("`t0` must be finite"));
        }
        Ok(Some(data))
    }
}

#[derive(Debug, Deserialize)]
struct RawRunConfig {
    flow_data: FlowParams,
    output_json_path: PathBuf,
    iterates_per_run: i64,
    num_benchmark_runs: i64,
    #[serde(default)]
    error_data: Option<Value>,
    #[serde(default = "empty_object")]
    metadata: Value,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

/// Immutable configuration for a single benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub flow_params: FlowParams,
    pub output_path: PathBuf,
    pub iterates_per_run: u32,
    pub num_benchmark_runs: u32,
    pub error_data: Option<ErrorData>,
    pub metadata: Value,
}

impl RunConfig {
    /// Load a configuration document from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, BenchError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents, &path.display().to_string())
    }

    /// Parse a configuration document held in memory. `origin` names it in errors.
    pub fn from_json_str(json: &str, origin: &str) -> Result<Self, BenchError> {
        let raw: RawRunConfig = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawRunConfig) -> Result<Self, BenchError> {
        let flow = &raw.flow_data;
        for (field, value) in [("flow_data.t0", flow.t0), ("flow_data.T", flow.horizon), ("flow_data.dt0", flow.dt0)] {
            if !value.is_finite() {
                return Err(ConfigError::invalid(field, format!("must be finite, got {value}")).into());
            }
        }

        let num_benchmark_runs = positive_count("num_benchmark_runs", raw.num_benchmark_runs)?;
        let iterates_per_run = positive_count("iterates_per_run", raw.iterates_per_run)?;

        if raw.output_json_path.as_os_str().is_empty() {
            return Err(ConfigError::invalid("output_json_path", "must not be empty").into());
        }

        let error_data = ErrorData::from_value(raw.error_data)?;

        Ok(RunConfig {
            flow_params: raw.flow_data,
            output_path: raw.output_json_path,
            iterates_per_run,
            num_benchmark_runs,
            error_data,
            metadata: raw.metadata,
        })
    }

    /// Window of the first iterate of every outer run.
    pub fn base_window(&self) -> TimeWindow {
        TimeWindow::new(self.flow_params.t0, self.flow_params.horizon)
    }

    /// Window used by the warm-up call: the reference origin when validating.
    pub fn warmup_window(&self) -> TimeWindow {
        match &self.error_data {
            Some(data) => TimeWindow::new(data.t0, self.flow_params.horizon),
            None => self.base_window(),
        }
    }

    /// Free-form metadata string, if present.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

fn positive_count(field: &'static str, value: i64) -> Result<u32, ConfigError> {
    if value < 1 {
        return Err(ConfigError::invalid(field, format!("must be at least 1, got {value}")));
    }
    u32::try_from(value).map_err(|_| ConfigError::invalid(field, format!("is too large: {value}")))
}
