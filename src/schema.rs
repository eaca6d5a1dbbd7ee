use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub iterates_per_run: u32,
    pub num_benchmark_runs: u32,
}

/// Raw loop timings; the document shape depends on the number of outer runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoopSamples {
    Single { loop_time: f64, per_iter_time: f64 },
    Multi { loop_times: Vec<f64>, per_iter_times: Vec<f64> },
}

impl LoopSamples {
    pub fn loop_times(&self) -> &[f64] {
        match self {
            LoopSamples::Single { loop_time, .. } => std::slice::from_ref(loop_time),
            LoopSamples::Multi { loop_times, .. } => loop_times,
        }
    }

    pub fn per_iter_times(&self) -> &[f64] {
        match self {
            LoopSamples::Single { per_iter_time, .. } => std::slice::from_ref(per_iter_time),
            LoopSamples::Multi { per_iter_times, .. } => per_iter_times,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateTimings {
    pub warmup_time: f64,
    #[serde(flatten)]
    pub samples: LoopSamples,
    pub mean_loop_time: f64,
    pub mean_per_iter_time: f64,
    pub std_loop_times: f64,
    pub std_per_iter_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub mae: f64,
    pub error_params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub benchmark_script: String,
    pub parameters: Parameters,
    pub timings: AggregateTimings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ValidationResult>,
    pub metadata: Value,
}

impl BenchmarkResult {
    /// Every float in the document paired with its JSON path.
    pub fn numeric_fields(&self) -> Vec<(String, f64)> {
        let t = &self.timings;
        let mut out = vec![
            ("timings.warmup_time".to_string(), t.warmup_time),
            ("timings.mean_loop_time".to_string(), t.mean_loop_time),
            ("timings.mean_per_iter_time".to_string(), t.mean_per_iter_time),
            ("timings.std_loop_times".to_string(), t.std_loop_times),
            ("timings.std_per_iter_time".to_string(), t.std_per_iter_time),
        ];
        match &t.samples {
            LoopSamples::Single { loop_time, per_iter_time } => {
                out.push(("timings.loop_time".to_string(), *loop_time));
                out.push(("timings.per_iter_time".to_string(), *per_iter_time));
            }
            LoopSamples::Multi { loop_times, per_iter_times } => {
                out.extend(loop_times.iter().enumerate().map(|(i, v)| (format!("timings.loop_times[{i}]"), *v)));
                out.extend(
                    per_iter_times
                        .iter()
                        .enumerate()
                        .map(|(i, v)| (format!("timings.per_iter_times[{i}]"), *v)),
                );
            }
        }
        if let Some(err) = &self.error {
            out.push(("error.mae".to_string(), err.mae));
        }
        out
    }
}
