//! Warm-up, optional validation, timed repetition and aggregation.
//!
//! Phases run strictly in order on the calling thread:
//!
//! 1. warm-up: one untimed-for-statistics call, validated against reference data
//!    when `error_data` is configured;
//! 2. `num_benchmark_runs` outer runs, each timing `iterates_per_run` calls whose
//!    windows advance by `dt0`;
//! 3. aggregation into a [`BenchmarkResult`].
//!
//! Any solver failure aborts the run; no partial result is produced.

use std::hint::black_box;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::{ErrorData, RunConfig};
use crate::error::{BenchError, SolverError};
use crate::field::{self, DiagnosticField};
use crate::schema::{BenchmarkResult, Parameters, ValidationResult};
use crate::solver::{DiagnosticSolver, TimeWindow};
use crate::stats;
use crate::validation;

#[derive(Clone, Debug)]
pub struct Measured {
    pub iters: u32,
    pub elapsed: Duration,
}

impl Measured {
    pub fn secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Time `iters` sequential calls of `f(k)` for `k` in `0..iters`, stopping at the first error.
pub fn measure_fn<T, E>(iters: u32, mut f: impl FnMut(u32) -> Result<T, E>) -> Result<Measured, E> {
    let start = Instant::now();
    for k in 0..iters {
        black_box(f(k)?);
    }
    let elapsed = start.elapsed();
    Ok(Measured { iters, elapsed })
}

struct Warmup {
    secs: f64,
    validation: Option<ValidationResult>,
}

fn invoke<S: DiagnosticSolver + ?Sized>(solver: &mut S, window: TimeWindow) -> Result<DiagnosticField, BenchError> {
    match solver.compute_diagnostic(window) {
        Ok(field) => Ok(field),
        Err(source) => Err(solver_failure(solver, source)),
    }
}

fn solver_failure<S: DiagnosticSolver + ?Sized>(solver: &S, source: SolverError) -> BenchError {
    BenchError::Solver {
        solver: solver.name().to_string(),
        source,
    }
}

fn load_reference(data: &ErrorData) -> Result<DiagnosticField, BenchError> {
    field::load_field(&data.path).map_err(|e| {
        BenchError::validation_config(format!("cannot load reference field {}: {e}", data.path.display()))
    })
}

fn warm_up<S: DiagnosticSolver + ?Sized>(cfg: &RunConfig, solver: &mut S) -> Result<Warmup, BenchError> {
    info!("starting warm-up");
    let window = cfg.warmup_window();

    let warmup = match &cfg.error_data {
        None => {
            let m = measure_fn(1, |_| invoke(solver, window))?;
            Warmup {
                secs: m.secs(),
                validation: None,
            }
        }
        Some(data) => {
            // Reference I/O happens before the timer starts.
            let reference = load_reference(data)?;
            let start = Instant::now();
            let computed = invoke(solver, window)?;
            let secs = start.elapsed().as_secs_f64();

            let mae = validation::interior_mae(&reference, &computed)?;
            info!(mae, reference = %data.path.display(), "validation complete");
            Warmup {
                secs,
                validation: Some(ValidationResult {
                    mae,
                    error_params: data.error_params.clone(),
                }),
            }
        }
    };
    info!("warm-up completed, took {:.5} seconds", warmup.secs);
    Ok(warmup)
}

/// One outer run: `iterates_per_run` calls, iterate `k` shifted by `k * dt0`.
fn timed_run<S: DiagnosticSolver + ?Sized>(cfg: &RunConfig, solver: &mut S) -> Result<Measured, BenchError> {
    let base = cfg.base_window();
    let dt0 = cfg.flow_params.dt0;
    debug!(t0 = base.t0, horizon = base.horizon, dt0, iterates = cfg.iterates_per_run, "timed run windows");
    measure_fn(cfg.iterates_per_run, |k| invoke(solver, base.shifted(f64::from(k) * dt0)))
}

/// Run the full benchmark protocol for one configuration.
///
/// `num_benchmark_runs >= 1` and `iterates_per_run >= 1` are guaranteed by
/// [`RunConfig`]; a single run takes the same timing path as many.
pub fn run_benchmark<S: DiagnosticSolver + ?Sized>(cfg: &RunConfig, solver: &mut S) -> Result<BenchmarkResult, BenchError> {
    let package = cfg.metadata_str("package_name").unwrap_or_else(|| solver.name());
    let case = cfg.metadata_str("case_description").unwrap_or("-");
    info!(
        iterates_per_run = cfg.iterates_per_run,
        num_benchmark_runs = cfg.num_benchmark_runs,
        output = %cfg.output_path.display(),
        "--- {package} benchmark: {case} ---"
    );

    let warmup = warm_up(cfg, solver)?;

    let runs = cfg.num_benchmark_runs;
    let mut loop_times = Vec::with_capacity(runs as usize);
    for i in 1..=runs {
        info!("starting benchmark run {i} of {runs}");
        let m = timed_run(cfg, solver)?;
        info!(iterates = m.iters, "benchmark run {i} of {runs} completed, took {:.5} seconds", m.secs());
        loop_times.push(m.secs());
    }

    let timings = stats::summarize(warmup.secs, loop_times, cfg.iterates_per_run);

    Ok(BenchmarkResult {
        benchmark_script: solver.name().to_string(),
        parameters: Parameters {
            iterates_per_run: cfg.iterates_per_run,
            num_benchmark_runs: cfg.num_benchmark_runs,
        },
        timings,
        error: warmup.validation,
        metadata: cfg.metadata.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Records every window it is asked for; optionally fails on the n-th call.
    struct Recorder {
        windows: Vec<TimeWindow>,
        fail_on: Option<usize>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                windows: Vec::new(),
                fail_on: None,
            }
        }
    }

    impl DiagnosticSolver for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn compute_diagnostic(&mut self, window: TimeWindow) -> Result<DiagnosticField, SolverError> {
            self.windows.push(window);
            if self.fail_on == Some(self.windows.len()) {
                return Err(SolverError::Failed("diverged".to_string()));
            }
            Ok(DiagnosticField::filled(3, 3, window.t0))
        }
    }

    fn config(iterates: u32, runs: u32) -> RunConfig {
        RunConfig::from_json_str(
            &json!({
                "flow_data": {"t0": 1.0, "T": 4.0, "dt0": 0.5},
                "output_json_path": "unused.json",
                "iterates_per_run": iterates,
                "num_benchmark_runs": runs,
                "metadata": {"case_id": "unit"}
            })
            .to_string(),
            "unit",
        )
        .unwrap()
    }

    #[test]
    fn test_measure_fn_counts_every_call() {
        let mut seen = Vec::new();
        let m = measure_fn(4, |k| {
            seen.push(k);
            Ok::<_, ()>(k)
        })
        .unwrap();
        assert_eq!(m.iters, 4);
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert!(m.secs() >= 0.0);
    }

    #[test]
    fn test_measure_fn_stops_at_first_error() {
        let mut calls = 0;
        let res = measure_fn(10, |k| {
            calls += 1;
            if k == 3 {
                Err("stop")
            } else {
                Ok(k)
            }
        });
        assert_eq!(res.unwrap_err(), "stop");
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_iterate_windows_restart_every_outer_run() {
        let cfg = config(3, 2);
        let mut solver = Recorder::new();
        let result = run_benchmark(&cfg, &mut solver).unwrap();

        let starts: Vec<f64> = solver.windows.iter().map(|w| w.t0).collect();
        // warm-up, then two runs of three iterates
        assert_eq!(starts, vec![1.0, 1.0, 1.5, 2.0, 1.0, 1.5, 2.0]);
        assert!(solver.windows.iter().all(|w| w.horizon == 4.0));

        assert_eq!(result.benchmark_script, "recorder");
        assert_eq!(result.timings.samples.loop_times().len(), 2);
        assert_eq!(result.metadata, json!({"case_id": "unit"}));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_solver_failure_aborts_the_run() {
        let cfg = config(5, 3);
        let mut solver = Recorder::new();
        solver.fail_on = Some(4);

        let err = run_benchmark(&cfg, &mut solver).unwrap_err();
        assert_eq!(err.kind(), "SolverError");
        assert_eq!(solver.windows.len(), 4);
    }

    #[test]
    fn test_missing_reference_fails_before_any_solver_call() {
        let mut cfg = config(1, 1);
        cfg.error_data = Some(ErrorData {
            path: "/nonexistent/reference.bin".into(),
            t0: 0.0,
            error_params: json!({}),
        });
        let mut solver = Recorder::new();

        let err = run_benchmark(&cfg, &mut solver).unwrap_err();
        assert_eq!(err.kind(), "ValidationConfigError");
        assert!(solver.windows.is_empty());
    }

    #[test]
    fn test_warmup_uses_reference_origin_when_validating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.json");
        field::save_field(&path, &DiagnosticField::filled(3, 3, 7.5)).unwrap();

        let mut cfg = config(2, 1);
        cfg.error_data = Some(ErrorData {
            path,
            t0: 7.0,
            error_params: json!({"note": "shifted"}),
        });
        let mut solver = Recorder::new();
        let result = run_benchmark(&cfg, &mut solver).unwrap();

        assert_eq!(solver.windows[0], TimeWindow::new(7.0, 4.0));
        assert_eq!(solver.windows[1], TimeWindow::new(1.0, 4.0));
        // Interior of the 3x3 recorder field is the single cell with value 7.0.
        let error = result.error.unwrap();
        assert_eq!(error.mae, 0.5);
        assert_eq!(error.error_params, json!({"note": "shifted"}));
    }
}
