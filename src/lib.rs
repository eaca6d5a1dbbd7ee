use clap::ValueEnum;

pub mod config;
pub mod error;
pub mod field;
pub mod flows;
pub mod ftle;
pub mod harness;
pub mod schema;
pub mod solver;
pub mod stats;
pub mod validation;
pub mod writer;

pub use config::RunConfig;
pub use error::{BenchError, ConfigError, SolverError};
pub use schema::BenchmarkResult;
pub use solver::{DiagnosticSolver, TimeWindow};

/// Solver adapter to benchmark.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum SolverKind {
    /// In-process RK4 + Cauchy-Green FTLE over an analytic flow.
    #[default]
    Builtin,
    /// External toolkit executable (`--toolkit` or `FTLE_TOOLKIT_PATH`).
    Command,
}

/// Run the benchmark and write the result document to `cfg.output_path`.
///
/// Nothing is written if any phase fails.
pub fn run_and_write<S: DiagnosticSolver + ?Sized>(cfg: &RunConfig, solver: &mut S) -> Result<BenchmarkResult, BenchError> {
    let result = harness::run_benchmark(cfg, solver)?;
    writer::write_result(&cfg.output_path, &result)?;
    Ok(result)
}
