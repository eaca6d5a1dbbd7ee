use clap::{Parser, Subcommand};
use ftle_bench::config::RunConfig;
use ftle_bench::error::BenchError;
use ftle_bench::field;
use ftle_bench::ftle::BuiltinFtle;
use ftle_bench::solver::{self, CommandSolver, DiagnosticSolver};
use ftle_bench::SolverKind;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Subcommand, Debug)]
enum Command {
    /// Warm up, time repeated solver runs and write the JSON result document.
    Run {
        /// Run-configuration JSON file.
        #[arg(long, value_name = "FILE", required_unless_present = "config_json", conflicts_with = "config_json")]
        config: Option<PathBuf>,

        /// Run configuration passed inline as a JSON string.
        #[arg(long, value_name = "JSON")]
        config_json: Option<String>,

        /// Which solver adapter to benchmark.
        #[arg(long, value_enum, default_value_t = SolverKind::Builtin)]
        solver: SolverKind,

        /// External toolkit executable (command solver). Falls back to FTLE_TOOLKIT_PATH.
        #[arg(long, value_name = "PATH")]
        toolkit: Option<PathBuf>,

        /// Extra argument passed to the toolkit before the window flags. Repeatable.
        #[arg(long = "solver-arg", value_name = "ARG", allow_hyphen_values = true, action = clap::ArgAction::Append)]
        solver_args: Vec<OsString>,

        /// Override the benchmark name recorded as `benchmark_script`.
        #[arg(long)]
        name: Option<String>,
    },

    /// Compute a reference field with the builtin solver over the validation window.
    Reference {
        /// Run-configuration JSON file.
        #[arg(long, value_name = "FILE")]
        config: PathBuf,

        /// Output file; `.json` writes nested arrays, anything else bincode.
        #[arg(long, short = 'o', value_name = "FILE")]
        out: PathBuf,
    },
}

#[derive(Parser, Debug)]
#[command(name = "ftle-bench")]
#[command(about = "FTLE solver benchmark runner (JSON output)")]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_solver(
    kind: SolverKind,
    cfg: &RunConfig,
    toolkit: Option<PathBuf>,
    solver_args: Vec<OsString>,
    name: Option<String>,
) -> Result<Box<dyn DiagnosticSolver>, BenchError> {
    match kind {
        SolverKind::Builtin => {
            let mut builtin = BuiltinFtle::from_params(&cfg.flow_params)?;
            if let Some(name) = name {
                builtin = builtin.with_name(name);
            }
            Ok(Box::new(builtin))
        }
        SolverKind::Command => {
            let program = solver::resolve_toolkit(toolkit.as_deref())?;
            let mut command = CommandSolver::new(program, solver_args, &cfg.flow_params)?;
            if let Some(name) = name {
                command = command.with_name(name);
            }
            Ok(Box::new(command))
        }
    }
}

fn run(args: Args) -> Result<(), BenchError> {
    match args.cmd {
        Command::Run {
            config,
            config_json,
            solver,
            toolkit,
            solver_args,
            name,
        } => {
            let cfg = match (config, config_json) {
                (Some(path), _) => RunConfig::load(path)?,
                (None, Some(json)) => RunConfig::from_json_str(&json, "--config-json")?,
                (None, None) => unreachable!("clap requires --config or --config-json"),
            };
            let mut solver = build_solver(solver, &cfg, toolkit, solver_args, name)?;
            let result = ftle_bench::run_and_write(&cfg, &mut solver)?;
            info!(
                mean_loop_time = result.timings.mean_loop_time,
                mean_per_iter_time = result.timings.mean_per_iter_time,
                "--- {} benchmark complete ---",
                result.benchmark_script
            );
        }
        Command::Reference { config, out } => {
            let cfg = RunConfig::load(&config)?;
            let mut builtin = BuiltinFtle::from_params(&cfg.flow_params)?;
            let window = cfg.warmup_window();
            info!(t0 = window.t0, horizon = window.horizon, "computing reference field");

            let reference = builtin
                .compute_diagnostic(window)
                .map_err(|source| BenchError::Solver {
                    solver: builtin.name().to_string(),
                    source,
                })?;
            field::save_field(&out, &reference).map_err(|source| BenchError::Io {
                path: out.clone(),
                source,
            })?;
            let (nx, ny) = reference.shape();
            info!(nx, ny, path = %out.display(), "reference field saved");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Display already embeds the underlying cause.
            error!(kind = e.kind(), "benchmark FAILED: {e}");
            ExitCode::FAILURE
        }
    }
}
