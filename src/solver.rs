//! Solver adapters.
//!
//! The harness only ever sees [`DiagnosticSolver`]; each benchmarked package
//! provides one implementation. Two ship with the crate: the in-process
//! [`crate::ftle::BuiltinFtle`] and [`CommandSolver`], which drives an external
//! toolkit executable.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde_json::Value;

use crate::config::FlowParams;
use crate::error::{BenchError, SolverError};
use crate::field::DiagnosticField;

/// Environment variable naming the external solver toolkit executable.
pub const TOOLKIT_ENV: &str = "FTLE_TOOLKIT_PATH";

/// Integration window: start at `t0`, integrate over `horizon` (negative = backward).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeWindow {
    pub t0: f64,
    pub horizon: f64,
}

impl TimeWindow {
    pub fn new(t0: f64, horizon: f64) -> Self {
        Self { t0, horizon }
    }

    /// Move the window origin by `by`, keeping the horizon.
    pub fn shifted(&self, by: f64) -> Self {
        Self {
            t0: self.t0 + by,
            horizon: self.horizon,
        }
    }
}

/// A package-specific FTLE computation.
///
/// Implementations must be deterministic for identical windows and have no
/// observable side effects besides the returned field.
pub trait DiagnosticSolver {
    /// Name recorded as `benchmark_script` in the result document.
    fn name(&self) -> &str;

    fn compute_diagnostic(&mut self, window: TimeWindow) -> Result<DiagnosticField, SolverError>;
}

impl<S: DiagnosticSolver + ?Sized> DiagnosticSolver for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn compute_diagnostic(&mut self, window: TimeWindow) -> Result<DiagnosticField, SolverError> {
        (**self).compute_diagnostic(window)
    }
}

/// Resolve the toolkit path from an explicit value or [`TOOLKIT_ENV`].
///
/// Absence, or a path that is not an existing file, is an `EnvironmentError`.
pub fn resolve_toolkit(explicit: Option<&Path>) -> Result<PathBuf, BenchError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match env::var_os(TOOLKIT_ENV) {
            Some(v) if !v.is_empty() => PathBuf::from(v),
            _ => {
                return Err(BenchError::environment(format!(
                    "no solver toolkit given; pass --toolkit or set {TOOLKIT_ENV}"
                )))
            }
        },
    };
    if !path.is_file() {
        return Err(BenchError::environment(format!(
            "solver toolkit {} does not exist or is not a file",
            path.display()
        )));
    }
    Ok(path)
}

/// Runs an external executable once per invocation.
///
/// The program is called as
/// `<program> <args...> --t0 <t0> --horizon <T> --flow-data <json>` and must
/// print a JSON field (see [`crate::field`]) on stdout.
#[derive(Debug, Clone)]
pub struct CommandSolver {
    name: String,
    program: PathBuf,
    args: Vec<OsString>,
    flow_data: String,
}

impl CommandSolver {
    pub fn new(program: PathBuf, args: Vec<OsString>, flow: &FlowParams) -> Result<Self, BenchError> {
        if !program.is_file() {
            return Err(BenchError::environment(format!(
                "solver toolkit {} does not exist or is not a file",
                program.display()
            )));
        }
        let name = program
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "command".to_string());
        let flow_data = serde_json::to_string(flow).map_err(|e| BenchError::Serialization {
            reason: "flow_data".to_string(),
            source: Some(e),
        })?;
        Ok(Self {
            name,
            program,
            args,
            flow_data,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl DiagnosticSolver for CommandSolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_diagnostic(&mut self, window: TimeWindow) -> Result<DiagnosticField, SolverError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--t0")
            .arg(window.t0.to_string())
            .arg("--horizon")
            .arg(window.horizon.to_string())
            .arg("--flow-data")
            .arg(&self.flow_data)
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(SolverError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let value: Value =
            serde_json::from_slice(&output.stdout).map_err(|e| SolverError::Decode(e.to_string()))?;
        DiagnosticField::from_json_value(value).map_err(|e| SolverError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shifting_keeps_horizon() {
        let w = TimeWindow::new(1.0, -5.0).shifted(0.5);
        assert_eq!(w, TimeWindow::new(1.5, -5.0));
    }

    #[test]
    fn test_explicit_missing_toolkit_is_environment_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_toolkit(Some(&dir.path().join("missing-solver"))).unwrap_err();
        assert_eq!(err.kind(), "EnvironmentError");

        // A directory is not a usable toolkit either.
        let err = resolve_toolkit(Some(dir.path())).unwrap_err();
        assert_eq!(err.kind(), "EnvironmentError");
    }

    #[test]
    fn test_explicit_existing_toolkit_resolves() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(resolve_toolkit(Some(file.path())).unwrap(), file.path());
    }

    fn flow() -> FlowParams {
        FlowParams {
            t0: 0.0,
            horizon: 1.0,
            dt0: 0.1,
            flow_str: None,
            domain: None,
            grid_shape: None,
            integration_steps: None,
        }
    }

    // Scripts run through /bin/sh so the freshly written file is never exec'd directly.
    fn shell_solver(dir: &Path, body: &str) -> CommandSolver {
        let script = dir.join("fake-solver.sh");
        std::fs::write(&script, body).unwrap();
        CommandSolver::new(PathBuf::from("/bin/sh"), vec![script.into_os_string()], &flow()).unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn test_command_solver_reads_field_from_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let mut solver = shell_solver(dir.path(), "echo '[[1.0, 2.0], [3.0, 4.0]]'\n").with_name("fake");
        assert_eq!(solver.name(), "fake");

        let field = solver.compute_diagnostic(TimeWindow::new(0.0, 1.0)).unwrap();
        assert_eq!(field.shape(), (2, 2));
        assert_eq!(field.get(1, 1), 4.0);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_solver_failure_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let mut solver = shell_solver(dir.path(), "echo 'diverged' >&2\nexit 3\n");
        assert_eq!(solver.name(), "sh");
        match solver.compute_diagnostic(TimeWindow::new(0.0, 1.0)) {
            Err(SolverError::Exit { stderr, .. }) => assert_eq!(stderr, "diverged"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
