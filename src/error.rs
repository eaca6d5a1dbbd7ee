use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn a run-configuration document into a [`crate::config::RunConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read run configuration {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed run configuration ({origin}): {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid run configuration: `{field}` {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid<T: Into<String>>(field: &'static str, reason: T) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Failure inside a single solver invocation.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("process exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("could not decode diagnostic field: {0}")]
    Decode(String),

    #[error("{0}")]
    Failed(String),
}

/// Top-level error surfaced by every fallible benchmark operation.
///
/// All variants are fatal: the run aborts and no result document is written.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("solver environment: {0}")]
    Environment(String),

    #[error("malformed error_data: {0}")]
    ValidationConfig(String),

    #[error("solver `{solver}` failed: {source}")]
    Solver {
        solver: String,
        #[source]
        source: SolverError,
    },

    #[error("failed to write results to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize results: {reason}")]
    Serialization {
        reason: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

impl BenchError {
    pub fn environment<T: Into<String>>(msg: T) -> Self {
        BenchError::Environment(msg.into())
    }

    pub fn validation_config<T: Into<String>>(msg: T) -> Self {
        BenchError::ValidationConfig(msg.into())
    }

    /// Short machine-friendly name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            BenchError::Config(_) => "ConfigError",
            BenchError::Environment(_) => "EnvironmentError",
            BenchError::ValidationConfig(_) => "ValidationConfigError",
            BenchError::Solver { .. } => "SolverError",
            BenchError::Io { .. } => "IOError",
            BenchError::Serialization { .. } => "SerializationError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_convert_and_keep_kind() {
        let err: BenchError = ConfigError::invalid("num_benchmark_runs", "must be at least 1").into();
        assert_eq!(err.kind(), "ConfigError");
        assert_eq!(
            err.to_string(),
            "invalid run configuration: `num_benchmark_runs` must be at least 1"
        );
    }

    #[test]
    fn test_solver_error_names_the_solver() {
        let err = BenchError::Solver {
            solver: "builtin".to_string(),
            source: SolverError::Failed("boom".to_string()),
        };
        assert_eq!(err.kind(), "SolverError");
        assert!(err.to_string().contains("`builtin`"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
