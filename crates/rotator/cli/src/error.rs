//! CLI error types

use rotator_engine::RotationError;
use rotator_expr::ExprError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Rotation(#[from] RotationError),

    #[error("{0}")]
    Expr(#[from] ExprError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The pass completed but at least one action or evaluation failed
    #[error("Rotation finished with {0} failure(s)")]
    PassFailed(usize),
}

impl From<config::ConfigError> for CliError {
    fn from(e: config::ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl CliError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        CliError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
