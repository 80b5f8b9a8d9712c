//! Error types for rotation

use rotator_expr::ExprError;
use serde::Serialize;
use thiserror::Error;

/// Failures reported by the backing filter service
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ServiceError {
    /// A service quota was hit, e.g. too many filters pending creation
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("Request throttled: {0}")]
    Throttled(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// Result type for filter service calls
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failures that abort a whole rotation pass
#[derive(Debug, Error)]
pub enum RotationError {
    /// Without a target name there is nothing to decide
    #[error("Failed to resolve current filter name: {0}")]
    CurrentName(#[source] ExprError),

    #[error("Failed to list filters: {0}")]
    Inventory(#[source] ServiceError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for rotation operations
pub type RotationResult<T> = Result<T, RotationError>;
