//! Expression and template error types

use serde::Serialize;

/// Errors raised while parsing or evaluating expressions and templates
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExprError {
    /// Malformed expression text
    #[error("Syntax error at line {line}, column {col}: {message}")]
    Syntax {
        line: usize,
        col: usize,
        message: String,
    },

    /// Identifier not bound in the context or the function library
    #[error("Name not defined: '{name}'")]
    Name { name: String },

    /// Type mismatch, bad arithmetic or malformed function call
    #[error("Evaluation error in '{expression}': {message}")]
    Evaluation { expression: String, message: String },

    /// Unparsable date/time literal passed to a function
    #[error("Unable to parse '{input}' as a date/time")]
    Parse { input: String },

    /// Malformed placeholder in a template
    #[error("Template error at offset {offset}: {message}")]
    Template { offset: usize, message: String },
}

impl ExprError {
    /// Evaluation error whose sub-expression is filled in by the evaluator
    pub(crate) fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation {
            expression: String::new(),
            message: message.into(),
        }
    }

    /// Attach the offending sub-expression if none was recorded yet
    pub(crate) fn at(self, source: impl FnOnce() -> String) -> Self {
        match self {
            Self::Evaluation {
                expression,
                message,
            } if expression.is_empty() => Self::Evaluation {
                expression: source(),
                message,
            },
            other => other,
        }
    }

    /// Short classification used in logs and plan reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "SyntaxError",
            Self::Name { .. } => "NameError",
            Self::Evaluation { .. } => "EvaluationError",
            Self::Parse { .. } => "ParseError",
            Self::Template { .. } => "TemplateError",
        }
    }
}

/// Result type alias for expression operations
pub type ExprResult<T> = Result<T, ExprError>;
