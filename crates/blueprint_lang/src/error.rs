//! Error types for the template language.

use thiserror::Error;

/// Result type alias for template language operations.
pub type LangResult<T> = Result<T, LangError>;

/// Errors raised while parsing or executing a template.
#[derive(Error, Debug)]
pub enum LangError {
    #[error("failed to parse template {name}: {message}")]
    Parse { name: String, message: String },

    #[error("failed to execute template {name}: {message}")]
    Exec { name: String, message: String },

    #[error("Invalid context: {0}")]
    Context(#[from] serde_json::Error),
}

impl LangError {
    pub fn is_parse(&self) -> bool {
        matches!(self, LangError::Parse { .. })
    }
}

/// A coercion between value kinds that has no representation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("cannot convert {from} to {to}")]
    Unrepresentable {
        from: &'static str,
        to: &'static str,
    },

    #[error("cannot convert {0:?} to int")]
    NotAnInteger(String),
}
