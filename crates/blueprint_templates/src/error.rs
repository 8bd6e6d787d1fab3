//! Error types for templates.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Engine stage a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Compose,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Load => "failed to load template",
            Stage::Compose => "failed to compose template",
            Stage::Render => "failed to render template",
        };
        f.write_str(label)
    }
}

/// Errors that can occur during template operations.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Invalid template definition {location}: {source}")]
    Parse {
        location: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Template validation failed for {template}: {message}")]
    Validation { template: String, message: String },

    #[error("circular dependency detected: {}", .path.join(" -> "))]
    CircularDependency { path: Vec<String> },

    #[error("failed to load included template '{include}': {source}")]
    IncludeLoad {
        include: String,
        #[source]
        source: Box<TemplateError>,
    },

    #[error("{0}")]
    Syntax(#[source] blueprint_lang::LangError),

    #[error("failed to render {path}: {source}")]
    RenderExecution {
        path: String,
        #[source]
        source: blueprint_lang::LangError,
    },

    #[error("destination {dest} is produced by both {first} and {second}")]
    Collision {
        dest: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{stage}: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<TemplateError>,
    },
}

impl TemplateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TemplateError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn validation(template: impl Into<String>, message: impl Into<String>) -> Self {
        TemplateError::Validation {
            template: template.into(),
            message: message.into(),
        }
    }

    pub(crate) fn in_stage(self, stage: Stage) -> Self {
        TemplateError::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through stage and include wrappers.
    pub fn root_cause(&self) -> &TemplateError {
        match self {
            TemplateError::Stage { source, .. } | TemplateError::IncludeLoad { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}
