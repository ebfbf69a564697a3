//! Error types for tag rewriting.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while building, reversing or running a replace engine.
#[derive(Debug, Error)]
pub enum ReplaceError {
    /// The engine configuration is inconsistent.
    #[error("{0}")]
    Config(String),

    /// A tag occurrence in a file cannot be rewritten under the active mode.
    #[error("{message}")]
    Content { path: PathBuf, message: String },

    /// `reverse()` was asked of a mode or mapping that cannot be inverted.
    #[error("non-reversible transformation: {0}")]
    NonReversible(String),

    /// More than one file failed during a transform pass.
    #[error("{} files failed to transform:\n{}", failures.len(), render_failures(failures))]
    Files { failures: Vec<ReplaceError> },

    /// The configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A glob in `paths` did not compile.
    #[error("invalid path glob: {0}")]
    Glob(#[from] globset::Error),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk checkout: {0}")]
    Walk(#[from] ignore::Error),
}

impl ReplaceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReplaceError::Io {
            path: path.into(),
            source,
        }
    }

    /// `true` for failures caused by file contents rather than configuration
    /// or IO.
    pub fn is_content_error(&self) -> bool {
        match self {
            ReplaceError::Content { .. } => true,
            ReplaceError::Files { failures } => failures.iter().all(ReplaceError::is_content_error),
            _ => false,
        }
    }
}

fn render_failures(failures: &[ReplaceError]) -> String {
    failures
        .iter()
        .map(|failure| match failure {
            ReplaceError::Content { path, message } => format!("  - {}: {message}", path.display()),
            other => format!("  - {other}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convenience result alias.
pub type ReplaceResult<T> = std::result::Result<T, ReplaceError>;
