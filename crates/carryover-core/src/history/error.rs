//! Error types for revision history traversal.

use thiserror::Error;

use super::revision::RevisionId;

/// Errors produced while reading or walking revision history.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The backing repository could not be read. Retrying is up to the caller.
    #[error("repository access failed: {0}")]
    RepositoryAccess(String),

    /// The history contains nothing but the start revision.
    #[error("Cannot run in this workflow mode for a repository with just one commit: {start}")]
    BaselineNotFound { start: String },

    /// No revision in the walk carried the requested label.
    #[error("cannot find a revision labeled '{label}' reachable from {start}")]
    LabelNotFound { start: String, label: String },

    /// A reference did not resolve to a revision.
    #[error("cannot resolve reference '{0}'")]
    InvalidReference(String),

    /// The reference was empty where the origin needs one.
    #[error("Expecting a {0} as reference")]
    MissingReference(&'static str),

    /// A parent id points at a revision the repository does not know.
    #[error("revision not found: {0}")]
    RevisionNotFound(RevisionId),
}

impl HistoryError {
    /// `true` when the failure came from the repository rather than from the
    /// shape of the history.
    pub fn is_repository_error(&self) -> bool {
        matches!(
            self,
            HistoryError::RepositoryAccess(_) | HistoryError::RevisionNotFound(_)
        )
    }
}

/// Convenience result alias.
pub type HistoryResult<T> = std::result::Result<T, HistoryError>;
