//! engine::error
//!
//! Pipeline failures and their caller-facing categories.
//!
//! Every collaborator keeps its own error enum; [`PipelineError`] wraps them
//! and [`PipelineError::kind`] folds them into the small set of
//! [`ErrorKind`]s the HTTP surface and CLI report.

use thiserror::Error;

use crate::core::changelog::ChangelogError;
use crate::core::ops::LockError;
use crate::forge::ForgeError;
use crate::generator::GenerationError;
use crate::git::GitError;

use super::ledger::LedgerError;

/// Caller-facing failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A pushed revision is not in the local repository.
    RevisionNotFound,
    /// The changelog could not be parsed (e.g. two Unreleased sections).
    MalformedDocument,
    /// The entry generator could not be reached or timed out.
    GenerationUnavailable,
    /// The entry generator answered with something unusable.
    MalformedResponse,
    /// The delivery signature did not verify.
    SignatureInvalid,
    /// Pushing the branch or opening the pull request failed.
    RequestCreationFailed,
    /// Lock, IO or local git failure.
    Internal,
}

impl ErrorKind {
    /// Whether redelivering the same event may succeed.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::GenerationUnavailable | ErrorKind::RequestCreationFailed
        )
    }

    /// HTTP status reported for this kind.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::RevisionNotFound => 422,
            ErrorKind::MalformedDocument => 500,
            ErrorKind::GenerationUnavailable => 503,
            ErrorKind::MalformedResponse => 502,
            ErrorKind::SignatureInvalid => 401,
            ErrorKind::RequestCreationFailed => 502,
            ErrorKind::Internal => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::RevisionNotFound => "revision_not_found",
            ErrorKind::MalformedDocument => "malformed_document",
            ErrorKind::GenerationUnavailable => "generation_unavailable",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::SignatureInvalid => "signature_invalid",
            ErrorKind::RequestCreationFailed => "request_creation_failed",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from pipeline execution.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Changelog(#[from] ChangelogError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("pull request: {0}")]
    Forge(#[from] ForgeError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Git(GitError::RevisionNotFound { .. }) => ErrorKind::RevisionNotFound,
            PipelineError::Git(GitError::PushRejected { .. } | GitError::Remote { .. }) => {
                ErrorKind::RequestCreationFailed
            }
            PipelineError::Git(_) => ErrorKind::Internal,
            PipelineError::Changelog(ChangelogError::MalformedDocument(_)) => {
                ErrorKind::MalformedDocument
            }
            PipelineError::Changelog(ChangelogError::EmptyEntry) => ErrorKind::MalformedResponse,
            PipelineError::Generation(GenerationError::Unavailable(_)) => {
                ErrorKind::GenerationUnavailable
            }
            PipelineError::Generation(GenerationError::MalformedResponse(_)) => {
                ErrorKind::MalformedResponse
            }
            PipelineError::Forge(_) => ErrorKind::RequestCreationFailed,
            PipelineError::Lock(_) | PipelineError::Ledger(_) | PipelineError::Task(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        PipelineError::Task(err.to_string())
    }
}
