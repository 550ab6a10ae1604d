//! Submission errors.

use thiserror::Error;

/// Errors surfaced by resolution and submission.
///
/// A launcher that runs and exits non-zero is not an error; its exit code is
/// reported in [`SubmissionResult`](crate::SubmissionResult).
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("connection not found: '{0}'")]
    ConnectionNotFound(String),

    #[error("failed to start '{program}': {reason}")]
    ProcessLaunchFailure { program: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for submission operations.
pub type SubmitResult<T> = Result<T, SubmitError>;
