//! Shared error types for the services crate.

use thiserror::Error;

use storage::StorageError;
use tutor_core::engine::EngineError;

/// Errors emitted by `ChatClient`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LlmError {
    #[error("chat backend is not configured")]
    Disabled,
    #[error("chat backend returned an empty response")]
    EmptyResponse,
    #[error("chat request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Failure of a pluggable delegate (search, scoring, generation).
///
/// Always caught at the component boundary and replaced with a fallback
/// value; a single bad call never voids the whole attempt.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DelegateError {
    #[error("delegate backend failed: {0}")]
    Backend(String),
    #[error("delegate returned malformed output: {0}")]
    Malformed(String),
    #[error("delegate call timed out")]
    Timeout,
}

impl From<LlmError> for DelegateError {
    fn from(err: LlmError) -> Self {
        DelegateError::Backend(err.to_string())
    }
}

/// No assessable context could be produced for a checkpoint.
///
/// The one fatal condition in a checkpoint attempt: surfaced to the caller,
/// who may retry with different notes. The attempt stays in `Teaching`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContextError {
    #[error("no usable study context: learner notes and retrieval both came up empty")]
    Unavailable,
}

/// Errors emitted by `ProgressionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressionError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
