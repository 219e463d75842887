//! Narrow interfaces for the external capabilities the engine consumes.
//!
//! Every non-trivial capability (retrieval, question generation, scoring,
//! re-explanation) sits behind one of these traits and is injected into the
//! services that need it, so tests can substitute deterministic fakes.

use async_trait::async_trait;

use tutor_core::model::{Checkpoint, Gap, StudyContext};

use crate::error::{ContextError, DelegateError};

/// Graded result for a single (question, answer) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredAnswer {
    pub score: u8,
    pub feedback: String,
}

/// Supplies reference material for a checkpoint attempt.
///
/// Learner notes and web retrieval are two implementations of the same
/// capability.
#[async_trait]
pub trait ContextSource: Send + Sync {
    /// Fetch a text blob for the checkpoint.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::Unavailable` when no usable material exists.
    async fn fetch(&self, checkpoint: &Checkpoint) -> Result<StudyContext, ContextError>;
}

/// A pluggable web-search capability used behind a `ContextSource`.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run a query and return concatenated result text.
    ///
    /// # Errors
    ///
    /// Returns `DelegateError` when the backend call fails.
    async fn search(&self, query: &str) -> Result<String, DelegateError>;
}

/// Produces assessment questions from a checkpoint's objectives and context.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Generate question texts. Callers enforce the exact question count.
    ///
    /// # Errors
    ///
    /// Returns `DelegateError` when the backend call fails.
    async fn generate(
        &self,
        topic: &str,
        objectives: &[String],
        context: &str,
    ) -> Result<Vec<String>, DelegateError>;
}

/// Scores one learner answer against its question and reference context.
#[async_trait]
pub trait ScoringDelegate: Send + Sync {
    /// Score an answer in `[0,100]` with feedback text.
    ///
    /// # Errors
    ///
    /// Returns `DelegateError` on backend failure or malformed output.
    async fn score(
        &self,
        question: &str,
        answer: &str,
        context: &str,
    ) -> Result<ScoredAnswer, DelegateError>;
}

/// Produces a simplified re-explanation for detected gaps.
#[async_trait]
pub trait RemediationDelegate: Send + Sync {
    /// Explain the gapped concepts in plain language.
    ///
    /// # Errors
    ///
    /// Returns `DelegateError` when the backend call fails.
    async fn explain(
        &self,
        gaps: &[Gap],
        context: &str,
        topic: &str,
    ) -> Result<String, DelegateError>;
}
