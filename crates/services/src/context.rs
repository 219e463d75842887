use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use tutor_core::model::{Checkpoint, ContextProvenance, StudyContext};

use crate::delegate::{ContextSource, SearchBackend};
use crate::error::{ContextError, DelegateError};

/// Notes shorter than this are treated as absent; a couple of words cannot
/// anchor an assessment.
const MIN_NOTES_CHARS: usize = 50;

/// Serves learner-supplied notes as study context.
#[derive(Debug, Clone, Default)]
pub struct NotesContextSource {
    notes: Option<String>,
}

impl NotesContextSource {
    #[must_use]
    pub fn new(notes: Option<String>) -> Self {
        Self { notes }
    }
}

#[async_trait]
impl ContextSource for NotesContextSource {
    async fn fetch(&self, _checkpoint: &Checkpoint) -> Result<StudyContext, ContextError> {
        match &self.notes {
            Some(notes) if notes.trim().chars().count() >= MIN_NOTES_CHARS => Ok(
                StudyContext::new(notes.clone(), ContextProvenance::LearnerNotes),
            ),
            _ => Err(ContextError::Unavailable),
        }
    }
}

/// Retrieves study context through a pluggable search backend.
///
/// The query encodes the topic and every objective, so retrieval has a
/// chance of covering the whole checkpoint in one round trip.
pub struct SearchContextSource {
    backend: Arc<dyn SearchBackend>,
}

impl SearchContextSource {
    #[must_use]
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    fn query_for(checkpoint: &Checkpoint) -> String {
        format!(
            "Explain {} covering: {}",
            checkpoint.topic(),
            checkpoint.objectives().join(", ")
        )
    }
}

#[async_trait]
impl ContextSource for SearchContextSource {
    async fn fetch(&self, checkpoint: &Checkpoint) -> Result<StudyContext, ContextError> {
        let query = Self::query_for(checkpoint);
        debug!(topic = checkpoint.topic(), %query, "searching for study context");

        match self.backend.search(&query).await {
            Ok(text) if !text.trim().is_empty() => {
                Ok(StudyContext::new(text, ContextProvenance::Retrieved))
            }
            Ok(_) => Err(ContextError::Unavailable),
            Err(err) => {
                warn!(topic = checkpoint.topic(), error = %err, "context search failed");
                Err(ContextError::Unavailable)
            }
        }
    }
}

/// Prefer learner notes, fall back to retrieval.
///
/// Only when both come up empty does the checkpoint halt with
/// `ContextError::Unavailable` for the caller to handle.
pub struct NotesThenSearchSource {
    notes: NotesContextSource,
    search: SearchContextSource,
}

impl NotesThenSearchSource {
    #[must_use]
    pub fn new(notes: NotesContextSource, search: SearchContextSource) -> Self {
        Self { notes, search }
    }
}

#[async_trait]
impl ContextSource for NotesThenSearchSource {
    async fn fetch(&self, checkpoint: &Checkpoint) -> Result<StudyContext, ContextError> {
        if let Ok(context) = self.notes.fetch(checkpoint).await {
            return Ok(context);
        }
        self.search.fetch(checkpoint).await
    }
}

/// Search backend that never finds anything; useful offline and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSearch;

#[async_trait]
impl SearchBackend for NoSearch {
    async fn search(&self, _query: &str) -> Result<String, DelegateError> {
        Ok(String::new())
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
