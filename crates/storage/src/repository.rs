use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;

use tutor_core::model::ProgressCursor;

/// Errors surfaced by progress storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the learner's persisted progress.
///
/// Single-writer, read-modify-write: the progression engine loads the cursor
/// at session start and saves it after every terminal checkpoint transition.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Load the persisted cursor; a store with no saved progress yields a
    /// fresh cursor rather than an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the underlying store cannot be read or the
    /// persisted document cannot be decoded.
    async fn load(&self) -> Result<ProgressCursor, StorageError>;

    /// Persist the cursor, replacing any previous snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be written.
    async fn save(&self, progress: &ProgressCursor) -> Result<(), StorageError>;
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct InMemoryProgressStore {
    inner: Mutex<ProgressCursor>,
}

impl InMemoryProgressStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cursor(progress: ProgressCursor) -> Self {
        Self {
            inner: Mutex::new(progress),
        }
    }
}

#[async_trait]
impl ProgressRepository for InMemoryProgressStore {
    async fn load(&self) -> Result<ProgressCursor, StorageError> {
        let guard = self
            .inner
            .lock()
            .map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save(&self, progress: &ProgressCursor) -> Result<(), StorageError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|e| StorageError::Io(e.to_string()))?;
        *guard = progress.clone();
        Ok(())
    }
}
