use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use tutor_core::model::ProgressCursor;

use crate::repository::{ProgressRepository, StorageError};

/// Progress store backed by a single JSON document on disk.
///
/// Writes go to a sibling temp file first and are renamed over the target, so
/// a crash mid-write can never leave a truncated progress file behind. No
/// cross-session locking: the store assumes one writer at a time.
#[derive(Debug, Clone)]
pub struct JsonProgressStore {
    path: PathBuf,
}

impl JsonProgressStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map_or_else(|| "progress.json".into(), |n| n.to_os_string());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl ProgressRepository for JsonProgressStore {
    async fn load(&self) -> Result<ProgressCursor, StorageError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ProgressCursor::new());
            }
            Err(e) => return Err(StorageError::Io(e.to_string())),
        };

        serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn save(&self, progress: &ProgressCursor) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(progress)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }

        let temp = self.temp_path();
        fs::write(&temp, &json)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        fs::rename(&temp, &self.path)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(())
    }
}
