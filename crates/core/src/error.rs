use thiserror::Error;

use crate::engine::EngineError;
use crate::model::{CheckpointError, CurriculumError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error(transparent)]
    Curriculum(#[from] CurriculumError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
