mod assessment;
mod checkpoint;
mod context;
mod gap;
mod ids;
mod progress;

pub use assessment::{Answer, Question, ScoreRecord, align_answers, average_score};
pub use checkpoint::{Checkpoint, CheckpointError, Curriculum, CurriculumError};
pub use context::{ContextProvenance, StudyContext};
pub use gap::{Gap, detect_objective, detect_subjective};
pub use ids::{AttemptId, CheckpointId, ParseIdError};
pub use progress::{AttemptRecord, CheckpointOutcome, ProgressCursor};
