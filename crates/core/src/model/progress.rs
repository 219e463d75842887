use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::CheckpointId;
use std::fmt;

/// Terminal outcome of a checkpoint.
///
/// Both variants advance the learner: retries exist only within the attempt
/// budget, so `Exhausted` is a recorded result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointOutcome {
    Passed,
    Exhausted,
}

impl fmt::Display for CheckpointOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointOutcome::Passed => write!(f, "passed"),
            CheckpointOutcome::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// One finished checkpoint, as recorded in the learner's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub checkpoint_id: CheckpointId,
    pub attempts: u32,
    pub outcome: CheckpointOutcome,
    pub average_score: f64,
    pub timestamp: DateTime<Utc>,
}

/// The learner's position in the curriculum plus per-checkpoint history.
///
/// Persisted between sessions as `{ "cursor": int, "history": [...] }`. The
/// cursor stays within `[0, curriculum_len]`; equal to the length means the
/// curriculum is complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressCursor {
    pub cursor: usize,
    #[serde(default)]
    pub history: Vec<AttemptRecord>,
}

impl ProgressCursor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a terminal checkpoint outcome and advance the cursor by one.
    ///
    /// Advancement is unconditional: passed and exhausted checkpoints both
    /// move the learner forward.
    pub fn record(&mut self, record: AttemptRecord) {
        self.history.push(record);
        self.cursor += 1;
    }

    /// True once the cursor has moved past the last checkpoint.
    #[must_use]
    pub fn is_complete(&self, curriculum_len: usize) -> bool {
        self.cursor >= curriculum_len
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
