use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::CheckpointId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CheckpointError {
    #[error("checkpoint topic must not be blank")]
    BlankTopic,

    #[error("checkpoint must have at least one learning objective")]
    NoObjectives,

    #[error("learning objective {index} must not be blank")]
    BlankObjective { index: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CurriculumError {
    #[error("curriculum must contain at least one checkpoint")]
    Empty,

    #[error("duplicate checkpoint id {id}")]
    DuplicateId { id: CheckpointId },
}

/// A unit of curriculum: a topic plus the objectives a learner must cover.
///
/// Immutable once constructed; every assessment cycle for this checkpoint
/// reads the same topic and objectives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    id: CheckpointId,
    topic: String,
    objectives: Vec<String>,
    success_criteria: Option<String>,
}

impl Checkpoint {
    /// Create a validated checkpoint.
    ///
    /// # Errors
    ///
    /// Returns `CheckpointError` if the topic is blank, the objective list is
    /// empty, or any objective is blank.
    pub fn new(
        id: CheckpointId,
        topic: impl Into<String>,
        objectives: Vec<String>,
        success_criteria: Option<String>,
    ) -> Result<Self, CheckpointError> {
        let topic = topic.into();
        if topic.trim().is_empty() {
            return Err(CheckpointError::BlankTopic);
        }
        if objectives.is_empty() {
            return Err(CheckpointError::NoObjectives);
        }
        for (index, objective) in objectives.iter().enumerate() {
            if objective.trim().is_empty() {
                return Err(CheckpointError::BlankObjective { index });
            }
        }

        Ok(Self {
            id,
            topic,
            objectives,
            success_criteria,
        })
    }

    #[must_use]
    pub fn id(&self) -> CheckpointId {
        self.id
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn objectives(&self) -> &[String] {
        &self.objectives
    }

    #[must_use]
    pub fn success_criteria(&self) -> Option<&str> {
        self.success_criteria.as_deref()
    }
}

/// An ordered sequence of checkpoints, indexed `0..len`.
///
/// The learner's `ProgressCursor` points into this sequence; a cursor equal
/// to `len` means the curriculum is complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Curriculum {
    checkpoints: Vec<Checkpoint>,
}

impl Curriculum {
    /// Build a curriculum from an ordered list of checkpoints.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError::Empty` for an empty list and
    /// `CurriculumError::DuplicateId` when two checkpoints share an id.
    pub fn new(checkpoints: Vec<Checkpoint>) -> Result<Self, CurriculumError> {
        if checkpoints.is_empty() {
            return Err(CurriculumError::Empty);
        }
        for (i, checkpoint) in checkpoints.iter().enumerate() {
            if checkpoints[..i].iter().any(|c| c.id() == checkpoint.id()) {
                return Err(CurriculumError::DuplicateId {
                    id: checkpoint.id(),
                });
            }
        }

        Ok(Self { checkpoints })
    }

    /// Generic five-step study plan used when no curriculum is supplied.
    ///
    /// # Panics
    ///
    /// Never panics; the built-in plan is statically valid.
    #[must_use]
    pub fn default_for_topic(topic: &str) -> Self {
        let steps = [
            ("Introduction", "Learn the basics"),
            ("Core Concepts", "Understand key principles"),
            ("Practice", "Apply your knowledge"),
            ("Advanced Topics", "Explore complex ideas"),
            ("Mastery", "Achieve proficiency"),
        ];

        let checkpoints = steps
            .iter()
            .enumerate()
            .map(|(i, (title, objective))| {
                Checkpoint::new(
                    CheckpointId::new(i as u64 + 1),
                    format!("{topic}: {title}"),
                    vec![(*objective).to_string()],
                    None,
                )
                .expect("built-in plan is valid")
            })
            .collect();

        Self { checkpoints }
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Checkpoint> {
        self.checkpoints.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    #[must_use]
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints.iter()
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint(id: u64) -> Checkpoint {
        Checkpoint::new(
            CheckpointId::new(id),
            "Tree Terminology",
            vec!["Define Root, Node, and Leaf".to_string()],
            None,
        )
        .unwrap()
    }

    #[test]
    fn checkpoint_rejects_blank_topic() {
        let err = Checkpoint::new(
            CheckpointId::new(1),
            "   ",
            vec!["objective".to_string()],
            None,
        )
        .unwrap_err();
        assert_eq!(err, CheckpointError::BlankTopic);
    }

    #[test]
    fn checkpoint_rejects_empty_objectives() {
        let err = Checkpoint::new(CheckpointId::new(1), "Topic", Vec::new(), None).unwrap_err();
        assert_eq!(err, CheckpointError::NoObjectives);
    }

    #[test]
    fn checkpoint_rejects_blank_objective() {
        let err = Checkpoint::new(
            CheckpointId::new(1),
            "Topic",
            vec!["fine".to_string(), "  ".to_string()],
            None,
        )
        .unwrap_err();
        assert_eq!(err, CheckpointError::BlankObjective { index: 1 });
    }

    #[test]
    fn curriculum_rejects_duplicate_ids() {
        let err = Curriculum::new(vec![checkpoint(1), checkpoint(1)]).unwrap_err();
        assert_eq!(
            err,
            CurriculumError::DuplicateId {
                id: CheckpointId::new(1)
            }
        );
    }

    #[test]
    fn curriculum_preserves_order() {
        let curriculum = Curriculum::new(vec![checkpoint(3), checkpoint(1)]).unwrap();
        assert_eq!(curriculum.len(), 2);
        assert_eq!(curriculum.get(0).unwrap().id(), CheckpointId::new(3));
        assert_eq!(curriculum.get(1).unwrap().id(), CheckpointId::new(1));
        assert!(curriculum.get(2).is_none());
    }

    #[test]
    fn default_plan_has_five_steps() {
        let curriculum = Curriculum::default_for_topic("Rust");
        assert_eq!(curriculum.len(), 5);
        assert!(curriculum.get(0).unwrap().topic().starts_with("Rust:"));
    }
}
