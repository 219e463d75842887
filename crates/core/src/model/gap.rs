use serde::{Deserialize, Serialize};

use crate::model::{Answer, Question, ScoreRecord};

/// A question-level signal of conceptual misunderstanding.
///
/// `ordinal` is the original 1-based question number as shown to the learner,
/// preserved even when other questions are filtered out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub ordinal: usize,
    pub concept: String,
}

impl Gap {
    #[must_use]
    pub fn new(ordinal: usize, concept: impl Into<String>) -> Self {
        Self {
            ordinal,
            concept: concept.into(),
        }
    }
}

/// Subjective-mode detection: questions whose score fell under `cutoff`.
///
/// Gap ordinals come out strictly increasing and the list is capped at
/// `max_gaps` to keep remediation focused.
#[must_use]
pub fn detect_subjective(
    questions: &[Question],
    records: &[ScoreRecord],
    cutoff: u8,
    max_gaps: usize,
) -> Vec<Gap> {
    let mut gaps = Vec::new();
    for question in questions {
        if gaps.len() >= max_gaps {
            break;
        }
        let Some(record) = records.iter().find(|r| r.ordinal == question.ordinal) else {
            continue;
        };
        if record.score < cutoff {
            gaps.push(Gap::new(question.ordinal, question.text.clone()));
        }
    }
    gaps
}

/// Objective-mode detection: answers that do not match the known correct one.
///
/// Comparison is case- and whitespace-insensitive. Questions with no known
/// correct answer are skipped.
#[must_use]
pub fn detect_objective(
    questions: &[Question],
    answers: &[Answer],
    correct: &[Answer],
    max_gaps: usize,
) -> Vec<Gap> {
    let mut gaps = Vec::new();
    for question in questions {
        if gaps.len() >= max_gaps {
            break;
        }
        let Some(expected) = correct.iter().find(|c| c.ordinal == question.ordinal) else {
            continue;
        };
        let given = answers
            .iter()
            .find(|a| a.ordinal == question.ordinal)
            .map_or(String::new(), |a| normalize(&a.text));
        if given != normalize(&expected.text) {
            gaps.push(Gap::new(question.ordinal, question.text.clone()));
        }
    }
    gaps
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
