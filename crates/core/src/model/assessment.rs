use serde::{Deserialize, Serialize};

/// A single assessment question, numbered as shown to the learner (1-based).
///
/// Questions are generated fresh for every assessment cycle and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub ordinal: usize,
    pub text: String,
}

impl Question {
    #[must_use]
    pub fn new(ordinal: usize, text: impl Into<String>) -> Self {
        Self {
            ordinal,
            text: text.into(),
        }
    }

    /// Number a list of question texts with 1-based ordinals.
    #[must_use]
    pub fn from_texts<I, S>(texts: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Self::new(i + 1, text))
            .collect()
    }
}

/// A learner-submitted answer, keyed by the ordinal of its question.
///
/// An empty answer is valid input; it scores 0 without being treated as an
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub ordinal: usize,
    pub text: String,
}

impl Answer {
    #[must_use]
    pub fn new(ordinal: usize, text: impl Into<String>) -> Self {
        Self {
            ordinal,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn empty(ordinal: usize) -> Self {
        Self::new(ordinal, "")
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Per-question scoring result: a score in `[0,100]` plus feedback text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub ordinal: usize,
    pub score: u8,
    pub feedback: String,
}

impl ScoreRecord {
    /// Create a score record, clamping the score into `[0,100]`.
    #[must_use]
    pub fn new(ordinal: usize, score: u8, feedback: impl Into<String>) -> Self {
        Self {
            ordinal,
            score: score.min(100),
            feedback: feedback.into(),
        }
    }
}

/// Arithmetic mean of the record scores.
///
/// Defined as 0 for an empty list, so a checkpoint with no questions never
/// divides by zero.
#[must_use]
pub fn average_score(records: &[ScoreRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let sum: u32 = records.iter().map(|r| u32::from(r.score)).sum();
    f64::from(sum) / records.len() as f64
}

/// Produce exactly one answer per question, in question order.
///
/// Answers are matched by ordinal; questions without a submitted answer get
/// an empty one (scored 0 downstream, never an error).
#[must_use]
pub fn align_answers(questions: &[Question], answers: &[Answer]) -> Vec<Answer> {
    questions
        .iter()
        .map(|question| {
            answers
                .iter()
                .find(|answer| answer.ordinal == question.ordinal)
                .cloned()
                .unwrap_or_else(|| Answer::empty(question.ordinal))
        })
        .collect()
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_texts_assigns_one_based_ordinals() {
        let questions = Question::from_texts(["What is a root?", "What is a leaf?"]);
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].ordinal, 1);
        assert_eq!(questions[1].ordinal, 2);
    }

    #[test]
    fn score_is_clamped_to_hundred() {
        let record = ScoreRecord::new(1, 255, "overflowed");
        assert_eq!(record.score, 100);
    }

    #[test]
    fn average_of_empty_list_is_zero() {
        assert_eq!(average_score(&[]), 0.0);
    }

    #[test]
    fn average_is_arithmetic_mean() {
        let records = vec![
            ScoreRecord::new(1, 90, ""),
            ScoreRecord::new(2, 40, ""),
            ScoreRecord::new(3, 60, ""),
        ];
        let avg = average_score(&records);
        assert!((avg - 63.333_333).abs() < 0.001);
    }

    #[test]
    fn align_fills_missing_answers_with_empty() {
        let questions = Question::from_texts(["q1", "q2", "q3"]);
        let answers = vec![Answer::new(2, "only the second")];

        let aligned = align_answers(&questions, &answers);

        assert_eq!(aligned.len(), 3);
        assert!(aligned[0].is_blank());
        assert_eq!(aligned[1].text, "only the second");
        assert!(aligned[2].is_blank());
        assert_eq!(
            aligned.iter().map(|a| a.ordinal).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn align_ignores_answers_for_unknown_ordinals() {
        let questions = Question::from_texts(["q1"]);
        let answers = vec![Answer::new(9, "stray")];

        let aligned = align_answers(&questions, &answers);
        assert_eq!(aligned.len(), 1);
        assert!(aligned[0].is_blank());
    }
}
