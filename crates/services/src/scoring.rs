use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use tutor_core::model::{Answer, Question, ScoreRecord};

use crate::chunk::truncate_chars;
use crate::delegate::{ScoredAnswer, ScoringDelegate};
use crate::error::DelegateError;
use crate::llm::ChatClient;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_PROMPT_CONTEXT: usize = 1500;

const EMPTY_ANSWER_FEEDBACK: &str = "No answer was submitted.";
const FALLBACK_FEEDBACK: &str =
    "This answer could not be evaluated this time and was scored 0. It will count again on a retry.";

/// Scores an ordered list of (question, answer) pairs.
///
/// Each pair is scored independently, in order, with no cross-question
/// normalization. Blank answers score 0 without touching the delegate, and a
/// failing delegate call degrades to a fallback record instead of aborting
/// the assessment.
pub struct AnswerScorer {
    delegate: Arc<dyn ScoringDelegate>,
    timeout: Duration,
}

impl AnswerScorer {
    #[must_use]
    pub fn new(delegate: Arc<dyn ScoringDelegate>) -> Self {
        Self {
            delegate,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound each delegate call; a timeout counts as a delegate failure.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Score every pair, returning one record per question in question order.
    ///
    /// `answers` must already be aligned to `questions` (one per ordinal, as
    /// `align_answers` produces).
    pub async fn score_all(
        &self,
        questions: &[Question],
        answers: &[Answer],
        context: &str,
    ) -> Vec<ScoreRecord> {
        let mut records = Vec::with_capacity(questions.len());
        for (question, answer) in questions.iter().zip(answers) {
            records.push(self.score_one(question, answer, context).await);
        }
        records
    }

    async fn score_one(&self, question: &Question, answer: &Answer, context: &str) -> ScoreRecord {
        if answer.is_blank() {
            // deterministic, free of any backend round trip
            return ScoreRecord::new(question.ordinal, 0, EMPTY_ANSWER_FEEDBACK);
        }

        let call = self.delegate.score(&question.text, &answer.text, context);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(scored)) => ScoreRecord::new(question.ordinal, scored.score, scored.feedback),
            Ok(Err(err)) => {
                warn!(ordinal = question.ordinal, error = %err, "scoring delegate failed");
                ScoreRecord::new(question.ordinal, 0, FALLBACK_FEEDBACK)
            }
            Err(_) => {
                warn!(ordinal = question.ordinal, "scoring delegate timed out");
                ScoreRecord::new(question.ordinal, 0, FALLBACK_FEEDBACK)
            }
        }
    }
}

/// Chat-backed scoring delegate.
///
/// Asks the backend for a JSON object and refuses to guess when the reply
/// does not contain one; the scorer above turns that refusal into a fallback
/// record.
pub struct LlmScoringDelegate {
    chat: ChatClient,
}

impl LlmScoringDelegate {
    #[must_use]
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }

    fn prompt(question: &str, answer: &str, context: &str) -> String {
        format!(
            "You are an educator evaluating a student answer. Consider accuracy, \
             depth, clarity, and completeness. Be lenient but don't spare bad answers.\n\
             \n\
             REFERENCE CONTEXT: {context}\n\
             \n\
             QUESTION: {question}\n\
             STUDENT ANSWER: {answer}\n\
             \n\
             Evaluate and return JSON only:\n\
             {{\"score\": <0-100>, \"comments\": \"<concise feedback>\"}}",
            context = truncate_chars(context, MAX_PROMPT_CONTEXT),
        )
    }
}

#[derive(Debug, Deserialize)]
struct Evaluation {
    score: i64,
    #[serde(default)]
    comments: String,
}

/// Pull the first JSON object out of a chat reply that may wrap it in prose.
fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

#[async_trait]
impl ScoringDelegate for LlmScoringDelegate {
    async fn score(
        &self,
        question: &str,
        answer: &str,
        context: &str,
    ) -> Result<ScoredAnswer, DelegateError> {
        let raw = self
            .chat
            .generate(&Self::prompt(question, answer, context))
            .await?;

        let json = extract_json(&raw)
            .ok_or_else(|| DelegateError::Malformed(format!("no JSON object in: {raw}")))?;
        let evaluation: Evaluation =
            serde_json::from_str(json).map_err(|e| DelegateError::Malformed(e.to_string()))?;

        let score = u8::try_from(evaluation.score.clamp(0, 100)).unwrap_or(0);
        Ok(ScoredAnswer {
            score,
            feedback: evaluation.comments,
        })
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
