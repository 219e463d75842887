use std::sync::Arc;

use tracing::{info, warn};

use storage::ProgressRepository;
use tutor_core::Clock;
use tutor_core::engine::{AttemptState, Decision, EngineSettings};
use tutor_core::model::{
    Answer, Checkpoint, Curriculum, Gap, ProgressCursor, Question, ScoreRecord,
};

use crate::chunk::focus;
use crate::delegate::{ContextSource, QuestionGenerator};
use crate::error::ProgressionError;
use crate::question::ensure_question_count;
use crate::remediation::RemediationService;
use crate::scoring::AnswerScorer;

/// Focus target for question-generation context.
const MAX_QUESTION_CONTEXT: usize = 3000;

/// Result of submitting one round of answers.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptProgress {
    pub average_score: f64,
    pub records: Vec<ScoreRecord>,
    pub status: AttemptStatus,
}

/// Where the attempt went after the deciding step.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptStatus {
    /// Below threshold with budget left: remediation generated, fresh
    /// questions waiting in `Assessing`.
    Retry {
        gaps: Vec<Gap>,
        remediation: String,
        attempt: u32,
    },
    /// Average met the threshold; outcome recorded, cursor advanced.
    Passed { curriculum_complete: bool },
    /// Attempt budget spent; outcome recorded, cursor still advanced.
    Exhausted { curriculum_complete: bool },
}

/// Drives checkpoints through teach → assess → score → decide cycles for one
/// learner, one attempt at a time.
///
/// All capabilities are injected; the service owns only the control flow.
/// Terminal outcomes are written through the progress repository before the
/// result is returned, so a crash after a decision never loses it.
pub struct ProgressionService {
    clock: Clock,
    curriculum: Curriculum,
    context_source: Arc<dyn ContextSource>,
    question_generator: Arc<dyn QuestionGenerator>,
    scorer: AnswerScorer,
    remediation: RemediationService,
    progress: Arc<dyn ProgressRepository>,
    settings: EngineSettings,
}

impl ProgressionService {
    /// Assemble the service.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::Engine` if the settings fail validation.
    pub fn new(
        clock: Clock,
        curriculum: Curriculum,
        context_source: Arc<dyn ContextSource>,
        question_generator: Arc<dyn QuestionGenerator>,
        scorer: AnswerScorer,
        remediation: RemediationService,
        progress: Arc<dyn ProgressRepository>,
        settings: EngineSettings,
    ) -> Result<Self, ProgressionError> {
        settings.validate()?;
        Ok(Self {
            clock,
            curriculum,
            context_source,
            question_generator,
            scorer,
            remediation,
            progress,
            settings,
        })
    }

    #[must_use]
    pub fn curriculum(&self) -> &Curriculum {
        &self.curriculum
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Load the learner's persisted position and history.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::Storage` if the store cannot be read.
    pub async fn progress(&self) -> Result<ProgressCursor, ProgressionError> {
        Ok(self.progress.load().await?)
    }

    /// The checkpoint the cursor currently points at, if any remain.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::Storage` if the store cannot be read.
    pub async fn next_checkpoint(&self) -> Result<Option<&Checkpoint>, ProgressionError> {
        let cursor = self.progress.load().await?;
        Ok(self.curriculum.get(cursor.cursor))
    }

    /// Start an attempt on the next unfinished checkpoint.
    ///
    /// Returns `Ok(None)` once the curriculum is complete. On success the
    /// attempt sits in `Assessing` with its first round of questions.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::Context` when neither learner notes nor
    /// retrieval produced usable material; the checkpoint is NOT skipped and
    /// the caller may retry (e.g. with different notes).
    pub async fn start_next(&self) -> Result<Option<AttemptState>, ProgressionError> {
        let Some(checkpoint) = self.next_checkpoint().await? else {
            return Ok(None);
        };

        let mut state = AttemptState::new(checkpoint.clone(), self.settings.clone())?;
        let context = self.context_source.fetch(checkpoint).await?;

        info!(
            checkpoint = %checkpoint.id(),
            topic = checkpoint.topic(),
            provenance = ?context.provenance(),
            "teaching checkpoint"
        );

        let focus_query = Self::focus_query(checkpoint);
        let question_context = focus(context.text(), &focus_query, MAX_QUESTION_CONTEXT);
        let questions = self
            .generate_questions(checkpoint.topic(), checkpoint.objectives(), &question_context)
            .await;

        state.begin_assessment(context, questions)?;
        Ok(Some(state))
    }

    /// Score a round of answers and take the deciding branch.
    ///
    /// Missing answers count as empty (score 0). On a failed round with
    /// budget left, the remediation explanation is generated, joined to the
    /// reference material, and a regenerated assessment is left waiting in
    /// the returned state. Terminal outcomes are persisted and advance the
    /// cursor whether the checkpoint was passed or exhausted.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::Engine` for out-of-phase calls and
    /// `ProgressionError::Storage` when a terminal outcome cannot be
    /// persisted.
    pub async fn submit_answers(
        &self,
        state: &mut AttemptState,
        answers: Vec<Answer>,
    ) -> Result<AttemptProgress, ProgressionError> {
        state.submit_answers(answers)?;

        let context_text = state
            .context()
            .map_or_else(String::new, |c| c.text().to_string());
        let records = self
            .scorer
            .score_all(state.questions(), state.answers(), &context_text)
            .await;
        state.record_scores(records)?;

        let average_score = state.average();
        let records = state.score_records().to_vec();

        match state.decide()? {
            Decision::Pass => {
                let curriculum_complete = self.record_outcome(state).await?;
                info!(
                    checkpoint = %state.checkpoint().id(),
                    average = average_score,
                    "checkpoint passed"
                );
                Ok(AttemptProgress {
                    average_score,
                    records,
                    status: AttemptStatus::Passed {
                        curriculum_complete,
                    },
                })
            }
            Decision::Exhaust => {
                let curriculum_complete = self.record_outcome(state).await?;
                info!(
                    checkpoint = %state.checkpoint().id(),
                    attempts = state.attempt(),
                    average = average_score,
                    "attempt budget exhausted, moving on"
                );
                Ok(AttemptProgress {
                    average_score,
                    records,
                    status: AttemptStatus::Exhausted {
                        curriculum_complete,
                    },
                })
            }
            Decision::Remediate => {
                let topic = state.checkpoint().topic().to_string();
                let objectives = state.checkpoint().objectives().to_vec();
                let gaps = state.gaps().to_vec();
                let Some(context) = state.context().cloned() else {
                    // begin_assessment guarantees a context before this point
                    return Err(tutor_core::engine::EngineError::EmptyContext.into());
                };

                let remediation = self.remediation.explain(&gaps, &context, &topic).await;

                let supplemented = context.with_supplement(&remediation);
                let focus_query = Self::focus_query(state.checkpoint());
                let question_context =
                    focus(supplemented.text(), &focus_query, MAX_QUESTION_CONTEXT);
                let questions = self
                    .generate_questions(&topic, &objectives, &question_context)
                    .await;

                state.begin_retry(remediation.clone(), questions)?;
                info!(
                    checkpoint = %state.checkpoint().id(),
                    attempt = state.attempt(),
                    gaps = gaps.len(),
                    average = average_score,
                    "remediating and retrying"
                );
                Ok(AttemptProgress {
                    average_score,
                    records,
                    status: AttemptStatus::Retry {
                        gaps,
                        remediation,
                        attempt: state.attempt(),
                    },
                })
            }
        }
    }

    async fn generate_questions(
        &self,
        topic: &str,
        objectives: &[String],
        context_text: &str,
    ) -> Vec<Question> {
        let texts = match self
            .question_generator
            .generate(topic, objectives, context_text)
            .await
        {
            Ok(texts) => texts,
            Err(err) => {
                warn!(topic, error = %err, "question generation failed, using objectives");
                Vec::new()
            }
        };

        let texts = ensure_question_count(texts, objectives, self.settings.question_count);
        Question::from_texts(texts)
    }

    /// Append the terminal record and advance the cursor (read-modify-write).
    async fn record_outcome(&self, state: &AttemptState) -> Result<bool, ProgressionError> {
        let record = state.to_record(self.clock.now())?;
        let mut cursor = self.progress.load().await?;
        cursor.record(record);
        self.progress.save(&cursor).await?;
        Ok(cursor.is_complete(self.curriculum.len()))
    }

    fn focus_query(checkpoint: &Checkpoint) -> String {
        format!(
            "{} {}",
            checkpoint.topic(),
            checkpoint.objectives().join(" ")
        )
    }
}
