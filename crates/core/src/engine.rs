use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{
    Answer, AttemptId, AttemptRecord, Checkpoint, CheckpointOutcome, Gap, Question, ScoreRecord,
    StudyContext, align_answers, average_score, detect_subjective,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum EngineError {
    #[error("pass threshold must be within 0..=100, got {provided}")]
    InvalidThreshold { provided: f64 },

    #[error("max attempts must be at least 1")]
    ZeroAttempts,

    #[error("question count must be at least 1")]
    ZeroQuestions,

    #[error("operation requires phase {expected:?}, attempt is in {found:?}")]
    WrongPhase { expected: Phase, found: Phase },

    #[error("cannot begin assessment with an empty context")]
    EmptyContext,

    #[error("cannot begin assessment with no questions")]
    NoQuestions,

    #[error("expected {questions} score records, got {records}")]
    ScoreCountMismatch { questions: usize, records: usize },

    #[error("attempt has not reached a terminal phase")]
    NotTerminal,
}

//
// ─── PHASES & DECISIONS ────────────────────────────────────────────────────────
//

/// Where an attempt currently sits in the progression state machine.
///
/// `Teaching → Assessing → Scoring → Deciding` every cycle; `Deciding` then
/// branches to `Passed`, `Remediating` (which loops back to `Assessing`), or
/// `Exhausted`. `Passed` and `Exhausted` are terminal for the checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Teaching,
    Assessing,
    Scoring,
    Deciding,
    Remediating,
    Passed,
    Exhausted,
}

/// Branch taken at the `Deciding` phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Pass,
    Remediate,
    Exhaust,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Tunables for one checkpoint's progression.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Average score required to pass, in `[0,100]`.
    pub pass_threshold: f64,
    /// Attempt budget; the engine terminates at this bound instead of looping.
    pub max_attempts: u32,
    /// How many questions each assessment cycle carries.
    pub question_count: usize,
    /// Per-question cutoff for flagging a gap.
    pub gap_cutoff: u8,
    /// Cap on gaps handed to remediation, keeps re-teaching focused.
    pub max_gaps: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            pass_threshold: 70.0,
            max_attempts: 3,
            question_count: 3,
            gap_cutoff: 70,
            max_gaps: 3,
        }
    }
}

impl EngineSettings {
    /// Validate the settings.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` for a threshold outside `[0,100]`, a zero
    /// attempt budget, or a zero question count.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(0.0..=100.0).contains(&self.pass_threshold) || !self.pass_threshold.is_finite() {
            return Err(EngineError::InvalidThreshold {
                provided: self.pass_threshold,
            });
        }
        if self.max_attempts == 0 {
            return Err(EngineError::ZeroAttempts);
        }
        if self.question_count == 0 {
            return Err(EngineError::ZeroQuestions);
        }
        Ok(())
    }
}

//
// ─── ATTEMPT STATE ─────────────────────────────────────────────────────────────
//

/// The mutable unit driving one checkpoint's progression.
///
/// Created when a checkpoint becomes active, mutated through each
/// assess → score → decide cycle, and converted into an `AttemptRecord` once
/// a terminal phase is reached. All transitions are phase-checked; calling a
/// transition out of order is a contract violation surfaced as `EngineError`,
/// not a learner-visible failure.
#[derive(Debug, Clone)]
pub struct AttemptState {
    id: AttemptId,
    checkpoint: Checkpoint,
    settings: EngineSettings,
    phase: Phase,
    attempt: u32,
    context: Option<StudyContext>,
    questions: Vec<Question>,
    answers: Vec<Answer>,
    records: Vec<ScoreRecord>,
    gaps: Vec<Gap>,
    remediation: Option<String>,
    average: f64,
}

impl AttemptState {
    /// Start a fresh attempt state in the `Teaching` phase.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the settings fail validation.
    pub fn new(checkpoint: Checkpoint, settings: EngineSettings) -> Result<Self, EngineError> {
        settings.validate()?;
        Ok(Self {
            id: AttemptId::generate(),
            checkpoint,
            settings,
            phase: Phase::Teaching,
            attempt: 1,
            context: None,
            questions: Vec::new(),
            answers: Vec::new(),
            records: Vec::new(),
            gaps: Vec::new(),
            remediation: None,
            average: 0.0,
        })
    }

    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Attempt counter, starting at 1. Never exceeds `max_attempts`.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    #[must_use]
    pub fn context(&self) -> Option<&StudyContext> {
        self.context.as_ref()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    #[must_use]
    pub fn score_records(&self) -> &[ScoreRecord] {
        &self.records
    }

    #[must_use]
    pub fn gaps(&self) -> &[Gap] {
        &self.gaps
    }

    #[must_use]
    pub fn remediation(&self) -> Option<&str> {
        self.remediation.as_deref()
    }

    /// Average of the current cycle's scores; 0 before any scoring.
    #[must_use]
    pub fn average(&self) -> f64 {
        self.average
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Passed | Phase::Exhausted)
    }

    /// Terminal outcome, once one is reached.
    #[must_use]
    pub fn outcome(&self) -> Option<CheckpointOutcome> {
        match self.phase {
            Phase::Passed => Some(CheckpointOutcome::Passed),
            Phase::Exhausted => Some(CheckpointOutcome::Exhausted),
            _ => None,
        }
    }

    /// `Teaching → Assessing`: hand the attempt its context and questions.
    ///
    /// # Errors
    ///
    /// Returns `WrongPhase` outside `Teaching`, `EmptyContext` for a blank
    /// context, and `NoQuestions` for an empty question list.
    pub fn begin_assessment(
        &mut self,
        context: StudyContext,
        questions: Vec<Question>,
    ) -> Result<(), EngineError> {
        self.expect_phase(Phase::Teaching)?;
        if context.is_blank() {
            return Err(EngineError::EmptyContext);
        }
        if questions.is_empty() {
            return Err(EngineError::NoQuestions);
        }

        self.context = Some(context);
        self.questions = questions;
        self.answers.clear();
        self.records.clear();
        self.gaps.clear();
        self.phase = Phase::Assessing;
        Ok(())
    }

    /// `Assessing → Scoring`: accept learner answers.
    ///
    /// Missing answers become empty ones (scored 0 downstream); submitting
    /// nothing at all is therefore valid.
    ///
    /// # Errors
    ///
    /// Returns `WrongPhase` outside `Assessing`.
    pub fn submit_answers(&mut self, answers: Vec<Answer>) -> Result<(), EngineError> {
        self.expect_phase(Phase::Assessing)?;
        self.answers = align_answers(&self.questions, &answers);
        self.phase = Phase::Scoring;
        Ok(())
    }

    /// `Scoring → Deciding`: accept one score record per question.
    ///
    /// # Errors
    ///
    /// Returns `WrongPhase` outside `Scoring` and `ScoreCountMismatch` when
    /// the record count differs from the question count.
    pub fn record_scores(&mut self, records: Vec<ScoreRecord>) -> Result<(), EngineError> {
        self.expect_phase(Phase::Scoring)?;
        if records.len() != self.questions.len() {
            return Err(EngineError::ScoreCountMismatch {
                questions: self.questions.len(),
                records: records.len(),
            });
        }
        self.average = average_score(&records);
        self.records = records;
        self.phase = Phase::Deciding;
        Ok(())
    }

    /// The branch point. Pass on a sufficient average; otherwise remediate
    /// while the attempt budget lasts, and exhaust at the bound.
    ///
    /// Gaps are detected here (subjective mode, capped) so the remediation
    /// step has its targets; the gap list itself never fails the attempt.
    ///
    /// # Errors
    ///
    /// Returns `WrongPhase` outside `Deciding`.
    pub fn decide(&mut self) -> Result<Decision, EngineError> {
        self.expect_phase(Phase::Deciding)?;

        if self.average >= self.settings.pass_threshold {
            self.phase = Phase::Passed;
            return Ok(Decision::Pass);
        }

        if self.attempt < self.settings.max_attempts {
            self.gaps = detect_subjective(
                &self.questions,
                &self.records,
                self.settings.gap_cutoff,
                self.settings.max_gaps,
            );
            self.phase = Phase::Remediating;
            return Ok(Decision::Remediate);
        }

        self.phase = Phase::Exhausted;
        Ok(Decision::Exhaust)
    }

    /// `Remediating → Assessing`: store the explanation, bump the attempt
    /// counter, and start the next cycle with regenerated questions.
    ///
    /// The remediation text joins the context as additional reference
    /// material for the regenerated questions.
    ///
    /// # Errors
    ///
    /// Returns `WrongPhase` outside `Remediating` and `NoQuestions` for an
    /// empty question list.
    pub fn begin_retry(
        &mut self,
        remediation: String,
        questions: Vec<Question>,
    ) -> Result<(), EngineError> {
        self.expect_phase(Phase::Remediating)?;
        if questions.is_empty() {
            return Err(EngineError::NoQuestions);
        }

        if let Some(context) = self.context.take() {
            self.context = Some(context.with_supplement(&remediation));
        }
        self.remediation = Some(remediation);
        self.attempt += 1;
        self.questions = questions;
        self.answers.clear();
        self.records.clear();
        self.phase = Phase::Assessing;
        Ok(())
    }

    /// Convert a terminal attempt into its history record.
    ///
    /// # Errors
    ///
    /// Returns `NotTerminal` before `Passed` or `Exhausted`.
    pub fn to_record(&self, timestamp: DateTime<Utc>) -> Result<AttemptRecord, EngineError> {
        let outcome = self.outcome().ok_or(EngineError::NotTerminal)?;
        Ok(AttemptRecord {
            checkpoint_id: self.checkpoint.id(),
            attempts: self.attempt,
            outcome,
            average_score: self.average,
            timestamp,
        })
    }

    fn expect_phase(&self, expected: Phase) -> Result<(), EngineError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(EngineError::WrongPhase {
                expected,
                found: self.phase,
            })
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CheckpointId, ContextProvenance};
    use crate::time::fixed_now;

    fn checkpoint() -> Checkpoint {
        Checkpoint::new(
            CheckpointId::new(1),
            "Binary Search Trees",
            vec![
                "Explain BST properties".to_string(),
                "Visualize node insertion".to_string(),
            ],
            None,
        )
        .unwrap()
    }

    fn context() -> StudyContext {
        StudyContext::new(
            "A binary search tree keeps smaller keys to the left.",
            ContextProvenance::Retrieved,
        )
    }

    fn questions() -> Vec<Question> {
        Question::from_texts(["q1", "q2", "q3"])
    }

    fn run_cycle(state: &mut AttemptState, scores: [u8; 3]) -> Decision {
        state.submit_answers(vec![
            Answer::new(1, "a1"),
            Answer::new(2, "a2"),
            Answer::new(3, "a3"),
        ])
        .unwrap();
        let records = scores
            .iter()
            .enumerate()
            .map(|(i, s)| ScoreRecord::new(i + 1, *s, "feedback"))
            .collect();
        state.record_scores(records).unwrap();
        state.decide().unwrap()
    }

    #[test]
    fn settings_validation() {
        let mut settings = EngineSettings::default();
        settings.pass_threshold = 120.0;
        assert!(matches!(
            settings.validate(),
            Err(EngineError::InvalidThreshold { .. })
        ));

        let mut settings = EngineSettings::default();
        settings.max_attempts = 0;
        assert_eq!(settings.validate(), Err(EngineError::ZeroAttempts));
    }

    #[test]
    fn assessment_requires_nonempty_context() {
        let mut state = AttemptState::new(checkpoint(), EngineSettings::default()).unwrap();
        let blank = StudyContext::new("  ", ContextProvenance::LearnerNotes);

        let err = state.begin_assessment(blank, questions()).unwrap_err();
        assert_eq!(err, EngineError::EmptyContext);
        // failure leaves the attempt at Teaching, it is not silently skipped
        assert_eq!(state.phase(), Phase::Teaching);
    }

    #[test]
    fn score_count_must_match_question_count() {
        let mut state = AttemptState::new(checkpoint(), EngineSettings::default()).unwrap();
        state.begin_assessment(context(), questions()).unwrap();
        state.submit_answers(Vec::new()).unwrap();

        let err = state
            .record_scores(vec![ScoreRecord::new(1, 50, "")])
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::ScoreCountMismatch {
                questions: 3,
                records: 1
            }
        );
    }

    #[test]
    fn low_average_remediates_and_flags_gaps() {
        let mut state = AttemptState::new(checkpoint(), EngineSettings::default()).unwrap();
        state.begin_assessment(context(), questions()).unwrap();

        // [90, 40, 60] → average 63.3, below the 70 threshold
        let decision = run_cycle(&mut state, [90, 40, 60]);

        assert_eq!(decision, Decision::Remediate);
        assert_eq!(state.phase(), Phase::Remediating);
        assert!((state.average() - 63.333_333).abs() < 0.001);
        assert_eq!(
            state.gaps().iter().map(|g| g.ordinal).collect::<Vec<_>>(),
            vec![2, 3]
        );

        state
            .begin_retry("simpler explanation".to_string(), questions())
            .unwrap();
        assert_eq!(state.attempt(), 2);
        assert_eq!(state.phase(), Phase::Assessing);
        // remediation joined the reference material
        assert!(state.context().unwrap().text().contains("simpler explanation"));
    }

    #[test]
    fn passing_second_attempt_terminates_passed() {
        let mut state = AttemptState::new(checkpoint(), EngineSettings::default()).unwrap();
        state.begin_assessment(context(), questions()).unwrap();

        assert_eq!(run_cycle(&mut state, [90, 40, 60]), Decision::Remediate);
        state
            .begin_retry("try again".to_string(), questions())
            .unwrap();

        // [80, 75, 85] → average 80, passes
        assert_eq!(run_cycle(&mut state, [80, 75, 85]), Decision::Pass);
        assert_eq!(state.phase(), Phase::Passed);
        assert_eq!(state.outcome(), Some(CheckpointOutcome::Passed));
        assert!((state.average() - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn attempt_budget_exhausts_instead_of_looping() {
        let settings = EngineSettings {
            max_attempts: 2,
            ..EngineSettings::default()
        };
        let mut state = AttemptState::new(checkpoint(), settings).unwrap();
        state.begin_assessment(context(), questions()).unwrap();

        assert_eq!(run_cycle(&mut state, [10, 20, 30]), Decision::Remediate);
        state.begin_retry("again".to_string(), questions()).unwrap();

        assert_eq!(run_cycle(&mut state, [10, 20, 30]), Decision::Exhaust);
        assert_eq!(state.phase(), Phase::Exhausted);
        assert_eq!(state.outcome(), Some(CheckpointOutcome::Exhausted));
        assert_eq!(state.attempt(), 2);
    }

    #[test]
    fn terminal_within_budget_for_any_score_sequence() {
        for max_attempts in 1..=4u32 {
            let settings = EngineSettings {
                max_attempts,
                ..EngineSettings::default()
            };
            let mut state = AttemptState::new(checkpoint(), settings).unwrap();
            state.begin_assessment(context(), questions()).unwrap();

            let mut cycles = 0u32;
            loop {
                cycles += 1;
                match run_cycle(&mut state, [0, 0, 0]) {
                    Decision::Remediate => {
                        state.begin_retry("x".to_string(), questions()).unwrap();
                    }
                    Decision::Pass | Decision::Exhaust => break,
                }
            }

            assert!(cycles <= max_attempts);
            assert!(state.attempt() <= max_attempts);
            assert!(state.is_terminal());
        }
    }

    #[test]
    fn empty_answer_set_is_scored_not_rejected() {
        let mut state = AttemptState::new(checkpoint(), EngineSettings::default()).unwrap();
        state.begin_assessment(context(), questions()).unwrap();
        state.submit_answers(Vec::new()).unwrap();

        assert_eq!(state.answers().len(), 3);
        assert!(state.answers().iter().all(Answer::is_blank));
    }

    #[test]
    fn record_requires_terminal_phase() {
        let state = AttemptState::new(checkpoint(), EngineSettings::default()).unwrap();
        assert_eq!(
            state.to_record(fixed_now()).unwrap_err(),
            EngineError::NotTerminal
        );
    }

    #[test]
    fn terminal_attempt_converts_to_record() {
        let settings = EngineSettings {
            max_attempts: 1,
            ..EngineSettings::default()
        };
        let mut state = AttemptState::new(checkpoint(), settings).unwrap();
        state.begin_assessment(context(), questions()).unwrap();
        assert_eq!(run_cycle(&mut state, [10, 10, 10]), Decision::Exhaust);

        let record = state.to_record(fixed_now()).unwrap();
        assert_eq!(record.checkpoint_id, CheckpointId::new(1));
        assert_eq!(record.attempts, 1);
        assert_eq!(record.outcome, CheckpointOutcome::Exhausted);
        assert!((record.average_score - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_phase_calls_are_rejected() {
        let mut state = AttemptState::new(checkpoint(), EngineSettings::default()).unwrap();
        let err = state.submit_answers(Vec::new()).unwrap_err();
        assert_eq!(
            err,
            EngineError::WrongPhase {
                expected: Phase::Assessing,
                found: Phase::Teaching
            }
        );
    }
}
