//! End-to-end progression runs against deterministic fake delegates.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use services::{
    AnswerScorer, AttemptStatus, ContextError, ContextSource, DelegateError, ProgressionService,
    QuestionGenerator, RemediationDelegate, RemediationService, ScoredAnswer, ScoringDelegate,
};
use storage::{InMemoryProgressStore, ProgressRepository};
use tutor_core::engine::{EngineSettings, Phase};
use tutor_core::model::{
    Answer, Checkpoint, CheckpointId, CheckpointOutcome, ContextProvenance, Curriculum, Gap,
    StudyContext,
};
use tutor_core::time::fixed_clock;

// ─── Fakes ─────────────────────────────────────────────────────────────────────

struct FixedContext;

#[async_trait]
impl ContextSource for FixedContext {
    async fn fetch(&self, checkpoint: &Checkpoint) -> Result<StudyContext, ContextError> {
        Ok(StudyContext::new(
            format!("reference material for {}", checkpoint.topic()),
            ContextProvenance::Retrieved,
        ))
    }
}

struct NoContext;

#[async_trait]
impl ContextSource for NoContext {
    async fn fetch(&self, _checkpoint: &Checkpoint) -> Result<StudyContext, ContextError> {
        Err(ContextError::Unavailable)
    }
}

struct ThreeQuestions;

#[async_trait]
impl QuestionGenerator for ThreeQuestions {
    async fn generate(
        &self,
        topic: &str,
        _objectives: &[String],
        _context: &str,
    ) -> Result<Vec<String>, DelegateError> {
        Ok((1..=3)
            .map(|i| format!("{topic} comprehension question {i}"))
            .collect())
    }
}

/// Hands out one scripted score list per assessment cycle.
struct ScriptedScorer {
    rounds: Mutex<Vec<Vec<u8>>>,
    calls: AtomicUsize,
}

impl ScriptedScorer {
    fn new(rounds: Vec<Vec<u8>>) -> Self {
        Self {
            rounds: Mutex::new(rounds),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ScoringDelegate for ScriptedScorer {
    async fn score(
        &self,
        _question: &str,
        _answer: &str,
        _context: &str,
    ) -> Result<ScoredAnswer, DelegateError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let rounds = self.rounds.lock().unwrap();
        let round = call / 3;
        let slot = call % 3;
        let score = rounds
            .get(round)
            .and_then(|scores| scores.get(slot))
            .copied()
            .unwrap_or(0);
        Ok(ScoredAnswer {
            score,
            feedback: format!("scored {score}"),
        })
    }
}

struct CountingRemediator {
    calls: AtomicUsize,
}

impl CountingRemediator {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RemediationDelegate for CountingRemediator {
    async fn explain(
        &self,
        gaps: &[Gap],
        _context: &str,
        topic: &str,
    ) -> Result<String, DelegateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "simpler take on {topic}, focusing on {} concepts",
            gaps.len()
        ))
    }
}

// ─── Fixtures ──────────────────────────────────────────────────────────────────

fn curriculum() -> Curriculum {
    Curriculum::new(vec![
        Checkpoint::new(
            CheckpointId::new(1),
            "Tree Terminology",
            vec![
                "Define Root, Node, and Leaf".to_string(),
                "Calculate Height and Depth".to_string(),
            ],
            None,
        )
        .unwrap(),
        Checkpoint::new(
            CheckpointId::new(2),
            "Binary Search Trees",
            vec!["Explain BST properties".to_string()],
            None,
        )
        .unwrap(),
    ])
    .unwrap()
}

struct Harness {
    service: ProgressionService,
    store: Arc<InMemoryProgressStore>,
    scorer_delegate: Arc<ScriptedScorer>,
    remediator: Arc<CountingRemediator>,
}

fn harness(rounds: Vec<Vec<u8>>, settings: EngineSettings) -> Harness {
    build_harness(Arc::new(FixedContext), rounds, settings)
}

fn build_harness(
    context: Arc<dyn ContextSource>,
    rounds: Vec<Vec<u8>>,
    settings: EngineSettings,
) -> Harness {
    let store = Arc::new(InMemoryProgressStore::new());
    let scorer_delegate = Arc::new(ScriptedScorer::new(rounds));
    let remediator = Arc::new(CountingRemediator::new());

    let service = ProgressionService::new(
        fixed_clock(),
        curriculum(),
        context,
        Arc::new(ThreeQuestions),
        AnswerScorer::new(Arc::clone(&scorer_delegate) as Arc<dyn ScoringDelegate>),
        RemediationService::new(Arc::clone(&remediator) as Arc<dyn RemediationDelegate>),
        Arc::clone(&store) as Arc<dyn ProgressRepository>,
        settings,
    )
    .unwrap();

    Harness {
        service,
        store,
        scorer_delegate,
        remediator,
    }
}

fn answers() -> Vec<Answer> {
    vec![
        Answer::new(1, "the root is the topmost node"),
        Answer::new(2, "a leaf has no children"),
        Answer::new(3, "height counts edges down from the root"),
    ]
}

// ─── Scenarios ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn passing_first_try_records_and_advances() {
    let h = harness(vec![vec![80, 75, 85]], EngineSettings::default());

    let mut state = h.service.start_next().await.unwrap().unwrap();
    assert_eq!(state.phase(), Phase::Assessing);
    assert_eq!(state.questions().len(), 3);

    let progress = h.service.submit_answers(&mut state, answers()).await.unwrap();

    assert!((progress.average_score - 80.0).abs() < f64::EPSILON);
    assert_eq!(
        progress.status,
        AttemptStatus::Passed {
            curriculum_complete: false
        }
    );

    let cursor = h.store.load().await.unwrap();
    assert_eq!(cursor.cursor, 1);
    assert_eq!(cursor.history.len(), 1);
    assert_eq!(cursor.history[0].outcome, CheckpointOutcome::Passed);
    assert_eq!(h.remediator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_round_remediates_then_passes() {
    // [90,40,60] → 63.3 remediate with gaps {2,3}; [80,75,85] → 80 pass
    let h = harness(
        vec![vec![90, 40, 60], vec![80, 75, 85]],
        EngineSettings::default(),
    );

    let mut state = h.service.start_next().await.unwrap().unwrap();
    let first = h.service.submit_answers(&mut state, answers()).await.unwrap();

    assert!((first.average_score - 63.333_333).abs() < 0.001);
    let AttemptStatus::Retry {
        gaps,
        remediation,
        attempt,
    } = &first.status
    else {
        panic!("expected retry, got {:?}", first.status);
    };
    assert_eq!(gaps.iter().map(|g| g.ordinal).collect::<Vec<_>>(), vec![2, 3]);
    assert_eq!(*attempt, 2);
    assert!(remediation.contains("simpler take"));
    assert_eq!(h.remediator.calls.load(Ordering::SeqCst), 1);

    // remediation text joined the reference material for the retry
    assert!(state.context().unwrap().text().contains("simpler take"));
    assert_eq!(state.phase(), Phase::Assessing);

    // nothing recorded yet
    assert_eq!(h.store.load().await.unwrap().cursor, 0);

    let second = h.service.submit_answers(&mut state, answers()).await.unwrap();
    assert!((second.average_score - 80.0).abs() < f64::EPSILON);
    assert_eq!(
        second.status,
        AttemptStatus::Passed {
            curriculum_complete: false
        }
    );

    let cursor = h.store.load().await.unwrap();
    assert_eq!(cursor.cursor, 1);
    assert_eq!(cursor.history[0].attempts, 2);
}

#[tokio::test]
async fn exhausted_budget_still_advances() {
    let settings = EngineSettings {
        max_attempts: 2,
        ..EngineSettings::default()
    };
    let h = harness(vec![vec![10, 20, 30], vec![15, 25, 35]], settings);

    let mut state = h.service.start_next().await.unwrap().unwrap();
    let first = h.service.submit_answers(&mut state, answers()).await.unwrap();
    assert!(matches!(first.status, AttemptStatus::Retry { .. }));

    let second = h.service.submit_answers(&mut state, answers()).await.unwrap();
    assert_eq!(
        second.status,
        AttemptStatus::Exhausted {
            curriculum_complete: false
        }
    );

    // non-blocking policy: the learner moves forward anyway
    let cursor = h.store.load().await.unwrap();
    assert_eq!(cursor.cursor, 1);
    assert_eq!(cursor.history[0].outcome, CheckpointOutcome::Exhausted);
    assert_eq!(cursor.history[0].attempts, 2);

    let next = h.service.next_checkpoint().await.unwrap().unwrap();
    assert_eq!(next.id(), CheckpointId::new(2));
}

#[tokio::test]
async fn unavailable_context_halts_without_skipping() {
    let h = build_harness(
        Arc::new(NoContext),
        vec![vec![80, 80, 80]],
        EngineSettings::default(),
    );

    let err = h.service.start_next().await.unwrap_err();
    assert!(matches!(
        err,
        services::ProgressionError::Context(ContextError::Unavailable)
    ));

    // the checkpoint was not skipped
    let cursor = h.store.load().await.unwrap();
    assert_eq!(cursor.cursor, 0);
    assert!(cursor.history.is_empty());
}

#[tokio::test]
async fn blank_answers_never_reach_the_scoring_delegate() {
    let h = harness(vec![vec![90, 90, 90]], EngineSettings::default());

    let mut state = h.service.start_next().await.unwrap().unwrap();
    let progress = h.service.submit_answers(&mut state, Vec::new()).await.unwrap();

    assert_eq!(h.scorer_delegate.calls.load(Ordering::SeqCst), 0);
    assert_eq!(progress.average_score, 0.0);
    assert!(progress.records.iter().all(|r| r.score == 0));
    assert!(matches!(progress.status, AttemptStatus::Retry { .. }));
}

#[tokio::test]
async fn whole_curriculum_runs_to_completion() {
    let h = harness(
        vec![vec![90, 90, 90], vec![75, 70, 95]],
        EngineSettings::default(),
    );

    let mut first = h.service.start_next().await.unwrap().unwrap();
    let outcome = h.service.submit_answers(&mut first, answers()).await.unwrap();
    assert_eq!(
        outcome.status,
        AttemptStatus::Passed {
            curriculum_complete: false
        }
    );

    let mut second = h.service.start_next().await.unwrap().unwrap();
    assert_eq!(second.checkpoint().id(), CheckpointId::new(2));
    let outcome = h.service.submit_answers(&mut second, answers()).await.unwrap();
    assert_eq!(
        outcome.status,
        AttemptStatus::Passed {
            curriculum_complete: true
        }
    );

    // cursor sits past the last checkpoint; no further teaching happens
    let cursor = h.store.load().await.unwrap();
    assert_eq!(cursor.cursor, 2);
    assert!(cursor.is_complete(h.service.curriculum().len()));
    assert!(h.service.start_next().await.unwrap().is_none());
}

#[tokio::test]
async fn scripted_scores_surface_in_history() {
    let h = harness(vec![vec![60, 70, 80]], EngineSettings::default());

    let mut state = h.service.start_next().await.unwrap().unwrap();
    let progress = h.service.submit_answers(&mut state, answers()).await.unwrap();

    assert!((progress.average_score - 70.0).abs() < f64::EPSILON);
    assert_eq!(
        progress.status,
        AttemptStatus::Passed {
            curriculum_complete: false
        }
    );
    let cursor = h.store.load().await.unwrap();
    assert!((cursor.history[0].average_score - 70.0).abs() < f64::EPSILON);
}
