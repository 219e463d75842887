#![forbid(unsafe_code)]

pub mod chunk;
pub mod context;
pub mod delegate;
pub mod error;
pub mod llm;
pub mod progression;
pub mod question;
pub mod remediation;
pub mod scoring;

pub use tutor_core::Clock;

pub use context::{NoSearch, NotesContextSource, NotesThenSearchSource, SearchContextSource};
pub use delegate::{
    ContextSource, QuestionGenerator, RemediationDelegate, ScoredAnswer, ScoringDelegate,
    SearchBackend,
};
pub use error::{ContextError, DelegateError, LlmError, ProgressionError};
pub use llm::{ChatClient, ChatConfig};
pub use progression::{AttemptProgress, AttemptStatus, ProgressionService};
pub use question::LlmQuestionGenerator;
pub use remediation::{LlmRemediationDelegate, RemediationService};
pub use scoring::{AnswerScorer, LlmScoringDelegate};
