use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use tutor_core::model::{Gap, StudyContext};

use crate::chunk::truncate_chars;
use crate::delegate::RemediationDelegate;
use crate::error::DelegateError;
use crate::llm::ChatClient;

/// Context handed to the delegate is bounded: generation backends have
/// limited windows and cost scales with input size.
const MAX_CONTEXT_CHARS: usize = 1500;

/// Returned without any backend call when there is nothing to remediate.
pub const NO_GAPS_MESSAGE: &str =
    "No specific gaps identified. Review the material and try again.";

const RETRY_MESSAGE: &str = "The explanation could not be generated right now. \
     Re-read the study material and retry the assessment.";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Produces the simplified re-explanation for a retry cycle.
///
/// Always returns learner-safe text: an empty gap list short-circuits to a
/// fixed message, and a failing or timed-out delegate yields a retry hint
/// instead of an error.
pub struct RemediationService {
    delegate: Arc<dyn RemediationDelegate>,
    timeout: Duration,
}

impl RemediationService {
    #[must_use]
    pub fn new(delegate: Arc<dyn RemediationDelegate>) -> Self {
        Self {
            delegate,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound the delegate call; a timeout counts as a delegate failure.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn explain(&self, gaps: &[Gap], context: &StudyContext, topic: &str) -> String {
        if gaps.is_empty() {
            return NO_GAPS_MESSAGE.to_string();
        }

        let bounded = truncate_chars(context.text(), MAX_CONTEXT_CHARS);
        let call = self.delegate.explain(gaps, bounded, topic);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(text)) if !text.trim().is_empty() => text,
            Ok(Ok(_)) => {
                warn!(topic, "remediation delegate returned empty text");
                RETRY_MESSAGE.to_string()
            }
            Ok(Err(err)) => {
                warn!(topic, error = %err, "remediation delegate failed");
                RETRY_MESSAGE.to_string()
            }
            Err(_) => {
                warn!(topic, "remediation delegate timed out");
                RETRY_MESSAGE.to_string()
            }
        }
    }
}

/// Chat-backed Feynman-style explainer.
pub struct LlmRemediationDelegate {
    chat: ChatClient,
}

impl LlmRemediationDelegate {
    #[must_use]
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }

    fn prompt(gaps: &[Gap], context: &str, topic: &str) -> String {
        let gaps_text = gaps
            .iter()
            .map(|gap| format!("- {}", gap.concept))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are a teacher using the Feynman technique: explain in the simplest \
             possible way, with everyday analogies, no jargon, small digestible steps, \
             as if teaching a curious 12-year-old.\n\
             \n\
             TOPIC: {topic}\n\
             \n\
             STUDY MATERIAL (for reference):\n{context}\n\
             \n\
             CONCEPTS THE STUDENT STRUGGLED WITH:\n{gaps_text}\n\
             \n\
             Write a simplified explanation that addresses these specific concepts. \
             Do not provide answers to assessment questions, just the explanation."
        )
    }
}

#[async_trait]
impl RemediationDelegate for LlmRemediationDelegate {
    async fn explain(
        &self,
        gaps: &[Gap],
        context: &str,
        topic: &str,
    ) -> Result<String, DelegateError> {
        let prompt = Self::prompt(gaps, context, topic);
        Ok(self.chat.generate(&prompt).await?)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
