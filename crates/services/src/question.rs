use async_trait::async_trait;
use tracing::{debug, warn};

use crate::chunk::truncate_chars;
use crate::delegate::QuestionGenerator;
use crate::error::DelegateError;
use crate::llm::ChatClient;

/// Prompt context cap; generation backends have bounded windows and cost
/// scales with input size.
const MAX_PROMPT_CONTEXT: usize = 3000;

/// Chat-backed question generator.
///
/// Always yields usable questions: when the backend is disabled, fails, or
/// returns nothing parseable, the checkpoint objectives themselves stand in
/// as questions (the learner restates each objective in their own words).
pub struct LlmQuestionGenerator {
    chat: ChatClient,
    count: usize,
}

impl LlmQuestionGenerator {
    #[must_use]
    pub fn new(chat: ChatClient, count: usize) -> Self {
        Self { chat, count }
    }

    fn prompt(topic: &str, objectives: &[String], context: &str) -> String {
        let objectives_text = objectives
            .iter()
            .map(|o| format!("- {o}"))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are a tutor preparing assessment questions.\n\
             \n\
             Topic:\n{topic}\n\
             \n\
             Learning objectives:\n{objectives_text}\n\
             \n\
             Context:\n\"\"\"{context}\"\"\"\n\
             \n\
             Task:\n\
             Generate clear, simple questions that test understanding of the topic.\n\
             Return ONLY the questions, each on a new line, as a numbered list.\n\
             Do NOT include the answers.\n\
             Do NOT ask for numeric calculations or for writing or running code.",
            context = truncate_chars(context, MAX_PROMPT_CONTEXT),
        )
    }
}

#[async_trait]
impl QuestionGenerator for LlmQuestionGenerator {
    async fn generate(
        &self,
        topic: &str,
        objectives: &[String],
        context: &str,
    ) -> Result<Vec<String>, DelegateError> {
        if !self.chat.enabled() {
            debug!(topic, "chat backend disabled, falling back to objectives");
            return Ok(ensure_question_count(Vec::new(), objectives, self.count));
        }

        let prompt = Self::prompt(topic, objectives, context);
        let texts = match self.chat.generate(&prompt).await {
            Ok(raw) => parse_questions(&raw),
            Err(err) => {
                warn!(topic, error = %err, "question generation failed, using objectives");
                Vec::new()
            }
        };

        Ok(ensure_question_count(texts, objectives, self.count))
    }
}

/// Pull question-looking lines out of a numbered or bulleted response.
#[must_use]
pub fn parse_questions(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(|c: char| {
                    c.is_ascii_digit() || matches!(c, '.' | ')' | '-' | '*' | ' ')
                })
                .trim()
        })
        .filter(|q| q.len() > 10)
        .map(str::to_string)
        .collect()
}

/// Force the list to exactly `count` questions: truncate overflow, pad any
/// shortfall from the checkpoint objectives.
#[must_use]
pub fn ensure_question_count(
    mut questions: Vec<String>,
    objectives: &[String],
    count: usize,
) -> Vec<String> {
    let mut next_objective = 0;
    while questions.len() < count && !objectives.is_empty() {
        questions.push(objectives[next_objective % objectives.len()].clone());
        next_objective += 1;
    }
    questions.truncate(count);
    questions
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
