use std::sync::Arc;

use tracing::debug;

use crate::errors::{AppError, Capability, UpstreamError};
use crate::interview::prompts::{fill_template, FOLLOW_UP_PROMPT_TEMPLATE, QUESTION_PROMPT_TEMPLATE};
use crate::llm_client::LanguageModel;
use crate::models::interview::QuestionRound;

/// What the next question should build on.
#[derive(Debug, Clone, Copy)]
pub enum QuestionContext<'a> {
    /// First question of a new interview.
    Opening,
    /// A new question that does not build on the previous answer.
    Fresh,
    /// Builds on (or redirects away from) the last answered round.
    FollowUp(&'a QuestionRound),
}

impl QuestionContext<'_> {
    fn label(&self) -> &'static str {
        match self {
            QuestionContext::Opening => "opening",
            QuestionContext::Fresh => "fresh",
            QuestionContext::FollowUp(_) => "follow-up",
        }
    }
}

pub struct QuestionGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl QuestionGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    pub async fn generate(
        &self,
        resume_text: &str,
        job_role: &str,
        context: QuestionContext<'_>,
    ) -> Result<String, AppError> {
        let prompt = build_question_prompt(resume_text, job_role, context)?;
        let raw = self.llm.generate_content(&prompt).await?;
        let question = raw.trim();
        if question.is_empty() {
            return Err(UpstreamError::EmptyResponse {
                service: Capability::LanguageModel,
            }
            .into());
        }
        debug!("Generated {} question ({} chars)", context.label(), question.len());
        Ok(question.to_string())
    }
}

pub fn build_question_prompt(
    resume_text: &str,
    job_role: &str,
    context: QuestionContext<'_>,
) -> Result<String, AppError> {
    match context {
        QuestionContext::Opening | QuestionContext::Fresh => Ok(fill_template(
            QUESTION_PROMPT_TEMPLATE,
            &[("job_role", job_role), ("resume_text", resume_text)],
        )),
        QuestionContext::FollowUp(round) => {
            let evaluation_json = serde_json::to_string(&round.evaluation).map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to serialize evaluation: {e}"))
            })?;
            Ok(fill_template(
                FOLLOW_UP_PROMPT_TEMPLATE,
                &[
                    ("job_role", job_role),
                    ("previous_question", &round.question),
                    ("evaluation_json", &evaluation_json),
                    ("answer", &round.answer),
                    ("resume_text", resume_text),
                ],
            ))
        }
    }
}
