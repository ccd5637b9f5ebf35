//! Answer evaluation: scores one transcribed answer against its question.
//!
//! Tolerant by contract: a dimension the model fails to format is recorded as
//! `0 / "No feedback available"` and the round is still kept. A zero score is the
//! caller's signal that the evaluation is degraded.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::interview::parsing::{bullet_section, capture_score, capture_scored_line, is_valid_rating};
use crate::interview::prompts::{fill_template, ANSWER_EVALUATION_PROMPT_TEMPLATE};
use crate::llm_client::prompts::TEMPLATE_DISCIPLINE;
use crate::llm_client::LanguageModel;
use crate::models::interview::{AnswerEvaluation, DimensionScore};

static CLARITY_RE: LazyLock<Regex> = LazyLock::new(|| scored_pattern("Clarity Score"));
static TECHNICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| scored_pattern("Technical Accuracy Score"));
static LANGUAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| scored_pattern("Language & Communication Score"));
static OVERALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Overall Score \(1-10\):[ \t]*(\d{1,2})\b").expect("valid regex")
});

/// `<label> (1-10): N` followed by a `- Brief explanation:` line.
fn scored_pattern(label: &str) -> Regex {
    Regex::new(&format!(
        r"{} \(1-10\):[ \t]*(\d{{1,2}})\b[^\n]*\r?\n[ \t]*-[ \t]*Brief explanation:[ \t]*([^\n]+)",
        regex::escape(label)
    ))
    .expect("valid regex")
}

/// Seam for swapping the prompt-and-parser pair (e.g. for structured model output)
/// without touching the session state machine.
#[async_trait]
pub trait AnswerEvaluator: Send + Sync {
    async fn evaluate(&self, question: &str, transcript: &str)
        -> Result<AnswerEvaluation, AppError>;
}

/// Default evaluator: fixed plain-text template, regex parser.
pub struct TemplateAnswerEvaluator {
    llm: Arc<dyn LanguageModel>,
}

impl TemplateAnswerEvaluator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl AnswerEvaluator for TemplateAnswerEvaluator {
    async fn evaluate(
        &self,
        question: &str,
        transcript: &str,
    ) -> Result<AnswerEvaluation, AppError> {
        let prompt = build_answer_prompt(question, transcript);
        let raw = self.llm.generate_content(&prompt).await?;

        let evaluation = parse_answer_evaluation(&raw);
        if evaluation.is_degraded() {
            warn!(
                "Answer evaluation has unparsed scores (clarity={}, technical={}, language={}, overall={}); raw response: {:?}",
                evaluation.clarity.score,
                evaluation.technical_accuracy.score,
                evaluation.language.score,
                evaluation.overall_score,
                raw
            );
        } else {
            debug!("Answer evaluated: overall_score={}", evaluation.overall_score);
        }
        Ok(evaluation)
    }
}

pub fn build_answer_prompt(question: &str, transcript: &str) -> String {
    fill_template(
        ANSWER_EVALUATION_PROMPT_TEMPLATE,
        &[
            ("template_discipline", TEMPLATE_DISCIPLINE),
            ("question", question),
            ("answer", transcript),
        ],
    )
}

/// Parses the answer template. Never fails; misses become zero scores.
pub fn parse_answer_evaluation(text: &str) -> AnswerEvaluation {
    AnswerEvaluation {
        clarity: dimension(&CLARITY_RE, text),
        technical_accuracy: dimension(&TECHNICAL_RE, text),
        language: dimension(&LANGUAGE_RE, text),
        strengths: bullet_section(text, "Key Strengths"),
        areas_for_improvement: bullet_section(text, "Areas to Improve"),
        recommendations: bullet_section(text, "Recommendations"),
        overall_score: capture_score(&OVERALL_RE, text)
            .filter(|s| is_valid_rating(*s))
            .map(|s| s as u8)
            .unwrap_or(0),
    }
}

fn dimension(re: &Regex, text: &str) -> DimensionScore {
    match capture_scored_line(re, text) {
        Some((score, explanation)) if is_valid_rating(score) => DimensionScore {
            score: score as u8,
            explanation,
        },
        _ => DimensionScore::missing(),
    }
}
