//! Overall evaluation: the one-shot hire/no-hire verdict over every round.
//!
//! Strict by contract: unlike per-answer evaluation, any template violation fails
//! the whole call with `AppError::MalformedEvaluation` listing every rule that was
//! broken. Nothing half-formed is ever returned or persisted.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{error, info};

use crate::errors::AppError;
use crate::interview::parsing::{
    bullet_section, capture_score, capture_scored_line, is_valid_rating, EXPECTED_BULLETS,
};
use crate::interview::prompts::{
    fill_template, OVERALL_EVALUATION_PROMPT_TEMPLATE, ROUND_SUMMARY_TEMPLATE,
};
use crate::llm_client::prompts::TEMPLATE_DISCIPLINE;
use crate::llm_client::LanguageModel;
use crate::models::interview::{
    DimensionScore, HiringDecision, HiringRecommendation, OverallEvaluation, QuestionRound,
};

static TECHNICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| scored_pattern("Overall Technical Proficiency"));
static COMMUNICATION_RE: LazyLock<Regex> =
    LazyLock::new(|| scored_pattern("Communication Skills"));
static PROBLEM_SOLVING_RE: LazyLock<Regex> =
    LazyLock::new(|| scored_pattern("Problem-Solving Ability"));
static DECISION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:Hiring Recommendation):[ \t]*([^\n]*)").expect("valid regex")
});
static JUSTIFICATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:Hiring Recommendation):[^\n]*\r?\n[ \t]*-[ \t]*(?i:Justification):[ \t]*([^\n]+)")
        .expect("valid regex")
});
static OVERALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:Overall Interview Score)[^:\n]*:[ \t]*(\d{1,2})\b").expect("valid regex")
});

/// `<label> (anything): N` followed by a `- Brief explanation:` line; label is case-insensitive.
fn scored_pattern(label: &str) -> Regex {
    Regex::new(&format!(
        r"(?i:{})[^:\n]*:[ \t]*(\d{{1,2}})\b[^\n]*\r?\n[ \t]*-[ \t]*(?i:Brief explanation):[ \t]*([^\n]+)",
        regex::escape(label)
    ))
    .expect("valid regex")
}

#[async_trait]
pub trait OverallEvaluator: Send + Sync {
    async fn evaluate_overall(
        &self,
        rounds: &[QuestionRound],
        job_role: &str,
    ) -> Result<OverallEvaluation, AppError>;
}

pub struct TemplateOverallEvaluator {
    llm: Arc<dyn LanguageModel>,
}

impl TemplateOverallEvaluator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl OverallEvaluator for TemplateOverallEvaluator {
    async fn evaluate_overall(
        &self,
        rounds: &[QuestionRound],
        job_role: &str,
    ) -> Result<OverallEvaluation, AppError> {
        let prompt = build_overall_prompt(rounds, job_role)?;
        let raw = self.llm.generate_content(&prompt).await?;

        match parse_overall_evaluation(&raw) {
            Ok(evaluation) => {
                info!(
                    "Overall evaluation: decision={}, score={}",
                    evaluation.hiring_recommendation.decision, evaluation.overall_score
                );
                Ok(evaluation)
            }
            Err(violations) => {
                error!(
                    "Overall evaluation failed validation: {}; raw response: {:?}",
                    violations.join("; "),
                    raw
                );
                Err(AppError::MalformedEvaluation(violations))
            }
        }
    }
}

pub fn build_overall_prompt(rounds: &[QuestionRound], job_role: &str) -> Result<String, AppError> {
    let mut summaries = Vec::with_capacity(rounds.len());
    for (index, round) in rounds.iter().enumerate() {
        let evaluation_json = serde_json::to_string(&round.evaluation).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to serialize evaluation: {e}"))
        })?;
        let n = (index + 1).to_string();
        summaries.push(fill_template(
            ROUND_SUMMARY_TEMPLATE,
            &[
                ("n", &n),
                ("evaluation_json", &evaluation_json),
                ("question", &round.question),
                ("answer", &round.answer),
            ],
        ));
    }

    let round_count = rounds.len().to_string();
    let rounds = summaries.join("\n");
    Ok(fill_template(
        OVERALL_EVALUATION_PROMPT_TEMPLATE,
        &[
            ("template_discipline", TEMPLATE_DISCIPLINE),
            ("job_role", job_role),
            ("round_count", &round_count),
            ("rounds", &rounds),
        ],
    ))
}

/// Parses and validates the overall template.
///
/// Returns every violated rule rather than stopping at the first one.
pub fn parse_overall_evaluation(text: &str) -> Result<OverallEvaluation, Vec<String>> {
    let mut violations = Vec::new();

    let technical_proficiency =
        checked_dimension(&TECHNICAL_RE, text, "technical proficiency", &mut violations);
    let communication_skills =
        checked_dimension(&COMMUNICATION_RE, text, "communication skills", &mut violations);
    let problem_solving_ability =
        checked_dimension(&PROBLEM_SOLVING_RE, text, "problem-solving", &mut violations);

    let strengths = checked_bullets(text, "Key Strengths", "strengths", &mut violations);
    let areas_for_growth =
        checked_bullets(text, "Areas for Growth", "areas for growth", &mut violations);
    let recommendations = checked_bullets(
        text,
        "Final Recommendations",
        "recommendations",
        &mut violations,
    );

    let decision = match DECISION_RE.captures(text).and_then(|c| c.get(1)) {
        None => {
            violations.push("Missing hiring recommendation".to_string());
            None
        }
        Some(m) => match clean_decision(m.as_str()).parse::<HiringDecision>() {
            Ok(decision) => Some(decision),
            Err(raw) => {
                violations.push(format!("Invalid hiring decision: {raw}"));
                None
            }
        },
    };
    let justification = JUSTIFICATION_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|j| !j.is_empty());
    if justification.is_none() {
        violations.push("Missing hiring justification".to_string());
    }

    let overall_score = match capture_score(&OVERALL_RE, text) {
        Some(score) if is_valid_rating(score) => Some(score as u8),
        Some(score) => {
            violations.push(format!("Invalid overall score: {score}"));
            None
        }
        None => {
            violations.push("Missing overall score".to_string());
            None
        }
    };

    match (
        technical_proficiency,
        communication_skills,
        problem_solving_ability,
        decision,
        justification,
        overall_score,
    ) {
        (Some(tp), Some(cs), Some(ps), Some(decision), Some(justification), Some(overall))
            if violations.is_empty() =>
        {
            Ok(OverallEvaluation {
                technical_proficiency: tp,
                communication_skills: cs,
                problem_solving_ability: ps,
                strengths,
                areas_for_growth,
                recommendations,
                hiring_recommendation: HiringRecommendation {
                    decision,
                    justification,
                },
                overall_score: overall,
            })
        }
        _ => Err(violations),
    }
}

fn checked_dimension(
    re: &Regex,
    text: &str,
    name: &str,
    violations: &mut Vec<String>,
) -> Option<DimensionScore> {
    match capture_scored_line(re, text) {
        Some((score, explanation)) if is_valid_rating(score) => Some(DimensionScore {
            score: score as u8,
            explanation,
        }),
        Some((score, _)) => {
            violations.push(format!("Invalid {name} score: {score}"));
            None
        }
        None => {
            violations.push(format!("Missing {name} score"));
            None
        }
    }
}

fn checked_bullets(
    text: &str,
    label: &str,
    name: &str,
    violations: &mut Vec<String>,
) -> Vec<String> {
    let bullets = bullet_section(text, label);
    if bullets.len() != EXPECTED_BULLETS {
        violations.push(format!(
            "Expected {EXPECTED_BULLETS} {name}, got {}",
            bullets.len()
        ));
    }
    bullets
}

/// Strips decoration models like to add around the decision (`[HIRE]`, `**HIRE**`, `HIRE.`).
fn clean_decision(raw: &str) -> &str {
    raw.trim()
        .trim_matches(|c: char| matches!(c, '[' | ']' | '*' | '"' | '\''))
        .trim_end_matches('.')
        .trim()
}
