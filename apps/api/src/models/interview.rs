use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Explanation recorded for any dimension the evaluator could not parse.
pub const NO_FEEDBACK: &str = "No feedback available";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Pending => "pending",
            InterviewStatus::InProgress => "in_progress",
            InterviewStatus::Completed => "completed",
            InterviewStatus::Cancelled => "cancelled",
        }
    }

    /// `completed` and `cancelled` accept no further rounds or mutations.
    pub fn is_terminal(&self) -> bool {
        matches!(self, InterviewStatus::Completed | InterviewStatus::Cancelled)
    }
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterviewStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InterviewStatus::Pending),
            "in_progress" => Ok(InterviewStatus::InProgress),
            "completed" => Ok(InterviewStatus::Completed),
            "cancelled" => Ok(InterviewStatus::Cancelled),
            other => Err(anyhow::anyhow!("unknown interview status '{other}'")),
        }
    }
}

/// A 1–10 rating with its one-line justification. Score 0 marks a parse miss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub score: u8,
    pub explanation: String,
}

impl DimensionScore {
    pub fn missing() -> Self {
        Self {
            score: 0,
            explanation: NO_FEEDBACK.to_string(),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.score == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEvaluation {
    pub clarity: DimensionScore,
    pub technical_accuracy: DimensionScore,
    pub language: DimensionScore,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub recommendations: Vec<String>,
    pub overall_score: u8,
}

impl AnswerEvaluation {
    /// True when any score failed to parse. The round is still kept.
    pub fn is_degraded(&self) -> bool {
        self.overall_score == 0
            || self.clarity.is_missing()
            || self.technical_accuracy.is_missing()
            || self.language.is_missing()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HiringDecision {
    #[serde(rename = "STRONG HIRE")]
    StrongHire,
    #[serde(rename = "HIRE")]
    Hire,
    #[serde(rename = "CONSIDER")]
    Consider,
    #[serde(rename = "DO NOT HIRE")]
    DoNotHire,
}

impl HiringDecision {
    pub const ALL: [HiringDecision; 4] = [
        HiringDecision::StrongHire,
        HiringDecision::Hire,
        HiringDecision::Consider,
        HiringDecision::DoNotHire,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HiringDecision::StrongHire => "STRONG HIRE",
            HiringDecision::Hire => "HIRE",
            HiringDecision::Consider => "CONSIDER",
            HiringDecision::DoNotHire => "DO NOT HIRE",
        }
    }
}

impl fmt::Display for HiringDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HiringDecision {
    type Err = String;

    /// Accepts only the four literal decisions; anything else is returned as the error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HiringDecision::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiringRecommendation {
    pub decision: HiringDecision,
    pub justification: String,
}

/// Final verdict over all rounds. Only produced by the validating parser in
/// `interview::overall_evaluator`, so every instance satisfies the template rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallEvaluation {
    pub technical_proficiency: DimensionScore,
    pub communication_skills: DimensionScore,
    pub problem_solving_ability: DimensionScore,
    pub strengths: Vec<String>,
    pub areas_for_growth: Vec<String>,
    pub recommendations: Vec<String>,
    pub hiring_recommendation: HiringRecommendation,
    pub overall_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRound {
    pub question: String,
    pub answer: String,
    pub evaluation: AnswerEvaluation,
    pub timestamp: DateTime<Utc>,
}

/// Root aggregate. Owns its rounds and overall evaluation outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    pub id: Uuid,
    pub owner_id: String,
    pub job_role: String,
    pub resume_text: String,
    pub status: InterviewStatus,
    pub questions: Vec<QuestionRound>,
    pub overall_evaluation: Option<OverallEvaluation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Interview {
    pub fn new(owner_id: &str, job_role: &str, resume_text: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            job_role: job_role.to_string(),
            resume_text,
            status: InterviewStatus::Pending,
            questions: Vec::new(),
            overall_evaluation: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn last_round(&self) -> Option<&QuestionRound> {
        self.questions.last()
    }
}

/// Row shape of the `interviews` table. Rounds and the overall evaluation are JSONB.
#[derive(Debug, Clone, FromRow)]
pub struct InterviewRow {
    pub id: Uuid,
    pub owner_id: String,
    pub job_role: String,
    pub resume_text: String,
    pub status: String,
    pub questions: Json<Vec<QuestionRound>>,
    pub overall_evaluation: Option<Json<OverallEvaluation>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<InterviewRow> for Interview {
    type Error = anyhow::Error;

    fn try_from(row: InterviewRow) -> Result<Self, Self::Error> {
        Ok(Interview {
            id: row.id,
            owner_id: row.owner_id,
            job_role: row.job_role,
            resume_text: row.resume_text,
            status: row.status.parse()?,
            questions: row.questions.0,
            overall_evaluation: row.overall_evaluation.map(|e| e.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
