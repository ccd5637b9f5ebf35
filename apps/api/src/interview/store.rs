use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::interview::{
    Interview, InterviewRow, InterviewStatus, OverallEvaluation, QuestionRound,
};

/// Result of an optimistic round append.
#[derive(Debug)]
pub enum AppendOutcome {
    Appended(Interview),
    NotFound,
    /// The interview changed underneath us: round count moved or it became terminal.
    Conflict,
}

/// Persistence seam for interviews. Rounds are only ever appended, never edited.
#[async_trait]
pub trait InterviewStore: Send + Sync {
    async fn create(&self, interview: &Interview) -> Result<(), AppError>;

    async fn find(&self, id: Uuid) -> Result<Option<Interview>, AppError>;

    /// Newest first.
    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Interview>, AppError>;

    /// Moves the interview to `to` only while its status is one of `from`.
    /// Returns `None` if it is missing or has moved to any other status.
    async fn set_status(
        &self,
        id: Uuid,
        from: &[InterviewStatus],
        to: InterviewStatus,
    ) -> Result<Option<Interview>, AppError>;

    /// Appends `round` only if the interview still holds `expected_rounds` rounds
    /// and is not terminal. Moves a pending interview to `in_progress`.
    async fn append_round(
        &self,
        id: Uuid,
        expected_rounds: usize,
        round: &QuestionRound,
    ) -> Result<AppendOutcome, AppError>;

    /// Records the overall evaluation and marks the interview `completed`.
    /// Returns `None` if the interview is missing, terminal, or already evaluated.
    async fn complete(
        &self,
        id: Uuid,
        evaluation: &OverallEvaluation,
    ) -> Result<Option<Interview>, AppError>;
}

pub struct PgInterviewStore {
    pool: PgPool,
}

impl PgInterviewStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InterviewStore for PgInterviewStore {
    async fn create(&self, interview: &Interview) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO interviews
                (id, owner_id, job_role, resume_text, status, questions,
                 overall_evaluation, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(interview.id)
        .bind(&interview.owner_id)
        .bind(&interview.job_role)
        .bind(&interview.resume_text)
        .bind(interview.status.as_str())
        .bind(Json(&interview.questions))
        .bind(interview.overall_evaluation.as_ref().map(Json))
        .bind(interview.created_at)
        .bind(interview.updated_at)
        .execute(&self.pool)
        .await?;

        info!("Inserted interview {} for owner {}", interview.id, interview.owner_id);
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Interview>, AppError> {
        let row: Option<InterviewRow> = sqlx::query_as("SELECT * FROM interviews WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Interview::try_from).transpose()?)
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Interview>, AppError> {
        let rows: Vec<InterviewRow> = sqlx::query_as(
            "SELECT * FROM interviews WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(Interview::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?)
    }

    async fn set_status(
        &self,
        id: Uuid,
        from: &[InterviewStatus],
        to: InterviewStatus,
    ) -> Result<Option<Interview>, AppError> {
        let from: Vec<String> = from.iter().map(|s| s.as_str().to_string()).collect();
        let row: Option<InterviewRow> = sqlx::query_as(
            r#"
            UPDATE interviews
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = ANY($3)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(to.as_str())
        .bind(from)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Interview::try_from).transpose()?)
    }

    async fn append_round(
        &self,
        id: Uuid,
        expected_rounds: usize,
        round: &QuestionRound,
    ) -> Result<AppendOutcome, AppError> {
        let expected = i32::try_from(expected_rounds)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("round count out of range")))?;

        // `questions || jsonb_build_array(...)` appends without rewriting earlier rounds.
        let row: Option<InterviewRow> = sqlx::query_as(
            r#"
            UPDATE interviews
            SET questions = questions || jsonb_build_array($3::jsonb),
                status = 'in_progress',
                updated_at = NOW()
            WHERE id = $1
              AND jsonb_array_length(questions) = $2
              AND status IN ('pending', 'in_progress')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(Json(round))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(AppendOutcome::Appended(Interview::try_from(row)?));
        }

        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM interviews WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match exists {
            Some(_) => AppendOutcome::Conflict,
            None => AppendOutcome::NotFound,
        })
    }

    async fn complete(
        &self,
        id: Uuid,
        evaluation: &OverallEvaluation,
    ) -> Result<Option<Interview>, AppError> {
        let row: Option<InterviewRow> = sqlx::query_as(
            r#"
            UPDATE interviews
            SET overall_evaluation = $2,
                status = 'completed',
                updated_at = NOW()
            WHERE id = $1
              AND status = 'in_progress'
              AND overall_evaluation IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Json(evaluation))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Interview::try_from).transpose()?)
    }
}
