use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::session::{StartedInterview, SubmitOutcome};
use crate::models::interview::{HiringDecision, Interview, InterviewStatus};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct OwnerQuery {
    pub owner_id: String,
}

#[derive(Deserialize)]
pub struct OptionalOwnerQuery {
    pub owner_id: Option<String>,
}

/// List entry; omits the resume text and per-round detail.
#[derive(Debug, Serialize)]
pub struct InterviewSummary {
    pub id: Uuid,
    pub job_role: String,
    pub status: InterviewStatus,
    pub rounds_answered: usize,
    pub overall_score: Option<u8>,
    pub hiring_decision: Option<HiringDecision>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Interview> for InterviewSummary {
    fn from(interview: &Interview) -> Self {
        let overall = interview.overall_evaluation.as_ref();
        Self {
            id: interview.id,
            job_role: interview.job_role.clone(),
            status: interview.status,
            rounds_answered: interview.questions.len(),
            overall_score: overall.map(|o| o.overall_score),
            hiring_decision: overall.map(|o| o.hiring_recommendation.decision),
            created_at: interview.created_at,
            updated_at: interview.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct FollowUpResponse {
    pub next_question: String,
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::Validation(format!("Invalid upload: {}", e.body_text()))
}

/// POST /api/v1/interviews
/// Multipart fields: `owner_id`, `job_role`, `resume` (PDF).
pub async fn handle_start_interview(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StartedInterview>), AppError> {
    let mut owner_id = String::new();
    let mut job_role = String::new();
    let mut resume = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "owner_id" => owner_id = field.text().await.map_err(multipart_error)?,
            "job_role" => job_role = field.text().await.map_err(multipart_error)?,
            "resume" => resume = field.bytes().await.map_err(multipart_error)?.to_vec(),
            _ => {
                field.bytes().await.map_err(multipart_error)?;
            }
        }
    }

    let started = state.session.start(&owner_id, &job_role, resume).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

/// GET /api/v1/interviews?owner_id=
pub async fn handle_list_interviews(
    State(state): State<AppState>,
    Query(params): Query<OwnerQuery>,
) -> Result<Json<Vec<InterviewSummary>>, AppError> {
    let interviews = state.session.list_for_owner(&params.owner_id).await?;
    Ok(Json(interviews.iter().map(InterviewSummary::from).collect()))
}

/// GET /api/v1/interviews/:id
pub async fn handle_get_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<OptionalOwnerQuery>,
) -> Result<Json<Interview>, AppError> {
    let interview = state.session.fetch(id, params.owner_id.as_deref()).await?;
    Ok(Json(interview))
}

/// POST /api/v1/interviews/:id/answer
/// Multipart fields: `current_question`, `audio`.
pub async fn handle_submit_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<SubmitOutcome>, AppError> {
    let mut current_question = String::new();
    let mut audio = Bytes::new();
    let mut audio_mimetype = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "current_question" => current_question = field.text().await.map_err(multipart_error)?,
            "audio" => {
                audio_mimetype = field.content_type().map(str::to_string);
                audio = field.bytes().await.map_err(multipart_error)?;
            }
            _ => {
                field.bytes().await.map_err(multipart_error)?;
            }
        }
    }

    let outcome = state
        .session
        .submit_answer(id, &current_question, &audio, audio_mimetype.as_deref())
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/interviews/:id/follow-up
pub async fn handle_follow_up(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FollowUpResponse>, AppError> {
    let next_question = state.session.generate_follow_up(id).await?;
    Ok(Json(FollowUpResponse { next_question }))
}

/// POST /api/v1/interviews/:id/finalize
pub async fn handle_finalize(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmitOutcome>, AppError> {
    Ok(Json(state.session.finalize(id).await?))
}

/// POST /api/v1/interviews/:id/cancel
pub async fn handle_cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Interview>, AppError> {
    Ok(Json(state.session.cancel(id).await?))
}
