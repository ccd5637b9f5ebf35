use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// The external capability an upstream failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    LanguageModel,
    SpeechRecognition,
    ResumeExtraction,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::LanguageModel => "AI interviewer service",
            Capability::SpeechRecognition => "speech recognition service",
            Capability::ResumeExtraction => "resume reader",
        };
        f.write_str(name)
    }
}

/// Failure of an external AI capability.
///
/// Display strings are shown to the end user verbatim, so they never embed the
/// provider's raw response. The `detail` fields exist for logs only.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("The {service} rejected the configured API key. Check the credentials in the server environment.")]
    InvalidCredentials { service: Capability },

    #[error("The {service} quota has been exhausted. Check the provider account's billing and usage limits.")]
    QuotaExceeded { service: Capability },

    #[error("The {service} is rate limiting requests. Wait a moment and try again.")]
    RateLimited { service: Capability },

    #[error("The {service} is temporarily unavailable. Please try again shortly.")]
    Unavailable { service: Capability, status: u16 },

    #[error("Could not reach the {service}. Check your connection and try again.")]
    Network { service: Capability, detail: String },

    #[error("The {service} could not process the request.")]
    Rejected {
        service: Capability,
        status: u16,
        detail: String,
    },

    #[error("The {service} returned an empty response.")]
    EmptyResponse { service: Capability },

    #[error("We couldn't read any text from the uploaded resume. Please upload a text-based PDF.")]
    UnreadableDocument { detail: String },
}

impl UpstreamError {
    pub fn service(&self) -> Capability {
        match self {
            UpstreamError::InvalidCredentials { service }
            | UpstreamError::QuotaExceeded { service }
            | UpstreamError::RateLimited { service }
            | UpstreamError::Unavailable { service, .. }
            | UpstreamError::Network { service, .. }
            | UpstreamError::Rejected { service, .. }
            | UpstreamError::EmptyResponse { service } => *service,
            UpstreamError::UnreadableDocument { .. } => Capability::ResumeExtraction,
        }
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Generated evaluation did not meet the required format: {}", .0.join("; "))]
    MalformedEvaluation(Vec<String>),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Access denied".to_string(),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::InvalidState(msg) => (StatusCode::CONFLICT, "INVALID_STATE", msg.clone()),
            AppError::Upstream(e) => {
                match e {
                    UpstreamError::Network { detail, .. }
                    | UpstreamError::Rejected { detail, .. }
                    | UpstreamError::UnreadableDocument { detail } => {
                        tracing::error!("Upstream error from {}: {e:?} ({detail})", e.service())
                    }
                    _ => tracing::error!("Upstream error from {}: {e:?}", e.service()),
                }
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", e.to_string())
            }
            AppError::MalformedEvaluation(_) => {
                tracing::error!("{self}");
                (
                    StatusCode::BAD_GATEWAY,
                    "MALFORMED_EVALUATION",
                    self.to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Redis(e) => {
                tracing::error!("Redis error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LOCK_ERROR",
                    "Could not coordinate the interview turn. Please retry.".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
