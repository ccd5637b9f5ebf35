pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::interview::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/interviews",
            post(handlers::handle_start_interview).get(handlers::handle_list_interviews),
        )
        .route("/api/v1/interviews/:id", get(handlers::handle_get_interview))
        .route(
            "/api/v1/interviews/:id/answer",
            post(handlers::handle_submit_answer),
        )
        .route(
            "/api/v1/interviews/:id/follow-up",
            post(handlers::handle_follow_up),
        )
        .route(
            "/api/v1/interviews/:id/finalize",
            post(handlers::handle_finalize),
        )
        .route("/api/v1/interviews/:id/cancel", post(handlers::handle_cancel))
        .layer(upload_limit)
        .with_state(state)
}
