use std::sync::Arc;

use crate::config::Config;
use crate::interview::session::InterviewSession;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Every collaborator (store, lock, model, speech, archive) is wired into the session in `main`.
    pub session: Arc<InterviewSession>,
    pub config: Config,
}
