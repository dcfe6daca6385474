use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    config::AppConfig,
    errors::{ApiError, SchedulerError},
    router::AppState,
    routes::{AuthUser, check_user_id},
    session::{Layout, ReviewSession},
};

#[derive(Deserialize)]
pub struct SessionCommand {
    pub text: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    /// `None` when the text was not a command.
    pub display: Option<Layout>,
    pub remaining: usize,
    pub started: bool,
}

pub async fn start_session(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Extension(config): Extension<AppConfig>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user_id = check_user_id(user_id)?;
    let session = ReviewSession::new(&state.store, &user_id, Utc::now(), config.review_batch_size);
    let response = SessionResponse {
        display: Some(session.greeting()),
        remaining: session.remaining(),
        started: session.is_started(),
    };
    if state.active_sessions.insert(user_id.clone(), session).is_some() {
        info!("Replaced the previous review session of user {}", user_id);
    }
    Ok(Json(response))
}

pub async fn session_command(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SessionCommand>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user_id = check_user_id(user_id)?;
    let Json(command) = payload?;
    let mut session = state
        .active_sessions
        .get_mut(&user_id)
        .ok_or(SchedulerError::NoActiveSession)?;
    info!("Received command: {}", command.text);
    let display = session
        .handle(&state.store, &command.text, Utc::now())
        .inspect_err(|e| error!("Failed to process command: {}", e))?;
    Ok(Json(SessionResponse {
        display,
        remaining: session.remaining(),
        started: session.is_started(),
    }))
}

pub async fn end_session(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    let user_id = check_user_id(user_id)?;
    state
        .active_sessions
        .remove(&user_id)
        .ok_or(SchedulerError::NoActiveSession)?;
    info!("Review session of user {} ended", user_id);
    Ok(StatusCode::OK)
}
