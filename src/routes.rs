pub mod deck;
pub mod flashcard;
pub mod session;

use axum::{
    Json,
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    errors::ApiError,
    models::{Flashcard, FlashcardView},
    srs::ReviewState,
    stats,
};

pub const USER_HEADER: &str = "x-user-id";

#[derive(Clone, Debug)]
pub struct AuthUser(pub Option<String>);

/// Reads the caller's identity from the `x-user-id` header.
pub async fn identify_user(mut req: Request, next: Next) -> Response {
    debug!("Processing request: {} {}", req.method(), req.uri());
    let user_id = req
        .headers()
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    req.extensions_mut().insert(AuthUser(user_id));
    next.run(req).await
}

pub(crate) fn check_user_id(user_id: Option<String>) -> Result<String, ApiError> {
    match user_id {
        Some(user_id) if !user_id.is_empty() => Ok(user_id),
        _ => {
            warn!("User ID is missing, returning unauthorized error");
            Err(ApiError::UserNotFoundOrUnauthorized)
        }
    }
}

pub(crate) fn flashcard_view(flashcard: Flashcard, mastery_threshold_days: i32) -> FlashcardView {
    let state = stats::classify_card(&ReviewState::from(&flashcard), mastery_threshold_days);
    FlashcardView { flashcard, state }
}

pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
