//! Error handling for the scheduler and the API
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("deck {0} not found")]
    DeckNotFound(i32),
    #[error("flashcard {0} not found")]
    CardNotFound(i32),
    #[error("no active review session")]
    NoActiveSession,
}

pub enum ApiError {
    Scheduler(SchedulerError),
    Json(JsonRejection),
    UserNotFoundOrUnauthorized,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Scheduler(e) => {
                let status = match e {
                    SchedulerError::InvalidArgument(_) | SchedulerError::InvalidState(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    SchedulerError::DeckNotFound(_) | SchedulerError::CardNotFound(_) => {
                        StatusCode::NOT_FOUND
                    }
                    SchedulerError::NoActiveSession => StatusCode::CONFLICT,
                };
                (status, e.to_string()).into_response()
            }
            Self::Json(rejection) => {
                (StatusCode::BAD_REQUEST, rejection.body_text()).into_response()
            }
            Self::UserNotFoundOrUnauthorized => (
                StatusCode::UNAUTHORIZED,
                "User not found or unauthorized".to_string(),
            )
                .into_response(),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(e: SchedulerError) -> Self {
        Self::Scheduler(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::Json(e)
    }
}
