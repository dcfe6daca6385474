use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    errors::ApiError,
    models::{
        Confidence, FlashcardMove, FlashcardNew, FlashcardUpdate, FlashcardView, ReviewRequest,
    },
    router::AppState,
    routes::{AuthUser, check_user_id, flashcard_view},
};

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct FlashcardPage {
    pub flashcards: Vec<FlashcardView>,
    pub page: u32,
    pub has_more: bool,
}

#[derive(Deserialize)]
pub struct FlashcardBody {
    pub front: String,
    pub back: String,
}

// List flashcards of a deck, one page at a time
pub async fn list_flashcards(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
    Path(deck_id): Path<i32>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<FlashcardPage>, ApiError> {
    let user_id = check_user_id(user_id)?;
    let page = pagination.page.unwrap_or(0);
    let limit = pagination.limit.unwrap_or(20).max(1) as usize;
    let threshold = state.store.scheduler().mastery_threshold_days;

    let cards = state.store.deck_cards(&user_id, deck_id)?;
    let offset = (page as usize).saturating_mul(limit);
    let has_more = cards.len() > offset.saturating_add(limit);
    let flashcards = cards
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|card| flashcard_view(card, threshold))
        .collect();

    Ok(Json(FlashcardPage {
        flashcards,
        page,
        has_more,
    }))
}

pub async fn create_flashcard(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
    Path(deck_id): Path<i32>,
    payload: Result<Json<FlashcardBody>, JsonRejection>,
) -> Result<Json<FlashcardView>, ApiError> {
    let user_id = check_user_id(user_id)?;
    let Json(body) = payload?;
    let flashcard = state.store.create_card(
        &user_id,
        FlashcardNew {
            deck_id,
            front: body.front,
            back: body.back,
        },
        Utc::now(),
    )?;
    let threshold = state.store.scheduler().mastery_threshold_days;
    Ok(Json(flashcard_view(flashcard, threshold)))
}

pub async fn get_flashcard(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<FlashcardView>, ApiError> {
    let user_id = check_user_id(user_id)?;
    let flashcard = state.store.get_card(&user_id, id)?;
    let threshold = state.store.scheduler().mastery_threshold_days;
    Ok(Json(flashcard_view(flashcard, threshold)))
}

pub async fn update_flashcard(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    payload: Result<Json<FlashcardUpdate>, JsonRejection>,
) -> Result<Json<FlashcardView>, ApiError> {
    let user_id = check_user_id(user_id)?;
    let Json(form) = payload?;
    let flashcard = state.store.update_card(&user_id, id, form)?;
    let threshold = state.store.scheduler().mastery_threshold_days;
    Ok(Json(flashcard_view(flashcard, threshold)))
}

pub async fn move_flashcard(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    payload: Result<Json<FlashcardMove>, JsonRejection>,
) -> Result<Json<FlashcardView>, ApiError> {
    let user_id = check_user_id(user_id)?;
    let Json(target) = payload?;
    let flashcard = state.store.move_card(&user_id, id, target.deck_id)?;
    let threshold = state.store.scheduler().mastery_threshold_days;
    Ok(Json(flashcard_view(flashcard, threshold)))
}

pub async fn delete_flashcard(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let user_id = check_user_id(user_id)?;
    state.store.delete_card(&user_id, id)?;
    Ok(StatusCode::OK)
}

pub async fn review_flashcard(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> Result<Json<FlashcardView>, ApiError> {
    let user_id = check_user_id(user_id)?;
    let Json(review) = payload?;
    let confidence: Confidence = review.confidence.parse()?;
    let flashcard = state
        .store
        .review_card(&user_id, id, confidence, Utc::now())?;
    let threshold = state.store.scheduler().mastery_threshold_days;
    Ok(Json(flashcard_view(flashcard, threshold)))
}
