use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use serde::Serialize;
use tracing::error;

use crate::{
    errors::ApiError,
    import::{ImportRequest, import_into_deck},
    models::{Deck, DeckNew, DeckStats, DeckWithStats, FlashcardView},
    router::AppState,
    routes::{AuthUser, check_user_id, flashcard_view},
    stats,
};

#[derive(Serialize)]
pub struct ImportResponse {
    pub imported: usize,
}

pub async fn fetch_decks(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DeckWithStats>>, ApiError> {
    let user_id = check_user_id(user_id)?;
    let now = Utc::now();
    let threshold = state.store.scheduler().mastery_threshold_days;
    let decks = state
        .store
        .list_decks(&user_id)
        .into_iter()
        .map(|deck| {
            let cards = state.store.deck_cards(&user_id, deck.id)?;
            let stats = stats::deck_stats(&cards, now, threshold);
            Ok::<_, ApiError>(DeckWithStats { deck, stats })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;
    Ok(Json(decks))
}

pub async fn create_deck(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeckNew>, JsonRejection>,
) -> Result<Json<Deck>, ApiError> {
    let user_id = check_user_id(user_id)?;
    let Json(form) = payload?;
    Ok(Json(state.store.create_deck(&user_id, form)?))
}

pub async fn update_deck(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    payload: Result<Json<DeckNew>, JsonRejection>,
) -> Result<Json<Deck>, ApiError> {
    let user_id = check_user_id(user_id)?;
    let Json(form) = payload?;
    Ok(Json(state.store.rename_deck(&user_id, id, form)?))
}

pub async fn delete_deck(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let user_id = check_user_id(user_id)?;
    state.store.delete_deck(&user_id, id)?;
    Ok(StatusCode::OK)
}

pub async fn deck_stats(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<DeckStats>, ApiError> {
    let user_id = check_user_id(user_id)?;
    let cards = state.store.deck_cards(&user_id, id)?;
    let threshold = state.store.scheduler().mastery_threshold_days;
    Ok(Json(stats::deck_stats(&cards, Utc::now(), threshold)))
}

pub async fn due_flashcards(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<FlashcardView>>, ApiError> {
    let user_id = check_user_id(user_id)?;
    let cards = state.store.deck_cards(&user_id, id)?;
    let threshold = state.store.scheduler().mastery_threshold_days;
    let due = stats::due_cards(&cards, Utc::now())
        .into_iter()
        .map(|card| flashcard_view(card.clone(), threshold))
        .collect();
    Ok(Json(due))
}

pub async fn import_deck(
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<Json<ImportResponse>, ApiError> {
    let user_id = check_user_id(user_id)?;
    let Json(request) = payload?;
    let imported = import_into_deck(&state.store, &user_id, id, &request, Utc::now())
        .inspect_err(|e| error!("Import into deck {} failed: {}", id, e))?;
    Ok(Json(ImportResponse { imported }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        errors::SchedulerError,
        routes::test::{USER, new_deck, state, user},
    };

    #[tokio::test]
    async fn deck_lifecycle() {
        let state = state();
        let id = new_deck(&state, "Physics").await;

        let Json(imported) = import_deck(
            user(),
            state.clone(),
            Path(id),
            Ok(Json(ImportRequest {
                front_idx: 0,
                back_idx: 1,
                text: "force\tmass times acceleration\nwork\tforce times distance".into(),
            })),
        )
        .await
        .ok()
        .unwrap();
        assert_eq!(imported.imported, 2);

        let Json(decks) = fetch_decks(user(), state.clone()).await.ok().unwrap();
        assert_eq!(decks.len(), 1);
        assert_eq!(decks[0].stats.new_count, 2);
        assert_eq!(decks[0].stats.due_count, 2);

        let Json(due) = due_flashcards(user(), state.clone(), Path(id))
            .await
            .ok()
            .unwrap();
        assert_eq!(due[0].flashcard.front, "force");

        let Json(renamed) = update_deck(
            user(),
            state.clone(),
            Path(id),
            Ok(Json(DeckNew {
                name: "Mechanics".into(),
                subject: Some("physics".into()),
            })),
        )
        .await
        .ok()
        .unwrap();
        assert_eq!(renamed.name, "Mechanics");

        assert_eq!(
            delete_deck(user(), state.clone(), Path(id)).await.ok(),
            Some(StatusCode::OK)
        );
        assert!(state.store.user_cards(USER).is_empty());
        assert!(matches!(
            deck_stats(user(), state.clone(), Path(id)).await,
            Err(ApiError::Scheduler(SchedulerError::DeckNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn anonymous_is_rejected() {
        let result = fetch_decks(Extension(AuthUser(None)), state()).await;
        assert!(matches!(result, Err(ApiError::UserNotFoundOrUnauthorized)));
    }
}
