use std::sync::Arc;

use axum::{
    Extension, Router, middleware,
    routing::{get, post, put},
};
use dashmap::DashMap;
use tower_http::trace::TraceLayer;

use crate::{
    config::AppConfig,
    routes::{self, deck, flashcard, session},
    session::ReviewSession,
    store::Store,
};

pub struct AppState {
    pub store: Store,
    /// One review session per user id.
    pub active_sessions: DashMap<String, ReviewSession>,
}

pub fn new_state(config: AppConfig) -> Arc<AppState> {
    Arc::new(AppState {
        store: Store::new(config.scheduler()),
        active_sessions: DashMap::new(),
    })
}

pub fn init_router(config: AppConfig) -> Router {
    let state = new_state(config.clone());
    let api_routes = Router::new()
        .route("/decks", get(deck::fetch_decks).post(deck::create_deck))
        .route(
            "/decks/{id}",
            put(deck::update_deck).delete(deck::delete_deck),
        )
        .route("/decks/{id}/stats", get(deck::deck_stats))
        .route("/decks/{id}/due", get(deck::due_flashcards))
        .route("/decks/{id}/import", post(deck::import_deck))
        .route(
            "/decks/{deck_id}/flashcards",
            get(flashcard::list_flashcards).post(flashcard::create_flashcard),
        )
        .route(
            "/flashcards/{id}",
            get(flashcard::get_flashcard)
                .put(flashcard::update_flashcard)
                .delete(flashcard::delete_flashcard),
        )
        .route("/flashcards/{id}/move", post(flashcard::move_flashcard))
        .route("/flashcards/{id}/review", post(flashcard::review_flashcard))
        .route(
            "/session",
            post(session::start_session).delete(session::end_session),
        )
        .route("/session/commands", post(session::session_command))
        .layer(middleware::from_fn(routes::identify_user))
        .with_state(state);
    Router::new()
        .route("/health", get(routes::health_handler))
        .merge(api_routes)
        .layer(Extension(config))
        .layer(TraceLayer::new_for_http())
}
