//! Sandstone: spaced-repetition scheduling for flashcard decks, with an
//! in-memory store and a small JSON API around it.
pub mod config;
pub mod errors;
pub mod import;
pub mod models;
pub mod router;
pub mod routes;
pub mod session;
pub mod srs;
pub mod stats;
pub mod store;
