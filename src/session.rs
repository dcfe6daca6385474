//! Text-driven review loop over a user's due cards.
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    errors::SchedulerError,
    models::{Confidence, Flashcard},
    stats,
    store::Store,
};

const ALL_REVIEWED: &str = "All cards reviewed! You can end the session now.";
const NOTHING_DUE: &str = "No flashcards due. Add flashcards or come back later.";

/// What the client should show after a command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum Layout {
    TextWall { text: String },
    DoubleTextWall { top_text: String, bottom_text: String },
}

pub struct ReviewSession {
    user_id: String,
    /// Next card at the end.
    cards: Vec<Flashcard>,
    deck_names: HashMap<i32, String>,
    started: bool,
}

fn rating_in(text: &str) -> Option<Confidence> {
    text.split(|c: char| !c.is_alphabetic())
        .find_map(|word| word.parse().ok())
}

impl ReviewSession {
    pub fn new(store: &Store, user_id: &str, now: DateTime<Utc>, limit: usize) -> Self {
        let deck_names = store
            .list_decks(user_id)
            .into_iter()
            .map(|deck| (deck.id, deck.name))
            .collect();
        let all_cards = store.user_cards(user_id);
        let mut cards: Vec<Flashcard> = stats::due_cards(&all_cards, now)
            .into_iter()
            .take(limit)
            .cloned()
            .collect();
        cards.reverse();
        info!(
            "Prepared review session for user {} with {} cards",
            user_id,
            cards.len()
        );
        Self {
            user_id: user_id.to_string(),
            cards,
            deck_names,
            started: false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn greeting(&self) -> Layout {
        let text = if self.cards.is_empty() {
            NOTHING_DUE.to_string()
        } else {
            format!(
                "{} cards for review. Say 'start' to begin.\nSay 'reveal' to display the back of each card.\nSay 'easy', 'good', 'hard', or 'again'\nto rate your recall.",
                self.cards.len()
            )
        };
        Layout::TextWall { text }
    }

    fn next_card_or_finish(&self) -> Layout {
        match self.cards.last() {
            None => Layout::TextWall {
                text: ALL_REVIEWED.to_string(),
            },
            Some(card) => {
                let deck_name = self
                    .deck_names
                    .get(&card.deck_id)
                    .cloned()
                    .unwrap_or_default();
                Layout::DoubleTextWall {
                    top_text: card.front.clone(),
                    bottom_text: format!("{deck_name} ({} left)", self.cards.len()),
                }
            }
        }
    }

    /// Applies one command. `None` means the text was not a command in the current phase.
    pub fn handle(
        &mut self,
        store: &Store,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Layout>, SchedulerError> {
        let text = text.trim().to_lowercase();
        if !self.started {
            if text.contains("start") {
                self.started = true;
                info!(
                    "Starting review session with {} cards",
                    self.cards.len()
                );
                return Ok(Some(self.next_card_or_finish()));
            }
            return Ok(None);
        }

        if text.contains("reveal") {
            return Ok(Some(match self.cards.last() {
                Some(card) => {
                    info!("Revealing card {}", card.id);
                    Layout::DoubleTextWall {
                        top_text: card.front.clone(),
                        bottom_text: card.back.clone(),
                    }
                }
                None => self.next_card_or_finish(),
            }));
        }

        let Some(confidence) = rating_in(&text) else {
            return Ok(None);
        };
        if let Some(card) = self.cards.pop() {
            match store.review_card(&self.user_id, card.id, confidence, now) {
                Ok(_) => {}
                Err(SchedulerError::CardNotFound(id)) => {
                    warn!("Card {} disappeared during the session, skipping", id);
                }
                Err(e) => {
                    self.cards.push(card);
                    return Err(e);
                }
            }
        }
        Ok(Some(self.next_card_or_finish()))
    }
}
