//! In-memory mirror of decks and flashcards.
//!
//! Every operation is scoped to a user: a deck or card owned by someone else
//! is reported as not found. Concurrent writes to the same card are
//! last-write-wins.
use std::sync::atomic::{AtomicI32, Ordering};

use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry, mapref::one::Ref};
use tracing::{debug, info};

use crate::{
    errors::SchedulerError,
    models::{Confidence, Deck, DeckNew, Flashcard, FlashcardNew, FlashcardUpdate},
    srs::{self, ReviewState, SchedulerConfig},
};

pub struct Store {
    decks: DashMap<i32, Deck>,
    cards: DashMap<i32, Flashcard>,
    next_deck_id: AtomicI32,
    next_card_id: AtomicI32,
    scheduler: SchedulerConfig,
}

fn required_text(field: &str, value: &str) -> Result<String, SchedulerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SchedulerError::InvalidArgument(format!(
            "{field} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Rejects malformed scheduling state and blank text before a card enters the store.
fn validated(card: Flashcard) -> Result<Flashcard, SchedulerError> {
    ReviewState::from(&card).validate()?;
    Ok(Flashcard {
        front: required_text("front", &card.front)?,
        back: required_text("back", &card.back)?,
        ..card
    })
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Store {
    pub fn new(scheduler: SchedulerConfig) -> Self {
        Self {
            decks: DashMap::new(),
            cards: DashMap::new(),
            next_deck_id: AtomicI32::new(1),
            next_card_id: AtomicI32::new(1),
            scheduler,
        }
    }

    pub fn scheduler(&self) -> &SchedulerConfig {
        &self.scheduler
    }

    pub fn get_deck(&self, user_id: &str, deck_id: i32) -> Result<Deck, SchedulerError> {
        self.owned_deck(user_id, deck_id)
            .map(|deck| deck.value().clone())
    }

    pub fn list_decks(&self, user_id: &str) -> Vec<Deck> {
        let mut decks: Vec<Deck> = self
            .decks
            .iter()
            .filter(|deck| deck.user_id == user_id)
            .map(|deck| deck.value().clone())
            .collect();
        decks.sort_by_key(|deck| deck.id);
        debug!("Listed {} decks for user {}", decks.len(), user_id);
        decks
    }

    pub fn create_deck(&self, user_id: &str, form: DeckNew) -> Result<Deck, SchedulerError> {
        let deck = Deck {
            id: self.next_deck_id.fetch_add(1, Ordering::Relaxed),
            name: required_text("deck name", &form.name)?,
            user_id: user_id.to_string(),
            subject: optional_text(form.subject),
        };
        self.decks.insert(deck.id, deck.clone());
        info!("Created deck {} '{}' for user {}", deck.id, deck.name, user_id);
        Ok(deck)
    }

    pub fn rename_deck(
        &self,
        user_id: &str,
        deck_id: i32,
        form: DeckNew,
    ) -> Result<Deck, SchedulerError> {
        let name = required_text("deck name", &form.name)?;
        let mut deck = self
            .decks
            .get_mut(&deck_id)
            .filter(|deck| deck.user_id == user_id)
            .ok_or(SchedulerError::DeckNotFound(deck_id))?;
        deck.name = name;
        deck.subject = optional_text(form.subject);
        info!("Renamed deck {} to '{}'", deck_id, deck.name);
        Ok(deck.value().clone())
    }

    fn owned_deck(&self, user_id: &str, deck_id: i32) -> Result<Ref<'_, i32, Deck>, SchedulerError> {
        self.decks
            .get(&deck_id)
            .filter(|deck| deck.user_id == user_id)
            .ok_or(SchedulerError::DeckNotFound(deck_id))
    }

    /// Runs `f` while the deck is held, so it cannot be deleted underneath.
    fn with_owned_deck<T>(
        &self,
        user_id: &str,
        deck_id: i32,
        f: impl FnOnce() -> T,
    ) -> Result<T, SchedulerError> {
        let _deck = self.owned_deck(user_id, deck_id)?;
        Ok(f())
    }

    /// Deletes the deck and every card in it. Returns how many cards went with it.
    pub fn delete_deck(&self, user_id: &str, deck_id: i32) -> Result<usize, SchedulerError> {
        let Entry::Occupied(entry) = self.decks.entry(deck_id) else {
            return Err(SchedulerError::DeckNotFound(deck_id));
        };
        if entry.get().user_id != user_id {
            return Err(SchedulerError::DeckNotFound(deck_id));
        }
        // cascade while the entry is still locked
        let mut removed = 0;
        self.cards.retain(|_, card| {
            let keep = card.deck_id != deck_id;
            if !keep {
                removed += 1;
            }
            keep
        });
        entry.remove();
        info!("Deleted deck {} with {} flashcards", deck_id, removed);
        Ok(removed)
    }

    fn new_card(&self, deck_id: i32, front: &str, back: &str, now: DateTime<Utc>) -> Flashcard {
        Flashcard {
            id: self.next_card_id.fetch_add(1, Ordering::Relaxed),
            deck_id,
            front: front.to_string(),
            back: back.to_string(),
            interval: 0,
            repetitions: 0,
            due_date: now,
            created: now,
            last_reviewed: None,
            last_confidence: None,
        }
    }

    /// Validates every card first, then inserts all of them under one deck hold.
    fn insert_cards(
        &self,
        user_id: &str,
        deck_id: i32,
        cards: Vec<Flashcard>,
    ) -> Result<Vec<Flashcard>, SchedulerError> {
        let cards = cards
            .into_iter()
            .map(|card| validated(Flashcard { deck_id, ..card }))
            .collect::<Result<Vec<_>, _>>()?;
        self.with_owned_deck(user_id, deck_id, || {
            for card in &cards {
                self.cards.insert(card.id, card.clone());
            }
        })?;
        Ok(cards)
    }

    pub fn create_card(
        &self,
        user_id: &str,
        form: FlashcardNew,
        now: DateTime<Utc>,
    ) -> Result<Flashcard, SchedulerError> {
        let card = validated(self.new_card(form.deck_id, &form.front, &form.back, now))?;
        self.with_owned_deck(user_id, form.deck_id, || {
            self.cards.insert(card.id, card.clone());
        })?;
        info!("Created flashcard {} in deck {}", card.id, card.deck_id);
        Ok(card)
    }

    /// Creates all cards or none of them.
    pub fn create_cards(
        &self,
        user_id: &str,
        deck_id: i32,
        texts: &[(String, String)],
        now: DateTime<Utc>,
    ) -> Result<Vec<Flashcard>, SchedulerError> {
        let cards = texts
            .iter()
            .map(|(front, back)| self.new_card(deck_id, front, back, now))
            .collect();
        let cards = self.insert_cards(user_id, deck_id, cards)?;
        info!("Created {} flashcards in deck {}", cards.len(), deck_id);
        Ok(cards)
    }

    pub fn get_card(&self, user_id: &str, card_id: i32) -> Result<Flashcard, SchedulerError> {
        let card = self
            .cards
            .get(&card_id)
            .map(|card| card.value().clone())
            .ok_or(SchedulerError::CardNotFound(card_id))?;
        self.get_deck(user_id, card.deck_id)
            .map_err(|_| SchedulerError::CardNotFound(card_id))?;
        Ok(card)
    }

    /// Applies `f` to the stored card in place, unless it was deleted in the meantime.
    fn modify_card(
        &self,
        card_id: i32,
        f: impl FnOnce(&mut Flashcard) -> Result<(), SchedulerError>,
    ) -> Result<Flashcard, SchedulerError> {
        let mut slot = self
            .cards
            .get_mut(&card_id)
            .ok_or(SchedulerError::CardNotFound(card_id))?;
        f(&mut slot)?;
        Ok(slot.value().clone())
    }

    pub fn update_card(
        &self,
        user_id: &str,
        card_id: i32,
        form: FlashcardUpdate,
    ) -> Result<Flashcard, SchedulerError> {
        self.get_card(user_id, card_id)?;
        let front = required_text("front", &form.front)?;
        let back = required_text("back", &form.back)?;
        let card = self.modify_card(card_id, |card| {
            card.front = front;
            card.back = back;
            Ok(())
        })?;
        info!("Updated flashcard {}", card_id);
        Ok(card)
    }

    pub fn move_card(
        &self,
        user_id: &str,
        card_id: i32,
        deck_id: i32,
    ) -> Result<Flashcard, SchedulerError> {
        let from = self.get_card(user_id, card_id)?.deck_id;
        let card = self.with_owned_deck(user_id, deck_id, || {
            self.modify_card(card_id, |card| {
                card.deck_id = deck_id;
                Ok(())
            })
        })??;
        info!("Moved flashcard {} from deck {} to deck {}", card_id, from, deck_id);
        Ok(card)
    }

    pub fn delete_card(&self, user_id: &str, card_id: i32) -> Result<(), SchedulerError> {
        self.get_card(user_id, card_id)?;
        self.cards
            .remove(&card_id)
            .ok_or(SchedulerError::CardNotFound(card_id))?;
        info!("Deleted flashcard {}", card_id);
        Ok(())
    }

    /// Cards of one deck in insertion order.
    pub fn deck_cards(&self, user_id: &str, deck_id: i32) -> Result<Vec<Flashcard>, SchedulerError> {
        self.get_deck(user_id, deck_id)?;
        let mut cards: Vec<Flashcard> = self
            .cards
            .iter()
            .filter(|card| card.deck_id == deck_id)
            .map(|card| card.value().clone())
            .collect();
        cards.sort_by_key(|card| card.id);
        Ok(cards)
    }

    /// Cards across all of the user's decks in insertion order.
    pub fn user_cards(&self, user_id: &str) -> Vec<Flashcard> {
        let deck_ids: Vec<i32> = self.list_decks(user_id).iter().map(|deck| deck.id).collect();
        let mut cards: Vec<Flashcard> = self
            .cards
            .iter()
            .filter(|card| deck_ids.contains(&card.deck_id))
            .map(|card| card.value().clone())
            .collect();
        cards.sort_by_key(|card| card.id);
        cards
    }

    pub fn review_card(
        &self,
        user_id: &str,
        card_id: i32,
        confidence: Confidence,
        now: DateTime<Utc>,
    ) -> Result<Flashcard, SchedulerError> {
        self.get_card(user_id, card_id)?;
        let card = self.modify_card(card_id, |card| {
            let review = srs::review_card(&ReviewState::from(&*card), confidence, now, &self.scheduler)?;
            card.interval = review.interval;
            card.repetitions = review.repetitions;
            card.due_date = review.due_date;
            card.last_reviewed = Some(now);
            card.last_confidence = Some(confidence);
            Ok(())
        })?;
        info!(
            "Card {} rated as {}, next review in {} days",
            card_id, confidence, card.interval
        );
        Ok(card)
    }
}

#[cfg(test)]
mod test {
    use chrono::{TimeDelta, TimeZone};

    use super::*;

    const USER: &str = "user-1";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap()
    }

    fn deck(store: &Store, name: &str) -> Deck {
        store
            .create_deck(USER, DeckNew {
                name: name.to_string(),
                subject: None,
            })
            .unwrap()
    }

    fn card(store: &Store, deck_id: i32, front: &str) -> Flashcard {
        store
            .create_card(
                USER,
                FlashcardNew {
                    deck_id,
                    front: front.to_string(),
                    back: format!("{front} answer"),
                },
                now(),
            )
            .unwrap()
    }

    #[test]
    fn new_card_is_due_immediately() {
        let store = Store::new(SchedulerConfig::default());
        let deck = deck(&store, "Biology");
        let card = card(&store, deck.id, "  mitochondria ");
        assert_eq!(card.front, "mitochondria");
        assert_eq!(card.interval, 0);
        assert_eq!(card.repetitions, 0);
        assert_eq!(card.due_date, now());
        assert_eq!(card.last_reviewed, None);
    }

    #[test]
    fn rejects_blank_text() {
        let store = Store::new(SchedulerConfig::default());
        assert!(matches!(
            store.create_deck(USER, DeckNew {
                name: "   ".into(),
                subject: None
            }),
            Err(SchedulerError::InvalidArgument(_))
        ));
        let deck = deck(&store, "History");
        let result = store.create_card(
            USER,
            FlashcardNew {
                deck_id: deck.id,
                front: "1066".into(),
                back: "\t".into(),
            },
            now(),
        );
        assert!(matches!(result, Err(SchedulerError::InvalidArgument(_))));
        assert!(store.deck_cards(USER, deck.id).unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_state() {
        let store = Store::new(SchedulerConfig::default());
        let deck = deck(&store, "Chemistry");
        let mut bad = card(&store, deck.id, "Na");
        bad.id = 99;
        bad.interval = -4;
        assert!(matches!(
            store.insert_cards(USER, deck.id, vec![bad]),
            Err(SchedulerError::InvalidState(_))
        ));
        assert!(matches!(
            store.get_card(USER, 99),
            Err(SchedulerError::CardNotFound(99))
        ));
    }

    #[test]
    fn review_persists_schedule() {
        let store = Store::new(SchedulerConfig::default());
        let deck = deck(&store, "French");
        let card = card(&store, deck.id, "chat");
        let reviewed = store
            .review_card(USER, card.id, Confidence::Easy, now())
            .unwrap();
        assert_eq!(reviewed.interval, 4);
        assert_eq!(reviewed.repetitions, 1);
        assert_eq!(reviewed.due_date, now() + TimeDelta::days(4));
        assert_eq!(reviewed.last_confidence, Some(Confidence::Easy));
        assert_eq!(store.get_card(USER, card.id).unwrap(), reviewed);

        let lapsed = store
            .review_card(USER, card.id, Confidence::Again, now() + TimeDelta::days(4))
            .unwrap();
        assert_eq!(lapsed.interval, 1);
        assert_eq!(lapsed.repetitions, 0);
    }

    #[test]
    fn other_users_cannot_see_cards() {
        let store = Store::new(SchedulerConfig::default());
        let deck = deck(&store, "Private");
        let card = card(&store, deck.id, "secret");
        assert!(store.list_decks("someone-else").is_empty());
        assert!(matches!(
            store.get_card("someone-else", card.id),
            Err(SchedulerError::CardNotFound(_))
        ));
        assert!(matches!(
            store.review_card("someone-else", card.id, Confidence::Good, now()),
            Err(SchedulerError::CardNotFound(_))
        ));
        assert!(matches!(
            store.delete_deck("someone-else", deck.id),
            Err(SchedulerError::DeckNotFound(_))
        ));
        assert!(store.user_cards("someone-else").is_empty());
    }

    #[test]
    fn delete_deck_cascades() {
        let store = Store::new(SchedulerConfig::default());
        let keep = deck(&store, "Keep");
        let gone = deck(&store, "Drop");
        card(&store, gone.id, "a");
        card(&store, gone.id, "b");
        let kept = card(&store, keep.id, "c");
        assert_eq!(store.delete_deck(USER, gone.id).unwrap(), 2);
        assert_eq!(store.user_cards(USER), vec![kept]);
        assert_eq!(store.list_decks(USER), vec![keep]);
    }

    #[test]
    fn move_and_edit_card() {
        let store = Store::new(SchedulerConfig::default());
        let from = deck(&store, "Inbox");
        let to = deck(&store, "Geography");
        let card = card(&store, from.id, "capital of Peru");
        let moved = store.move_card(USER, card.id, to.id).unwrap();
        assert_eq!(moved.deck_id, to.id);
        assert!(store.deck_cards(USER, from.id).unwrap().is_empty());
        assert!(matches!(
            store.move_card(USER, card.id, 404),
            Err(SchedulerError::DeckNotFound(404))
        ));

        let edited = store
            .update_card(USER, card.id, FlashcardUpdate {
                front: "capital of Peru?".into(),
                back: " Lima ".into(),
            })
            .unwrap();
        assert_eq!(edited.back, "Lima");
        assert_eq!(edited.deck_id, to.id);

        store.delete_card(USER, card.id).unwrap();
        assert!(store.deck_cards(USER, to.id).unwrap().is_empty());
    }

    #[test]
    fn rename_deck_updates_subject() {
        let store = Store::new(SchedulerConfig::default());
        let deck = deck(&store, "Untitled");
        let renamed = store
            .rename_deck(USER, deck.id, DeckNew {
                name: "Organic chemistry".into(),
                subject: Some(" chemistry ".into()),
            })
            .unwrap();
        assert_eq!(renamed.subject.as_deref(), Some("chemistry"));
        assert_eq!(store.get_deck(USER, deck.id).unwrap(), renamed);
    }

    #[test]
    fn batch_creation_is_all_or_nothing() {
        let store = Store::new(SchedulerConfig::default());
        let deck = deck(&store, "Batch");
        let texts = vec![
            ("one".to_string(), "1".to_string()),
            ("two".to_string(), " ".to_string()),
        ];
        assert!(matches!(
            store.create_cards(USER, deck.id, &texts, now()),
            Err(SchedulerError::InvalidArgument(_))
        ));
        assert!(store.deck_cards(USER, deck.id).unwrap().is_empty());

        let created = store.create_cards(USER, deck.id, &texts[..1], now()).unwrap();
        assert_eq!(created.len(), 1);
        assert!(matches!(
            store.create_cards("intruder", deck.id, &texts[..1], now()),
            Err(SchedulerError::DeckNotFound(_))
        ));
    }

    #[test]
    fn deck_deletion_leaves_no_orphans() {
        let store = Store::new(SchedulerConfig::default());
        let home = deck(&store, "Home");
        for round in 0..200 {
            let target = deck(&store, &format!("Round {round}"));
            let traveller = card(&store, home.id, &format!("traveller {round}"));
            std::thread::scope(|s| {
                s.spawn(|| {
                    for i in 0..50 {
                        let _ = store.create_card(
                            USER,
                            FlashcardNew {
                                deck_id: target.id,
                                front: format!("q{i}"),
                                back: "a".into(),
                            },
                            now(),
                        );
                    }
                });
                s.spawn(|| {
                    let _ = store.move_card(USER, traveller.id, target.id);
                });
                s.spawn(|| {
                    store.delete_deck(USER, target.id).unwrap();
                });
            });
            assert!(
                !store.cards.iter().any(|card| card.deck_id == target.id),
                "round {round} left cards in a deleted deck"
            );
        }
    }
}
