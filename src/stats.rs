//! Derived reads over a snapshot of cards: mastery buckets and the due queue.
use chrono::{DateTime, Utc};

use crate::{
    models::{CardState, DeckStats, Flashcard},
    srs::ReviewState,
};

pub fn classify_card(state: &ReviewState, mastery_threshold_days: i32) -> CardState {
    if state.repetitions == 0 {
        CardState::New
    } else if state.repetitions > 0 && state.interval >= mastery_threshold_days {
        CardState::Mastered
    } else {
        CardState::Learning
    }
}

/// Cards due at `now`, oldest due date first. Equal due dates keep their input order.
pub fn due_cards(cards: &[Flashcard], now: DateTime<Utc>) -> Vec<&Flashcard> {
    let mut due: Vec<&Flashcard> = cards.iter().filter(|card| card.due_date <= now).collect();
    due.sort_by_key(|card| card.due_date);
    due
}

pub fn deck_stats(cards: &[Flashcard], now: DateTime<Utc>, mastery_threshold_days: i32) -> DeckStats {
    cards.iter().fold(
        DeckStats {
            total: cards.len(),
            ..Default::default()
        },
        |mut stats, card| {
            match classify_card(&ReviewState::from(card), mastery_threshold_days) {
                CardState::New => stats.new_count += 1,
                CardState::Learning => stats.learning_count += 1,
                CardState::Mastered => stats.mastered_count += 1,
            }
            if card.due_date <= now {
                stats.due_count += 1;
            }
            stats
        },
    )
}

#[cfg(test)]
mod test {
    use chrono::{TimeDelta, TimeZone};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn card(id: i32, interval: i32, repetitions: i32, due_in_days: i64) -> Flashcard {
        Flashcard {
            id,
            deck_id: 1,
            front: format!("front {id}"),
            back: format!("back {id}"),
            interval,
            repetitions,
            due_date: now() + TimeDelta::days(due_in_days),
            created: now() - TimeDelta::days(60),
            last_reviewed: None,
            last_confidence: None,
        }
    }

    fn state(interval: i32, repetitions: i32) -> ReviewState {
        ReviewState {
            interval,
            repetitions,
        }
    }

    #[test]
    fn mastery_boundary_is_inclusive() {
        assert_eq!(classify_card(&state(20, 1), 21), CardState::Learning);
        assert_eq!(classify_card(&state(21, 1), 21), CardState::Mastered);
        assert_eq!(classify_card(&state(0, 0), 21), CardState::New);
        // reset by "again"
        assert_eq!(classify_card(&state(1, 0), 21), CardState::New);
        assert_eq!(classify_card(&state(30, 0), 21), CardState::New);
    }

    #[test]
    fn classification_is_stable() {
        let c = state(9, 2);
        assert_eq!(classify_card(&c, 21), classify_card(&c, 21));
        assert_eq!(classify_card(&c, 5), CardState::Mastered);
        assert_eq!(
            classify_card(&ReviewState::from(&card(1, 9, 2, 0)), 21),
            classify_card(&c, 21)
        );
    }

    #[test]
    fn due_cards_filters_and_sorts() {
        let cards = vec![card(1, 2, 1, 2), card(2, 1, 1, -1), card(3, 0, 0, 0), card(4, 5, 2, -5)];
        let due: Vec<i32> = due_cards(&cards, now()).iter().map(|c| c.id).collect();
        assert_eq!(due, [4, 2, 3]);
        assert!(!due.contains(&1));
    }

    #[test]
    fn due_cards_ties_keep_insertion_order() {
        let cards = vec![card(7, 0, 0, -1), card(3, 0, 0, -1), card(5, 0, 0, -2)];
        let due: Vec<i32> = due_cards(&cards, now()).iter().map(|c| c.id).collect();
        assert_eq!(due, [5, 7, 3]);
        // recomputed fresh each call
        let again: Vec<i32> = due_cards(&cards, now()).iter().map(|c| c.id).collect();
        assert_eq!(due, again);
    }

    #[test]
    fn stats_count_all_cards() {
        let cards = vec![
            card(1, 0, 0, 0),
            card(2, 4, 2, 3),
            card(3, 25, 4, 10),
            card(4, 21, 3, -1),
            card(5, 1, 0, -2),
        ];
        assert_eq!(
            deck_stats(&cards, now(), 21),
            DeckStats {
                new_count: 2,
                learning_count: 1,
                mastered_count: 2,
                due_count: 3,
                total: 5,
            }
        );
        assert_eq!(deck_stats(&[], now(), 21), DeckStats::default());
    }
}
