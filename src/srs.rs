//! Review scheduling: maps a confidence rating to the next interval and due date.
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::SchedulerError,
    models::{Confidence, Flashcard},
};

pub const DEFAULT_MASTERY_THRESHOLD_DAYS: i32 = 21;
/// About 100,000 years, well inside chrono's date range.
pub const DEFAULT_MAX_INTERVAL_DAYS: i32 = 36_500_000;

const HARD_FACTOR: f64 = 1.2;
const GOOD_FACTOR: f64 = 2.0;
const EASY_FACTOR: f64 = 2.5;
const EASY_FIRST_INTERVAL: i32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub mastery_threshold_days: i32,
    pub max_interval_days: i32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mastery_threshold_days: DEFAULT_MASTERY_THRESHOLD_DAYS,
            max_interval_days: DEFAULT_MAX_INTERVAL_DAYS,
        }
    }
}

/// The part of a card the scheduler reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReviewState {
    pub interval: i32,
    pub repetitions: i32,
}

impl From<&Flashcard> for ReviewState {
    fn from(card: &Flashcard) -> Self {
        Self {
            interval: card.interval,
            repetitions: card.repetitions,
        }
    }
}

impl ReviewState {
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.interval < 0 {
            return Err(SchedulerError::InvalidState(format!(
                "negative interval {}",
                self.interval
            )));
        }
        if self.repetitions < 0 {
            return Err(SchedulerError::InvalidState(format!(
                "negative repetitions {}",
                self.repetitions
            )));
        }
        Ok(())
    }
}

/// Outcome of a single review, to be persisted by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Review {
    pub interval: i32,
    pub repetitions: i32,
    pub due_date: DateTime<Utc>,
}

fn scale(interval: i32, factor: f64) -> f64 {
    (f64::from(interval) * factor).round()
}

pub fn review_card(
    state: &ReviewState,
    confidence: Confidence,
    now: DateTime<Utc>,
    config: &SchedulerConfig,
) -> Result<Review, SchedulerError> {
    state.validate()?;

    let (interval, repetitions) = match confidence {
        Confidence::Again => (1.0, 0),
        Confidence::Hard => (scale(state.interval, HARD_FACTOR).max(1.0), state.repetitions),
        Confidence::Good => {
            let interval = if state.interval == 0 {
                1.0
            } else {
                scale(state.interval, GOOD_FACTOR)
            };
            (interval, state.repetitions.saturating_add(1))
        }
        Confidence::Easy => {
            let interval = if state.interval == 0 {
                f64::from(EASY_FIRST_INTERVAL)
            } else {
                scale(state.interval, EASY_FACTOR)
            };
            (interval, state.repetitions.saturating_add(1))
        }
    };
    // bounded by max_interval_days, so the cast cannot truncate
    let interval = interval.min(f64::from(config.max_interval_days.max(1))) as i32;

    let due_date = now
        .checked_add_signed(TimeDelta::days(i64::from(interval)))
        .ok_or_else(|| {
            SchedulerError::InvalidArgument(format!("due date out of range for {interval} days"))
        })?;

    Ok(Review {
        interval,
        repetitions,
        due_date,
    })
}
