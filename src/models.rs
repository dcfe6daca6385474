use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::SchedulerError;

/// Self-reported recall quality at review time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Confidence {
    Again,
    Hard,
    Good,
    Easy,
}

impl FromStr for Confidence {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "again" => Ok(Self::Again),
            "hard" | "difficult" => Ok(Self::Hard),
            "good" => Ok(Self::Good),
            "easy" => Ok(Self::Easy),
            other => Err(SchedulerError::InvalidArgument(format!(
                "unknown confidence rating '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for Confidence {
    type Error = SchedulerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Again => "again",
            Self::Hard => "hard",
            Self::Good => "good",
            Self::Easy => "easy",
        };
        f.write_str(name)
    }
}

/// Derived mastery bucket of a card. Never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardState {
    New,
    Learning,
    Mastered,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: i32,
    pub name: String,
    pub user_id: String,
    pub subject: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeckNew {
    pub name: String,
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: i32,
    pub deck_id: i32,
    pub front: String,
    pub back: String,
    pub interval: i32,
    pub repetitions: i32,
    pub due_date: DateTime<Utc>,
    pub created: DateTime<Utc>,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub last_confidence: Option<Confidence>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlashcardNew {
    pub deck_id: i32,
    pub front: String,
    pub back: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlashcardUpdate {
    pub front: String,
    pub back: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlashcardMove {
    pub deck_id: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// Parsed with `Confidence::from_str`, so an unknown rating is an `InvalidArgument`.
    pub confidence: String,
}

/// A flashcard as the API returns it, with its derived state.
#[derive(Clone, Debug, Serialize)]
pub struct FlashcardView {
    #[serde(flatten)]
    pub flashcard: Flashcard,
    pub state: CardState,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckStats {
    pub new_count: usize,
    pub learning_count: usize,
    pub mastered_count: usize,
    pub due_count: usize,
    pub total: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct DeckWithStats {
    #[serde(flatten)]
    pub deck: Deck,
    pub stats: DeckStats,
}
