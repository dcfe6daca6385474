//! Import of Anki-style plain-text exports.
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{errors::SchedulerError, store::Store};

#[derive(Clone, Debug, Deserialize)]
pub struct ImportRequest {
    pub front_idx: usize,
    pub back_idx: usize,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportedCard {
    pub front: String,
    pub back: String,
}

fn separator_from_header(value: &str) -> Option<char> {
    let value = value.trim();
    match value {
        "tab" => Some('\t'),
        "comma" => Some(','),
        "semicolon" => Some(';'),
        "space" => Some(' '),
        "pipe" => Some('|'),
        "colon" => Some(':'),
        _ => value.strip_prefix('\'').and_then(|rest| rest.chars().next()),
    }
}

/// Parses `text` into cards. A repeated front keeps its first position and its last back.
pub fn parse_anki_text(
    front_idx: usize,
    back_idx: usize,
    text: &str,
) -> Result<Vec<ImportedCard>, SchedulerError> {
    if front_idx == back_idx {
        return Err(SchedulerError::InvalidArgument(format!(
            "front and back both read column {front_idx}"
        )));
    }
    let mut separator = '\t';
    let mut cards: Vec<ImportedCard> = vec![];
    let mut positions: HashMap<String, usize> = HashMap::new();
    let last_column = front_idx.max(back_idx);

    for line in text.lines() {
        if let Some(header) = line.strip_prefix('#') {
            if let Some(value) = header.strip_prefix("separator:") {
                match separator_from_header(value) {
                    Some(sep) => separator = sep,
                    None => warn!("Unknown separator header '{}', keeping previous", value),
                }
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        let columns: Vec<&str> = line.split(separator).take(last_column + 1).collect();
        let (Some(front), Some(back)) = (columns.get(front_idx), columns.get(back_idx)) else {
            continue;
        };
        let (front, back) = (front.trim(), back.trim());
        if front.is_empty() || back.is_empty() {
            continue;
        }
        match positions.get(front) {
            Some(&pos) => cards[pos].back = back.to_string(),
            None => {
                positions.insert(front.to_string(), cards.len());
                cards.push(ImportedCard {
                    front: front.to_string(),
                    back: back.to_string(),
                });
            }
        }
    }

    Ok(cards)
}

/// Adds every parsed card to the deck, all or nothing. Returns how many were created.
pub fn import_into_deck(
    store: &Store,
    user_id: &str,
    deck_id: i32,
    request: &ImportRequest,
    now: DateTime<Utc>,
) -> Result<usize, SchedulerError> {
    store.get_deck(user_id, deck_id)?;
    let texts: Vec<(String, String)> = parse_anki_text(request.front_idx, request.back_idx, &request.text)?
        .into_iter()
        .map(|card| (card.front, card.back))
        .collect();
    let created = store.create_cards(user_id, deck_id, &texts, now)?;
    info!("Imported {} flashcards into deck {}", created.len(), deck_id);
    Ok(created.len())
}
