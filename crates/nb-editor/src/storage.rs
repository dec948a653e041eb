//! Persistence and import/export of whole boards.
//!
//! Persisted shape (also the export document):
//!
//! ```json
//! { "cards": [ {"id":1,"x":0,"y":0,"width":300,"height":"auto","content":"..."} ],
//!   "worldState": { "translateX":0, "translateY":0, "scale":1,
//!                   "targetTX":0, "targetTY":0, "targetScale":1 },
//!   "version": 1, "timestamp": 1700000000000 }
//! ```
//!
//! Import is validated in full before anything touches the board.

use crate::error::{ImportError, StorageError};
use nb_core::{Card, CardId, ViewState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedBoard {
    pub cards: Vec<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_state: Option<ViewState>,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub timestamp: f64,
}

fn default_version() -> u32 {
    FORMAT_VERSION
}

impl PersistedBoard {
    pub fn new(cards: Vec<Card>, world_state: Option<ViewState>, timestamp: f64) -> Self {
        Self {
            cards,
            world_state,
            version: FORMAT_VERSION,
            timestamp,
        }
    }

    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(StorageError::Serialize)
    }

    pub fn to_json_pretty(&self) -> Result<String, StorageError> {
        serde_json::to_string_pretty(self).map_err(StorageError::Serialize)
    }
}

/// Where the board lives between sessions.
pub trait BoardStorage {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<PersistedBoard>, StorageError>;
    fn save(&mut self, board: &PersistedBoard) -> Result<(), StorageError>;
    fn clear(&mut self) -> Result<(), StorageError>;
}

/// Storage backed by a JSON string held in memory.
///
/// Goes through the same serialization as a real backend; `set_fail_writes`
/// simulates a full or unavailable store.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Option<String>,
    fail_writes: bool,
    writes: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(json: impl Into<String>) -> Self {
        Self {
            data: Some(json.into()),
            ..Self::default()
        }
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn raw(&self) -> Option<&str> {
        self.data.as_deref()
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl BoardStorage for MemoryStorage {
    fn load(&self) -> Result<Option<PersistedBoard>, StorageError> {
        match &self.data {
            None => Ok(None),
            Some(json) => serde_json::from_str(json)
                .map(Some)
                .map_err(StorageError::Corrupt),
        }
    }

    fn save(&mut self, board: &PersistedBoard) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::WriteRejected("quota exceeded".into()));
        }
        self.data = Some(board.to_json()?);
        self.writes += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::WriteRejected("quota exceeded".into()));
        }
        self.data = None;
        Ok(())
    }
}

/// Lets a host keep its own handle on the storage it gives the board.
impl<S: BoardStorage> BoardStorage for Rc<RefCell<S>> {
    fn load(&self) -> Result<Option<PersistedBoard>, StorageError> {
        self.borrow().load()
    }

    fn save(&mut self, board: &PersistedBoard) -> Result<(), StorageError> {
        self.borrow_mut().save(board)
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.borrow_mut().clear()
    }
}

// ─── Import ──────────────────────────────────────────────────────────────

/// A validated import document, ready to replace the board.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedBoard {
    pub cards: Vec<Card>,
    pub world_state: Option<ViewState>,
}

/// Parse and validate an uploaded document.
///
/// Requires an array-typed `cards` field whose every element is a valid
/// card record with a unique id. `worldState`, if present, must be valid.
pub fn parse_import(text: &str) -> Result<ImportedBoard, ImportError> {
    let doc: Value = serde_json::from_str(text).map_err(ImportError::Malformed)?;
    let cards_value = doc.get("cards").ok_or(ImportError::MissingCards)?;
    let items = cards_value
        .as_array()
        .ok_or_else(|| ImportError::CardsNotArray(json_type_name(cards_value)))?;

    let mut cards = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let card: Card = serde_json::from_value(item.clone())
            .map_err(|source| ImportError::InvalidCard { index, source })?;
        cards.push(card);
    }
    validate_cards(&cards)?;

    let world_state = match doc.get("worldState") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            serde_json::from_value::<ViewState>(v.clone()).map_err(ImportError::InvalidWorldState)?,
        ),
    };

    Ok(ImportedBoard { cards, world_state })
}

/// Check the records a board may hold: ids in `1..=CardId::MAX` and unique,
/// geometry finite with a positive width.
///
/// Shared by import and by loading a saved board.
pub fn validate_cards(cards: &[Card]) -> Result<(), ImportError> {
    let mut seen: HashSet<CardId> = HashSet::with_capacity(cards.len());
    for (index, card) in cards.iter().enumerate() {
        if !card.id.is_valid() {
            return Err(invalid_card(index, "id must be an integer from 1 to 2^53 - 1"));
        }
        if !(card.width.is_finite() && card.width > 0.0 && card.x.is_finite() && card.y.is_finite())
        {
            return Err(invalid_card(index, "geometry must be finite with positive width"));
        }
        if !seen.insert(card.id) {
            return Err(ImportError::DuplicateId(card.id));
        }
    }
    Ok(())
}

fn invalid_card(index: usize, msg: &str) -> ImportError {
    ImportError::InvalidCard {
        index,
        source: serde::de::Error::custom(msg),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
