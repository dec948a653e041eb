//! Outbox of notifications for the presentation layer.
//!
//! The engine never calls into the renderer or the editing panel directly.
//! It queues `BoardEvent`s; the host drains them after each call and
//! applies whatever visual work they describe.

use nb_core::{Card, CardId, ChangedFields, GridStyle, ViewState};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BoardEvent {
    CardCreated {
        card: Card,
    },
    /// Only the listed fields need re-rendering.
    CardUpdated {
        card: Card,
        changed: ChangedFields,
    },
    CardRemoved {
        id: CardId,
    },
    /// Every card was replaced (load, import, undo/redo, reset).
    BoardReplaced {
        cards: Vec<Card>,
    },
    SelectionChanged {
        selected: Vec<CardId>,
        active: Option<CardId>,
    },
    /// Open the side editing panel on this card.
    EditorOpened {
        id: CardId,
    },
    EditorClosed,
    /// Alignment guides for the drag in progress; both `None` hides them.
    SnapGuides {
        x: Option<f64>,
        y: Option<f64>,
    },
    ViewChanged {
        view: ViewState,
        grid: GridStyle,
    },
    /// Schedule one animation frame, then call `frame()`.
    RequestFrame,
    /// An export was requested from the keyboard; offer it as a download.
    ExportReady {
        document: String,
    },
    Notice {
        level: NoticeLevel,
        message: String,
    },
}

impl BoardEvent {
    pub fn info(message: impl Into<String>) -> Self {
        BoardEvent::Notice {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        BoardEvent::Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}
