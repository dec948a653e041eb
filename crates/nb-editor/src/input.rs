//! Input abstraction layer.
//!
//! Normalizes pointer, wheel, and keyboard events from the host into a
//! single `InputEvent` enum dispatched by `NoteBoard::handle`. The host
//! does its own hit testing and reports what the pointer landed on.

use nb_core::{CardId, WheelDelta};

/// Modifier keys held during an input event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// ⌘ on macOS, Ctrl elsewhere.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// What a pointer-down landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// Empty canvas.
    Background,
    /// Card drag handle or non-content body.
    CardChrome(CardId),
    /// The card's rich-text content: selects, never drags.
    CardContent(CardId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        x: f64,
        y: f64,
        target: PointerTarget,
    },
    PointerMove {
        x: f64,
        y: f64,
    },
    PointerUp {
        x: f64,
        y: f64,
    },
    Wheel {
        x: f64,
        y: f64,
        delta: WheelDelta,
    },
    Key {
        key: String,
        modifiers: Modifiers,
        /// A text field (the rich-text editor, a form input) has focus.
        in_text_field: bool,
    },
    /// The multi-select modifier was pressed or released.
    MultiSelectModifier {
        held: bool,
    },
    FocusLost,
}

impl InputEvent {
    pub fn key(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self::Key {
            key: key.into(),
            modifiers,
            in_text_field: false,
        }
    }

    /// Extract position if this is a pointer event.
    pub fn position(&self) -> Option<(f64, f64)> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y }
            | Self::PointerUp { x, y }
            | Self::Wheel { x, y, .. } => Some((*x, *y)),
            _ => None,
        }
    }
}
