//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. Each action
//! translates to exactly one engine or history call.
//!
//! While a text field has focus, plain keys belong to the text, so only
//! the save/export combos and Escape resolve.

use crate::input::Modifiers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Cards ──
    NewCard,
    Duplicate,
    Delete,
    SelectAll,
    Escape,

    // ── History ──
    Undo,
    Redo,

    // ── Board ──
    Save,
    Export,

    // ── View ──
    CenterView,
    ZoomIn,
    ZoomOut,
}

impl ShortcutAction {
    pub fn name(self) -> &'static str {
        match self {
            ShortcutAction::NewCard => "newCard",
            ShortcutAction::Duplicate => "duplicate",
            ShortcutAction::Delete => "delete",
            ShortcutAction::SelectAll => "selectAll",
            ShortcutAction::Escape => "escape",
            ShortcutAction::Undo => "undo",
            ShortcutAction::Redo => "redo",
            ShortcutAction::Save => "save",
            ShortcutAction::Export => "export",
            ShortcutAction::CenterView => "centerView",
            ShortcutAction::ZoomIn => "zoomIn",
            ShortcutAction::ZoomOut => "zoomOut",
        }
    }
}

pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(key: &str, mods: Modifiers, in_text_field: bool) -> Option<ShortcutAction> {
        let cmd = mods.command();

        if in_text_field {
            return match key {
                "s" | "S" if cmd => Some(ShortcutAction::Save),
                "e" | "E" if cmd => Some(ShortcutAction::Export),
                "Escape" => Some(ShortcutAction::Escape),
                _ => None,
            };
        }

        // ── Modifier combos first (most specific) ──
        if cmd && mods.shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "a" | "A" => Some(ShortcutAction::SelectAll),
                "d" | "D" => Some(ShortcutAction::Duplicate),
                "s" | "S" => Some(ShortcutAction::Save),
                "e" | "E" => Some(ShortcutAction::Export),
                "0" => Some(ShortcutAction::CenterView),
                "=" | "+" => Some(ShortcutAction::ZoomIn),
                "-" => Some(ShortcutAction::ZoomOut),
                _ => None,
            };
        }

        if mods.alt {
            return None;
        }

        // ── Single keys ──
        match key {
            "n" | "N" => Some(ShortcutAction::NewCard),
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "Escape" => Some(ShortcutAction::Escape),
            _ => None,
        }
    }
}
