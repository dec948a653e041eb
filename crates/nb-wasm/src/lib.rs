//! WASM bridge for Note Board: exposes `NoteBoard` to the page script.
//!
//! Compiled via `wasm-pack build --target web`. The page does its own hit
//! testing and DOM rendering; it forwards input here and applies the JSON
//! events returned by `take_events()` after every call.

mod host;

use host::{DateClock, JsMeasure, LocalStorage};
use nb_core::{CardHeight, CardId, CardPatch, Tick, ViewportSize, WheelDelta};
use nb_editor::{BoardConfig, InputEvent, Modifiers, NoteBoard, PointerTarget};
use serde::Deserialize;
use serde::Serialize;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

const STORAGE_KEY: &str = "note-board";

/// The page-facing board controller.
#[wasm_bindgen]
pub struct NbBoard {
    board: NoteBoard,
}

#[wasm_bindgen]
impl NbBoard {
    /// Open the board saved in localStorage.
    ///
    /// `config_json` may override any subset of `BoardConfig`; pass an
    /// empty string for defaults. `measure(cardId)` must return the
    /// rendered height of an auto-height card.
    #[wasm_bindgen(constructor)]
    pub fn new(
        width: f64,
        height: f64,
        config_json: &str,
        measure: js_sys::Function,
    ) -> Result<NbBoard, JsValue> {
        console_error_panic_hook_setup();
        host::init_console_log(log::LevelFilter::Info);

        let config = if config_json.trim().is_empty() {
            BoardConfig::default()
        } else {
            BoardConfig::from_json(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?
        };
        let fallback = config.placement_height;
        let board = NoteBoard::open(
            config,
            ViewportSize { width, height },
            Box::new(LocalStorage::new(STORAGE_KEY)),
            Rc::new(DateClock),
            Box::new(JsMeasure::new(measure, fallback)),
        );
        Ok(Self { board })
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.board.resize(ViewportSize { width, height });
    }

    /// Drain queued events as a JSON array.
    pub fn take_events(&mut self) -> String {
        to_json(&self.board.take_events())
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// `target` is `"background"`, `"chrome"` (drag handle or card body),
    /// or `"content"` (the card's editable text). Returns true if consumed.
    pub fn pointer_down(&mut self, x: f64, y: f64, target: &str, card_id: f64) -> bool {
        match parse_target(target, card_id) {
            Some(target) => self.board.handle(InputEvent::PointerDown { x, y, target }),
            None => {
                log::warn!("bad pointer target {target:?} (card {card_id})");
                false
            }
        }
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        self.board.handle(InputEvent::PointerMove { x, y })
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) -> bool {
        self.board.handle(InputEvent::PointerUp { x, y })
    }

    /// `delta_mode` is the DOM `WheelEvent.deltaMode`.
    pub fn wheel(&mut self, x: f64, y: f64, delta_y: f64, delta_mode: u32) -> bool {
        self.board.handle(InputEvent::Wheel {
            x,
            y,
            delta: WheelDelta::from_dom(delta_y, delta_mode),
        })
    }

    /// Returns true if the key resolved to a shortcut (call
    /// `preventDefault`).
    pub fn key_down(
        &mut self,
        key: &str,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
        in_text_field: bool,
    ) -> bool {
        self.board.handle(InputEvent::Key {
            key: key.to_string(),
            modifiers: Modifiers {
                shift,
                ctrl,
                alt,
                meta,
            },
            in_text_field,
        })
    }

    pub fn set_multi_modifier(&mut self, held: bool) {
        self.board.handle(InputEvent::MultiSelectModifier { held });
    }

    pub fn focus_lost(&mut self) {
        self.board.handle(InputEvent::FocusLost);
    }

    // ─── Frames & timers ─────────────────────────────────────────────────

    /// Advance the view animation. Returns true while more frames are
    /// needed.
    pub fn frame(&mut self) -> bool {
        self.board.frame() == Tick::Continue
    }

    pub fn poll_timers(&mut self) {
        self.board.poll_timers();
    }

    /// Flush pending saves and history. Call from `beforeunload`.
    pub fn teardown(&mut self) {
        self.board.teardown();
    }

    // ─── Card operations ─────────────────────────────────────────────────

    /// Returns JSON `{"ok":true,"id":N}`.
    pub fn create_card(&mut self) -> String {
        match self.board.create_card() {
            Ok(id) => ok_with("id", id),
            Err(e) => err(e),
        }
    }

    /// Apply `{"width"?, "height"?: number | "auto", "content"?}`.
    /// Returns JSON `{"ok":true,"changed":{...}}`.
    pub fn update_card(&mut self, card_id: f64, patch_json: &str) -> String {
        let id = match card_id_from(card_id) {
            Ok(id) => id,
            Err(e) => return err(e),
        };
        let patch: PatchJson = match serde_json::from_str(patch_json) {
            Ok(p) => p,
            Err(e) => return err(format!("invalid patch: {e}")),
        };
        match self.board.update_card(id, patch.into()) {
            Ok(changed) => ok_with("changed", changed),
            Err(e) => err(e),
        }
    }

    pub fn delete_card(&mut self, card_id: f64) -> String {
        let id = match card_id_from(card_id) {
            Ok(id) => id,
            Err(e) => return err(e),
        };
        match self.board.delete_card(id) {
            Ok(()) => ok(),
            Err(e) => err(e),
        }
    }

    pub fn duplicate_selected(&mut self) -> String {
        match self.board.duplicate_selected() {
            Ok(ids) => ok_with("ids", ids),
            Err(e) => err(e),
        }
    }

    pub fn delete_selected(&mut self) -> String {
        match self.board.delete_selected() {
            Ok(count) => ok_with("deleted", count),
            Err(e) => err(e),
        }
    }

    pub fn select_card(&mut self, card_id: f64) -> String {
        let id = match card_id_from(card_id) {
            Ok(id) => id,
            Err(e) => return err(e),
        };
        match self.board.select_card(id) {
            Ok(()) => ok(),
            Err(e) => err(e),
        }
    }

    pub fn select_all(&mut self) {
        self.board.select_all();
    }

    pub fn escape(&mut self) {
        self.board.escape();
    }

    // ─── History ─────────────────────────────────────────────────────────

    /// Returns JSON `{"ok":true,"operation":"card_move"}` or an error.
    pub fn undo(&mut self) -> String {
        match self.board.undo() {
            Ok(op) => ok_with("operation", op),
            Err(e) => err(e),
        }
    }

    pub fn redo(&mut self) -> String {
        match self.board.redo() {
            Ok(op) => ok_with("operation", op),
            Err(e) => err(e),
        }
    }

    pub fn history_status(&self) -> String {
        to_json(&self.board.history_status())
    }

    // ─── View ────────────────────────────────────────────────────────────

    pub fn center_view(&mut self) {
        self.board.center_view();
    }

    pub fn zoom_in(&mut self) {
        self.board.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.board.zoom_out();
    }

    /// `[wx, wy]` for a screen point.
    pub fn screen_to_world(&self, x: f64, y: f64) -> Vec<f64> {
        let (wx, wy) = self.board.viewport().screen_to_world(x, y);
        vec![wx, wy]
    }

    pub fn view_state(&self) -> String {
        to_json(&self.board.viewport().state())
    }

    pub fn cards(&self) -> String {
        to_json(&self.board.store().card_list())
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    pub fn save(&mut self) -> String {
        match self.board.save_now() {
            Ok(()) => ok(),
            Err(e) => err(e),
        }
    }

    /// Returns JSON `{"ok":true,"document":"..."}` for download.
    pub fn export_document(&mut self) -> String {
        match self.board.export_document() {
            Ok(document) => ok_with("document", document),
            Err(e) => err(e),
        }
    }

    /// Returns JSON `{"ok":true,"cards":N}` or `{"ok":false,"error":"..."}`.
    /// On error the board is unchanged.
    pub fn import_document(&mut self, text: &str) -> String {
        match self.board.import_document(text) {
            Ok(count) => ok_with("cards", count),
            Err(e) => err(e),
        }
    }

    pub fn reset(&mut self) {
        self.board.reset();
    }
}

// ─── JSON helpers ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PatchJson {
    width: Option<f64>,
    height: Option<CardHeight>,
    content: Option<String>,
}

impl From<PatchJson> for CardPatch {
    fn from(p: PatchJson) -> Self {
        CardPatch {
            width: p.width,
            height: p.height,
            content: p.content,
        }
    }
}

fn parse_target(kind: &str, card_id: f64) -> Option<PointerTarget> {
    match kind {
        "background" => Some(PointerTarget::Background),
        "chrome" => card_id_from(card_id).ok().map(PointerTarget::CardChrome),
        "content" => card_id_from(card_id).ok().map(PointerTarget::CardContent),
        _ => None,
    }
}

/// JS numbers arrive as `f64`; only whole numbers in the valid id range
/// name a card.
fn card_id_from(raw: f64) -> Result<CardId, String> {
    if raw.is_finite() && raw.fract() == 0.0 && raw >= 1.0 && raw <= CardId::MAX.get() as f64 {
        Ok(CardId(raw as u64))
    } else {
        Err(format!("invalid card id: {raw}"))
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| err(format!("Serialization error: {e}")))
}

fn ok() -> String {
    r#"{"ok":true}"#.to_string()
}

fn ok_with<T: Serialize>(field: &str, value: T) -> String {
    let mut out = serde_json::Map::new();
    out.insert("ok".into(), serde_json::Value::Bool(true));
    match serde_json::to_value(value) {
        Ok(v) => {
            out.insert(field.into(), v);
            serde_json::Value::Object(out).to_string()
        }
        Err(e) => err(format!("Serialization error: {e}")),
    }
}

fn err(e: impl std::fmt::Display) -> String {
    serde_json::json!({ "ok": false, "error": e.to_string() }).to_string()
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Note Board WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}
