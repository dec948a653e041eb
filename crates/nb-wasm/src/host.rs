//! Browser-side collaborators: localStorage persistence, `Date.now()`
//! clock, a JS height-measurement callback, and a console logger.

use nb_core::CardId;
use nb_editor::{BoardStorage, Clock, HeightMeasure, PersistedBoard, StorageError};
use wasm_bindgen::JsValue;

fn js_error(e: JsValue) -> String {
    e.as_string().unwrap_or_else(|| format!("{e:?}"))
}

// ─── localStorage ────────────────────────────────────────────────────────

/// Persists the board as one JSON string under a fixed key.
pub struct LocalStorage {
    key: String,
}

impl LocalStorage {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    fn storage(&self) -> Result<web_sys::Storage, StorageError> {
        let window =
            web_sys::window().ok_or_else(|| StorageError::Unavailable("no window".into()))?;
        window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(js_error(e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage disabled".into()))
    }
}

impl BoardStorage for LocalStorage {
    fn load(&self) -> Result<Option<PersistedBoard>, StorageError> {
        let raw = self
            .storage()?
            .get_item(&self.key)
            .map_err(|e| StorageError::Unavailable(js_error(e)))?;
        match raw {
            None => Ok(None),
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(StorageError::Corrupt),
        }
    }

    fn save(&mut self, board: &PersistedBoard) -> Result<(), StorageError> {
        let json = board.to_json()?;
        self.storage()?
            .set_item(&self.key, &json)
            .map_err(|e| StorageError::WriteRejected(js_error(e)))
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.storage()?
            .remove_item(&self.key)
            .map_err(|e| StorageError::WriteRejected(js_error(e)))
    }
}

// ─── Clock ───────────────────────────────────────────────────────────────

pub struct DateClock;

impl Clock for DateClock {
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }
}

// ─── Measurement ─────────────────────────────────────────────────────────

/// Calls `measure(cardId) -> number` on the page for auto-height cards.
pub struct JsMeasure {
    callback: js_sys::Function,
    fallback: f64,
}

impl JsMeasure {
    pub fn new(callback: js_sys::Function, fallback: f64) -> Self {
        Self { callback, fallback }
    }
}

impl HeightMeasure for JsMeasure {
    fn measured_height(&self, id: CardId) -> f64 {
        let arg = JsValue::from_f64(id.get() as f64);
        match self.callback.call1(&JsValue::NULL, &arg) {
            Ok(v) => match v.as_f64() {
                Some(h) if h.is_finite() && h > 0.0 => h,
                _ => self.fallback,
            },
            Err(e) => {
                log::warn!("measure({id}) threw: {}", js_error(e));
                self.fallback
            }
        }
    }
}

// ─── Logging ─────────────────────────────────────────────────────────────

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&msg),
            log::Level::Warn => web_sys::console::warn_1(&msg),
            log::Level::Info => web_sys::console::info_1(&msg),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&msg),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Route `log` output to the browser console. Safe to call repeatedly.
pub fn init_console_log(level: log::LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
