//! Snapshot-based undo/redo history.
//!
//! Every entry holds a full, independent copy of the board as it stood
//! *after* its operation. Undo and redo move an index through the entries
//! and replay the snapshot found there; the per-operation metadata is only
//! for labels.
//!
//! Two gestures would otherwise flood the history, so they are batched:
//!
//! - **Drag**: `save_drag_state_start` records start positions,
//!   `finish_drag_operation` writes one entry if anything actually moved.
//! - **Typing**: `save_content_state` keeps the content from the start of a
//!   burst and the latest content; the entry is written when the debounce
//!   window lapses (`poll`) or on `flush_content`.

use crate::board::CardStore;
use crate::error::HistoryError;
use crate::timer::{Clock, Debouncer};
use nb_core::{BoardSnapshot, CardHeight, CardId};
use serde::Serialize;
use smallvec::SmallVec;
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

// ─── Entries ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    InitialState,
    CardCreate,
    CardDelete,
    MultiCardDelete,
    CardDuplicate,
    MultiCardDuplicate,
    CardMove,
    MultiCardMove,
    CardResize,
    ContentEdit,
    BoardImport,
    BoardReset,
}

impl Operation {
    /// Human-readable label for notifications.
    pub fn label(self) -> &'static str {
        match self {
            Operation::InitialState => "initial state",
            Operation::CardCreate => "create card",
            Operation::CardDelete => "delete card",
            Operation::MultiCardDelete => "delete cards",
            Operation::CardDuplicate => "duplicate card",
            Operation::MultiCardDuplicate => "duplicate cards",
            Operation::CardMove => "move card",
            Operation::MultiCardMove => "move cards",
            Operation::CardResize => "resize card",
            Operation::ContentEdit => "edit text",
            Operation::BoardImport => "import board",
            Operation::BoardReset => "reset board",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CardMove {
    pub id: CardId,
    pub from: (f64, f64),
    pub to: (f64, f64),
}

/// Operation-specific detail, used for display only.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OperationMeta {
    #[default]
    None,
    Cards {
        ids: SmallVec<[CardId; 4]>,
    },
    Moves {
        moves: Vec<CardMove>,
    },
    Resize {
        id: CardId,
        before: (f64, CardHeight),
        after: (f64, CardHeight),
    },
    Content {
        id: CardId,
        before: String,
        after: String,
    },
}

impl OperationMeta {
    pub fn cards(ids: impl IntoIterator<Item = CardId>) -> Self {
        OperationMeta::Cards {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn affected(&self) -> SmallVec<[CardId; 4]> {
        match self {
            OperationMeta::None => SmallVec::new(),
            OperationMeta::Cards { ids } => ids.clone(),
            OperationMeta::Moves { moves } => moves.iter().map(|m| m.id).collect(),
            OperationMeta::Resize { id, .. } | OperationMeta::Content { id, .. } => {
                smallvec::smallvec![*id]
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub operation: Operation,
    /// Milliseconds, from the board's clock.
    pub timestamp: f64,
    pub snapshot: BoardSnapshot,
    pub meta: OperationMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryLabel {
    pub operation: Operation,
    pub label: &'static str,
    pub affected: SmallVec<[CardId; 4]>,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStatus {
    pub can_undo: bool,
    pub can_redo: bool,
    pub len: usize,
    pub index: isize,
    pub entries: Vec<EntryLabel>,
}

// ─── Pending batches ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct PendingDrag {
    starts: Vec<(CardId, f64, f64)>,
}

#[derive(Debug, Clone)]
struct PendingContent {
    id: CardId,
    before: String,
    after: String,
}

/// Clears the restoring flag on every exit path, unwinding included.
struct RestoreGuard<'a>(&'a Cell<bool>);

impl<'a> RestoreGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

// ─── Manager ─────────────────────────────────────────────────────────────

pub struct HistoryManager {
    entries: VecDeque<HistoryEntry>,
    /// Last applied entry; `None` only before `initialize`.
    index: Option<usize>,
    max_entries: usize,
    restoring: Cell<bool>,
    drag: Option<PendingDrag>,
    content: Option<PendingContent>,
    content_timer: Debouncer,
    clock: Rc<dyn Clock>,
}

impl HistoryManager {
    pub fn new(max_entries: usize, content_debounce_ms: f64, clock: Rc<dyn Clock>) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries.min(256)),
            index: None,
            max_entries: max_entries.max(1),
            restoring: Cell::new(false),
            drag: None,
            content: None,
            content_timer: Debouncer::new(content_debounce_ms),
            clock,
        }
    }

    // ─── Status ──────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current index, `-1` when empty.
    pub fn index(&self) -> isize {
        self.index.map_or(-1, |i| i as isize)
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.index, Some(i) if i > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.index, Some(i) if i + 1 < self.entries.len())
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring.get()
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.index.and_then(|i| self.entries.get(i))
    }

    pub fn has_pending_content(&self) -> bool {
        self.content.is_some()
    }

    /// Card whose content burst is still waiting for its debounce window.
    pub fn pending_content_card(&self) -> Option<CardId> {
        self.content.as_ref().map(|c| c.id)
    }

    /// Everything a history panel or toolbar needs, ready to serialize.
    pub fn status(&self) -> HistoryStatus {
        HistoryStatus {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            len: self.entries.len(),
            index: self.index(),
            entries: self
                .entries
                .iter()
                .map(|e| EntryLabel {
                    operation: e.operation,
                    label: e.operation.label(),
                    affected: e.meta.affected(),
                    timestamp: e.timestamp,
                })
                .collect(),
        }
    }

    // ─── Recording ───────────────────────────────────────────────────────

    /// Deep copy of the board as it is right now.
    pub fn capture_snapshot(&self, store: &CardStore) -> BoardSnapshot {
        store.snapshot()
    }

    /// Drop all entries and record the startup state as the undo floor.
    pub fn initialize(&mut self, store: &CardStore) {
        self.entries.clear();
        self.index = None;
        self.drag = None;
        self.content = None;
        self.content_timer.cancel();
        self.save_state(store, Operation::InitialState, OperationMeta::None);
    }

    /// Append an entry for the board as it is now.
    ///
    /// Entries past the current index are discarded first; the oldest entry
    /// is evicted once the cap is exceeded. No-op while restoring.
    pub fn save_state(&mut self, store: &CardStore, operation: Operation, meta: OperationMeta) -> bool {
        if self.restoring.get() {
            log::trace!("save_state({operation:?}) ignored during restore");
            return false;
        }

        let entry = HistoryEntry {
            operation,
            timestamp: self.clock.now_ms(),
            snapshot: self.capture_snapshot(store),
            meta,
        };

        match self.index {
            Some(i) => self.entries.truncate(i + 1),
            None => self.entries.clear(),
        }
        self.entries.push_back(entry);
        let mut index = self.entries.len() - 1;
        if self.entries.len() > self.max_entries {
            self.entries.pop_front();
            index -= 1;
        }
        self.index = Some(index);

        log::debug!(
            "history: saved {operation:?} ({} entries, index {index})",
            self.entries.len()
        );
        true
    }

    /// Remember where the dragged cards started. Writes nothing.
    pub fn save_drag_state_start(&mut self, store: &CardStore, ids: &[CardId]) {
        let starts = ids
            .iter()
            .filter_map(|&id| store.get(id).map(|c| (id, c.x, c.y)))
            .collect();
        self.drag = Some(PendingDrag { starts });
    }

    /// Close the drag opened by `save_drag_state_start`. Writes a
    /// `CardMove`/`MultiCardMove` entry only if some card moved.
    pub fn finish_drag_operation(&mut self, store: &CardStore) -> bool {
        let Some(drag) = self.drag.take() else {
            return false;
        };
        let moves: Vec<CardMove> = drag
            .starts
            .iter()
            .filter_map(|&(id, x, y)| {
                store.get(id).map(|c| CardMove {
                    id,
                    from: (x, y),
                    to: (c.x, c.y),
                })
            })
            .collect();
        if moves.iter().all(|m| m.from == m.to) {
            return false;
        }
        let operation = if drag.starts.len() > 1 {
            Operation::MultiCardMove
        } else {
            Operation::CardMove
        };
        self.save_state(store, operation, OperationMeta::Moves { moves })
    }

    /// Note a content edit. Consecutive edits to the same card inside the
    /// debounce window collapse into one entry spanning the whole burst.
    pub fn save_content_state(&mut self, store: &CardStore, id: CardId, before: &str, after: &str) {
        if self.restoring.get() {
            return;
        }
        match &mut self.content {
            Some(pending) if pending.id == id => pending.after = after.to_string(),
            _ => {
                self.flush_content(store);
                self.content = Some(PendingContent {
                    id,
                    before: before.to_string(),
                    after: after.to_string(),
                });
            }
        }
        self.content_timer.schedule(self.clock.now_ms());
    }

    /// Write the pending content burst now, if any.
    pub fn flush_content(&mut self, store: &CardStore) -> bool {
        self.content_timer.cancel();
        let Some(pending) = self.content.take() else {
            return false;
        };
        if pending.before == pending.after {
            return false;
        }
        self.save_state(
            store,
            Operation::ContentEdit,
            OperationMeta::Content {
                id: pending.id,
                before: pending.before,
                after: pending.after,
            },
        )
    }

    /// Timer hook: write the content burst once its window has lapsed.
    pub fn poll(&mut self, store: &CardStore) -> bool {
        if self.content_timer.fire_if_due(self.clock.now_ms()) {
            self.flush_content(store)
        } else {
            false
        }
    }

    // ─── Replay ──────────────────────────────────────────────────────────

    /// Step back one entry. Returns the operation that was undone.
    pub fn undo(&mut self, store: &mut CardStore) -> Result<Operation, HistoryError> {
        self.flush_content(store);
        let current = match self.index {
            Some(i) if i > 0 => i,
            _ => return Err(HistoryError::NothingToUndo),
        };
        let undone = self.entries[current].operation;
        self.index = Some(current - 1);
        self.apply_state(store, current - 1);
        log::debug!("history: undo {undone:?} -> index {}", current - 1);
        Ok(undone)
    }

    /// Step forward one entry. Returns the operation that was redone.
    pub fn redo(&mut self, store: &mut CardStore) -> Result<Operation, HistoryError> {
        self.flush_content(store);
        let next = match self.index {
            Some(i) if i + 1 < self.entries.len() => i + 1,
            _ => return Err(HistoryError::NothingToRedo),
        };
        self.index = Some(next);
        self.apply_state(store, next);
        let redone = self.entries[next].operation;
        log::debug!("history: redo {redone:?} -> index {next}");
        Ok(redone)
    }

    /// Replay the snapshot at `index` into the store.
    fn apply_state(&mut self, store: &mut CardStore, index: usize) {
        self.drag = None;
        let _guard = RestoreGuard::enter(&self.restoring);
        store.restore(&self.entries[index].snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualClock;
    use nb_core::CardPatch;
    use pretty_assertions::assert_eq;

    fn setup(limit: usize) -> (HistoryManager, CardStore, ManualClock) {
        let clock = ManualClock::new(0.0);
        let history = HistoryManager::new(limit, 1000.0, Rc::new(clock.clone()));
        (history, CardStore::new(), clock)
    }

    #[test]
    fn initialize_sets_undo_floor() {
        let (mut h, store, _) = setup(10);
        h.initialize(&store);
        assert_eq!(h.len(), 1);
        assert_eq!(h.index(), 0);
        assert!(!h.can_undo());
        assert!(!h.can_redo());
    }

    #[test]
    fn empty_history_reports_minus_one() {
        let (h, _, _) = setup(10);
        assert_eq!(h.index(), -1);
    }

    #[test]
    fn undo_redo_move_between_snapshots() {
        let (mut h, mut store, _) = setup(10);
        h.initialize(&store);
        let id = store.create(0.0, 0.0, 300.0);
        h.save_state(&store, Operation::CardCreate, OperationMeta::cards([id]));

        assert_eq!(h.undo(&mut store), Ok(Operation::CardCreate));
        assert!(store.is_empty());
        assert_eq!(h.redo(&mut store), Ok(Operation::CardCreate));
        assert!(store.contains(id));
        assert_eq!(h.redo(&mut store), Err(HistoryError::NothingToRedo));
    }

    #[test]
    fn undo_at_floor_fails() {
        let (mut h, mut store, _) = setup(10);
        h.initialize(&store);
        assert_eq!(h.undo(&mut store), Err(HistoryError::NothingToUndo));
    }

    #[test]
    fn new_save_after_undo_truncates_redo_branch() {
        let (mut h, mut store, _) = setup(10);
        h.initialize(&store);
        store.create(0.0, 0.0, 300.0);
        h.save_state(&store, Operation::CardCreate, OperationMeta::None);
        h.undo(&mut store).unwrap();
        store.create(50.0, 50.0, 300.0);
        h.save_state(&store, Operation::CardCreate, OperationMeta::None);
        assert!(!h.can_redo());
        assert_eq!(h.redo(&mut store), Err(HistoryError::NothingToRedo));
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn cap_evicts_oldest_and_keeps_index_valid() {
        let (mut h, mut store, _) = setup(3);
        h.initialize(&store);
        for _ in 0..5 {
            store.create(0.0, 0.0, 300.0);
            h.save_state(&store, Operation::CardCreate, OperationMeta::None);
            assert!(h.len() <= 3);
            assert_eq!(h.index(), h.len() as isize - 1);
        }
        let mut undos = 0;
        while h.undo(&mut store).is_ok() {
            undos += 1;
        }
        assert_eq!(undos, 2);
        assert_eq!(h.index(), 0);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn drag_without_movement_writes_nothing() {
        let (mut h, mut store, _) = setup(10);
        let id = store.create(0.0, 0.0, 300.0);
        h.initialize(&store);
        h.save_drag_state_start(&store, &[id]);
        assert!(!h.finish_drag_operation(&store));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn drag_writes_one_entry_per_gesture() {
        let (mut h, mut store, _) = setup(10);
        let a = store.create(0.0, 0.0, 300.0);
        let b = store.create(400.0, 0.0, 300.0);
        h.initialize(&store);
        h.save_drag_state_start(&store, &[a, b]);
        for step in 1..=10 {
            store.set_position(a, step as f64, 0.0).unwrap();
            store.set_position(b, 400.0 + step as f64, 0.0).unwrap();
        }
        assert!(h.finish_drag_operation(&store));
        assert_eq!(h.len(), 2);
        let entry = h.current().unwrap();
        assert_eq!(entry.operation, Operation::MultiCardMove);
        assert_eq!(entry.meta.affected().as_slice(), &[a, b]);

        h.undo(&mut store).unwrap();
        assert_eq!(store.get(a).unwrap().x, 0.0);
        assert_eq!(store.get(b).unwrap().x, 400.0);
    }

    #[test]
    fn content_burst_collapses_into_one_entry() {
        let (mut h, mut store, clock) = setup(10);
        let id = store.create(0.0, 0.0, 300.0);
        h.initialize(&store);

        let mut previous = String::new();
        for text in ["<p>h</p>", "<p>he</p>", "<p>hey</p>"] {
            store.update(id, CardPatch::content(text)).unwrap();
            h.save_content_state(&store, id, &previous, text);
            previous = text.to_string();
            clock.advance(200.0);
            assert!(!h.poll(&store));
        }
        clock.advance(1000.0);
        assert!(h.poll(&store));
        assert_eq!(h.len(), 2);
        match &h.current().unwrap().meta {
            OperationMeta::Content { before, after, .. } => {
                assert_eq!(before, "");
                assert_eq!(after, "<p>hey</p>");
            }
            other => panic!("unexpected meta {other:?}"),
        }
    }

    #[test]
    fn undo_flushes_pending_content_first() {
        let (mut h, mut store, _) = setup(10);
        let id = store.create(0.0, 0.0, 300.0);
        h.initialize(&store);
        store.update(id, CardPatch::content("draft")).unwrap();
        h.save_content_state(&store, id, "", "draft");

        assert_eq!(h.undo(&mut store), Ok(Operation::ContentEdit));
        assert_eq!(store.get(id).unwrap().content, "");
        h.redo(&mut store).unwrap();
        assert_eq!(store.get(id).unwrap().content, "draft");
    }

    #[test]
    fn edit_that_returns_to_original_writes_nothing() {
        let (mut h, mut store, _) = setup(10);
        let id = store.create(0.0, 0.0, 300.0);
        h.initialize(&store);
        h.save_content_state(&store, id, "a", "ab");
        h.save_content_state(&store, id, "ab", "a");
        assert!(!h.flush_content(&store));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn restoring_flag_clears_after_apply() {
        let (mut h, mut store, _) = setup(10);
        h.initialize(&store);
        store.create(0.0, 0.0, 300.0);
        h.save_state(&store, Operation::CardCreate, OperationMeta::None);
        h.undo(&mut store).unwrap();
        assert!(!h.is_restoring());
        assert!(h.save_state(&store, Operation::CardCreate, OperationMeta::None));
    }

    #[test]
    fn restoring_flag_clears_on_unwind() {
        let flag = Cell::new(false);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = RestoreGuard::enter(&flag);
            assert!(flag.get());
            panic!("restore failed midway");
        }));
        assert!(result.is_err());
        assert!(!flag.get());
    }

    #[test]
    fn undo_redo_round_trip_restores_latest_snapshot() {
        let (mut h, mut store, _) = setup(50);
        h.initialize(&store);
        let mut ids = Vec::new();
        for i in 0..6 {
            let id = store.create(i as f64 * 10.0, 0.0, 300.0);
            store.update(id, CardPatch::content(format!("<p>{i}</p>"))).unwrap();
            store.select_only(id).unwrap();
            ids.push(id);
            h.save_state(&store, Operation::CardCreate, OperationMeta::cards([id]));
        }
        let latest = store.snapshot();
        let n = h.len();
        for _ in 0..n - 1 {
            h.undo(&mut store).unwrap();
        }
        assert!(store.is_empty());
        for _ in 0..n - 1 {
            h.redo(&mut store).unwrap();
        }
        assert_eq!(store.snapshot(), latest);
    }

    #[test]
    fn status_lists_labels_and_position() {
        let (mut h, mut store, clock) = setup(10);
        h.initialize(&store);
        clock.advance(5.0);
        let id = store.create(0.0, 0.0, 300.0);
        h.save_state(&store, Operation::CardCreate, OperationMeta::cards([id]));
        h.undo(&mut store).unwrap();

        let status = h.status();
        assert!(!status.can_undo);
        assert!(status.can_redo);
        assert_eq!(status.index, 0);
        let labels: Vec<&str> = status.entries.iter().map(|e| e.label).collect();
        assert_eq!(labels, vec!["initial state", "create card"]);
        assert_eq!(status.entries[1].affected.as_slice(), &[id]);
        assert_eq!(status.entries[1].timestamp, 5.0);
    }
}
