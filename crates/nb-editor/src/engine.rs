//! The board's root context.
//!
//! `NoteBoard` owns the card store, viewport, history, and interaction
//! controller, plus the injected collaborators (storage, clock, height
//! measurement). Every host call enters through one of its methods, runs
//! to completion synchronously, and leaves its visual consequences in the
//! event outbox.
//!
//! ## Host protocol
//!
//! | Host does                          | Board does                                  |
//! |------------------------------------|---------------------------------------------|
//! | forwards input to `handle`         | mutates state, queues `BoardEvent`s         |
//! | drains `take_events` after a call  | hands over events in the order they arose   |
//! | on `RequestFrame`, calls `frame`   | eases the view; `Continue` asks for another |
//! | calls `poll_timers` periodically   | runs due debounced saves and content history|
//! | calls `teardown` on unload         | flushes everything pending                  |

use crate::board::CardStore;
use crate::config::BoardConfig;
use crate::error::{BoardError, HistoryError, ImportError, StorageError};
use crate::events::BoardEvent;
use crate::history::{HistoryManager, HistoryStatus, Operation, OperationMeta};
use crate::input::{InputEvent, PointerTarget};
use crate::interaction::{HeightMeasure, InteractionController, Release};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::storage::{BoardStorage, PersistedBoard, parse_import, validate_cards};
use crate::timer::{Clock, Debouncer};
use nb_core::{Card, CardHeight, CardId, CardPatch, ChangedFields, Tick, ViewState, Viewport, ViewportSize};
use std::rc::Rc;

pub struct NoteBoard {
    config: BoardConfig,
    store: CardStore,
    viewport: Viewport,
    history: HistoryManager,
    interaction: InteractionController,
    storage: Box<dyn BoardStorage>,
    clock: Rc<dyn Clock>,
    measure: Box<dyn HeightMeasure>,
    save_timer: Debouncer,
}

impl NoteBoard {
    /// Build the board and load whatever storage holds.
    ///
    /// A storage failure is logged and the board starts empty. The loaded
    /// state becomes the `initial_state` history entry.
    pub fn open(
        config: BoardConfig,
        size: ViewportSize,
        storage: Box<dyn BoardStorage>,
        clock: Rc<dyn Clock>,
        measure: Box<dyn HeightMeasure>,
    ) -> Self {
        let history = HistoryManager::new(
            config.history_limit,
            config.content_debounce_ms,
            Rc::clone(&clock),
        );
        let mut board = Self {
            viewport: Viewport::new(size, config.viewport),
            save_timer: Debouncer::new(config.save_debounce_ms),
            store: CardStore::new(),
            interaction: InteractionController::new(),
            history,
            storage,
            clock,
            measure,
            config,
        };

        let loaded = match board.storage.load() {
            Ok(Some(saved)) => match validate_cards(&saved.cards) {
                Ok(()) => Some(saved),
                Err(e) => {
                    log::warn!("saved board failed validation, starting empty: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::warn!("could not load saved board, starting empty: {e}");
                None
            }
        };
        let world_state = match loaded {
            Some(saved) => {
                log::info!("restoring {} saved cards", saved.cards.len());
                board.store.load(saved.cards);
                saved.world_state
            }
            None => None,
        };
        match world_state {
            Some(state) => board.restore_view(state),
            None => board.viewport.center_view(),
        }
        board.emit_view();
        // Loading is not a change worth writing back.
        board.store.take_persist_request();
        board.history.initialize(&board.store);
        board
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn store(&self) -> &CardStore {
        &self.store
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.store.get(id)
    }

    pub fn history_status(&self) -> HistoryStatus {
        self.history.status()
    }

    pub fn is_dragging(&self) -> bool {
        self.interaction.is_dragging_cards()
    }

    /// Events queued since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<BoardEvent> {
        self.store.take_events()
    }

    pub fn resize(&mut self, size: ViewportSize) {
        self.viewport.set_size(size);
        self.emit_view();
    }

    // ─── Input dispatch ──────────────────────────────────────────────────

    /// Route one input event. Returns `true` if the board consumed it, so
    /// the host can suppress the default browser behavior.
    pub fn handle(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::PointerDown { x, y, target } => {
                self.pointer_down(x, y, target);
                true
            }
            InputEvent::PointerMove { x, y } => self.pointer_move(x, y),
            InputEvent::PointerUp { .. } => self.pointer_up(),
            InputEvent::Wheel { x, y, delta } => {
                if self.viewport.zoom_at(x, y, delta) {
                    self.store.push_event(BoardEvent::RequestFrame);
                }
                true
            }
            InputEvent::Key {
                key,
                modifiers,
                in_text_field,
            } => match ShortcutMap::resolve(&key, modifiers, in_text_field) {
                Some(action) => {
                    log::debug!("shortcut {} ({key})", action.name());
                    self.run_shortcut(action);
                    true
                }
                None => false,
            },
            InputEvent::MultiSelectModifier { held } => {
                self.interaction.set_multi_modifier(held, &mut self.store);
                false
            }
            InputEvent::FocusLost => {
                self.interaction.focus_lost(&mut self.store);
                false
            }
        }
    }

    fn pointer_down(&mut self, x: f64, y: f64, target: PointerTarget) {
        let (id, draggable) = match target {
            PointerTarget::Background => {
                self.interaction.press_background(x, y);
                return;
            }
            PointerTarget::CardChrome(id) => (id, true),
            PointerTarget::CardContent(id) => (id, false),
        };
        if draggable {
            self.flush_pending_content();
        }
        match self
            .interaction
            .press_card(&mut self.store, &self.viewport, id, x, y, draggable)
        {
            Ok(Some(start)) => self.history.save_drag_state_start(&self.store, &start.ids),
            Ok(None) => {}
            Err(e) => log::debug!("press ignored: {e}"),
        }
    }

    fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        if self.interaction.is_idle() {
            return false;
        }
        let before = self.viewport.translate();
        self.interaction.pointer_move(
            &mut self.store,
            &mut self.viewport,
            self.measure.as_ref(),
            self.config.snap_distance,
            x,
            y,
        );
        if self.viewport.translate() != before {
            self.emit_view();
        }
        true
    }

    fn pointer_up(&mut self) -> bool {
        match self.interaction.release(&mut self.store) {
            Release::None => false,
            Release::Cards { moved, .. } => {
                self.history.finish_drag_operation(&self.store);
                if moved {
                    self.schedule_save();
                }
                true
            }
            Release::Pan { moved } => {
                if moved {
                    self.schedule_save();
                }
                true
            }
        }
    }

    fn run_shortcut(&mut self, action: ShortcutAction) {
        let outcome: Result<(), String> = match action {
            ShortcutAction::NewCard => self.create_card().map(drop).map_err(|e| e.to_string()),
            ShortcutAction::Duplicate => self.duplicate_selected().map(drop).map_err(|e| e.to_string()),
            ShortcutAction::Delete => self.delete_selected().map(drop).map_err(|e| e.to_string()),
            ShortcutAction::SelectAll => {
                self.select_all();
                Ok(())
            }
            ShortcutAction::Escape => {
                self.escape();
                Ok(())
            }
            // Undo/redo and save report through notices themselves.
            ShortcutAction::Undo => {
                let _ = self.undo();
                Ok(())
            }
            ShortcutAction::Redo => {
                let _ = self.redo();
                Ok(())
            }
            ShortcutAction::Save => {
                let _ = self.save_now();
                Ok(())
            }
            ShortcutAction::Export => self
                .export_document()
                .map(|document| self.store.push_event(BoardEvent::ExportReady { document }))
                .map_err(|e| e.to_string()),
            ShortcutAction::CenterView => {
                self.center_view();
                Ok(())
            }
            ShortcutAction::ZoomIn => {
                self.zoom_in();
                Ok(())
            }
            ShortcutAction::ZoomOut => {
                self.zoom_out();
                Ok(())
            }
        };
        if let Err(message) = outcome {
            log::debug!("shortcut {} did nothing: {message}", action.name());
        }
    }

    // ─── Card operations ─────────────────────────────────────────────────

    /// New empty card centered in the visible area, selected and active.
    pub fn create_card(&mut self) -> Result<CardId, BoardError> {
        let (cx, cy) = self.viewport.visible_bounds().center();
        let x = cx - self.config.default_card_width / 2.0;
        let y = cy - self.config.placement_height / 2.0;
        self.create_card_at(x, y)
    }

    /// New empty card with its top-left corner at a world position.
    pub fn create_card_at(&mut self, x: f64, y: f64) -> Result<CardId, BoardError> {
        self.flush_pending_content();
        let id = self.store.create(x, y, self.config.default_card_width);
        self.store.select_only(id)?;
        self.history
            .save_state(&self.store, Operation::CardCreate, OperationMeta::cards([id]));
        self.after_mutation();
        Ok(id)
    }

    /// Duplicate every selected card. The copies become the selection.
    pub fn duplicate_selected(&mut self) -> Result<Vec<CardId>, BoardError> {
        let selected = self.store.selected();
        if selected.is_empty() {
            return Err(BoardError::EmptySelection);
        }
        self.flush_pending_content();
        let (offset, operation) = if selected.len() > 1 {
            (self.config.multi_duplicate_offset, Operation::MultiCardDuplicate)
        } else {
            (self.config.duplicate_offset, Operation::CardDuplicate)
        };

        let active = self.store.active();
        let mut copies = Vec::with_capacity(selected.len());
        let mut active_copy = None;
        for id in selected {
            let copy = self.store.duplicate(id, offset)?;
            if Some(id) == active {
                active_copy = Some(copy);
            }
            copies.push(copy);
        }
        self.store.set_selection(&copies, active_copy);
        self.history
            .save_state(&self.store, operation, OperationMeta::cards(copies.iter().copied()));
        self.after_mutation();
        Ok(copies)
    }

    /// Delete every selected card as one history step.
    pub fn delete_selected(&mut self) -> Result<usize, BoardError> {
        let selected = self.store.selected();
        if selected.is_empty() {
            return Err(BoardError::EmptySelection);
        }
        self.flush_pending_content();
        for &id in &selected {
            self.store.delete(id)?;
        }
        let operation = if selected.len() > 1 {
            Operation::MultiCardDelete
        } else {
            Operation::CardDelete
        };
        self.history
            .save_state(&self.store, operation, OperationMeta::cards(selected.iter().copied()));
        self.after_mutation();
        Ok(selected.len())
    }

    pub fn delete_card(&mut self, id: CardId) -> Result<(), BoardError> {
        if !self.store.contains(id) {
            return Err(BoardError::UnknownCard(id));
        }
        self.flush_pending_content();
        self.store.delete(id)?;
        self.history
            .save_state(&self.store, Operation::CardDelete, OperationMeta::cards([id]));
        self.after_mutation();
        Ok(())
    }

    /// Apply a resize and/or content change from the editing panel.
    ///
    /// Size changes above the noise threshold are recorded immediately;
    /// content changes are batched into one entry per typing burst.
    pub fn update_card(&mut self, id: CardId, patch: CardPatch) -> Result<ChangedFields, BoardError> {
        let before = self.store.get(id).cloned().ok_or(BoardError::UnknownCard(id))?;

        let resizing = patch.width.is_some() || patch.height.is_some();
        let other_burst = self
            .history
            .pending_content_card()
            .is_some_and(|pending| pending != id);
        if resizing || other_burst {
            self.flush_pending_content();
        }

        let changed = self.store.update(id, patch)?;
        let Some(after) = self.store.get(id).cloned() else {
            return Err(BoardError::UnknownCard(id));
        };

        if (changed.width || changed.height)
            && size_changed(&before, &after, self.config.resize_threshold)
        {
            self.history.save_state(
                &self.store,
                Operation::CardResize,
                OperationMeta::Resize {
                    id,
                    before: (before.width, before.height),
                    after: (after.width, after.height),
                },
            );
        }
        if changed.content {
            self.history
                .save_content_state(&self.store, id, &before.content, &after.content);
        }
        self.after_mutation();
        Ok(changed)
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn select_card(&mut self, id: CardId) -> Result<(), BoardError> {
        self.store.select_only(id)
    }

    pub fn select_all(&mut self) {
        self.store.select_all();
    }

    /// Drop the selection and close the editor.
    pub fn escape(&mut self) {
        self.flush_pending_content();
        self.store.clear_selection();
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> Result<Operation, HistoryError> {
        self.step_history(true)
    }

    pub fn redo(&mut self) -> Result<Operation, HistoryError> {
        self.step_history(false)
    }

    fn step_history(&mut self, back: bool) -> Result<Operation, HistoryError> {
        let result = if self.interaction.is_dragging_cards() {
            Err(HistoryError::DragInProgress)
        } else if back {
            self.history.undo(&mut self.store)
        } else {
            self.history.redo(&mut self.store)
        };
        match &result {
            Ok(op) => {
                let verb = if back { "Undid" } else { "Redid" };
                self.store
                    .push_event(BoardEvent::info(format!("{verb} {}", op.label())));
                self.after_mutation();
            }
            Err(e) => self.store.push_event(BoardEvent::info(e.to_string())),
        }
        result
    }

    // ─── View ────────────────────────────────────────────────────────────

    /// One animation frame. Keep requesting frames while this returns
    /// `Tick::Continue`. Settling schedules a save of the view.
    pub fn frame(&mut self) -> Tick {
        if !self.viewport.is_animating() {
            return Tick::Settled;
        }
        let tick = self.viewport.tick();
        self.emit_view();
        if tick == Tick::Settled {
            self.schedule_save();
        }
        tick
    }

    pub fn center_view(&mut self) {
        self.viewport.center_view();
        self.emit_view();
        self.schedule_save();
    }

    pub fn zoom_in(&mut self) {
        self.zoom_step(self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_step(1.0 / self.config.zoom_step);
    }

    fn zoom_step(&mut self, factor: f64) {
        let size = self.viewport.size();
        if self
            .viewport
            .zoom_by(size.width / 2.0, size.height / 2.0, factor)
        {
            self.store.push_event(BoardEvent::RequestFrame);
        }
    }

    fn restore_view(&mut self, state: ViewState) {
        if self.viewport.restore(state) {
            self.store.push_event(BoardEvent::RequestFrame);
        }
    }

    fn emit_view(&mut self) {
        self.store.push_event(BoardEvent::ViewChanged {
            view: self.viewport.state(),
            grid: self.viewport.grid(),
        });
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    /// Run whatever debounced work has come due.
    pub fn poll_timers(&mut self) {
        let now = self.clock.now_ms();
        if self.save_timer.fire_if_due(now) {
            let _ = self.persist();
        }
        self.history.poll(&self.store);
    }

    /// Write the board to storage right away.
    pub fn save_now(&mut self) -> Result<(), StorageError> {
        self.flush_pending_content();
        self.save_timer.cancel();
        let result = self.persist();
        match &result {
            Ok(()) => self.store.push_event(BoardEvent::info("Board saved")),
            Err(e) => self
                .store
                .push_event(BoardEvent::error(format!("Could not save: {e}"))),
        }
        result
    }

    /// The persisted shape as a pretty-printed JSON document. Also saves.
    pub fn export_document(&mut self) -> Result<String, StorageError> {
        self.flush_pending_content();
        self.save_timer.cancel();
        // A failed save must not block the download.
        let _ = self.persist();
        self.snapshot_document().to_json_pretty()
    }

    /// Replace the board with an uploaded document.
    ///
    /// The document is validated in full first; on any error the board is
    /// left exactly as it was.
    pub fn import_document(&mut self, text: &str) -> Result<usize, ImportError> {
        let imported = match parse_import(text) {
            Ok(imported) => imported,
            Err(e) => {
                log::warn!("import rejected: {e}");
                self.store
                    .push_event(BoardEvent::error(format!("Import failed: {e}")));
                return Err(e);
            }
        };
        self.flush_pending_content();

        let count = imported.cards.len();
        let ids: Vec<CardId> = imported.cards.iter().map(|c| c.id).collect();
        self.store.load(imported.cards);
        if let Some(state) = imported.world_state {
            self.restore_view(state);
            self.emit_view();
        }
        self.history
            .save_state(&self.store, Operation::BoardImport, OperationMeta::cards(ids));
        self.after_mutation();
        self.store
            .push_event(BoardEvent::info(format!("Imported {count} cards")));
        Ok(count)
    }

    /// Empty the board, forget the saved copy, and re-center the view.
    pub fn reset(&mut self) {
        self.flush_pending_content();
        self.save_timer.cancel();
        if let Err(e) = self.storage.clear() {
            log::warn!("could not clear saved board: {e}");
        }
        self.store.load(Vec::new());
        self.restore_view(ViewState::default());
        self.viewport.center_view();
        self.emit_view();
        self.history
            .save_state(&self.store, Operation::BoardReset, OperationMeta::None);
        // Storage was just cleared; leave it that way until the next edit.
        self.store.take_persist_request();
    }

    /// Flush everything pending before the host goes away.
    pub fn teardown(&mut self) {
        if !self.interaction.is_idle() {
            self.pointer_up();
        }
        self.flush_pending_content();
        if self.save_timer.flush() {
            let _ = self.persist();
        }
    }

    fn snapshot_document(&self) -> PersistedBoard {
        PersistedBoard::new(
            self.store.card_list(),
            Some(self.viewport.state()),
            self.clock.now_ms(),
        )
    }

    fn persist(&mut self) -> Result<(), StorageError> {
        let board = self.snapshot_document();
        match self.storage.save(&board) {
            Ok(()) => {
                log::trace!("saved {} cards", board.cards.len());
                Ok(())
            }
            Err(e) => {
                log::warn!("board not saved: {e}");
                Err(e)
            }
        }
    }

    fn schedule_save(&mut self) {
        self.save_timer.schedule(self.clock.now_ms());
    }

    fn after_mutation(&mut self) {
        if self.store.take_persist_request() {
            self.schedule_save();
        }
    }

    /// A pending content burst must land in history before any other
    /// operation snapshots the board.
    fn flush_pending_content(&mut self) {
        self.history.flush_content(&self.store);
    }
}

impl Drop for NoteBoard {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Whether a resize moved width or height past the noise threshold.
/// Switching between `auto` and a fixed height always counts.
fn size_changed(before: &Card, after: &Card, threshold: f64) -> bool {
    let width = (after.width - before.width).abs() > threshold;
    let height = match (before.height, after.height) {
        (CardHeight::Px(a), CardHeight::Px(b)) => (a - b).abs() > threshold,
        (a, b) => a != b,
    };
    width || height
}
