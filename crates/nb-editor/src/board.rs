//! The card store: single owner of cards, selection, and the active card.
//!
//! Every mutation goes through a method here so it can queue the matching
//! `BoardEvent` and, for externally observable changes, raise the persist
//! request that the engine turns into a debounced save. Live drag moves are
//! the one exception: they update position without requesting a save until
//! the gesture ends.

use crate::error::BoardError;
use crate::events::BoardEvent;
use indexmap::{IndexMap, IndexSet};
use nb_core::{BoardSnapshot, Card, CardHeight, CardId, CardPatch, ChangedFields, IdAllocator};

#[derive(Debug, Default)]
pub struct CardStore {
    /// Insertion-ordered; iteration order is the render/snap order.
    cards: IndexMap<CardId, Card>,
    selected: IndexSet<CardId>,
    /// Always a member of `selected` when set.
    active: Option<CardId>,
    ids: IdAllocator,
    events: Vec<BoardEvent>,
    persist_requested: bool,
}

impl CardStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, id: CardId) -> Option<&Card> {
        self.cards.get(&id)
    }

    pub fn contains(&self, id: CardId) -> bool {
        self.cards.contains_key(&id)
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    pub fn ids(&self) -> Vec<CardId> {
        self.cards.keys().copied().collect()
    }

    /// Owned copy of every card, in insertion order.
    pub fn card_list(&self) -> Vec<Card> {
        self.cards.values().cloned().collect()
    }

    pub fn selected(&self) -> Vec<CardId> {
        self.selected.iter().copied().collect()
    }

    pub fn selection_len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_selected(&self, id: CardId) -> bool {
        self.selected.contains(&id)
    }

    pub fn active(&self) -> Option<CardId> {
        self.active
    }

    /// The id the next created card will receive.
    pub fn next_id(&self) -> CardId {
        self.ids.peek()
    }

    /// Deep copy of cards, selection, and active id.
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            cards: self.card_list(),
            selected: self.selected(),
            active: self.active,
        }
    }

    // ─── Outbox ──────────────────────────────────────────────────────────

    pub fn take_events(&mut self) -> Vec<BoardEvent> {
        std::mem::take(&mut self.events)
    }

    /// Returns and clears the "card list changed, persist it" flag.
    pub fn take_persist_request(&mut self) -> bool {
        std::mem::replace(&mut self.persist_requested, false)
    }

    pub(crate) fn push_event(&mut self, event: BoardEvent) {
        self.events.push(event);
    }

    // ─── Card mutations ──────────────────────────────────────────────────

    /// Create an empty auto-height card at a world position.
    pub fn create(&mut self, x: f64, y: f64, width: f64) -> CardId {
        let id = self.ids.allocate();
        self.insert(Card::new(id, x, y, width));
        id
    }

    /// Clone a card under a fresh id, shifted by `offset` on both axes.
    pub fn duplicate(&mut self, id: CardId, offset: f64) -> Result<CardId, BoardError> {
        let mut copy = self.get(id).cloned().ok_or(BoardError::UnknownCard(id))?;
        copy.id = self.ids.allocate();
        copy.x += offset;
        copy.y += offset;
        let new_id = copy.id;
        self.insert(copy);
        Ok(new_id)
    }

    fn insert(&mut self, card: Card) {
        log::debug!("card {} created at ({}, {})", card.id, card.x, card.y);
        self.ids.observe(card.id);
        self.events.push(BoardEvent::CardCreated { card: card.clone() });
        self.cards.insert(card.id, card);
        self.persist_requested = true;
    }

    /// Apply a partial update. Returns which visual fields actually changed.
    pub fn update(&mut self, id: CardId, patch: CardPatch) -> Result<ChangedFields, BoardError> {
        let card = self.cards.get_mut(&id).ok_or(BoardError::UnknownCard(id))?;
        let mut changed = ChangedFields::default();

        if let Some(width) = patch.width
            && width > 0.0
            && width != card.width
        {
            card.width = width;
            changed.width = true;
        }
        if let Some(height) = patch.height
            && height != card.height
            && !matches!(height, CardHeight::Px(h) if h <= 0.0)
        {
            card.height = height;
            changed.height = true;
        }
        if let Some(content) = patch.content
            && content != card.content
        {
            card.content = content;
            changed.content = true;
        }

        if changed.any() {
            let card = card.clone();
            self.events.push(BoardEvent::CardUpdated { card, changed });
            self.persist_requested = true;
        }
        Ok(changed)
    }

    /// Live move during a drag. Does not request persistence.
    pub fn set_position(&mut self, id: CardId, x: f64, y: f64) -> Result<(), BoardError> {
        let card = self.cards.get_mut(&id).ok_or(BoardError::UnknownCard(id))?;
        if card.x == x && card.y == y {
            return Ok(());
        }
        card.x = x;
        card.y = y;
        let card = card.clone();
        self.events.push(BoardEvent::CardUpdated {
            card,
            changed: ChangedFields {
                position: true,
                ..ChangedFields::default()
            },
        });
        Ok(())
    }

    /// Remove a card, dropping it from the selection. Deleting the active
    /// card closes the editing panel.
    pub fn delete(&mut self, id: CardId) -> Result<Card, BoardError> {
        let card = self.cards.shift_remove(&id).ok_or(BoardError::UnknownCard(id))?;
        log::debug!("card {id} deleted");
        self.events.push(BoardEvent::CardRemoved { id });
        if self.selected.shift_remove(&id) {
            if self.active == Some(id) {
                self.active = None;
                self.events.push(BoardEvent::EditorClosed);
            }
            self.emit_selection();
        }
        self.persist_requested = true;
        Ok(card)
    }

    /// Replace the whole board with `cards` (startup load, import, reset).
    /// Selection is cleared.
    pub fn load(&mut self, cards: Vec<Card>) {
        let had_active = self.active.take().is_some();
        self.selected.clear();
        self.cards.clear();
        for card in cards {
            self.ids.observe(card.id);
            self.cards.insert(card.id, card);
        }
        log::debug!("board loaded with {} cards", self.cards.len());
        self.events.push(BoardEvent::BoardReplaced {
            cards: self.card_list(),
        });
        if had_active {
            self.events.push(BoardEvent::EditorClosed);
        }
        self.emit_selection();
        self.persist_requested = true;
    }

    /// Recreate the board from a snapshot, preserving ids.
    ///
    /// Selection is filtered to cards that exist. An active id that did not
    /// survive degrades to "no active card" and closes the editor.
    pub fn restore(&mut self, snapshot: &BoardSnapshot) {
        let previous_active = self.active;
        self.cards.clear();
        self.selected.clear();
        for card in &snapshot.cards {
            self.ids.observe(card.id);
            self.cards.insert(card.id, card.clone());
        }
        self.selected = snapshot
            .selected
            .iter()
            .copied()
            .filter(|id| self.cards.contains_key(id))
            .collect();
        self.active = snapshot
            .active
            .filter(|id| self.cards.contains_key(id));
        if let Some(active) = self.active {
            self.selected.insert(active);
        }

        self.events.push(BoardEvent::BoardReplaced {
            cards: self.card_list(),
        });
        match self.active {
            Some(id) if previous_active != Some(id) => {
                self.events.push(BoardEvent::EditorOpened { id })
            }
            Some(_) => {}
            None => {
                if snapshot.active.is_some() || previous_active.is_some() {
                    self.events.push(BoardEvent::EditorClosed);
                }
            }
        }
        self.emit_selection();
        self.persist_requested = true;
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Replace the selection with exactly `id` and make it active.
    pub fn select_only(&mut self, id: CardId) -> Result<(), BoardError> {
        if !self.contains(id) {
            return Err(BoardError::UnknownCard(id));
        }
        let was_only = self.selected.len() == 1 && self.active == Some(id);
        self.selected.clear();
        self.selected.insert(id);
        self.set_active(Some(id));
        if !was_only {
            self.emit_selection();
        }
        Ok(())
    }

    /// Add `id` to the selection and make it active.
    pub fn add_to_selection(&mut self, id: CardId) -> Result<(), BoardError> {
        if !self.contains(id) {
            return Err(BoardError::UnknownCard(id));
        }
        self.selected.insert(id);
        self.set_active(Some(id));
        self.emit_selection();
        Ok(())
    }

    /// Drop `id` from the selection. If it was active, activity moves to
    /// the first remaining selected card in insertion order, or to none.
    pub fn remove_from_selection(&mut self, id: CardId) {
        if !self.selected.shift_remove(&id) {
            return;
        }
        if self.active == Some(id) {
            let next = self.selected.first().copied();
            self.set_active(next);
        }
        self.emit_selection();
    }

    /// Multi-select toggle: selected cards are removed, others added.
    pub fn toggle_selection(&mut self, id: CardId) -> Result<(), BoardError> {
        if self.is_selected(id) {
            self.remove_from_selection(id);
            Ok(())
        } else {
            self.add_to_selection(id)
        }
    }

    /// Shrink the selection to the active card alone.
    pub fn collapse_to_active(&mut self) {
        let target: IndexSet<CardId> = self.active.into_iter().collect();
        if target != self.selected {
            self.selected = target;
            self.emit_selection();
        }
    }

    pub fn select_all(&mut self) {
        self.selected = self.cards.keys().copied().collect();
        if self.active.is_none() {
            let first = self.selected.first().copied();
            self.set_active(first);
        }
        self.emit_selection();
    }

    /// Replace the selection wholesale. Unknown ids are skipped; `active`
    /// falls back to the first selected card when it is not in the set.
    pub fn set_selection(&mut self, ids: &[CardId], active: Option<CardId>) {
        self.selected = ids
            .iter()
            .copied()
            .filter(|id| self.cards.contains_key(id))
            .collect();
        let active = active
            .filter(|id| self.selected.contains(id))
            .or_else(|| self.selected.first().copied());
        self.set_active(active);
        self.emit_selection();
    }

    pub fn clear_selection(&mut self) {
        if self.selected.is_empty() && self.active.is_none() {
            return;
        }
        self.selected.clear();
        self.set_active(None);
        self.emit_selection();
    }

    fn set_active(&mut self, id: Option<CardId>) {
        if self.active == id {
            return;
        }
        self.active = id;
        match id {
            Some(id) => self.events.push(BoardEvent::EditorOpened { id }),
            None => self.events.push(BoardEvent::EditorClosed),
        }
    }

    fn emit_selection(&mut self) {
        self.events.push(BoardEvent::SelectionChanged {
            selected: self.selected(),
            active: self.active,
        });
    }
}
