//! Pointer interaction: selection model, card drag, and background pan.
//!
//! Drag is a small state machine, `Idle → DraggingCards | Panning → Idle`,
//! entered on pointer-down and left on pointer-up.
//!
//! ## Modifier behaviors
//!
//! | Press on            | No modifier                         | Multi-select modifier held          |
//! |---------------------|-------------------------------------|-------------------------------------|
//! | unselected card     | select only it, drag it             | add it (active), drag it alone      |
//! | selected card       | drag whole selection; click selects | drag whole selection; click removes |
//! |                     | only it                             | it from the selection               |
//! | empty canvas        | pan; click clears selection         | pan                                 |

use crate::board::CardStore;
use crate::error::BoardError;
use crate::events::BoardEvent;
use nb_core::{Card, CardId, Rect, SnapResult, Viewport, resolve_snap};

// ─── Measurement ─────────────────────────────────────────────────────────

/// Supplies the rendered height of auto-height cards.
pub trait HeightMeasure {
    fn measured_height(&self, id: CardId) -> f64;
}

impl<F: Fn(CardId) -> f64> HeightMeasure for F {
    fn measured_height(&self, id: CardId) -> f64 {
        self(id)
    }
}

/// Measurement that reports the same height for every auto card.
#[derive(Debug, Clone, Copy)]
pub struct FixedHeight(pub f64);

impl HeightMeasure for FixedHeight {
    fn measured_height(&self, _id: CardId) -> f64 {
        self.0
    }
}

/// World rect of a card with its height resolved.
pub fn card_rect(card: &Card, measure: &dyn HeightMeasure) -> Rect {
    card.rect(card.height.resolve(|| measure.measured_height(card.id)))
}

// ─── Gesture state ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Single,
    Multi,
}

/// What a press-and-release without movement does to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClickAction {
    None,
    Deselect(CardId),
    SelectOnly(CardId),
}

#[derive(Debug, Clone, Copy)]
struct DraggedCard {
    id: CardId,
    /// Pointer-to-top-left offset in world space.
    offset_x: f64,
    offset_y: f64,
}

#[derive(Debug, Clone)]
enum Gesture {
    Idle,
    DraggingCards {
        kind: DragKind,
        reference: CardId,
        cards: Vec<DraggedCard>,
        /// Screen point of the press; the drag counts as moved once the
        /// pointer leaves it.
        origin: (f64, f64),
        moved: bool,
        on_click: ClickAction,
    },
    Panning {
        last_x: f64,
        last_y: f64,
        moved: bool,
    },
}

/// Cards picked up by a press; the caller records their start positions.
#[derive(Debug, Clone, PartialEq)]
pub struct DragStart {
    pub kind: DragKind,
    pub ids: Vec<CardId>,
}

/// How a gesture ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Release {
    /// Nothing was in progress.
    None,
    /// A card drag ended; `moved` is false for a plain click.
    Cards { kind: DragKind, moved: bool },
    /// A background pan ended; `moved` is false for a plain click.
    Pan { moved: bool },
}

pub struct InteractionController {
    gesture: Gesture,
    multi_modifier: bool,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            gesture: Gesture::Idle,
            multi_modifier: false,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.gesture, Gesture::Idle)
    }

    pub fn is_dragging_cards(&self) -> bool {
        matches!(self.gesture, Gesture::DraggingCards { .. })
    }

    pub fn multi_modifier(&self) -> bool {
        self.multi_modifier
    }

    /// Track the multi-select modifier. Releasing it collapses the
    /// selection to the active card.
    pub fn set_multi_modifier(&mut self, held: bool, store: &mut CardStore) {
        let released = self.multi_modifier && !held;
        self.multi_modifier = held;
        if released {
            store.collapse_to_active();
        }
    }

    /// Input focus left the board: the modifier can no longer be trusted.
    pub fn focus_lost(&mut self, store: &mut CardStore) {
        self.multi_modifier = false;
        store.collapse_to_active();
    }

    // ─── Press ───────────────────────────────────────────────────────────

    /// Pointer down on a card. `draggable` is false when the press landed
    /// in the card's editable content, which selects without dragging.
    pub fn press_card(
        &mut self,
        store: &mut CardStore,
        viewport: &Viewport,
        id: CardId,
        sx: f64,
        sy: f64,
        draggable: bool,
    ) -> Result<Option<DragStart>, BoardError> {
        if !store.contains(id) {
            return Err(BoardError::UnknownCard(id));
        }
        let was_selected = store.is_selected(id);
        let in_group = was_selected && store.selection_len() > 1;

        let on_click = if self.multi_modifier {
            if was_selected {
                ClickAction::Deselect(id)
            } else {
                store.add_to_selection(id)?;
                ClickAction::None
            }
        } else if in_group {
            ClickAction::SelectOnly(id)
        } else {
            store.select_only(id)?;
            ClickAction::None
        };

        if !draggable {
            match on_click {
                ClickAction::None => {}
                ClickAction::Deselect(id) => store.remove_from_selection(id),
                ClickAction::SelectOnly(id) => store.select_only(id)?,
            }
            return Ok(None);
        }

        let ids = if in_group {
            // Reference card first so it leads the group.
            let mut ids = vec![id];
            ids.extend(store.selected().into_iter().filter(|s| *s != id));
            ids
        } else {
            vec![id]
        };
        let kind = if ids.len() > 1 {
            DragKind::Multi
        } else {
            DragKind::Single
        };

        let (wx, wy) = viewport.screen_to_world(sx, sy);
        let cards = ids
            .iter()
            .filter_map(|&id| store.get(id))
            .map(|card| DraggedCard {
                id: card.id,
                offset_x: wx - card.x,
                offset_y: wy - card.y,
            })
            .collect();

        log::debug!("drag start {kind:?} on {id} ({} cards)", ids.len());
        self.gesture = Gesture::DraggingCards {
            kind,
            reference: id,
            cards,
            origin: (sx, sy),
            moved: false,
            on_click,
        };
        Ok(Some(DragStart { kind, ids }))
    }

    /// Pointer down on empty canvas: start panning.
    pub fn press_background(&mut self, sx: f64, sy: f64) {
        self.gesture = Gesture::Panning {
            last_x: sx,
            last_y: sy,
            moved: false,
        };
    }

    // ─── Move ────────────────────────────────────────────────────────────

    /// Pointer moved. Returns the reference card's snap result while
    /// dragging cards.
    pub fn pointer_move(
        &mut self,
        store: &mut CardStore,
        viewport: &mut Viewport,
        measure: &dyn HeightMeasure,
        snap_distance: f64,
        sx: f64,
        sy: f64,
    ) -> Option<SnapResult> {
        match &mut self.gesture {
            Gesture::Idle => None,
            Gesture::Panning {
                last_x,
                last_y,
                moved,
            } => {
                let (dx, dy) = (sx - *last_x, sy - *last_y);
                if dx != 0.0 || dy != 0.0 {
                    viewport.pan(dx, dy);
                    *last_x = sx;
                    *last_y = sy;
                    *moved = true;
                }
                None
            }
            Gesture::DraggingCards {
                reference,
                cards,
                origin,
                moved,
                ..
            } => {
                if !*moved && (sx, sy) == *origin {
                    return None;
                }
                let (wx, wy) = viewport.screen_to_world(sx, sy);
                let snap = drag_cards(store, measure, snap_distance, *reference, cards, wx, wy)?;
                *moved = true;
                store.push_event(BoardEvent::SnapGuides {
                    x: snap.snap_line_x,
                    y: snap.snap_line_y,
                });
                Some(snap)
            }
        }
    }

    // ─── Release ─────────────────────────────────────────────────────────

    pub fn release(&mut self, store: &mut CardStore) -> Release {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => Release::None,
            Gesture::Panning { moved, .. } => {
                if !moved && !self.multi_modifier {
                    store.clear_selection();
                }
                Release::Pan { moved }
            }
            Gesture::DraggingCards {
                kind,
                moved,
                on_click,
                ..
            } => {
                if moved {
                    store.push_event(BoardEvent::SnapGuides { x: None, y: None });
                } else {
                    match on_click {
                        ClickAction::None => {}
                        ClickAction::Deselect(id) => store.remove_from_selection(id),
                        ClickAction::SelectOnly(id) => {
                            if let Err(e) = store.select_only(id) {
                                log::debug!("click select skipped: {e}");
                            }
                        }
                    }
                }
                log::debug!("drag end {kind:?} moved={moved}");
                Release::Cards { kind, moved }
            }
        }
    }
}

/// Move every dragged card rigidly, snapping the reference card against
/// all cards outside the drag.
fn drag_cards(
    store: &mut CardStore,
    measure: &dyn HeightMeasure,
    snap_distance: f64,
    reference: CardId,
    cards: &[DraggedCard],
    wx: f64,
    wy: f64,
) -> Option<SnapResult> {
    let lead = cards.iter().find(|c| c.id == reference)?;
    let ref_card = store.get(reference)?;
    let raw_x = wx - lead.offset_x;
    let raw_y = wy - lead.offset_y;
    let mut moving = card_rect(ref_card, measure);
    moving.x = raw_x;
    moving.y = raw_y;

    let stationary: Vec<Rect> = store
        .cards()
        .filter(|c| !cards.iter().any(|d| d.id == c.id))
        .map(|c| card_rect(c, measure))
        .collect();
    let snap = resolve_snap(moving, &stationary, snap_distance);
    let dx = snap.x - raw_x;
    let dy = snap.y - raw_y;

    for card in cards {
        let x = wx - card.offset_x + dx;
        let y = wy - card.offset_y + dy;
        if let Err(e) = store.set_position(card.id, x, y) {
            log::warn!("dragged card vanished: {e}");
        }
    }
    Some(snap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nb_core::{ViewportConfig, ViewportSize};

    fn setup(positions: &[(f64, f64)]) -> (CardStore, Viewport, Vec<CardId>) {
        let mut store = CardStore::new();
        let ids = positions
            .iter()
            .map(|&(x, y)| store.create(x, y, 100.0))
            .collect();
        let viewport = Viewport::new(ViewportSize::default(), ViewportConfig::default());
        (store, viewport, ids)
    }

    #[test]
    fn plain_press_selects_only_that_card() {
        let (mut store, vp, ids) = setup(&[(0.0, 0.0), (500.0, 0.0)]);
        let mut ctl = InteractionController::new();
        store.select_only(ids[0]).unwrap();
        let start = ctl.press_card(&mut store, &vp, ids[1], 510.0, 10.0, true).unwrap();
        assert_eq!(
            start,
            Some(DragStart {
                kind: DragKind::Single,
                ids: vec![ids[1]]
            })
        );
        assert_eq!(store.selected(), vec![ids[1]]);
        assert_eq!(store.active(), Some(ids[1]));
    }

    #[test]
    fn single_drag_follows_pointer_offset() {
        let (mut store, mut vp, ids) = setup(&[(0.0, 0.0)]);
        let mut ctl = InteractionController::new();
        ctl.press_card(&mut store, &vp, ids[0], 10.0, 10.0, true).unwrap();
        ctl.pointer_move(&mut store, &mut vp, &FixedHeight(50.0), 5.0, 110.0, 60.0);
        let c = store.get(ids[0]).unwrap();
        assert_eq!((c.x, c.y), (100.0, 50.0));
        assert_eq!(
            ctl.release(&mut store),
            Release::Cards {
                kind: DragKind::Single,
                moved: true
            }
        );
        assert!(ctl.is_idle());
    }

    #[test]
    fn drag_respects_zoom() {
        let (mut store, mut vp, ids) = setup(&[(0.0, 0.0)]);
        vp.zoom_by(0.0, 0.0, 2.0);
        while vp.tick() == nb_core::Tick::Continue {}
        let mut ctl = InteractionController::new();
        ctl.press_card(&mut store, &vp, ids[0], 20.0, 20.0, true).unwrap();
        ctl.pointer_move(&mut store, &mut vp, &FixedHeight(50.0), 0.0, 220.0, 20.0);
        assert_eq!(store.get(ids[0]).unwrap().x, 100.0);
    }

    #[test]
    fn modifier_click_on_selected_card_removes_it() {
        let (mut store, vp, ids) = setup(&[(0.0, 0.0), (500.0, 0.0)]);
        let mut ctl = InteractionController::new();
        ctl.set_multi_modifier(true, &mut store);
        ctl.press_card(&mut store, &vp, ids[0], 5.0, 5.0, true).unwrap();
        ctl.release(&mut store);
        ctl.press_card(&mut store, &vp, ids[1], 505.0, 5.0, true).unwrap();
        ctl.release(&mut store);
        assert_eq!(store.selected(), vec![ids[0], ids[1]]);

        ctl.press_card(&mut store, &vp, ids[1], 505.0, 5.0, true).unwrap();
        ctl.release(&mut store);
        assert_eq!(store.selected(), vec![ids[0]]);
        assert_eq!(store.active(), Some(ids[0]));
    }

    #[test]
    fn releasing_modifier_collapses_to_active() {
        let (mut store, vp, ids) = setup(&[(0.0, 0.0), (500.0, 0.0)]);
        let mut ctl = InteractionController::new();
        ctl.set_multi_modifier(true, &mut store);
        for (&id, x) in ids.iter().zip([5.0, 505.0]) {
            ctl.press_card(&mut store, &vp, id, x, 5.0, true).unwrap();
            ctl.release(&mut store);
        }
        ctl.set_multi_modifier(false, &mut store);
        assert_eq!(store.selected(), vec![ids[1]]);
    }

    #[test]
    fn group_drag_moves_rigidly() {
        let (mut store, mut vp, ids) = setup(&[(0.0, 0.0), (300.0, 170.0), (-250.0, 400.0)]);
        store.select_all();
        let mut ctl = InteractionController::new();
        let start = ctl
            .press_card(&mut store, &vp, ids[1], 310.0, 180.0, true)
            .unwrap()
            .unwrap();
        assert_eq!(start.kind, DragKind::Multi);
        assert_eq!(start.ids[0], ids[1]);

        let before: Vec<(f64, f64)> = ids.iter().map(|id| store.get(*id).unwrap().position()).collect();
        ctl.pointer_move(&mut store, &mut vp, &FixedHeight(80.0), 0.0, 347.0, 151.0);
        let after: Vec<(f64, f64)> = ids.iter().map(|id| store.get(*id).unwrap().position()).collect();
        for (b, a) in before.iter().zip(&after) {
            assert_eq!((a.0 - b.0, a.1 - b.1), (37.0, -29.0));
        }
    }

    #[test]
    fn group_snap_correction_applies_to_every_member() {
        // Two dragged cards plus one stationary neighbor at x = 1000.
        let (mut store, mut vp, ids) = setup(&[(0.0, 0.0), (0.0, 200.0), (1000.0, 600.0)]);
        store.select_only(ids[0]).unwrap();
        store.add_to_selection(ids[1]).unwrap();
        let mut ctl = InteractionController::new();
        ctl.press_card(&mut store, &vp, ids[0], 0.0, 0.0, true).unwrap();
        // Reference left edge lands at 997, 3 away from the neighbor's left.
        let snap = ctl
            .pointer_move(&mut store, &mut vp, &FixedHeight(50.0), 5.0, 997.0, 0.0)
            .unwrap();
        assert_eq!(snap.snap_line_x, Some(1000.0));
        assert_eq!(store.get(ids[0]).unwrap().x, 1000.0);
        assert_eq!(store.get(ids[1]).unwrap().x, 1000.0);
        assert_eq!(store.get(ids[1]).unwrap().y, 200.0);
    }

    #[test]
    fn content_press_selects_without_drag() {
        let (mut store, vp, ids) = setup(&[(0.0, 0.0)]);
        let mut ctl = InteractionController::new();
        let start = ctl.press_card(&mut store, &vp, ids[0], 5.0, 5.0, false).unwrap();
        assert!(start.is_none());
        assert!(ctl.is_idle());
        assert_eq!(store.active(), Some(ids[0]));
    }

    #[test]
    fn zero_distance_move_is_still_a_click() {
        let (mut store, mut vp, ids) = setup(&[(0.0, 0.0), (500.0, 0.0)]);
        store.select_all();
        let mut ctl = InteractionController::new();
        ctl.press_card(&mut store, &vp, ids[1], 505.0, 5.0, true).unwrap();
        assert!(ctl
            .pointer_move(&mut store, &mut vp, &FixedHeight(50.0), 5.0, 505.0, 5.0)
            .is_none());
        assert_eq!(
            ctl.release(&mut store),
            Release::Cards {
                kind: DragKind::Multi,
                moved: false
            }
        );
        assert_eq!(store.selected(), vec![ids[1]]);
    }

    #[test]
    fn background_drag_pans_exactly() {
        let (mut store, mut vp, _) = setup(&[]);
        let mut ctl = InteractionController::new();
        ctl.press_background(100.0, 100.0);
        ctl.pointer_move(&mut store, &mut vp, &FixedHeight(0.0), 5.0, 130.0, 80.0);
        assert_eq!(vp.translate(), (30.0, -20.0));
        assert_eq!(ctl.release(&mut store), Release::Pan { moved: true });
    }

    #[test]
    fn background_click_clears_selection() {
        let (mut store, _vp, ids) = setup(&[(0.0, 0.0)]);
        store.select_only(ids[0]).unwrap();
        let mut ctl = InteractionController::new();
        ctl.press_background(900.0, 900.0);
        ctl.release(&mut store);
        assert_eq!(store.active(), None);
    }
}
