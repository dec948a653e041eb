//! Edge-alignment snapping for a moving card against its neighbors.
//!
//! Pure geometry: the caller resolves every "auto" height before calling,
//! so nothing here measures or touches the board.
//!
//! Candidate order per stationary rect and axis is fixed:
//!
//! | # | X axis                | Y axis                |
//! |---|-----------------------|-----------------------|
//! | 1 | left  → target left   | top    → target top    |
//! | 2 | left  → target right  | top    → target bottom |
//! | 3 | right → target left   | bottom → target top    |
//! | 4 | right → target right  | bottom → target bottom |
//!
//! A candidate wins only when strictly closer than both the threshold and
//! the best so far, so the first of several equally-close candidates wins.

use crate::model::Rect;
use serde::Serialize;

/// Snapped position plus the guide line (if any) active on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapResult {
    pub x: f64,
    pub y: f64,
    pub snap_line_x: Option<f64>,
    pub snap_line_y: Option<f64>,
}

impl SnapResult {
    pub fn is_snapped(&self) -> bool {
        self.snap_line_x.is_some() || self.snap_line_y.is_some()
    }
}

/// Best alignment found so far on one axis.
struct AxisSnap {
    best_distance: f64,
    threshold: f64,
    shift: f64,
    line: Option<f64>,
}

impl AxisSnap {
    fn new(threshold: f64) -> Self {
        Self {
            best_distance: f64::INFINITY,
            threshold,
            shift: 0.0,
            line: None,
        }
    }

    /// Offer aligning `moving_edge` onto `target_edge`.
    fn offer(&mut self, moving_edge: f64, target_edge: f64) {
        let distance = (target_edge - moving_edge).abs();
        if distance < self.threshold && distance < self.best_distance {
            self.best_distance = distance;
            self.shift = target_edge - moving_edge;
            self.line = Some(target_edge);
        }
    }

    /// Evaluate the four edge pairings against one stationary span.
    fn offer_span(&mut self, start: f64, end: f64, target_start: f64, target_end: f64) {
        self.offer(start, target_start);
        self.offer(start, target_end);
        self.offer(end, target_start);
        self.offer(end, target_end);
    }
}

/// Snap `moving` against every rect in `stationary`.
///
/// Axes are independent: an axis with no candidate under `snap_distance`
/// keeps the input coordinate and reports no line.
pub fn resolve_snap<'a>(
    moving: Rect,
    stationary: impl IntoIterator<Item = &'a Rect>,
    snap_distance: f64,
) -> SnapResult {
    let mut snap_x = AxisSnap::new(snap_distance);
    let mut snap_y = AxisSnap::new(snap_distance);

    for target in stationary {
        snap_x.offer_span(moving.x, moving.right(), target.x, target.right());
        snap_y.offer_span(moving.y, moving.bottom(), target.y, target.bottom());
    }

    SnapResult {
        x: moving.x + snap_x.shift,
        y: moving.y + snap_y.shift,
        snap_line_x: snap_x.line,
        snap_line_y: snap_y.line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn no_neighbors_no_snap() {
        let r = resolve_snap(Rect::new(12.0, 34.0, 100.0, 50.0), &[], 5.0);
        assert_eq!(r.x, 12.0);
        assert_eq!(r.y, 34.0);
        assert!(!r.is_snapped());
    }

    #[test]
    fn left_snaps_to_neighbor_right() {
        let a = Rect::new(0.0, 0.0, 300.0, 120.0);
        let r = resolve_snap(Rect::new(302.0, 2.0, 300.0, 120.0), &[a], 5.0);
        assert_eq!(r.x, 300.0);
        assert_eq!(r.snap_line_x, Some(300.0));
        assert_eq!(r.y, 0.0);
        assert_eq!(r.snap_line_y, Some(0.0));
    }

    #[test]
    fn distance_equal_to_threshold_does_not_snap() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let r = resolve_snap(Rect::new(105.0, 500.0, 50.0, 50.0), &[a], 5.0);
        assert_eq!(r.x, 105.0);
        assert_eq!(r.snap_line_x, None);
        assert_eq!(r.y, 500.0);
        assert_eq!(r.snap_line_y, None);
    }

    #[test]
    fn nearest_candidate_wins_across_neighbors() {
        let far = Rect::new(0.0, 0.0, 96.0, 10.0);
        let near = Rect::new(0.0, 300.0, 99.0, 10.0);
        let r = resolve_snap(Rect::new(100.0, 150.0, 20.0, 20.0), &[far, near], 8.0);
        assert_eq!(r.x, 99.0);
        assert_eq!(r.snap_line_x, Some(99.0));
    }

    #[test]
    fn first_candidate_wins_ties() {
        // Left edge is 3 from target left (candidate 1) and right edge is
        // 3 from target right (candidate 4): candidate 1 is evaluated first.
        let target = Rect::new(0.0, 0.0, 100.0, 100.0);
        let moving = Rect::new(3.0, 400.0, 100.0, 10.0);
        for _ in 0..3 {
            let r = resolve_snap(moving, &[target], 5.0);
            assert_eq!(r.x, 0.0);
            assert_eq!(r.snap_line_x, Some(0.0));
        }
    }

    #[test]
    fn earlier_neighbor_wins_ties() {
        let first = Rect::new(0.0, 0.0, 50.0, 50.0);
        let second = Rect::new(0.0, 100.0, 56.0, 50.0);
        // Left edge 53: 3 from first.right (50) and 3 from second.right (56).
        let r = resolve_snap(Rect::new(53.0, 1000.0, 10.0, 10.0), &[first, second], 5.0);
        assert_eq!(r.x, 50.0);
        assert_eq!(r.snap_line_x, Some(50.0));
    }

    #[test]
    fn right_edge_snaps_to_target_left() {
        let target = Rect::new(200.0, 0.0, 100.0, 100.0);
        let r = resolve_snap(Rect::new(97.0, 1000.0, 100.0, 10.0), &[target], 5.0);
        assert_eq!(r.x, 100.0);
        assert_eq!(r.snap_line_x, Some(200.0));
    }

    #[test]
    fn bottom_snaps_to_target_top() {
        let target = Rect::new(1000.0, 200.0, 100.0, 100.0);
        let r = resolve_snap(Rect::new(0.0, 46.0, 10.0, 150.0), &[target], 5.0);
        assert_eq!(r.y, 50.0);
        assert_eq!(r.snap_line_y, Some(200.0));
        assert_eq!(r.x, 0.0);
    }
}
