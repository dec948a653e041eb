//! Integration tests: transform and snap properties over a sweep of inputs.

use nb_core::{Rect, Tick, ViewState, Viewport, ViewportConfig, ViewportSize, WheelDelta, resolve_snap};

const TRANSFORMS: &[(f64, f64, f64)] = &[
    (0.0, 0.0, 1.0),
    (400.0, 300.0, 1.0),
    (-1234.5, 87.25, 0.1),
    (17.0, -9000.0, 4.0),
    (3.3, 7.7, 0.35),
    (-0.5, 0.5, 2.718),
];

const POINTS: &[(f64, f64)] = &[
    (0.0, 0.0),
    (400.0, 300.0),
    (799.0, 1.0),
    (-50.0, 620.0),
    (123.456, 654.321),
];

fn viewport_at(tx: f64, ty: f64, scale: f64) -> Viewport {
    let mut vp = Viewport::new(ViewportSize::default(), ViewportConfig::default());
    vp.restore(ViewState {
        translate_x: tx,
        translate_y: ty,
        scale,
        target_tx: tx,
        target_ty: ty,
        target_scale: scale,
    });
    vp
}

fn settle(vp: &mut Viewport) {
    for _ in 0..1000 {
        if vp.tick() == Tick::Settled {
            return;
        }
    }
    panic!("viewport never settled");
}

#[test]
fn screen_world_round_trip() {
    for &(tx, ty, scale) in TRANSFORMS {
        let vp = viewport_at(tx, ty, scale);
        for &(x, y) in POINTS {
            let (wx, wy) = vp.screen_to_world(x, y);
            let (sx, sy) = vp.world_to_screen(wx, wy);
            assert!((sx - x).abs() < 1e-9, "x drifted at {tx},{ty},{scale}");
            assert!((sy - y).abs() < 1e-9, "y drifted at {tx},{ty},{scale}");
        }
    }
}

#[test]
fn zoom_keeps_cursor_anchor_on_target_transform() {
    let deltas = [
        WheelDelta::Pixel(-120.0),
        WheelDelta::Pixel(240.0),
        WheelDelta::Line(-3.0),
        WheelDelta::Page(1.0),
    ];
    for &(tx, ty, scale) in TRANSFORMS {
        for &(x, y) in POINTS {
            for delta in deltas {
                let mut vp = viewport_at(tx, ty, scale);
                let before = vp.screen_to_world(x, y);
                vp.zoom_at(x, y, delta);
                let target = vp.screen_to_world_at_target(x, y);
                let tolerance = 1e-9 * (1.0 + before.0.abs().max(before.1.abs()));
                assert!((target.0 - before.0).abs() < tolerance);
                assert!((target.1 - before.1).abs() < tolerance);
                let s = vp.state().target_scale;
                assert!((0.1..=4.0).contains(&s));
            }
        }
    }
}

#[test]
fn zoom_anchor_holds_after_animation() {
    let mut vp = viewport_at(400.0, 300.0, 1.0);
    let before = vp.screen_to_world(400.0, 300.0);
    assert!(vp.zoom_by(400.0, 300.0, 2.0));
    // A second zoom while running only moves targets.
    assert!(!vp.zoom_by(400.0, 300.0, 1.0));
    settle(&mut vp);
    assert_eq!(vp.scale(), 2.0);
    assert_eq!(vp.screen_to_world(400.0, 300.0), before);
}

#[test]
fn far_neighbors_never_snap() {
    let moving = Rect::new(12.5, -40.0, 300.0, 120.0);
    let snap_distance = 10.0;
    let neighbors = [
        // Every edge pairing is at least 10 away on both axes.
        Rect::new(12.5 + 310.0 + 10.0, -40.0 + 130.0, 200.0, 50.0),
        Rect::new(12.5 - 400.0, -40.0 - 300.0, 300.0, 120.0),
        Rect::new(12.5 + 10.0, 500.0, 500.0, 80.0),
    ];
    let result = resolve_snap(moving, &neighbors, snap_distance);
    // The third neighbor's left edge sits exactly `snap_distance` away.
    assert_eq!(result.x, 12.5);
    assert_eq!(result.y, -40.0);
    assert_eq!(result.snap_line_x, None);
    assert_eq!(result.snap_line_y, None);
}

#[test]
fn tie_break_is_reproducible() {
    let moving = Rect::new(0.0, 0.0, 100.0, 100.0);
    // Left edge is 3 from both neighbors' right edges.
    let first = Rect::new(-203.0, 400.0, 200.0, 50.0);
    let second = Rect::new(-253.0, 800.0, 250.0, 50.0);
    let a = resolve_snap(moving, [&first, &second], 5.0);
    let b = resolve_snap(moving, [&first, &second], 5.0);
    assert_eq!(a, b);
    assert_eq!(a.x, -3.0);
    assert_eq!(a.snap_line_x, Some(-3.0));

    // Equal distance in opposite directions: the earlier neighbor wins.
    let left = Rect::new(-204.0, 400.0, 200.0, 50.0);
    let right = Rect::new(4.0, 800.0, 250.0, 50.0);
    assert_eq!(resolve_snap(moving, [&left, &right], 5.0).x, -4.0);
    assert_eq!(resolve_snap(moving, [&right, &left], 5.0).x, 4.0);
}

#[test]
fn grid_offset_is_floor_mod() {
    for &(tx, ty, scale) in TRANSFORMS {
        let vp = viewport_at(tx, ty, scale);
        let grid = vp.grid();
        if scale < 0.35 {
            assert!(!grid.visible);
            continue;
        }
        assert!(grid.visible);
        assert!((0.0..grid.spacing).contains(&grid.offset_x));
        assert!((0.0..grid.spacing).contains(&grid.offset_y));
    }
}
