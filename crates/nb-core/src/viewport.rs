//! Pan/zoom coordinate transform with eased animation.
//!
//! Screen space is pixels inside the host element; world space is the
//! unbounded plane cards live on:
//!
//! ```text
//! world  = (screen - translate) / scale
//! screen = world * scale + translate
//! ```
//!
//! Zooming sets *targets*; the host drives `tick()` once per display frame
//! and the current values ease toward the targets by a fixed fraction of
//! the remaining distance. Panning by drag bypasses easing entirely so the
//! plane tracks the pointer exactly.

use crate::model::Rect;
use serde::{Deserialize, Serialize};

/// Pixel dimensions of the host element showing the board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl Default for ViewportSize {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

/// Tunables for zoom bounds, easing, wheel normalization, and the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewportConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Fraction of the remaining distance covered per frame.
    pub damping: f64,
    pub pan_epsilon: f64,
    pub scale_epsilon: f64,
    /// Zoom factor per normalized wheel pixel: `exp(-delta * sensitivity)`.
    pub wheel_sensitivity: f64,
    /// Pixels per wheel "line" unit.
    pub line_height_px: f64,
    pub grid_base_spacing: f64,
    /// Below this scale the dot grid is hidden.
    pub grid_min_scale: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 4.0,
            damping: 0.2,
            pan_epsilon: 0.01,
            scale_epsilon: 0.0001,
            wheel_sensitivity: 0.0015,
            line_height_px: 16.0,
            grid_base_spacing: 24.0,
            grid_min_scale: 0.35,
        }
    }
}

/// Current transform plus animation targets. This is also the persisted
/// "world state".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale: f64,
    #[serde(rename = "targetTX")]
    pub target_tx: f64,
    #[serde(rename = "targetTY")]
    pub target_ty: f64,
    pub target_scale: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            scale: 1.0,
            target_tx: 0.0,
            target_ty: 0.0,
            target_scale: 1.0,
        }
    }
}

/// Raw wheel input in whichever unit the host reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelDelta {
    Pixel(f64),
    Line(f64),
    Page(f64),
}

impl WheelDelta {
    /// Build from a DOM `WheelEvent.deltaMode` (0 = pixel, 1 = line, 2 = page).
    pub fn from_dom(delta_y: f64, delta_mode: u32) -> Self {
        match delta_mode {
            1 => WheelDelta::Line(delta_y),
            2 => WheelDelta::Page(delta_y),
            _ => WheelDelta::Pixel(delta_y),
        }
    }
}

/// Result of one animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still easing: schedule another frame.
    Continue,
    /// Converged on the targets; the loop has stopped.
    Settled,
}

/// Dot-grid background parameters for the current transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridStyle {
    pub visible: bool,
    pub spacing: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

pub struct Viewport {
    state: ViewState,
    size: ViewportSize,
    config: ViewportConfig,
    animating: bool,
}

impl Viewport {
    pub fn new(size: ViewportSize, config: ViewportConfig) -> Self {
        Self {
            state: ViewState::default(),
            size,
            config,
            animating: false,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn size(&self) -> ViewportSize {
        self.size
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn set_size(&mut self, size: ViewportSize) {
        self.size = size;
    }

    pub fn scale(&self) -> f64 {
        self.state.scale
    }

    pub fn translate(&self) -> (f64, f64) {
        (self.state.translate_x, self.state.translate_y)
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    /// Adopt a persisted world state, clamping both scales into range.
    /// Returns `true` if the host must schedule a frame.
    pub fn restore(&mut self, mut state: ViewState) -> bool {
        state.scale = self.clamp_scale(state.scale);
        state.target_scale = self.clamp_scale(state.target_scale);
        self.state = state;
        if self.converged() {
            false
        } else {
            self.kick()
        }
    }

    // ─── Transform ───────────────────────────────────────────────────────

    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        (
            (sx - self.state.translate_x) / self.state.scale,
            (sy - self.state.translate_y) / self.state.scale,
        )
    }

    pub fn world_to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
        (
            wx * self.state.scale + self.state.translate_x,
            wy * self.state.scale + self.state.translate_y,
        )
    }

    /// Same as `screen_to_world`, but against the animation targets.
    pub fn screen_to_world_at_target(&self, sx: f64, sy: f64) -> (f64, f64) {
        (
            (sx - self.state.target_tx) / self.state.target_scale,
            (sy - self.state.target_ty) / self.state.target_scale,
        )
    }

    /// World-space rectangle currently on screen.
    pub fn visible_bounds(&self) -> Rect {
        let (x0, y0) = self.screen_to_world(0.0, 0.0);
        let (x1, y1) = self.screen_to_world(self.size.width, self.size.height);
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    // ─── Navigation ──────────────────────────────────────────────────────

    /// Put world origin at the center of the viewport. Scale is untouched.
    pub fn center_view(&mut self) {
        let tx = self.size.width / 2.0;
        let ty = self.size.height / 2.0;
        self.state.translate_x = tx;
        self.state.translate_y = ty;
        self.state.target_tx = tx;
        self.state.target_ty = ty;
    }

    /// Pan by a screen-space delta with no easing.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.state.translate_x += dx;
        self.state.translate_y += dy;
        self.state.target_tx = self.state.translate_x;
        self.state.target_ty = self.state.translate_y;
    }

    /// Wheel zoom anchored at a screen position.
    /// Returns `true` if the host must schedule a frame.
    pub fn zoom_at(&mut self, sx: f64, sy: f64, delta: WheelDelta) -> bool {
        let pixels = match delta {
            WheelDelta::Pixel(d) => d,
            WheelDelta::Line(d) => d * self.config.line_height_px,
            WheelDelta::Page(d) => d * self.size.height,
        };
        let factor = (-pixels * self.config.wheel_sensitivity).exp();
        self.zoom_by(sx, sy, factor)
    }

    /// Multiply the target scale by `factor`, keeping the world point under
    /// `(sx, sy)` fixed once the animation lands.
    pub fn zoom_by(&mut self, sx: f64, sy: f64, factor: f64) -> bool {
        let old_scale = self.state.target_scale;
        let new_scale = self.clamp_scale(old_scale * factor);
        let ratio = new_scale / old_scale;

        let offset_x = sx - self.state.target_tx;
        let offset_y = sy - self.state.target_ty;
        self.state.target_tx = sx - offset_x * ratio;
        self.state.target_ty = sy - offset_y * ratio;
        self.state.target_scale = new_scale;

        log::trace!("zoom_by {factor:.4} at ({sx}, {sy}) -> target scale {new_scale:.4}");
        self.kick()
    }

    // ─── Animation loop ──────────────────────────────────────────────────

    /// Mark the loop running. Returns `true` only on the idle → running
    /// edge, so a second loop is never scheduled.
    pub fn kick(&mut self) -> bool {
        if self.animating {
            return false;
        }
        self.animating = true;
        true
    }

    /// Advance one frame toward the targets.
    pub fn tick(&mut self) -> Tick {
        if !self.animating {
            return Tick::Settled;
        }
        let k = self.config.damping;
        let s = &mut self.state;
        s.translate_x += (s.target_tx - s.translate_x) * k;
        s.translate_y += (s.target_ty - s.translate_y) * k;
        s.scale += (s.target_scale - s.scale) * k;

        if self.converged() {
            let s = &mut self.state;
            s.translate_x = s.target_tx;
            s.translate_y = s.target_ty;
            s.scale = s.target_scale;
            self.animating = false;
            log::trace!("viewport settled at scale {:.4}", self.state.scale);
            Tick::Settled
        } else {
            Tick::Continue
        }
    }

    fn converged(&self) -> bool {
        let s = &self.state;
        (s.target_tx - s.translate_x).abs() < self.config.pan_epsilon
            && (s.target_ty - s.translate_y).abs() < self.config.pan_epsilon
            && (s.target_scale - s.scale).abs() < self.config.scale_epsilon
    }

    fn clamp_scale(&self, scale: f64) -> f64 {
        if scale.is_finite() {
            scale.clamp(self.config.min_scale, self.config.max_scale)
        } else {
            1.0_f64.clamp(self.config.min_scale, self.config.max_scale)
        }
    }

    // ─── Background ──────────────────────────────────────────────────────

    /// Dot-grid spacing and offset for the current frame.
    ///
    /// Offsets use floor-mod so they stay in `[0, spacing)` for negative
    /// translations too.
    pub fn grid(&self) -> GridStyle {
        let spacing = self.config.grid_base_spacing * self.state.scale;
        if self.state.scale < self.config.grid_min_scale || spacing <= 0.0 {
            return GridStyle {
                visible: false,
                spacing,
                offset_x: 0.0,
                offset_y: 0.0,
            };
        }
        GridStyle {
            visible: true,
            spacing,
            offset_x: self.state.translate_x.rem_euclid(spacing),
            offset_y: self.state.translate_y.rem_euclid(spacing),
        }
    }
}
