//! Card records, world-space rectangles, and whole-board snapshots.
//!
//! Cards live in world space: `x`/`y` is the top-left corner on the
//! unbounded plane, independent of the current pan/zoom. A card's height is
//! either a fixed number of world pixels or `auto`, meaning the renderer
//! sizes it to its content and the host must measure it.

use crate::id::CardId;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ─── Height ──────────────────────────────────────────────────────────────

/// Card height: fixed, or sized to content by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CardHeight {
    #[default]
    Auto,
    Px(f64),
}

impl CardHeight {
    pub fn is_auto(&self) -> bool {
        matches!(self, CardHeight::Auto)
    }

    /// Fixed height, or `measured()` for auto-sized cards.
    pub fn resolve(&self, measured: impl FnOnce() -> f64) -> f64 {
        match self {
            CardHeight::Px(h) => *h,
            CardHeight::Auto => measured(),
        }
    }
}

impl Serialize for CardHeight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CardHeight::Auto => serializer.serialize_str("auto"),
            CardHeight::Px(h) => serializer.serialize_f64(*h),
        }
    }
}

impl<'de> Deserialize<'de> for CardHeight {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeightVisitor;

        impl Visitor<'_> for HeightVisitor {
            type Value = CardHeight;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a positive number or \"auto\"")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<CardHeight, E> {
                if v == "auto" {
                    Ok(CardHeight::Auto)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<CardHeight, E> {
                if v.is_finite() && v > 0.0 {
                    Ok(CardHeight::Px(v))
                } else {
                    Err(E::invalid_value(de::Unexpected::Float(v), &self))
                }
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<CardHeight, E> {
                self.visit_f64(v as f64)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<CardHeight, E> {
                self.visit_f64(v as f64)
            }
        }

        deserializer.deserialize_any(HeightVisitor)
    }
}

// ─── Card ────────────────────────────────────────────────────────────────

/// One free-floating note on the board.
///
/// `content` is opaque rich-text markup owned by the external editor; the
/// board never parses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    #[serde(default)]
    pub height: CardHeight,
    #[serde(default)]
    pub content: String,
}

impl Card {
    pub fn new(id: CardId, x: f64, y: f64, width: f64) -> Self {
        Self {
            id,
            x,
            y,
            width,
            height: CardHeight::Auto,
            content: String::new(),
        }
    }

    /// World-space rectangle, with `height` already resolved by the caller.
    pub fn rect(&self, height: f64) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: self.width,
            height,
        }
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// Partial update applied by resize and content edits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardPatch {
    pub width: Option<f64>,
    pub height: Option<CardHeight>,
    pub content: Option<String>,
}

impl CardPatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn size(width: f64, height: CardHeight) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            content: None,
        }
    }
}

/// Which visual properties of a card changed, so the renderer can touch
/// only those.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangedFields {
    pub position: bool,
    pub width: bool,
    pub height: bool,
    pub content: bool,
}

impl ChangedFields {
    pub fn any(&self) -> bool {
        self.position || self.width || self.height || self.content
    }

    pub fn geometry(&self) -> bool {
        self.width || self.height
    }
}

// ─── Rect ────────────────────────────────────────────────────────────────

/// Axis-aligned rectangle in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// AABB overlap test.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

// ─── Snapshot ────────────────────────────────────────────────────────────

/// A complete, independent copy of board state used as a history checkpoint.
///
/// Owns its cards outright: later mutation of the live board cannot reach
/// into a stored snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub cards: Vec<Card>,
    pub selected: Vec<CardId>,
    pub active: Option<CardId>,
}

impl BoardSnapshot {
    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }
}
