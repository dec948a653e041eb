use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer identity of a card on the board.
/// Stable across moves, resizes, and edits; `Copy`, `Eq`, `Hash`, `Ord`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u64);

impl CardId {
    /// Largest id that survives a round trip through a JS number.
    pub const MAX: CardId = CardId((1 << 53) - 1);

    pub fn get(self) -> u64 {
        self.0
    }

    /// Ids start at 1 and stay exactly representable as `f64`.
    pub fn is_valid(self) -> bool {
        self.0 >= 1 && self <= Self::MAX
    }
}

impl fmt::Debug for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id counter for one board session.
///
/// Ids are never handed out twice: `observe` only ever moves the counter
/// forward, so loading a board with high ids cannot rewind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdAllocator {
    next: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Hand out the next id and advance.
    pub fn allocate(&mut self) -> CardId {
        let id = CardId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }

    /// Make sure future ids are strictly greater than `id`.
    pub fn observe(&mut self, id: CardId) {
        if id.0 >= self.next {
            self.next = id.0.saturating_add(1);
        }
    }

    /// The id the next `allocate` call will return.
    pub fn peek(&self) -> CardId {
        CardId(self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocated_ids_are_unique() {
        let mut ids = IdAllocator::new();
        let a = ids.allocate();
        let b = ids.allocate();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn observe_never_rewinds() {
        let mut ids = IdAllocator::new();
        ids.observe(CardId(41));
        assert_eq!(ids.allocate(), CardId(42));
        ids.observe(CardId(3));
        assert_eq!(ids.allocate(), CardId(43));
    }

    #[test]
    fn observing_the_largest_id_does_not_wrap() {
        let mut ids = IdAllocator::new();
        ids.observe(CardId(u64::MAX));
        assert_eq!(ids.peek(), CardId(u64::MAX));
        assert_eq!(ids.allocate(), CardId(u64::MAX));
        assert_ne!(ids.peek(), CardId(0));
    }

    #[test]
    fn valid_ids_fit_in_a_js_number() {
        assert!(!CardId(0).is_valid());
        assert!(CardId(1).is_valid());
        assert!(CardId::MAX.is_valid());
        assert_eq!(CardId::MAX.get() as f64 as u64, CardId::MAX.get());
        assert!(!CardId(CardId::MAX.get() + 1).is_valid());
        assert!(!CardId(u64::MAX).is_valid());
    }

    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_string(&CardId(7)).unwrap();
        assert_eq!(json, "7");
    }
}
