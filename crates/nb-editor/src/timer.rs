//! Wall-clock access and cancel-and-reschedule debouncing.
//!
//! Nothing here blocks or spawns: a `Debouncer` only remembers a deadline.
//! The owner polls it from the host's timer callback and runs the deferred
//! work itself.

use std::cell::Cell;
use std::rc::Rc;

/// Source of "now" in milliseconds.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Process clock measured from construction.
pub struct SystemClock {
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// A single pending deadline. Re-triggering replaces it (last write wins).
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay_ms: f64,
    deadline: Option<f64>,
}

impl Debouncer {
    pub fn new(delay_ms: f64) -> Self {
        Self {
            delay_ms,
            deadline: None,
        }
    }

    /// Cancel any pending deadline and start a new one from `now`.
    pub fn schedule(&mut self, now: f64) {
        self.deadline = Some(now + self.delay_ms);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// If the deadline has passed, clear it and return `true`.
    pub fn fire_if_due(&mut self, now: f64) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Clear a pending deadline regardless of time. Returns whether one was
    /// pending, so the caller can run the deferred work immediately.
    pub fn flush(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reschedule_pushes_deadline_out() {
        let clock = ManualClock::new(0.0);
        let mut d = Debouncer::new(100.0);
        d.schedule(clock.now_ms());
        clock.advance(80.0);
        d.schedule(clock.now_ms());
        clock.advance(80.0);
        assert!(!d.fire_if_due(clock.now_ms()));
        clock.advance(20.0);
        assert!(d.fire_if_due(clock.now_ms()));
        assert!(!d.is_pending());
    }

    #[test]
    fn flush_reports_pending_work_once() {
        let mut d = Debouncer::new(100.0);
        assert!(!d.flush());
        d.schedule(0.0);
        assert!(d.flush());
        assert!(!d.flush());
    }

    #[test]
    fn cancel_drops_deadline() {
        let mut d = Debouncer::new(10.0);
        d.schedule(0.0);
        d.cancel();
        assert!(!d.fire_if_due(1_000.0));
    }
}
