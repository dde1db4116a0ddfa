//! Wall-clock sources
//!
//! Every scheduler tick and timer reads the current time from a [`Clock`]
//! instead of accumulating per-frame deltas. Production code uses
//! [`SystemClock`]; tests and headless runs drive a [`ManualClock`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// A monotonic millisecond clock
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed origin
    fn now_ms(&self) -> f64;
}

/// Shared clock reference used throughout the engine
pub type SharedClock = Rc<dyn Clock>;

/// Monotonic clock backed by [`Instant`]
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// A clock that only moves when told to
///
/// Clones share the same underlying time, so a test can keep one copy and
/// hand another to the engine.
///
/// ```
/// use glide_core::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let engine_view = clock.clone();
/// clock.advance(16.0);
/// assert_eq!(engine_view.now_ms(), 16.0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the clock at a specific timestamp
    pub fn starting_at(now_ms: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(now_ms)),
        }
    }

    /// Move time forward; negative deltas are ignored
    pub fn advance(&self, delta_ms: f64) {
        if delta_ms > 0.0 {
            self.now.set(self.now.get() + delta_ms);
        }
    }

    /// Jump to an absolute timestamp (never backwards)
    pub fn set(&self, now_ms: f64) {
        if now_ms > self.now.get() {
            self.now.set(now_ms);
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_is_monotonic() {
        let clock = ManualClock::starting_at(100.0);
        clock.advance(50.0);
        assert_eq!(clock.now_ms(), 150.0);

        clock.advance(-20.0);
        clock.set(10.0);
        assert_eq!(clock.now_ms(), 150.0);

        clock.set(400.0);
        assert_eq!(clock.now_ms(), 400.0);
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
        assert!(a >= 0.0);
    }
}
