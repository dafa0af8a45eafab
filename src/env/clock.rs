use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use crate::foundation::core::Millis;

/// Monotonic millisecond clock.
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed origin.
    fn now_ms(&self) -> Millis;
}

/// Wall clock backed by [`Instant`], with its origin at construction.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock reading `0.0` now.
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
    fn now_ms(&self) -> Millis {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock. Clones share the same time source.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<Millis>>,
}

impl ManualClock {
    /// Create a clock reading `start_ms`.
    pub fn new(start_ms: Millis) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    /// Jump to an absolute time. Going backwards is ignored.
    pub fn set(&self, ms: Millis) {
        if ms > self.now.get() {
            self.now.set(ms);
        }
    }

    /// Move forward by `delta_ms` (negative deltas are ignored).
    pub fn advance(&self, delta_ms: Millis) {
        self.now.set(self.now.get() + delta_ms.max(0.0));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.get()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/env/clock.rs"]
mod tests;
