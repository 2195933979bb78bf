use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use lazy_static::lazy_static;

lazy_static! {
    static ref EPOCH: Instant = Instant::now();
}

/// Source of "now" in seconds, on the same time base as the ticks fed to the
/// sampler.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Seconds elapsed since the first time any `MonotonicClock` was read.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonotonicClock;

impl MonotonicClock {
    /// Stamps a tick on this clock's time base.
    pub fn timestamp() -> f64 {
        EPOCH.elapsed().as_secs_f64()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        MonotonicClock::timestamp()
    }
}

/// Clock moved by hand. Clones share the same reading.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        ManualClock {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, now: f64) {
        self.now.set(now);
    }

    pub fn advance(&self, secs: f64) {
        self.now.set(self.now.get() + secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}
