//! High-resolution timer coarsening
//!
//! `performance.now()` and `Date.prototype.getTime` both return
//! `floor(raw + offset)`. The offset is drawn from `[0, 10)` ms and re-drawn
//! once the page clock has moved 30 s past the previous draw. Re-drawing is
//! lazy, on the first read after the interval elapses, so no timer is left
//! running in the page.

use std::cell::Cell;
use std::rc::Rc;

use crate::capability::{CapResult, CapabilityError, PageHost, TimingApi, TimingSlot};
use crate::noise::Noise;

pub const REROLL_INTERVAL_MS: f64 = 30_000.0;
pub const MAX_OFFSET_MS: f64 = 10.0;

pub struct JitteredClock<H> {
    inner: TimingSlot<H>,
    noise: Rc<Noise>,
    /// (offset, page clock at the draw)
    state: Cell<(f64, f64)>,
}

impl<H> JitteredClock<H> {
    pub fn new(inner: TimingSlot<H>, noise: Rc<Noise>) -> Self {
        let rolled_at = inner.performance_now();
        let offset = noise.offset(MAX_OFFSET_MS);
        Self { inner, noise, state: Cell::new((offset, rolled_at)) }
    }

    pub fn current_offset(&self) -> f64 {
        self.state.get().0
    }

    fn offset(&self) -> f64 {
        let (offset, rolled_at) = self.state.get();
        let now = self.inner.performance_now();
        if now - rolled_at < REROLL_INTERVAL_MS {
            return offset;
        }
        let fresh = self.noise.offset(MAX_OFFSET_MS);
        self.state.set((fresh, now));
        fresh
    }
}

impl<H> TimingApi<H> for JitteredClock<H> {
    fn performance_now(&self) -> f64 {
        let offset = self.offset();
        (self.inner.performance_now() + offset).floor()
    }

    fn get_time(&self, date: &H) -> f64 {
        let offset = self.offset();
        (self.inner.get_time(date) + offset).floor()
    }
}

pub fn install<P: PageHost>(host: &P, noise: &Rc<Noise>) -> CapResult<()> {
    let inner = host.timing().ok_or(CapabilityError::Unavailable("performance"))?;
    host.set_timing(Rc::new(JitteredClock::new(inner, Rc::clone(noise))))
}
