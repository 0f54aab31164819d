//! Limits on how long timers may be run back to back from one interrupt

use crate::hal::timer::{Counter, HardwareTick, RepeatChannel};

/// Budget of ticks during which dispatch may keep handling near timers
/// inline.
pub trait RepeatLimiter<C: Counter> {
    /// Whether near timers may still be waited for at counter value `now`.
    fn has_budget(&self, counter: &C, now: C::Tick) -> bool;

    /// Open a new window ending `ticks` after `now`.
    fn restart(&mut self, counter: &mut C, now: C::Tick, ticks: u32);
}

/// Budget kept by a second hardware compare channel; it is spent once the
/// channel has matched.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompareChannel;

impl<C: RepeatChannel> RepeatLimiter<C> for CompareChannel {
    #[inline]
    fn has_budget(&self, counter: &C, _now: C::Tick) -> bool {
        !counter.repeat_elapsed()
    }

    #[inline]
    fn restart(&mut self, counter: &mut C, now: C::Tick, ticks: u32) {
        counter.set_repeat(now.wrapping_add_ticks(ticks));
    }
}

/// Budget kept in software as the counter value it runs out at.
#[derive(Debug, Default, Clone, Copy)]
pub struct RepeatUntil<T> {
    until: T,
}

impl<T: HardwareTick> RepeatUntil<T> {
    pub fn new(until: T) -> Self {
        Self { until }
    }

    pub fn until(&self) -> T {
        self.until
    }
}

impl<C: Counter> RepeatLimiter<C> for RepeatUntil<C::Tick> {
    #[inline]
    fn has_budget(&self, _counter: &C, now: C::Tick) -> bool {
        now.diff(self.until) < 0
    }

    #[inline]
    fn restart(&mut self, _counter: &mut C, now: C::Tick, ticks: u32) {
        self.until = now.wrapping_add_ticks(ticks);
    }
}
