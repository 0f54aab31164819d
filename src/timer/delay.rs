//! Busy-wait delays on the monotonic clock
//!
//! On a narrow counter the delay relies on the last known time staying
//! fresh, so a single `delay_us` must be shorter than one counter wrap
//! (4 ms at 16 MHz) unless the 1 ms refresh keeps running. `delay_ms` waits
//! one millisecond at a time.

use embedded_hal::blocking::delay::{DelayMs, DelayUs};

use super::{LogicalTick, WakeTimer};

pub struct Delay<'a, T: WakeTimer> {
    timer: &'a T,
}

impl<'a, T: WakeTimer> Delay<'a, T> {
    pub fn new(timer: &'a T) -> Self {
        Self { timer }
    }

    /// Spin until `target` on the extended timeline.
    pub fn until(&mut self, target: LogicalTick) {
        match nb::block!(self.timer.poll_reached(target)) {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }
}

impl<T: WakeTimer> DelayUs<u32> for Delay<'_, T> {
    fn delay_us(&mut self, us: u32) {
        let end = self
            .timer
            .read_time()
            .wrapping_add(self.timer.ticks_for_us(us));
        self.until(end);
    }
}

impl<T: WakeTimer> DelayUs<u16> for Delay<'_, T> {
    fn delay_us(&mut self, us: u16) {
        DelayUs::<u32>::delay_us(self, us as u32);
    }
}

impl<T: WakeTimer> DelayMs<u32> for Delay<'_, T> {
    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            DelayUs::<u32>::delay_us(self, 1000);
        }
    }
}

impl<T: WakeTimer> DelayMs<u16> for Delay<'_, T> {
    fn delay_ms(&mut self, ms: u16) {
        DelayMs::<u32>::delay_ms(self, ms as u32);
    }
}
