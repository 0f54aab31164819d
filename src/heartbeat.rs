//! Fixed-period wake driven from the timer interrupt
//!
//! Stands in for the task scheduler in the firmware: one timer re-armed
//! every `period` ticks from dispatch. Dispatch also refreshes the extended
//! clock about once per millisecond, so the main loop may block (for
//! example on serial output) for longer than one counter wrap.

use crate::sched::Sched;
use crate::timer::{LogicalTick, TimerError, TryStatus, WakeStatus, WakeTimer};

pub struct Heartbeat {
    next: LogicalTick,
    period: u32,
    beats: u32,
    refresh_every: u32,
    since_refresh: u32,
    shutdown: Option<&'static str>,
}

impl Heartbeat {
    pub const fn new() -> Self {
        Self {
            next: 0,
            period: 0,
            beats: 0,
            refresh_every: 1,
            since_refresh: 0,
            shutdown: None,
        }
    }

    /// Arm the first beat `period` ticks from now. Interrupts must be
    /// disabled.
    pub fn start<T: WakeTimer>(
        &mut self,
        timer: &mut T,
        period: u32,
    ) -> Result<WakeStatus, TimerError> {
        self.period = period;
        self.refresh_every = match period {
            0 => 1,
            _ => (timer.ticks_for_us(1000) / period).max(1),
        };
        self.since_refresh = 0;
        self.next = timer.read_time().wrapping_add(period);
        timer.set_next(self.next)
    }

    pub fn beats(&self) -> u32 {
        self.beats
    }

    /// Reason of the first shutdown requested from dispatch.
    pub fn shutdown_reason(&self) -> Option<&'static str> {
        self.shutdown
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: WakeTimer> Sched<T> for Heartbeat {
    fn timer_dispatch(&mut self, timer: &mut T) -> Result<(), TimerError> {
        self.since_refresh += 1;
        if self.since_refresh >= self.refresh_every {
            self.since_refresh = 0;
            timer.periodic();
        }
        loop {
            self.beats = self.beats.wrapping_add(1);
            self.next = self.next.wrapping_add(self.period);
            if timer.try_set_next(self.next)? == TryStatus::Scheduled {
                return Ok(());
            }
        }
    }

    fn shutdown(&mut self, reason: &'static str) {
        self.shutdown.get_or_insert(reason);
    }
}
