//! Stand-in timer for host builds
//!
//! Keeps the scheduler and command layers building and running on a host.
//! Time never advances and every arming request succeeds, so nothing here
//! says anything about timing behavior.

use super::{LogicalTick, TimerError, TryStatus, WakeStatus, WakeTimer};

#[derive(Debug, Default, Clone, Copy)]
pub struct SimTimer;

impl SimTimer {
    pub const fn new() -> Self {
        SimTimer
    }
}

impl WakeTimer for SimTimer {
    fn read_time(&self) -> LogicalTick {
        0
    }

    fn periodic(&mut self) {}

    fn set_next(&mut self, _target: LogicalTick) -> Result<WakeStatus, TimerError> {
        Ok(WakeStatus::Armed)
    }

    fn try_set_next(&mut self, _target: LogicalTick) -> Result<TryStatus, TimerError> {
        Ok(TryStatus::Scheduled)
    }

    fn idle_task(&mut self) {}

    fn ticks_for_us(&self, _us: u32) -> u32 {
        0
    }
}
