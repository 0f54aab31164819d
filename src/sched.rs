//! Interface to the task scheduler that consumes the timer core

use crate::timer::{LogicalTick, TimerError};

/// Wraparound tolerant ordering of two logical times.
#[inline]
pub fn is_before(time1: LogicalTick, time2: LogicalTick) -> bool {
    (time1.wrapping_sub(time2) as i32) < 0
}

/// The scheduler side of the timer interrupt.
///
/// `T` is the timer the scheduler re-arms from inside dispatch, normally a
/// [`crate::timer::Timer`].
pub trait Sched<T> {
    /// Run every timer that is due. Called from the timer interrupt with
    /// interrupts disabled; each due timer re-arms through
    /// `timer.try_set_next()`.
    fn timer_dispatch(&mut self, timer: &mut T) -> Result<(), TimerError>;

    /// Request an unrecoverable shutdown.
    fn shutdown(&mut self, reason: &'static str);
}

/// Background work the timer core expects the scheduler to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    /// Refresh of the extended clock, once per millisecond with interrupts
    /// disabled.
    Periodic,
    /// Repeat budget boost, whenever nothing of higher priority is pending.
    Idle,
}

/// Tasks the scheduler has to register for a timer backend.
pub const TIMER_TASKS: [TimerTask; 2] = [TimerTask::Periodic, TimerTask::Idle];
