//! Shutdown bookkeeping
#![allow(clippy::new_without_default)]

use crate::irq::Interrupts;
use crate::log_error;
use crate::timer::{LogicalTick, TimerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    TimingError = 0x5000,
    SystemError = 0x8000,
}

/// The first shutdown request and when it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownRecord {
    pub code: ErrorCode,
    pub subcode: u16,
    pub reason: &'static str,
    pub timestamp: LogicalTick,
}

impl From<TimerError> for ErrorCode {
    fn from(_: TimerError) -> Self {
        ErrorCode::TimingError
    }
}

fn timer_subcode(err: TimerError) -> u16 {
    match err {
        TimerError::SetNextDuringDispatch => 1,
        TimerError::RescheduledInPast => 2,
    }
}

pub struct Diagnostics {
    first: Option<ShutdownRecord>,
    requests: u32,
}

impl Diagnostics {
    pub const fn new() -> Self {
        Self {
            first: None,
            requests: 0,
        }
    }

    /// Record a shutdown request. Only the first reason is kept; later ones
    /// are usually fallout from it.
    pub fn report(&mut self, code: ErrorCode, subcode: u16, reason: &'static str, now: LogicalTick) {
        self.requests = self.requests.saturating_add(1);
        if self.first.is_some() {
            return;
        }
        log_error!("shutdown at {}: {}", now, reason);
        self.first = Some(ShutdownRecord {
            code,
            subcode,
            reason,
            timestamp: now,
        });
    }

    pub fn report_timer(&mut self, err: TimerError, now: LogicalTick) {
        self.report(err.into(), timer_subcode(err), err.reason(), now);
    }

    /// Record a shutdown by reason string, as delivered to
    /// [`crate::sched::Sched::shutdown`].
    pub fn report_reason(&mut self, reason: &'static str, now: LogicalTick) {
        let timer_err = [TimerError::SetNextDuringDispatch, TimerError::RescheduledInPast]
            .into_iter()
            .find(|e| e.reason() == reason);
        match timer_err {
            Some(err) => self.report_timer(err, now),
            None => self.report(ErrorCode::SystemError, 0, reason, now),
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.first.is_some()
    }

    pub fn first(&self) -> Option<&ShutdownRecord> {
        self.first.as_ref()
    }

    pub fn request_count(&self) -> u32 {
        self.requests
    }
}

/// Stop for good: interrupts off, spin.
pub fn halt<I: Interrupts>(irq: &I) -> ! {
    irq.disable();
    #[allow(clippy::empty_loop)]
    loop {}
}
