//! Timer interrupt scheduling
//!
//! Turns a free running hardware counter and its compare-match interrupt
//! into a 32-bit monotonic clock and a single "wake at time T" event. The
//! task scheduler multiplexes its own timers on top of that event; this
//! module only keeps the one compare register armed at a safe time and stops
//! a burst of near timers from starving everything else.
//!
//! All arming calls expect interrupts to be disabled by the caller.

pub mod clock;
pub mod delay;
pub mod repeat;
pub mod sim;

use core::convert::Infallible;

use crate::config::TimerConfig;
use crate::hal::timer::{Counter, HardwareTick, WaitWindow};
use crate::irq::{Interrupts, IrqGuard};
use crate::sched::{is_before, Sched, TimerTask};
use crate::log_error;

use repeat::RepeatLimiter;

/// Time on the extended 32-bit timeline, in counter ticks.
pub type LogicalTick = u32;

/// Outcome of [`WakeTimer::set_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WakeStatus {
    /// Armed for exactly the requested time.
    Armed = 0,
    /// Too close to now; armed for the earliest safe time instead.
    Clamped = 1,
}

/// Outcome of [`WakeTimer::try_set_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TryStatus {
    /// The requested time has passed; run the timer now.
    Waited = 0,
    /// The compare register is armed; return from the interrupt.
    Scheduled = 1,
}

/// Fatal timer conditions. Each one ends in a shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// `set_next` was called while the timer interrupt was being handled.
    SetNextDuringDispatch,
    /// A timer was rescheduled more than a millisecond in the past.
    RescheduledInPast,
}

impl TimerError {
    pub const fn reason(self) -> &'static str {
        match self {
            TimerError::SetNextDuringDispatch => "timer_set_next called during timer dispatch",
            TimerError::RescheduledInPast => "Rescheduled timer in the past",
        }
    }
}

impl core::fmt::Display for TimerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.reason())
    }
}

impl ufmt::uDisplay for TimerError {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        f.write_str(self.reason())
    }
}

/// The timer interface the scheduler and the rest of the firmware use.
pub trait WakeTimer {
    /// Current time on the extended timeline.
    fn read_time(&self) -> LogicalTick;

    /// Refresh the last known time. Call once per millisecond with
    /// interrupts disabled.
    fn periodic(&mut self);

    /// Arm the wake event for `target`, which must be no more than a few
    /// milliseconds ahead. Interrupts must be disabled.
    fn set_next(&mut self, target: LogicalTick) -> Result<WakeStatus, TimerError>;

    /// Like [`WakeTimer::set_next`] but for use from timer dispatch: a
    /// target in the very near future is waited for inline.
    fn try_set_next(&mut self, target: LogicalTick) -> Result<TryStatus, TimerError>;

    /// Background task boosting the priority of timers while idle.
    fn idle_task(&mut self);

    fn ticks_for_us(&self, us: u32) -> u32;

    fn run_task(&mut self, task: TimerTask) {
        match task {
            TimerTask::Periodic => self.periodic(),
            TimerTask::Idle => self.idle_task(),
        }
    }

    /// Non-blocking check that `target` has been reached.
    fn poll_reached(&self, target: LogicalTick) -> nb::Result<(), Infallible> {
        if is_before(self.read_time(), target) {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }
}

/// Timer core on top of one hardware counter.
pub struct Timer<C, R, I> {
    counter: C,
    repeat: R,
    irq: I,
    config: TimerConfig,
    last: LogicalTick,
    halted: Option<TimerError>,
}

impl<C, R, I> Timer<C, R, I>
where
    C: Counter,
    R: RepeatLimiter<C>,
    I: Interrupts,
{
    /// Wrap an initialized, running counter whose timeline starts at 0.
    pub fn new(counter: C, repeat: R, irq: I, config: TimerConfig) -> Self {
        Self {
            counter,
            repeat,
            irq,
            config,
            last: 0,
            halted: None,
        }
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn counter(&self) -> &C {
        &self.counter
    }

    /// The fatal error that stopped this timer, if any.
    pub fn halted(&self) -> Option<TimerError> {
        self.halted
    }

    /// Body of the compare-match interrupt.
    pub fn on_interrupt<S: Sched<Self>>(&mut self, sched: &mut S) {
        self.counter.acknowledge();
        let state = self.irq.save();
        let result = sched.timer_dispatch(self);
        // state came from the save() above
        unsafe { self.irq.restore(state) };
        if let Err(err) = result {
            self.halted.get_or_insert(err);
            sched.shutdown(err.reason());
        }
    }

    fn check_running(&self) -> Result<(), TimerError> {
        match self.halted {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn halt(&mut self, err: TimerError) -> TimerError {
        log_error!("timer: {}", err.reason());
        self.halted = Some(err);
        err
    }

    // The counter keeps running on its own, so `diff` only shrinks; the
    // loop ends within MIN_TRY_TICKS of counter time plus interrupt time.
    fn wait_until(&mut self, next: C::Tick, mut diff: i32) {
        match C::WAIT_WINDOW {
            WaitWindow::PerPoll => {
                // Can run more timers from this irq; briefly allow irqs
                unsafe { self.irq.enable() };
                self.irq.nop();
                self.irq.disable();

                while diff >= 0 {
                    let now = self.counter.read();
                    unsafe { self.irq.enable() };
                    diff = next.diff(now);
                    self.irq.disable();
                }
            }
            WaitWindow::WholeWait => {
                unsafe { self.irq.enable() };
                while diff >= 0 {
                    diff = next.diff(self.counter.read());
                }
                self.irq.disable();
            }
        }
    }
}

impl<C, R, I> WakeTimer for Timer<C, R, I>
where
    C: Counter,
    R: RepeatLimiter<C>,
    I: Interrupts,
{
    fn read_time(&self) -> LogicalTick {
        let (last, cur) = {
            let _guard = IrqGuard::new(&self.irq);
            (self.last, self.counter.read())
        };
        clock::extend(last, cur)
    }

    fn periodic(&mut self) {
        self.last = clock::extend(self.last, self.counter.read());
    }

    fn set_next(&mut self, target: LogicalTick) -> Result<WakeStatus, TimerError> {
        self.check_running()?;
        let cur = self.counter.read();
        if let Some(pending) = self.counter.compare_pending() {
            if self.counter.compare().diff(cur) < 0 && !pending {
                // Already processing timer irqs
                return Err(self.halt(TimerError::SetNextDuringDispatch));
            }
        }
        let min_time = clock::extend(
            self.last,
            cur.wrapping_add_ticks(self.config.min_lead_ticks),
        );
        if is_before(min_time, target) {
            self.counter.set_compare_clear(C::Tick::truncate(target));
            return Ok(WakeStatus::Armed);
        }
        self.counter.set_compare_clear(C::Tick::truncate(min_time));
        Ok(WakeStatus::Clamped)
    }

    fn try_set_next(&mut self, target: LogicalTick) -> Result<TryStatus, TimerError> {
        self.check_running()?;
        let next = C::Tick::truncate(target);
        let now = self.counter.read();
        let diff = next.diff(now);
        if diff > self.config.min_try_ticks as i32 {
            // Schedule next timer normally.
            self.counter.set_compare(next);
            return Ok(TryStatus::Scheduled);
        }

        if diff < -(self.config.past_limit_ticks as i32) {
            return Err(self.halt(TimerError::RescheduledInPast));
        }

        // Next timer is in the past or near future - can't reschedule to it
        if self.repeat.has_budget(&self.counter, now) {
            self.wait_until(next, diff);
            return Ok(TryStatus::Waited);
        }

        // Too many repeat timers from a single interrupt - force a pause
        self.repeat
            .restart(&mut self.counter, now, self.config.repeat_ticks);
        self.counter
            .set_compare(now.wrapping_add_ticks(self.config.defer_ticks));
        Ok(TryStatus::Scheduled)
    }

    fn idle_task(&mut self) {
        self.irq.disable();
        let now = self.counter.read();
        self.repeat
            .restart(&mut self.counter, now, self.config.idle_repeat_ticks);
        // the idle task runs with interrupts enabled
        unsafe { self.irq.enable() };
    }

    fn ticks_for_us(&self, us: u32) -> u32 {
        self.config.ticks_for_us(us)
    }
}

#[cfg(test)]
mod tests {
    use super::repeat::{CompareChannel, RepeatUntil};
    use super::*;
    use crate::hal::fake::FakeCounter;
    use crate::hal::timer::RepeatChannel;
    use crate::irq::fake::FakeIrq;

    type NarrowTimer = Timer<FakeCounter<u16>, CompareChannel, FakeIrq>;
    type WideTimer = Timer<FakeCounter<u32>, RepeatUntil<u32>, FakeIrq>;

    const CLOCK: u32 = 16_000_000;

    fn narrow(start: u16, step: u32) -> NarrowTimer {
        Timer::new(
            FakeCounter::new(start, step),
            CompareChannel,
            FakeIrq::new(false),
            TimerConfig::atmega128(CLOCK),
        )
    }

    fn wide(start: u32, step: u32) -> WideTimer {
        Timer::new(
            FakeCounter::new(start, step),
            RepeatUntil::new(start.wrapping_add(1000)),
            FakeIrq::new(false),
            TimerConfig::sam3x8e(42_000_000),
        )
    }

    #[test]
    fn test_set_next_clamps_close_target() {
        let mut timer = narrow(50_000, 0);
        assert_eq!(timer.set_next(50_050), Ok(WakeStatus::Clamped));
        assert_eq!(timer.counter.compare, 50_100);
        assert_eq!(timer.set_next(51_000), Ok(WakeStatus::Armed));
        assert_eq!(timer.counter.compare, 51_000);
    }

    #[test]
    fn test_set_next_boundary_is_clamped() {
        let mut timer = narrow(50_000, 0);
        // not strictly after now + MIN_LEAD_TICKS
        assert_eq!(timer.set_next(50_100), Ok(WakeStatus::Clamped));
        assert_eq!(timer.set_next(50_101), Ok(WakeStatus::Armed));
        assert_eq!(timer.counter.compare, 50_101);
    }

    #[test]
    fn test_set_next_past_target_is_clamped() {
        let mut timer = narrow(50_000, 0);
        assert_eq!(timer.set_next(40_000), Ok(WakeStatus::Clamped));
        assert_eq!(timer.counter.compare, 50_100);
    }

    #[test]
    fn test_set_next_never_arms_inside_lead_time() {
        for target in (49_000u32..52_000).step_by(37) {
            let mut timer = narrow(50_000, 0);
            timer.set_next(target).unwrap();
            let armed = timer.counter.compare;
            assert!(armed.diff(50_000) >= 100, "target {} armed at {}", target, armed);
        }
    }

    #[test]
    fn test_set_next_clears_stale_flag() {
        let mut timer = narrow(1000, 0);
        timer.set_next(5000).unwrap();
        timer.counter.advance(4500);
        assert!(timer.counter.compare_flag());
        // flag still latched: the irq has not been taken yet
        assert_eq!(timer.set_next(9000), Ok(WakeStatus::Armed));
        assert!(!timer.counter.compare_flag());
        assert_eq!(timer.counter.clears, 2);
    }

    #[test]
    fn test_set_next_uses_extended_high_bits() {
        let mut timer = narrow(0xffd0, 0);
        timer.periodic();
        assert_eq!(timer.read_time(), 0xffd0);
        // now + lead wraps the 16-bit counter
        assert_eq!(timer.set_next(0x0001_0010), Ok(WakeStatus::Clamped));
        assert_eq!(timer.counter.compare, 0x0034);
        assert_eq!(timer.set_next(0x0001_0100), Ok(WakeStatus::Armed));
        assert_eq!(timer.counter.compare, 0x0100);
    }

    #[test]
    fn test_set_next_during_dispatch_is_fatal() {
        let mut timer = narrow(1000, 0);
        timer.set_next(2000).unwrap();
        timer.counter.advance(1500);
        // interrupt taken: the vector entry consumed the flag
        timer.counter.acknowledge();
        assert_eq!(timer.set_next(4000), Err(TimerError::SetNextDuringDispatch));
        assert_eq!(timer.halted(), Some(TimerError::SetNextDuringDispatch));
        // halted for good
        assert_eq!(timer.try_set_next(8000), Err(TimerError::SetNextDuringDispatch));
    }

    #[test]
    fn test_wide_set_next_skips_reentry_check() {
        let mut timer = wide(1000, 0);
        timer.set_next(2000).unwrap();
        timer.counter.advance(1500);
        timer.counter.acknowledge();
        assert_eq!(timer.set_next(4000), Ok(WakeStatus::Armed));
        assert_eq!(timer.counter.compare, 4000);
    }

    #[test]
    fn test_try_set_next_far_target_scheduled() {
        let mut timer = narrow(10_000, 0);
        assert_eq!(timer.try_set_next(10_061), Ok(TryStatus::Scheduled));
        assert_eq!(timer.counter.compare, 10_061);
        // the flag is left alone on this path
        assert_eq!(timer.counter.clears, 0);
    }

    #[test]
    fn test_try_set_next_waits_with_budget() {
        let mut timer = narrow(10_000, 3);
        timer.idle_task();
        timer.irq.disable();
        let target = timer.counter.now() as u32 + 10;
        assert_eq!(timer.try_set_next(target), Ok(TryStatus::Waited));
        assert!(timer.counter.now() as u32 > target);
        assert!(timer.read_time() >= target);
        assert!(!timer.irq.enabled.get());
        // one slack window plus one per poll
        assert!(timer.irq.windows.get() >= 2);
        assert!(timer.counter.writes.is_empty());
    }

    #[test]
    fn test_try_set_next_due_now_waits_one_tick() {
        let mut timer = narrow(10_000, 1);
        timer.idle_task();
        timer.irq.disable();
        let target = timer.counter.now() as u32;
        assert_eq!(timer.try_set_next(target), Ok(TryStatus::Waited));
        assert!(timer.read_time() > target);
    }

    #[test]
    fn test_try_set_next_recently_past_waits_without_polling() {
        let mut timer = narrow(10_000, 1);
        timer.idle_task();
        timer.irq.disable();
        let windows = timer.irq.windows.get();
        assert_eq!(timer.try_set_next(9_000), Ok(TryStatus::Waited));
        // only the slack window, the loop body never ran
        assert_eq!(timer.irq.windows.get(), windows + 1);
    }

    #[test]
    fn test_try_set_next_defers_when_budget_spent() {
        let mut timer = narrow(10_000, 0);
        timer.counter.expire_repeat();
        assert_eq!(timer.try_set_next(10_030), Ok(TryStatus::Scheduled));
        assert_eq!(timer.counter.compare, 10_200);
        assert_eq!(timer.counter.repeat_at, 13_000);
        assert!(!timer.counter.repeat_elapsed());
    }

    #[test]
    fn test_try_set_next_past_limit_is_fatal() {
        let mut timer = narrow(40_000, 0);
        // exactly one millisecond late is still tolerated
        timer.counter.expire_repeat();
        assert_eq!(timer.try_set_next(24_000), Ok(TryStatus::Scheduled));
        assert_eq!(timer.try_set_next(23_999), Err(TimerError::RescheduledInPast));
        assert_eq!(timer.halted(), Some(TimerError::RescheduledInPast));
    }

    #[test]
    fn test_try_set_next_past_limit_fatal_even_with_budget() {
        let mut timer = narrow(40_000, 0);
        timer.idle_task();
        assert_eq!(timer.try_set_next(20_000), Err(TimerError::RescheduledInPast));
    }

    #[test]
    fn test_try_set_next_across_counter_rollover() {
        let mut timer = narrow(0xffe0, 0);
        // 0x0001_0030 is 0x50 ticks ahead of the counter
        assert_eq!(timer.try_set_next(0x0001_0030), Ok(TryStatus::Scheduled));
        assert_eq!(timer.counter.compare, 0x0030);
    }

    #[test]
    fn test_idle_task_always_resets_budget() {
        let mut timer = narrow(10_000, 0);
        timer.counter.set_repeat(30_000);
        timer.idle_task();
        // earlier than the previous window
        assert_eq!(timer.counter.repeat_at, 18_000);
        assert!(!timer.counter.repeat_elapsed());
        assert!(timer.irq.enabled.get());
    }

    #[test]
    fn test_idle_budget_expires() {
        let mut timer = narrow(10_000, 0);
        timer.idle_task();
        timer.counter.advance(8001);
        timer.irq.disable();
        let now = timer.counter.now() as u32;
        assert_eq!(timer.try_set_next(now + 5), Ok(TryStatus::Scheduled));
        assert_eq!(timer.counter.compare as u32, now + 200);
    }

    #[test]
    fn test_read_time_monotonic_with_periodic() {
        let mut timer = narrow(0, 0);
        let mut prev = timer.read_time();
        for _ in 0..200 {
            timer.counter.advance(16_000);
            timer.periodic();
            let now = timer.read_time();
            assert!(!is_before(now, prev));
            assert_eq!(now.wrapping_sub(prev), 16_000);
            prev = now;
        }
        assert_eq!(prev, 200 * 16_000);
    }

    #[test]
    fn test_read_time_restores_irq_state() {
        let timer = narrow(0, 0);
        unsafe { timer.irq.enable() };
        timer.read_time();
        assert!(timer.irq.enabled.get());
    }

    #[test]
    fn test_wide_read_time_needs_no_refresh() {
        let timer = wide(0xffff_fff0, 0);
        timer.counter.advance(0x20);
        assert_eq!(timer.read_time(), 0x10);
    }

    #[test]
    fn test_wide_try_set_next_waits_until_marker() {
        let mut timer = wide(5000, 7);
        let target = timer.counter.now() + 20;
        assert_eq!(timer.try_set_next(target), Ok(TryStatus::Waited));
        assert!(timer.counter.now() > target);
        // the whole wait is a single window
        assert_eq!(timer.irq.windows.get(), 1);
        assert!(!timer.irq.enabled.get());
    }

    #[test]
    fn test_wide_try_set_next_defers_after_marker() {
        let mut timer = wide(5000, 0);
        timer.counter.advance(2000);
        let now = timer.counter.now();
        assert_eq!(timer.try_set_next(now + 10), Ok(TryStatus::Scheduled));
        assert_eq!(timer.counter.compare, now + 210);
        assert_eq!(timer.repeat.until(), now + 4200);
    }

    #[test]
    fn test_wide_idle_task_sets_marker() {
        let mut timer = wide(5000, 0);
        timer.idle_task();
        assert_eq!(timer.repeat.until(), 5000 + 21_000);
    }

    #[test]
    fn test_run_task_dispatches() {
        let mut timer = narrow(500, 0);
        timer.counter.advance(100);
        timer.run_task(TimerTask::Periodic);
        assert_eq!(timer.last, 600);
        timer.run_task(TimerTask::Idle);
        assert_eq!(timer.counter.repeat_at, 8600);
    }

    #[test]
    fn test_poll_reached() {
        let timer = narrow(1000, 0);
        assert!(timer.poll_reached(1000).is_ok());
        assert!(matches!(timer.poll_reached(1001), Err(nb::Error::WouldBlock)));
    }

    struct Dispatcher {
        period: u32,
        next: u32,
        fired: u32,
        limit: u32,
        shutdown: Option<&'static str>,
    }

    impl<T: WakeTimer> Sched<T> for Dispatcher {
        fn timer_dispatch(&mut self, timer: &mut T) -> Result<(), TimerError> {
            loop {
                self.fired += 1;
                if self.fired >= self.limit {
                    return Ok(());
                }
                self.next = self.next.wrapping_add(self.period);
                match timer.try_set_next(self.next)? {
                    TryStatus::Waited => continue,
                    TryStatus::Scheduled => return Ok(()),
                }
            }
        }

        fn shutdown(&mut self, reason: &'static str) {
            self.shutdown = Some(reason);
        }
    }

    #[test]
    fn test_interrupt_runs_dispatch_and_acknowledges() {
        let mut timer = narrow(1000, 0);
        let mut sched = Dispatcher {
            period: 5000,
            next: 1000,
            fired: 0,
            limit: 100,
            shutdown: None,
        };
        timer.on_interrupt(&mut sched);
        assert_eq!(timer.counter.acks, 1);
        assert_eq!(sched.fired, 1);
        assert_eq!(timer.counter.compare, 6000);
        assert_eq!(sched.shutdown, None);
    }

    #[test]
    fn test_burst_of_timers_is_deferred() {
        // a 20 tick period is always inside MIN_TRY_TICKS
        let mut timer = narrow(1000, 2);
        timer.idle_task();
        let mut sched = Dispatcher {
            period: 20,
            next: 1000,
            fired: 0,
            limit: 10_000,
            shutdown: None,
        };
        timer.on_interrupt(&mut sched);
        assert!(sched.fired < 10_000);
        // the idle window ran out and the next timer was pushed back
        let deferred = timer.counter.compare;
        let now = timer.counter.now();
        assert!(deferred.diff(now) > 0);
        assert!(deferred.diff(now) <= 200);
        assert_eq!(sched.shutdown, None);
    }

    #[test]
    fn test_dispatch_error_requests_shutdown() {
        let mut timer = narrow(40_000, 0);
        let mut sched = Dispatcher {
            period: 0u32.wrapping_sub(20_000),
            next: 40_000,
            fired: 0,
            limit: 100,
            shutdown: None,
        };
        timer.on_interrupt(&mut sched);
        assert_eq!(sched.shutdown, Some("Rescheduled timer in the past"));
        assert_eq!(timer.halted(), Some(TimerError::RescheduledInPast));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", TimerError::RescheduledInPast),
            "Rescheduled timer in the past"
        );
        assert_eq!(WakeStatus::Clamped as u8, 1);
        assert_eq!(TryStatus::Waited as u8, 0);
    }
}
