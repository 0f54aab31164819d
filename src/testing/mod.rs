//! Hardware-in-loop checks of the timer core on a real ATmega128
//!
//! Every case runs with interrupts disabled, the way the scheduler calls the
//! timer. Results are printed over the diagnostic serial port.

use ufmt::{uwrite, uwriteln};

use crate::hal::uart::SerialLog;
use crate::hal::{Counter, HardwareTick, Tc1Timer};
use crate::timer::{TryStatus, WakeStatus, WakeTimer};

pub trait TestCase {
    fn run(&self, timer: &mut Tc1Timer) -> TestResult;
    fn name(&self) -> &'static str;
}

#[derive(PartialEq)]
pub enum TestResult {
    Pass,
    Fail(TestError),
}

#[derive(PartialEq)]
pub enum TestError {
    AssertionFailed(&'static str),
    Timeout,
}

impl ufmt::uDebug for TestError {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        match self {
            TestError::AssertionFailed(what) => {
                f.write_str("assertion failed: ")?;
                f.write_str(what)
            }
            TestError::Timeout => f.write_str("timeout"),
        }
    }
}

#[macro_export]
macro_rules! hil_assert {
    ($cond:expr) => {
        if !$cond {
            return $crate::testing::TestResult::Fail($crate::testing::TestError::AssertionFailed(
                stringify!($cond),
            ));
        }
    };
}

pub struct TestRunner {
    out: SerialLog,
    total_tests: u32,
    passed_tests: u32,
}

impl TestRunner {
    pub fn new() -> Self {
        Self {
            out: SerialLog,
            total_tests: 0,
            passed_tests: 0,
        }
    }

    pub fn run_suite(&mut self, name: &'static str, timer: &mut Tc1Timer, tests: &[&dyn TestCase]) {
        let _ = uwriteln!(self.out, "\n=== Test Suite: {} ===", name);

        for test in tests {
            self.total_tests += 1;
            let _ = uwrite!(self.out, "Running {}: ", test.name());

            match test.run(timer) {
                TestResult::Pass => {
                    self.passed_tests += 1;
                    let _ = uwriteln!(self.out, "PASS");
                }
                TestResult::Fail(err) => {
                    let _ = uwriteln!(self.out, "FAIL - {:?}", err);
                }
            }
        }

        let _ = uwriteln!(
            self.out,
            "Passed: {}/{}",
            self.passed_tests,
            self.total_tests
        );
    }

    pub fn all_passed(&self) -> bool {
        self.passed_tests == self.total_tests
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads across several counter wraps never go backwards.
pub struct ClockMonotonic;
impl TestCase for ClockMonotonic {
    fn name(&self) -> &'static str {
        "Clock monotonic"
    }

    fn run(&self, timer: &mut Tc1Timer) -> TestResult {
        let mut prev = timer.read_time();
        let mut budget = 2_000_000u32;
        // cover 4 wraps of the 16-bit counter
        let end = prev.wrapping_add(4 * 65_536);
        while crate::sched::is_before(prev, end) {
            if budget == 0 {
                return TestResult::Fail(TestError::Timeout);
            }
            budget -= 1;
            timer.periodic();
            let now = timer.read_time();
            hil_assert!(!crate::sched::is_before(now, prev));
            prev = now;
        }
        TestResult::Pass
    }
}

/// A target inside the lead time is pulled forward, one beyond it is kept.
pub struct SetNextClamp;
impl TestCase for SetNextClamp {
    fn name(&self) -> &'static str {
        "set_next clamp"
    }

    fn run(&self, timer: &mut Tc1Timer) -> TestResult {
        timer.periodic();
        let now = timer.read_time();
        hil_assert!(timer.set_next(now.wrapping_add(10)) == Ok(WakeStatus::Clamped));
        let lead = timer.config().min_lead_ticks;
        hil_assert!(timer.set_next(now.wrapping_add(lead + 2000)) == Ok(WakeStatus::Armed));
        TestResult::Pass
    }
}

/// A timer just ahead is waited for inline while the idle window is open.
pub struct TrySetNextWait;
impl TestCase for TrySetNextWait {
    fn name(&self) -> &'static str {
        "try_set_next wait"
    }

    fn run(&self, timer: &mut Tc1Timer) -> TestResult {
        timer.periodic();
        timer.idle_task();
        avr_device::interrupt::disable();
        let target = timer.read_time().wrapping_add(40);
        hil_assert!(timer.try_set_next(target) == Ok(TryStatus::Waited));
        hil_assert!(!crate::sched::is_before(timer.read_time(), target));
        TestResult::Pass
    }
}

/// A far target lands in the compare register as is.
pub struct TrySetNextSchedule;
impl TestCase for TrySetNextSchedule {
    fn name(&self) -> &'static str {
        "try_set_next schedule"
    }

    fn run(&self, timer: &mut Tc1Timer) -> TestResult {
        timer.periodic();
        let target = timer.read_time().wrapping_add(5000);
        hil_assert!(timer.try_set_next(target) == Ok(TryStatus::Scheduled));
        hil_assert!(timer.counter().compare() == <u16 as HardwareTick>::truncate(target));
        TestResult::Pass
    }
}
