//! Hardware timer interrupt scheduling for 8-bit AVR and 32-bit ARM
//! microcontrollers.
//!
//! The [`timer`] module turns a free running counter into a monotonic 32-bit
//! clock and a single programmable wake event for the task scheduler. Chip
//! specific counter access lives in [`hal`].

#![cfg_attr(not(test), no_std)]

#[macro_use]
pub mod logger;

pub mod config;
pub mod diagnostics;
pub mod hal;
pub mod heartbeat;
pub mod irq;
pub mod sched;
pub mod timer;

#[cfg(all(target_arch = "avr", feature = "atmega128", feature = "hil_tests"))]
pub mod testing;

pub use config::{find_constant, ConstValue, TimerConfig, DECLARED_CONSTANTS};
pub use sched::{is_before, Sched, TimerTask, TIMER_TASKS};
pub use timer::sim::SimTimer;
pub use timer::{LogicalTick, Timer, TimerError, TryStatus, WakeStatus, WakeTimer};
