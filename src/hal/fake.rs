//! Scripted counter for host tests

use super::timer::{Counter, HardwareTick, RepeatChannel, WaitWindow};
use core::cell::Cell;

/// Counter that advances by `step` ticks on every read and latches its
/// compare flags the way the hardware does when the count passes them.
pub struct FakeCounter<T: HardwareTick> {
    now: Cell<T>,
    step: u32,
    pub compare: T,
    compare_flag: Cell<bool>,
    pub repeat_at: T,
    repeat_flag: Cell<bool>,
    pub writes: Vec<T>,
    pub clears: u32,
    pub acks: u32,
}

impl<T: HardwareTick> FakeCounter<T> {
    pub fn new(start: T, step: u32) -> Self {
        Self {
            now: Cell::new(start),
            step,
            compare: start,
            compare_flag: Cell::new(false),
            repeat_at: start,
            repeat_flag: Cell::new(false),
            writes: Vec::new(),
            clears: 0,
            acks: 0,
        }
    }

    pub fn now(&self) -> T {
        self.now.get()
    }

    pub fn advance(&self, ticks: u32) {
        let from = self.now.get();
        if passes(from, ticks, self.compare) {
            self.compare_flag.set(true);
        }
        if passes(from, ticks, self.repeat_at) {
            self.repeat_flag.set(true);
        }
        self.now.set(from.wrapping_add_ticks(ticks));
    }

    pub fn compare_flag(&self) -> bool {
        self.compare_flag.get()
    }

    pub fn expire_repeat(&self) {
        self.repeat_flag.set(true);
    }

    fn read_and_step(&self) -> T {
        let cur = self.now.get();
        self.advance(self.step);
        cur
    }
}

fn passes<T: HardwareTick>(from: T, ticks: u32, at: T) -> bool {
    let ahead = at.diff(from);
    ahead > 0 && ahead as u32 <= ticks
}

impl Counter for FakeCounter<u16> {
    type Tick = u16;

    const WAIT_WINDOW: WaitWindow = WaitWindow::PerPoll;

    fn read(&self) -> u16 {
        self.read_and_step()
    }

    fn compare(&self) -> u16 {
        self.compare
    }

    fn set_compare(&mut self, at: u16) {
        self.compare = at;
        self.writes.push(at);
    }

    fn clear_pending(&mut self) {
        self.compare_flag.set(false);
        self.clears += 1;
    }

    fn compare_pending(&self) -> Option<bool> {
        Some(self.compare_flag.get())
    }

    // the vector entry clears OCF1A
    fn acknowledge(&mut self) {
        self.compare_flag.set(false);
        self.acks += 1;
    }
}

impl RepeatChannel for FakeCounter<u16> {
    fn set_repeat(&mut self, at: u16) {
        self.repeat_at = at;
        self.repeat_flag.set(false);
    }

    fn repeat_elapsed(&self) -> bool {
        self.repeat_flag.get()
    }
}

impl Counter for FakeCounter<u32> {
    type Tick = u32;

    const WAIT_WINDOW: WaitWindow = WaitWindow::WholeWait;

    fn read(&self) -> u32 {
        self.read_and_step()
    }

    fn compare(&self) -> u32 {
        self.compare
    }

    fn set_compare(&mut self, at: u32) {
        self.compare = at;
        self.writes.push(at);
    }

    fn clear_pending(&mut self) {
        self.compare_flag.set(false);
        self.clears += 1;
    }

    fn compare_pending(&self) -> Option<bool> {
        None
    }

    fn acknowledge(&mut self) {
        self.compare_flag.set(false);
        self.acks += 1;
    }
}
