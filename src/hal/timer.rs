//! Capabilities a hardware counter backend provides to the timer core

/// Raw counter value of a given register width.
pub trait HardwareTick: Copy + Eq + Ord + core::fmt::Debug {
    const BITS: u32;

    /// Low bits of a logical tick.
    fn truncate(logical: u32) -> Self;

    fn widen(self) -> u32;

    fn wrapping_add_ticks(self, ticks: u32) -> Self;

    /// `self - earlier` in the register's signed width, sign extended.
    fn diff(self, earlier: Self) -> i32;
}

impl HardwareTick for u16 {
    const BITS: u32 = 16;

    #[inline]
    fn truncate(logical: u32) -> Self {
        logical as u16
    }

    #[inline]
    fn widen(self) -> u32 {
        self as u32
    }

    #[inline]
    fn wrapping_add_ticks(self, ticks: u32) -> Self {
        self.wrapping_add(ticks as u16)
    }

    #[inline]
    fn diff(self, earlier: Self) -> i32 {
        self.wrapping_sub(earlier) as i16 as i32
    }
}

impl HardwareTick for u32 {
    const BITS: u32 = 32;

    #[inline]
    fn truncate(logical: u32) -> Self {
        logical
    }

    #[inline]
    fn widen(self) -> u32 {
        self
    }

    #[inline]
    fn wrapping_add_ticks(self, ticks: u32) -> Self {
        self.wrapping_add(ticks)
    }

    #[inline]
    fn diff(self, earlier: Self) -> i32 {
        self.wrapping_sub(earlier) as i32
    }
}

/// Where interrupts are opened while waiting for a near timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitWindow {
    /// Open once before the wait and once around every counter poll.
    PerPoll,
    /// Open for the whole wait.
    WholeWait,
}

/// Free running counter with one compare-match interrupt.
pub trait Counter {
    type Tick: HardwareTick;

    const WAIT_WINDOW: WaitWindow;

    /// Current counter value.
    fn read(&self) -> Self::Tick;

    /// Value in the primary compare register.
    fn compare(&self) -> Self::Tick;

    fn set_compare(&mut self, at: Self::Tick);

    /// Drop a compare match that has already been latched.
    fn clear_pending(&mut self);

    /// Whether a compare match is latched and not yet taken, for hardware
    /// that can tell without consuming the flag.
    fn compare_pending(&self) -> Option<bool>;

    /// Interrupt entry acknowledgement.
    #[inline]
    fn acknowledge(&mut self) {}

    #[inline]
    fn set_compare_clear(&mut self, at: Self::Tick) {
        self.set_compare(at);
        self.clear_pending();
    }
}

/// Second compare channel used only to limit repeated timer dispatch.
pub trait RepeatChannel: Counter {
    /// Program the channel and clear its flag.
    fn set_repeat(&mut self, at: Self::Tick);

    /// Whether the channel has matched since the last `set_repeat`.
    fn repeat_elapsed(&self) -> bool;
}

/// Timer/Counter1 clock select (CS12:CS10).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Prescaler {
    Stop = 0,
    Direct = 1,
    Div8 = 2,
    Div64 = 3,
    Div256 = 4,
    Div1024 = 5,
}

impl Prescaler {
    pub const MASK: u8 = 0x07;
}
