//! Board configuration and timer tuning constants

include!(concat!(env!("OUT_DIR"), "/board.rs"));

/// Value of a constant declared to the host protocol layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstValue {
    Int(u32),
    Str(&'static str),
}

/// A named, read-only constant the command layer can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclaredConstant {
    pub name: &'static str,
    pub value: ConstValue,
}

/// Constants declared by the timer core for the active build.
pub static DECLARED_CONSTANTS: [DeclaredConstant; 2] = [
    DeclaredConstant {
        name: "CLOCK_FREQ",
        value: ConstValue::Int(CLOCK_FREQ),
    },
    DeclaredConstant {
        name: "MCU",
        value: ConstValue::Str(MCU),
    },
];

/// Look up a declared constant by name.
pub fn find_constant(name: &str) -> Option<ConstValue> {
    DECLARED_CONSTANTS
        .iter()
        .find(|c| c.name == name)
        .map(|c| c.value)
}

/// Number of counter ticks in `us` microseconds at `clock_freq` Hz.
#[inline]
pub const fn ticks_for_us(clock_freq: u32, us: u32) -> u32 {
    us.wrapping_mul(clock_freq / 1_000_000)
}

/// USART baud rate register value for normal speed mode, or `None` when
/// `clock_freq` is too slow for `baud` or the divisor does not fit UBRR.
pub const fn usart_ubrr(clock_freq: u32, baud: u32) -> Option<u16> {
    if baud == 0 || clock_freq / 16 < baud {
        return None;
    }
    let ubrr = clock_freq / (16 * baud) - 1;
    if ubrr > 0x0fff {
        return None;
    }
    Some(ubrr as u16)
}

/// Timing parameters of one counter backend, all in counter ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    pub clock_freq: u32,
    /// Smallest distance from now at which the compare register can be
    /// written and still match.
    pub min_lead_ticks: u32,
    /// Below this distance `try_set_next` handles the timer inline.
    pub min_try_ticks: u32,
    /// Repeat window opened when dispatch is forced to pause.
    pub repeat_ticks: u32,
    /// Repeat window opened by the idle task.
    pub idle_repeat_ticks: u32,
    /// Delay applied to a timer when the repeat window is exhausted.
    pub defer_ticks: u32,
    /// How far in the past a rescheduled timer may be before it is fatal.
    pub past_limit_ticks: u32,
}

impl TimerConfig {
    /// ATmega128 Timer/Counter1 running at the CPU clock.
    pub const fn atmega128(clock_freq: u32) -> Self {
        Self {
            clock_freq,
            min_lead_ticks: 100,
            // 40 ticks to exit irq; 20 ticks of progress
            min_try_ticks: 60,
            repeat_ticks: 3000,
            idle_repeat_ticks: 8000,
            defer_ticks: 200,
            past_limit_ticks: ticks_for_us(clock_freq, 1000),
        }
    }

    /// SAM3X8E TC0 channel 0.
    pub const fn sam3x8e(clock_freq: u32) -> Self {
        Self {
            clock_freq,
            min_lead_ticks: 100,
            min_try_ticks: ticks_for_us(clock_freq, 1),
            repeat_ticks: ticks_for_us(clock_freq, 100),
            idle_repeat_ticks: ticks_for_us(clock_freq, 500),
            defer_ticks: ticks_for_us(clock_freq, 5),
            past_limit_ticks: ticks_for_us(clock_freq, 1000),
        }
    }

    #[inline]
    pub const fn ticks_for_us(&self, us: u32) -> u32 {
        ticks_for_us(self.clock_freq, us)
    }
}
