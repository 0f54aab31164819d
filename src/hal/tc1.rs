//! ATmega128 Timer/Counter1 backend
//!
//! TCNT1 free runs at the CPU clock. OCR1A carries the wake time and raises
//! `TIMER1_COMPA`; OCR1B has no interrupt and only latches OCF1B, which is
//! used to limit how many timers run from one compare interrupt.

use avr_device::atmega128a::{CPU, TC1};

use super::timer::{Counter, Prescaler, RepeatChannel, WaitWindow};
use crate::config::{TimerConfig, CLOCK_DIVIDER, CLOCK_FREQ};
use crate::irq::{AvrIrq, IrqGuard};
use crate::timer::repeat::CompareChannel;
use crate::timer::Timer;
use crate::log_info;

const OCIE1A: u8 = 1 << 4;
const OCF1A: u8 = 1 << 4;
const OCF1B: u8 = 1 << 3;

/// Timer core running on TC1.
pub type Tc1Timer = Timer<Tc1, CompareChannel, AvrIrq>;

pub struct Tc1 {
    tc1: TC1,
}

impl Tc1 {
    /// Program the system clock divider and start TC1 with the compare-A
    /// interrupt enabled.
    pub fn init(tc1: TC1, cpu: &CPU) -> Self {
        if let Some(xdiv) = CLOCK_DIVIDER {
            if cpu.xdiv.read().bits() != xdiv {
                let _guard = IrqGuard::new(&AvrIrq);
                // XDIVEN has to be cleared before a new ratio is written
                cpu.xdiv.write(|w| unsafe { w.bits(0) });
                cpu.xdiv.write(|w| unsafe { w.bits(xdiv) });
            }
        }

        // no outputs
        tc1.tccr1a.write(|w| unsafe { w.bits(0) });
        // Normal Mode
        tc1.tccr1b
            .write(|w| unsafe { w.bits(Prescaler::Direct as u8 & Prescaler::MASK) });
        tc1.tcnt1.write(|w| unsafe { w.bits(0) });
        // enable interrupt
        tc1.timsk.modify(|r, w| unsafe { w.bits(r.bits() | OCIE1A) });

        log_info!("timer: TC1 running at {} Hz", CLOCK_FREQ);
        Self { tc1 }
    }

    /// Timer core with the ATmega128 timing parameters.
    pub fn into_timer(self) -> Tc1Timer {
        Timer::new(
            self,
            CompareChannel,
            AvrIrq,
            TimerConfig::atmega128(CLOCK_FREQ),
        )
    }
}

impl Counter for Tc1 {
    type Tick = u16;

    const WAIT_WINDOW: WaitWindow = WaitWindow::PerPoll;

    #[inline]
    fn read(&self) -> u16 {
        self.tc1.tcnt1.read().bits()
    }

    #[inline]
    fn compare(&self) -> u16 {
        self.tc1.ocr1a.read().bits()
    }

    #[inline]
    fn set_compare(&mut self, at: u16) {
        self.tc1.ocr1a.write(|w| unsafe { w.bits(at) });
    }

    #[inline]
    fn clear_pending(&mut self) {
        // flags clear by writing one
        self.tc1.tifr.write(|w| unsafe { w.bits(OCF1A) });
    }

    #[inline]
    fn compare_pending(&self) -> Option<bool> {
        Some(self.tc1.tifr.read().bits() & OCF1A != 0)
    }
}

impl RepeatChannel for Tc1 {
    #[inline]
    fn set_repeat(&mut self, at: u16) {
        self.tc1.ocr1b.write(|w| unsafe { w.bits(at) });
        self.tc1.tifr.write(|w| unsafe { w.bits(OCF1B) });
    }

    #[inline]
    fn repeat_elapsed(&self) -> bool {
        self.tc1.tifr.read().bits() & OCF1B != 0
    }
}
