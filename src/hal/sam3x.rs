//! SAM3X8E TC0 channel 0 backend
//!
//! The 32-bit counter covers the whole logical timeline, so no extension or
//! periodic refresh is needed. Register A raises the compare interrupt;
//! reading the status register acknowledges it.

use cortex_m::interrupt::InterruptNumber;
use cortex_m::peripheral::NVIC;
use sam3x8e::{PMC, TC0};

use super::timer::{Counter, WaitWindow};
use crate::config::{TimerConfig, CLOCK_FREQ};
use crate::irq::CortexMIrq;
use crate::log_info;
use crate::timer::repeat::RepeatUntil;
use crate::timer::Timer;

const ID_TC0: u32 = 27;

const TC_CCR_CLKEN: u32 = 1 << 0;
const TC_CCR_CLKDIS: u32 = 1 << 1;
const TC_CCR_SWTRG: u32 = 1 << 2;
const TC_CMR_WAVE: u32 = 1 << 15;
const TC_CMR_WAVSEL_UP: u32 = 0 << 13;
const TC_CMR_TCCLKS_TIMER_CLOCK1: u32 = 0;
const TC_IER_CPAS: u32 = 1 << 2;

// 4 priority bits, left aligned
const TC0_PRIORITY: u8 = 1 << 4;

/// Timer core running on TC0.
pub type Tc0Timer = Timer<Tc0, RepeatUntil<u32>, CortexMIrq>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tc0Irq;

unsafe impl InterruptNumber for Tc0Irq {
    #[inline]
    fn number(self) -> u16 {
        ID_TC0 as u16
    }
}

pub struct Tc0 {
    tc0: TC0,
}

impl Tc0 {
    /// Reset channel 0, enable its clock and the register A compare
    /// interrupt, then start counting from zero.
    pub fn init(tc0: TC0, pmc: &PMC, nvic: &mut NVIC) -> Self {
        // Reset the timer
        tc0.ccr0.write(|w| unsafe { w.bits(TC_CCR_CLKDIS) });
        tc0.idr0.write(|w| unsafe { w.bits(0xFFFF_FFFF) });
        let _ = tc0.sr0.read();
        // Enable it
        pmc.pmc_pcer0.write(|w| unsafe { w.bits(1 << ID_TC0) });
        tc0.cmr0.write(|w| unsafe {
            w.bits(TC_CMR_WAVE | TC_CMR_WAVSEL_UP | TC_CMR_TCCLKS_TIMER_CLOCK1)
        });
        tc0.ier0.write(|w| unsafe { w.bits(TC_IER_CPAS) });
        // priority and unmask only touch the TC0 line, owned through `tc0`
        unsafe {
            nvic.set_priority(Tc0Irq, TC0_PRIORITY);
            NVIC::unmask(Tc0Irq);
        }
        tc0.ra0.write(|w| unsafe { w.bits(1) });
        tc0.ccr0
            .write(|w| unsafe { w.bits(TC_CCR_CLKEN | TC_CCR_SWTRG) });

        log_info!("timer: TC0 running at {} Hz", CLOCK_FREQ);
        Self { tc0 }
    }

    /// Timer core with the SAM3X8E timing parameters.
    pub fn into_timer(self) -> Tc0Timer {
        Timer::new(
            self,
            RepeatUntil::new(0),
            CortexMIrq,
            TimerConfig::sam3x8e(CLOCK_FREQ),
        )
    }
}

impl Counter for Tc0 {
    type Tick = u32;

    const WAIT_WINDOW: WaitWindow = WaitWindow::WholeWait;

    #[inline]
    fn read(&self) -> u32 {
        self.tc0.cv0.read().bits()
    }

    #[inline]
    fn compare(&self) -> u32 {
        self.tc0.ra0.read().bits()
    }

    #[inline]
    fn set_compare(&mut self, at: u32) {
        self.tc0.ra0.write(|w| unsafe { w.bits(at) });
    }

    #[inline]
    fn clear_pending(&mut self) {
        // status bits clear on read
        let _ = self.tc0.sr0.read();
    }

    // the flag cannot be inspected without consuming it
    #[inline]
    fn compare_pending(&self) -> Option<bool> {
        None
    }

    #[inline]
    fn acknowledge(&mut self) {
        let _ = self.tc0.sr0.read();
    }
}
