//! Global interrupt control

/// Control over the global interrupt enable flag of one CPU.
pub trait Interrupts {
    /// Interrupt state captured by [`Interrupts::save`].
    type State: Copy;

    fn disable(&self);

    /// # Safety
    ///
    /// Enabling interrupts inside a section that relies on them being
    /// disabled breaks that section.
    unsafe fn enable(&self);

    /// Disable interrupts and return the previous state.
    fn save(&self) -> Self::State;

    /// # Safety
    ///
    /// `state` must come from a matching [`Interrupts::save`].
    unsafe fn restore(&self, state: Self::State);

    /// One instruction of slack, long enough for a pending interrupt to be
    /// taken after `enable`.
    #[inline]
    fn nop(&self) {}
}

/// Interrupts disabled for the lifetime of the guard; the previous state is
/// restored on drop.
pub struct IrqGuard<'a, I: Interrupts> {
    irq: &'a I,
    state: I::State,
}

impl<'a, I: Interrupts> IrqGuard<'a, I> {
    #[inline]
    pub fn new(irq: &'a I) -> Self {
        let state = irq.save();
        Self { irq, state }
    }
}

impl<I: Interrupts> Drop for IrqGuard<'_, I> {
    #[inline]
    fn drop(&mut self) {
        // the state was captured by this guard's save()
        unsafe { self.irq.restore(self.state) }
    }
}

/// AVR status register I flag.
#[cfg(target_arch = "avr")]
#[derive(Debug, Clone, Copy, Default)]
pub struct AvrIrq;

#[cfg(target_arch = "avr")]
impl Interrupts for AvrIrq {
    type State = bool;

    #[inline]
    fn disable(&self) {
        avr_device::interrupt::disable();
    }

    #[inline]
    unsafe fn enable(&self) {
        avr_device::interrupt::enable();
    }

    #[inline]
    fn save(&self) -> bool {
        let was_enabled = avr_device::interrupt::is_enabled();
        avr_device::interrupt::disable();
        was_enabled
    }

    #[inline]
    unsafe fn restore(&self, was_enabled: bool) {
        if was_enabled {
            avr_device::interrupt::enable();
        }
    }

    #[inline]
    fn nop(&self) {
        avr_device::asm::nop();
    }
}

/// Cortex-M PRIMASK.
#[cfg(target_arch = "arm")]
#[derive(Debug, Clone, Copy, Default)]
pub struct CortexMIrq;

#[cfg(target_arch = "arm")]
impl Interrupts for CortexMIrq {
    type State = bool;

    #[inline]
    fn disable(&self) {
        cortex_m::interrupt::disable();
    }

    #[inline]
    unsafe fn enable(&self) {
        cortex_m::interrupt::enable();
    }

    #[inline]
    fn save(&self) -> bool {
        let was_enabled = cortex_m::register::primask::read().is_inactive();
        cortex_m::interrupt::disable();
        was_enabled
    }

    #[inline]
    unsafe fn restore(&self, was_enabled: bool) {
        if was_enabled {
            cortex_m::interrupt::enable();
        }
    }

    #[inline]
    fn nop(&self) {
        cortex_m::asm::nop();
    }
}
