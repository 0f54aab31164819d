pub mod timer;

#[cfg(all(target_arch = "avr", feature = "atmega128"))]
pub mod tc1;
#[cfg(target_arch = "avr")]
pub mod uart;

#[cfg(all(target_arch = "arm", feature = "sam3x8e"))]
pub mod sam3x;

#[cfg(test)]
pub(crate) mod fake;

// Re-export commonly used types
pub use timer::{Counter, HardwareTick, Prescaler, RepeatChannel, WaitWindow};
#[cfg(all(target_arch = "avr", feature = "atmega128"))]
pub use tc1::{Tc1, Tc1Timer};
#[cfg(all(target_arch = "arm", feature = "sam3x8e"))]
pub use sam3x::{Tc0, Tc0Timer};
