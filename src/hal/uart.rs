//! Polled USART0 transmitter for diagnostic output
//!
//! Blocking and interrupt free so it can be used from the timer interrupt
//! and on the shutdown path.

use core::convert::Infallible;

use avr_device::atmega128a::USART0;

use crate::config::{usart_ubrr, CLOCK_FREQ};

pub const LOG_BAUD: u32 = 38_400;

const UBRR: u16 = match usart_ubrr(CLOCK_FREQ, LOG_BAUD) {
    Some(ubrr) => ubrr,
    None => panic!("CLOCK_FREQ too low for the 38400 baud log port"),
};

const UDRE0: u8 = 1 << 5;
const TXEN0: u8 = 1 << 3;
// 8N1
const UCSZ_8BIT: u8 = 0b11 << 1;

/// Write handle for the diagnostic serial port.
pub struct SerialLog;

impl SerialLog {
    /// Configure USART0 for transmit only.
    pub fn init(usart: &USART0) {
        usart.ubrr0h.write(|w| unsafe { w.bits((UBRR >> 8) as u8) });
        usart.ubrr0l.write(|w| unsafe { w.bits(UBRR as u8) });
        usart.ucsr0c.write(|w| unsafe { w.bits(UCSZ_8BIT) });
        usart.ucsr0b.write(|w| unsafe { w.bits(TXEN0) });
    }

    pub fn write_byte(&mut self, byte: u8) {
        let usart = unsafe { &*USART0::ptr() };
        while usart.ucsr0a.read().bits() & UDRE0 == 0 {}
        usart.udr0.write(|w| unsafe { w.bits(byte) });
    }
}

impl ufmt::uWrite for SerialLog {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
        Ok(())
    }
}
