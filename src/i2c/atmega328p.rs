// Licensed under the Apache-2.0 license

//! ATmega328P PAC binding for the TWI engine.
//!
//! Wraps the `avr-device` TWI peripheral in the [`Instance`] register seam
//! so [`AtmegaTwi`](crate::i2c::atmega_twi::AtmegaTwi) can drive the real
//! hardware. Owning the PAC peripheral makes the binding a singleton; the
//! engine's `&mut self` discipline then serializes all bus access.

use crate::i2c::atmega_twi::Instance;
use avr_device::atmega328p::TWI;

pub struct TwiPeripheral {
    twi: TWI,
}

impl TwiPeripheral {
    pub fn new(twi: TWI) -> Self {
        Self { twi }
    }

    /// Release the PAC peripheral.
    pub fn free(self) -> TWI {
        self.twi
    }
}

impl Instance for TwiPeripheral {
    fn twbr_write(&mut self, value: u8) {
        self.twi.twbr.write(|w| unsafe { w.bits(value) });
    }

    fn twsr_read(&self) -> u8 {
        self.twi.twsr.read().bits()
    }

    fn twsr_write(&mut self, value: u8) {
        // Only the TWPS prescaler bits are writable.
        self.twi.twsr.write(|w| unsafe { w.bits(value & 0x03) });
    }

    fn twcr_read(&self) -> u8 {
        self.twi.twcr.read().bits()
    }

    fn twcr_write(&mut self, value: u8) {
        self.twi.twcr.write(|w| unsafe { w.bits(value) });
    }

    fn twdr_read(&self) -> u8 {
        self.twi.twdr.read().bits()
    }

    fn twdr_write(&mut self, value: u8) {
        self.twi.twdr.write(|w| unsafe { w.bits(value) });
    }

    fn twar_write(&mut self, value: u8) {
        self.twi.twar.write(|w| unsafe { w.bits(value) });
    }
}
