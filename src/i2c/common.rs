// Licensed under the Apache-2.0 license

//! Common types and constants for the TWI driver modules.
//!
//! This module provides the shared configuration surface used across the
//! bus engine: role and speed selection, the bit-rate prescaler, and the
//! builder-style bus configuration.

use fugit::HertzU32;

/// Role the TWI engine is initialized in. Exactly one role is active per
/// engine instance; switching roles requires re-initialization.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusRole {
    Controller,
    Peripheral,
}

/// Standard SCL clock rates. Arbitrary rates can be requested through
/// `I2cConfigBuilder::scl` as well; these are the two the board is
/// validated at.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum I2cSpeed {
    Standard = 100_000,
    Fast = 400_000,
}

impl I2cSpeed {
    #[must_use]
    pub fn hz(self) -> HertzU32 {
        HertzU32::from_raw(self as u32)
    }
}

/// TWI bit-rate prescaler (the TWPS field of the status register).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Prescaler {
    Div1 = 0b00,
    Div4 = 0b01,
    Div16 = 0b10,
    Div64 = 0b11,
}

impl Prescaler {
    #[must_use]
    pub fn divider(self) -> u32 {
        match self {
            Prescaler::Div1 => 1,
            Prescaler::Div4 => 4,
            Prescaler::Div16 => 16,
            Prescaler::Div64 => 64,
        }
    }
}

/// Bus configuration consumed by the engine's `init`.
#[derive(Copy, Clone, Debug)]
pub struct I2cConfig {
    pub scl: HertzU32,
    pub prescaler: Prescaler,
    pub cpu_clock: HertzU32,
}

pub struct I2cConfigBuilder {
    scl: HertzU32,
    prescaler: Prescaler,
    cpu_clock: HertzU32,
}

impl Default for I2cConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scl: I2cSpeed::Standard.hz(),
            prescaler: Prescaler::Div1,
            // Board r1 runs the MCU from a 16 MHz crystal.
            cpu_clock: HertzU32::MHz(16),
        }
    }

    #[must_use]
    pub fn speed(mut self, speed: I2cSpeed) -> Self {
        self.scl = speed.hz();
        self
    }

    #[must_use]
    pub fn scl(mut self, scl: HertzU32) -> Self {
        self.scl = scl;
        self
    }

    #[must_use]
    pub fn prescaler(mut self, prescaler: Prescaler) -> Self {
        self.prescaler = prescaler;
        self
    }

    #[must_use]
    pub fn cpu_clock(mut self, cpu_clock: HertzU32) -> Self {
        self.cpu_clock = cpu_clock;
        self
    }

    #[must_use]
    pub fn build(self) -> I2cConfig {
        I2cConfig {
            scl: self.scl,
            prescaler: self.prescaler,
            cpu_clock: self.cpu_clock,
        }
    }
}
