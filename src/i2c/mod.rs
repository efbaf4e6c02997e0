// Licensed under the Apache-2.0 license

//! TWI (I2C) bus module.
//!
//! Layered bottom-up: [`atmega_twi`] is the register-level protocol engine
//! behind the [`atmega_twi::Instance`] seam, [`traits`] defines the role
//! and register-transaction abstractions, and [`i2c_controller`] wraps an
//! engine in the `embedded-hal` I2C interface. The `atmega328p` feature
//! binds the engine to the real TWI peripheral through the PAC.

pub mod atmega_twi;
pub mod common;
pub mod i2c_controller;
pub mod traits;

#[cfg(feature = "atmega328p")]
pub mod atmega328p;

#[cfg(test)]
pub(crate) mod testutil;
