// Licensed under the Apache-2.0 license

//! On-board DS3231 real-time clock.
//!
//! The driver is generic over [`I2cMaster`](crate::i2c::traits::I2cMaster)
//! and speaks only the register-pointer idioms of
//! [`RegisterAccess`](crate::i2c::traits::RegisterAccess), so it runs
//! against the real TWI engine on the board and against the register-model
//! mock in the test suite.

pub mod bcd;
pub mod ds3231;

pub use ds3231::{Alarm1Mode, Alarm2Mode, Datetime, Ds3231, SqwFrequency};
