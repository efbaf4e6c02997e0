// Licensed under the Apache-2.0 license

//! Driver development kit for the uc-MicroLab expansion board.
//!
//! The board carries a single TWI (I2C) bus shared by the on-board DS3231
//! real-time clock and any expansion peripherals. This crate provides the
//! blocking TWI protocol engine for both controller and peripheral roles,
//! a small register-transaction layer on top of it, and the DS3231 driver
//! built from that layer.

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::indexing_slicing))]
#![cfg_attr(not(test), warn(clippy::expect_used))]
#![cfg_attr(not(test), no_std)]

pub mod common;
pub mod i2c;
pub mod rtc;
