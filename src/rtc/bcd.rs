// Licensed under the Apache-2.0 license

//! Binary-coded-decimal codec for the RTC register map.
//!
//! The DS3231 stores every time and date field as packed BCD: one decimal
//! digit per nibble. Both directions are total functions on `u8`; callers
//! are responsible for staying inside 0-99, values beyond that misencode
//! rather than fail (matching the device's own behavior when fed garbage).

/// Pack a binary value 0-99 into BCD.
#[must_use]
pub fn encode(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Unpack a BCD byte into its binary value.
#[must_use]
pub fn decode(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0F)
}
