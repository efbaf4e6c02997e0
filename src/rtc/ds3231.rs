// Licensed under the Apache-2.0 license

//! DS3231 high-accuracy RTC driver.
//!
//! Covers timekeeping, both alarms, the square-wave and 32 kHz outputs,
//! the temperature sensor, aging offset, and oscillator control. All
//! multi-byte accesses lean on the device's auto-incrementing register
//! pointer; control and status updates are read-modify-write because both
//! registers pack several independent flags.
//!
//! Alarm flags (A1F/A2F) are never cleared here; the application clears
//! them after consuming an alarm event.

use crate::i2c::common::{I2cConfigBuilder, I2cSpeed};
use crate::i2c::traits::{I2cHardwareCore, I2cMaster, RegisterAccess};
use crate::rtc::bcd;

/// Fixed 7-bit bus address of the DS3231.
pub const ADDRESS: u8 = 0x68;

/// Register map offsets.
pub mod regs {
    pub const SECONDS: u8 = 0x00;
    pub const MINUTES: u8 = 0x01;
    pub const HOURS: u8 = 0x02;
    pub const DAY: u8 = 0x03;
    pub const DATE: u8 = 0x04;
    pub const MONTH: u8 = 0x05;
    pub const YEAR: u8 = 0x06;
    pub const ALARM1_SECONDS: u8 = 0x07;
    pub const ALARM1_MINUTES: u8 = 0x08;
    pub const ALARM1_HOURS: u8 = 0x09;
    pub const ALARM1_DAY: u8 = 0x0A;
    pub const ALARM2_MINUTES: u8 = 0x0B;
    pub const ALARM2_HOURS: u8 = 0x0C;
    pub const ALARM2_DAY: u8 = 0x0D;
    pub const CONTROL: u8 = 0x0E;
    pub const STATUS: u8 = 0x0F;
    pub const AGING: u8 = 0x10;
    pub const TEMP_MSB: u8 = 0x11;
    pub const TEMP_LSB: u8 = 0x12;
}

/// Control register (0x0E) bits.
pub mod control {
    /// Alarm 1 interrupt enable.
    pub const A1IE: u8 = 0x01;
    /// Alarm 2 interrupt enable.
    pub const A2IE: u8 = 0x02;
    /// Interrupt/square-wave pin control.
    pub const INTCN: u8 = 0x04;
    /// Rate select 1.
    pub const RS1: u8 = 0x08;
    /// Rate select 2.
    pub const RS2: u8 = 0x10;
    /// Force temperature conversion.
    pub const CONV: u8 = 0x20;
    /// Battery-backed square wave.
    pub const BBSQW: u8 = 0x40;
    /// Oscillator disable (active-low: clear to run).
    pub const EOSC: u8 = 0x80;

    pub const RS_MASK: u8 = RS1 | RS2;
}

/// Status register (0x0F) bits.
pub mod status {
    /// Alarm 1 fired.
    pub const A1F: u8 = 0x01;
    /// Alarm 2 fired.
    pub const A2F: u8 = 0x02;
    /// Device busy.
    pub const BSY: u8 = 0x04;
    /// 32 kHz output enable.
    pub const EN32KHZ: u8 = 0x08;
    /// Oscillator stop flag.
    pub const OSF: u8 = 0x80;
}

/// Century flag inside the month register.
const CENTURY: u8 = 0x80;
/// Don't-care flag in every alarm match register.
const ALARM_IGNORE: u8 = 0x80;
/// Day-of-week (set) versus day-of-month (clear) selector in the alarm
/// day registers.
const ALARM_DAY_SELECT: u8 = 0x40;

/// A complete date and time.
///
/// `day` is day-of-week 1-7, `date` day-of-month 1-31, `year` the full
/// year 2000-2199. Field ranges are a caller contract; out-of-range
/// values misencode silently, exactly as the device itself would treat
/// invalid BCD.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Datetime {
    pub sec: u8,
    pub min: u8,
    pub hour: u8,
    pub day: u8,
    pub date: u8,
    pub month: u8,
    pub year: u16,
}

/// Alarm 1 match condition. Fields excluded from a mode are written with
/// their don't-care bit set so the device skips them in the comparison.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Alarm1Mode {
    PerSecond,
    MatchSeconds,
    MatchMinutesSeconds,
    MatchHoursMinutesSeconds,
    MatchDateHoursMinutesSeconds,
    MatchDayHoursMinutesSeconds,
}

impl Alarm1Mode {
    /// Don't-care flags for (seconds, minutes, hours, day/date).
    fn ignored_fields(self) -> [bool; 4] {
        match self {
            Alarm1Mode::PerSecond => [true, true, true, true],
            Alarm1Mode::MatchSeconds => [false, true, true, true],
            Alarm1Mode::MatchMinutesSeconds => [false, false, true, true],
            Alarm1Mode::MatchHoursMinutesSeconds => [false, false, false, true],
            Alarm1Mode::MatchDateHoursMinutesSeconds
            | Alarm1Mode::MatchDayHoursMinutesSeconds => [false, false, false, false],
        }
    }
}

/// Alarm 2 match condition. Alarm 2 has no seconds register; it fires at
/// seconds 00 of the matching minute.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Alarm2Mode {
    PerMinute,
    MatchMinutes,
    MatchHoursMinutes,
    MatchDateHoursMinutes,
    MatchDayHoursMinutes,
}

impl Alarm2Mode {
    /// Don't-care flags for (minutes, hours, day/date).
    fn ignored_fields(self) -> [bool; 3] {
        match self {
            Alarm2Mode::PerMinute => [true, true, true],
            Alarm2Mode::MatchMinutes => [false, true, true],
            Alarm2Mode::MatchHoursMinutes => [false, false, true],
            Alarm2Mode::MatchDateHoursMinutes | Alarm2Mode::MatchDayHoursMinutes => {
                [false, false, false]
            }
        }
    }
}

/// Square-wave output rate (the RS2:RS1 field of the control register).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SqwFrequency {
    Hz1 = 0x00,
    Hz1024 = 0x08,
    Hz4096 = 0x10,
    Hz8192 = 0x18,
}

/// DS3231 driver over any controller-role bus engine.
pub struct Ds3231<B: I2cMaster> {
    bus: B,
}

impl<B: I2cMaster> Ds3231<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Release the bus engine, e.g. to hand it to another driver.
    pub fn free(self) -> B {
        self.bus
    }

    /// Bring the bus up in controller role at 400 kHz and clear the
    /// oscillator-disable bit so the clock runs on battery as well.
    ///
    /// Must be called before any other operation.
    ///
    /// # Errors
    ///
    /// Bus initialization or the control-register update may fail; see
    /// [`I2cHardwareCore::init`].
    pub fn init(&mut self) -> Result<(), B::Error> {
        let config = I2cConfigBuilder::new().speed(I2cSpeed::Fast).build();
        self.bus.init(&config)?;
        self.update_register(regs::CONTROL, |ctrl| ctrl & !control::EOSC)
    }

    /// Write all seven timekeeping registers in one transaction.
    ///
    /// The century flag is folded into the encoded month for years 2100
    /// and later. Years outside 2000-2199 misencode (caller contract).
    ///
    /// # Errors
    ///
    /// Propagated from the bus engine.
    pub fn set_time(&mut self, time: &Datetime) -> Result<(), B::Error> {
        let mut month = bcd::encode(time.month);
        if time.year >= 2100 {
            month |= CENTURY;
        }
        #[allow(clippy::cast_possible_truncation)]
        let year = bcd::encode((time.year % 100) as u8);
        let block = [
            bcd::encode(time.sec),
            bcd::encode(time.min),
            bcd::encode(time.hour),
            bcd::encode(time.day),
            bcd::encode(time.date),
            month,
            year,
        ];
        self.bus.transmit(ADDRESS, regs::SECONDS, &block)
    }

    /// Read and decode the seven timekeeping registers.
    ///
    /// # Errors
    ///
    /// Propagated from the bus engine.
    pub fn time(&mut self) -> Result<Datetime, B::Error> {
        self.bus.send(ADDRESS, regs::SECONDS)?;
        let mut raw = [0u8; 7];
        self.bus.receive(ADDRESS, &mut raw)?;
        let [sec, min, hour, day, date, month, year] = raw;
        let century = month & CENTURY != 0;
        Ok(Datetime {
            sec: bcd::decode(sec),
            min: bcd::decode(min),
            hour: bcd::decode(hour),
            day: bcd::decode(day),
            date: bcd::decode(date),
            month: bcd::decode(month & !CENTURY),
            year: u16::from(bcd::decode(year)) + if century { 2100 } else { 2000 },
        })
    }

    /// Arm alarm 1: enable its interrupt, then write the four-register
    /// match block with don't-care bits per `mode`.
    ///
    /// Day-of-week modes encode `alarm.day` with the day selector set;
    /// all other modes encode `alarm.date`.
    ///
    /// # Errors
    ///
    /// Propagated from the bus engine.
    pub fn set_alarm1(&mut self, alarm: &Datetime, mode: Alarm1Mode) -> Result<(), B::Error> {
        self.enable_alarm1()?;
        let day_or_date = match mode {
            Alarm1Mode::MatchDayHoursMinutesSeconds => bcd::encode(alarm.day) | ALARM_DAY_SELECT,
            _ => bcd::encode(alarm.date),
        };
        let mut block = [
            bcd::encode(alarm.sec),
            bcd::encode(alarm.min),
            bcd::encode(alarm.hour),
            day_or_date,
        ];
        for (slot, ignored) in block.iter_mut().zip(mode.ignored_fields()) {
            if ignored {
                *slot |= ALARM_IGNORE;
            }
        }
        self.bus.transmit(ADDRESS, regs::ALARM1_SECONDS, &block)
    }

    /// Arm alarm 2: enable its interrupt, then write the three-register
    /// match block with don't-care bits per `mode`.
    ///
    /// # Errors
    ///
    /// Propagated from the bus engine.
    pub fn set_alarm2(&mut self, alarm: &Datetime, mode: Alarm2Mode) -> Result<(), B::Error> {
        self.enable_alarm2()?;
        let day_or_date = match mode {
            Alarm2Mode::MatchDayHoursMinutes => bcd::encode(alarm.day) | ALARM_DAY_SELECT,
            _ => bcd::encode(alarm.date),
        };
        let mut block = [bcd::encode(alarm.min), bcd::encode(alarm.hour), day_or_date];
        for (slot, ignored) in block.iter_mut().zip(mode.ignored_fields()) {
            if ignored {
                *slot |= ALARM_IGNORE;
            }
        }
        self.bus.transmit(ADDRESS, regs::ALARM2_MINUTES, &block)
    }

    /// # Errors
    ///
    /// Propagated from the bus engine.
    pub fn enable_alarm1(&mut self) -> Result<(), B::Error> {
        self.update_register(regs::CONTROL, |ctrl| ctrl | control::A1IE)
    }

    /// # Errors
    ///
    /// Propagated from the bus engine.
    pub fn disable_alarm1(&mut self) -> Result<(), B::Error> {
        self.update_register(regs::CONTROL, |ctrl| ctrl & !control::A1IE)
    }

    /// # Errors
    ///
    /// Propagated from the bus engine.
    pub fn enable_alarm2(&mut self) -> Result<(), B::Error> {
        self.update_register(regs::CONTROL, |ctrl| ctrl | control::A2IE)
    }

    /// # Errors
    ///
    /// Propagated from the bus engine.
    pub fn disable_alarm2(&mut self) -> Result<(), B::Error> {
        self.update_register(regs::CONTROL, |ctrl| ctrl & !control::A2IE)
    }

    /// Read the temperature sensor: 10-bit signed value at 0.25 degC per
    /// count, updated by the device every 64 seconds.
    ///
    /// # Errors
    ///
    /// Propagated from the bus engine.
    pub fn temperature(&mut self) -> Result<f32, B::Error> {
        self.bus.send(ADDRESS, regs::TEMP_MSB)?;
        let mut raw = [0u8; 2];
        self.bus.receive(ADDRESS, &mut raw)?;
        let [msb, lsb] = raw;
        #[allow(clippy::cast_possible_wrap)]
        let counts = (i16::from(msb as i8) << 2) | i16::from(lsb >> 6);
        Ok(f32::from(counts) * 0.25)
    }

    /// Select the square-wave output rate without touching the other
    /// control bits.
    ///
    /// # Errors
    ///
    /// Propagated from the bus engine.
    pub fn set_sqw_frequency(&mut self, freq: SqwFrequency) -> Result<(), B::Error> {
        self.update_register(regs::CONTROL, |ctrl| {
            (ctrl & !control::RS_MASK) | freq as u8
        })
    }

    /// # Errors
    ///
    /// Propagated from the bus engine.
    pub fn enable_sqw(&mut self) -> Result<(), B::Error> {
        self.update_register(regs::CONTROL, |ctrl| ctrl | control::INTCN)
    }

    /// # Errors
    ///
    /// Propagated from the bus engine.
    pub fn disable_sqw(&mut self) -> Result<(), B::Error> {
        self.update_register(regs::CONTROL, |ctrl| ctrl & !control::INTCN)
    }

    /// # Errors
    ///
    /// Propagated from the bus engine.
    pub fn enable_32khz(&mut self) -> Result<(), B::Error> {
        self.update_register(regs::STATUS, |stat| stat | status::EN32KHZ)
    }

    /// # Errors
    ///
    /// Propagated from the bus engine.
    pub fn disable_32khz(&mut self) -> Result<(), B::Error> {
        self.update_register(regs::STATUS, |stat| stat & !status::EN32KHZ)
    }

    /// Clear the oscillator-disable bit (active-low: cleared means
    /// running).
    ///
    /// # Errors
    ///
    /// Propagated from the bus engine.
    pub fn enable_oscillator(&mut self) -> Result<(), B::Error> {
        self.update_register(regs::CONTROL, |ctrl| ctrl & !control::EOSC)
    }

    /// Whether the oscillator stopped at some point since the flag was
    /// last cleared (set on every cold power-up).
    ///
    /// # Errors
    ///
    /// Propagated from the bus engine.
    pub fn oscillator_stopped(&mut self) -> Result<bool, B::Error> {
        Ok(self.read_register(regs::STATUS)? & status::OSF != 0)
    }

    /// # Errors
    ///
    /// Propagated from the bus engine.
    pub fn set_aging_offset(&mut self, offset: i8) -> Result<(), B::Error> {
        self.bus.transmit(ADDRESS, regs::AGING, &[offset as u8])
    }

    /// # Errors
    ///
    /// Propagated from the bus engine.
    pub fn aging_offset(&mut self) -> Result<i8, B::Error> {
        let raw = self.read_register(regs::AGING)?;
        Ok(raw as i8)
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, B::Error> {
        self.bus.send(ADDRESS, reg)?;
        self.bus.receive_byte(ADDRESS)
    }

    fn update_register(
        &mut self,
        reg: u8,
        f: impl FnOnce(u8) -> u8,
    ) -> Result<(), B::Error> {
        let value = self.read_register(reg)?;
        self.bus.transmit(ADDRESS, reg, &[f(value)])
    }
}
