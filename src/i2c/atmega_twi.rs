// Licensed under the Apache-2.0 license

//! ATmega328P TWI protocol engine.
//!
//! Implements the byte-level bus handshake for the megaAVR two-wire
//! interface: START/STOP conditions, the address+direction phase, data
//! bytes with per-byte acknowledge, and (with the `i2c_target` feature)
//! the peripheral role. The hardware registers are reached through the
//! [`Instance`] seam, so the engine itself carries no `unsafe` and can be
//! driven against a scripted register mock on the host.
//!
//! All operations are blocking. Controller-side handshake waits are
//! bounded by a poll budget and fail with [`Error::Timeout`] instead of
//! hanging; the peripheral-role address wait is unbounded by design, since
//! a target legitimately waits forever for a controller to address it.

use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::{BusRole, I2cConfig, Prescaler};
use crate::i2c::traits::{I2cHardwareCore, I2cMaster};
use embedded_hal::i2c::Operation;
use fugit::HertzU32;

/// Errors reported at the bus transport boundary.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Illegal status code observed on the wire.
    Bus,
    /// Lost arbitration against another controller.
    ArbitrationLoss,
    /// No device acknowledged the address phase.
    AddressNack,
    /// The addressed device refused a data byte.
    DataNack,
    /// A handshake phase did not complete within the poll budget.
    Timeout,
    /// Operation is not valid in the currently active role.
    InvalidRole,
    /// Requested clocking cannot be derived from the CPU clock.
    InvalidConfig,
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
        match self {
            Error::Bus => ErrorKind::Bus,
            Error::ArbitrationLoss => ErrorKind::ArbitrationLoss,
            Error::AddressNack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            Error::DataNack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data),
            Error::Timeout | Error::InvalidRole | Error::InvalidConfig => ErrorKind::Other,
        }
    }
}

/// TWCR control bits.
pub mod cr {
    pub const TWINT: u8 = 1 << 7;
    pub const TWEA: u8 = 1 << 6;
    pub const TWSTA: u8 = 1 << 5;
    pub const TWSTO: u8 = 1 << 4;
    pub const TWEN: u8 = 1 << 2;
}

/// TWSR status codes (prescaler bits masked off).
pub mod status {
    pub const START: u8 = 0x08;
    pub const REP_START: u8 = 0x10;
    pub const SLA_W_ACK: u8 = 0x18;
    pub const SLA_W_NACK: u8 = 0x20;
    pub const TX_DATA_ACK: u8 = 0x28;
    pub const TX_DATA_NACK: u8 = 0x30;
    pub const ARB_LOST: u8 = 0x38;
    pub const SLA_R_ACK: u8 = 0x40;
    pub const SLA_R_NACK: u8 = 0x48;
    pub const RX_DATA_ACK: u8 = 0x50;
    pub const RX_DATA_NACK: u8 = 0x58;

    pub const TGT_SLA_W: u8 = 0x60;
    pub const TGT_RX_ACK: u8 = 0x80;
    pub const TGT_RX_NACK: u8 = 0x88;
    pub const TGT_STOP: u8 = 0xA0;
    pub const TGT_SLA_R: u8 = 0xA8;
    pub const TGT_TX_ACK: u8 = 0xB8;
    pub const TGT_TX_NACK: u8 = 0xC0;
    pub const TGT_TX_LAST_ACK: u8 = 0xC8;

    pub const MASK: u8 = 0xF8;
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Direction {
    Write,
    Read,
}

/// Register seam of the TWI hardware block.
///
/// Implemented by the PAC-backed type in the `atmega328p` module and by
/// the scripted mocks in the test suite. All accesses are volatile on real
/// hardware.
pub trait Instance {
    fn twbr_write(&mut self, value: u8);
    fn twsr_read(&self) -> u8;
    /// Writes the prescaler bits (TWPS1:0) of the status register.
    fn twsr_write(&mut self, value: u8);
    fn twcr_read(&self) -> u8;
    fn twcr_write(&mut self, value: u8);
    fn twdr_read(&self) -> u8;
    fn twdr_write(&mut self, value: u8);
    fn twar_write(&mut self, value: u8);
}

/// Handshake poll budget. Generous compared to a worst-case clock-stretched
/// byte at 100 kHz on a 16 MHz core.
const DEFAULT_POLL_BUDGET: u32 = 200_000;

/// The TWI bus engine. One instance owns one physical bus; every operation
/// takes `&mut self`, so a transaction can never be interleaved with
/// another on the same bus.
pub struct AtmegaTwi<T: Instance, L: Logger = NoOpLogger> {
    twi: T,
    logger: L,
    role: Option<BusRole>,
    prescaler: Prescaler,
    cpu_clock: HertzU32,
    poll_budget: u32,
}

impl<T: Instance> AtmegaTwi<T> {
    pub fn new(twi: T) -> Self {
        Self::with_logger(twi, NoOpLogger)
    }
}

impl<T: Instance, L: Logger> AtmegaTwi<T, L> {
    pub fn with_logger(twi: T, logger: L) -> Self {
        Self {
            twi,
            logger,
            role: None,
            prescaler: Prescaler::Div1,
            cpu_clock: HertzU32::MHz(16),
            poll_budget: DEFAULT_POLL_BUDGET,
        }
    }

    /// Release the underlying register block.
    pub fn free(self) -> T {
        self.twi
    }

    fn bus_status(&self) -> u8 {
        self.twi.twsr_read() & status::MASK
    }

    /// Poll TWINT with the bounded budget.
    fn wait_handshake(&mut self) -> Result<(), Error> {
        let mut budget = self.poll_budget;
        while self.twi.twcr_read() & cr::TWINT == 0 {
            budget = budget.checked_sub(1).ok_or(Error::Timeout)?;
        }
        Ok(())
    }

    /// Transmit a START (or repeated START) condition.
    fn start(&mut self) -> Result<(), Error> {
        self.twi.twcr_write(cr::TWEN | cr::TWINT | cr::TWSTA);
        self.wait_handshake()?;
        match self.bus_status() {
            status::START | status::REP_START => Ok(()),
            status::ARB_LOST => Err(Error::ArbitrationLoss),
            _ => Err(Error::Bus),
        }
    }

    /// Transmit a STOP condition and wait for the hardware to release the
    /// bus. The wait is bounded; running out of budget here is ignored, as
    /// STOP is also the abort path and must not mask the original error.
    fn stop(&mut self) {
        self.twi.twcr_write(cr::TWEN | cr::TWINT | cr::TWSTO);
        let mut budget = self.poll_budget;
        while self.twi.twcr_read() & cr::TWSTO != 0 {
            if budget == 0 {
                return;
            }
            budget -= 1;
        }
    }

    /// Address phase: SLA+R/W with acknowledge check.
    fn sla(&mut self, addr: u8, dir: Direction) -> Result<(), Error> {
        let rw = match dir {
            Direction::Write => 0,
            Direction::Read => 1,
        };
        self.twi.twdr_write((addr << 1) | rw);
        self.twi.twcr_write(cr::TWEN | cr::TWINT);
        self.wait_handshake()?;
        match (self.bus_status(), dir) {
            (status::SLA_W_ACK, Direction::Write) | (status::SLA_R_ACK, Direction::Read) => Ok(()),
            (status::SLA_W_NACK, Direction::Write) | (status::SLA_R_NACK, Direction::Read) => {
                self.logger.log("twi: address not acknowledged");
                Err(Error::AddressNack)
            }
            (status::ARB_LOST, _) => Err(Error::ArbitrationLoss),
            _ => Err(Error::Bus),
        }
    }

    fn send_data_byte(&mut self, byte: u8) -> Result<(), Error> {
        self.twi.twdr_write(byte);
        self.twi.twcr_write(cr::TWEN | cr::TWINT);
        self.wait_handshake()?;
        match self.bus_status() {
            status::TX_DATA_ACK => Ok(()),
            status::TX_DATA_NACK => Err(Error::DataNack),
            status::ARB_LOST => Err(Error::ArbitrationLoss),
            _ => Err(Error::Bus),
        }
    }

    /// Receive one byte, acknowledging it when `ack` is set. The final
    /// byte of every read transfer must be received with `ack == false`;
    /// the non-acknowledge tells the addressed device the transfer is
    /// over, and deviating from that desynchronizes the bus.
    fn recv_data_byte(&mut self, ack: bool) -> Result<u8, Error> {
        let twea = if ack { cr::TWEA } else { 0 };
        self.twi.twcr_write(cr::TWEN | cr::TWINT | twea);
        self.wait_handshake()?;
        match (self.bus_status(), ack) {
            (status::RX_DATA_ACK, true) | (status::RX_DATA_NACK, false) => {
                Ok(self.twi.twdr_read())
            }
            (status::ARB_LOST, _) => Err(Error::ArbitrationLoss),
            _ => Err(Error::Bus),
        }
    }

    fn require_controller(&self) -> Result<(), Error> {
        match self.role {
            Some(BusRole::Controller) => Ok(()),
            _ => Err(Error::InvalidRole),
        }
    }

    /// Program prescaler and bit-rate register for the requested SCL
    /// clock and return the clock actually achieved.
    fn program_bit_rate(&mut self, scl: HertzU32) -> Result<HertzU32, Error> {
        let cpu = self.cpu_clock.raw();
        let scl = scl.raw();
        if scl == 0 {
            return Err(Error::InvalidConfig);
        }
        let cycles = cpu / scl;
        if cycles < 16 {
            return Err(Error::InvalidConfig);
        }
        let pre = self.prescaler.divider();
        let twbr = (cycles - 16) / (2 * pre);
        if twbr > u32::from(u8::MAX) {
            return Err(Error::InvalidConfig);
        }
        self.twi.twsr_write(self.prescaler as u8);
        #[allow(clippy::cast_possible_truncation)]
        self.twi.twbr_write(twbr as u8);
        Ok(HertzU32::from_raw(cpu / (16 + 2 * twbr * pre)))
    }

    fn write_transfer(&mut self, addr: u8, bytes: &[u8]) -> Result<(), Error> {
        self.sla(addr, Direction::Write)?;
        for &byte in bytes {
            self.send_data_byte(byte)?;
        }
        Ok(())
    }

    fn read_transfer(&mut self, addr: u8, buffer: &mut [u8]) -> Result<(), Error> {
        self.sla(addr, Direction::Read)?;
        let last = buffer.len().saturating_sub(1);
        for (i, slot) in buffer.iter_mut().enumerate() {
            *slot = self.recv_data_byte(i < last)?;
        }
        Ok(())
    }
}

impl<T: Instance, L: Logger> I2cHardwareCore for AtmegaTwi<T, L> {
    type Error = Error;

    fn init(&mut self, config: &I2cConfig) -> Result<HertzU32, Error> {
        if self.role == Some(BusRole::Peripheral) {
            return Err(Error::InvalidRole);
        }
        self.prescaler = config.prescaler;
        self.cpu_clock = config.cpu_clock;
        let achieved = self.program_bit_rate(config.scl)?;
        self.twi.twcr_write(cr::TWEN);
        self.role = Some(BusRole::Controller);
        self.logger.log("twi: controller role enabled");
        Ok(achieved)
    }

    fn set_frequency(&mut self, scl: HertzU32) -> Result<HertzU32, Error> {
        self.require_controller()?;
        self.program_bit_rate(scl)
    }

    fn disable(&mut self) {
        let twcr = self.twi.twcr_read();
        self.twi.twcr_write(twcr & !cr::TWEN);
        self.role = None;
    }

    fn role(&self) -> Option<BusRole> {
        self.role
    }
}

impl<T: Instance, L: Logger> I2cMaster for AtmegaTwi<T, L> {
    fn write_byte(&mut self, addr: u8, byte: u8) -> Result<(), Error> {
        self.write(addr, &[byte])
    }

    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), Error> {
        self.require_controller()?;
        self.start()?;
        let result = self.write_transfer(addr, bytes);
        self.stop();
        result
    }

    fn read_byte(&mut self, addr: u8) -> Result<u8, Error> {
        let mut byte = 0u8;
        self.read(addr, core::slice::from_mut(&mut byte))?;
        Ok(byte)
    }

    fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<(), Error> {
        self.require_controller()?;
        self.start()?;
        let result = self.read_transfer(addr, buffer);
        self.stop();
        result
    }

    fn transaction_slice(
        &mut self,
        addr: u8,
        ops_slice: &mut [Operation<'_>],
    ) -> Result<(), Error> {
        self.require_controller()?;
        if ops_slice.is_empty() {
            return Ok(());
        }
        let last_read_op = ops_slice
            .iter()
            .rposition(|op| matches!(op, Operation::Read(_)));

        self.start()?;
        let result = (|| {
            let mut current: Option<Direction> = None;
            for (index, op) in ops_slice.iter_mut().enumerate() {
                let dir = match op {
                    Operation::Write(_) => Direction::Write,
                    Operation::Read(_) => Direction::Read,
                };
                // Same-direction operations continue the open data phase;
                // a direction change needs a repeated START and a fresh
                // address phase.
                if current != Some(dir) {
                    if current.is_some() {
                        self.start()?;
                    }
                    self.sla(addr, dir)?;
                    current = Some(dir);
                }
                match op {
                    Operation::Write(bytes) => {
                        for &byte in bytes.iter() {
                            self.send_data_byte(byte)?;
                        }
                    }
                    Operation::Read(buffer) => {
                        let closing = last_read_op == Some(index);
                        let last = buffer.len().saturating_sub(1);
                        for (i, slot) in buffer.iter_mut().enumerate() {
                            *slot = self.recv_data_byte(!(closing && i == last))?;
                        }
                    }
                }
            }
            Ok(())
        })();
        self.stop();
        result
    }
}

#[cfg(feature = "i2c_target")]
mod target_impl {
    use super::{cr, status, AtmegaTwi, Direction, Error, Instance};
    use crate::common::Logger;
    use crate::i2c::common::BusRole;
    use crate::i2c::traits::target::I2cTarget;

    impl<T: Instance, L: Logger> AtmegaTwi<T, L> {
        /// Re-arm address recognition and block until this device is
        /// addressed. Unbounded by design: a target waits as long as it
        /// takes for a controller to open a transfer.
        fn wait_addressed(&mut self, dir: Direction) -> Result<(), Error> {
            self.twi.twcr_write(cr::TWEN | cr::TWEA);
            while self.twi.twcr_read() & cr::TWINT == 0 {}
            match (self.bus_status(), dir) {
                (status::TGT_SLA_W, Direction::Write) | (status::TGT_SLA_R, Direction::Read) => {
                    Ok(())
                }
                _ => Err(Error::Bus),
            }
        }

        /// Shift in one byte, acknowledging it when `ack` is set.
        fn target_accept_byte(&mut self, ack: bool) -> Result<u8, Error> {
            let twea = if ack { cr::TWEA } else { 0 };
            self.twi.twcr_write(cr::TWEN | cr::TWINT | twea);
            self.wait_handshake()?;
            match (self.bus_status(), ack) {
                (status::TGT_RX_ACK, true) | (status::TGT_RX_NACK, false) => {
                    Ok(self.twi.twdr_read())
                }
                _ => Err(Error::Bus),
            }
        }

        /// Shift out one byte; returns whether the controller wants more.
        fn target_offer_byte(&mut self, byte: u8) -> Result<bool, Error> {
            self.twi.twdr_write(byte);
            self.twi.twcr_write(cr::TWEN | cr::TWINT | cr::TWEA);
            self.wait_handshake()?;
            match self.bus_status() {
                status::TGT_TX_ACK => Ok(true),
                status::TGT_TX_NACK | status::TGT_TX_LAST_ACK => Ok(false),
                _ => Err(Error::Bus),
            }
        }
    }

    impl<T: Instance, L: Logger> I2cTarget for AtmegaTwi<T, L> {
        fn init_target(&mut self, addr: u8) -> Result<(), Error> {
            if self.role == Some(BusRole::Controller) {
                return Err(Error::InvalidRole);
            }
            self.twi.twar_write((addr & 0x7F) << 1);
            self.twi.twcr_write(cr::TWEN | cr::TWEA);
            self.role = Some(BusRole::Peripheral);
            self.logger.log("twi: peripheral role enabled");
            Ok(())
        }

        fn target_send_byte(&mut self, byte: u8) -> Result<(), Error> {
            self.target_send(&[byte])
        }

        fn target_send(&mut self, bytes: &[u8]) -> Result<(), Error> {
            self.wait_addressed(Direction::Read)?;
            for &byte in bytes {
                // Controller NACKing a byte ends the transfer early; that
                // is its call to make, not an error on our side.
                if !self.target_offer_byte(byte)? {
                    break;
                }
            }
            Ok(())
        }

        fn target_recv_byte(&mut self) -> Result<u8, Error> {
            self.wait_addressed(Direction::Write)?;
            self.target_accept_byte(true)
        }

        fn target_recv(&mut self, buffer: &mut [u8]) -> Result<(), Error> {
            if buffer.is_empty() {
                return Ok(());
            }
            self.wait_addressed(Direction::Write)?;
            let last = buffer.len() - 1;
            for (i, slot) in buffer.iter_mut().enumerate() {
                *slot = self.target_accept_byte(i < last)?;
            }
            Ok(())
        }

        fn target_recv_frame<const N: usize>(
            &mut self,
        ) -> Result<heapless::Vec<u8, N>, Error> {
            let mut frame = heapless::Vec::new();
            if N == 0 {
                return Ok(frame);
            }
            self.wait_addressed(Direction::Write)?;
            loop {
                // NACK the byte that fills the buffer, so the controller
                // learns the frame is as large as we can take.
                let ack = frame.len() + 1 < N;
                let twea = if ack { cr::TWEA } else { 0 };
                self.twi.twcr_write(cr::TWEN | cr::TWINT | twea);
                self.wait_handshake()?;
                match self.bus_status() {
                    status::TGT_RX_ACK => {
                        frame.push(self.twi.twdr_read()).map_err(|_| Error::Bus)?;
                    }
                    status::TGT_RX_NACK => {
                        frame.push(self.twi.twdr_read()).map_err(|_| Error::Bus)?;
                        return Ok(frame);
                    }
                    status::TGT_STOP => return Ok(frame),
                    _ => return Err(Error::Bus),
                }
            }
        }
    }
}
