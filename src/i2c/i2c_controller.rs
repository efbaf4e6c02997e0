// Licensed under the Apache-2.0 license

//! Embedded-hal facade over a controller-role bus engine.
//!
//! Device drivers written against `embedded_hal::i2c::I2c` run unmodified
//! on top of any engine implementing [`I2cMaster`]. The facade owns the
//! engine and its configuration; construction initializes the hardware and
//! records the achieved SCL clock.

use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::I2cConfig;
use crate::i2c::traits::{I2cHardwareCore, I2cMaster};
use embedded_hal::i2c::{Operation, SevenBitAddress};
use fugit::HertzU32;

pub struct I2cController<H: I2cMaster, L: Logger = NoOpLogger> {
    pub hardware: H,
    pub config: I2cConfig,
    pub logger: L,
    achieved_scl: HertzU32,
}

impl<H: I2cMaster> I2cController<H> {
    /// Initialize `hardware` in controller role with `config`.
    ///
    /// # Errors
    ///
    /// Propagates the engine's initialization error, typically an
    /// unreachable SCL clock.
    pub fn new(hardware: H, config: I2cConfig) -> Result<Self, H::Error> {
        Self::with_logger(hardware, config, NoOpLogger)
    }
}

impl<H: I2cMaster, L: Logger> I2cController<H, L> {
    /// As [`new`](Self::new), with a logger attached.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn with_logger(
        mut hardware: H,
        config: I2cConfig,
        mut logger: L,
    ) -> Result<Self, H::Error> {
        let achieved_scl = hardware.init(&config)?;
        logger.log("i2c: controller ready");
        Ok(Self {
            hardware,
            config,
            logger,
            achieved_scl,
        })
    }

    /// SCL clock the bit-rate divider actually produces.
    pub fn achieved_scl(&self) -> HertzU32 {
        self.achieved_scl
    }

    /// Reprogram the SCL clock without re-initializing the engine.
    ///
    /// # Errors
    ///
    /// Rejected if the clock cannot be derived from the CPU clock.
    pub fn set_frequency(&mut self, scl: HertzU32) -> Result<HertzU32, H::Error> {
        self.achieved_scl = self.hardware.set_frequency(scl)?;
        self.config.scl = scl;
        Ok(self.achieved_scl)
    }

    /// Release the underlying engine.
    pub fn free(self) -> H {
        self.hardware
    }
}

impl<H: I2cMaster, L: Logger> embedded_hal::i2c::ErrorType for I2cController<H, L> {
    type Error = H::Error;
}

impl<H: I2cMaster, L: Logger> embedded_hal::i2c::I2c for I2cController<H, L> {
    fn read(&mut self, addr: SevenBitAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.hardware.read(addr, buffer)
    }

    fn write(&mut self, addr: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        self.hardware.write(addr, bytes)
    }

    fn write_read(
        &mut self,
        addr: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.hardware.transaction_slice(
            addr,
            &mut [Operation::Write(bytes), Operation::Read(buffer)],
        )
    }

    fn transaction(
        &mut self,
        addr: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.hardware.transaction_slice(addr, operations)
    }
}
