// Licensed under the Apache-2.0 license

//! # TWI Hardware Abstraction Traits
//!
//! Composable traits for the TWI bus engine. Each trait has a single
//! responsibility and can be combined to build complete bus functionality:
//!
//! ```text
//! I2cHardwareCore (init, clocking, role)
//!     ├── I2cMaster (controller-role transfers)
//!     │       └── RegisterAccess (register-pointer transaction idioms,
//!     │                           blanket-implemented)
//!     └── target module (feature: i2c_target)
//!             └── I2cTarget (peripheral-role transfers)
//! ```
//!
//! Device drivers are written against [`I2cMaster`] (plus the blanket
//! [`RegisterAccess`] convenience layer), never against a concrete engine,
//! so they can be exercised on the host with a mock bus.

use crate::i2c::common::{BusRole, I2cConfig};
use embedded_hal::i2c::Operation;
use fugit::HertzU32;

/// Foundation trait every TWI engine implementation provides.
pub trait I2cHardwareCore {
    /// Hardware-specific error type, compatible with embedded-hal.
    type Error: embedded_hal::i2c::Error + core::fmt::Debug;

    /// Initialize the engine in controller role.
    ///
    /// Programs the bit-rate divider for the requested SCL clock and
    /// enables the engine. The achieved frequency is returned; it is
    /// derived by integer division and callers must not assume
    /// sub-percent accuracy.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested clock cannot be derived from the
    /// configured CPU clock with the configured prescaler.
    fn init(&mut self, config: &I2cConfig) -> Result<HertzU32, Self::Error>;

    /// Recompute the bit-rate divider for a new SCL clock.
    ///
    /// # Errors
    ///
    /// Effective only in controller role; in peripheral role the request
    /// is rejected with an `InvalidRole` error. Divider range errors are
    /// reported as in [`init`](Self::init).
    fn set_frequency(&mut self, scl: HertzU32) -> Result<HertzU32, Self::Error>;

    /// Disable the engine and release the bus lines. Idempotent.
    fn disable(&mut self);

    /// Currently active role, or `None` before initialization.
    fn role(&self) -> Option<BusRole>;
}

/// Controller-role bus transfers.
///
/// Every operation is one atomic bus transaction: it begins with a START
/// condition and ends with a STOP condition, and no other operation may
/// interleave on the same engine while one is in flight (enforced by
/// `&mut self`).
pub trait I2cMaster: I2cHardwareCore {
    /// Transmit a single byte: START, SLA+W, byte, STOP.
    ///
    /// # Errors
    ///
    /// `AddressNack` if no device answers the address phase, `DataNack`
    /// if the device refuses the byte, `Timeout` if the bus never
    /// completes a handshake phase.
    fn write_byte(&mut self, addr: u8, byte: u8) -> Result<(), Self::Error>;

    /// Transmit a buffer: START, SLA+W, data bytes, STOP.
    ///
    /// # Errors
    ///
    /// See [`write_byte`](Self::write_byte).
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Receive a single byte: START, SLA+R, byte (NACKed), STOP.
    ///
    /// The sole byte of the transfer is non-acknowledged, the protocol
    /// signal for "last byte" to the addressed device.
    ///
    /// # Errors
    ///
    /// See [`write_byte`](Self::write_byte).
    fn read_byte(&mut self, addr: u8) -> Result<u8, Self::Error>;

    /// Receive a buffer: START, SLA+R, data bytes, STOP.
    ///
    /// Every byte is acknowledged except the last, which is NACKed so the
    /// addressed device stops driving the data line.
    ///
    /// # Errors
    ///
    /// See [`write_byte`](Self::write_byte).
    fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Execute a sequence of operations as one atomic bus transaction.
    ///
    /// Consecutive operations of the same direction continue the current
    /// data phase; a direction change issues a repeated START. The final
    /// byte of the last read operation is NACKed.
    ///
    /// # Errors
    ///
    /// See [`write_byte`](Self::write_byte). The transaction is aborted
    /// (STOP issued) on the first failing phase.
    fn transaction_slice(
        &mut self,
        addr: u8,
        ops_slice: &mut [Operation<'_>],
    ) -> Result<(), Self::Error>;
}

/// Register-pointer transaction idioms shared by register-mapped devices.
///
/// Most devices on the bus follow the same two-phase protocol: the
/// controller writes a register pointer byte, then either keeps writing
/// data (the pointer auto-increments on the device side) or issues a new
/// transaction to read back from the pointer onward. This layer holds no
/// state; it is purely a composition of [`I2cMaster`] calls and is
/// blanket-implemented for every engine.
pub trait RegisterAccess: I2cMaster {
    /// One-shot single-byte write, typically setting the register pointer.
    ///
    /// # Errors
    ///
    /// Propagated unchanged from the bus engine.
    fn send(&mut self, addr: u8, byte: u8) -> Result<(), Self::Error> {
        self.write_byte(addr, byte)
    }

    /// Register pointer byte followed by payload, in one bus transaction.
    ///
    /// # Errors
    ///
    /// Propagated unchanged from the bus engine.
    fn transmit(&mut self, addr: u8, reg: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.transaction_slice(
            addr,
            &mut [Operation::Write(&[reg]), Operation::Write(data)],
        )
    }

    /// Read one byte from the current register pointer position.
    ///
    /// Assumes a prior [`send`](Self::send) positioned the pointer.
    ///
    /// # Errors
    ///
    /// Propagated unchanged from the bus engine.
    fn receive_byte(&mut self, addr: u8) -> Result<u8, Self::Error> {
        self.read_byte(addr)
    }

    /// Read a register block from the current pointer position.
    ///
    /// Assumes a prior [`send`](Self::send) positioned the pointer.
    ///
    /// # Errors
    ///
    /// Propagated unchanged from the bus engine.
    fn receive(&mut self, addr: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.read(addr, buffer)
    }
}

impl<T: I2cMaster> RegisterAccess for T {}

/// Peripheral (target) role functionality, compiled only with the
/// `i2c_target` feature to match the deployments that use it.
#[cfg(feature = "i2c_target")]
pub mod target {
    use super::I2cHardwareCore;

    /// Peripheral-role bus transfers.
    ///
    /// These operations manage no START/STOP conditions of their own; they
    /// wait to be addressed by an external controller. The address wait is
    /// unbounded by design (see the concurrency notes in the crate docs);
    /// once addressed, the data phases use the same bounded handshake
    /// waits as the controller role.
    pub trait I2cTarget: I2cHardwareCore {
        /// Initialize the engine in peripheral role, recognizing `addr`.
        ///
        /// The address must be unique on the shared bus; uniqueness is an
        /// integrator obligation, not enforced here.
        ///
        /// # Errors
        ///
        /// Hardware-specific.
        fn init_target(&mut self, addr: u8) -> Result<(), Self::Error>;

        /// Block until addressed for a read, then shift out one byte.
        ///
        /// # Errors
        ///
        /// `Timeout` if a data-phase handshake never completes, `Bus` on a
        /// protocol violation.
        fn target_send_byte(&mut self, byte: u8) -> Result<(), Self::Error>;

        /// Block until addressed for a read, then shift out the buffer.
        ///
        /// # Errors
        ///
        /// See [`target_send_byte`](Self::target_send_byte). Transmission
        /// ends early without error if the controller NACKs a byte.
        fn target_send(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

        /// Block until addressed for a write, then shift in one byte.
        ///
        /// # Errors
        ///
        /// See [`target_send_byte`](Self::target_send_byte).
        fn target_recv_byte(&mut self) -> Result<u8, Self::Error>;

        /// Block until addressed for a write, then fill the buffer,
        /// acknowledging all but the final byte.
        ///
        /// # Errors
        ///
        /// See [`target_send_byte`](Self::target_send_byte).
        fn target_recv(&mut self, buffer: &mut [u8]) -> Result<(), Self::Error>;

        /// Block until addressed for a write, then receive until the
        /// controller ends the transfer or `N` bytes have arrived (the
        /// `N`th byte is NACKed to signal that the buffer is full).
        ///
        /// Unlike [`target_recv`](Self::target_recv) this does not require
        /// the transfer length to be known up front.
        ///
        /// # Errors
        ///
        /// See [`target_send_byte`](Self::target_send_byte).
        fn target_recv_frame<const N: usize>(
            &mut self,
        ) -> Result<heapless::Vec<u8, N>, Self::Error>;
    }
}
