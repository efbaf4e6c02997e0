// Licensed under the Apache-2.0 license

//! Scripted TWI register mocks for host-side testing.
//!
//! [`MockTwi`] models the controller-facing behavior of the TWI block: it
//! interprets TWCR command writes, advances a bus state machine, exposes
//! status codes through TWSR, and records every wire-level event so tests
//! can assert complete transaction transcripts. The addressed device is
//! pluggable through [`TargetModel`]; [`Ds3231Model`] provides a
//! register-map simulation of the on-board RTC for end-to-end tests.
//!
//! [`MockTwiTarget`] is the mirror image: it plays back a scripted
//! external controller against the engine's peripheral role.

use super::atmega_twi::{cr, status, Instance};
use std::collections::VecDeque;
use std::vec::Vec;

/// One wire-level event observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BusEvent {
    Start,
    RepeatedStart,
    Sla { addr: u8, read: bool, acked: bool },
    Write { byte: u8, acked: bool },
    ReadAck(u8),
    ReadNack(u8),
    Stop,
}

/// Behavior of the device sitting on the mocked bus.
pub(crate) trait TargetModel {
    fn matches(&self, addr: u8) -> bool;
    /// Called when the device is addressed; `read` is the direction bit.
    fn on_addressed(&mut self, _read: bool) {}
    /// Accept one data byte; the return value is the acknowledge.
    fn write(&mut self, byte: u8) -> bool;
    fn read(&mut self) -> u8;
    fn stop(&mut self) {}
}

/// Simple scripted device: acknowledges its address, records written
/// bytes, serves queued read bytes.
pub(crate) struct ScriptDevice {
    addr: u8,
    tx: VecDeque<u8>,
    accept_limit: Option<usize>,
    pub written: Vec<u8>,
}

impl ScriptDevice {
    pub fn new(addr: u8) -> Self {
        Self {
            addr,
            tx: VecDeque::new(),
            accept_limit: None,
            written: Vec::new(),
        }
    }

    /// Queue bytes to serve on controller reads.
    pub fn serve(&mut self, bytes: &[u8]) {
        self.tx.extend(bytes.iter().copied());
    }

    /// Acknowledge at most `n` data bytes, NACK the rest.
    pub fn accept_at_most(&mut self, n: usize) {
        self.accept_limit = Some(n);
    }
}

impl TargetModel for ScriptDevice {
    fn matches(&self, addr: u8) -> bool {
        addr == self.addr
    }

    fn write(&mut self, byte: u8) -> bool {
        if let Some(limit) = self.accept_limit {
            if self.written.len() >= limit {
                return false;
            }
        }
        self.written.push(byte);
        true
    }

    fn read(&mut self) -> u8 {
        self.tx.pop_front().unwrap_or(0xFF)
    }
}

/// A bus with nothing attached; every address phase goes unanswered.
pub(crate) struct NoDevice;

impl TargetModel for NoDevice {
    fn matches(&self, _addr: u8) -> bool {
        false
    }

    fn write(&mut self, _byte: u8) -> bool {
        false
    }

    fn read(&mut self) -> u8 {
        0xFF
    }
}

/// Register-map simulation of the DS3231: 0x13 one-byte registers behind
/// an auto-incrementing pointer. The first byte of every write transfer
/// sets the pointer, exactly like the real device.
pub(crate) struct Ds3231Model {
    pub regs: [u8; 0x13],
    pointer: usize,
    expect_pointer: bool,
}

impl Ds3231Model {
    pub const ADDR: u8 = 0x68;

    pub fn new() -> Self {
        let mut regs = [0u8; 0x13];
        // Power-on defaults: INTCN plus both rate-select bits in control,
        // OSF and EN32kHz in status.
        regs[0x0E] = 0x1C;
        regs[0x0F] = 0x88;
        Self {
            regs,
            pointer: 0,
            expect_pointer: false,
        }
    }
}

impl TargetModel for Ds3231Model {
    fn matches(&self, addr: u8) -> bool {
        addr == Self::ADDR
    }

    fn on_addressed(&mut self, read: bool) {
        if !read {
            self.expect_pointer = true;
        }
    }

    fn write(&mut self, byte: u8) -> bool {
        if self.expect_pointer {
            self.pointer = usize::from(byte) % self.regs.len();
            self.expect_pointer = false;
        } else {
            self.regs[self.pointer] = byte;
            self.pointer = (self.pointer + 1) % self.regs.len();
        }
        true
    }

    fn read(&mut self) -> u8 {
        let byte = self.regs[self.pointer];
        self.pointer = (self.pointer + 1) % self.regs.len();
        byte
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum BusPhase {
    Idle,
    Addressing,
    ControllerTx,
    ControllerRx,
}

/// Controller-role register mock. Commands written to TWCR complete
/// immediately (TWINT observable on the next read) unless `hang` is set.
pub(crate) struct MockTwi<D: TargetModel> {
    pub device: D,
    pub events: Vec<BusEvent>,
    pub twbr: u8,
    pub hang: bool,
    twsr_pre: u8,
    twcr: u8,
    twdr: u8,
    bus_status: u8,
    int: bool,
    phase: BusPhase,
    in_transaction: bool,
}

impl<D: TargetModel> MockTwi<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            events: Vec::new(),
            twbr: 0,
            hang: false,
            twsr_pre: 0,
            twcr: 0,
            twdr: 0,
            bus_status: 0,
            int: false,
            phase: BusPhase::Idle,
            in_transaction: false,
        }
    }

    /// A bus that never completes a handshake.
    pub fn hung(mut self) -> Self {
        self.hang = true;
        self
    }
}

impl<D: TargetModel> Instance for MockTwi<D> {
    fn twbr_write(&mut self, value: u8) {
        self.twbr = value;
    }

    fn twsr_read(&self) -> u8 {
        self.bus_status | (self.twsr_pre & 0x03)
    }

    fn twsr_write(&mut self, value: u8) {
        self.twsr_pre = value & 0x03;
    }

    fn twcr_read(&self) -> u8 {
        let base = self.twcr & !(cr::TWINT);
        if self.int {
            base | cr::TWINT
        } else {
            base
        }
    }

    fn twcr_write(&mut self, value: u8) {
        self.twcr = value;
        if value & cr::TWEN == 0 {
            self.phase = BusPhase::Idle;
            self.in_transaction = false;
            self.int = false;
            return;
        }
        if self.hang {
            self.int = false;
            return;
        }
        if value & cr::TWINT == 0 {
            // Plain enable, nothing commanded.
            return;
        }
        if value & cr::TWSTA != 0 {
            self.events.push(if self.in_transaction {
                BusEvent::RepeatedStart
            } else {
                BusEvent::Start
            });
            self.bus_status = if self.in_transaction {
                status::REP_START
            } else {
                status::START
            };
            self.in_transaction = true;
            self.phase = BusPhase::Addressing;
            self.int = true;
            return;
        }
        if value & cr::TWSTO != 0 {
            self.events.push(BusEvent::Stop);
            self.device.stop();
            self.phase = BusPhase::Idle;
            self.in_transaction = false;
            self.twcr = value & !cr::TWSTO;
            self.int = false;
            return;
        }
        match self.phase {
            BusPhase::Addressing => {
                let addr = self.twdr >> 1;
                let read = self.twdr & 1 != 0;
                let acked = self.device.matches(addr);
                self.events.push(BusEvent::Sla { addr, read, acked });
                if acked {
                    self.device.on_addressed(read);
                }
                self.bus_status = match (read, acked) {
                    (false, true) => status::SLA_W_ACK,
                    (false, false) => status::SLA_W_NACK,
                    (true, true) => status::SLA_R_ACK,
                    (true, false) => status::SLA_R_NACK,
                };
                self.phase = match (read, acked) {
                    (false, true) => BusPhase::ControllerTx,
                    (true, true) => BusPhase::ControllerRx,
                    _ => BusPhase::Idle,
                };
                self.int = true;
            }
            BusPhase::ControllerTx => {
                let byte = self.twdr;
                let acked = self.device.write(byte);
                self.events.push(BusEvent::Write { byte, acked });
                self.bus_status = if acked {
                    status::TX_DATA_ACK
                } else {
                    status::TX_DATA_NACK
                };
                self.int = true;
            }
            BusPhase::ControllerRx => {
                let ack = value & cr::TWEA != 0;
                let byte = self.device.read();
                self.twdr = byte;
                self.events.push(if ack {
                    BusEvent::ReadAck(byte)
                } else {
                    BusEvent::ReadNack(byte)
                });
                self.bus_status = if ack {
                    status::RX_DATA_ACK
                } else {
                    status::RX_DATA_NACK
                };
                self.int = true;
            }
            BusPhase::Idle => {
                // Command with nothing on the wire; engine will see an
                // illegal status and report a bus error.
                self.bus_status = 0;
                self.int = true;
            }
        }
    }

    fn twdr_read(&self) -> u8 {
        self.twdr
    }

    fn twdr_write(&mut self, value: u8) {
        self.twdr = value;
    }

    fn twar_write(&mut self, _value: u8) {}
}

/// Scripted actions an external controller performs against the engine's
/// peripheral role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CtrlAction {
    AddressWrite,
    AddressRead,
    SendByte(u8),
    ReadAck,
    ReadNack,
    Stop,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum TargetPhase {
    Unaddressed,
    ControllerWriting,
    ControllerReading,
}

/// Peripheral-role register mock driven by a controller script.
pub(crate) struct MockTwiTarget {
    script: VecDeque<CtrlAction>,
    /// Bytes the engine shifted out toward the scripted controller.
    pub sent: Vec<u8>,
    /// Acknowledge decision the engine armed for each received byte.
    pub acks: Vec<bool>,
    pub twar: u8,
    pub twbr: u8,
    twsr_pre: u8,
    twcr: u8,
    twdr: u8,
    bus_status: u8,
    int: bool,
    phase: TargetPhase,
}

impl MockTwiTarget {
    pub fn new(script: Vec<CtrlAction>) -> Self {
        Self {
            script: script.into_iter().collect(),
            sent: Vec::new(),
            acks: Vec::new(),
            twar: 0,
            twbr: 0,
            twsr_pre: 0,
            twcr: 0,
            twdr: 0,
            bus_status: 0,
            int: false,
            phase: TargetPhase::Unaddressed,
        }
    }

    fn accept_address(&mut self) {
        match self.script.front() {
            Some(CtrlAction::AddressWrite) => {
                self.script.pop_front();
                self.bus_status = status::TGT_SLA_W;
                self.phase = TargetPhase::ControllerWriting;
                self.int = true;
            }
            Some(CtrlAction::AddressRead) => {
                self.script.pop_front();
                self.bus_status = status::TGT_SLA_R;
                self.phase = TargetPhase::ControllerReading;
                self.int = true;
            }
            _ => {}
        }
    }
}

impl Instance for MockTwiTarget {
    fn twbr_write(&mut self, value: u8) {
        self.twbr = value;
    }

    fn twsr_read(&self) -> u8 {
        self.bus_status | (self.twsr_pre & 0x03)
    }

    fn twsr_write(&mut self, value: u8) {
        self.twsr_pre = value & 0x03;
    }

    fn twcr_read(&self) -> u8 {
        let base = self.twcr & !(cr::TWINT);
        if self.int {
            base | cr::TWINT
        } else {
            base
        }
    }

    fn twcr_write(&mut self, value: u8) {
        self.twcr = value;
        if value & cr::TWEN == 0 {
            self.phase = TargetPhase::Unaddressed;
            self.int = false;
            return;
        }
        if value & cr::TWINT == 0 {
            // Address-recognition arm; answer if the script has a
            // controller waiting to address us.
            if value & cr::TWEA != 0 && self.phase == TargetPhase::Unaddressed {
                self.accept_address();
            }
            return;
        }
        match self.phase {
            TargetPhase::Unaddressed => {
                self.bus_status = 0;
                self.int = true;
            }
            TargetPhase::ControllerWriting => {
                let ack = value & cr::TWEA != 0;
                self.acks.push(ack);
                match self.script.pop_front() {
                    Some(CtrlAction::SendByte(byte)) => {
                        self.twdr = byte;
                        self.bus_status = if ack {
                            status::TGT_RX_ACK
                        } else {
                            status::TGT_RX_NACK
                        };
                    }
                    Some(CtrlAction::Stop) => {
                        self.bus_status = status::TGT_STOP;
                        self.phase = TargetPhase::Unaddressed;
                    }
                    _ => self.bus_status = 0,
                }
                self.int = true;
            }
            TargetPhase::ControllerReading => {
                self.sent.push(self.twdr);
                match self.script.pop_front() {
                    Some(CtrlAction::ReadAck) => self.bus_status = status::TGT_TX_ACK,
                    Some(CtrlAction::ReadNack) => {
                        self.bus_status = status::TGT_TX_NACK;
                        self.phase = TargetPhase::Unaddressed;
                    }
                    _ => self.bus_status = 0,
                }
                self.int = true;
            }
        }
    }

    fn twdr_read(&self) -> u8 {
        self.twdr
    }

    fn twdr_write(&mut self, value: u8) {
        self.twdr = value;
    }

    fn twar_write(&mut self, value: u8) {
        self.twar = value;
    }
}
