//! Fakes shared by the unit tests.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use embedded_hal::i2c::{ErrorKind, ErrorType, NoAcknowledgeSource, Operation};

use crate::touchpad::blocking::TouchSensor;
use crate::touchpad::TouchMask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorFault;

/// Sensor replaying a fixed sequence of raw touch masks.
///
/// The last mask repeats once the script runs out.
#[derive(Debug)]
pub struct ScriptedSensor {
    script: VecDeque<u16>,
    last: u16,
    pub present: bool,
    pub fail_reads: bool,
    pub begun: Vec<u8>,
    pub reads: usize,
}

impl ScriptedSensor {
    pub fn new(script: &[u16]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            last: 0,
            present: true,
            fail_reads: false,
            begun: Vec::new(),
            reads: 0,
        }
    }

    pub fn absent() -> Self {
        Self {
            present: false,
            ..Self::new(&[])
        }
    }

    pub fn try_begin(&mut self, address: u8) -> Result<(), SensorFault> {
        if !self.present {
            return Err(SensorFault);
        }
        self.begun.push(address);
        Ok(())
    }

    pub fn next_mask(&mut self) -> Result<TouchMask, SensorFault> {
        if self.fail_reads {
            return Err(SensorFault);
        }
        self.reads += 1;
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        Ok(TouchMask::from_bits_truncate(self.last))
    }
}

impl TouchSensor for ScriptedSensor {
    type Error = SensorFault;

    fn begin(&mut self, address: u8) -> Result<(), SensorFault> {
        self.try_begin(address)
    }

    fn touched(&mut self) -> Result<TouchMask, SensorFault> {
        self.next_mask()
    }
}

#[cfg(feature = "async")]
impl crate::touchpad::asynch::TouchSensor for ScriptedSensor {
    type Error = SensorFault;

    async fn begin(&mut self, address: u8) -> Result<(), SensorFault> {
        self.try_begin(address)
    }

    async fn touched(&mut self) -> Result<TouchMask, SensorFault> {
        self.next_mask()
    }
}

/// Delay that only records how long it was asked to wait.
#[derive(Debug, Default)]
pub struct FakeDelay {
    total_ns: u64,
}

impl FakeDelay {
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl embedded_hal::delay::DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ns += u64::from(ms) * 1_000_000;
    }
}

#[cfg(feature = "async")]
impl embedded_hal_async::delay::DelayNs for FakeDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.total_ns += u64::from(ms) * 1_000_000;
    }
}

/// Register file of an I2C device at a single address.
///
/// A write sets the register pointer from its first byte and stores the rest
/// at consecutive registers; reads continue from the pointer.
#[derive(Debug)]
pub struct FakeI2c {
    pub address: u8,
    pub registers: [u8; 256],
    pub writes: Vec<(u8, u8)>,
    pointer: u8,
}

impl FakeI2c {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            registers: [0; 256],
            writes: Vec::new(),
            pointer: 0,
        }
    }

    /// Last value written to `register`, ignoring reads.
    pub fn written(&self, register: u8) -> Option<u8> {
        self.writes
            .iter()
            .rev()
            .find(|(reg, _)| *reg == register)
            .map(|(_, value)| *value)
    }

    fn run(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), ErrorKind> {
        if address != self.address {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    if let Some((&register, values)) = bytes.split_first() {
                        self.pointer = register;
                        for value in values {
                            self.registers[usize::from(self.pointer)] = *value;
                            self.writes.push((self.pointer, *value));
                            self.pointer = self.pointer.wrapping_add(1);
                        }
                    }
                }
                Operation::Read(buffer) => {
                    for byte in buffer.iter_mut() {
                        *byte = self.registers[usize::from(self.pointer)];
                        self.pointer = self.pointer.wrapping_add(1);
                    }
                }
            }
        }
        Ok(())
    }
}

impl ErrorType for FakeI2c {
    type Error = ErrorKind;
}

impl embedded_hal::i2c::I2c for FakeI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.run(address, operations)
    }
}

#[cfg(feature = "async")]
impl embedded_hal_async::i2c::I2c for FakeI2c {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.run(address, operations)
    }
}
