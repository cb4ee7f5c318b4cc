// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Register access over a half-duplex, addressed bus.
//!
//! The sensor exposes a 16-bit word-addressed memory map. A read is a 2-byte big-endian address
//! write left open (no stop condition) followed immediately by a read of two bytes per word. A
//! write is a single 4-byte transfer of the address followed by the value, which this module then
//! verifies by reading the register back.

use arrayvec::ArrayVec;
use embedded_hal::blocking::i2c;
use log::{error, trace};

use crate::error::TransportError;

/// The largest single read, in bytes. This is the full 834 word frame.
pub const TRANSFER_CAPACITY: usize = 1668;

/// The size of a sensor word in bytes.
pub(crate) const WORD_SIZE: usize = (u16::BITS / u8::BITS) as usize;

/// A bus that reports how many bytes each transfer actually moved.
///
/// This mirrors the blocking API of most microcontroller SDKs, where a transfer returns a byte
/// count instead of just success or failure.
pub trait HalfDuplexBus {
    type Error;

    /// Write `bytes` to the device at `device`. When `keep_open` is set, no stop condition is sent
    /// so that a read can follow as part of the same transaction.
    fn write(&mut self, device: u8, bytes: &[u8], keep_open: bool) -> Result<usize, Self::Error>;

    /// Read into `buffer` from the device at `device`.
    fn read(&mut self, device: u8, buffer: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Adapts an `embedded-hal` I²C bus to [`HalfDuplexBus`].
///
/// `embedded-hal` has no way to leave a write open, so a continued write is held back and sent
/// with the following read as a single write-read transaction. Successful transfers always report
/// the full length.
#[derive(Clone, Debug)]
pub struct EmbeddedHalBus<I2C> {
    bus: I2C,
    pending: Option<(u8, ArrayVec<u8, WORD_SIZE>)>,
}

impl<I2C> EmbeddedHalBus<I2C> {
    pub fn new(bus: I2C) -> Self {
        Self { bus, pending: None }
    }

    /// Give the wrapped bus back.
    pub fn release(self) -> I2C {
        self.bus
    }
}

impl<I2C, E> HalfDuplexBus for EmbeddedHalBus<I2C>
where
    I2C: i2c::Write<Error = E> + i2c::WriteRead<Error = E> + i2c::Read<Error = E>,
{
    type Error = E;

    fn write(&mut self, device: u8, bytes: &[u8], keep_open: bool) -> Result<usize, E> {
        if keep_open {
            // Only a register address is ever left open, anything longer is sent as-is.
            let mut held = ArrayVec::new();
            if held.try_extend_from_slice(bytes).is_ok() {
                self.pending = Some((device, held));
                return Ok(bytes.len());
            }
        }
        self.pending = None;
        self.bus.write(device, bytes)?;
        Ok(bytes.len())
    }

    fn read(&mut self, device: u8, buffer: &mut [u8]) -> Result<usize, E> {
        match self.pending.take() {
            Some((pending_device, address)) if pending_device == device => {
                self.bus.write_read(device, &address, buffer)?
            }
            _ => self.bus.read(device, buffer)?,
        }
        Ok(buffer.len())
    }
}

/// Bounded register reads and verified register writes.
///
/// All reads go through a single scratch buffer sized to [`TRANSFER_CAPACITY`].
#[derive(Clone)]
pub struct Transport<B> {
    bus: B,
    scratch: [u8; TRANSFER_CAPACITY],
}

impl<B> core::fmt::Debug for Transport<B>
where
    B: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Transport")
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl<B: HalfDuplexBus> Transport<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            scratch: [0u8; TRANSFER_CAPACITY],
        }
    }

    /// Read `destination.len()` consecutive words starting at `start`.
    ///
    /// The size check happens before anything is put on the bus.
    pub fn read_registers(
        &mut self,
        device: u8,
        start: u16,
        destination: &mut [u16],
    ) -> Result<(), TransportError<B::Error>> {
        let byte_count = destination.len() * WORD_SIZE;
        if byte_count > TRANSFER_CAPACITY {
            error!("Requested read too big: {} bytes", byte_count);
            return Err(TransportError::Oversize {
                requested_bytes: byte_count,
            });
        }
        let command = start.to_be_bytes();
        let written = self
            .bus
            .write(device, &command, true)
            .map_err(TransportError::Bus)?;
        if written != command.len() {
            error!("Incorrect written byte count: {}", written);
            return Err(TransportError::WriteCountMismatch {
                expected: command.len(),
                actual: written,
            });
        }
        let buffer = &mut self.scratch[..byte_count];
        let read = self.bus.read(device, buffer).map_err(TransportError::Bus)?;
        if read != byte_count {
            error!("Incorrect read byte count: {}", read);
            return Err(TransportError::ReadCountMismatch {
                expected: byte_count,
                actual: read,
            });
        }
        buffer
            .chunks_exact(WORD_SIZE)
            .zip(destination.iter_mut())
            .for_each(|(bytes, word)| *word = u16::from_be_bytes([bytes[0], bytes[1]]));
        trace!("Read {} words from 0x{:04X}", destination.len(), start);
        Ok(())
    }

    /// Read a single word.
    pub fn read_register(
        &mut self,
        device: u8,
        address: u16,
    ) -> Result<u16, TransportError<B::Error>> {
        let mut word = [0u16; 1];
        self.read_registers(device, address, &mut word)?;
        Ok(word[0])
    }

    /// Write a single word, then read it back to make sure it stuck.
    pub fn write_register(
        &mut self,
        device: u8,
        address: u16,
        value: u16,
    ) -> Result<(), TransportError<B::Error>> {
        let address_bytes = address.to_be_bytes();
        let value_bytes = value.to_be_bytes();
        let payload = [
            address_bytes[0],
            address_bytes[1],
            value_bytes[0],
            value_bytes[1],
        ];
        let written = self
            .bus
            .write(device, &payload, false)
            .map_err(TransportError::Bus)?;
        if written != payload.len() {
            error!("Incorrect written byte count: {}", written);
            return Err(TransportError::WriteCountMismatch {
                expected: payload.len(),
                actual: written,
            });
        }
        let read_back = self.read_register(device, address)?;
        if read_back != value {
            return Err(TransportError::VerifyMismatch {
                expected: value,
                actual: read_back,
            });
        }
        Ok(())
    }

    /// General-call reset isn't available in this bus mode.
    pub fn reset(&mut self) -> Result<(), TransportError<B::Error>> {
        Err(TransportError::Unsupported)
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}

#[cfg(test)]
mod test {
    use crate::error::TransportError;
    use crate::test::*;

    use super::{EmbeddedHalBus, Transport, TRANSFER_CAPACITY};

    const DEVICE: u8 = 0x33;

    fn transport() -> (MockCameraBus, Transport<MockCameraBus>) {
        let mock = mock_mlx90640_at_address(DEVICE);
        let transport = Transport::new(mock.clone());
        mock.clear_recent_operations();
        (mock, transport)
    }

    #[test]
    fn oversize_read_touches_nothing() {
        let (mock, mut transport) = transport();
        // 900 words is 1800 bytes.
        let mut words = [0u16; 900];
        let res = transport.read_registers(DEVICE, 0x0400, &mut words);
        assert_eq!(
            res,
            Err(TransportError::Oversize {
                requested_bytes: 1800
            })
        );
        assert_eq!(
            mock.transaction_count(),
            0,
            "No bus transactions should happen for an oversized read"
        );
    }

    #[test]
    fn full_capacity_read_is_allowed() {
        let (mock, mut transport) = transport();
        let mut words = [0u16; TRANSFER_CAPACITY / 2];
        // 834 words from the start of RAM stays inside the mocked memory map.
        assert!(transport.read_registers(DEVICE, 0x0400, &mut words).is_ok());
        assert_eq!(mock.transaction_count(), 2);
    }

    #[test]
    fn read_is_big_endian() {
        let (mock, mut transport) = transport();
        mock.poke(0x0400, &[0x1234, 0xABCD]);
        let mut words = [0u16; 2];
        transport.read_registers(DEVICE, 0x0400, &mut words).unwrap();
        assert_eq!(words, [0x1234, 0xABCD]);
        let ops = mock.recent_operations();
        assert_eq!(
            ops.back(),
            Some(&BusOperation::Write {
                bytes: [0x04, 0x00, 0, 0],
                length: 2,
                keep_open: true
            })
        );
    }

    #[test]
    fn short_address_write() {
        let (mock, mut transport) = transport();
        mock.inject(InjectedFault::ShortWrite(1));
        let mut words = [0u16; 4];
        assert_eq!(
            transport.read_registers(DEVICE, 0x2400, &mut words),
            Err(TransportError::WriteCountMismatch {
                expected: 2,
                actual: 1
            })
        );
        // The read phase never happens.
        assert_eq!(mock.transaction_count(), 1);
    }

    #[test]
    fn short_read() {
        let (mock, mut transport) = transport();
        mock.inject(InjectedFault::ShortRead(6));
        let mut words = [0u16; 4];
        assert_eq!(
            transport.read_registers(DEVICE, 0x2400, &mut words),
            Err(TransportError::ReadCountMismatch {
                expected: 8,
                actual: 6
            })
        );
    }

    #[test]
    fn write_round_trip() {
        let (_mock, mut transport) = transport();
        transport.write_register(DEVICE, 0x800D, 0x1281).unwrap();
        let mut words = [0u16; 1];
        transport.read_registers(DEVICE, 0x800D, &mut words).unwrap();
        assert_eq!(words, [0x1281]);
    }

    #[test]
    fn write_is_verified() {
        let (mock, mut transport) = transport();
        transport.write_register(DEVICE, 0x800D, 0x1281).unwrap();
        // One write plus the two-phase verification read.
        assert_eq!(mock.transaction_count(), 3);
    }

    #[test]
    fn diverging_read_back() {
        let (mock, mut transport) = transport();
        mock.inject(InjectedFault::CorruptReadBack(0x0001));
        assert_eq!(
            transport.write_register(DEVICE, 0x800D, 0x1281),
            Err(TransportError::VerifyMismatch {
                expected: 0x1281,
                actual: 0x1280
            })
        );
    }

    #[test]
    fn short_register_write() {
        let (mock, mut transport) = transport();
        mock.inject(InjectedFault::ShortWrite(3));
        assert_eq!(
            transport.write_register(DEVICE, 0x800D, 0x1281),
            Err(TransportError::WriteCountMismatch {
                expected: 4,
                actual: 3
            })
        );
        // No verification after a failed write.
        assert_eq!(mock.transaction_count(), 1);
    }

    #[test]
    fn reset_unsupported() {
        let (mock, mut transport) = transport();
        assert_eq!(transport.reset(), Err(TransportError::Unsupported));
        assert_eq!(mock.transaction_count(), 0);
    }

    #[test]
    fn bus_errors_pass_through() {
        let (_mock, mut transport) = transport();
        let mut words = [0u16; 1];
        // Nothing lives at 0x1000 in the sensor memory map.
        let res = transport.read_registers(DEVICE, 0x1000, &mut words);
        assert!(matches!(
            res,
            Err(TransportError::Bus(MockError::UnknownMemoryAddress(0x1000)))
        ));
    }

    #[test]
    fn embedded_hal_adapter() {
        let mock = mock_mlx90640_at_address(DEVICE);
        mock.poke(0x2400, &[0x00AE, 0x499A]);
        let mut transport = Transport::new(EmbeddedHalBus::new(mock.clone()));
        mock.clear_recent_operations();
        let mut words = [0u16; 2];
        transport.read_registers(DEVICE, 0x2400, &mut words).unwrap();
        assert_eq!(words, [0x00AE, 0x499A]);
        // The address write is folded into a single write-read.
        assert_eq!(mock.transaction_count(), 1);
        transport.write_register(DEVICE, 0x800D, 0x1901).unwrap();
        assert_eq!(transport.read_register(DEVICE, 0x800D).unwrap(), 0x1901);
    }
}
