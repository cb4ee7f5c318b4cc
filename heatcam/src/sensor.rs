// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Register-level control of the MLX90640 sensor.

use log::{debug, warn};
use paste::paste;

use crate::error::{SensorError, TransportError};
use crate::frame::{EepromDump, RawFrame, CONTROL_WORD_INDEX, NUM_PIXELS, SENSOR_COLUMNS};
use crate::frame::{SENSOR_ROWS, SUBPAGE_WORD_INDEX};
use crate::register::*;
use crate::transport::{HalfDuplexBus, Transport};
use crate::util::micros_between;

/// Start of the calibration EEPROM.
pub const EEPROM_BASE_ADDRESS: u16 = 0x2400;

/// Start of the pixel data in RAM.
pub const RAM_BASE_ADDRESS: u16 = 0x0400;

/// Start of the auxiliary (non-pixel) data in RAM.
pub const AUXILIARY_BASE_ADDRESS: u16 = 0x0700;

/// Number of auxiliary words following the pixels.
pub const AUXILIARY_WORDS: usize = 64;

/// The value the sensor leaves in RAM locations that haven't been measured.
const NO_DATA: u16 = 0x7FFF;

/// Auxiliary words that carry measurements. The rest are reserved and not checked.
const VALIDATED_AUXILIARY_WORDS: [core::ops::Range<usize>; 7] =
    [0..1, 8..19, 20..23, 24..33, 40..51, 52..55, 56..64];

/// DRY macro for the set_* methods in `Mlx90640` that modify a register field.
macro_rules! set_register_field {
    { $register_access:ident, $field:ident, $typ:ty, $doc:literal } => {
    paste! {
        #[doc = $doc]
        pub fn [< set_ $field >](
            &mut self,
            new_value: $typ,
        ) -> Result<(), TransportError<B::Error>> {
            let mut current = self.$register_access()?;
            if current.$field() != new_value {
                current.[< set_ $field >](new_value);
                self.[< set_ $register_access >](current)
            } else {
                Ok(())
            }
        }
    }};
}

/// An MLX90640 at a fixed bus address.
#[derive(Clone, Debug)]
pub struct Mlx90640<B> {
    transport: Transport<B>,

    /// The I²C address this camera is accessible at.
    address: u8,
}

impl<B: HalfDuplexBus> Mlx90640<B> {
    pub fn new(bus: B, address: u8) -> Self {
        Self {
            transport: Transport::new(bus),
            address,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn transport_mut(&mut self) -> &mut Transport<B> {
        &mut self.transport
    }

    fn read_register<R: Register>(&mut self) -> Result<R, TransportError<B::Error>> {
        let raw = self.transport.read_register(self.address, R::address())?;
        Ok(R::from(raw))
    }

    fn write_register<R: Register>(&mut self, register: R) -> Result<(), TransportError<B::Error>> {
        self.transport
            .write_register(self.address, R::address(), register.into())
    }

    pub fn status_register(&mut self) -> Result<StatusRegister, TransportError<B::Error>> {
        self.read_register()
    }

    pub fn control_register(&mut self) -> Result<ControlRegister, TransportError<B::Error>> {
        self.read_register()
    }

    pub fn set_control_register(
        &mut self,
        register: ControlRegister,
    ) -> Result<(), TransportError<B::Error>> {
        self.write_register(register)
    }

    set_register_field! {
        control_register,
        sample_rate,
        SampleRate,
        "Set the sensor's sample (refresh) rate."
    }

    set_register_field! {
        control_register,
        access_pattern,
        AccessPattern,
        "Set the pattern used to split pixels between subpages."
    }

    /// Switch to the chess board access pattern.
    pub fn set_chess_mode(&mut self) -> Result<(), TransportError<B::Error>> {
        self.set_access_pattern(AccessPattern::Chess)
    }

    /// Copy the whole calibration EEPROM.
    pub fn dump_eeprom(
        &mut self,
        destination: &mut EepromDump,
    ) -> Result<(), TransportError<B::Error>> {
        self.transport
            .read_registers(self.address, EEPROM_BASE_ADDRESS, &mut destination[..])
    }

    /// Wait for the next subpage, then copy it into `frame`.
    ///
    /// The status register is polled until new data shows up, giving up with
    /// [`SensorError::DataNotReady`] once `timeout_us` has passed on the `now` clock (in
    /// microseconds). The frame ends with the control register and the measured subpage. The status
    /// register is acknowledged (which also starts the next measurement) before RAM is read.
    pub fn fetch_frame<T>(
        &mut self,
        frame: &mut RawFrame,
        mut now: T,
        timeout_us: u32,
    ) -> Result<Subpage, SensorError<B::Error>>
    where
        T: FnMut() -> u64,
    {
        let started_at = now();
        let mut status = self.status_register()?;
        let mut polls = 1;
        while !status.new_data() {
            if micros_between(started_at, now()) >= timeout_us {
                return Err(SensorError::DataNotReady);
            }
            status = self.status_register()?;
            polls += 1;
        }
        debug!(
            "Subpage {:?} ready after {} polls",
            status.last_updated_subpage(),
            polls
        );
        match self.write_register(StatusRegister::acknowledge()) {
            // The subpage bits are read-only, so the read back rarely matches exactly.
            Err(TransportError::VerifyMismatch { expected, actual }) => {
                if (expected ^ actual) & StatusRegister::write_mask() != 0 {
                    warn!(
                        "Status register read back 0x{:04X} after writing 0x{:04X}",
                        actual, expected
                    );
                }
            }
            Err(err) => return Err(err.into()),
            Ok(()) => (),
        }
        let words = frame.words_mut();
        self.transport
            .read_registers(self.address, RAM_BASE_ADDRESS, &mut words[..NUM_PIXELS])?;
        self.transport.read_registers(
            self.address,
            AUXILIARY_BASE_ADDRESS,
            &mut words[NUM_PIXELS..NUM_PIXELS + AUXILIARY_WORDS],
        )?;
        let control = self.control_register()?;
        let subpage = status.last_updated_subpage();
        words[CONTROL_WORD_INDEX] = control.into();
        words[SUBPAGE_WORD_INDEX] = subpage.into();
        validate_frame(frame, subpage)?;
        Ok(subpage)
    }
}

/// Reject frames with the "no data" marker where a measurement is expected.
fn validate_frame<E>(frame: &RawFrame, subpage: Subpage) -> Result<(), SensorError<E>> {
    let auxiliary = frame.auxiliary();
    let aux_invalid = VALIDATED_AUXILIARY_WORDS
        .iter()
        .cloned()
        .flatten()
        .any(|index| auxiliary[index] == NO_DATA);
    // The first pixel of each row belonging to the measured subpage.
    let subpage_row = u16::from(subpage) as usize;
    let pixels_invalid = (0..SENSOR_ROWS)
        .filter(|row| row % 2 == subpage_row)
        .any(|row| frame.pixels()[row * SENSOR_COLUMNS] == NO_DATA);
    if aux_invalid || pixels_invalid {
        Err(SensorError::CorruptFrame)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use core::cell::Cell;

    use crate::error::{SensorError, TransportError};
    use crate::frame::{RawFrame, EEPROM_WORDS, NUM_PIXELS};
    use crate::register::{AccessPattern, SampleRate, Subpage};
    use crate::test::*;

    use super::Mlx90640;

    const TIMEOUT_US: u32 = 125_000;

    /// A clock that never moves.
    fn frozen() -> u64 {
        0
    }

    // Non-default address, so nothing quietly assumes 0x33.
    const ADDRESS: u8 = 0x30;

    fn create() -> (MockCameraBus, Mlx90640<MockCameraBus>) {
        let mock = mock_mlx90640_at_address(ADDRESS);
        let sensor = Mlx90640::new(mock.clone(), ADDRESS);
        mock.clear_recent_operations();
        (mock, sensor)
    }

    #[test]
    fn set_sample_rate() {
        let (mock, mut sensor) = create();
        sensor.set_sample_rate(SampleRate::Sixteen).unwrap();
        assert_eq!(mock.peek(0x800D), 0x1A81);
        assert_eq!(
            sensor.control_register().unwrap().sample_rate(),
            SampleRate::Sixteen
        );
    }

    #[test]
    fn unchanged_field_skips_write() {
        let (mock, mut sensor) = create();
        // The mock starts out in chess mode.
        sensor.set_chess_mode().unwrap();
        assert_eq!(
            mock.transaction_count(),
            2,
            "Only the control register read should happen"
        );
    }

    #[test]
    fn set_interleave_then_chess() {
        let (mock, mut sensor) = create();
        sensor.set_access_pattern(AccessPattern::Interleave).unwrap();
        assert_eq!(mock.peek(0x800D), 0x0901);
        sensor.set_chess_mode().unwrap();
        assert_eq!(mock.peek(0x800D), 0x1901);
    }

    #[test]
    fn dump_eeprom() {
        let (mock, mut sensor) = create();
        let mut eeprom = [0u16; EEPROM_WORDS];
        sensor.dump_eeprom(&mut eeprom).unwrap();
        assert_eq!(&eeprom[..], &heatcam_test_data::eeprom_words()[..]);
        assert_eq!(mock.transaction_count(), 2);
    }

    #[test]
    fn fetch_frame() {
        let (_mock, mut sensor) = create();
        let mut frame = RawFrame::new();
        let subpage = sensor.fetch_frame(&mut frame, frozen, TIMEOUT_US).unwrap();
        // The mock starts with subpage 1 measured and new data ready.
        assert_eq!(subpage, Subpage::One);
        assert_eq!(frame.subpage(), 1);
        assert_eq!(frame.control_word(), 0x1901);
        assert_eq!(
            &frame.pixels()[..],
            &heatcam_test_data::ramp_frame_words()[..NUM_PIXELS]
        );
        // Acknowledging starts the next measurement, which flips the subpage.
        assert_eq!(sensor.fetch_frame(&mut frame, frozen, TIMEOUT_US).unwrap(), Subpage::Zero);
    }

    #[test]
    fn fetch_frame_waits_for_data() {
        let (mock, mut sensor) = create();
        mock.set_data_available(false);
        mock.make_ready_after(3);
        let mut frame = RawFrame::new();
        assert!(sensor.fetch_frame(&mut frame, frozen, TIMEOUT_US).is_ok());
    }

    #[test]
    fn fetch_frame_waits_through_many_polls() {
        let (mock, mut sensor) = create();
        mock.set_data_available(false);
        mock.make_ready_after(5000);
        let mut frame = RawFrame::new();
        assert!(sensor.fetch_frame(&mut frame, frozen, TIMEOUT_US).is_ok());
    }

    #[test]
    fn fetch_frame_gives_up_after_timeout() {
        let (mock, mut sensor) = create();
        mock.set_data_available(false);
        let mut frame = RawFrame::new();
        let ticks = Cell::new(0u64);
        // Every look at the clock is another 10ms.
        let clock = || {
            ticks.set(ticks.get() + 10_000);
            ticks.get()
        };
        assert_eq!(
            sensor.fetch_frame(&mut frame, clock, TIMEOUT_US),
            Err(SensorError::DataNotReady)
        );
        // The first clock reading is the start, the 14th is past 125ms.
        assert_eq!(ticks.get(), 140_000);
        assert_eq!(mock.transaction_count(), 13 * 2);
    }

    #[test]
    fn fetch_frame_rejects_missing_pixels() {
        let (mock, mut sensor) = create();
        // Row 1 belongs to subpage 1 in chess mode.
        mock.poke(0x0400 + 32, &[0x7FFF]);
        let mut frame = RawFrame::new();
        assert_eq!(
            sensor.fetch_frame(&mut frame, frozen, TIMEOUT_US),
            Err(SensorError::CorruptFrame)
        );
    }

    #[test]
    fn fetch_frame_ignores_other_subpage_rows() {
        let (mock, mut sensor) = create();
        // Row 0 belongs to subpage 0, and subpage 1 is the one being read.
        mock.poke(0x0400, &[0x7FFF]);
        let mut frame = RawFrame::new();
        assert!(sensor.fetch_frame(&mut frame, frozen, TIMEOUT_US).is_ok());
    }

    #[test]
    fn fetch_frame_rejects_missing_auxiliary_data() {
        let (mock, mut sensor) = create();
        mock.poke(0x0700 + 10, &[0x7FFF]);
        let mut frame = RawFrame::new();
        assert_eq!(
            sensor.fetch_frame(&mut frame, frozen, TIMEOUT_US),
            Err(SensorError::CorruptFrame)
        );
    }

    #[test]
    fn fetch_frame_propagates_transport_errors() {
        let (mock, mut sensor) = create();
        mock.inject(InjectedFault::ShortReadAt(0x0400, 10));
        let mut frame = RawFrame::new();
        assert_eq!(
            sensor.fetch_frame(&mut frame, frozen, TIMEOUT_US),
            Err(SensorError::Transport(TransportError::ReadCountMismatch {
                expected: NUM_PIXELS * 2,
                actual: 10
            }))
        );
    }
}
