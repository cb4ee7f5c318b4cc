// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::ConfigurationError;
use crate::util::is_bit_set;

/// Trait for common register functionality.
pub trait Register: Into<u16> + From<u16> {
    /// A bit mask of which bits can be modified by the controller.
    ///
    /// When changing register values on the camera, the current value should be read, then
    /// bitwise-ANDed with the complement of this mask, then bitwise-ORd with the new value. This
    /// preserves the values of any reserved bits in the registers.
    fn write_mask() -> u16;

    /// The address of this register in the camera's memory map.
    fn address() -> u16;
}

/// Identify which subpage to access.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum Subpage {
    Zero = 0,
    One = 1,
}

/// The pixel layout of the two subpages.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum AccessPattern {
    /// Pixels alternate subpages along both axes, like a chess board.
    Chess,

    /// Each row alternates subpages ("TV" mode in the datasheet).
    Interleave,
}

/// The sample rates the sensor supports.
///
/// The discriminant is the mode code stored in bits 7-9 of the control register. Before using the
/// higher rates make sure the bus is fast enough: 1MHz is needed for 32Hz and above.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum SampleRate {
    /// 0.5Hz, one frame every two seconds.
    Half = 0x00,

    /// 1Hz.
    One = 0x01,

    /// 2Hz, the sensor's power-on default.
    Two = 0x02,

    /// 4Hz.
    Four = 0x03,

    /// 8Hz.
    Eight = 0x04,

    /// 16Hz.
    Sixteen = 0x05,

    /// 32Hz.
    ThirtyTwo = 0x06,

    /// 64Hz.
    SixtyFour = 0x07,
}

impl SampleRate {
    /// Look up the rate for a whole number of frames per second.
    ///
    /// Only whole-number rates can be configured, so 0.5Hz is never returned.
    pub fn from_hz(hz: u8) -> Result<Self, ConfigurationError> {
        match hz {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            8 => Ok(Self::Eight),
            16 => Ok(Self::Sixteen),
            32 => Ok(Self::ThirtyTwo),
            64 => Ok(Self::SixtyFour),
            _ => Err(ConfigurationError::UnsupportedSampleRate(hz)),
        }
    }

    /// The mode code written to the control register.
    pub fn mode_code(&self) -> u16 {
        (*self).into()
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self::Two
    }
}

/// Represents the possible states of the status register (0x8000).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatusRegister {
    /// The subpage which was last updated by the camera. Read-only.
    pub(crate) last_updated_subpage: Subpage,

    /// Set when there is new data available in RAM.
    ///
    /// This flag is set by the camera, and can only be reset by the controller.
    pub(crate) new_data: bool,

    /// Whether data in RAM can be overwritten.
    pub(crate) overwrite_enabled: bool,

    /// Start a measurement. The camera resets this once the measurement is complete.
    pub(crate) start_measurement: bool,
}

impl StatusRegister {
    pub fn last_updated_subpage(&self) -> Subpage {
        self.last_updated_subpage
    }

    pub fn new_data(&self) -> bool {
        self.new_data
    }

    /// The value written after a frame has been collected: clear the new data flag, allow
    /// overwrites and start the next measurement.
    pub fn acknowledge() -> Self {
        Self {
            last_updated_subpage: Subpage::Zero,
            new_data: false,
            overwrite_enabled: true,
            start_measurement: true,
        }
    }
}

impl Register for StatusRegister {
    fn write_mask() -> u16 {
        // The three least significant bits are read-only.
        0x0038
    }

    fn address() -> u16 {
        0x8000
    }
}

impl From<u16> for StatusRegister {
    fn from(raw: u16) -> Self {
        // Only the first bit is used, the other two bits for this value are Melexis reserved.
        let last_updated_subpage = if is_bit_set(raw, 0) {
            Subpage::One
        } else {
            Subpage::Zero
        };
        Self {
            last_updated_subpage,
            new_data: is_bit_set(raw, 3),
            overwrite_enabled: is_bit_set(raw, 4),
            start_measurement: is_bit_set(raw, 5),
        }
    }
}

impl From<StatusRegister> for u16 {
    fn from(status: StatusRegister) -> Self {
        let mut raw: u16 = status.last_updated_subpage.into();
        raw |= (status.new_data as u16) << 3;
        raw |= (status.overwrite_enabled as u16) << 4;
        raw |= (status.start_measurement as u16) << 5;
        raw
    }
}

/// The fields of the control register (0x800D) this crate changes.
///
/// The rest of the register is carried through untouched so that a read-modify-write never
/// disturbs settings it doesn't know about.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ControlRegister {
    raw: u16,
}

impl ControlRegister {
    const SAMPLE_RATE_MASK: u16 = 0x0380;
    const SAMPLE_RATE_SHIFT: u16 = 7;
    const CHESS_BIT: usize = 12;

    pub fn sample_rate(&self) -> SampleRate {
        let code = (self.raw & Self::SAMPLE_RATE_MASK) >> Self::SAMPLE_RATE_SHIFT;
        // Three bits can only hold the eight defined codes.
        SampleRate::try_from(code).unwrap_or_default()
    }

    pub fn set_sample_rate(&mut self, rate: SampleRate) {
        self.raw = (self.raw & !Self::SAMPLE_RATE_MASK)
            | ((rate.mode_code() << Self::SAMPLE_RATE_SHIFT) & Self::SAMPLE_RATE_MASK);
    }

    pub fn access_pattern(&self) -> AccessPattern {
        if is_bit_set(self.raw, Self::CHESS_BIT) {
            AccessPattern::Chess
        } else {
            AccessPattern::Interleave
        }
    }

    pub fn set_access_pattern(&mut self, pattern: AccessPattern) {
        match pattern {
            AccessPattern::Chess => self.raw |= 1u16 << Self::CHESS_BIT,
            AccessPattern::Interleave => self.raw &= !(1u16 << Self::CHESS_BIT),
        }
    }
}

impl Register for ControlRegister {
    fn write_mask() -> u16 {
        0x1FFF
    }

    fn address() -> u16 {
        0x800D
    }
}

impl From<u16> for ControlRegister {
    fn from(raw: u16) -> Self {
        Self { raw }
    }
}

impl From<ControlRegister> for u16 {
    fn from(register: ControlRegister) -> Self {
        register.raw
    }
}
