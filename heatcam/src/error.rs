// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
#[cfg(feature = "std")]
extern crate std;

use core::fmt;

/// A stable numeric status for an error, shown on the crash screen next to its description.
pub trait StatusCode {
    fn code(&self) -> i32;
}

/// Errors from a single register transaction.
#[derive(Clone, PartialEq)]
pub enum TransportError<E> {
    /// The requested read is larger than the transfer buffer. Nothing was sent on the bus.
    Oversize { requested_bytes: usize },

    /// Fewer bytes than expected were written.
    WriteCountMismatch { expected: usize, actual: usize },

    /// Fewer bytes than requested were read.
    ReadCountMismatch { expected: usize, actual: usize },

    /// A written register did not read back with the value that was written.
    VerifyMismatch { expected: u16, actual: u16 },

    /// The operation can't be performed in this bus mode.
    Unsupported,

    /// Errors originating from the bus implementation.
    Bus(E),
}

impl<E> StatusCode for TransportError<E> {
    fn code(&self) -> i32 {
        match self {
            TransportError::ReadCountMismatch { .. } => -1,
            TransportError::WriteCountMismatch { .. } => -2,
            TransportError::Oversize { .. } => -3,
            TransportError::VerifyMismatch { .. } => -4,
            TransportError::Unsupported => -5,
            TransportError::Bus(_) => -6,
        }
    }
}

// Custom Debug implementation so that only the bus error needs to be Debug.
impl<E: fmt::Debug> fmt::Debug for TransportError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Oversize { requested_bytes } => f
                .debug_struct("TransportError::Oversize")
                .field("requested_bytes", requested_bytes)
                .finish(),
            TransportError::WriteCountMismatch { expected, actual } => f
                .debug_struct("TransportError::WriteCountMismatch")
                .field("expected", expected)
                .field("actual", actual)
                .finish(),
            TransportError::ReadCountMismatch { expected, actual } => f
                .debug_struct("TransportError::ReadCountMismatch")
                .field("expected", expected)
                .field("actual", actual)
                .finish(),
            TransportError::VerifyMismatch { expected, actual } => f
                .debug_struct("TransportError::VerifyMismatch")
                .field("expected", expected)
                .field("actual", actual)
                .finish(),
            TransportError::Unsupported => f.write_str("TransportError::Unsupported"),
            TransportError::Bus(bus_error) => f
                .debug_tuple("TransportError::Bus")
                .field(bus_error)
                .finish(),
        }
    }
}

impl<E: fmt::Debug> fmt::Display for TransportError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Oversize { requested_bytes } => {
                write!(f, "Requested read too big: {} bytes", requested_bytes)
            }
            TransportError::WriteCountMismatch { expected, actual } => write!(
                f,
                "Incorrect written byte count: {} (expected {})",
                actual, expected
            ),
            TransportError::ReadCountMismatch { expected, actual } => write!(
                f,
                "Incorrect read byte count: {} (expected {})",
                actual, expected
            ),
            TransportError::VerifyMismatch { expected, actual } => write!(
                f,
                "Register read back 0x{:04X} instead of 0x{:04X}",
                actual, expected
            ),
            TransportError::Unsupported => f.write_str("Operation not supported by this bus"),
            TransportError::Bus(bus_error) => write!(f, "I2C Error: {:?}", bus_error),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for TransportError<E> {}

/// The status returned by the external calibration service when it rejects its input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CalibrationError {
    pub code: i32,
}

impl StatusCode for CalibrationError {
    fn code(&self) -> i32 {
        self.code
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Calibration service returned {}", self.code)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CalibrationError {}

/// Why a sensor operation failed.
#[derive(Clone, PartialEq)]
pub enum SensorError<E> {
    Transport(TransportError<E>),

    Calibration(CalibrationError),

    /// The frame contained the "no data" marker in a location that should have been measured.
    CorruptFrame,

    /// The sensor never flagged new data within the polling limit.
    DataNotReady,
}

impl<E> StatusCode for SensorError<E> {
    fn code(&self) -> i32 {
        match self {
            SensorError::Transport(err) => err.code(),
            SensorError::Calibration(err) => err.code(),
            SensorError::CorruptFrame => -8,
            SensorError::DataNotReady => -9,
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for SensorError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::Transport(err) => {
                f.debug_tuple("SensorError::Transport").field(err).finish()
            }
            SensorError::Calibration(err) => {
                f.debug_tuple("SensorError::Calibration").field(err).finish()
            }
            SensorError::CorruptFrame => f.write_str("SensorError::CorruptFrame"),
            SensorError::DataNotReady => f.write_str("SensorError::DataNotReady"),
        }
    }
}

impl<E: fmt::Debug> fmt::Display for SensorError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::Transport(err) => fmt::Display::fmt(err, f),
            SensorError::Calibration(err) => fmt::Display::fmt(err, f),
            SensorError::CorruptFrame => f.write_str("Frame data failed validation"),
            SensorError::DataNotReady => f.write_str("Sensor never signalled new data"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for SensorError<E> {}

impl<E> From<TransportError<E>> for SensorError<E> {
    fn from(err: TransportError<E>) -> Self {
        Self::Transport(err)
    }
}

impl<E> From<CalibrationError> for SensorError<E> {
    fn from(err: CalibrationError) -> Self {
        Self::Calibration(err)
    }
}

/// The bring-up steps, in the order they are performed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BringupStep {
    SetSampleRate,
    SetChessMode,
    DumpEeprom,
    ExtractParameters,
}

impl BringupStep {
    /// The message shown on the crash screen when this step fails.
    pub fn description(&self) -> &'static str {
        match self {
            BringupStep::SetSampleRate => "Failed to set the camera refresh rate",
            BringupStep::SetChessMode => "Failed to set the camera to chess mode",
            BringupStep::DumpEeprom => "Failed to dump camera eeprom data",
            BringupStep::ExtractParameters => "Problems when parsing camera eeprom data",
        }
    }
}

/// Fatal errors talking to the sensor.
#[derive(Clone, PartialEq)]
pub enum SensorProtocolError<E> {
    BringupFailed(BringupStep, SensorError<E>),

    FrameFetchFailed(SensorError<E>),
}

impl<E> SensorProtocolError<E> {
    pub fn description(&self) -> &'static str {
        match self {
            SensorProtocolError::BringupFailed(step, _) => step.description(),
            SensorProtocolError::FrameFetchFailed(_) => "Failed to get the frame data",
        }
    }

    /// The underlying cause.
    pub fn cause(&self) -> &SensorError<E> {
        match self {
            SensorProtocolError::BringupFailed(_, cause) => cause,
            SensorProtocolError::FrameFetchFailed(cause) => cause,
        }
    }
}

impl<E> StatusCode for SensorProtocolError<E> {
    fn code(&self) -> i32 {
        self.cause().code()
    }
}

impl<E: fmt::Debug> fmt::Debug for SensorProtocolError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorProtocolError::BringupFailed(step, cause) => f
                .debug_tuple("SensorProtocolError::BringupFailed")
                .field(step)
                .field(cause)
                .finish(),
            SensorProtocolError::FrameFetchFailed(cause) => f
                .debug_tuple("SensorProtocolError::FrameFetchFailed")
                .field(cause)
                .finish(),
        }
    }
}

impl<E> fmt::Display for SensorProtocolError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.description(), self.code())
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for SensorProtocolError<E> {}

/// Errors in the build-time configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigurationError {
    /// The sample rate (in Hz) has no corresponding sensor mode.
    UnsupportedSampleRate(u8),
}

impl ConfigurationError {
    pub fn description(&self) -> &'static str {
        match self {
            ConfigurationError::UnsupportedSampleRate(_) => "Unsupported FPS value",
        }
    }
}

impl StatusCode for ConfigurationError {
    fn code(&self) -> i32 {
        0
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.description(), self.code())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigurationError {}

/// Anything that sends the control loop into its crashed state.
#[derive(Clone, PartialEq)]
pub enum Fault<E> {
    Configuration(ConfigurationError),

    Sensor(SensorProtocolError<E>),
}

impl<E> Fault<E> {
    /// The human-readable description of the failed operation.
    pub fn description(&self) -> &'static str {
        match self {
            Fault::Configuration(err) => err.description(),
            Fault::Sensor(err) => err.description(),
        }
    }
}

impl<E> StatusCode for Fault<E> {
    fn code(&self) -> i32 {
        match self {
            Fault::Configuration(err) => err.code(),
            Fault::Sensor(err) => err.code(),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for Fault<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Configuration(err) => f.debug_tuple("Fault::Configuration").field(err).finish(),
            Fault::Sensor(err) => f.debug_tuple("Fault::Sensor").field(err).finish(),
        }
    }
}

impl<E> fmt::Display for Fault<E> {
    /// Formats as the crash screen message, `"<description>: <code>"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.description(), self.code())
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for Fault<E> {}

impl<E> From<ConfigurationError> for Fault<E> {
    fn from(err: ConfigurationError) -> Self {
        Self::Configuration(err)
    }
}

impl<E> From<SensorProtocolError<E>> for Fault<E> {
    fn from(err: SensorProtocolError<E>) -> Self {
        Self::Sensor(err)
    }
}
