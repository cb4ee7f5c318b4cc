//! The control loop for a handheld thermal camera built around an MLX90640 sensor.
//!
//! Each cycle a frame is pulled off the sensor over I²C, turned into temperatures, mapped onto a
//! false-color heatmap and drawn to the display along with a small status panel. Four buttons
//! retarget the heatmap's range while the camera runs, or mark the coldest and hottest spots. The
//! cycle period comes from the sensor's sample rate, and a cycle that runs long is never made up.
//!
//! Sensor access uses the [`embedded-hal`][embedded-hal] I²C traits, and drawing goes through
//! [`embedded-graphics`][embedded-graphics], so this crate should work anywhere both are
//! available. It's `no_std` and doesn't allocate; every buffer is a fixed-size array.
//!
//! [embedded-hal]: https://docs.rs/embedded-hal/*/embedded_hal/blocking/i2c/index.html
//! [embedded-graphics]: https://docs.rs/embedded-graphics
//!
//! # Putting it together
//! ```no_run
//! use embedded_hal::blocking::i2c;
//! use heatcam::{CalibrationService, Config, ControlLoop, EmbeddedHalBus, Platform, RasterSink};
//!
//! fn camera<I2C, E, C, S, P>(i2c: I2C, calibration: C, display: S, board: P) -> !
//! where
//!     I2C: i2c::Write<Error = E> + i2c::WriteRead<Error = E> + i2c::Read<Error = E>,
//!     C: CalibrationService,
//!     S: RasterSink,
//!     P: Platform,
//! {
//!     let bus = EmbeddedHalBus::new(i2c);
//!     let mut camera = ControlLoop::start(bus, calibration, display, board, Config::DEFAULT);
//!     camera.run()
//! }
//! ```
//! The temperature math itself isn't here. It's supplied through [`CalibrationService`], which is
//! handed the EEPROM contents once at startup and each raw frame after that.
//!
//! # Lifecycle
//! [`ControlLoop::start`] configures the sensor (sample rate, then chess mode), dumps its EEPROM
//! and extracts calibration parameters. If any of that fails the loop starts out crashed. While
//! running, any failure to fetch a frame also crashes it. A crashed loop shows what went wrong,
//! and a numeric status code, on a red screen every 500ms until the device is reset.

#![no_std]
#![allow(clippy::float_cmp)]

#[cfg(not(any(feature = "std", feature = "libm")))]
compile_error!("Either the 'std' or 'libm' feature must be enabled.");

pub mod calibration;
pub mod config;
pub mod control;
pub mod error;
pub mod frame;
pub mod heatmap;
pub mod input;
pub mod pipeline;
pub mod range;
pub mod register;
pub mod render;
pub mod scheduler;
pub mod sensor;
pub mod sink;
pub mod transport;
mod util;

#[cfg(test)]
mod test;

pub use calibration::{CalibrationService, DefectKind};
pub use config::{Config, Features};
#[doc(inline)]
pub use control::ControlLoop;
#[doc(inline)]
pub use error::{
    BringupStep, CalibrationError, ConfigurationError, Fault, SensorError, SensorProtocolError,
    StatusCode, TransportError,
};
pub use frame::{EepromDump, FrameStatistics, RawFrame, TemperatureGrid};
pub use heatmap::{color_of, Palette, HEATMAP_PALETTE};
pub use input::{Board, Buttons, Platform};
pub use range::{ButtonState, ColorRange, MarkOverlay, RangeController};
pub use register::*;
pub use scheduler::{CycleReport, DeadlineScheduler, LoopState};
pub use sensor::Mlx90640;
pub use sink::{GraphicsSink, Present, RasterSink};
pub use transport::{EmbeddedHalBus, HalfDuplexBus, Transport};
