// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Build-time configuration.

use crate::error::ConfigurationError;
use crate::range::ColorRange;
use crate::register::SampleRate;

/// Optional behaviors of the control loop.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Features {
    /// Move the heatmap range with the A/B + X/Y chords.
    pub range_adjust: bool,

    /// Mark the coldest/hottest cell while X/Y is held.
    pub mark_overlay: bool,

    /// Show the average temperature's color on the status LED.
    pub led_feedback: bool,
}

impl Features {
    pub const ALL: Self = Self {
        range_adjust: true,
        mark_overlay: true,
        led_feedback: true,
    };

    pub const NONE: Self = Self {
        range_adjust: false,
        mark_overlay: false,
        led_feedback: false,
    };
}

impl Default for Features {
    fn default() -> Self {
        Self::ALL
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// The sensor's 7-bit bus address.
    pub sensor_address: u8,

    /// The bus clock, in Hz. This is also the basis for the cycle period.
    pub bus_clock_hz: u32,

    /// Frames per second requested from the sensor.
    pub sample_rate_hz: u8,

    pub emissivity: f32,

    /// The heatmap range at power on.
    pub initial_range: ColorRange,

    /// How many display pixels each cell is scaled up to, in both directions.
    pub upscale: u32,

    /// How fast a held chord moves the range, in degrees per microsecond.
    pub range_rate: f32,

    pub features: Features,
}

impl Config {
    pub const DEFAULT: Self = Self {
        sensor_address: 0x33,
        bus_clock_hz: 1_000_000,
        sample_rate_hz: 16,
        emissivity: 1f32,
        initial_range: ColorRange::DEFAULT,
        upscale: 4,
        range_rate: 0.000002,
        features: Features::ALL,
    };

    /// The sensor mode for the configured frame rate.
    pub fn sample_rate(&self) -> Result<SampleRate, ConfigurationError> {
        SampleRate::from_hz(self.sample_rate_hz)
    }

    /// The target length of one control cycle, in microseconds.
    ///
    /// Zero if the sample rate is zero, which bring-up rejects anyway.
    pub fn cycle_period_us(&self) -> u32 {
        self.bus_clock_hz
            .checked_div(u32::from(self.sample_rate_hz))
            .unwrap_or(0)
    }

    /// How long to wait for the sensor to finish a subpage before giving up, in microseconds.
    ///
    /// Two full cycle periods, so a slow sample rate never trips it.
    pub fn data_timeout_us(&self) -> u32 {
        self.cycle_period_us().saturating_mul(2)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}
