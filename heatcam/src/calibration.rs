// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! The interface to the sensor's calibration math.
//!
//! Turning raw sensor words into temperatures needs a large amount of per-device calibration data
//! and a long chain of datasheet formulas. None of that lives in this crate; the control loop only
//! needs the handful of operations below, in the order the [pipeline](crate::pipeline) calls them.

use crate::error::CalibrationError;
use crate::frame::{EepromDump, RawFrame, TemperatureGrid};

/// The two defect lists stored in calibration data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DefectKind {
    /// Pixels that don't respond at all.
    Broken,

    /// Pixels that respond, but outside of the expected tolerances.
    Outlier,
}

/// Raw-to-temperature conversion for a specific sensor.
pub trait CalibrationService {
    /// The processed calibration parameters for one device.
    type Parameters;

    /// Process the EEPROM contents into calibration parameters.
    fn extract_parameters(&self, eeprom: &EepromDump)
        -> Result<Self::Parameters, CalibrationError>;

    /// The sensor's own (ambient) temperature for a frame.
    fn ambient_temperature(&self, frame: &RawFrame, parameters: &Self::Parameters) -> f32;

    /// Calculate the object temperature of every pixel measured in `frame`.
    ///
    /// Only the pixels in the frame's subpage are updated, the others keep their previous
    /// values.
    fn compute_temperatures(
        &self,
        frame: &RawFrame,
        parameters: &Self::Parameters,
        emissivity: f32,
        ambient_temperature: f32,
        destination: &mut TemperatureGrid,
    );

    /// The pixel indices of one of the defect lists.
    fn defects<'p>(&self, parameters: &'p Self::Parameters, kind: DefectKind) -> &'p [u16];

    /// Replace the listed pixels with values interpolated from their neighbors.
    fn correct_defects(
        &self,
        defects: &[u16],
        grid: &mut TemperatureGrid,
        iterations: u8,
        parameters: &Self::Parameters,
    );
}
