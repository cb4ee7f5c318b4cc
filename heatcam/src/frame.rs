// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Fixed-size buffers for one acquisition cycle.
//!
//! The sensor is 32 pixels wide and 24 pixels tall, and stores its pixels in row-major order. The
//! camera is mounted rotated a quarter turn, so the displayed image is 24 cells wide and 32 cells
//! tall: display cell `(x, y)` is sensor row `x`, sensor column `y`.

use embedded_graphics::prelude::Point;

/// Sensor pixels per row.
pub const SENSOR_COLUMNS: usize = 32;

/// Sensor rows.
pub const SENSOR_ROWS: usize = 24;

/// Total number of pixels.
pub const NUM_PIXELS: usize = SENSOR_COLUMNS * SENSOR_ROWS;

/// Width of the displayed image in cells.
pub const DISPLAY_WIDTH: usize = SENSOR_ROWS;

/// Height of the displayed image in cells.
pub const DISPLAY_HEIGHT: usize = SENSOR_COLUMNS;

/// Number of words in the calibration EEPROM.
pub const EEPROM_WORDS: usize = 832;

/// Number of words in a raw frame: the RAM dump plus the control register and subpage.
pub const RAW_FRAME_WORDS: usize = 834;

/// Number of words of RAM dumped per frame (pixels plus auxiliary data).
pub const RAM_WORDS: usize = 832;

/// Index of the control register copy within a raw frame.
pub const CONTROL_WORD_INDEX: usize = 832;

/// Index of the measured subpage within a raw frame.
pub const SUBPAGE_WORD_INDEX: usize = 833;

/// A copy of the calibration EEPROM.
pub type EepromDump = [u16; EEPROM_WORDS];

/// The words read off the sensor for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RawFrame {
    words: [u16; RAW_FRAME_WORDS],
}

impl RawFrame {
    pub const fn new() -> Self {
        Self {
            words: [0u16; RAW_FRAME_WORDS],
        }
    }

    pub fn words(&self) -> &[u16; RAW_FRAME_WORDS] {
        &self.words
    }

    pub fn words_mut(&mut self) -> &mut [u16; RAW_FRAME_WORDS] {
        &mut self.words
    }

    /// The pixel words.
    pub fn pixels(&self) -> &[u16] {
        &self.words[..NUM_PIXELS]
    }

    /// The auxiliary (non-pixel) words that follow the pixels in RAM.
    pub fn auxiliary(&self) -> &[u16] {
        &self.words[NUM_PIXELS..RAM_WORDS]
    }

    /// The control register value at the time the frame was read.
    pub fn control_word(&self) -> u16 {
        self.words[CONTROL_WORD_INDEX]
    }

    /// The subpage this frame measured (0 or 1).
    pub fn subpage(&self) -> u16 {
        self.words[SUBPAGE_WORD_INDEX]
    }
}

impl Default for RawFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-pixel temperatures, in sensor memory order.
#[derive(Clone, Debug, PartialEq)]
pub struct TemperatureGrid {
    values: [f32; NUM_PIXELS],
}

impl TemperatureGrid {
    pub const fn new() -> Self {
        Self {
            values: [0f32; NUM_PIXELS],
        }
    }

    pub fn from_values(values: [f32; NUM_PIXELS]) -> Self {
        Self { values }
    }

    /// The raw values in sensor order, as handed to the calibration service.
    pub fn values(&self) -> &[f32; NUM_PIXELS] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32; NUM_PIXELS] {
        &mut self.values
    }

    /// The sensor index backing a display cell.
    ///
    /// Returns `None` if the cell is outside the display grid.
    pub fn index_of(cell: Point) -> Option<usize> {
        let x = usize::try_from(cell.x).ok()?;
        let y = usize::try_from(cell.y).ok()?;
        if x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT {
            Some(SENSOR_COLUMNS * x + y)
        } else {
            None
        }
    }

    /// The temperature shown at a display cell.
    pub fn at(&self, cell: Point) -> Option<f32> {
        Self::index_of(cell).map(|index| self.values[index])
    }

    /// Iterate over every display cell and its temperature, column by column.
    pub fn cells(&self) -> impl Iterator<Item = (Point, f32)> + '_ {
        (0..DISPLAY_WIDTH).flat_map(move |x| {
            (0..DISPLAY_HEIGHT).map(move |y| {
                let cell = Point::new(x as i32, y as i32);
                (cell, self.values[SENSOR_COLUMNS * x + y])
            })
        })
    }

    /// Find the coldest and hottest cells, and the average temperature.
    pub fn statistics(&self) -> FrameStatistics {
        let mut stats = FrameStatistics {
            min: f32::INFINITY,
            min_at: Point::zero(),
            max: f32::NEG_INFINITY,
            max_at: Point::zero(),
            average: 0f32,
        };
        let mut sum = 0f32;
        for (cell, value) in self.cells() {
            sum += value;
            if value < stats.min {
                stats.min = value;
                stats.min_at = cell;
            }
            if value > stats.max {
                stats.max = value;
                stats.max_at = cell;
            }
        }
        stats.average = sum / NUM_PIXELS as f32;
        stats
    }
}

impl Default for TemperatureGrid {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of one temperature grid. Cells are display coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameStatistics {
    pub min: f32,
    pub min_at: Point,
    pub max: f32,
    pub max_at: Point,
    pub average: f32,
}

#[cfg(test)]
mod test {
    use embedded_graphics::prelude::Point;
    use float_cmp::assert_approx_eq;

    use super::*;

    #[test]
    fn display_cell_mapping() {
        assert_eq!(TemperatureGrid::index_of(Point::new(0, 0)), Some(0));
        assert_eq!(TemperatureGrid::index_of(Point::new(0, 31)), Some(31));
        assert_eq!(TemperatureGrid::index_of(Point::new(1, 0)), Some(32));
        assert_eq!(TemperatureGrid::index_of(Point::new(23, 31)), Some(767));
        assert_eq!(TemperatureGrid::index_of(Point::new(24, 0)), None);
        assert_eq!(TemperatureGrid::index_of(Point::new(0, 32)), None);
        assert_eq!(TemperatureGrid::index_of(Point::new(-1, 0)), None);
    }

    #[test]
    fn cells_cover_everything_once() {
        let mut values = [0f32; NUM_PIXELS];
        values
            .iter_mut()
            .enumerate()
            .for_each(|(index, v)| *v = index as f32);
        let grid = TemperatureGrid::from_values(values);
        let mut seen = [false; NUM_PIXELS];
        for (cell, value) in grid.cells() {
            let index = TemperatureGrid::index_of(cell).unwrap();
            assert_eq!(value, index as f32);
            assert!(!seen[index], "Cell {:?} visited twice", cell);
            seen[index] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn statistics() {
        let mut grid = TemperatureGrid::from_values([20f32; NUM_PIXELS]);
        let cold = TemperatureGrid::index_of(Point::new(3, 7)).unwrap();
        let hot = TemperatureGrid::index_of(Point::new(20, 1)).unwrap();
        grid.values_mut()[cold] = -4.5;
        grid.values_mut()[hot] = 61.25;
        let stats = grid.statistics();
        assert_eq!(stats.min, -4.5);
        assert_eq!(stats.min_at, Point::new(3, 7));
        assert_eq!(stats.max, 61.25);
        assert_eq!(stats.max_at, Point::new(20, 1));
        let expected = (20f32 * (NUM_PIXELS - 2) as f32 - 4.5 + 61.25) / NUM_PIXELS as f32;
        assert_approx_eq!(f32, stats.average, expected, epsilon = 0.001);
    }

    #[test]
    fn statistics_symmetric_sentinels() {
        // Every value below zero. A near-zero starting maximum would wrongly win here.
        let grid = TemperatureGrid::from_values([-30f32; NUM_PIXELS]);
        let stats = grid.statistics();
        assert_eq!(stats.max, -30.0);
        assert_eq!(stats.min, -30.0);
        assert_eq!(stats.min_at, Point::new(0, 0));
        assert_eq!(stats.max_at, Point::new(0, 0));
    }
}
