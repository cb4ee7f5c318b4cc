// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! False-color mapping of temperatures.

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use num_traits::Float;

/// The number of anchor colors in a palette.
pub const PALETTE_ANCHORS: usize = 7;

/// A piecewise-linear gradient through evenly spaced anchor colors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Palette {
    anchors: [Rgb888; PALETTE_ANCHORS],
}

/// Black through blue, green, yellow, red and magenta to white.
pub const HEATMAP_PALETTE: Palette = Palette::new([
    Rgb888::BLACK,
    Rgb888::BLUE,
    Rgb888::GREEN,
    Rgb888::YELLOW,
    Rgb888::RED,
    Rgb888::MAGENTA,
    Rgb888::WHITE,
]);

impl Palette {
    pub const fn new(anchors: [Rgb888; PALETTE_ANCHORS]) -> Self {
        Self { anchors }
    }

    pub fn anchors(&self) -> &[Rgb888; PALETTE_ANCHORS] {
        &self.anchors
    }

    /// Map `value` onto the gradient, with `min` at the first anchor and `max` at the last.
    ///
    /// Values outside of the range get the end colors. If `max` is less than `min` the gradient is
    /// reversed. An empty (or NaN) range is a step at `min`: anything at or below it gets the first
    /// anchor, everything else the last. NaN values always get the first anchor.
    pub fn color_of(&self, value: f32, min: f32, max: f32) -> Rgb888 {
        const LAST: usize = PALETTE_ANCHORS - 1;
        if value.is_nan() {
            return self.anchors[0];
        }
        let width = max - min;
        let position = if width == 0f32 || width.is_nan() {
            if value <= min {
                0f32
            } else {
                1f32
            }
        } else {
            (value - min) / width
        };
        // Written so that a NaN position (infinite value and range) lands on the first anchor.
        if !(position > 0f32) {
            return self.anchors[0];
        } else if position >= 1f32 {
            return self.anchors[LAST];
        }
        let scaled = position * LAST as f32;
        // Rounding can push a position just under one up to the last anchor.
        let lower = (Float::floor(scaled) as usize).min(LAST - 1);
        let weight = scaled - lower as f32;
        let start = self.anchors[lower];
        let end = self.anchors[lower + 1];
        Rgb888::new(
            lerp_channel(start.r(), end.r(), weight),
            lerp_channel(start.g(), end.g(), weight),
            lerp_channel(start.b(), end.b(), weight),
        )
    }
}

impl Default for Palette {
    fn default() -> Self {
        HEATMAP_PALETTE
    }
}

/// Interpolate a single channel, truncating towards zero.
fn lerp_channel(start: u8, end: u8, weight: f32) -> u8 {
    let start = start as f32;
    let end = end as f32;
    (start + (end - start) * weight) as u8
}

/// Map a value with the default heatmap palette.
pub fn color_of(value: f32, min: f32, max: f32) -> Rgb888 {
    HEATMAP_PALETTE.color_of(value, min, max)
}
