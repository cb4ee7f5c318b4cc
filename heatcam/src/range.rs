// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Interactive adjustment of the heatmap range, and marking the coldest and hottest cells.
//!
//! Four buttons are read once per cycle. X and Y select a direction (raise and lower), A and B
//! select which end of the range moves. Holding X or Y on its own marks the coldest or hottest cell
//! on the display instead.

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::Point;
use log::trace;

use crate::frame::FrameStatistics;

/// The color the coldest cell is marked with.
pub const MIN_MARK_COLOR: Rgb888 = Rgb888::WHITE;

/// The color the hottest cell is marked with.
pub const MAX_MARK_COLOR: Rgb888 = Rgb888::BLACK;

/// The temperatures mapped to the ends of the heatmap palette.
///
/// There's no requirement that `min` is less than `max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorRange {
    pub min: f32,
    pub max: f32,
}

impl ColorRange {
    pub const DEFAULT: Self = Self::new(5f32, 50f32);

    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

impl Default for ColorRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The buttons held down during one cycle.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ButtonState {
    /// X
    pub raise: bool,

    /// Y
    pub lower: bool,

    /// A, selects the minimum.
    pub modifier_a: bool,

    /// B, selects the maximum.
    pub modifier_b: bool,
}

impl ButtonState {
    /// Whether either of the modifiers is held.
    pub fn any_modifier(&self) -> bool {
        self.modifier_a || self.modifier_b
    }
}

/// Moves the ends of a [`ColorRange`] at a fixed rate while button chords are held.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangeController {
    /// Degrees per microsecond.
    rate: f32,
}

impl RangeController {
    pub const fn new(rate: f32) -> Self {
        Self { rate }
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Apply one cycle's worth of input to `range`.
    ///
    /// Holding both modifiers at once does nothing. If both X and Y are held with a modifier, X
    /// wins. Returns `true` if the range changed.
    pub fn update(&self, range: &mut ColorRange, buttons: ButtonState, elapsed_us: u32) -> bool {
        if buttons.modifier_a && buttons.modifier_b {
            return false;
        }
        let delta = self.rate * elapsed_us as f32;
        let before = *range;
        if buttons.modifier_a {
            if buttons.raise {
                range.min += delta;
            } else if buttons.lower {
                range.min -= delta;
            }
        }
        if buttons.modifier_b {
            if buttons.raise {
                range.max += delta;
            } else if buttons.lower {
                range.max -= delta;
            }
        }
        let changed = *range != before;
        if changed {
            trace!("Heatmap range now {} to {}", range.min, range.max);
        }
        changed
    }
}

/// Cells to draw in a fixed color instead of their heatmap color, for one frame.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MarkOverlay {
    pub min_cell: Option<Point>,
    pub max_cell: Option<Point>,
}

impl MarkOverlay {
    /// X alone marks the coldest cell, Y alone marks the hottest.
    pub fn from_buttons(buttons: ButtonState, statistics: &FrameStatistics) -> Self {
        let unmodified = !buttons.any_modifier();
        Self {
            min_cell: (buttons.raise && unmodified).then(|| statistics.min_at),
            max_cell: (buttons.lower && unmodified).then(|| statistics.max_at),
        }
    }

    /// The override color for a cell, if it's marked.
    ///
    /// When a single cell is both the coldest and the hottest the maximum mark is shown.
    pub fn color_at(&self, cell: Point) -> Option<Rgb888> {
        if self.max_cell == Some(cell) {
            Some(MAX_MARK_COLOR)
        } else if self.min_cell == Some(cell) {
            Some(MIN_MARK_COLOR)
        } else {
            None
        }
    }
}
