// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Screen layout for the heatmap, the status panel beside it, and the crash screen.

use core::fmt::{self, Write};

use arrayvec::ArrayString;
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::Point;
use log::warn;

use crate::frame::{FrameStatistics, TemperatureGrid, DISPLAY_WIDTH};
use crate::heatmap::Palette;
use crate::range::{ColorRange, MarkOverlay};
use crate::sink::RasterSink;

pub const BACKGROUND_COLOR: Rgb888 = Rgb888::new(120, 40, 60);

pub const TEXT_COLOR: Rgb888 = Rgb888::GREEN;

pub const CRASH_BACKGROUND_COLOR: Rgb888 = Rgb888::RED;

pub const CRASH_TEXT_COLOR: Rgb888 = Rgb888::BLUE;

/// Text scale for the status panel.
const STATUS_TEXT_SCALE: u32 = 1;

/// Text scale for the crash message.
const CRASH_TEXT_SCALE: u32 = 2;

pub const HELP_MARK_MIN: &str = "Hold X - Mark Min (White)";
pub const HELP_MARK_MAX: &str = "Hold Y - Mark Max (Black)";
pub const HELP_HEATMAP_MIN: &str = "Hold A + X|Y - Heatmap Min";
pub const HELP_HEATMAP_MAX: &str = "Hold B + X|Y - Heatmap Max";

const USB_POWER: &str = "USB Power";
const BATTERY_POWER: &str = "Battery Power";

type Line = ArrayString<64>;

fn format_line(args: fmt::Arguments) -> Line {
    let mut line = Line::new();
    if line.write_fmt(args).is_err() {
        warn!("Status text truncated: {}", line);
    }
    line
}

/// Where things go on screen.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Layout {
    /// The size of each heatmap cell in pixels.
    pub upscale: u32,

    /// Rows of padding above the heatmap.
    pub heatmap_top: i32,

    /// The left edge of the status panel, just to the right of the heatmap.
    pub text_left: i32,

    pub text_top: i32,

    pub line_height: i32,
}

impl Layout {
    pub const fn new(upscale: u32) -> Self {
        Self {
            upscale,
            heatmap_top: 3,
            text_left: upscale as i32 * DISPLAY_WIDTH as i32 + 4,
            text_top: 3,
            line_height: 7,
        }
    }

    /// The top left pixel of a heatmap cell.
    pub fn cell_origin(&self, cell: Point) -> Point {
        let scale = self.upscale as i32;
        Point::new(cell.x * scale, cell.y * scale + self.heatmap_top)
    }
}

/// The power readings shown at the top of the status panel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PowerStatus {
    pub battery_voltage: f32,
    pub external_power: bool,
}

/// Everything shown for one frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    pub grid: &'a TemperatureGrid,
    pub statistics: &'a FrameStatistics,
    pub range: &'a ColorRange,
    pub overlay: &'a MarkOverlay,
    pub power: &'a PowerStatus,
}

/// Draws complete frames onto a [`RasterSink`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Renderer<'p> {
    layout: Layout,
    palette: &'p Palette,
}

impl<'p> Renderer<'p> {
    pub fn new(layout: Layout, palette: &'p Palette) -> Self {
        Self { layout, palette }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Draw a frame, but don't present it.
    pub fn draw_frame<S: RasterSink>(&self, sink: &mut S, view: &FrameView) {
        sink.clear(BACKGROUND_COLOR);
        self.draw_power(sink, view.power);
        self.draw_heatmap(sink, view.grid, view.range, view.overlay);
        self.draw_readouts(sink, view.statistics, view.range);
    }

    fn draw_heatmap<S: RasterSink>(
        &self,
        sink: &mut S,
        grid: &TemperatureGrid,
        range: &ColorRange,
        overlay: &MarkOverlay,
    ) {
        for (cell, temperature) in grid.cells() {
            let color = overlay
                .color_at(cell)
                .unwrap_or_else(|| self.palette.color_of(temperature, range.min, range.max));
            sink.fill_block(self.layout.cell_origin(cell), self.layout.upscale, color);
        }
    }

    fn draw_power<S: RasterSink>(&self, sink: &mut S, power: &PowerStatus) {
        let Layout {
            text_left,
            text_top,
            line_height,
            ..
        } = self.layout;
        let voltage = format_line(format_args!("{:.3}V", power.battery_voltage));
        self.status_text(sink, &voltage, Point::new(text_left, text_top));
        let source = if power.external_power {
            USB_POWER
        } else {
            BATTERY_POWER
        };
        self.status_text(sink, source, Point::new(text_left, text_top + line_height));
    }

    fn draw_readouts<S: RasterSink>(
        &self,
        sink: &mut S,
        statistics: &FrameStatistics,
        range: &ColorRange,
    ) {
        let line_height = self.layout.line_height;
        // The readouts start two lines below the power source line.
        let mut top = self.layout.text_top + line_height * 3;
        let min = format_line(format_args!("Min: {:.2}C", statistics.min));
        let min_pixel = format_line(format_args!(
            "Min Pixel: {} {}",
            statistics.min_at.x, statistics.min_at.y
        ));
        let max = format_line(format_args!("MAX: {:.2}C", statistics.max));
        let max_pixel = format_line(format_args!(
            "Max Pixel: {} {}",
            statistics.max_at.x, statistics.max_at.y
        ));
        let average = format_line(format_args!("Average (LED): {:.2}C", statistics.average));
        let heatmap_min = format_line(format_args!("Heatmap Min: {:.2}", range.min));
        let heatmap_max = format_line(format_args!("Heatmap Max: {:.2}", range.max));
        // Each entry is a line of text and how far down the next line goes.
        let lines: [(&str, i32); 11] = [
            (min.as_str(), 1),
            (min_pixel.as_str(), 1),
            (HELP_MARK_MIN, 2),
            (max.as_str(), 1),
            (max_pixel.as_str(), 1),
            (HELP_MARK_MAX, 2),
            (average.as_str(), 2),
            (heatmap_min.as_str(), 1),
            (HELP_HEATMAP_MIN, 2),
            (heatmap_max.as_str(), 1),
            (HELP_HEATMAP_MAX, 0),
        ];
        for (text, advance) in lines.iter() {
            self.status_text(sink, text, Point::new(self.layout.text_left, top));
            top += line_height * advance;
        }
    }

    fn status_text<S: RasterSink>(&self, sink: &mut S, text: &str, origin: Point) {
        sink.draw_text(text, origin, STATUS_TEXT_SCALE, TEXT_COLOR);
    }
}

/// Draw and present the crash screen for `fault`.
///
/// The message is `"<description>: <code>"`, as formatted by the fault's `Display`.
pub fn draw_crash_screen<S, F>(sink: &mut S, fault: &F)
where
    S: RasterSink,
    F: fmt::Display,
{
    let mut message = ArrayString::<128>::new();
    if write!(message, "{}", fault).is_err() {
        warn!("Crash message truncated");
    }
    sink.clear(CRASH_BACKGROUND_COLOR);
    sink.draw_text(&message, Point::zero(), CRASH_TEXT_SCALE, CRASH_TEXT_COLOR);
    sink.present();
}
