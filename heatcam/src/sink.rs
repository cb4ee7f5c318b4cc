// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! The drawing surface frames are rendered onto.

use core::convert::Infallible;

use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_5X7, FONT_9X15};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};

/// A display that frames are drawn onto, and then shown all at once.
pub trait RasterSink {
    /// Fill the whole surface with one color.
    fn clear(&mut self, color: Rgb888);

    /// Fill a `scale` by `scale` square with its top left corner at `top_left`.
    fn fill_block(&mut self, top_left: Point, scale: u32, color: Rgb888);

    /// Draw a line of text with its top left corner at `origin`.
    fn draw_text(&mut self, text: &str, origin: Point, scale: u32, color: Rgb888);

    /// Show everything drawn since the last call.
    fn present(&mut self);
}

/// Push a drawn frame out to the physical display.
pub trait Present {
    fn present(&mut self);
}

/// A [`RasterSink`] for any `embedded-graphics` draw target that can't fail.
///
/// Buffered displays fit this well: drawing goes to memory, and [`Present`] flushes it out.
#[derive(Debug)]
pub struct GraphicsSink<D> {
    target: D,
}

impl<D> GraphicsSink<D> {
    pub fn new(target: D) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &D {
        &self.target
    }

    pub fn release(self) -> D {
        self.target
    }
}

/// The font used for a text scale. Scale 1 is the small status text.
fn font_for_scale(scale: u32) -> &'static MonoFont<'static> {
    match scale {
        0 | 1 => &FONT_5X7,
        2 => &FONT_9X15,
        _ => &FONT_10X20,
    }
}

fn infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

impl<D> RasterSink for GraphicsSink<D>
where
    D: DrawTarget<Error = Infallible> + Present,
    D::Color: From<Rgb888>,
{
    fn clear(&mut self, color: Rgb888) {
        infallible(self.target.clear(color.into()))
    }

    fn fill_block(&mut self, top_left: Point, scale: u32, color: Rgb888) {
        let block = Rectangle::new(top_left, Size::new_equal(scale))
            .into_styled(PrimitiveStyle::with_fill(color.into()));
        infallible(block.draw(&mut self.target))
    }

    fn draw_text(&mut self, text: &str, origin: Point, scale: u32, color: Rgb888) {
        let style = MonoTextStyle::new(font_for_scale(scale), color.into());
        let text = Text::with_baseline(text, origin, style, Baseline::Top);
        infallible(text.draw(&mut self.target));
    }

    fn present(&mut self) {
        self.target.present()
    }
}
