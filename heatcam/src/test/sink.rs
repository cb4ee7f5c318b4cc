// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::Point;

use crate::sink::RasterSink;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum SinkOperation {
    Clear(Rgb888),
    Block {
        top_left: Point,
        scale: u32,
        color: Rgb888,
    },
    Text {
        text: String,
        origin: Point,
        scale: u32,
        color: Rgb888,
    },
    Present,
}

/// A [`RasterSink`] that records every drawing call.
#[derive(Clone, Debug, Default)]
pub(crate) struct RecordingSink {
    operations: Vec<SinkOperation>,
}

impl RecordingSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn operations(&self) -> &[SinkOperation] {
        &self.operations
    }

    pub(crate) fn block_count(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, SinkOperation::Block { .. }))
            .count()
    }

    /// The scale and color of the last block drawn at `top_left`.
    pub(crate) fn block_at(&self, top_left: Point) -> Option<(u32, Rgb888)> {
        self.operations.iter().rev().find_map(|op| match op {
            SinkOperation::Block {
                top_left: origin,
                scale,
                color,
            } if *origin == top_left => Some((*scale, *color)),
            _ => None,
        })
    }

    /// Every line of text drawn, in order.
    pub(crate) fn texts(&self) -> Vec<&str> {
        self.operations
            .iter()
            .filter_map(|op| match op {
                SinkOperation::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Where a line of text was first drawn.
    pub(crate) fn text_origin(&self, wanted: &str) -> Option<Point> {
        self.operations.iter().find_map(|op| match op {
            SinkOperation::Text { text, origin, .. } if text == wanted => Some(*origin),
            _ => None,
        })
    }

    pub(crate) fn present_count(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| **op == SinkOperation::Present)
            .count()
    }
}

impl RasterSink for RecordingSink {
    fn clear(&mut self, color: Rgb888) {
        self.operations.push(SinkOperation::Clear(color));
    }

    fn fill_block(&mut self, top_left: Point, scale: u32, color: Rgb888) {
        self.operations.push(SinkOperation::Block {
            top_left,
            scale,
            color,
        });
    }

    fn draw_text(&mut self, text: &str, origin: Point, scale: u32, color: Rgb888) {
        self.operations.push(SinkOperation::Text {
            text: text.into(),
            origin,
            scale,
            color,
        });
    }

    fn present(&mut self) {
        self.operations.push(SinkOperation::Present);
    }
}
