// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! The acquisition-to-render control loop.
//!
//! After bring-up, each cycle fetches a frame, applies any range adjustment, draws the heatmap and
//! status panel, and sleeps until the cycle's deadline. Any fault moves the loop into a crashed
//! state that only redraws the fault message. There's no way back out of it short of a reset.

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use log::{error, trace, warn};

use crate::calibration::CalibrationService;
use crate::config::Config;
use crate::error::Fault;
use crate::heatmap::{Palette, HEATMAP_PALETTE};
use crate::input::{battery_voltage, Platform};
use crate::pipeline::FramePipeline;
use crate::range::{ColorRange, MarkOverlay, RangeController};
use crate::render::{draw_crash_screen, FrameView, Layout, PowerStatus, Renderer};
use crate::scheduler::{CycleReport, DeadlineScheduler, LoopState, CRASH_REDRAW_PERIOD_US};
use crate::sensor::Mlx90640;
use crate::sink::RasterSink;
use crate::transport::HalfDuplexBus;
use crate::util::micros_between;

/// Brightness the status LED is driven at when showing the average temperature.
pub const LED_BRIGHTNESS: u8 = 128;

/// The LED is driven at a third of the heatmap color, per channel.
fn led_color(color: Rgb888) -> Rgb888 {
    Rgb888::new(color.r() / 3, color.g() / 3, color.b() / 3)
}

enum Stage<B, C>
where
    B: HalfDuplexBus,
    C: CalibrationService,
{
    Running(FramePipeline<B, C>),
    Crashed(Fault<B::Error>),
}

/// The whole device: sensor pipeline, display, buttons and timing.
pub struct ControlLoop<B, C, S, P>
where
    B: HalfDuplexBus,
    C: CalibrationService,
    S: RasterSink,
    P: Platform,
{
    stage: Stage<B, C>,
    config: Config,
    scheduler: DeadlineScheduler,
    controller: RangeController,
    range: ColorRange,
    palette: Palette,
    sink: S,
    platform: P,
    /// When the previous cycle started, for measuring how long buttons were held.
    previous_start: Option<u64>,
}

impl<B, C, S, P> ControlLoop<B, C, S, P>
where
    B: HalfDuplexBus,
    C: CalibrationService,
    S: RasterSink,
    P: Platform,
{
    /// Bring up the sensor on `bus` and get ready to run.
    ///
    /// A failed bring-up doesn't return an error, the loop starts out crashed instead.
    pub fn start(bus: B, service: C, sink: S, platform: P, config: Config) -> Self {
        let sensor = Mlx90640::new(bus, config.sensor_address);
        let stage = match FramePipeline::bring_up(sensor, service, &config) {
            Ok(pipeline) => Stage::Running(pipeline),
            Err(fault) => {
                error!("Bring-up failed, halting: {}", fault);
                Stage::Crashed(fault)
            }
        };
        Self {
            stage,
            scheduler: DeadlineScheduler::new(config.cycle_period_us()),
            controller: RangeController::new(config.range_rate),
            range: config.initial_range,
            palette: HEATMAP_PALETTE,
            sink,
            platform,
            previous_start: None,
            config,
        }
    }

    /// Run a single cycle, including the sleep at the end of it.
    pub fn step(&mut self) -> CycleReport {
        let started_at = self.platform.now_micros();
        let since_previous_us = self
            .previous_start
            .map_or(0, |previous| micros_between(previous, started_at));
        self.previous_start = Some(started_at);
        if let Stage::Running(_) = self.stage {
            match self.render_frame(since_previous_us) {
                Ok(()) => return self.finish_cycle(started_at, since_previous_us),
                Err(fault) => {
                    error!("Halting: {}", fault);
                    self.stage = Stage::Crashed(fault);
                }
            }
        }
        self.crashed_cycle(started_at, since_previous_us)
    }

    /// Run cycles forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    pub fn state(&self) -> LoopState<'_, B::Error> {
        match &self.stage {
            Stage::Running(_) => LoopState::Running,
            Stage::Crashed(fault) => LoopState::Crashed(fault),
        }
    }

    /// The sensor pipeline, if the loop hasn't crashed.
    pub fn pipeline(&self) -> Option<&FramePipeline<B, C>> {
        match &self.stage {
            Stage::Running(pipeline) => Some(pipeline),
            Stage::Crashed(_) => None,
        }
    }

    pub fn range(&self) -> &ColorRange {
        &self.range
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scheduler(&self) -> &DeadlineScheduler {
        &self.scheduler
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    fn render_frame(&mut self, elapsed_us: u32) -> Result<(), Fault<B::Error>> {
        let pipeline = match &mut self.stage {
            Stage::Running(pipeline) => pipeline,
            Stage::Crashed(_) => return Ok(()),
        };
        let platform = &mut self.platform;
        let grid = pipeline.acquire(|| platform.now_micros())?;
        let buttons = self.platform.buttons();
        let features = self.config.features;
        if features.range_adjust {
            self.controller.update(&mut self.range, buttons, elapsed_us);
        }
        let statistics = grid.statistics();
        let overlay = if features.mark_overlay {
            MarkOverlay::from_buttons(buttons, &statistics)
        } else {
            MarkOverlay::default()
        };
        let power = PowerStatus {
            battery_voltage: battery_voltage(self.platform.battery_sample()),
            external_power: self.platform.external_power(),
        };
        let renderer = Renderer::new(Layout::new(self.config.upscale), &self.palette);
        renderer.draw_frame(
            &mut self.sink,
            &FrameView {
                grid,
                statistics: &statistics,
                range: &self.range,
                overlay: &overlay,
                power: &power,
            },
        );
        if features.led_feedback {
            let average = self
                .palette
                .color_of(statistics.average, self.range.min, self.range.max);
            self.platform.set_led(led_color(average), LED_BRIGHTNESS);
        }
        self.sink.present();
        Ok(())
    }

    fn finish_cycle(&mut self, started_at: u64, since_previous_us: u32) -> CycleReport {
        let finished_at = self.platform.now_micros();
        let mut report = CycleReport {
            started_at,
            since_previous_us,
            work_us: micros_between(started_at, finished_at),
            sleep_us: self.scheduler.remaining(started_at, finished_at),
        };
        if report.overran(&self.scheduler) {
            warn!(
                "Cycle took {}us, over the {}us period",
                report.work_us,
                self.scheduler.period_us()
            );
            report.sleep_us = 0;
        } else {
            trace!("Cycle took {}us, sleeping {}us", report.work_us, report.sleep_us);
            self.platform.sleep_micros(report.sleep_us);
        }
        report
    }

    fn crashed_cycle(&mut self, started_at: u64, since_previous_us: u32) -> CycleReport {
        if let Stage::Crashed(fault) = &self.stage {
            draw_crash_screen(&mut self.sink, fault);
        }
        let work_us = micros_between(started_at, self.platform.now_micros());
        self.platform.sleep_micros(CRASH_REDRAW_PERIOD_US);
        CycleReport {
            started_at,
            since_previous_us,
            work_us,
            sleep_us: CRASH_REDRAW_PERIOD_US,
        }
    }
}

impl<B, C, S, P> core::fmt::Debug for ControlLoop<B, C, S, P>
where
    B: HalfDuplexBus,
    B::Error: core::fmt::Debug,
    C: CalibrationService,
    S: RasterSink,
    P: Platform,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControlLoop")
            .field("state", &self.state())
            .field("range", &self.range)
            .field("scheduler", &self.scheduler)
            .field("previous_start", &self.previous_start)
            .finish_non_exhaustive()
    }
}
