// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Fixed-period cycle timing.

use crate::error::Fault;
use crate::util::micros_between;

/// How long to wait between redraws of the crash screen, in microseconds.
pub const CRASH_REDRAW_PERIOD_US: u32 = 500_000;

/// Works out how long to sleep at the end of each cycle.
///
/// Each cycle's deadline is measured from that cycle's own start. A cycle that overruns is followed
/// immediately by the next one, and the lost time is never made up.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DeadlineScheduler {
    period_us: u32,
}

impl DeadlineScheduler {
    pub const fn new(period_us: u32) -> Self {
        Self { period_us }
    }

    pub fn period_us(&self) -> u32 {
        self.period_us
    }

    /// The time left in a cycle that started at `start` and finished its work at `end`.
    pub fn remaining(&self, start: u64, end: u64) -> u32 {
        self.period_us.saturating_sub(micros_between(start, end))
    }
}

/// Where the control loop is in its lifecycle.
///
/// There's no way out of `Crashed`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LoopState<'a, E> {
    Running,
    Crashed(&'a Fault<E>),
}

/// Timing for a single control cycle, in microseconds.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CycleReport {
    /// The monotonic timestamp the cycle started at.
    pub started_at: u64,

    /// Time since the previous cycle started.
    pub since_previous_us: u32,

    /// Time spent working, before sleeping.
    pub work_us: u32,

    /// Time slept at the end of the cycle.
    pub sleep_us: u32,
}

impl CycleReport {
    /// Whether the work didn't fit in the cycle period.
    pub fn overran(&self, scheduler: &DeadlineScheduler) -> bool {
        self.work_us >= scheduler.period_us()
    }
}
