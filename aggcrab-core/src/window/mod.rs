//! # Windows
//!
//! Bounded, evolving collections of recent samples with an incrementally
//! maintained aggregate.
//!
//! Four policies are supported:
//! - [`TumblingWindow`]: `size` samples, non-overlapping, resets at each boundary
//! - [`SlidingWindow`]: the most recent `size` samples, evicted one at a time
//! - [`TumblingTimeWindow`]: everything since the last timer tick
//! - [`SlidingTimeWindow`]: the last `size` ms, advanced in `resolution` ms slots
//!
//! Time windows have no clock of their own; an external timer calls
//! [`TimeWindow::next_block`].

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AggregateError, Result};
use crate::function::{AggregateFunction, AggregateKind, Eviction};
use crate::types::{Emission, Value};

mod count;
mod shared;
mod time;

pub use count::*;
pub use shared::*;
pub use time::*;

// ── Window traits ─────────────────────────────────────────────────────────────

/// Common contract of every window variant.
pub trait Window: Send {
    /// Add one sample and report the window's state afterwards.
    ///
    /// A sample the aggregate function rejects leaves the window untouched.
    fn add_sample(&mut self, sample: Value) -> Result<Emission>;

    /// The aggregate function this window computes.
    fn function(&self) -> AggregateKind;

    fn settings(&self) -> &WindowSettings;

    /// Number of samples currently retained.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aggregate over the retained samples, without changing anything.
    fn current(&self) -> Option<Value>;
}

/// A window advanced by an external timer rather than by sample arrival.
pub trait TimeWindow: Window {
    /// Called once per timer period. Always reports a boundary.
    fn next_block(&mut self) -> Result<Emission>;
}

// ── WindowType ────────────────────────────────────────────────────────────────

/// The four windowing policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowType {
    Tumbling,
    Sliding,
    TimeTumbling,
    TimeSliding,
}

impl WindowType {
    pub const ALL: [WindowType; 4] = [
        WindowType::Tumbling,
        WindowType::Sliding,
        WindowType::TimeTumbling,
        WindowType::TimeSliding,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WindowType::Tumbling => "tumbling",
            WindowType::Sliding => "sliding",
            WindowType::TimeTumbling => "timeTumbling",
            WindowType::TimeSliding => "timeSliding",
        }
    }

    /// Return true for the variants advanced by `next_block`.
    pub fn is_time_based(self) -> bool {
        matches!(self, WindowType::TimeTumbling | WindowType::TimeSliding)
    }

    /// Period of the recurring timer a window of this type needs, if any:
    /// `size` for time-tumbling, `resolution` for time-sliding.
    pub fn timer_interval(self, settings: &WindowSettings) -> Option<Duration> {
        match self {
            WindowType::TimeTumbling => Some(Duration::from_millis(settings.size)),
            WindowType::TimeSliding => Some(Duration::from_millis(settings.resolution)),
            WindowType::Tumbling | WindowType::Sliding => None,
        }
    }
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive: `timetumbling` and `TimeTumbling` are both accepted.
impl FromStr for WindowType {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self> {
        WindowType::ALL
            .into_iter()
            .find(|wt| wt.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AggregateError::UnsupportedWindowType(s.to_string()))
    }
}

// ── WindowSettings ────────────────────────────────────────────────────────────

/// Sizing of a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSettings {
    /// Sample count for count windows, milliseconds for time windows.
    pub size: u64,
    /// True when an external timer advances the window.
    pub external_timer: bool,
    /// Slot length in milliseconds; only used by sliding time windows.
    pub resolution: u64,
    /// Free-form options for the aggregate function.
    #[serde(default)]
    pub additional_settings: HashMap<String, String>,
}

impl WindowSettings {
    pub fn new(size: u64) -> Self {
        Self {
            size,
            external_timer: false,
            resolution: 0,
            additional_settings: HashMap::new(),
        }
    }

    pub fn with_resolution(mut self, resolution: u64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_external_timer(mut self, external_timer: bool) -> Self {
        self.external_timer = external_timer;
        self
    }

    pub fn with_additional_settings(mut self, settings: HashMap<String, String>) -> Self {
        self.additional_settings = settings;
        self
    }

    pub fn additional_setting(&self, key: &str) -> Option<&str> {
        self.additional_settings.get(key).map(String::as_str)
    }

    /// Check the sizing invariants for `window_type`.
    pub fn validate(&self, window_type: WindowType) -> Result<()> {
        if self.size == 0 {
            return Err(AggregateError::InvalidWindowSettings(format!(
                "{window_type} window size must be at least 1"
            )));
        }
        if window_type == WindowType::TimeSliding
            && (self.resolution == 0 || self.resolution > self.size)
        {
            return Err(AggregateError::InvalidWindowSettings(format!(
                "timeSliding resolution must be in 1..={}, got {}",
                self.size, self.resolution
            )));
        }
        Ok(())
    }

    fn capacity(&self) -> Result<usize> {
        usize::try_from(self.size).map_err(|_| {
            AggregateError::InvalidWindowSettings(format!(
                "window size {} exceeds addressable capacity",
                self.size
            ))
        })
    }
}

// ── AnyWindow ─────────────────────────────────────────────────────────────────

/// One of the four window variants, as stored per execution context.
#[derive(Debug)]
pub enum AnyWindow {
    Tumbling(TumblingWindow),
    Sliding(SlidingWindow),
    TimeTumbling(TumblingTimeWindow),
    TimeSliding(SlidingTimeWindow),
}

impl AnyWindow {
    /// Validate `settings` and build the variant for `window_type`, with a
    /// zeroed `function` accumulator.
    pub fn create(
        function: AggregateKind,
        window_type: WindowType,
        settings: WindowSettings,
    ) -> Result<Self> {
        Ok(match window_type {
            WindowType::Tumbling => AnyWindow::Tumbling(TumblingWindow::new(function, settings)?),
            WindowType::Sliding => AnyWindow::Sliding(SlidingWindow::new(function, settings)?),
            WindowType::TimeTumbling => {
                AnyWindow::TimeTumbling(TumblingTimeWindow::new(function, settings)?)
            }
            WindowType::TimeSliding => {
                AnyWindow::TimeSliding(SlidingTimeWindow::new(function, settings)?)
            }
        })
    }

    pub fn window_type(&self) -> WindowType {
        match self {
            AnyWindow::Tumbling(_) => WindowType::Tumbling,
            AnyWindow::Sliding(_) => WindowType::Sliding,
            AnyWindow::TimeTumbling(_) => WindowType::TimeTumbling,
            AnyWindow::TimeSliding(_) => WindowType::TimeSliding,
        }
    }

    /// The time-window view of this variant, if it has one.
    pub fn as_time_window_mut(&mut self) -> Option<&mut dyn TimeWindow> {
        match self {
            AnyWindow::TimeTumbling(w) => Some(w),
            AnyWindow::TimeSliding(w) => Some(w),
            AnyWindow::Tumbling(_) | AnyWindow::Sliding(_) => None,
        }
    }

    /// Advance a time window by one block.
    ///
    /// Count windows fail with [`AggregateError::NotTimeWindow`].
    pub fn next_block(&mut self) -> Result<Emission> {
        let window_type = self.window_type();
        self.as_time_window_mut()
            .ok_or(AggregateError::NotTimeWindow(window_type))?
            .next_block()
    }

    fn as_window(&self) -> &dyn Window {
        match self {
            AnyWindow::Tumbling(w) => w,
            AnyWindow::Sliding(w) => w,
            AnyWindow::TimeTumbling(w) => w,
            AnyWindow::TimeSliding(w) => w,
        }
    }

    fn as_window_mut(&mut self) -> &mut dyn Window {
        match self {
            AnyWindow::Tumbling(w) => w,
            AnyWindow::Sliding(w) => w,
            AnyWindow::TimeTumbling(w) => w,
            AnyWindow::TimeSliding(w) => w,
        }
    }
}

impl Window for AnyWindow {
    fn add_sample(&mut self, sample: Value) -> Result<Emission> {
        self.as_window_mut().add_sample(sample)
    }

    fn function(&self) -> AggregateKind {
        self.as_window().function()
    }

    fn settings(&self) -> &WindowSettings {
        self.as_window().settings()
    }

    fn len(&self) -> usize {
        self.as_window().len()
    }

    fn current(&self) -> Option<Value> {
        self.as_window().current()
    }
}

#[cfg(test)]
#[path = "tests/window_tests.rs"]
mod tests;
