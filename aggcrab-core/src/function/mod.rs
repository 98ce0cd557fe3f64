//! # Aggregate Functions
//!
//! Incremental accumulators for the five supported aggregates.
//!
//! Each accumulator is updated once per incoming sample and, for sliding
//! windows, reversed once per evicted sample, so the running aggregate never
//! has to be recomputed from the whole buffer. The exception is `min`/`max`:
//! evicting the current extreme forces a rescan of the retained samples.
//!
//! The function is chosen once, when a window is built, via
//! [`AggregateKind::create`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AggregateError, Result};
use crate::types::Value;

mod avg;
mod count;
mod extreme;
mod sum;

pub use avg::*;
pub use count::*;
pub use extreme::*;
pub use sum::*;

// ── AggregateKind ─────────────────────────────────────────────────────────────

/// The closed set of aggregate functions a window can compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateKind {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl AggregateKind {
    pub const ALL: [AggregateKind; 5] = [
        AggregateKind::Sum,
        AggregateKind::Avg,
        AggregateKind::Min,
        AggregateKind::Max,
        AggregateKind::Count,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AggregateKind::Sum => "sum",
            AggregateKind::Avg => "avg",
            AggregateKind::Min => "min",
            AggregateKind::Max => "max",
            AggregateKind::Count => "count",
        }
    }

    /// Build a zeroed accumulator for this function.
    pub fn create(self) -> Box<dyn AggregateFunction> {
        match self {
            AggregateKind::Sum => Box::new(SumAccumulator::new()),
            AggregateKind::Avg => Box::new(AvgAccumulator::new()),
            AggregateKind::Min => Box::new(ExtremeAccumulator::min()),
            AggregateKind::Max => Box::new(ExtremeAccumulator::max()),
            AggregateKind::Count => Box::new(CountAccumulator::new()),
        }
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateKind {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self> {
        AggregateKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AggregateError::UnsupportedFunction(s.to_string()))
    }
}

// ── AggregateFunction ─────────────────────────────────────────────────────────

/// Outcome of removing a sample from an accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eviction {
    /// The accumulator still reflects the retained samples exactly.
    Applied,
    /// The accumulator lost information it cannot rebuild on its own; the
    /// owner must call [`AggregateFunction::rescan`] with the retained samples.
    Rescan,
}

/// Incremental aggregate over the samples currently held by a window.
///
/// Implementations must keep `update` free of side effects when it fails, so
/// a rejected sample never corrupts the running state.
pub trait AggregateFunction: Send + fmt::Debug {
    /// Which function this accumulator computes.
    fn kind(&self) -> AggregateKind;

    /// Fold one sample into the accumulator.
    fn update(&mut self, sample: &Value) -> Result<()>;

    /// Reverse a previous `update` for a sample leaving the window.
    fn evict(&mut self, sample: &Value) -> Eviction;

    /// Current aggregate. `None` means there is no meaningful result.
    fn finalize(&self) -> Option<Value>;

    /// Return to the zero state.
    fn reset(&mut self);

    /// Rebuild from scratch over `retained`.
    fn rescan<'a>(&mut self, retained: &mut dyn Iterator<Item = &'a Value>) -> Result<()> {
        self.reset();
        for sample in retained {
            self.update(sample)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/function_tests.rs"]
mod tests;
