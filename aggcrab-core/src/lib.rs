//! # AggCrab Core
//!
//! Windowed streaming aggregation: samples arrive one at a time, a bounded
//! window (by sample count or by elapsed time) keeps an incrementally
//! maintained aggregate, and every sample or timer tick reports the current
//! result together with whether a window boundary was reached.
//!
//! This crate provides:
//!
//! - [`types`]: [`Value`](types::Value) samples and [`Emission`](types::Emission) results.
//! - [`function`]: the sum/avg/min/max/count accumulators behind
//!   [`AggregateFunction`](function::AggregateFunction).
//! - [`window`]: tumbling and sliding windows, by count and by time, plus the
//!   lock-guarded [`SharedWindow`](window::SharedWindow).
//! - [`settings`]: typed, validated [`AggregateSettings`](settings::AggregateSettings).
//! - [`state`]: per-context [`SharedStorage`](state::SharedStorage).
//! - [`time`]: the [`TimerSupport`](time::TimerSupport) capability with manual and
//!   tokio-backed implementations.
//! - [`activity`]: [`AggregateActivity`](activity::AggregateActivity), which creates a
//!   context's window exactly once and routes samples and ticks into it.

pub mod activity;
pub mod error;
pub mod function;
pub mod settings;
pub mod state;
pub mod time;
pub mod types;
pub mod window;

pub use activity::{
    ActivityContext, AggregateActivity, CollectingSink, EmissionSink, Evaluation, FlowContext,
};
pub use error::{AggregateError, Result};
pub use function::AggregateKind;
pub use settings::AggregateSettings;
pub use types::{Emission, Value};
pub use window::WindowType;
