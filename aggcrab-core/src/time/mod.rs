//! # Timers
//!
//! The timer collaborator that drives time windows.
//!
//! - [`TimerSupport`]: what the aggregate activity needs from a host timer
//! - [`ManualTimerService`]: deterministic, advanced explicitly by the caller
//! - [`IntervalTimerService`]: tokio tasks ticking on wall-clock intervals

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::error::{AggregateError, Result};
use crate::types::EventTime;

mod interval;
mod timer_service;

pub use interval::*;
pub use timer_service::*;

/// Identifies a registered timer within one timer service.
pub type TimerId = u64;

/// Work run on every tick. Must not block for long: it runs on the timer's
/// own thread or task.
pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

/// Host timer capability offered to an execution context.
pub trait TimerSupport: Send + Sync {
    /// Register `callback` to run every `interval` (or once, if not
    /// `recurring`). The first run happens one `interval` from now.
    fn create_timer(
        &self,
        interval: Duration,
        callback: TimerCallback,
        recurring: bool,
    ) -> Result<TimerId>;

    /// Called on each sample arrival. With `reset`, every active timer's
    /// countdown restarts from now; otherwise the schedule is left alone.
    fn update_timer(&self, reset: bool);

    /// Drop one timer. Returns false if it was unknown or already gone.
    fn cancel_timer(&self, id: TimerId) -> bool;

    /// Drop every timer. Used when the owning context is torn down.
    fn cancel_timers(&self);
}

fn interval_millis(interval: Duration) -> Result<EventTime> {
    let millis = EventTime::try_from(interval.as_millis()).unwrap_or(EventTime::MAX);
    if millis == 0 {
        return Err(AggregateError::TimerUnavailable(format!(
            "timer interval must be at least 1ms, got {interval:?}"
        )));
    }
    Ok(millis)
}

#[cfg(test)]
#[path = "tests/time_tests.rs"]
mod tests;
