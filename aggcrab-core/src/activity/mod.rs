//! # Aggregate Activity
//!
//! The entry point a flow engine calls once per sample.
//!
//! An [`AggregateActivity`] owns validated settings and nothing else; the
//! window it aggregates into lives in the execution context's
//! [`SharedStorage`] under [`WINDOW_KEY`]. The first evaluation in a context
//! creates that window (exactly once, even under concurrent first calls) and,
//! for time windows, registers the recurring timer that advances it.
//!
//! ```text
//!   sample ──► eval ──► SharedWindow::add_sample ──┐
//!                                                   ├──► EmissionSink::report
//!   timer tick ──► SharedWindow::next_block ───────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::Serialize;

use crate::error::{AggregateError, Result};
use crate::settings::AggregateSettings;
use crate::state::{SharedStorage, SharedValue, WINDOW_KEY};
use crate::time::{TimerCallback, TimerSupport};
use crate::types::{Emission, Value};
use crate::window::{AnyWindow, SharedWindow};

mod context;

pub use context::*;

// ── Host capabilities ─────────────────────────────────────────────────────────

/// Output port of the activity. Evaluations and timer ticks both report here.
pub trait EmissionSink: Send + Sync {
    fn report(&self, emission: &Emission);
}

/// What an activity can ask of the flow execution it runs in.
pub trait ActivityContext {
    /// Per-context storage, or `None` if the host has no shared state.
    fn shared_storage(&self) -> Option<Arc<SharedStorage>>;

    /// Timer capability, or `None` if time windows must be advanced by hand.
    fn timer_support(&self) -> Option<Arc<dyn TimerSupport>>;

    fn output(&self) -> Arc<dyn EmissionSink>;
}

// ── AggregateActivity ─────────────────────────────────────────────────────────

/// Outcome of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    #[serde(flatten)]
    pub emission: Emission,
    /// False only when `proceedOnlyOnEmit` is set and no boundary was hit.
    pub done: bool,
}

#[derive(Debug)]
pub struct AggregateActivity {
    settings: AggregateSettings,
    creation: Mutex<()>,
}

impl AggregateActivity {
    pub fn new(settings: AggregateSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            creation: Mutex::new(()),
        })
    }

    /// Shorthand for [`AggregateSettings::from_map`] followed by [`Self::new`].
    pub fn from_map(values: &HashMap<String, String>) -> Result<Self> {
        Self::new(AggregateSettings::from_map(values)?)
    }

    pub fn settings(&self) -> &AggregateSettings {
        &self.settings
    }

    /// Add `sample` to the context's window, creating the window first if
    /// this is the context's first evaluation.
    ///
    /// The emission is reported to the context's output and also returned.
    /// A sample the function rejects leaves the window untouched and reports
    /// nothing.
    pub fn eval(&self, ctx: &dyn ActivityContext, sample: Value) -> Result<Evaluation> {
        let storage = ctx
            .shared_storage()
            .ok_or(AggregateError::SharedStateUnsupported)?;
        let window = self.window(ctx, &storage)?;

        let emission = window.add_sample(sample)?;
        if let Some(timer) = ctx.timer_support() {
            timer.update_timer(self.settings.reset_timer_on_sample);
        }
        ctx.output().report(&emission);
        Ok(self.evaluation(emission))
    }

    /// Advance the context's time window by one block, as a timer tick would.
    ///
    /// For hosts without timer support. Returns `Ok(None)` if no window has
    /// been created yet.
    pub fn next_block(&self, ctx: &dyn ActivityContext) -> Result<Option<Evaluation>> {
        let storage = ctx
            .shared_storage()
            .ok_or(AggregateError::SharedStateUnsupported)?;
        let Some(window) = storage.window(WINDOW_KEY)? else {
            return Ok(None);
        };
        let emission = window.next_block()?;
        ctx.output().report(&emission);
        Ok(Some(self.evaluation(emission)))
    }

    fn evaluation(&self, emission: Emission) -> Evaluation {
        let done = !(self.settings.proceed_only_on_emit && !emission.emit);
        Evaluation { emission, done }
    }

    /// Double-checked lookup: the common path is a shared read of the slot;
    /// only a miss takes the creation lock and looks again.
    fn window(
        &self,
        ctx: &dyn ActivityContext,
        storage: &SharedStorage,
    ) -> Result<Arc<SharedWindow>> {
        if let Some(window) = storage.window(WINDOW_KEY)? {
            return Ok(window);
        }

        let _creation = self
            .creation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(window) = storage.window(WINDOW_KEY)? {
            return Ok(window);
        }

        self.install_window(ctx, |window| {
            storage.set(WINDOW_KEY, SharedValue::Window(window))
        })
    }

    /// Build the window, register its timer and hand it to `store`.
    ///
    /// If `store` fails, the timer registered for the window is cancelled
    /// again, so nothing outlives the failed attempt.
    fn install_window(
        &self,
        ctx: &dyn ActivityContext,
        store: impl FnOnce(Arc<SharedWindow>) -> Result<()>,
    ) -> Result<Arc<SharedWindow>> {
        let timer = ctx.timer_support();
        let window_type = self.settings.window_type;
        let window_settings = self.settings.window_settings(timer.is_some());
        let interval = window_type.timer_interval(&window_settings);

        let window = Arc::new(SharedWindow::new(AnyWindow::create(
            self.settings.function,
            window_type,
            window_settings,
        )?));

        let registration = match (timer, interval) {
            (Some(timer), Some(interval)) => {
                let callback = tick_callback(Arc::downgrade(&window), ctx.output());
                let timer_id = timer.create_timer(interval, callback, true)?;
                tracing::debug!(timer_id, ?interval, %window_type, "window timer registered");
                Some((timer, timer_id))
            }
            _ => None,
        };

        if let Err(err) = store(Arc::clone(&window)) {
            if let Some((timer, timer_id)) = registration {
                timer.cancel_timer(timer_id);
            }
            return Err(err);
        }

        tracing::debug!(
            function = %self.settings.function,
            %window_type,
            size = self.settings.window_size,
            "window created"
        );
        Ok(window)
    }
}

/// The recurring timer body for a time window.
///
/// Holds the window weakly: once the context drops its slot, ticks become
/// no-ops instead of keeping the window alive.
fn tick_callback(window: Weak<SharedWindow>, output: Arc<dyn EmissionSink>) -> TimerCallback {
    Arc::new(move || {
        let Some(window) = window.upgrade() else {
            return;
        };
        match window.next_block() {
            Ok(emission) => output.report(&emission),
            Err(err) => tracing::warn!(
                window_type = %window.window_type(),
                error = %err,
                "timer tick failed"
            ),
        }
    })
}

#[cfg(test)]
#[path = "tests/activity_tests.rs"]
mod tests;
