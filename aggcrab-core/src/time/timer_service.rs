use super::*;

struct TimerEntry {
    interval_ms: EventTime,
    callback: TimerCallback,
    recurring: bool,
    fire_at: EventTime,
}

#[derive(Default)]
struct TimerState {
    now: EventTime,
    next_id: TimerId,
    timers: HashMap<TimerId, TimerEntry>,
    /// Sorted map: fire_at -> ids of timers due at that time.
    schedule: BTreeMap<EventTime, BTreeSet<TimerId>>,
}

impl TimerState {
    fn schedule(&mut self, id: TimerId, fire_at: EventTime) {
        self.schedule.entry(fire_at).or_default().insert(id);
    }

    fn unschedule(&mut self, id: TimerId, fire_at: EventTime) {
        if let Some(ids) = self.schedule.get_mut(&fire_at) {
            ids.remove(&id);
            if ids.is_empty() {
                self.schedule.remove(&fire_at);
            }
        }
    }

    /// Pop the earliest batch due at or before `target`, re-arming recurring
    /// timers and dropping one-shot ones.
    fn pop_due(&mut self, target: EventTime) -> Option<Vec<TimerCallback>> {
        let fire_at = *self.schedule.range(..=target).next()?.0;
        let ids = self.schedule.remove(&fire_at).unwrap_or_default();
        self.now = self.now.max(fire_at);

        let mut callbacks = Vec::with_capacity(ids.len());
        let mut rearm = Vec::new();
        for id in ids {
            let Some(entry) = self.timers.get_mut(&id) else {
                continue;
            };
            callbacks.push(Arc::clone(&entry.callback));
            if entry.recurring {
                entry.fire_at = fire_at.saturating_add(entry.interval_ms);
                rearm.push((id, entry.fire_at));
            } else {
                self.timers.remove(&id);
            }
        }
        for (id, next) in rearm {
            self.schedule(id, next);
        }
        Some(callbacks)
    }
}

/// A timer service whose clock only moves when told to.
///
/// Timers are kept sorted by fire time in a `BTreeMap`, so advancing the
/// clock is a range scan over the due entries. Callbacks run on the thread
/// that advances the clock, in fire-time order, and never under the
/// service's own lock, so a callback may call back into the service.
pub struct ManualTimerService {
    state: Mutex<TimerState>,
}

impl ManualTimerService {
    /// Create an empty service with its clock at 0.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TimerState::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, TimerState> {
        // Callbacks never run under this lock, so the state stays consistent
        // even if a previous holder panicked.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current clock value in milliseconds.
    pub fn now(&self) -> EventTime {
        self.state().now
    }

    /// Move the clock forward by `delta`, firing everything that comes due.
    ///
    /// Returns the number of callbacks run.
    pub fn advance_by(&self, delta: Duration) -> usize {
        let target = self
            .now()
            .saturating_add(EventTime::try_from(delta.as_millis()).unwrap_or(EventTime::MAX));
        self.advance_to(target)
    }

    /// Move the clock to `target`, firing every timer due at or before it.
    /// A recurring timer fires once per elapsed interval.
    ///
    /// Returns the number of callbacks run.
    pub fn advance_to(&self, target: EventTime) -> usize {
        let mut fired = 0;
        loop {
            let due = self.state().pop_due(target);
            let Some(callbacks) = due else {
                break;
            };
            for callback in callbacks {
                callback();
                fired += 1;
            }
        }
        let mut state = self.state();
        state.now = state.now.max(target);
        fired
    }

    /// Fire time of the earliest pending timer, or `None`.
    pub fn next_timer(&self) -> Option<EventTime> {
        self.state().schedule.keys().next().copied()
    }

    /// Number of registered timers.
    pub fn len(&self) -> usize {
        self.state().timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().timers.is_empty()
    }
}

impl Default for ManualTimerService {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerSupport for ManualTimerService {
    fn create_timer(
        &self,
        interval: Duration,
        callback: TimerCallback,
        recurring: bool,
    ) -> Result<TimerId> {
        let interval_ms = interval_millis(interval)?;
        let mut state = self.state();
        let id = state.next_id;
        state.next_id += 1;
        let fire_at = state.now.saturating_add(interval_ms);
        state.timers.insert(
            id,
            TimerEntry {
                interval_ms,
                callback,
                recurring,
                fire_at,
            },
        );
        state.schedule(id, fire_at);
        Ok(id)
    }

    fn update_timer(&self, reset: bool) {
        if !reset {
            return;
        }
        let mut state = self.state();
        let now = state.now;
        let moves: Vec<(TimerId, EventTime, EventTime)> = state
            .timers
            .iter_mut()
            .map(|(id, entry)| {
                let old = entry.fire_at;
                entry.fire_at = now.saturating_add(entry.interval_ms);
                (*id, old, entry.fire_at)
            })
            .collect();
        for (id, old, new) in moves {
            state.unschedule(id, old);
            state.schedule(id, new);
        }
    }

    fn cancel_timer(&self, id: TimerId) -> bool {
        let mut state = self.state();
        let Some(entry) = state.timers.remove(&id) else {
            return false;
        };
        state.unschedule(id, entry.fire_at);
        true
    }

    fn cancel_timers(&self) {
        let mut state = self.state();
        state.timers.clear();
        state.schedule.clear();
    }
}
