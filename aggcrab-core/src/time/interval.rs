use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::*;

/// Wall-clock timers, one tokio task per timer.
///
/// Resets are broadcast over a `watch` channel carrying a generation counter;
/// each timer task restarts its interval when the generation changes.
/// Dropping the service aborts its tasks.
pub struct IntervalTimerService {
    handle: Handle,
    next_id: AtomicU64,
    reset_tx: watch::Sender<u64>,
    tasks: Mutex<HashMap<TimerId, JoinHandle<()>>>,
}

impl IntervalTimerService {
    /// Spawn timer tasks onto `handle`.
    pub fn new(handle: Handle) -> Self {
        let (reset_tx, _) = watch::channel(0);
        Self {
            handle,
            next_id: AtomicU64::new(0),
            reset_tx,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Bind to the runtime the caller is running on.
    ///
    /// Fails with [`AggregateError::TimerUnavailable`] outside a tokio runtime.
    pub fn try_current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|err| AggregateError::TimerUnavailable(err.to_string()))
    }

    /// Number of timer tasks still running.
    pub fn active_timers(&self) -> usize {
        self.tasks()
            .values()
            .filter(|task| !task.is_finished())
            .count()
    }

    pub(crate) fn tasks(&self) -> std::sync::MutexGuard<'_, HashMap<TimerId, JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TimerSupport for IntervalTimerService {
    fn create_timer(
        &self,
        interval: Duration,
        callback: TimerCallback,
        recurring: bool,
    ) -> Result<TimerId> {
        interval_millis(interval)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut reset_rx = self.reset_tx.subscribe();

        let task = self.handle.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        callback();
                        if !recurring {
                            break;
                        }
                    }
                    changed = reset_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        ticker.reset();
                    }
                }
            }
        });

        let mut tasks = self.tasks();
        tasks.retain(|_, task| !task.is_finished());
        tasks.insert(id, task);
        drop(tasks);
        tracing::debug!(timer_id = id, ?interval, recurring, "interval timer started");
        Ok(id)
    }

    fn update_timer(&self, reset: bool) {
        if reset {
            self.reset_tx.send_modify(|generation| *generation += 1);
        }
    }

    fn cancel_timer(&self, id: TimerId) -> bool {
        match self.tasks().remove(&id) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    fn cancel_timers(&self) {
        let tasks = std::mem::take(&mut *self.tasks());
        for task in tasks.into_values() {
            task.abort();
        }
    }
}

impl Drop for IntervalTimerService {
    fn drop(&mut self) {
        self.cancel_timers();
    }
}
