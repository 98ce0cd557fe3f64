use super::*;

/// In-process [`ActivityContext`]: one flow execution's storage, timer and
/// output.
///
/// Storage is present by default; timer support is opt-in.
#[derive(Clone)]
pub struct FlowContext {
    storage: Option<Arc<SharedStorage>>,
    timer: Option<Arc<dyn TimerSupport>>,
    output: Arc<dyn EmissionSink>,
}

impl FlowContext {
    pub fn new(output: Arc<dyn EmissionSink>) -> Self {
        Self {
            storage: Some(Arc::new(SharedStorage::new())),
            timer: None,
            output,
        }
    }

    pub fn with_timer(mut self, timer: Arc<dyn TimerSupport>) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Simulate a host that offers no shared state.
    pub fn without_shared_storage(mut self) -> Self {
        self.storage = None;
        self
    }

    pub fn storage(&self) -> Option<&Arc<SharedStorage>> {
        self.storage.as_ref()
    }

    /// End of the flow execution: cancel its timers and drop its window.
    pub fn teardown(&self) -> Result<()> {
        if let Some(timer) = &self.timer {
            timer.cancel_timers();
        }
        if let Some(storage) = &self.storage {
            storage.remove(WINDOW_KEY)?;
        }
        tracing::debug!("flow context torn down");
        Ok(())
    }
}

impl ActivityContext for FlowContext {
    fn shared_storage(&self) -> Option<Arc<SharedStorage>> {
        self.storage.clone()
    }

    fn timer_support(&self) -> Option<Arc<dyn TimerSupport>> {
        self.timer.clone()
    }

    fn output(&self) -> Arc<dyn EmissionSink> {
        Arc::clone(&self.output)
    }
}

// ── Sinks ─────────────────────────────────────────────────────────────────────

/// Keeps every reported emission in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    emissions: Mutex<Vec<Emission>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything reported so far, oldest first.
    pub fn emissions(&self) -> Vec<Emission> {
        self.lock().clone()
    }

    /// Drain the collected emissions.
    pub fn take(&self) -> Vec<Emission> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Emission>> {
        self.emissions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EmissionSink for CollectingSink {
    fn report(&self, emission: &Emission) {
        self.lock().push(emission.clone());
    }
}

/// Discards every emission.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EmissionSink for NullSink {
    fn report(&self, _emission: &Emission) {}
}
