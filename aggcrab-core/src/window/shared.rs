use std::sync::{Mutex, MutexGuard};

use super::*;

/// A window shared between the sample-arrival path and the timer path.
///
/// Every operation runs under one exclusive lock, so an `add_sample` and a
/// `next_block` on the same window never interleave.
#[derive(Debug)]
pub struct SharedWindow {
    window_type: WindowType,
    function: AggregateKind,
    inner: Mutex<AnyWindow>,
}

impl SharedWindow {
    pub fn new(window: AnyWindow) -> Self {
        Self {
            window_type: window.window_type(),
            function: window.function(),
            inner: Mutex::new(window),
        }
    }

    pub fn window_type(&self) -> WindowType {
        self.window_type
    }

    pub fn function(&self) -> AggregateKind {
        self.function
    }

    pub fn add_sample(&self, sample: Value) -> Result<Emission> {
        self.lock()?.add_sample(sample)
    }

    pub fn next_block(&self) -> Result<Emission> {
        self.lock()?.next_block()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn current(&self) -> Result<Option<Value>> {
        Ok(self.lock()?.current())
    }

    /// Run `f` against the window while holding its lock.
    pub fn with_window<R>(&self, f: impl FnOnce(&mut AnyWindow) -> R) -> Result<R> {
        let mut guard = self.lock()?;
        Ok(f(&mut *guard))
    }

    fn lock(&self) -> Result<MutexGuard<'_, AnyWindow>> {
        self.inner
            .lock()
            .map_err(|_| AggregateError::LockPoisoned("window"))
    }
}
