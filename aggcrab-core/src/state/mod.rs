//! # Shared State
//!
//! Per-execution-context storage shared by every evaluation of one flow
//! instance.
//!
//! Entries are a tagged [`SharedValue`], so reading the window slot is a
//! variant match that fails explicitly when the slot holds something else.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{AggregateError, Result};
use crate::types::Value;
use crate::window::SharedWindow;

/// Fixed key under which an execution context stores its window.
pub const WINDOW_KEY: &str = "window";

/// An entry in [`SharedStorage`].
#[derive(Debug, Clone)]
pub enum SharedValue {
    Window(Arc<SharedWindow>),
    Value(Value),
}

/// In-memory slot map for one execution context.
///
/// Readers share an `RwLock`; a lookup never blocks on another lookup.
#[derive(Debug, Default)]
pub struct SharedStorage {
    entries: RwLock<HashMap<String, SharedValue>>,
}

impl SharedStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Result<Option<SharedValue>> {
        Ok(self
            .entries
            .read()
            .map_err(|_| AggregateError::LockPoisoned("shared storage"))?
            .get(key)
            .cloned())
    }

    pub fn set(&self, key: impl Into<String>, value: SharedValue) -> Result<()> {
        self.entries
            .write()
            .map_err(|_| AggregateError::LockPoisoned("shared storage"))?
            .insert(key.into(), value);
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<Option<SharedValue>> {
        Ok(self
            .entries
            .write()
            .map_err(|_| AggregateError::LockPoisoned("shared storage"))?
            .remove(key))
    }

    /// The window stored under `key`, if any.
    ///
    /// Fails with [`AggregateError::SharedStateMismatch`] when the entry
    /// exists but is not a window.
    pub fn window(&self, key: &str) -> Result<Option<Arc<SharedWindow>>> {
        match self.get(key)? {
            None => Ok(None),
            Some(SharedValue::Window(window)) => Ok(Some(window)),
            Some(SharedValue::Value(_)) => Err(AggregateError::SharedStateMismatch {
                key: key.to_string(),
            }),
        }
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self
            .entries
            .read()
            .map_err(|_| AggregateError::LockPoisoned("shared storage"))?
            .len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
