use std::cmp::Ordering;

use super::*;

/// `min` / `max`: the current extreme of the retained samples.
///
/// All accepted samples are mutually ordered: either all numeric (ints and
/// floats mix) or all text. Evicting a sample equal to the current extreme
/// returns [`Eviction::Rescan`], since the runner-up is not tracked.
#[derive(Debug, Clone)]
pub struct ExtremeAccumulator {
    kind: AggregateKind,
    /// Ordering a new sample must have against `current` to replace it.
    wins: Ordering,
    current: Option<Value>,
    len: usize,
}

impl ExtremeAccumulator {
    pub fn min() -> Self {
        Self {
            kind: AggregateKind::Min,
            wins: Ordering::Less,
            current: None,
            len: 0,
        }
    }

    pub fn max() -> Self {
        Self {
            kind: AggregateKind::Max,
            wins: Ordering::Greater,
            current: None,
            len: 0,
        }
    }

    fn unsupported(&self, sample: &Value) -> AggregateError {
        AggregateError::UnsupportedType {
            function: self.kind,
            found: sample.type_name(),
        }
    }
}

impl AggregateFunction for ExtremeAccumulator {
    fn kind(&self) -> AggregateKind {
        self.kind
    }

    fn update(&mut self, sample: &Value) -> Result<()> {
        if !sample.is_ordered() {
            return Err(self.unsupported(sample));
        }
        let replace = match &self.current {
            Some(current) => {
                sample
                    .compare(current)
                    .ok_or_else(|| self.unsupported(sample))?
                    == self.wins
            }
            None => true,
        };
        if replace {
            self.current = Some(sample.clone());
        }
        self.len += 1;
        Ok(())
    }

    fn evict(&mut self, sample: &Value) -> Eviction {
        self.len = self.len.saturating_sub(1);
        if self.len == 0 {
            self.current = None;
            return Eviction::Applied;
        }
        match &self.current {
            Some(current) if sample.compare(current) == Some(Ordering::Equal) => Eviction::Rescan,
            _ => Eviction::Applied,
        }
    }

    fn finalize(&self) -> Option<Value> {
        self.current.clone()
    }

    fn reset(&mut self) {
        self.current = None;
        self.len = 0;
    }
}
