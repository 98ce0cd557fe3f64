use super::*;

/// `avg`: numeric total and sample count; the result is always a float.
#[derive(Debug, Clone)]
pub struct AvgAccumulator {
    total: Total,
    count: u64,
}

impl AvgAccumulator {
    pub fn new() -> Self {
        Self {
            total: Total::zero(),
            count: 0,
        }
    }

    /// Arithmetic mean of the accumulated samples.
    ///
    /// Fails with [`AggregateError::DivisionByZero`] when nothing has been
    /// accumulated.
    pub fn mean(&self) -> Result<f64> {
        if self.count == 0 {
            return Err(AggregateError::DivisionByZero);
        }
        Ok(self.total.as_f64() / self.count as f64)
    }
}

impl Default for AvgAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregateFunction for AvgAccumulator {
    fn kind(&self) -> AggregateKind {
        AggregateKind::Avg
    }

    fn update(&mut self, sample: &Value) -> Result<()> {
        if !self.total.add(sample) {
            return Err(AggregateError::UnsupportedType {
                function: AggregateKind::Avg,
                found: sample.type_name(),
            });
        }
        self.count += 1;
        Ok(())
    }

    fn evict(&mut self, sample: &Value) -> Eviction {
        self.count = self.count.saturating_sub(1);
        if self.count == 0 {
            self.total = Total::zero();
        } else {
            self.total.sub(sample);
        }
        Eviction::Applied
    }

    /// An empty window has no average; that is reported as `None`, not as an
    /// error and not as zero.
    fn finalize(&self) -> Option<Value> {
        self.mean().ok().map(Value::Float)
    }

    fn reset(&mut self) {
        self.total = Total::zero();
        self.count = 0;
    }
}
