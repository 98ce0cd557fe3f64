use super::*;

/// `count`: number of samples, of any type.
#[derive(Debug, Clone, Default)]
pub struct CountAccumulator {
    count: u64,
}

impl CountAccumulator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AggregateFunction for CountAccumulator {
    fn kind(&self) -> AggregateKind {
        AggregateKind::Count
    }

    fn update(&mut self, _sample: &Value) -> Result<()> {
        self.count += 1;
        Ok(())
    }

    fn evict(&mut self, _sample: &Value) -> Eviction {
        self.count = self.count.saturating_sub(1);
        Eviction::Applied
    }

    fn finalize(&self) -> Option<Value> {
        Some(Value::Int(self.count as i64))
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}
