use super::*;

/// Running numeric total, split into an exact integer part and a float part.
///
/// The integer part is an `i128`, so any number of `i64` additions and
/// their evictions cancel exactly. The float part is only live while at
/// least one float sample is retained; once the last one leaves, it drops
/// back to zero and the total is integral again.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Total {
    int: i128,
    float: f64,
    floats: usize,
}

impl Total {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Add a numeric sample. Returns false (and leaves the total untouched)
    /// for non-numeric samples.
    pub fn add(&mut self, sample: &Value) -> bool {
        match sample {
            Value::Int(v) => self.int += i128::from(*v),
            Value::Float(v) => {
                self.float += v;
                self.floats += 1;
            }
            Value::Text(_) => return false,
        }
        true
    }

    /// Subtract a previously added sample.
    pub fn sub(&mut self, sample: &Value) {
        match sample {
            Value::Int(v) => self.int -= i128::from(*v),
            Value::Float(v) => {
                self.floats = self.floats.saturating_sub(1);
                if self.floats == 0 {
                    self.float = 0.0;
                } else {
                    self.float -= v;
                }
            }
            Value::Text(_) => {}
        }
    }

    /// True while any float sample is part of the total.
    pub fn has_floats(&self) -> bool {
        self.floats > 0
    }

    pub fn as_f64(self) -> f64 {
        self.int as f64 + self.float
    }

    /// `Int` when every retained sample is an integer and the total fits an
    /// `i64`; `Float` otherwise.
    pub fn to_value(self) -> Value {
        match i64::try_from(self.int) {
            Ok(int) if !self.has_floats() => Value::Int(int),
            _ => Value::Float(self.as_f64()),
        }
    }
}

/// `sum`: running total of numeric samples.
#[derive(Debug, Clone)]
pub struct SumAccumulator {
    total: Total,
    len: usize,
}

impl SumAccumulator {
    pub fn new() -> Self {
        Self {
            total: Total::zero(),
            len: 0,
        }
    }
}

impl Default for SumAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregateFunction for SumAccumulator {
    fn kind(&self) -> AggregateKind {
        AggregateKind::Sum
    }

    fn update(&mut self, sample: &Value) -> Result<()> {
        if !self.total.add(sample) {
            return Err(AggregateError::UnsupportedType {
                function: AggregateKind::Sum,
                found: sample.type_name(),
            });
        }
        self.len += 1;
        Ok(())
    }

    fn evict(&mut self, sample: &Value) -> Eviction {
        self.len = self.len.saturating_sub(1);
        if self.len == 0 {
            self.total = Total::zero();
        } else {
            self.total.sub(sample);
        }
        Eviction::Applied
    }

    fn finalize(&self) -> Option<Value> {
        Some(self.total.to_value())
    }

    fn reset(&mut self) {
        self.total = Total::zero();
        self.len = 0;
    }
}
