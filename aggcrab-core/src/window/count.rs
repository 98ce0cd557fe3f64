use super::*;

// ── Tumbling ──────────────────────────────────────────────────────────────────

/// Non-overlapping windows of exactly `size` samples.
///
/// Every `size`-th sample closes the window: its aggregate is reported with
/// `emit = true` and the window starts over empty. In between, the running
/// aggregate of the partial window is reported with `emit = false`.
#[derive(Debug)]
pub struct TumblingWindow {
    settings: WindowSettings,
    capacity: usize,
    buffer: Vec<Value>,
    function: Box<dyn AggregateFunction>,
}

impl TumblingWindow {
    pub fn new(function: AggregateKind, settings: WindowSettings) -> Result<Self> {
        settings.validate(WindowType::Tumbling)?;
        Ok(Self {
            capacity: settings.capacity()?,
            settings,
            buffer: Vec::new(),
            function: function.create(),
        })
    }
}

impl Window for TumblingWindow {
    fn add_sample(&mut self, sample: Value) -> Result<Emission> {
        self.function.update(&sample)?;
        self.buffer.push(sample);

        if self.buffer.len() < self.capacity {
            return Ok(Emission::partial(self.function.finalize()));
        }
        let result = self.function.finalize();
        self.buffer.clear();
        self.function.reset();
        Ok(Emission::boundary(result))
    }

    fn function(&self) -> AggregateKind {
        self.function.kind()
    }

    fn settings(&self) -> &WindowSettings {
        &self.settings
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn current(&self) -> Option<Value> {
        self.function.finalize()
    }
}

// ── Sliding ───────────────────────────────────────────────────────────────────

/// The most recent `size` samples.
///
/// Once the buffer first fills up, every call reports `emit = true`: from
/// then on a full-size window always exists. The oldest sample is evicted
/// before the aggregate is read, so the result always covers at most `size`
/// samples.
#[derive(Debug)]
pub struct SlidingWindow {
    settings: WindowSettings,
    capacity: usize,
    buffer: VecDeque<Value>,
    function: Box<dyn AggregateFunction>,
    full: bool,
}

impl SlidingWindow {
    pub fn new(function: AggregateKind, settings: WindowSettings) -> Result<Self> {
        settings.validate(WindowType::Sliding)?;
        Ok(Self {
            capacity: settings.capacity()?,
            settings,
            buffer: VecDeque::new(),
            function: function.create(),
            full: false,
        })
    }

    /// Retained samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &Value> {
        self.buffer.iter()
    }
}

impl Window for SlidingWindow {
    fn add_sample(&mut self, sample: Value) -> Result<Emission> {
        // Update before evicting: a rejected sample must not cost the oldest one.
        self.function.update(&sample)?;
        self.buffer.push_back(sample);

        if self.buffer.len() > self.capacity {
            if let Some(oldest) = self.buffer.pop_front() {
                if self.function.evict(&oldest) == Eviction::Rescan {
                    self.function.rescan(&mut self.buffer.iter())?;
                }
            }
        }
        if self.buffer.len() == self.capacity {
            self.full = true;
        }

        let result = self.function.finalize();
        Ok(if self.full {
            Emission::boundary(result)
        } else {
            Emission::partial(result)
        })
    }

    fn function(&self) -> AggregateKind {
        self.function.kind()
    }

    fn settings(&self) -> &WindowSettings {
        &self.settings
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn current(&self) -> Option<Value> {
        self.function.finalize()
    }
}
