use super::*;

// ── Tumbling ──────────────────────────────────────────────────────────────────

/// Collects every sample between two timer ticks.
///
/// Sample arrival never closes the window. Each [`next_block`](TimeWindow::next_block)
/// reports the aggregate of the samples since the previous tick (the
/// function's identity, or no result, if there were none) and empties it.
#[derive(Debug)]
pub struct TumblingTimeWindow {
    settings: WindowSettings,
    buffer: Vec<Value>,
    function: Box<dyn AggregateFunction>,
}

impl TumblingTimeWindow {
    pub fn new(function: AggregateKind, settings: WindowSettings) -> Result<Self> {
        settings.validate(WindowType::TimeTumbling)?;
        Ok(Self {
            settings,
            buffer: Vec::new(),
            function: function.create(),
        })
    }
}

impl Window for TumblingTimeWindow {
    fn add_sample(&mut self, sample: Value) -> Result<Emission> {
        self.function.update(&sample)?;
        self.buffer.push(sample);
        Ok(Emission::partial(self.function.finalize()))
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

impl TimeWindow for TumblingTimeWindow {
    fn next_block(&mut self) -> Result<Emission> {
        let result = self.function.finalize();
        self.buffer.clear();
        self.function.reset();
        Ok(Emission::boundary(result))
    }
}

// ── Sliding ───────────────────────────────────────────────────────────────────

/// The samples of the last `size` milliseconds, advanced every `resolution`
/// milliseconds.
///
/// Samples land in an open slot. Each tick seals that slot and drops the
/// oldest sealed slots so that at most `size / resolution` remain; a
/// sample's slot position is its logical timestamp.
#[derive(Debug)]
pub struct SlidingTimeWindow {
    settings: WindowSettings,
    slots: usize,
    sealed: VecDeque<Vec<Value>>,
    open: Vec<Value>,
    len: usize,
    function: Box<dyn AggregateFunction>,
}

impl SlidingTimeWindow {
    pub fn new(function: AggregateKind, settings: WindowSettings) -> Result<Self> {
        settings.validate(WindowType::TimeSliding)?;
        let slots = usize::try_from(settings.size / settings.resolution).map_err(|_| {
            AggregateError::InvalidWindowSettings(format!(
                "timeSliding window spans too many slots: {}",
                settings.size / settings.resolution
            ))
        })?;
        Ok(Self {
            settings,
            slots,
            sealed: VecDeque::new(),
            open: Vec::new(),
            len: 0,
            function: function.create(),
        })
    }

    /// Number of sealed slots retained once the window is warm.
    pub fn slot_count(&self) -> usize {
        self.slots
    }

    /// Retained samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &Value> {
        self.sealed.iter().flatten().chain(self.open.iter())
    }
}

impl Window for SlidingTimeWindow {
    fn add_sample(&mut self, sample: Value) -> Result<Emission> {
        self.function.update(&sample)?;
        self.open.push(sample);
        self.len += 1;
        Ok(Emission::partial(self.function.finalize()))
    }

    fn function(&self) -> AggregateKind {
        self.function.kind()
    }

    fn settings(&self) -> &WindowSettings {
        &self.settings
    }

    fn len(&self) -> usize {
        self.len
    }

    fn current(&self) -> Option<Value> {
        self.function.finalize()
    }
}

impl TimeWindow for SlidingTimeWindow {
    fn next_block(&mut self) -> Result<Emission> {
        self.sealed.push_back(std::mem::take(&mut self.open));

        let mut rescan = false;
        while self.sealed.len() > self.slots {
            let Some(expired) = self.sealed.pop_front() else {
                break;
            };
            for sample in &expired {
                rescan |= self.function.evict(sample) == Eviction::Rescan;
            }
            self.len -= expired.len();
        }
        if rescan {
            self.function.rescan(&mut self.sealed.iter().flatten())?;
        }

        Ok(Emission::boundary(self.function.finalize()))
    }
}
