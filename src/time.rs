//! Fixed-timestep game clock using an accumulator pattern.
//!
//! The worker wakes on a timer whose real period drifts. GameTime converts
//! the wall-clock deltas it observes into a whole number of fixed ticks, so
//! the economy always advances in `ms_per_tick` steps and stays
//! deterministic and testable.

#[derive(Clone, Debug)]
pub struct GameTime {
    /// Milliseconds per tick (e.g. 50ms = 20 ticks/sec)
    ms_per_tick: u64,
    /// Longest delta accepted from a single update
    max_catchup_ms: u64,
    /// Accumulated milliseconds not yet consumed as ticks
    accumulator: u64,
    /// Total elapsed ticks since creation
    pub total_ticks: u64,
    /// Timestamp of the last update (ms), None if first frame
    last_timestamp: Option<u64>,
}

impl GameTime {
    /// `ms_per_tick` must be positive; zero is treated as one.
    pub fn new(ms_per_tick: u64, max_catchup_ms: u64) -> Self {
        Self {
            ms_per_tick: ms_per_tick.max(1),
            max_catchup_ms,
            accumulator: 0,
            total_ticks: 0,
            last_timestamp: None,
        }
    }

    pub fn ms_per_tick(&self) -> u64 {
        self.ms_per_tick
    }

    /// Feed a monotonic timestamp in milliseconds.
    /// Returns the number of whole ticks to process this frame.
    pub fn update(&mut self, now_ms: u64) -> u32 {
        let delta = match self.last_timestamp {
            // Clamp to avoid a spiral of death after a long stall
            Some(prev) => now_ms.saturating_sub(prev).min(self.max_catchup_ms),
            None => 0,
        };
        self.last_timestamp = Some(now_ms);

        self.accumulator += delta;
        let ticks = self.accumulator / self.ms_per_tick;
        self.accumulator -= ticks * self.ms_per_tick;
        self.total_ticks += ticks;
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }
}
