// src/config.rs
//
// Transport configuration.

use std::time::Duration;

use crate::error::{TimebaseError, TimebaseResult};
use crate::tempo::{LookaheadPolicy, TICKS_PER_BEAT, Tempo, Tick};

const DEFAULT_BPM: f64 = 120.0;
const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_millis(10);
/// Four bars of 4/4.
const DEFAULT_LOOP_END: Tick = TICKS_PER_BEAT * 16;

/// Initial state and tuning knobs for a [`crate::Transport`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportConfig {
    /// Initial tempo.
    pub bpm: f64,
    pub lookahead: LookaheadPolicy,
    /// Period of the scheduler thread. Must be shorter than `lookahead.min`.
    pub cycle_interval: Duration,
    pub loop_start: Tick,
    pub loop_end: Tick,
    /// Whether the loop region is engaged from the start.
    pub looping: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            lookahead: LookaheadPolicy::default(),
            cycle_interval: DEFAULT_CYCLE_INTERVAL,
            loop_start: 0,
            loop_end: DEFAULT_LOOP_END,
            looping: false,
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set initial tempo.
    pub fn with_bpm(mut self, bpm: f64) -> Self {
        self.bpm = bpm;
        self
    }

    /// Builder: set lookahead policy.
    pub fn with_lookahead(mut self, lookahead: LookaheadPolicy) -> Self {
        self.lookahead = lookahead;
        self
    }

    /// Builder: set scheduler period.
    pub fn with_cycle_interval(mut self, interval: Duration) -> Self {
        self.cycle_interval = interval;
        self
    }

    /// Builder: set and engage a loop region.
    pub fn with_loop(mut self, start: Tick, end: Tick) -> Self {
        self.loop_start = start;
        self.loop_end = end;
        self.looping = true;
        self
    }

    /// Check every field, returning the first problem found.
    pub fn validate(&self) -> TimebaseResult<()> {
        Tempo::new(self.bpm)?;
        self.lookahead.validate()?;

        if self.cycle_interval.is_zero()
            || self.cycle_interval.as_secs_f64() >= self.lookahead.min
        {
            return Err(TimebaseError::InvalidCycleInterval);
        }

        if self.loop_start < 0 || self.loop_end <= self.loop_start {
            return Err(TimebaseError::InvalidLoop {
                start: self.loop_start,
                end: self.loop_end,
            });
        }

        Ok(())
    }
}
