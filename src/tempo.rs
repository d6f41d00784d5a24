// src/tempo.rs

use crate::error::{TimebaseError, TimebaseResult};

/// Musical time unit. Signed so that `Note::move_time` can shift past zero.
pub type Tick = i64;

/// Resolution of the timeline: ticks per beat (quarter note).
pub const TICKS_PER_BEAT: Tick = 480;

const SECONDS_PER_MINUTE: f64 = 60.0;

//
// ===============================
// MARK: Beat/tick notation
// ===============================
//

/// A tick position split into whole beats and the remaining ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Mbt {
    pub beat: Tick,
    pub tick: Tick,
}

/// Split a tick position into beats and remainder ticks.
pub fn tick_to_mbt(tick: Tick) -> Mbt {
    Mbt {
        beat: tick.div_euclid(TICKS_PER_BEAT),
        tick: tick.rem_euclid(TICKS_PER_BEAT),
    }
}

/// Inverse of [`tick_to_mbt`].
pub fn mbt_to_tick(mbt: Mbt) -> Tick {
    mbt.beat * TICKS_PER_BEAT + mbt.tick
}

//
// ===============================
// MARK: Tempo
// ===============================
//

/// Tempo in beats per minute.
///
/// Seconds-per-beat, seconds-per-tick and the lookahead are all derived
/// from the BPM on every call, so they can never go stale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: 120.0 }
    }
}

impl Tempo {
    /// Returns `InvalidTempo` unless `bpm` is positive and finite.
    pub fn new(bpm: f64) -> TimebaseResult<Self> {
        if bpm > 0.0 && bpm.is_finite() {
            Ok(Self { bpm })
        } else {
            Err(TimebaseError::InvalidTempo(bpm))
        }
    }

    #[inline]
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Beat duration in seconds (BIS).
    #[inline]
    pub fn seconds_per_beat(&self) -> f64 {
        SECONDS_PER_MINUTE / self.bpm
    }

    /// Tick duration in seconds (TIS).
    #[inline]
    pub fn seconds_per_tick(&self) -> f64 {
        self.seconds_per_beat() / TICKS_PER_BEAT as f64
    }

    /// Convert a (possibly fractional) tick count to seconds.
    ///
    /// Multiplies by the beat length before dividing by the resolution so
    /// whole beats map to exact binary fractions (480 ticks at 120 BPM is
    /// exactly 0.5 s).
    #[inline]
    pub fn ticks_to_seconds(&self, ticks: f64) -> f64 {
        ticks * self.seconds_per_beat() / TICKS_PER_BEAT as f64
    }

    /// Convert seconds to a fractional tick count.
    #[inline]
    pub fn seconds_to_ticks(&self, seconds: f64) -> f64 {
        seconds * TICKS_PER_BEAT as f64 / self.seconds_per_beat()
    }
}

//
// ===============================
// MARK: Lookahead
// ===============================
//

/// How far ahead of the playhead the scheduler selects notes.
///
/// The window is the real-time length of `ticks` at the current tempo,
/// clamped to `[min, max]` seconds: slow tempos don't add unbounded
/// latency and fast tempos keep a usable safety margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookaheadPolicy {
    pub ticks: Tick,
    pub min: f64,
    pub max: f64,
}

impl Default for LookaheadPolicy {
    fn default() -> Self {
        Self {
            ticks: TICKS_PER_BEAT / 4,
            min: 1.0 / 15.0,
            max: 2.0 / 3.0,
        }
    }
}

impl LookaheadPolicy {
    /// Lookahead in seconds for a tempo.
    pub fn seconds(&self, tempo: &Tempo) -> f64 {
        tempo
            .ticks_to_seconds(self.ticks as f64)
            .clamp(self.min, self.max)
    }

    pub fn validate(&self) -> TimebaseResult<()> {
        let valid = self.min > 0.0 && self.min <= self.max && self.max.is_finite();
        if valid {
            Ok(())
        } else {
            Err(TimebaseError::InvalidLookahead {
                min: self.min,
                max: self.max,
            })
        }
    }
}
