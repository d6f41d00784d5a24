// src/error.rs
//
// Errors raised synchronously by mutating operations.
//
// Lookups that find nothing are not errors: they come back as `None`,
// `false` or an empty `Vec`. The scheduling loop itself never fails.

use thiserror::Error;

use crate::tempo::Tick;

/// Error returned by a rejected call. State is left unchanged.
#[derive(Debug, Error)]
pub enum TimebaseError {
    /// BPM was zero, negative, NaN or infinite.
    #[error("tempo must be a positive, finite BPM (got {0})")]
    InvalidTempo(f64),

    #[error("pitch {0} is outside 0..=127")]
    InvalidPitch(u8),

    #[error("velocity {0} is outside 0..=127")]
    InvalidVelocity(u8),

    /// A note needs `0 <= start < end`.
    #[error("note span {start}..{end} must satisfy 0 <= start < end")]
    InvalidSpan { start: Tick, end: Tick },

    /// A loop needs `0 <= start < end`.
    #[error("loop {start}..{end} must satisfy 0 <= start < end")]
    InvalidLoop { start: Tick, end: Tick },

    #[error("position {0} is before tick 0")]
    NegativePosition(Tick),

    #[error("time {0} is not a finite number of seconds")]
    NonFiniteTime(f64),

    #[error("cannot step backwards by {0} ticks")]
    NegativeStep(Tick),

    #[error("lookahead window {min}s..{max}s is empty or not positive")]
    InvalidLookahead { min: f64, max: f64 },

    #[error("cycle interval must be non-zero and shorter than the minimum lookahead")]
    InvalidCycleInterval,

    #[error("malformed note {0:?}, expected pitch:velocity:start:end")]
    MalformedNote(String),

    /// The scheduler thread could not be spawned.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result of a fallible timebase operation.
pub type TimebaseResult<T> = Result<T, TimebaseError>;
