// src/note.rs
//
// A single musical event on the tick timeline.

use std::fmt;
use std::str::FromStr;

use crate::error::{TimebaseError, TimebaseResult};
use crate::tempo::Tick;

/// Highest MIDI pitch / velocity value.
pub const MAX_PITCH: u8 = 127;
pub const MAX_VELOCITY: u8 = 127;

/// A note: pitch, velocity and a `[start, end)` tick span.
///
/// `Note` is `Copy`; copying a note is how a note is cloned. The sort key
/// used by [`crate::NoteList`] is `start`.
///
/// `0 <= start < end` holds after construction and after every mutator
/// except [`Note::move_time`], which shifts the span without a floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note {
    pitch: u8,
    velocity: u8,
    start: Tick,
    end: Tick,
}

impl Note {
    pub fn new(pitch: u8, velocity: u8, start: Tick, end: Tick) -> TimebaseResult<Self> {
        if pitch > MAX_PITCH {
            return Err(TimebaseError::InvalidPitch(pitch));
        }
        if velocity > MAX_VELOCITY {
            return Err(TimebaseError::InvalidVelocity(velocity));
        }
        check_span(start, end)?;

        Ok(Self {
            pitch,
            velocity,
            start,
            end,
        })
    }

    #[inline]
    pub fn pitch(&self) -> u8 {
        self.pitch
    }

    #[inline]
    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    #[inline]
    pub fn start(&self) -> Tick {
        self.start
    }

    #[inline]
    pub fn end(&self) -> Tick {
        self.end
    }

    #[inline]
    pub fn duration(&self) -> Tick {
        self.end - self.start
    }

    /// Half-open coverage test: `start <= tick < end`.
    #[inline]
    pub fn covers(&self, tick: Tick) -> bool {
        self.start <= tick && tick < self.end
    }

    // -------------------------------
    // MARK: Mutators
    // -------------------------------

    /// Transpose, clamping to 0..=127.
    pub fn move_pitch(&mut self, delta: i32) {
        self.pitch = (i32::from(self.pitch) + delta).clamp(0, i32::from(MAX_PITCH)) as u8;
    }

    /// Shift the whole note, keeping its duration. No lower bound.
    pub fn move_time(&mut self, delta: Tick) {
        self.start = self.start.saturating_add(delta);
        self.end = self.end.saturating_add(delta);
    }

    /// Move the start, never reaching `end`.
    pub fn move_start(&mut self, delta: Tick) {
        self.start = self.start.saturating_add(delta).max(0).min(self.end.saturating_sub(1));
    }

    /// Move the end, never reaching `start`.
    pub fn move_end(&mut self, delta: Tick) {
        self.end = self.end.saturating_add(delta).max(self.start.saturating_add(1));
    }

    /// Replace both ticks at once.
    pub fn set_span(&mut self, start: Tick, end: Tick) -> TimebaseResult<()> {
        check_span(start, end)?;
        self.start = start;
        self.end = end;
        Ok(())
    }
}

fn check_span(start: Tick, end: Tick) -> TimebaseResult<()> {
    if 0 <= start && start < end {
        Ok(())
    } else {
        Err(TimebaseError::InvalidSpan { start, end })
    }
}

impl TryFrom<(u8, u8, Tick, Tick)> for Note {
    type Error = TimebaseError;

    fn try_from((pitch, velocity, start, end): (u8, u8, Tick, Tick)) -> TimebaseResult<Self> {
        Self::new(pitch, velocity, start, end)
    }
}

/// `pitch:velocity:start:end`
impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.pitch, self.velocity, self.start, self.end
        )
    }
}

impl FromStr for Note {
    type Err = TimebaseError;

    fn from_str(s: &str) -> TimebaseResult<Self> {
        let malformed = || TimebaseError::MalformedNote(s.to_string());

        let fields: Vec<&str> = s.trim().split(':').collect();
        let [pitch, velocity, start, end] = fields.as_slice() else {
            return Err(malformed());
        };

        Self::new(
            pitch.parse().map_err(|_| malformed())?,
            velocity.parse().map_err(|_| malformed())?,
            start.parse().map_err(|_| malformed())?,
            end.parse().map_err(|_| malformed())?,
        )
    }
}
