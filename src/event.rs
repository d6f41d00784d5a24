// src/event.rs

use crate::note::Note;
use crate::transport::NoteListId;

/// ===============================
/// Playback queue entries
/// ===============================

/// A note handed to the audio engine.
///
/// `time` is an absolute clock time in seconds (see
/// [`crate::Transport::abs_time_in_sec`]) at which the note should start
/// sounding. It may already be in the past for notes picked up late, e.g.
/// right after a loop wrap; the engine should start those immediately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledNote {
    /// The registered list the note came from.
    pub list: NoteListId,
    pub note: Note,
    pub time: f64,
}
