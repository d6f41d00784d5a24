// src/lib.rs
//
// Musical-time scheduling: notes in ticks, a transport that turns them into
// clock times ahead of when they should sound.

mod clock;
mod config;
mod error;
mod event;
mod note;
mod note_list;
mod scheduler;
mod tempo;
mod transport;

#[cfg(feature = "web")]
pub mod wasm;


// Re-export key types for Rust consumers
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TransportConfig;
pub use error::{TimebaseError, TimebaseResult};
pub use event::ScheduledNote;
pub use note::{MAX_PITCH, MAX_VELOCITY, Note};
pub use note_list::{NoteId, NoteList};
pub use scheduler::{Scheduler, SharedTransport};
pub use tempo::{LookaheadPolicy, Mbt, TICKS_PER_BEAT, Tempo, Tick, mbt_to_tick, tick_to_mbt};
pub use transport::{NoteListId, Transport};
