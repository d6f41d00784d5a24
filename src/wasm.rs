//! WebAssembly bindings via wasm-bindgen for browser integration.
//!
//! This module is only compiled when the `web` feature is enabled.
//!
//! # Usage
//!
//! Build with wasm-pack:
//! ```bash
//! wasm-pack build --target web --features web
//! ```
//!
//! # JavaScript Example
//!
//! ```javascript
//! import init, { timebase_init, TimebaseTransport } from './timebase.js';
//!
//! await init();
//! timebase_init();
//!
//! const transport = new TimebaseTransport(120);
//! const lead = transport.create_note_list();
//! transport.add_note(lead, 60, 100, 0, 240);
//! transport.start();
//!
//! // Drive from a timer; the AudioContext is the clock
//! setInterval(() => {
//!     transport.set_clock(ctx.currentTime);
//!     transport.run_cycle();
//!     const q = transport.drain_queue();
//!     for (let i = 0; i < q.length; i += 5) {
//!         playNote(q[i], q[i + 1], q[i + 4], (q[i + 3] - q[i + 2]));
//!     }
//! }, 10);
//! ```

use wasm_bindgen::prelude::*;

use crate::clock::ManualClock;
use crate::note::Note;
use crate::note_list::NoteList;
use crate::tempo::Tick;
use crate::transport::Transport;

/// Values per entry in [`TimebaseTransport::drain_queue`].
const QUEUE_STRIDE: usize = 5;

// ═══════════════════════════════════════════════════════════════════════════
// Initialization
// ═══════════════════════════════════════════════════════════════════════════

/// Initialize the wasm module. Call this once before using any other functions.
/// Sets up panic hooks and console logging.
#[wasm_bindgen]
pub fn timebase_init() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).ok();
}

// ═══════════════════════════════════════════════════════════════════════════
// Transport
// ═══════════════════════════════════════════════════════════════════════════

/// Transport driven by a host-supplied clock (e.g. `AudioContext.currentTime`).
#[wasm_bindgen]
pub struct TimebaseTransport {
    inner: Transport<ManualClock>,
    clock: ManualClock,
}

#[wasm_bindgen]
impl TimebaseTransport {
    /// Create a transport at `bpm`, falling back to 120 if it is invalid.
    #[wasm_bindgen(constructor)]
    pub fn new(bpm: f64) -> TimebaseTransport {
        let clock = ManualClock::new();
        let mut inner = Transport::with_clock(clock.clone());
        if let Err(e) = inner.set_bpm(bpm) {
            log::warn!("{e}, using {} BPM", inner.bpm());
        }
        TimebaseTransport { inner, clock }
    }

    /// Feed the host clock reading, in seconds.
    pub fn set_clock(&mut self, now_sec: f64) {
        self.clock.set(now_sec);
    }

    /// One scheduling iteration. Call from a timer after `set_clock`.
    pub fn run_cycle(&mut self) {
        self.inner.run_cycle();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Run State
    // ─────────────────────────────────────────────────────────────────────────

    pub fn start(&mut self) {
        self.inner.start();
    }

    pub fn pause(&mut self) {
        self.inner.pause();
    }

    pub fn rewind(&mut self) {
        self.inner.rewind();
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tempo & Position
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns false and keeps the old tempo if `bpm` is rejected.
    pub fn set_bpm(&mut self, bpm: f64) -> bool {
        match self.inner.set_bpm(bpm) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("set_bpm: {e}");
                false
            }
        }
    }

    pub fn bpm(&self) -> f64 {
        self.inner.bpm()
    }

    pub fn tick_to_sec(&self, tick: i32) -> f64 {
        self.inner.tick_to_sec(tick as Tick)
    }

    pub fn sec_to_tick(&self, seconds: f64) -> f64 {
        self.inner.sec_to_tick(seconds) as f64
    }

    pub fn set_now(&mut self, tick: i32) -> bool {
        match self.inner.set_now(tick as Tick) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("set_now: {e}");
                false
            }
        }
    }

    pub fn now(&self) -> f64 {
        self.inner.now() as f64
    }

    pub fn now_in_sec(&self) -> f64 {
        self.inner.now_in_sec()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Loop
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_loop(&mut self, start: i32, end: i32) -> bool {
        match self.inner.set_loop(start as Tick, end as Tick) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("set_loop: {e}");
                false
            }
        }
    }

    /// Returns the new looping state.
    pub fn toggle_loop(&mut self) -> bool {
        self.inner.toggle_loop()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Note Lists
    // ─────────────────────────────────────────────────────────────────────────

    /// Register an empty note list. Returns its ID.
    pub fn create_note_list(&mut self) -> u32 {
        self.inner.add_note_list(NoteList::new())
    }

    pub fn remove_note_list(&mut self, list: u32) -> bool {
        self.inner.remove_note_list(list).is_some()
    }

    /// Add a note to a registered list. Returns the note ID, or `None` if
    /// the list is unknown or the note is invalid.
    pub fn add_note(
        &mut self,
        list: u32,
        pitch: u8,
        velocity: u8,
        start: i32,
        end: i32,
    ) -> Option<u32> {
        let note = match Note::new(pitch, velocity, start as Tick, end as Tick) {
            Ok(note) => note,
            Err(e) => {
                log::warn!("add_note: {e}");
                return None;
            }
        };
        match self.inner.note_list_mut(list) {
            Some(notes) => Some(notes.add(note)),
            None => {
                log::warn!("add_note: unknown note list {list}");
                None
            }
        }
    }

    pub fn remove_note(&mut self, list: u32, note: u32) -> bool {
        self.inner
            .note_list_mut(list)
            .and_then(|notes| notes.remove(note))
            .is_some()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Playback Queue
    // ─────────────────────────────────────────────────────────────────────────

    pub fn queue_length(&self) -> u32 {
        self.inner.playback_queue().len() as u32
    }

    /// Take every queued note as a flat array of
    /// `[pitch, velocity, start, end, time]` groups.
    pub fn drain_queue(&mut self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.inner.playback_queue().len() * QUEUE_STRIDE);
        for scheduled in self.inner.drain_playback_queue() {
            let note = scheduled.note;
            out.extend_from_slice(&[
                note.pitch() as f64,
                note.velocity() as f64,
                note.start() as f64,
                note.end() as f64,
                scheduled.time,
            ]);
        }
        out
    }
}
