// src/transport.rs
//
// Tempo/time authority and real-time driver.
//
// Musical position is stored in ticks and is the single source of truth.
// Every seconds value is derived from it with the *current* tempo, so a
// tempo change reinterprets the future without moving the playhead.

use std::collections::BTreeMap;

use log::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::config::TransportConfig;
use crate::error::{TimebaseError, TimebaseResult};
use crate::event::ScheduledNote;
use crate::note_list::NoteList;
use crate::tempo::{Mbt, Tempo, Tick, tick_to_mbt};

/// Handle to a note list registered with a [`Transport`].
pub type NoteListId = u32;

/// Musical-time transport.
///
/// This struct:
/// - owns tempo, position, loop region and the registered note lists
/// - advances position from a [`Clock`] in [`Transport::run_cycle`]
/// - collects due notes into the playback queue, which it never clears
///
/// It is not internally synchronized. Share it through
/// [`crate::Scheduler`] when a background thread drives it.
#[derive(Debug)]
pub struct Transport<C: Clock = SystemClock> {
    config: TransportConfig,

    tempo: Tempo,

    /// Position in ticks (fractional for sub-tick accuracy)
    position: f64,

    /// Clock reading at which `position` was current
    anchor: f64,

    loop_start: Tick,
    loop_end: Tick,
    looping: bool,

    /// How far into the next loop pass notes have already been queued
    preroll: Option<Tick>,

    running: bool,

    lists: BTreeMap<NoteListId, NoteList>,
    next_list_id: NoteListId,

    playback_queue: Vec<ScheduledNote>,

    clock: C,
}

impl Default for Transport<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport<SystemClock> {
    /// Default configuration on the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock::new())
    }
}

impl<C: Clock> Transport<C> {
    /// Default configuration on the given clock.
    pub fn with_clock(clock: C) -> Self {
        Self::from_parts(TransportConfig::default(), Tempo::default(), clock)
    }

    pub fn with_config(config: TransportConfig, clock: C) -> TimebaseResult<Self> {
        config.validate()?;
        let tempo = Tempo::new(config.bpm)?;
        Ok(Self::from_parts(config, tempo, clock))
    }

    fn from_parts(config: TransportConfig, tempo: Tempo, clock: C) -> Self {
        Self {
            tempo,
            position: 0.0,
            anchor: clock.now(),
            loop_start: config.loop_start,
            loop_end: config.loop_end,
            looping: config.looping,
            preroll: None,
            running: false,
            lists: BTreeMap::new(),
            next_list_id: 0,
            playback_queue: Vec::new(),
            config,
            clock,
        }
    }

    #[inline]
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    // -------------------------------
    // MARK: Run state
    // -------------------------------

    /// Begin advancing with the clock. No-op if already running.
    ///
    /// Notes within the lookahead of the start position are queued right
    /// away rather than on the first cycle.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.anchor = self.clock.now();
        self.running = true;
        debug!("transport started at tick {}", self.now());
        self.scan_notes();
    }

    /// Stop advancing. The position (caught up to the clock) is kept.
    pub fn pause(&mut self) {
        if !self.running {
            return;
        }
        self.advance_to_clock();
        self.running = false;
        debug!("transport paused at tick {}", self.now());
    }

    /// Go back to the loop start when looping, otherwise to tick 0.
    ///
    /// Does not change the run state.
    pub fn rewind(&mut self) {
        let target = if self.looping { self.loop_start } else { 0 };
        self.seek(target);
        debug!("transport rewound to tick {target}");
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advance by `delta` ticks and scan, without consulting the clock.
    ///
    /// Meant for offline rendering and deterministic tests. While paused,
    /// the schedule anchor moves with the position so absolute times keep
    /// advancing as if the music had played.
    pub fn step(&mut self, delta: Tick) -> TimebaseResult<()> {
        if delta < 0 {
            return Err(TimebaseError::NegativeStep(delta));
        }
        if !self.running {
            self.anchor += self.tempo.ticks_to_seconds(delta as f64);
        }
        self.position += delta as f64;
        self.wrap_loop();
        self.scan_notes();
        Ok(())
    }

    /// One iteration of the real-time loop.
    ///
    /// Advances the position by the clock time elapsed since the previous
    /// iteration, then scans every registered list. Does nothing while
    /// paused, so a pause takes effect before the next iteration.
    pub fn run_cycle(&mut self) {
        if !self.running {
            return;
        }
        self.advance_to_clock();
        self.scan_notes();
    }

    fn advance_to_clock(&mut self) {
        let now = self.clock.now();
        let elapsed = (now - self.anchor).max(0.0);
        self.position += self.tempo.seconds_to_ticks(elapsed);
        self.anchor = now;
        self.wrap_loop();
    }

    fn wrap_loop(&mut self) {
        if !self.looping || self.position < self.loop_end as f64 {
            return;
        }
        let start = self.loop_start as f64;
        let end = self.loop_end as f64;
        self.position = start + (self.position - end) % (end - start);

        // Resume scanning past what was queued ahead of the wrap
        let resume = self
            .preroll
            .take()
            .map_or(self.loop_start, |tick| tick.clamp(self.loop_start, self.loop_end));
        for list in self.lists.values_mut() {
            list.set_playhead_at_tick(resume);
        }
        debug!("loop wrapped to tick {}", self.now());
    }

    /// Jump to `tick` and re-seat every list's playhead there.
    fn seek(&mut self, tick: Tick) {
        self.position = tick as f64;
        self.anchor = self.clock.now();
        self.preroll = None;
        for list in self.lists.values_mut() {
            list.set_playhead_at_tick(tick);
        }
    }

    // -------------------------------
    // MARK: Tempo
    // -------------------------------

    /// Change tempo. The tick position is left untouched.
    ///
    /// While running, time played since the last cycle is first counted
    /// at the old tempo.
    pub fn set_bpm(&mut self, bpm: f64) -> TimebaseResult<()> {
        let tempo = Tempo::new(bpm)?;
        if self.running {
            self.advance_to_clock();
        }
        self.tempo = tempo;
        debug!(
            "tempo set to {bpm} BPM, lookahead {:.3}s",
            self.lookahead()
        );
        Ok(())
    }

    #[inline]
    pub fn bpm(&self) -> f64 {
        self.tempo.bpm()
    }

    #[inline]
    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    /// Seconds per beat (BIS).
    #[inline]
    pub fn seconds_per_beat(&self) -> f64 {
        self.tempo.seconds_per_beat()
    }

    /// Seconds per tick (TIS).
    #[inline]
    pub fn seconds_per_tick(&self) -> f64 {
        self.tempo.seconds_per_tick()
    }

    /// Lookahead window in seconds at the current tempo.
    pub fn lookahead(&self) -> f64 {
        self.config.lookahead.seconds(&self.tempo)
    }

    pub fn lookahead_ticks(&self) -> Tick {
        self.sec_to_tick(self.lookahead())
    }

    #[inline]
    pub fn tick_to_sec(&self, tick: Tick) -> f64 {
        self.tempo.ticks_to_seconds(tick as f64)
    }

    #[inline]
    pub fn sec_to_tick(&self, seconds: f64) -> Tick {
        self.tempo.seconds_to_ticks(seconds).round() as Tick
    }

    /// Clock time at which `tick` plays, for the audio engine.
    ///
    /// Linear in [`Transport::tick_to_sec`]: the difference between two
    /// calls is the tick difference in seconds at the current tempo.
    pub fn abs_time_in_sec(&self, tick: Tick) -> f64 {
        schedule_time(self.anchor, self.position, self.tempo, tick)
    }

    // -------------------------------
    // MARK: Position
    // -------------------------------

    pub fn set_now(&mut self, tick: Tick) -> TimebaseResult<()> {
        if tick < 0 {
            return Err(TimebaseError::NegativePosition(tick));
        }
        self.seek(tick);
        Ok(())
    }

    /// Set the position from seconds at the current tempo.
    pub fn set_now_in_sec(&mut self, seconds: f64) -> TimebaseResult<()> {
        if !seconds.is_finite() {
            return Err(TimebaseError::NonFiniteTime(seconds));
        }
        self.set_now(self.sec_to_tick(seconds))
    }

    /// Current position in whole ticks. Unaffected by tempo changes.
    ///
    /// While running this is the position as of the last cycle.
    #[inline]
    pub fn now(&self) -> Tick {
        self.position.floor() as Tick
    }

    /// Current position in fractional ticks.
    #[inline]
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Current position in seconds, recomputed with the current tempo.
    pub fn now_in_sec(&self) -> f64 {
        self.tempo.ticks_to_seconds(self.position)
    }

    pub fn now_mbt(&self) -> Mbt {
        tick_to_mbt(self.now())
    }

    // -------------------------------
    // MARK: Loop
    // -------------------------------

    /// Set loop bounds in ticks. Does not engage the loop.
    pub fn set_loop(&mut self, start: Tick, end: Tick) -> TimebaseResult<()> {
        if start < 0 || end <= start {
            return Err(TimebaseError::InvalidLoop { start, end });
        }
        self.loop_start = start;
        self.loop_end = end;
        self.preroll = None;
        debug!("loop set to {start}..{end}");
        Ok(())
    }

    #[inline]
    pub fn loop_start(&self) -> Tick {
        self.loop_start
    }

    #[inline]
    pub fn loop_end(&self) -> Tick {
        self.loop_end
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
        self.preroll = None;
        debug!("looping {}", if looping { "on" } else { "off" });
    }

    /// Flip the loop on or off, returning the new state.
    pub fn toggle_loop(&mut self) -> bool {
        self.set_looping(!self.looping);
        self.looping
    }

    #[inline]
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Loop length in ticks.
    pub fn loop_duration(&self) -> Tick {
        self.loop_end - self.loop_start
    }

    /// Loop length in seconds at the current tempo.
    pub fn loop_duration_in_sec(&self) -> f64 {
        self.tick_to_sec(self.loop_duration())
    }

    // -------------------------------
    // MARK: Note lists
    // -------------------------------

    /// Register a list for future scans. Its playhead is moved to the
    /// current position.
    pub fn add_note_list(&mut self, mut list: NoteList) -> NoteListId {
        list.set_playhead_at_tick(self.now());
        let id = self.next_list_id;
        self.next_list_id = self.next_list_id.wrapping_add(1);
        self.lists.insert(id, list);
        id
    }

    /// Unregister a list, handing it back. `None` if unknown.
    pub fn remove_note_list(&mut self, id: NoteListId) -> Option<NoteList> {
        self.lists.remove(&id)
    }

    pub fn note_list(&self, id: NoteListId) -> Option<&NoteList> {
        self.lists.get(&id)
    }

    pub fn note_list_mut(&mut self, id: NoteListId) -> Option<&mut NoteList> {
        self.lists.get_mut(&id)
    }

    pub fn note_list_ids(&self) -> impl Iterator<Item = NoteListId> + '_ {
        self.lists.keys().copied()
    }

    // -------------------------------
    // MARK: Scheduling
    // -------------------------------

    /// Scan every registered list up to the horizon and append what became
    /// due to the playback queue.
    ///
    /// The horizon is the position plus the lookahead. Inside an engaged
    /// loop it stops at the loop end, and whatever the lookahead reaches
    /// past the end is taken from the start of the next pass.
    pub fn scan_notes(&mut self) {
        let now = self.now();
        let reach = now + self.lookahead_ticks();
        let in_loop = self.looping && now < self.loop_end;
        let horizon = if in_loop { reach.min(self.loop_end) } else { reach };
        let (anchor, position, tempo) = (self.anchor, self.position, self.tempo);

        for (&list_id, list) in self.lists.iter_mut() {
            let Some(due) = list.scan(horizon) else {
                continue;
            };
            trace!("list {list_id}: {} notes due before tick {horizon}", due.len());

            self.playback_queue
                .extend(due.into_iter().map(|note| ScheduledNote {
                    list: list_id,
                    note,
                    time: schedule_time(anchor, position, tempo, note.start()),
                }));
        }

        if in_loop && reach > self.loop_end {
            self.scan_next_pass(reach - self.loop_end);
        }
    }

    /// Queue the first `overflow` ticks of the next loop pass, timed one
    /// loop length later. The list playheads stay on the current pass.
    fn scan_next_pass(&mut self, overflow: Tick) {
        let from = self.preroll.unwrap_or(self.loop_start);
        let to = (self.loop_start + overflow).min(self.loop_end);
        if to <= from {
            return;
        }

        let shift = self.loop_duration();
        let (anchor, position, tempo) = (self.anchor, self.position, self.tempo);
        for (&list_id, list) in &self.lists {
            self.playback_queue
                .extend(list.notes_starting_in(from, to).map(|note| ScheduledNote {
                    list: list_id,
                    note: *note,
                    time: schedule_time(anchor, position, tempo, note.start() + shift),
                }));
        }
        trace!("next loop pass queued up to tick {to}");
        self.preroll = Some(to);
    }

    /// Notes handed over so far and not yet drained.
    pub fn playback_queue(&self) -> &[ScheduledNote] {
        &self.playback_queue
    }

    /// Take every queued note, oldest first.
    pub fn drain_playback_queue(&mut self) -> std::vec::Drain<'_, ScheduledNote> {
        self.playback_queue.drain(..)
    }
}

#[inline]
fn schedule_time(anchor: f64, position: f64, tempo: Tempo, tick: Tick) -> f64 {
    anchor + tempo.ticks_to_seconds(tick as f64 - position)
}
