// src/main.rs
//
// Demo: plays an arpeggio over a bass line and logs every note as the
// transport hands it over.

use std::thread;
use std::time::Duration;

use clap::Parser;
use log::info;

use timebase::{
    Clock, ManualClock, Note, NoteList, ScheduledNote, Scheduler, SystemClock, TICKS_PER_BEAT,
    TimebaseResult, Transport, TransportConfig,
};

#[derive(Parser)]
#[command(name = "timebase-demo", about = "Schedule a short pattern and log it")]
struct Cli {
    /// Tempo in beats per minute
    #[arg(long, default_value_t = 120.0)]
    bpm: f64,

    /// How long to play, in seconds
    #[arg(long, default_value_t = 4.0)]
    seconds: f64,

    /// Drive the transport from the wall clock on a scheduler thread
    #[arg(long)]
    realtime: bool,
}

/// ===============================
/// Pattern
/// ===============================

/// Sixteenth-note arpeggio, one chord per bar.
fn arpeggio(bars: i64) -> TimebaseResult<NoteList> {
    const CHORDS: [[u8; 4]; 4] = [
        [60, 64, 67, 72],
        [57, 60, 64, 69],
        [53, 57, 60, 65],
        [55, 59, 62, 67],
    ];
    let sixteenth = TICKS_PER_BEAT / 4;

    let mut list = NoteList::new();
    for bar in 0..bars {
        let chord = CHORDS[bar as usize % CHORDS.len()];
        for step in 0..16 {
            let start = (bar * 16 + step) * sixteenth;
            let pitch = chord[step as usize % chord.len()];
            list.add(Note::new(pitch, 90, start, start + sixteenth - 10)?);
        }
    }
    Ok(list)
}

/// Whole-bar roots.
fn bass(bars: i64) -> TimebaseResult<NoteList> {
    const ROOTS: [u8; 4] = [36, 33, 41, 43];
    let bar = TICKS_PER_BEAT * 4;

    (0..bars)
        .map(|i| Note::new(ROOTS[i as usize % ROOTS.len()], 110, i * bar, (i + 1) * bar))
        .collect()
}

fn log_note(scheduled: &ScheduledNote) {
    info!(
        "[{:>8.3}s] list {} {}",
        scheduled.time, scheduled.list, scheduled.note
    );
}

/// ===============================
/// Main
/// ===============================

fn main() -> TimebaseResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = TransportConfig::new().with_bpm(cli.bpm);
    config.validate()?;

    let bars = (cli.seconds * cli.bpm / 240.0).ceil() as i64;
    info!("playing {bars} bars at {} BPM for {}s", cli.bpm, cli.seconds);

    if cli.realtime {
        run_realtime(config, bars, cli.seconds)
    } else {
        run_offline(config, bars, cli.seconds)
    }
}

/// Simulated timer: 10 ms cycles on a manual clock, no sleeping.
fn run_offline(config: TransportConfig, bars: i64, seconds: f64) -> TimebaseResult<()> {
    let clock = ManualClock::new();
    let interval = config.cycle_interval.as_secs_f64();
    let mut transport = Transport::with_config(config, clock.clone())?;
    transport.add_note_list(arpeggio(bars)?);
    transport.add_note_list(bass(bars)?);

    transport.start();
    let mut handed_over = 0;
    while clock.now() < seconds {
        clock.advance(interval);
        transport.run_cycle();
        for scheduled in transport.drain_playback_queue() {
            log_note(&scheduled);
            handed_over += 1;
        }
    }
    transport.pause();

    info!("done at {:?}, {handed_over} notes", transport.now_mbt());
    Ok(())
}

/// Wall clock on a scheduler thread; this thread plays the audio side.
fn run_realtime(config: TransportConfig, bars: i64, seconds: f64) -> TimebaseResult<()> {
    let mut transport = Transport::with_config(config, SystemClock::new())?;
    transport.add_note_list(arpeggio(bars)?);
    transport.add_note_list(bass(bars)?);

    let scheduler = Scheduler::spawn(transport)?;
    scheduler.with_transport(|t| t.start());

    let poll = Duration::from_millis(5);
    let mut handed_over = 0;
    while scheduler.with_transport(|t| t.clock().now()) < seconds {
        let due: Vec<ScheduledNote> =
            scheduler.with_transport(|t| t.drain_playback_queue().collect());
        for scheduled in &due {
            log_note(scheduled);
        }
        handed_over += due.len();
        thread::sleep(poll);
    }

    let mbt = scheduler.with_transport(|t| {
        t.pause();
        t.now_mbt()
    });
    scheduler.shutdown();

    info!("done at {mbt:?}, {handed_over} notes");
    Ok(())
}
