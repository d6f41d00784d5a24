// src/scheduler.rs
//
// Background driver for the transport's real-time loop.
//
// One thread wakes every `cycle_interval`, takes the transport lock and
// runs a single cycle. Control calls (start, pause, tempo, seeks, queue
// draining) take the same lock, so each cycle runs to completion before a
// control call is applied and vice versa. A pause is therefore seen by the
// very next cycle.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};
use parking_lot::Mutex;

use crate::clock::Clock;
use crate::error::TimebaseResult;
use crate::transport::Transport;

/// A transport shared between the control side and the scheduler thread.
pub type SharedTransport<C> = Arc<Mutex<Transport<C>>>;

/// Owns the scheduler thread. Dropping it stops and joins the thread.
pub struct Scheduler<C: Clock + Send + 'static> {
    transport: SharedTransport<C>,

    /// Flag to signal shutdown.
    shutdown: Arc<AtomicBool>,

    thread: Option<JoinHandle<()>>,
}

impl<C: Clock + Send + 'static> Scheduler<C> {
    /// Move `transport` behind a lock and start driving it.
    ///
    /// The period is read from the transport's config once, here.
    pub fn spawn(transport: Transport<C>) -> TimebaseResult<Self> {
        let interval = transport.config().cycle_interval;
        let transport = Arc::new(Mutex::new(transport));
        let shutdown = Arc::new(AtomicBool::new(false));

        let thread_transport = Arc::clone(&transport);
        let thread_shutdown = Arc::clone(&shutdown);
        let thread = thread::Builder::new()
            .name("timebase-scheduler".into())
            .spawn(move || run(thread_transport, thread_shutdown, interval))?;

        debug!("scheduler started, cycle every {interval:?}");

        Ok(Self {
            transport,
            shutdown,
            thread: Some(thread),
        })
    }

    /// Shared handle, e.g. for an audio callback that drains the queue.
    pub fn transport(&self) -> &SharedTransport<C> {
        &self.transport
    }

    /// Run `f` with exclusive access to the transport.
    pub fn with_transport<R>(&self, f: impl FnOnce(&mut Transport<C>) -> R) -> R {
        f(&mut self.transport.lock())
    }

    /// Stop the thread and wait for it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("scheduler thread panicked");
            }
            debug!("scheduler stopped");
        }
    }
}

impl<C: Clock + Send + 'static> Drop for Scheduler<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<C: Clock>(transport: SharedTransport<C>, shutdown: Arc<AtomicBool>, interval: Duration) {
    while !shutdown.load(Ordering::Relaxed) {
        thread::sleep(interval);
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        transport.lock().run_cycle();
    }
}
