//! Scheduler — the frame loop.
//!
//! `Scheduler` is the clock-free state machine: every `step` performs exactly
//! one transition and says how long the caller should wait before the next.
//! `start` runs it on a dedicated thread that exclusively owns the session and
//! hands every emitted frame to a `FrameSink` until the returned
//! `PlaybackHandle` is stopped or dropped.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};

use crate::config::PlaybackConfig;
use crate::engine::{PlaybackSession, TrajectorySet};
use crate::types::PlaybackFrame;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Playing,
    PausedForRestart,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A regular tick. Wait one frame interval before stepping again.
    Frame(PlaybackFrame),
    /// The pass ran past `max_time`. Nothing is emitted; wait this long.
    Pause(Duration),
    /// The session was rewound to `min_time`; carries the cleared frame. The
    /// first tick of the new pass follows without waiting.
    Restart(PlaybackFrame),
}

pub struct Scheduler {
    session: PlaybackSession,
    state: State,
    frame_interval: f64,
    frame_wait: Duration,
    restart_delay: Duration,
    passes: u64,
}

impl Scheduler {
    pub fn new(store: Arc<TrajectorySet>, config: &PlaybackConfig) -> Result<Self> {
        config.validate()?;
        let frame_interval = config.frame_interval();
        let frame_wait = Duration::try_from_secs_f64(frame_interval)
            .with_context(|| format!("Frame interval {frame_interval}s is not representable"))?;
        let session = PlaybackSession::new(store);

        Ok(Self {
            session,
            state: State::Playing,
            frame_interval,
            frame_wait,
            restart_delay: config.restart_delay(),
            passes: 0,
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn store(&self) -> &TrajectorySet {
        self.session.store()
    }

    /// Completed passes so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Wall-clock wait before stepping again after `step`.
    pub fn wait_after(&self, step: &Step) -> Duration {
        match step {
            Step::Frame(_) => self.frame_wait,
            Step::Pause(delay) => *delay,
            Step::Restart(_) => Duration::ZERO,
        }
    }

    pub fn step(&mut self) -> Step {
        let range = self.store().range();
        match self.state {
            State::Playing => {
                let virtual_time = self.session.virtual_time() + self.frame_interval;
                if virtual_time <= range.max_time {
                    self.session.advance(virtual_time);
                    Step::Frame(self.session.frame())
                } else {
                    self.passes += 1;
                    self.state = State::PausedForRestart;
                    info!(
                        "Pass {} complete at t={:.2}, restarting in {:?}",
                        self.passes, virtual_time, self.restart_delay
                    );
                    Step::Pause(self.restart_delay)
                }
            }
            State::PausedForRestart => {
                self.session.reset(range.min_time);
                self.state = State::Playing;
                debug!("Restarting playback at t={:.2}", range.min_time);
                Step::Restart(self.session.frame())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Frame sinks
// ---------------------------------------------------------------------------

/// Receives every emitted frame on the scheduler thread. An error stops the
/// session for good.
pub trait FrameSink: Send + 'static {
    fn emit(&mut self, frame: PlaybackFrame) -> Result<()>;
}

impl<F> FrameSink for F
where
    F: FnMut(PlaybackFrame) -> Result<()> + Send + 'static,
{
    fn emit(&mut self, frame: PlaybackFrame) -> Result<()> {
        self(frame)
    }
}

impl FrameSink for mpsc::Sender<PlaybackFrame> {
    fn emit(&mut self, frame: PlaybackFrame) -> Result<()> {
        self.send(frame)
            .map_err(|_| anyhow!("Frame receiver hung up"))
    }
}

// ---------------------------------------------------------------------------
// Threaded driver
// ---------------------------------------------------------------------------

/// Control handle for a running playback. Dropping it stops the loop.
pub struct PlaybackHandle {
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<Result<()>>>,
}

impl PlaybackHandle {
    /// Whether the loop has ended, either stopped or failed.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|thread| thread.is_finished())
    }

    /// Cancel any pending tick or restart and wait for the loop to exit.
    ///
    /// Returns the error that ended the session early, if any.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The loop may already be gone after a sink failure.
            let _ = stop_tx.send(());
        }
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| anyhow!("Playback thread panicked"))?,
            None => Ok(()),
        }
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Playback ended with error: {e:#}");
        }
    }
}

/// Start playing `store` on a new thread, feeding frames to `sink`.
pub fn start(
    store: Arc<TrajectorySet>,
    config: &PlaybackConfig,
    sink: impl FrameSink,
) -> Result<PlaybackHandle> {
    let scheduler = Scheduler::new(store, config)?;
    let range = scheduler.store().range();
    info!(
        "Playing {} agents over t=[{:.2}, {:.2}] at {} fps",
        scheduler.store().agents().len(),
        range.min_time,
        range.max_time,
        config.fps
    );

    let (stop_tx, stop_rx) = mpsc::channel();
    let thread = thread::Builder::new()
        .name("playback".into())
        .spawn(move || run(scheduler, sink, stop_rx))
        .context("Failed to spawn playback thread")?;

    Ok(PlaybackHandle {
        stop_tx: Some(stop_tx),
        thread: Some(thread),
    })
}

fn run(
    mut scheduler: Scheduler,
    mut sink: impl FrameSink,
    stop_rx: mpsc::Receiver<()>,
) -> Result<()> {
    loop {
        let step = scheduler.step();
        let wait = scheduler.wait_after(&step);
        if let Step::Frame(frame) | Step::Restart(frame) = step {
            let virtual_time = frame.virtual_time;
            sink.emit(frame)
                .with_context(|| format!("Failed to emit frame at t={virtual_time:.2}"))?;
        }

        match stop_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                debug!("Playback stopped after {} passes", scheduler.passes());
                return Ok(());
            }
        }
    }
}
