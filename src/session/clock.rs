//! Replay clock: paces the tick loop at a configurable speed multiplier
//!
//! The clock is the only suspending component in a session. Speed changes
//! and stop requests land in shared control state and are picked up at the
//! next tick boundary; the clock never skips or duplicates windows.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use crate::scenario::Override;

/// Control state shared between a session handle and its tick loop.
///
/// Callers mutate only queued/pending values here; the loop reads them at
/// the start of the next tick, never mid-computation.
#[derive(Debug)]
pub struct ControlState {
    speed: Mutex<f64>,
    pending_overrides: Mutex<Vec<Override>>,
    stopped: AtomicBool,
    stop_notify: Notify,
    paused: AtomicBool,
    resume_notify: Notify,
}

impl ControlState {
    pub fn new(speed: f64) -> Self {
        Self {
            speed: Mutex::new(speed),
            pending_overrides: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
            stop_notify: Notify::new(),
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
        }
    }

    /// Queue a new speed; takes effect on the next tick boundary.
    pub fn set_speed(&self, speed: f64) {
        *self.speed.lock().expect("speed lock poisoned") = speed;
    }

    pub fn speed(&self) -> f64 {
        *self.speed.lock().expect("speed lock poisoned")
    }

    /// Queue an override; the loop drains the queue at its next tick.
    pub fn push_override(&self, o: Override) {
        self.pending_overrides
            .lock()
            .expect("override lock poisoned")
            .push(o);
    }

    /// Take everything queued since the last drain.
    pub fn drain_overrides(&self) -> Vec<Override> {
        std::mem::take(
            &mut *self
                .pending_overrides
                .lock()
                .expect("override lock poisoned"),
        )
    }

    /// Request the session to stop at the next tick boundary at the latest.
    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.stop_notify.notify_waiters();
        // A paused clock must observe the stop too.
        self.resume_notify.notify_waiters();
    }

    pub fn stop_requested(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Hold the clock at the next tick boundary until resumed.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        // notify_one stores a permit, so a resume that lands before the
        // clock registers its waiter is not lost.
        self.resume_notify.notify_one();
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

/// Outcome of one inter-tick wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The window's wall-clock share elapsed; advance to the next window
    Elapsed,
    /// A stop was requested; emit the terminal event and exit
    Stopped,
}

/// Paces one session's windows against the wall clock
pub struct ReplayClock {
    /// Real-world duration of one window at speed 1.0
    window_duration: Duration,
    control: Arc<ControlState>,
}

impl ReplayClock {
    pub fn new(window_minutes: u32, control: Arc<ControlState>) -> Self {
        Self {
            window_duration: Duration::from_secs(window_minutes as u64 * 60),
            control,
        }
    }

    /// Sleep for `window_duration / speed`, reading the speed at the tick
    /// boundary. Returns early with `Stopped` if a stop arrives mid-sleep;
    /// holds at the boundary while paused.
    pub async fn wait(&self) -> TickOutcome {
        if self.control.stop_requested() {
            return TickOutcome::Stopped;
        }
        let speed = self.control.speed().max(f64::MIN_POSITIVE);
        let sleep = self.window_duration.div_f64(speed);

        let outcome = tokio::select! {
            _ = tokio::time::sleep(sleep) => {
                if self.control.stop_requested() {
                    TickOutcome::Stopped
                } else {
                    TickOutcome::Elapsed
                }
            }
            _ = self.control.stop_notify.notified() => TickOutcome::Stopped,
        };
        if outcome == TickOutcome::Stopped {
            return outcome;
        }

        // Hold here while paused; stop wins over resume. The short poll
        // interval bounds how late a racing stop or resume is observed.
        while self.control.is_paused() {
            if self.control.stop_requested() {
                return TickOutcome::Stopped;
            }
            tokio::select! {
                _ = self.control.resume_notify.notified() => {}
                _ = tokio::time::sleep(Duration::from_millis(50)) => {}
            }
        }
        if self.control.stop_requested() {
            TickOutcome::Stopped
        } else {
            TickOutcome::Elapsed
        }
    }
}
