//! Shared cooperative-cancellation flags.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::error::Aborted;

/// Pause/terminate flags shared by the control side, the worker task, and
/// the strict dispatcher.
///
/// Single writer per flag: the control side sets them, the worker observes
/// them at poll points. Cancellation is cooperative only; a flag flip becomes
/// visible within one poll interval, not instantaneously.
#[derive(Debug, Default)]
pub struct WorkerSignals {
    pause: AtomicBool,
    terminate: AtomicBool,
}

impl WorkerSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pause(&self, on: bool) {
        self.pause.store(on, Ordering::SeqCst);
    }

    pub fn pause_requested(&self) -> bool {
        self.pause.load(Ordering::SeqCst)
    }

    pub fn request_terminate(&self) {
        self.terminate.store(true, Ordering::SeqCst);
    }

    pub fn clear_terminate(&self) {
        self.terminate.store(false, Ordering::SeqCst);
    }

    pub fn terminate_requested(&self) -> bool {
        self.terminate.load(Ordering::SeqCst)
    }

    /// Block in `slice`-sized sleeps while the pause flag is set. Returns
    /// early if terminate is requested mid-pause; the caller re-checks the
    /// terminate flag after this returns.
    pub async fn pause_wait(&self, slice: Duration) {
        while self.pause_requested() && !self.terminate_requested() {
            sleep(slice).await;
        }
    }

    /// Sleep until `duration` has elapsed without losing responsiveness to
    /// control flags: polls in `slice`-sized steps, pause-waits cooperatively
    /// if the pause flag comes up mid-wait, and returns `Err(Aborted)` as
    /// soon as terminate is observed. Paused time counts toward the deadline.
    pub async fn wait(&self, duration: Duration, slice: Duration) -> Result<(), Aborted> {
        let deadline = Instant::now() + duration;
        loop {
            if self.terminate_requested() {
                return Err(Aborted);
            }
            if self.pause_requested() {
                self.pause_wait(slice).await;
                continue;
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            sleep(slice.min(deadline - now)).await;
        }
    }
}
