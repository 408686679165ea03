//! Worker Supervisor — owns the background task and its lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};

use crate::config::SupervisorConfig;
use crate::error::{RoutineError, SupervisorError};
use crate::worker::routine::{Routine, RoutineContext};
use crate::worker::signals::WorkerSignals;
use crate::worker::state::WorkerState;

/// Mutable supervisor bookkeeping, guarded by one lock.
///
/// Invariant: `handle` is `Some` iff `state.is_live()`. At most one worker
/// task is ever live (single-flight).
struct Inner {
    state: WorkerState,
    handle: Option<JoinHandle<Result<(), RoutineError>>>,
}

/// Owns exactly one background worker task and routes control commands into
/// lifecycle transitions. Created once per node and lives for the process.
pub struct Supervisor {
    config: SupervisorConfig,
    routine: Arc<dyn Routine>,
    ctx: RoutineContext,
    signals: Arc<WorkerSignals>,
    inner: Mutex<Inner>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig, routine: Arc<dyn Routine>, ctx: RoutineContext) -> Self {
        let signals = Arc::clone(ctx.signals());
        Self {
            config,
            routine,
            ctx,
            signals,
            inner: Mutex::new(Inner {
                state: WorkerState::Idle,
                handle: None,
            }),
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> WorkerState {
        self.inner.lock().await.state
    }

    /// Whether a worker task handle is live. Stays true after a timed-out
    /// terminate, until a retry succeeds.
    pub async fn is_live(&self) -> bool {
        self.inner.lock().await.handle.is_some()
    }

    /// Spawn the worker task running the run-loop.
    ///
    /// Fails with [`SupervisorError::AlreadyRunning`] if a worker is live; a
    /// second start never silently replaces the first.
    pub async fn start(&self) -> Result<(), SupervisorError> {
        let mut inner = self.inner.lock().await;
        if inner.handle.is_some() {
            return Err(SupervisorError::AlreadyRunning);
        }

        self.signals.set_pause(self.config.start_paused);
        self.signals.clear_terminate();

        let routine = Arc::clone(&self.routine);
        let ctx = self.ctx.clone();
        let signals = Arc::clone(&self.signals);
        let slice = self.config.pause_poll_interval;
        inner.handle = Some(tokio::spawn(run_loop(routine, ctx, signals, slice)));
        inner.state = if self.config.start_paused {
            WorkerState::Paused
        } else {
            WorkerState::Running
        };
        tracing::info!(state = %inner.state, "Worker started");
        Ok(())
    }

    /// Set the pause flag; the worker blocks at its next poll point.
    /// Idempotent.
    pub async fn pause(&self) {
        self.signals.set_pause(true);
        let mut inner = self.inner.lock().await;
        if inner.state == WorkerState::Running {
            inner.state = WorkerState::Paused;
            tracing::info!("Worker paused");
        }
    }

    /// Clear the pause flag. Idempotent; resuming a non-paused worker is a
    /// no-op.
    pub async fn resume(&self) {
        self.signals.set_pause(false);
        let mut inner = self.inner.lock().await;
        if inner.state == WorkerState::Paused {
            inner.state = WorkerState::Running;
            tracing::info!("Worker resumed");
        }
    }

    /// Cooperatively stop the worker, waiting up to the configured
    /// `terminate_timeout`.
    pub async fn terminate(&self) -> Result<(), SupervisorError> {
        self.terminate_within(self.config.terminate_timeout).await
    }

    /// Cooperatively stop the worker, waiting up to `timeout`.
    ///
    /// Sets the terminate flag and polls for the task to exit every
    /// `terminate_poll_interval`. On timeout the flag and the handle are
    /// left intact so the caller can retry or escalate; on success the flag
    /// is cleared, the handle dropped, and the state returns to Idle.
    pub async fn terminate_within(&self, timeout: Duration) -> Result<(), SupervisorError> {
        {
            let mut inner = self.inner.lock().await;
            if inner.handle.is_none() {
                return Err(SupervisorError::NotRunning);
            }
            inner.state = WorkerState::Terminating;
            self.signals.request_terminate();
        }
        tracing::debug!(?timeout, "Waiting for worker to stop");

        // The lock is released across each poll sleep so state queries and
        // pause/resume stay responsive while a terminate is in flight.
        let start = Instant::now();
        loop {
            let finished = {
                let inner = self.inner.lock().await;
                inner.handle.as_ref().is_none_or(|h| h.is_finished())
            };
            if finished {
                break;
            }
            if start.elapsed() >= timeout {
                tracing::warn!(?timeout, "Worker did not stop in time");
                return Err(SupervisorError::ShutdownTimeout { timeout });
            }
            sleep(self.config.terminate_poll_interval).await;
        }

        let mut inner = self.inner.lock().await;
        if let Some(handle) = inner.handle.take() {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Routine ended with failure"),
                Err(e) => tracing::error!(error = %e, "Worker task panicked"),
            }
        }
        self.signals.clear_terminate();
        inner.state = WorkerState::Idle;
        tracing::info!("Worker terminated");
        Ok(())
    }

    /// Terminate any live worker, then start a fresh one. A worker that was
    /// already absent is not an error; the net effect is always a running
    /// worker.
    pub async fn reset(&self) -> Result<(), SupervisorError> {
        match self.terminate().await {
            Ok(()) => {}
            Err(SupervisorError::NotRunning) => {}
            Err(e) => return Err(e),
        }
        tracing::info!("Worker reset");
        self.start().await
    }
}

/// The worker task body: pause-wait, terminate check, invoke the routine,
/// repeat.
///
/// An aborted pass exits the loop cleanly; any other routine failure ends
/// the task uncaught and is reported when the handle is reaped.
async fn run_loop(
    routine: Arc<dyn Routine>,
    ctx: RoutineContext,
    signals: Arc<WorkerSignals>,
    slice: Duration,
) -> Result<(), RoutineError> {
    loop {
        signals.pause_wait(slice).await;
        if signals.terminate_requested() {
            tracing::debug!("Run-loop observed terminate");
            return Ok(());
        }
        match routine.run(&ctx).await {
            Ok(()) => {}
            Err(RoutineError::Aborted(_)) => {
                tracing::info!("Routine aborted");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    }
}
