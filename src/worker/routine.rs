//! The injected main routine and its execution context.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::control::{EmotionWrite, Percept};
use crate::dispatch::Dispatcher;
use crate::error::{Aborted, RoutineError};
use crate::worker::signals::WorkerSignals;

/// One pass of the node's long-lived main work.
///
/// The run-loop re-invokes `run` forever until the node is paused or
/// terminated; a routine that returns `Ok(())` has simply finished one cycle
/// and will be invoked again. Returning `Err(RoutineError::Aborted)` — which
/// `?` produces from any aborted `send_cmd` or `wait` call — exits the
/// run-loop cleanly.
#[async_trait]
pub trait Routine: Send + Sync {
    async fn run(&self, ctx: &RoutineContext) -> Result<(), RoutineError>;
}

/// Handle given to the routine for dispatching commands and sleeping without
/// losing responsiveness to control commands. The routine sees none of the
/// threading mechanics behind it.
#[derive(Clone)]
pub struct RoutineContext {
    dispatcher: Arc<Dispatcher>,
    signals: Arc<WorkerSignals>,
    poll_slice: Duration,
    percept: watch::Receiver<Option<Percept>>,
    emotion: watch::Receiver<Option<serde_json::Value>>,
}

impl RoutineContext {
    pub(crate) fn new(
        dispatcher: Arc<Dispatcher>,
        signals: Arc<WorkerSignals>,
        poll_slice: Duration,
        percept: watch::Receiver<Option<Percept>>,
        emotion: watch::Receiver<Option<serde_json::Value>>,
    ) -> Self {
        Self {
            dispatcher,
            signals,
            poll_slice,
            percept,
            emotion,
        }
    }

    pub(crate) fn signals(&self) -> &Arc<WorkerSignals> {
        &self.signals
    }

    /// Dispatch a command, retrying on contention. See
    /// [`Dispatcher::send_cmd`] for the retry and abort policy.
    pub async fn send_cmd(
        &self,
        symbol: &str,
        modifier: serde_json::Value,
    ) -> Result<String, Aborted> {
        self.dispatcher.send_cmd(symbol, modifier).await
    }

    /// Sleep for `duration` in poll-sized slices, pausing cooperatively if
    /// the pause flag comes up and returning `Err(Aborted)` as soon as
    /// terminate is requested.
    pub async fn wait(&self, duration: Duration) -> Result<(), Aborted> {
        self.signals.wait(duration, self.poll_slice).await
    }

    /// Direct terminate-flag check for custom poll points in long
    /// computations.
    pub fn aborted(&self) -> bool {
        self.signals.terminate_requested()
    }

    /// Latest percept observed on the node's percept feed, if any.
    pub fn current_percept(&self) -> Option<Percept> {
        self.percept.borrow().clone()
    }

    /// Latest parameter snapshot observed on the node's emotion feed, if any.
    pub fn current_emotion(&self) -> Option<serde_json::Value> {
        self.emotion.borrow().clone()
    }

    /// Push a parameter write to the emotion core. Advisory: a transport
    /// failure is logged and swallowed.
    pub async fn write_emotion(&self, write: EmotionWrite) {
        self.dispatcher.write_emotion(write).await
    }
}
