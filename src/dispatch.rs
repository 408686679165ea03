//! Command dispatch — one request to the Command Executor at a time,
//! classified by result prefix, with busy-retry and abort policy.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::config::DispatchConfig;
use crate::control::EmotionWrite;
use crate::error::{Aborted, ExecutorError};
use crate::worker::signals::WorkerSignals;

/// One command request, keyed by node kind, symbol, and modifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub node: String,
    pub symbol: String,
    pub modifier: serde_json::Value,
}

/// Downstream executor of command requests.
///
/// `execute` returns result text prefixed `ok:` / `busy:` / `abort:` /
/// `error:`. A transport failure is an [`ExecutorError`], distinct from a
/// textual `error:` payload reported by the executor itself.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, req: &CommandRequest) -> Result<String, ExecutorError>;

    /// Publish one command declaration during node startup.
    async fn declare(&self, descriptor: &serde_json::Value) -> Result<(), ExecutorError>;

    /// Push one parameter write to the emotion core.
    async fn write_emotion(&self, write: &EmotionWrite) -> Result<(), ExecutorError>;
}

/// Classified result of one dispatch. Ephemeral; produced per
/// [`Dispatcher::dispatch_once`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Executor accepted and ran the command.
    Ok(String),
    /// Transient contention; retry later.
    Busy,
    /// The current run-loop pass must unwind.
    Abort,
    /// Domain-level failure reported by the executor. Logged, not retried.
    Error(String),
}

/// Abort handling variant. A configuration choice on one [`Dispatcher`]
/// type, not a separate implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPolicy {
    /// `abort:` unwinds the caller, and a transport failure requests node
    /// terminate.
    #[default]
    Strict,
    /// `abort:` text is logged and passed through as an ordinary result;
    /// only `busy:` is retried.
    Lenient,
}

/// Sends (symbol, modifier) requests to the executor and classifies the
/// outcome.
pub struct Dispatcher {
    executor: Arc<dyn CommandExecutor>,
    signals: Arc<WorkerSignals>,
    node: String,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        signals: Arc<WorkerSignals>,
        node: impl Into<String>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            executor,
            signals,
            node: node.into(),
            config,
        }
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.config.policy
    }

    /// Perform exactly one request and classify the result.
    ///
    /// Under the strict policy a transport failure also requests node
    /// terminate: a broken executor channel is fatal for this node.
    pub async fn dispatch_once(
        &self,
        symbol: &str,
        modifier: &serde_json::Value,
    ) -> DispatchOutcome {
        let req = CommandRequest {
            node: self.node.clone(),
            symbol: symbol.to_string(),
            modifier: modifier.clone(),
        };
        tracing::debug!(node = %self.node, symbol, "Dispatching command");

        match self.executor.execute(&req).await {
            Ok(text) => self.classify(symbol, text),
            Err(e) => {
                tracing::error!(symbol, error = %e, "Executor call failed");
                if self.config.policy == DispatchPolicy::Strict {
                    self.signals.request_terminate();
                }
                DispatchOutcome::Error(e.to_string())
            }
        }
    }

    /// Map result text onto an outcome by prefix.
    fn classify(&self, symbol: &str, text: String) -> DispatchOutcome {
        if text.starts_with("busy") {
            DispatchOutcome::Busy
        } else if text.starts_with("abort") {
            match self.config.policy {
                DispatchPolicy::Strict => DispatchOutcome::Abort,
                DispatchPolicy::Lenient => {
                    tracing::info!(symbol, result = %text, "Abort response passed through");
                    DispatchOutcome::Ok(text)
                }
            }
        } else if text.starts_with("error") {
            tracing::error!(symbol, result = %text, "Command completed with error");
            DispatchOutcome::Error(text)
        } else {
            let text = match text.strip_prefix("ok:") {
                Some(rest) => rest.to_string(),
                None => text,
            };
            DispatchOutcome::Ok(text)
        }
    }

    /// Push a parameter write to the emotion core. Emotion writes are
    /// advisory: a failure is logged and swallowed, never retried, and never
    /// affects the node lifecycle.
    pub async fn write_emotion(&self, write: EmotionWrite) {
        if let Err(e) = self.executor.write_emotion(&write).await {
            tracing::error!(param = %write.param, error = %e, "Emotion core write failed");
        }
    }

    /// Dispatch with retry: `busy:` sleeps a fixed backoff and retries,
    /// abort unwinds with `Err(Aborted)` under the strict policy, and
    /// `ok:`/`error:` return their text.
    ///
    /// Under the strict policy the shared terminate flag is checked before
    /// every attempt, so a pending shutdown is never masked by perpetual
    /// busy responses.
    pub async fn send_cmd(
        &self,
        symbol: &str,
        modifier: serde_json::Value,
    ) -> Result<String, Aborted> {
        loop {
            if self.config.policy == DispatchPolicy::Strict && self.signals.terminate_requested() {
                return Err(Aborted);
            }
            match self.dispatch_once(symbol, &modifier).await {
                DispatchOutcome::Ok(text) | DispatchOutcome::Error(text) => return Ok(text),
                DispatchOutcome::Busy => {
                    tracing::info!(symbol, "Executor busy, retrying");
                    sleep(self.config.busy_backoff).await;
                }
                DispatchOutcome::Abort => {
                    tracing::info!(symbol, "Abort received");
                    return Err(Aborted);
                }
            }
        }
    }
}
