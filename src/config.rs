//! Configuration types.

use std::time::Duration;

use crate::dispatch::DispatchPolicy;

/// Supervisor timing knobs.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Slice the worker sleeps for while paused or inside `wait()`.
    pub pause_poll_interval: Duration,
    /// How often `terminate()` re-checks whether the worker task has exited.
    pub terminate_poll_interval: Duration,
    /// Hard wall-clock bound on `terminate()`.
    pub terminate_timeout: Duration,
    /// Start the worker with the pause flag already set; the routine does not
    /// run until a continue command arrives.
    pub start_paused: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            pause_poll_interval: Duration::from_millis(50),
            terminate_poll_interval: Duration::from_millis(100),
            terminate_timeout: Duration::from_secs(10),
            start_paused: false,
        }
    }
}

/// Dispatcher knobs.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Fixed backoff between retries after a `busy:` response.
    pub busy_backoff: Duration,
    /// How abort responses and transport failures are handled.
    pub policy: DispatchPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            busy_backoff: Duration::from_secs(1),
            policy: DispatchPolicy::Strict,
        }
    }
}

/// Node identity and startup set.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Node name for logs and readiness reporting.
    pub name: String,
    /// The `node` key sent with every executor request.
    pub kind: String,
    /// Command declarations published to the executor during startup.
    /// Per-item failures are logged and skipped.
    pub declarations: Vec<serde_json::Value>,
    pub supervisor: SupervisorConfig,
    pub dispatch: DispatchConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "overseer".to_string(),
            kind: "worker".to_string(),
            declarations: Vec::new(),
            supervisor: SupervisorConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}
