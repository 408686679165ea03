//! Worker lifecycle state machine.

use serde::{Deserialize, Serialize};

/// State of the supervised worker.
///
/// Owned exclusively by the [`Supervisor`](crate::worker::Supervisor); cycles
/// `Idle → Running ↔ Paused → Terminating → Idle` across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// No worker task is live.
    Idle,
    /// The worker task is invoking the routine.
    Running,
    /// The pause flag is set; the worker blocks at its next poll point.
    Paused,
    /// Terminate was requested and the worker is winding down.
    Terminating,
}

impl WorkerState {
    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(&self, target: WorkerState) -> bool {
        use WorkerState::*;

        matches!(
            (self, target),
            (Idle, Running)
                | (Running, Paused)
                | (Paused, Running)
                | (Running, Terminating)
                | (Paused, Terminating)
                | (Terminating, Idle)
        )
    }

    /// Whether a worker task handle is live in this state.
    pub fn is_live(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Terminating => "terminating",
        };
        write!(f, "{s}")
    }
}
