//! Error types for Overseer.

use std::time::Duration;

/// Cooperative-abort signal.
///
/// Not an application error: it unwinds the current run-loop pass and is
/// caught only by the run-loop itself. It must never escape the run-loop
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("abort requested")]
pub struct Aborted;

/// Supervisor lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// `start()` was called while a worker task is already live.
    #[error("worker is already running")]
    AlreadyRunning,

    /// `terminate()` was called with no live worker task.
    #[error("worker is not running")]
    NotRunning,

    /// The worker did not observe the terminate flag in time. The terminate
    /// flag and the task handle are left intact so the caller can retry or
    /// escalate.
    #[error("worker did not stop within {timeout:?}")]
    ShutdownTimeout { timeout: Duration },
}

/// Command Executor transport failures.
///
/// Distinct from a textual `error:` payload, which is a domain-level failure
/// reported by the executor itself.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("executor transport failed: {0}")]
    Transport(String),

    #[error("executor rejected declaration: {0}")]
    Declaration(String),
}

/// Failures surfaced by a user routine.
#[derive(Debug, thiserror::Error)]
pub enum RoutineError {
    /// The routine observed the abort signal; the run-loop exits cleanly.
    #[error("routine aborted")]
    Aborted(#[from] Aborted),

    /// Any other routine failure. The run-loop does not catch this; the
    /// worker task ends and the failure is logged when the handle is reaped.
    #[error("routine failed: {0}")]
    Failed(#[from] anyhow::Error),
}

/// An unrecognized control-channel command. Logged and ignored, never fatal.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown control command: {0}")]
pub struct UnknownCommand(pub String);
