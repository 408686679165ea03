//! Worker supervision — lifecycle state, cooperative signals, and the
//! run-loop driving the injected routine.
//!
//! Core components:
//! - `state` — Worker lifecycle state machine (Idle → Running ↔ Paused → Terminating)
//! - `signals` — Pause/terminate flags shared by the control side, the worker
//!   task, and the strict dispatcher
//! - `routine` — The injected main routine and its execution context
//! - `supervisor` — Owns the background task; start/pause/resume/terminate/reset

pub mod routine;
pub mod signals;
pub mod state;
pub mod supervisor;

pub use routine::{Routine, RoutineContext};
pub use signals::WorkerSignals;
pub use state::WorkerState;
pub use supervisor::Supervisor;
