//! Overseer — supervised worker lifecycle and command dispatch.
//!
//! A node runs one long-lived routine on a supervised background task. An
//! external controller can pause, resume, or reset that routine
//! cooperatively, and every outbound command the routine issues goes through
//! a dispatcher that retries on transient contention and unwinds cleanly on
//! abort.

pub mod config;
pub mod control;
pub mod dispatch;
pub mod error;
pub mod node;
pub mod worker;
