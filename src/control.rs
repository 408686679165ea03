//! Inbound control-plane types.
//!
//! The transports that deliver control commands and percepts are external;
//! this module only defines the message shapes and the stream types the node
//! consumes.

use std::pin::Pin;
use std::str::FromStr;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::UnknownCommand;

/// A control command addressed to the node's supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlCommand {
    /// Stop invoking the routine at its next poll point.
    Pause,
    /// Clear the pause flag and resume invocation.
    Continue,
    /// Terminate the current worker and start a fresh one.
    Reset,
}

impl FromStr for ControlCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pause" => Ok(Self::Pause),
            "continue" => Ok(Self::Continue),
            "reset" => Ok(Self::Reset),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

impl std::fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pause => "pause",
            Self::Continue => "continue",
            Self::Reset => "reset",
        };
        write!(f, "{s}")
    }
}

/// Raw inbound control messages.
pub type ControlStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// One observation delivered on the percept feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Percept {
    pub symbol: String,
    pub modifier: serde_json::Value,
}

impl Percept {
    pub fn new(symbol: impl Into<String>, modifier: serde_json::Value) -> Self {
        Self {
            symbol: symbol.into(),
            modifier,
        }
    }
}

/// Inbound percept messages.
pub type PerceptStream = Pin<Box<dyn Stream<Item = Percept> + Send>>;

/// One write to the emotion core: a parameter set to `value`, decaying at
/// `change_per_sec` back toward its baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionWrite {
    pub param: String,
    pub value: i64,
    pub change_per_sec: i64,
}

/// Inbound emotion-core parameter snapshots, a free-form params object per
/// message.
pub type EmotionStream = Pin<Box<dyn Stream<Item = serde_json::Value> + Send>>;
