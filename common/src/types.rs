//! Shared data structures of the probe
//!
//! The probe runs in exactly one [`ProbeMode`] and owns exactly one
//! connection, whose lifecycle is tracked by [`ConnectionState`].

use crate::constants::{PAYLOAD_PREFIX, PAYLOAD_SUFFIX};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Behavior of the probe once connected
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    /// Write a counter-tagged payload on a fixed interval
    #[default]
    Send,
    /// Log every inbound chunk as decoded text
    #[serde(alias = "recv")]
    Receive,
}

impl ProbeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeMode::Send => "send",
            ProbeMode::Receive => "receive",
        }
    }
}

impl fmt::Display for ProbeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProbeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "send" => Ok(ProbeMode::Send),
            "receive" | "recv" => Ok(ProbeMode::Receive),
            other => Err(format!("unsupported mode: {other}. Use send or receive")),
        }
    }
}

/// Connection lifecycle
///
/// ```text
/// Init -> Connecting -> Open -> Closed
///              |                  ^
///              +------------------+
/// ```
///
/// `Closed` is terminal: there is no reconnection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No connect attempt yet
    #[default]
    Init,
    /// Connect in flight
    Connecting,
    /// Established and usable
    Open,
    /// Failed, closed by either side, or broken by an error
    Closed,
}

impl ConnectionState {
    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, next),
            (Init, Connecting) | (Connecting, Open) | (Connecting, Closed) | (Open, Closed)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == ConnectionState::Closed
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Init => "init",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the payload sent for tick `counter`: `"Hello <counter> "`
pub fn format_payload(counter: u64) -> String {
    format!("{PAYLOAD_PREFIX}{counter}{PAYLOAD_SUFFIX}")
}
