//! Session-level type definitions
//!
//! Defines what a finished probe session reports and how it ended.
//!
//! ## Organization
//!
//! - **Shared Types**: mode and connection state (from probe_common)
//! - **Session Types**: used only by the client for reporting and export

use crate::stats::ProbeStats;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Shared Types
// ============================================================================

pub mod shared {
    //! Types shared with the rest of the workspace

    pub use probe_common::{ConnectionState, ProbeMode};
}

pub use shared::{ConnectionState, ProbeMode};

// ============================================================================
// Session Types
// ============================================================================

/// Why a session ended without an error
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Send mode reached its configured message count
    Completed,
    /// The server closed the connection
    PeerClosed,
    /// Ctrl-C or the configured duration elapsed
    Shutdown,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Termination::Completed => "completed",
            Termination::PeerClosed => "peer closed",
            Termination::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

/// Summary of one probe session
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionReport {
    /// ISO 8601 timestamp when the session ended
    pub timestamp: String,
    /// `host:port` of the server under test
    pub target: String,
    /// Mode the probe ran in
    pub mode: ProbeMode,
    /// Session duration in seconds
    pub duration_seconds: u64,
    /// Connection state at the end of the session
    pub final_state: ConnectionState,
    /// How the session ended
    pub termination: Termination,
    /// Traffic counters
    pub stats: ProbeStats,
}
