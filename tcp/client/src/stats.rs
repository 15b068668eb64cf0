//! Session statistics
//!
//! Counts what went over the wire during one probe session and turns the
//! counters into a [`SessionReport`] at the end.

use crate::types::{SessionReport, Termination};
use probe_common::{ConnectionState, ProbeMode};
use serde::{Deserialize, Serialize};

/// Counters for a single session
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct ProbeStats {
    /// Payloads written in send mode
    pub messages_sent: u64,
    /// Bytes written in send mode
    pub bytes_sent: u64,
    /// Chunks read in receive mode
    pub chunks_received: u64,
    /// Bytes read in receive mode
    pub bytes_received: u64,
    /// Invalid UTF-8 sequences replaced with U+FFFD
    pub replacement_chars: u64,
}

impl ProbeStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one written payload
    pub fn record_send(&mut self, bytes: usize) {
        self.messages_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Record one received chunk
    pub fn record_chunk(&mut self, bytes: usize) {
        self.chunks_received += 1;
        self.bytes_received += bytes as u64;
    }

    pub fn record_replacements(&mut self, count: u64) {
        self.replacement_chars += count;
    }

    /// Build the final report
    ///
    /// # Arguments
    ///
    /// * `target` - `host:port` the probe connected to
    /// * `mode` - Mode the session ran in
    /// * `final_state` - Connection state when the session ended
    /// * `termination` - Why the session ended
    /// * `elapsed_secs` - Session duration in seconds
    pub fn into_report(
        self,
        target: String,
        mode: ProbeMode,
        final_state: ConnectionState,
        termination: Termination,
        elapsed_secs: u64,
    ) -> SessionReport {
        SessionReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            target,
            mode,
            duration_seconds: elapsed_secs,
            final_state,
            termination,
            stats: self,
        }
    }
}
