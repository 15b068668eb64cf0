//! Shared types and utilities for the TCP probe
//!
//! This crate provides the default endpoint, payload format and the
//! connection state machine shared between the probe library and its CLI.

pub mod types;
pub mod constants;

// Re-export commonly used types
pub use types::{format_payload, ConnectionState, ProbeMode};
pub use constants::*;
