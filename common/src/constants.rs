//! Shared constants for the TCP probe
//!
//! Defaults used when neither a config file nor a command-line flag
//! provides a value.

// ============================================================================
// Endpoint
// ============================================================================

/// Default host of the server under test
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default port of the server under test
pub const DEFAULT_PORT: u16 = 8999;

// ============================================================================
// Send Mode
// ============================================================================

/// Default period between two payloads (milliseconds)
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Word every payload starts with
pub const PAYLOAD_PREFIX: &str = "Hello ";

/// Separator written after the counter
pub const PAYLOAD_SUFFIX: &str = " ";

// ============================================================================
// Receive Mode
// ============================================================================

/// Bytes reserved for a single read from the socket
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Upper bound for a configured read buffer (1 MiB)
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

// ============================================================================
// Output
// ============================================================================

/// Line written to the output sink once the connection is open
pub const CONNECTED_NOTICE: &str = "connected";
