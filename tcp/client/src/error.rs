//! Probe error taxonomy
//!
//! None of these are recovered inside the probe: they are surfaced to the
//! caller, which decides whether to retry. The binary logs them and exits
//! with a non-zero status.

use probe_common::ConnectionState;
use std::{fmt, io};
use thiserror::Error;

/// Why a connect attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectErrorKind {
    /// No route to the host or network, or any other socket failure
    Unreachable,
    /// The host answered with a reset: nothing listens on that port
    Refused,
    /// The OS or the configured connect timeout gave up
    Timeout,
    /// The host name could not be resolved
    DnsFailure,
}

impl ConnectErrorKind {
    /// Map an io error raised by `connect` to its kind
    pub fn classify(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => ConnectErrorKind::Refused,
            io::ErrorKind::TimedOut => ConnectErrorKind::Timeout,
            _ => ConnectErrorKind::Unreachable,
        }
    }
}

impl fmt::Display for ConnectErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectErrorKind::Unreachable => "unreachable",
            ConnectErrorKind::Refused => "refused",
            ConnectErrorKind::Timeout => "timeout",
            ConnectErrorKind::DnsFailure => "dns failure",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to connect to {target} ({kind}): {source}")]
    Connect {
        target: String,
        kind: ConnectErrorKind,
        #[source]
        source: io::Error,
    },

    #[error("Write failed: {source}")]
    Write {
        #[source]
        source: io::Error,
    },

    #[error("Read failed: {source}")]
    Read {
        #[source]
        source: io::Error,
    },

    #[error("Invalid UTF-8 at byte {offset}: {bytes:02x?}")]
    Decode { offset: u64, bytes: Vec<u8> },

    #[error("Illegal connection state transition: {from} -> {to}")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },

    #[error("Output error: {0}")]
    Output(#[source] io::Error),
}

impl ProbeError {
    /// Kind of a connect failure, `None` for every other error
    pub fn connect_kind(&self) -> Option<ConnectErrorKind> {
        match self {
            ProbeError::Connect { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub(crate) fn connect(target: &str, kind: ConnectErrorKind, source: io::Error) -> Self {
        ProbeError::Connect {
            target: target.to_string(),
            kind,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        let timed_out = io::Error::from(io::ErrorKind::TimedOut);
        let reset = io::Error::from(io::ErrorKind::ConnectionReset);

        assert_eq!(ConnectErrorKind::classify(&refused), ConnectErrorKind::Refused);
        assert_eq!(ConnectErrorKind::classify(&timed_out), ConnectErrorKind::Timeout);
        assert_eq!(ConnectErrorKind::classify(&reset), ConnectErrorKind::Unreachable);
    }

    #[test]
    fn test_connect_error_message() {
        let err = ProbeError::connect(
            "127.0.0.1:8999",
            ConnectErrorKind::Refused,
            io::Error::from(io::ErrorKind::ConnectionRefused),
        );

        assert_eq!(err.connect_kind(), Some(ConnectErrorKind::Refused));
        assert!(err.to_string().starts_with("Failed to connect to 127.0.0.1:8999 (refused)"));
    }
}
