//! Probe configuration
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! command-line overrides. The result is validated once and never changes
//! for the lifetime of the process.

use crate::error::ProbeError;
use probe_common::{
    ProbeMode, DEFAULT_HOST, DEFAULT_INTERVAL_MS, DEFAULT_PORT, DEFAULT_READ_BUFFER_SIZE,
    MAX_READ_BUFFER_SIZE,
};
use serde::{Deserialize, Serialize};
use std::{net::IpAddr, path::Path, time::Duration};

/// Immutable probe configuration
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    /// Literal IP or host name of the server under test
    pub host: String,
    /// TCP port of the server under test
    pub port: u16,
    /// Send or receive
    pub mode: ProbeMode,
    /// Period between payloads in send mode (milliseconds)
    pub interval_ms: u64,
    /// Stop after this many payloads (send mode, `None` = forever)
    pub count: Option<u64>,
    /// Give up connecting after this long (`None` = OS default)
    pub connect_timeout_ms: Option<u64>,
    /// Fail on invalid UTF-8 instead of replacing it
    pub strict_utf8: bool,
    /// Bytes reserved per socket read in receive mode
    pub read_buffer_size: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            mode: ProbeMode::default(),
            interval_ms: DEFAULT_INTERVAL_MS,
            count: None,
            connect_timeout_ms: None,
            strict_utf8: false,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

/// Values given on the command line; `None` keeps the lower layer
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub mode: Option<ProbeMode>,
    pub interval_ms: Option<u64>,
    pub count: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub strict_utf8: Option<bool>,
    pub read_buffer_size: Option<usize>,
}

impl ProbeConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ProbeError> {
        serde_json::from_str(json).map_err(|e| ProbeError::Config(format!("invalid config: {e}")))
    }

    /// Load a JSON config file
    pub fn from_file(path: &Path) -> Result<Self, ProbeError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;

        Self::from_json(&json)
    }

    /// Apply command-line overrides on top of this configuration
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(mode) = overrides.mode {
            self.mode = mode;
        }
        if let Some(interval_ms) = overrides.interval_ms {
            self.interval_ms = interval_ms;
        }
        if overrides.count.is_some() {
            self.count = overrides.count;
        }
        if overrides.connect_timeout_ms.is_some() {
            self.connect_timeout_ms = overrides.connect_timeout_ms;
        }
        if let Some(strict) = overrides.strict_utf8 {
            self.strict_utf8 = strict;
        }
        if let Some(size) = overrides.read_buffer_size {
            self.read_buffer_size = size;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.host.trim().is_empty() {
            return Err(ProbeError::Config("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(ProbeError::Config("port must be in 1..=65535".to_string()));
        }
        if self.interval_ms == 0 {
            return Err(ProbeError::Config("interval must be >= 1 ms".to_string()));
        }
        if self.connect_timeout_ms == Some(0) {
            return Err(ProbeError::Config("connect timeout must be >= 1 ms".to_string()));
        }
        if self.read_buffer_size == 0 || self.read_buffer_size > MAX_READ_BUFFER_SIZE {
            return Err(ProbeError::Config(format!(
                "read buffer size must be in 1..={MAX_READ_BUFFER_SIZE}"
            )));
        }
        Ok(())
    }

    /// `host:port`, with IPv6 literals in brackets
    pub fn target(&self) -> String {
        match self.host.parse::<IpAddr>() {
            Ok(IpAddr::V6(addr)) => format!("[{}]:{}", addr, self.port),
            _ => format!("{}:{}", self.host, self.port),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }
}
