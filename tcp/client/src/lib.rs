//! TCP Probe Library
//!
//! Provides reusable components for connecting to a server under test,
//! sending periodic payloads, and logging what the server sends back.

pub mod config;
pub mod connection;
pub mod decoder;
pub mod error;
pub mod exporter;
pub mod probe;
pub mod receiver;
pub mod sender;
pub mod stats;
pub mod types;

pub use config::ProbeConfig;
pub use connection::Connection;
pub use error::{ConnectErrorKind, ProbeError};
pub use exporter::{ExporterType, JsonExporter, PrometheusExporter, ReportExporter};
pub use probe::run_probe;
pub use stats::ProbeStats;
pub use types::*;
