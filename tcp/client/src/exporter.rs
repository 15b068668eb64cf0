//! Session report exporters
//!
//! Provides different exporters for the session report (JSON, Prometheus)

use crate::types::SessionReport;
use anyhow::{Context, Result};
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

/// Trait for report exporters
pub trait ReportExporter {
    /// Export the report
    ///
    /// # Arguments
    ///
    /// * `report` - Summary of the finished session
    fn export(&self, report: &SessionReport) -> Result<()>;
}

/// Export format type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExporterType {
    /// JSON format
    Json,
    /// Prometheus text format
    Prometheus,
}

/// JSON exporter
pub struct JsonExporter {
    output_path: PathBuf,
    pretty: bool,
}

impl JsonExporter {
    /// Create a new JSON exporter
    ///
    /// # Arguments
    ///
    /// * `output_path` - Path to output file
    /// * `pretty` - Enable pretty-printing
    pub fn new(output_path: PathBuf, pretty: bool) -> Self {
        Self {
            output_path,
            pretty,
        }
    }
}

impl ReportExporter for JsonExporter {
    fn export(&self, report: &SessionReport) -> Result<()> {
        let json = if self.pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };

        write_file(&self.output_path, &json)
    }
}

/// Prometheus exporter
pub struct PrometheusExporter {
    output_path: PathBuf,
}

impl PrometheusExporter {
    /// Create a new Prometheus exporter
    ///
    /// # Arguments
    ///
    /// * `output_path` - Path to output file
    pub fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }

    /// Convert the report to Prometheus text format
    fn to_prometheus_format(report: &SessionReport) -> String {
        let labels = format!("target=\"{}\",mode=\"{}\"", report.target, report.mode);
        let stats = &report.stats;
        let mut output = String::new();

        // Traffic
        output.push_str("# HELP tcp_probe_messages_sent_total Payloads written in send mode\n");
        output.push_str("# TYPE tcp_probe_messages_sent_total counter\n");
        output.push_str(&format!(
            "tcp_probe_messages_sent_total{{{labels}}} {}\n",
            stats.messages_sent
        ));
        output.push('\n');

        output.push_str("# HELP tcp_probe_bytes_sent_total Bytes written in send mode\n");
        output.push_str("# TYPE tcp_probe_bytes_sent_total counter\n");
        output.push_str(&format!("tcp_probe_bytes_sent_total{{{labels}}} {}\n", stats.bytes_sent));
        output.push('\n');

        output.push_str("# HELP tcp_probe_chunks_received_total Chunks read in receive mode\n");
        output.push_str("# TYPE tcp_probe_chunks_received_total counter\n");
        output.push_str(&format!(
            "tcp_probe_chunks_received_total{{{labels}}} {}\n",
            stats.chunks_received
        ));
        output.push('\n');

        output.push_str("# HELP tcp_probe_bytes_received_total Bytes read in receive mode\n");
        output.push_str("# TYPE tcp_probe_bytes_received_total counter\n");
        output.push_str(&format!(
            "tcp_probe_bytes_received_total{{{labels}}} {}\n",
            stats.bytes_received
        ));
        output.push('\n');

        output.push_str("# HELP tcp_probe_replacement_chars_total UTF-8 sequences replaced\n");
        output.push_str("# TYPE tcp_probe_replacement_chars_total counter\n");
        output.push_str(&format!(
            "tcp_probe_replacement_chars_total{{{labels}}} {}\n",
            stats.replacement_chars
        ));
        output.push('\n');

        // Duration
        output.push_str("# HELP tcp_probe_duration_seconds Duration of the session\n");
        output.push_str("# TYPE tcp_probe_duration_seconds gauge\n");
        output.push_str(&format!(
            "tcp_probe_duration_seconds{{{labels}}} {}\n",
            report.duration_seconds
        ));
        output.push('\n');

        output
    }
}

impl ReportExporter for PrometheusExporter {
    fn export(&self, report: &SessionReport) -> Result<()> {
        write_file(&self.output_path, &Self::to_prometheus_format(report))
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create output file: {:?}", path))?;

    file.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write to output file: {:?}", path))?;

    Ok(())
}
