//! TCP Probe
//!
//! Opens one TCP connection to a server under test and either writes a
//! counter-tagged payload on a fixed interval or logs whatever the server
//! sends.
//!
//! ## Usage
//!
//! ```bash
//! # Send "Hello <n> " to 0.0.0.0:8999 every second until Ctrl-C
//! ./tcp-probe
//!
//! # Send 10 payloads every 250 ms to another host
//! ./tcp-probe --host 192.168.1.20 --port 7000 --interval-ms 250 --count 10
//!
//! # Log what the server sends and export a session report
//! ./tcp-probe --mode receive --output report.json
//!
//! # Load defaults from a file, override the port
//! ./tcp-probe --config probe.json --port 9000 --format prometheus --output probe.prom
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::{path::PathBuf, time::Duration};
use tcp_probe::{
    config::ConfigOverrides,
    exporter::{ExporterType, JsonExporter, PrometheusExporter, ReportExporter},
    run_probe, ProbeConfig, ProbeMode, SessionReport,
};
use tokio::{signal, time::sleep};

/// TCP test client for checking a server is reachable
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// JSON config file; flags override its values
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Host of the server under test [default: 0.0.0.0]
    #[clap(long)]
    host: Option<String>,

    /// Port of the server under test [default: 8999]
    #[clap(short, long)]
    port: Option<u16>,

    /// Probe mode (send, receive) [default: send]
    #[clap(short, long)]
    mode: Option<ProbeMode>,

    /// Period between payloads in send mode [default: 1000]
    #[clap(short, long)]
    interval_ms: Option<u64>,

    /// Stop after this many payloads (send mode)
    #[clap(short = 'n', long)]
    count: Option<u64>,

    /// Give up connecting after this many milliseconds (default: OS timeout)
    #[clap(long)]
    connect_timeout_ms: Option<u64>,

    /// Fail on invalid UTF-8 instead of replacing it (receive mode);
    /// `--strict-utf8=false` turns off a config file's `true`
    #[clap(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    strict_utf8: Option<bool>,

    /// Bytes reserved per socket read (receive mode) [default: 1024]
    #[clap(long)]
    read_buffer_size: Option<usize>,

    /// Duration to run the probe (in seconds, 0 = infinite)
    #[clap(short, long, default_value_t = 0)]
    duration: u64,

    /// Output file for the session report
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Report format (json, prometheus)
    #[clap(short, long, default_value = "json")]
    format: String,

    /// Verbose logging
    #[clap(short, long)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            mode: self.mode,
            interval_ms: self.interval_ms,
            count: self.count,
            connect_timeout_ms: self.connect_timeout_ms,
            strict_utf8: self.strict_utf8,
            read_buffer_size: self.read_buffer_size,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    if let Err(e) = run(args).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    // Parse export format
    let export_format = match args.format.to_lowercase().as_str() {
        "json" => ExporterType::Json,
        "prometheus" | "prom" => ExporterType::Prometheus,
        _ => anyhow::bail!("Unsupported format: {}. Use json or prometheus", args.format),
    };

    let base = match &args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            ProbeConfig::from_file(path)?
        }
        None => ProbeConfig::default(),
    };
    let config = base.with_overrides(args.overrides());
    config.validate()?;

    info!("Starting TCP probe...");
    info!("   Target: {}", config.target());
    info!("   Mode: {}", config.mode);
    if config.mode == ProbeMode::Send {
        info!("   Interval: {} ms", config.interval_ms);
    }
    info!(
        "   Duration: {}",
        if args.duration == 0 {
            "infinite".to_string()
        } else {
            format!("{} seconds", args.duration)
        }
    );

    let mut stdout = std::io::stdout();
    let report = run_probe(&config, &mut stdout, shutdown_signal(args.duration))
        .await
        .with_context(|| format!("Probe of {} failed", config.target()))?;

    // Export report based on format
    if let Some(output) = &args.output {
        match export_format {
            ExporterType::Json => JsonExporter::new(output.clone(), true).export(&report)?,
            ExporterType::Prometheus => PrometheusExporter::new(output.clone()).export(&report)?,
        }
        info!("Report written to {:?}", output);
    }

    print_summary(&report);

    Ok(())
}

/// Resolves on Ctrl-C, or once `duration_secs` elapsed when non-zero
async fn shutdown_signal(duration_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    if duration_secs > 0 {
        tokio::select! {
            _ = sleep(Duration::from_secs(duration_secs)) => {
                info!("Duration reached, shutting down...");
            }
            _ = ctrl_c => {
                info!("Interrupted, shutting down...");
            }
        }
    } else {
        ctrl_c.await;
        info!("Interrupted, shutting down...");
    }
}

fn print_summary(report: &SessionReport) {
    let stats = &report.stats;

    info!("");
    info!("============================================");
    info!("             Session Summary");
    info!("============================================");
    info!("");
    info!("  Target:       {}", report.target);
    info!("  Mode:         {}", report.mode);
    info!("  Duration:     {} seconds", report.duration_seconds);
    info!("  Ended by:     {}", report.termination);
    info!("  Final state:  {}", report.final_state);
    info!("");
    match report.mode {
        ProbeMode::Send => {
            info!("  Messages sent:   {:>10}", stats.messages_sent);
            info!("  Bytes sent:      {:>10}", stats.bytes_sent);
        }
        ProbeMode::Receive => {
            info!("  Chunks received: {:>10}", stats.chunks_received);
            info!("  Bytes received:  {:>10}", stats.bytes_received);
            info!("  Replaced chars:  {:>10}", stats.replacement_chars);
        }
    }
    info!("");
    info!("============================================");
}
