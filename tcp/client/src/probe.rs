//! Probe session runner
//!
//! Connects once, runs the configured mode on the single connection and
//! closes it when the mode finishes, the peer hangs up, or shutdown is
//! requested.

use crate::{
    config::ProbeConfig,
    connection::Connection,
    decoder::DecodeMode,
    error::ProbeError,
    receiver::{emit, ChunkLogger},
    sender::PeriodicSender,
    stats::ProbeStats,
    types::{ProbeMode, SessionReport, Termination},
};
use log::{debug, info};
use probe_common::CONNECTED_NOTICE;
use std::{future::Future, io::Write};
use tokio::time::Instant;

/// Run one probe session
///
/// # Arguments
///
/// * `config` - Validated before anything touches the network
/// * `out` - Sink for the `connected` notice and received text
/// * `shutdown` - Resolves when the session should stop early
///
/// # Returns
///
/// The session report, or the first error that ended the session
pub async fn run_probe<W, F>(
    config: &ProbeConfig,
    out: &mut W,
    shutdown: F,
) -> Result<SessionReport, ProbeError>
where
    W: Write,
    F: Future<Output = ()>,
{
    config.validate()?;

    let start_time = Instant::now();
    info!("Connecting to {}...", config.target());
    let mut conn = Connection::connect(&config.host, config.port, config.connect_timeout()).await?;
    emit(out, CONNECTED_NOTICE)?;

    let mut stats = ProbeStats::new();
    let result = tokio::select! {
        result = run_mode(config, &mut conn, out, &mut stats) => result,
        _ = shutdown => {
            info!("Shutdown requested, closing connection...");
            Ok(Termination::Shutdown)
        }
    };

    conn.close().await;
    let termination = result?;
    info!("Session ended: {termination}");

    Ok(stats.into_report(
        config.target(),
        config.mode,
        conn.state(),
        termination,
        start_time.elapsed().as_secs(),
    ))
}

async fn run_mode<W: Write>(
    config: &ProbeConfig,
    conn: &mut Connection,
    out: &mut W,
    stats: &mut ProbeStats,
) -> Result<Termination, ProbeError> {
    match config.mode {
        ProbeMode::Send => {
            info!(
                "Sending every {} ms{}",
                config.interval_ms,
                config
                    .count
                    .map(|count| format!(", {count} messages"))
                    .unwrap_or_default()
            );
            let mut sender = PeriodicSender::new(config.interval(), config.count);
            let result = sender.run(conn, stats).await;
            debug!("Sender stopped before payload {}", sender.counter());
            result
        }
        ProbeMode::Receive => {
            let decode_mode = if config.strict_utf8 {
                DecodeMode::Strict
            } else {
                DecodeMode::Lossy
            };
            info!("Logging received data ({decode_mode:?} UTF-8)");
            let mut logger = ChunkLogger::new(decode_mode, config.read_buffer_size);
            logger.run(conn, out, stats).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ConnectErrorKind, types::ConnectionState};
    use std::time::Duration;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    async fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    fn config(port: u16, mode: ProbeMode) -> ProbeConfig {
        ProbeConfig {
            host: "127.0.0.1".to_string(),
            port,
            mode,
            interval_ms: 10,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_send_session_delivers_first_three_payloads() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = String::new();
            socket.read_to_string(&mut received).await.unwrap();
            received
        });

        let config = ProbeConfig {
            count: Some(3),
            ..config(port, ProbeMode::Send)
        };
        let mut out = Vec::new();
        let report = run_probe(&config, &mut out, std::future::pending())
            .await
            .unwrap();

        assert_eq!(server.await.unwrap(), "Hello 0 Hello 1 Hello 2 ");
        assert_eq!(String::from_utf8(out).unwrap(), "connected\n");
        assert_eq!(report.termination, Termination::Completed);
        assert_eq!(report.final_state, ConnectionState::Closed);
        assert_eq!(report.stats.messages_sent, 3);
    }

    #[tokio::test]
    async fn test_receive_session_logs_pong() {
        let (listener, port) = listener().await;
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"pong").await.unwrap();
        });

        let config = config(port, ProbeMode::Receive);
        let mut out = Vec::new();
        let report = run_probe(&config, &mut out, std::future::pending())
            .await
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "connected\npong\n");
        assert_eq!(report.termination, Termination::PeerClosed);
        assert_eq!(report.stats.bytes_received, 4);
    }

    #[tokio::test]
    async fn test_shutdown_stops_endless_send() {
        let (listener, port) = listener().await;
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut sink = Vec::new();
            let _ = socket.read_to_end(&mut sink).await;
        });

        let config = config(port, ProbeMode::Send);
        let mut out = Vec::new();
        let report = run_probe(&config, &mut out, tokio::time::sleep(Duration::from_millis(100)))
            .await
            .unwrap();

        assert_eq!(report.termination, Termination::Shutdown);
        assert_eq!(report.final_state, ConnectionState::Closed);
        assert!(report.stats.messages_sent >= 1);
    }

    #[tokio::test]
    async fn test_refused_connection_is_reported() {
        let port = {
            let (listener, port) = listener().await;
            drop(listener);
            port
        };

        let mut out = Vec::new();
        let err = run_probe(&config(port, ProbeMode::Send), &mut out, std::future::pending())
            .await
            .unwrap_err();

        assert_eq!(err.connect_kind(), Some(ConnectErrorKind::Refused));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_connecting() {
        let mut out = Vec::new();
        let err = run_probe(&config(0, ProbeMode::Send), &mut out, std::future::pending())
            .await
            .unwrap_err();

        assert!(matches!(err, ProbeError::Config(_)));
    }
}
