//! Send mode
//!
//! Writes `"Hello <n> "` to the connection once per interval, with `n`
//! counting up from zero.

use crate::{
    connection::Connection, error::ProbeError, stats::ProbeStats, types::Termination,
};
use log::debug;
use probe_common::format_payload;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Periodic payload writer
#[derive(Debug)]
pub struct PeriodicSender {
    interval: Duration,
    counter: u64,
    limit: Option<u64>,
}

impl PeriodicSender {
    /// Create a new sender
    ///
    /// # Arguments
    ///
    /// * `interval` - Time between two payloads; the first one goes out
    ///   one interval after the sender starts
    /// * `limit` - Number of payloads after which the sender stops
    pub fn new(interval: Duration, limit: Option<u64>) -> Self {
        Self {
            interval,
            counter: 0,
            limit,
        }
    }

    /// Counter value of the next payload
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Write payloads until the limit is reached or a write fails
    ///
    /// A write that cannot complete holds back the next tick instead of
    /// queueing a burst behind it.
    pub async fn run(
        &mut self,
        conn: &mut Connection,
        stats: &mut ProbeStats,
    ) -> Result<Termination, ProbeError> {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.limit.is_some_and(|limit| self.counter >= limit) {
                return Ok(Termination::Completed);
            }

            ticker.tick().await;

            let payload = format_payload(self.counter);
            let written = conn.write_payload(payload.as_bytes()).await?;
            debug!("Sent {payload:?}");

            stats.record_send(written);
            self.counter += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConnectionState;
    use tokio::{io::AsyncReadExt, net::TcpListener};

    async fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[tokio::test]
    async fn test_sends_counter_tagged_payloads_in_order() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = String::new();
            socket.read_to_string(&mut received).await.unwrap();
            received
        });

        let mut conn = Connection::connect("127.0.0.1", port, None).await.unwrap();
        let mut stats = ProbeStats::new();
        let mut sender = PeriodicSender::new(Duration::from_millis(20), Some(3));

        let start = Instant::now();
        let termination = sender.run(&mut conn, &mut stats).await.unwrap();
        let elapsed = start.elapsed();
        conn.close().await;

        assert_eq!(termination, Termination::Completed);
        assert_eq!(server.await.unwrap(), "Hello 0 Hello 1 Hello 2 ");
        assert_eq!(sender.counter(), 3);
        assert_eq!(stats.messages_sent, 3);
        assert_eq!(stats.bytes_sent, 24);
        assert!(elapsed >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_zero_limit_sends_nothing() {
        let (_listener, port) = listener().await;

        let mut conn = Connection::connect("127.0.0.1", port, None).await.unwrap();
        let mut stats = ProbeStats::new();
        let mut sender = PeriodicSender::new(Duration::from_millis(10), Some(0));

        let termination = sender.run(&mut conn, &mut stats).await.unwrap();

        assert_eq!(termination, Termination::Completed);
        assert_eq!(stats.messages_sent, 0);
    }

    #[tokio::test]
    async fn test_write_to_closed_peer_fails() {
        let (listener, port) = listener().await;
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let mut conn = Connection::connect("127.0.0.1", port, None).await.unwrap();
        server.await.unwrap();

        let mut stats = ProbeStats::new();
        let mut sender = PeriodicSender::new(Duration::from_millis(5), None);
        let result = tokio::time::timeout(Duration::from_secs(5), sender.run(&mut conn, &mut stats))
            .await
            .expect("sender should fail once the peer is gone");

        assert!(matches!(result, Err(ProbeError::Write { .. })));
        assert_eq!(conn.state(), ConnectionState::Closed);
    }
}
