//! Receive mode
//!
//! Exposes the inbound side of the connection as a lazy stream of byte
//! chunks and logs each chunk as decoded text, one line per chunk.

use crate::{
    connection::Connection,
    decoder::{DecodeMode, Utf8Decoder},
    error::ProbeError,
    stats::ProbeStats,
    types::Termination,
};
use bytes::{Bytes, BytesMut};
use futures::{stream, Stream, StreamExt};
use log::debug;
use std::io::Write;

/// Chunks read from `conn`, in arrival order
///
/// The stream ends when the peer closes the connection. A read error is
/// yielded once and ends the stream; it cannot be restarted.
pub fn chunks(
    conn: &mut Connection,
    capacity: usize,
) -> impl Stream<Item = Result<Bytes, ProbeError>> + '_ {
    let state = Some((conn, BytesMut::with_capacity(capacity)));

    stream::unfold(state, move |state| async move {
        let (conn, mut buf) = state?;
        match conn.read_chunk(&mut buf, capacity).await {
            Ok(Some(chunk)) => Some((Ok(chunk), Some((conn, buf)))),
            Ok(None) => None,
            Err(e) => Some((Err(e), None)),
        }
    })
}

/// Writes every received chunk to an output sink as text
pub struct ChunkLogger {
    decoder: Utf8Decoder,
    read_buffer_size: usize,
}

impl ChunkLogger {
    pub fn new(mode: DecodeMode, read_buffer_size: usize) -> Self {
        Self {
            decoder: Utf8Decoder::new(mode),
            read_buffer_size,
        }
    }

    /// Log chunks until the peer closes the connection
    ///
    /// # Errors
    ///
    /// Read errors, strict-mode decode errors and output failures end the
    /// session.
    pub async fn run<W: Write>(
        &mut self,
        conn: &mut Connection,
        out: &mut W,
        stats: &mut ProbeStats,
    ) -> Result<Termination, ProbeError> {
        let chunks = chunks(conn, self.read_buffer_size);
        futures::pin_mut!(chunks);

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            stats.record_chunk(chunk.len());
            debug!("Received chunk of {} bytes", chunk.len());

            let decoded = self.decoder.decode(&chunk)?;
            stats.record_replacements(decoded.replacements);
            emit(out, &decoded.text)?;
        }

        if self.decoder.pending_len() > 0 {
            debug!(
                "Peer closed with {} bytes of an unfinished character",
                self.decoder.pending_len()
            );
        }
        let tail = self.decoder.finish()?;
        stats.record_replacements(tail.replacements);
        emit(out, &tail.text)?;

        Ok(Termination::PeerClosed)
    }
}

/// Write one line of text; nothing for an empty chunk
pub(crate) fn emit<W: Write>(out: &mut W, text: &str) -> Result<(), ProbeError> {
    if text.is_empty() {
        return Ok(());
    }

    writeln!(out, "{text}")
        .and_then(|_| out.flush())
        .map_err(ProbeError::Output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConnectionState;
    use std::time::Duration;
    use tokio::{io::AsyncWriteExt, net::TcpListener};

    async fn serve(parts: Vec<Vec<u8>>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            for part in parts {
                socket.write_all(&part).await.unwrap();
                socket.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        });

        port
    }

    #[tokio::test]
    async fn test_chunk_stream_preserves_order() {
        let port = serve(vec![b"one ".to_vec(), b"two ".to_vec(), b"three".to_vec()]).await;
        let mut conn = Connection::connect("127.0.0.1", port, None).await.unwrap();

        let received: Vec<u8> = chunks(&mut conn, 64)
            .map(|chunk| chunk.unwrap())
            .collect::<Vec<_>>()
            .await
            .concat();

        assert_eq!(received, b"one two three");
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_split_character_logged_intact() {
        let port = serve(vec![b"caf\xC3".to_vec(), b"\xA9".to_vec()]).await;
        let mut conn = Connection::connect("127.0.0.1", port, None).await.unwrap();

        let mut out = Vec::new();
        let mut stats = ProbeStats::new();
        let mut logger = ChunkLogger::new(DecodeMode::Strict, 64);
        let termination = logger.run(&mut conn, &mut out, &mut stats).await.unwrap();

        let text = String::from_utf8(out).unwrap().replace('\n', "");
        assert_eq!(text, "café");
        assert_eq!(termination, Termination::PeerClosed);
        assert_eq!(stats.bytes_received, 5);
    }

    #[tokio::test]
    async fn test_lossy_counts_replacements() {
        let port = serve(vec![b"ok\xFF".to_vec()]).await;
        let mut conn = Connection::connect("127.0.0.1", port, None).await.unwrap();

        let mut out = Vec::new();
        let mut stats = ProbeStats::new();
        let mut logger = ChunkLogger::new(DecodeMode::Lossy, 64);
        logger.run(&mut conn, &mut out, &mut stats).await.unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "ok\u{FFFD}\n");
        assert_eq!(stats.replacement_chars, 1);
    }

    #[tokio::test]
    async fn test_strict_rejects_invalid_bytes() {
        let port = serve(vec![b"ok\xFF".to_vec()]).await;
        let mut conn = Connection::connect("127.0.0.1", port, None).await.unwrap();

        let mut out = Vec::new();
        let mut stats = ProbeStats::new();
        let mut logger = ChunkLogger::new(DecodeMode::Strict, 64);
        let err = logger.run(&mut conn, &mut out, &mut stats).await.unwrap_err();

        assert!(matches!(err, ProbeError::Decode { offset: 2, .. }));
    }

    #[tokio::test]
    async fn test_truncated_tail_replaced_at_close() {
        let port = serve(vec![b"ok\xE2\x82".to_vec()]).await;
        let mut conn = Connection::connect("127.0.0.1", port, None).await.unwrap();

        let mut out = Vec::new();
        let mut stats = ProbeStats::new();
        let mut logger = ChunkLogger::new(DecodeMode::Lossy, 64);
        let termination = logger.run(&mut conn, &mut out, &mut stats).await.unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "ok\n\u{FFFD}\n");
        assert_eq!(stats.replacement_chars, 1);
        assert_eq!(logger.decoder.pending_len(), 0);
        assert_eq!(termination, Termination::PeerClosed);
    }

    #[test]
    fn test_emit_skips_empty_text() {
        let mut out = Vec::new();

        emit(&mut out, "").unwrap();
        emit(&mut out, "pong").unwrap();

        assert_eq!(out, b"pong\n");
    }
}
