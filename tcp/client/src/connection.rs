//! The probe's single outbound TCP connection
//!
//! Wraps a tokio `TcpStream` together with its lifecycle state. Every
//! operation returns an explicit result so the caller decides what to do
//! on failure; the connection itself never retries.

use crate::error::{ConnectErrorKind, ProbeError};
use bytes::{Bytes, BytesMut};
use log::{debug, info, trace, warn};
use probe_common::ConnectionState;
use std::{future::Future, io, net::SocketAddr, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{lookup_host, TcpStream},
};

/// An open (or formerly open) connection to the server under test
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
    state: ConnectionState,
}

impl Connection {
    /// Resolve `host` and open a TCP connection to it
    ///
    /// Each resolved address is tried once, in order. Without a `timeout`
    /// the attempt lasts as long as the OS lets it.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Connect`] carrying the failure kind.
    pub async fn connect(
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<Self, ProbeError> {
        let target = format!("{host}:{port}");
        let mut state = ConnectionState::Init;
        transition(&mut state, ConnectionState::Connecting)?;

        let result = with_connect_timeout(establish(host, port, &target), timeout, &target).await;

        let stream = match result {
            Ok(stream) => stream,
            Err(e) => {
                transition(&mut state, ConnectionState::Closed)?;
                return Err(e);
            }
        };

        let peer_addr = stream
            .peer_addr()
            .map_err(|e| ProbeError::connect(&target, ConnectErrorKind::classify(&e), e))?;
        let local_addr = stream
            .local_addr()
            .map_err(|e| ProbeError::connect(&target, ConnectErrorKind::classify(&e), e))?;
        transition(&mut state, ConnectionState::Open)?;

        info!("Connected to {peer_addr} from {local_addr}");

        Ok(Self {
            stream,
            peer_addr,
            local_addr,
            state,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Write the whole payload and flush it
    ///
    /// Suspends until the socket accepted every byte, which is where a
    /// slow peer pushes back on the caller.
    ///
    /// # Returns
    ///
    /// Number of bytes written
    pub async fn write_payload(&mut self, payload: &[u8]) -> Result<usize, ProbeError> {
        if self.state != ConnectionState::Open {
            return Err(ProbeError::Write {
                source: io::Error::new(
                    io::ErrorKind::NotConnected,
                    format!("connection is {}", self.state),
                ),
            });
        }

        if let Err(source) = self.stream.write_all(payload).await {
            self.mark_closed();
            return Err(ProbeError::Write { source });
        }
        if let Err(source) = self.stream.flush().await {
            self.mark_closed();
            return Err(ProbeError::Write { source });
        }

        trace!("Wrote {} bytes to {}", payload.len(), self.peer_addr);
        Ok(payload.len())
    }

    /// Read whatever the peer sent next
    ///
    /// Reserves `capacity` bytes in `buf` and hands back what arrived as a
    /// frozen chunk.
    ///
    /// # Returns
    ///
    /// `Ok(None)` once the peer closed the connection
    pub async fn read_chunk(
        &mut self,
        buf: &mut BytesMut,
        capacity: usize,
    ) -> Result<Option<Bytes>, ProbeError> {
        if self.state.is_terminal() {
            return Ok(None);
        }

        buf.clear();
        buf.reserve(capacity);

        match self.stream.read_buf(buf).await {
            Ok(0) => {
                info!("Peer {} closed the connection", self.peer_addr);
                self.mark_closed();
                Ok(None)
            }
            Ok(n) => {
                trace!("Read {n} bytes from {}", self.peer_addr);
                Ok(Some(buf.split().freeze()))
            }
            Err(source) => {
                self.mark_closed();
                Err(ProbeError::Read { source })
            }
        }
    }

    /// Shut down the write side and mark the connection closed
    pub async fn close(&mut self) {
        if self.state.is_terminal() {
            return;
        }

        if let Err(e) = self.stream.shutdown().await {
            warn!("Failed to shut down connection to {}: {e}", self.peer_addr);
        }
        self.mark_closed();
        info!("Connection to {} closed", self.peer_addr);
    }

    fn mark_closed(&mut self) {
        if self.state.can_transition_to(ConnectionState::Closed) {
            debug!("Connection state: {} -> {}", self.state, ConnectionState::Closed);
            self.state = ConnectionState::Closed;
        }
    }
}

fn transition(state: &mut ConnectionState, next: ConnectionState) -> Result<(), ProbeError> {
    if !state.can_transition_to(next) {
        return Err(ProbeError::InvalidTransition {
            from: *state,
            to: next,
        });
    }

    debug!("Connection state: {} -> {}", state, next);
    *state = next;
    Ok(())
}

/// Bound `attempt` by `limit`; expiry is a [`ConnectErrorKind::Timeout`]
async fn with_connect_timeout<F>(
    attempt: F,
    limit: Option<Duration>,
    target: &str,
) -> Result<TcpStream, ProbeError>
where
    F: Future<Output = Result<TcpStream, ProbeError>>,
{
    let Some(limit) = limit else {
        return attempt.await;
    };

    match tokio::time::timeout(limit, attempt).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::connect(
            target,
            ConnectErrorKind::Timeout,
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no connection after {} ms", limit.as_millis()),
            ),
        )),
    }
}

async fn establish(host: &str, port: u16, target: &str) -> Result<TcpStream, ProbeError> {
    let addrs: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|e| ProbeError::connect(target, ConnectErrorKind::DnsFailure, e))?
        .collect();

    let mut last_err = io::Error::new(
        io::ErrorKind::NotFound,
        format!("{host} resolved to no addresses"),
    );
    if addrs.is_empty() {
        return Err(ProbeError::connect(target, ConnectErrorKind::DnsFailure, last_err));
    }

    for addr in addrs {
        debug!("Connecting to {addr}...");
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("Connect to {addr} failed: {e}");
                last_err = e;
            }
        }
    }

    Err(ProbeError::connect(
        target,
        ConnectErrorKind::classify(&last_err),
        last_err,
    ))
}
