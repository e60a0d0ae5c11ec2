//! JSON-over-UDP command and telemetry transport.
//!
//! Both ends use non-blocking `try_*` calls so the control cycles never
//! wait on the network.

use std::io;
use std::net::SocketAddr;

use gse_common::command::Command;
use gse_common::controller::ControllerVariant;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use super::{CommandSource, TelemetrySink};

/// Largest command datagram accepted.
const MAX_DATAGRAM: usize = 2048;

/// Socket-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("telemetry encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("telemetry send to {addr} failed: {source}")]
    Send {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

async fn bind(addr: SocketAddr) -> Result<UdpSocket, TransportError> {
    UdpSocket::bind(addr)
        .await
        .map_err(|source| TransportError::Bind { addr, source })
}

// ─── Commands ───────────────────────────────────────────────────────

/// Receives one command datagram per poll.
pub struct UdpCommandReceiver {
    socket: UdpSocket,
    variant: ControllerVariant,
    buf: Vec<u8>,
}

impl UdpCommandReceiver {
    pub async fn bind(addr: SocketAddr, variant: ControllerVariant) -> Result<Self, TransportError> {
        let socket = bind(addr).await?;
        info!(%addr, "Command receiver listening");
        Ok(Self {
            socket,
            variant,
            buf: vec![0u8; MAX_DATAGRAM],
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl CommandSource for UdpCommandReceiver {
    fn poll_command(&mut self) -> Option<Command> {
        let (len, from) = match self.socket.try_recv_from(&mut self.buf) {
            Ok(received) => received,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return None,
            Err(e) => {
                warn!(error = %e, "Command receive failed");
                return None;
            }
        };

        match Command::from_slice(self.variant, &self.buf[..len]) {
            Ok(command) => {
                debug!(%from, ?command, "Command received");
                Some(command)
            }
            Err(e) => {
                warn!(%from, error = %e, "Malformed command ignored");
                None
            }
        }
    }
}

// ─── Telemetry ──────────────────────────────────────────────────────

/// Sends each telemetry frame as one JSON datagram.
pub struct UdpTelemetrySender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpTelemetrySender {
    pub async fn bind(addr: SocketAddr, target: SocketAddr) -> Result<Self, TransportError> {
        let socket = bind(addr).await?;
        info!(%addr, %target, "Telemetry sender ready");
        Ok(Self { socket, target })
    }
}

impl TelemetrySink for UdpTelemetrySender {
    fn send(&mut self, frame: &Map<String, Value>) -> Result<(), TransportError> {
        let payload = serde_json::to_vec(frame)?;
        self.socket
            .try_send_to(&payload, self.target)
            .map(|_| ())
            .map_err(|source| TransportError::Send {
                addr: self.target,
                source,
            })
    }
}
