//! TCP connect prober.
//!
//! Performs a full TCP handshake with the operating system's socket API.
//! No elevated privileges are needed. The stream is dropped as soon as the
//! handshake completes; nothing is sent or read.

use crate::error::ProbeError;
use crate::scanner::traits::{ProbeOutcome, Prober};
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpStream;

/// Production prober backed by `tokio::net::TcpStream::connect`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnectProber;

impl TcpConnectProber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Prober for TcpConnectProber {
    async fn probe(&self, addr: SocketAddr) -> ProbeOutcome {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                drop(stream);
                ProbeOutcome::Open
            }
            Err(e) => classify_connect_error(&e),
        }
    }
}

/// Map a failed `connect` onto a probe outcome.
fn classify_connect_error(err: &io::Error) -> ProbeOutcome {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => ProbeOutcome::Closed,
        io::ErrorKind::TimedOut => ProbeOutcome::Error(ProbeError::TimedOut),
        _ => {
            let message = err.to_string();
            if message.to_lowercase().contains("unreachable") {
                ProbeOutcome::Error(ProbeError::Unreachable(message))
            } else {
                ProbeOutcome::Error(ProbeError::Io(message))
            }
        }
    }
}
