//! TCP reachability probe.
//!
//! A probe is a bare connect to `host:port` under a deadline. No bytes are
//! written; the socket is dropped as soon as the handshake completes.

use std::future::Future;
use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("unreachable: {0}")]
    Unreachable(#[from] io::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Dial `target` and report whether the connection was accepted in time.
pub async fn probe(target: &str, timeout: Duration) -> Result<(), ProbeError> {
    connect_within(timeout, TcpStream::connect(target)).await
}

/// Await a pending connect under a deadline.
pub(crate) async fn connect_within<F>(timeout: Duration, connect: F) -> Result<(), ProbeError>
where
    F: Future<Output = io::Result<TcpStream>>,
{
    match time::timeout(timeout, connect).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(e)) => Err(ProbeError::Unreachable(e)),
        Err(_) => Err(ProbeError::Timeout(timeout)),
    }
}
