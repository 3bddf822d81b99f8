// src/channel/relay.rs

//! Dispatcher-side relays: accept exactly one connection per rendezvous
//! point and move bytes between it and a local handle.
//!
//! None of these functions return errors. Accept, copy and parse failures are
//! logged and reflected in the returned report, so one broken channel never
//! takes the others down with it.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, warn};

use super::ChannelRole;
use crate::status::{UNKNOWN_STATUS, decode_status};

/// What happened on one stdio channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayReport {
    pub role: ChannelRole,
    /// Whether a peer ever connected.
    pub connected: bool,
    /// Bytes moved across the channel.
    pub bytes: u64,
}

impl RelayReport {
    fn missing(role: ChannelRole) -> Self {
        Self {
            role,
            connected: false,
            bytes: 0,
        }
    }
}

/// What happened on the exit channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub connected: bool,
    pub status: i32,
}

/// Accept a single connection, optionally bounded by `timeout`.
///
/// The listener is consumed; no second peer can connect afterwards.
pub async fn accept_one(
    listener: UnixListener,
    role: ChannelRole,
    timeout: Option<Duration>,
) -> Option<UnixStream> {
    let accepted = match timeout {
        Some(limit) => match tokio::time::timeout(limit, listener.accept()).await {
            Ok(res) => res,
            Err(_) => {
                warn!(%role, timeout_ms = limit.as_millis() as u64, "no peer connected before timeout");
                return None;
            }
        },
        None => listener.accept().await,
    };

    match accepted {
        Ok((stream, _addr)) => {
            debug!(%role, "peer connected");
            Some(stream)
        }
        Err(e) => {
            warn!(%role, error = %e, "error accepting on rendezvous point");
            None
        }
    }
}

/// Copy everything the peer sends on `role` into `sink`.
pub async fn relay_to<W>(
    listener: UnixListener,
    role: ChannelRole,
    timeout: Option<Duration>,
    mut sink: W,
) -> RelayReport
where
    W: AsyncWrite + Unpin,
{
    let Some(mut stream) = accept_one(listener, role, timeout).await else {
        return RelayReport::missing(role);
    };

    let bytes = match tokio::io::copy(&mut stream, &mut sink).await {
        Ok(n) => n,
        Err(e) => {
            warn!(%role, error = %e, "relay from peer interrupted");
            0
        }
    };
    if let Err(e) = sink.flush().await {
        warn!(%role, error = %e, "failed to flush local handle");
    }

    debug!(%role, bytes, "relay from peer finished");
    RelayReport {
        role,
        connected: true,
        bytes,
    }
}

/// Send `source` to the peer on `role`, then close to signal end-of-stream.
///
/// `None` means there is nothing to forward (an interactive terminal); the
/// connection is closed straight away so the remote program sees EOF.
pub async fn relay_from<R>(
    listener: UnixListener,
    role: ChannelRole,
    timeout: Option<Duration>,
    source: Option<R>,
) -> RelayReport
where
    R: AsyncRead + Unpin,
{
    let Some(mut stream) = accept_one(listener, role, timeout).await else {
        return RelayReport::missing(role);
    };

    let mut bytes = 0;
    if let Some(mut source) = source {
        match tokio::io::copy(&mut source, &mut stream).await {
            Ok(n) => bytes = n,
            Err(e) => warn!(%role, error = %e, "relay to peer interrupted"),
        }
    }
    if let Err(e) = stream.shutdown().await {
        debug!(%role, error = %e, "peer already gone while closing");
    }

    debug!(%role, bytes, "relay to peer finished");
    RelayReport {
        role,
        connected: true,
        bytes,
    }
}

/// Read the exit channel until the peer closes and parse the status.
pub async fn receive_status(listener: UnixListener, timeout: Option<Duration>) -> StatusReport {
    let Some(mut stream) = accept_one(listener, ChannelRole::Exit, timeout).await else {
        return StatusReport {
            connected: false,
            status: UNKNOWN_STATUS,
        };
    };

    let mut buf = Vec::new();
    if let Err(e) = stream.read_to_end(&mut buf).await {
        warn!(error = %e, "error reading exit channel");
    }

    let status = decode_status(&buf);
    debug!(status, "exit status received");
    StatusReport {
        connected: true,
        status,
    }
}
