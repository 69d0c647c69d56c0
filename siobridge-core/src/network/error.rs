// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network Error Types

use std::fmt;

use thiserror::Error;

/// Errors reported by a transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Failed to establish the underlying stream.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The remote side closed the stream.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Operation did not complete in time.
    #[error("Connection timeout")]
    Timeout,

    /// Operation requires an open transport.
    #[error("Transport not connected")]
    NotConnected,

    /// Writing a frame failed.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Reading a frame failed.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// The url or request could not be used.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Why a connection left the `Connected` state.
///
/// Surfaced to every in-flight call of a torn-down connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The script called `disconnect`.
    ClientDisconnect,
    /// Server sent a Socket.IO DISCONNECT or an Engine.IO CLOSE.
    ServerDisconnect,
    /// No PING arrived within `pingInterval + pingTimeout`.
    HeartbeatTimeout,
    /// The transport failed or closed underneath us.
    Transport(NetworkError),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::ClientDisconnect => write!(f, "io client disconnect"),
            DisconnectReason::ServerDisconnect => write!(f, "io server disconnect"),
            DisconnectReason::HeartbeatTimeout => write!(f, "ping timeout"),
            DisconnectReason::Transport(e) => write!(f, "transport error: {}", e),
        }
    }
}
