// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Error Types
//!
//! Failures a blocking bridge call can resolve to.

use thiserror::Error;

use crate::network::{AckFailure, DisconnectReason, NetworkError};

/// Unified error type for bridge operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Server answered the namespace CONNECT with CONNECT_ERROR.
    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),

    /// No ACK before the call's deadline.
    #[error("ack timeout")]
    AckTimeout,

    /// Operation requires a connected bridge.
    #[error("Socket.IO client not connected")]
    NotConnected,

    /// `connect` while a connection is active.
    #[error("already connected")]
    AlreadyConnected,

    /// The connection died while the call was in flight.
    #[error("connection lost: {0}")]
    ConnectionLost(DisconnectReason),

    /// Handshake did not finish within the connect timeout.
    #[error("connect timeout after {0} ms")]
    ConnectTimeout(u64),

    /// The suspended call was interrupted.
    #[error("call cancelled")]
    Cancelled,

    /// The url cannot be turned into an Engine.IO endpoint.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Transport error outside an established connection.
    #[error("transport error: {0}")]
    Transport(#[from] NetworkError),
}

impl From<AckFailure> for BridgeError {
    fn from(failure: AckFailure) -> Self {
        match failure {
            AckFailure::Timeout => BridgeError::AckTimeout,
            AckFailure::ConnectionLost(reason) => BridgeError::ConnectionLost(reason),
        }
    }
}

impl BridgeError {
    /// True for failures that ended the connection.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::ConnectionLost(_) | BridgeError::Transport(_)
        )
    }
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
