// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Transport Trait
//!
//! Duplex frame stream underneath the Engine.IO layer.

use super::error::NetworkError;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, NetworkError>;

/// Connection state of a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected to any server.
    Disconnected,
    /// Connection in progress.
    Connecting,
    /// Connected and ready.
    Connected,
}

/// One frame on the wire.
///
/// Engine.IO over websocket uses text frames; binary frames are passed
/// through unchanged and never interpreted by the protocol layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    /// Returns the text content, if this is a text frame.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Frame::Text(text) => Some(text),
            Frame::Binary(_) => None,
        }
    }
}

impl From<String> for Frame {
    fn from(text: String) -> Self {
        Frame::Text(text)
    }
}

impl From<&str> for Frame {
    fn from(text: &str) -> Self {
        Frame::Text(text.to_string())
    }
}

/// Configuration for transport connections.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Full websocket url including the Engine.IO path and query.
    pub server_url: String,
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Write timeout in milliseconds.
    pub io_timeout_ms: u64,
    /// Longest a single `receive` call blocks, in milliseconds.
    pub poll_interval_ms: u64,
    /// Extra HTTP headers for the websocket upgrade request.
    pub headers: Vec<(String, String)>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            server_url: String::new(),
            connect_timeout_ms: 10_000,
            io_timeout_ms: 30_000,
            poll_interval_ms: 20,
            headers: Vec::new(),
        }
    }
}

/// Transport trait for network communication.
///
/// Abstracts the byte stream (websocket, in-memory mock) underneath the
/// protocol. TLS, proxies and compression are the implementation's concern.
///
/// # Synchronous Interface
///
/// Methods block. `receive` blocks for at most `poll_interval_ms` and returns
/// `Ok(None)` when no frame arrived, so a single driver thread can interleave
/// reads, writes and timer checks.
pub trait Transport: Send {
    /// Opens the stream.
    fn connect(&mut self, config: &TransportConfig) -> TransportResult<()>;

    /// Closes the stream.
    ///
    /// Safe to call even if not connected.
    fn disconnect(&mut self) -> TransportResult<()>;

    /// Returns the current connection state.
    fn state(&self) -> ConnectionState;

    /// Writes one frame.
    fn send(&mut self, frame: Frame) -> TransportResult<()>;

    /// Reads the next frame.
    ///
    /// `Ok(None)` means nothing arrived within the poll interval;
    /// `Err(NetworkError::ConnectionClosed)` means the stream is gone.
    fn receive(&mut self) -> TransportResult<Option<Frame>>;
}
