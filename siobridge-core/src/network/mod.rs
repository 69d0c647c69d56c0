// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network + Protocol Layer
//!
//! Engine.IO / Socket.IO client protocol, independent of any threading model.
//!
//! # Architecture
//!
//! The network layer consists of:
//! - **Packet types + codec**: text wire format of both protocol layers
//! - **Transport trait**: blocking frame stream (websocket or in-memory mock)
//! - **Connection**: sans-IO handshake / heartbeat / namespace state machine
//! - **Ack registry**: pending acknowledgements and their result slots
//!
//! # Example
//!
//! ```ignore
//! use siobridge_core::network::{decode_packet, encode_packet, EnginePacket, SocketPacket};
//! use serde_json::json;
//!
//! let packet = EnginePacket::Message(SocketPacket::event("/", "test", vec![json!({"a": 1})], Some(7)));
//! let frame = encode_packet(&packet);
//! assert_eq!(frame, r#"427["test",{"a":1}]"#);
//! assert_eq!(decode_packet(&frame)?, packet);
//! ```

#[cfg(feature = "testing")]
pub mod ack;
#[cfg(not(feature = "testing"))]
mod ack;

#[cfg(feature = "testing")]
pub mod connection;
#[cfg(not(feature = "testing"))]
mod connection;

#[cfg(feature = "testing")]
pub mod error;
#[cfg(not(feature = "testing"))]
mod error;

#[cfg(feature = "testing")]
pub mod message;
#[cfg(not(feature = "testing"))]
mod message;

#[cfg(feature = "testing")]
pub mod mock;
#[cfg(not(feature = "testing"))]
mod mock;

#[cfg(feature = "testing")]
pub mod protocol;
#[cfg(not(feature = "testing"))]
mod protocol;

#[cfg(feature = "testing")]
pub mod slot;
#[cfg(not(feature = "testing"))]
mod slot;

#[cfg(feature = "testing")]
pub mod transport;
#[cfg(not(feature = "testing"))]
mod transport;

#[cfg(feature = "testing")]
pub mod websocket;
#[cfg(not(feature = "testing"))]
mod websocket;

// Error types
pub use error::{DisconnectReason, NetworkError};

// Packet types
pub use message::{
    AckId, EnginePacket, EnginePacketType, OpenHandshake, SocketPacket, SocketPacketType,
    DEFAULT_NAMESPACE, ENGINE_IO_VERSION,
};

// Codec
pub use protocol::{
    decode_binary, decode_packet, decode_socket_packet, encode_binary, encode_packet,
    encode_socket_packet, DecodeError,
};

// Transport abstraction
pub use transport::{ConnectionState, Frame, Transport, TransportConfig, TransportResult};

// Mock transport for testing
pub use mock::{MockServer, MockTransport};

// WebSocket transport for production
pub use websocket::WebSocketTransport;

// Protocol state machine
pub use connection::{Action, Connection, Heartbeat, LifecycleState};

// Acknowledgements
pub use ack::{AckFailure, AckOutcome, AckRegistry};

// Result slots
pub use slot::{Cancel, InterruptHandle, Slot, WaitOutcome};
