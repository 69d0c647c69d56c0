// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Packet Types
//!
//! Engine.IO envelopes and the Socket.IO packets carried inside MESSAGE frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Acknowledgement identifier, unique within one connection.
pub type AckId = u64;

/// Engine.IO protocol revision requested in the handshake query.
pub const ENGINE_IO_VERSION: u8 = 4;

/// The only namespace this client joins.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Engine.IO packet type, the first character of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePacketType {
    Open,
    Close,
    Ping,
    Pong,
    Message,
    Upgrade,
    Noop,
}

impl EnginePacketType {
    /// Wire character for this type.
    pub fn code(self) -> char {
        match self {
            EnginePacketType::Open => '0',
            EnginePacketType::Close => '1',
            EnginePacketType::Ping => '2',
            EnginePacketType::Pong => '3',
            EnginePacketType::Message => '4',
            EnginePacketType::Upgrade => '5',
            EnginePacketType::Noop => '6',
        }
    }

    /// Parses a wire character.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            '0' => Some(EnginePacketType::Open),
            '1' => Some(EnginePacketType::Close),
            '2' => Some(EnginePacketType::Ping),
            '3' => Some(EnginePacketType::Pong),
            '4' => Some(EnginePacketType::Message),
            '5' => Some(EnginePacketType::Upgrade),
            '6' => Some(EnginePacketType::Noop),
            _ => None,
        }
    }
}

/// Socket.IO packet type, the first character inside a MESSAGE frame.
///
/// Binary EVENT/ACK (5 and 6) are not modelled and decode as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketPacketType {
    Connect,
    Disconnect,
    Event,
    Ack,
    ConnectError,
}

impl SocketPacketType {
    /// Wire character for this type.
    pub fn code(self) -> char {
        match self {
            SocketPacketType::Connect => '0',
            SocketPacketType::Disconnect => '1',
            SocketPacketType::Event => '2',
            SocketPacketType::Ack => '3',
            SocketPacketType::ConnectError => '4',
        }
    }

    /// Parses a wire character.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            '0' => Some(SocketPacketType::Connect),
            '1' => Some(SocketPacketType::Disconnect),
            '2' => Some(SocketPacketType::Event),
            '3' => Some(SocketPacketType::Ack),
            '4' => Some(SocketPacketType::ConnectError),
            _ => None,
        }
    }
}

/// Payload of the Engine.IO OPEN packet sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    /// Engine.IO session id.
    pub sid: String,
    /// Transports the server would upgrade to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server PINGs.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a PONG.
    pub ping_timeout: u64,
    /// Largest payload the server accepts, in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

/// One Engine.IO frame.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    /// Server handshake.
    Open(OpenHandshake),
    /// Transport close request.
    Close,
    /// Heartbeat probe, with optional payload (e.g. `probe`).
    Ping(String),
    /// Heartbeat reply echoing the ping payload.
    Pong(String),
    /// Socket.IO packet.
    Message(SocketPacket),
    /// Transport upgrade marker (ignored on websocket-only sessions).
    Upgrade,
    /// No-op filler (ignored).
    Noop,
}

impl EnginePacket {
    /// Returns the Engine.IO type of this packet.
    pub fn packet_type(&self) -> EnginePacketType {
        match self {
            EnginePacket::Open(_) => EnginePacketType::Open,
            EnginePacket::Close => EnginePacketType::Close,
            EnginePacket::Ping(_) => EnginePacketType::Ping,
            EnginePacket::Pong(_) => EnginePacketType::Pong,
            EnginePacket::Message(_) => EnginePacketType::Message,
            EnginePacket::Upgrade => EnginePacketType::Upgrade,
            EnginePacket::Noop => EnginePacketType::Noop,
        }
    }
}

/// A Socket.IO packet.
///
/// `data` holds the raw JSON payload: the argument array for EVENT (event
/// name first) and ACK, the auth / session object for CONNECT, the error
/// object for CONNECT_ERROR.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketPacket {
    pub kind: SocketPacketType,
    pub namespace: String,
    pub ack_id: Option<AckId>,
    pub data: Option<Value>,
}

impl SocketPacket {
    /// CONNECT request for a namespace, with an optional auth object.
    pub fn connect(namespace: &str, auth: Option<Value>) -> Self {
        SocketPacket {
            kind: SocketPacketType::Connect,
            namespace: namespace.to_string(),
            ack_id: None,
            data: auth,
        }
    }

    /// DISCONNECT for a namespace.
    pub fn disconnect(namespace: &str) -> Self {
        SocketPacket {
            kind: SocketPacketType::Disconnect,
            namespace: namespace.to_string(),
            ack_id: None,
            data: None,
        }
    }

    /// EVENT with the given arguments, requesting an ack when `ack_id` is set.
    pub fn event(namespace: &str, event: &str, args: Vec<Value>, ack_id: Option<AckId>) -> Self {
        let mut array = Vec::with_capacity(args.len() + 1);
        array.push(Value::String(event.to_string()));
        array.extend(args);

        SocketPacket {
            kind: SocketPacketType::Event,
            namespace: namespace.to_string(),
            ack_id,
            data: Some(Value::Array(array)),
        }
    }

    /// ACK reply for `ack_id`.
    pub fn ack(namespace: &str, ack_id: AckId, args: Vec<Value>) -> Self {
        SocketPacket {
            kind: SocketPacketType::Ack,
            namespace: namespace.to_string(),
            ack_id: Some(ack_id),
            data: Some(Value::Array(args)),
        }
    }

    /// Event name of an EVENT packet.
    pub fn event_name(&self) -> Option<&str> {
        if self.kind != SocketPacketType::Event {
            return None;
        }
        match &self.data {
            Some(Value::Array(items)) => items.first().and_then(Value::as_str),
            _ => None,
        }
    }

    /// Call arguments: EVENT without its name, ACK as-is, empty otherwise.
    pub fn args(&self) -> &[Value] {
        let items = match &self.data {
            Some(Value::Array(items)) => items.as_slice(),
            _ => return &[],
        };
        match self.kind {
            SocketPacketType::Event => items.get(1..).unwrap_or(&[]),
            SocketPacketType::Ack => items,
            _ => &[],
        }
    }

    /// Owned copy of [`SocketPacket::args`].
    pub fn into_args(self) -> Vec<Value> {
        let kind = self.kind;
        match self.data {
            Some(Value::Array(mut items)) => match kind {
                SocketPacketType::Event => {
                    if items.is_empty() {
                        items
                    } else {
                        items.split_off(1)
                    }
                }
                SocketPacketType::Ack => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    /// Session id from a server CONNECT reply (`{"sid": "..."}`).
    pub fn session_id(&self) -> Option<&str> {
        if self.kind != SocketPacketType::Connect {
            return None;
        }
        self.data.as_ref()?.get("sid")?.as_str()
    }

    /// Human readable reason of a CONNECT_ERROR.
    pub fn error_message(&self) -> String {
        match &self.data {
            Some(Value::String(message)) => message.clone(),
            Some(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
            Some(other) => other.to_string(),
            None => "connection refused".to_string(),
        }
    }
}
