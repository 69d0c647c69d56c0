// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Protocol Codec
//!
//! Text encoding of Engine.IO frames and the Socket.IO packets inside them.
//!
//! ```text
//! engine frame  = type-digit [ payload ]
//! socket packet = type-digit [ "/" namespace "," ] [ ack-id ] [ json ]
//! ```
//!
//! Decoding never panics: malformed input is a [`DecodeError::Malformed`],
//! an unrecognised type digit is a [`DecodeError::UnknownPacketType`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;
use thiserror::Error;

use super::message::{
    AckId, EnginePacket, EnginePacketType, OpenHandshake, SocketPacket, SocketPacketType,
    DEFAULT_NAMESPACE,
};

/// Frame decoding failure. The frame is dropped, the connection survives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame structure or JSON payload is invalid.
    #[error("protocol decode error: {0}")]
    Malformed(String),

    /// Leading type character is not a known packet type.
    #[error("unknown packet type: {0:?}")]
    UnknownPacketType(char),
}

/// Encodes an Engine.IO packet into a text frame.
pub fn encode_packet(packet: &EnginePacket) -> String {
    let mut out = String::new();
    out.push(packet.packet_type().code());

    match packet {
        EnginePacket::Open(handshake) => {
            // OpenHandshake only holds strings and integers
            if let Ok(json) = serde_json::to_string(handshake) {
                out.push_str(&json);
            }
        }
        EnginePacket::Ping(payload) | EnginePacket::Pong(payload) => out.push_str(payload),
        EnginePacket::Message(inner) => out.push_str(&encode_socket_packet(inner)),
        EnginePacket::Close | EnginePacket::Upgrade | EnginePacket::Noop => {}
    }

    out
}

/// Encodes a Socket.IO packet (without the Engine.IO MESSAGE prefix).
pub fn encode_socket_packet(packet: &SocketPacket) -> String {
    let mut out = String::new();
    out.push(packet.kind.code());

    if !packet.namespace.is_empty() && packet.namespace != DEFAULT_NAMESPACE {
        out.push_str(&packet.namespace);
        out.push(',');
    }

    if let Some(id) = packet.ack_id {
        out.push_str(&id.to_string());
    }

    if let Some(data) = &packet.data {
        out.push_str(&data.to_string());
    }

    out
}

/// Decodes a text frame into an Engine.IO packet.
pub fn decode_packet(frame: &str) -> Result<EnginePacket, DecodeError> {
    let code = frame
        .chars()
        .next()
        .ok_or_else(|| DecodeError::Malformed("empty frame".into()))?;
    let kind = EnginePacketType::from_code(code).ok_or(DecodeError::UnknownPacketType(code))?;
    let body = &frame[code.len_utf8()..];

    match kind {
        EnginePacketType::Open => {
            let handshake: OpenHandshake = serde_json::from_str(body)
                .map_err(|e| DecodeError::Malformed(format!("invalid handshake: {}", e)))?;
            Ok(EnginePacket::Open(handshake))
        }
        EnginePacketType::Close => Ok(EnginePacket::Close),
        EnginePacketType::Ping => Ok(EnginePacket::Ping(body.to_string())),
        EnginePacketType::Pong => Ok(EnginePacket::Pong(body.to_string())),
        EnginePacketType::Message => decode_socket_packet(body).map(EnginePacket::Message),
        EnginePacketType::Upgrade => Ok(EnginePacket::Upgrade),
        EnginePacketType::Noop => Ok(EnginePacket::Noop),
    }
}

/// Decodes a Socket.IO packet (the body of an Engine.IO MESSAGE).
pub fn decode_socket_packet(body: &str) -> Result<SocketPacket, DecodeError> {
    let code = body
        .chars()
        .next()
        .ok_or_else(|| DecodeError::Malformed("empty socket.io packet".into()))?;
    let kind = SocketPacketType::from_code(code).ok_or(DecodeError::UnknownPacketType(code))?;
    let mut rest = &body[code.len_utf8()..];

    let namespace = if rest.starts_with('/') {
        match rest.find(',') {
            Some(end) => {
                let ns = &rest[..end];
                rest = &rest[end + 1..];
                ns.to_string()
            }
            None => {
                let ns = rest;
                rest = "";
                ns.to_string()
            }
        }
    } else {
        DEFAULT_NAMESPACE.to_string()
    };

    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let ack_id = if digits_end > 0 {
        let id = rest[..digits_end]
            .parse::<AckId>()
            .map_err(|_| DecodeError::Malformed(format!("ack id out of range: {}", &rest[..digits_end])))?;
        rest = &rest[digits_end..];
        Some(id)
    } else {
        None
    };

    let data = if rest.is_empty() {
        None
    } else {
        let value: Value = serde_json::from_str(rest)
            .map_err(|e| DecodeError::Malformed(format!("invalid payload: {}", e)))?;
        Some(value)
    };

    validate(kind, ack_id, data.as_ref())?;

    Ok(SocketPacket {
        kind,
        namespace,
        ack_id,
        data,
    })
}

fn validate(kind: SocketPacketType, ack_id: Option<AckId>, data: Option<&Value>) -> Result<(), DecodeError> {
    match kind {
        SocketPacketType::Event => match data {
            Some(Value::Array(items)) if items.first().is_some_and(Value::is_string) => Ok(()),
            _ => Err(DecodeError::Malformed(
                "event payload must be an array starting with the event name".into(),
            )),
        },
        SocketPacketType::Ack => {
            if ack_id.is_none() {
                return Err(DecodeError::Malformed("ack without id".into()));
            }
            match data {
                Some(Value::Array(_)) => Ok(()),
                _ => Err(DecodeError::Malformed("ack payload must be an array".into())),
            }
        }
        SocketPacketType::Connect => match data {
            None | Some(Value::Object(_)) => Ok(()),
            Some(_) => Err(DecodeError::Malformed("connect payload must be an object".into())),
        },
        SocketPacketType::ConnectError => match data {
            None | Some(Value::Object(_)) | Some(Value::String(_)) => Ok(()),
            Some(_) => Err(DecodeError::Malformed(
                "connect_error payload must be an object or a string".into(),
            )),
        },
        SocketPacketType::Disconnect => Ok(()),
    }
}

/// Represents binary data as a base64 JSON string.
pub fn encode_binary(bytes: &[u8]) -> Value {
    Value::String(BASE64.encode(bytes))
}

/// Reverses [`encode_binary`]. Returns `None` for non-strings or invalid base64.
pub fn decode_binary(value: &Value) -> Option<Vec<u8>> {
    BASE64.decode(value.as_str()?).ok()
}
