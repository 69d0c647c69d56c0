// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Protocol State Machine
//!
//! Engine.IO handshake, heartbeat and Socket.IO namespace lifecycle for one
//! connection. The machine does no I/O: it consumes decoded packets and
//! clock readings and returns [`Action`]s for the driver to execute.
//!
//! ```text
//! Disconnected ──open──▶ Handshaking ──CONNECT──▶ Connected
//!      ▲                     │                       │
//!      │         CONNECT_ERROR / CLOSE       close() │
//!      │                     ▼                       ▼
//!      └──────────────── Disconnected ◀──────── Disconnecting
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, trace, warn};

use super::error::{DisconnectReason, NetworkError};
use super::message::{
    AckId, EnginePacket, OpenHandshake, SocketPacket, SocketPacketType, DEFAULT_NAMESPACE,
};

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Disconnected,
    Handshaking,
    Connected,
    Disconnecting,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Disconnected => "disconnected",
            LifecycleState::Handshaking => "handshaking",
            LifecycleState::Connected => "connected",
            LifecycleState::Disconnecting => "disconnecting",
        };
        f.write_str(name)
    }
}

/// Side effect requested by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Write this packet to the transport.
    Send(EnginePacket),
    /// Namespace joined; `sid` is the Socket.IO session id.
    Connected { sid: String },
    /// Server refused the namespace CONNECT.
    Rejected(String),
    /// Inbound event for the router.
    Dispatch {
        event: String,
        args: Vec<Value>,
        ack_id: Option<AckId>,
    },
    /// Inbound ACK for the registry.
    ResolveAck { id: AckId, args: Vec<Value> },
    /// Connection is over.
    Closed(DisconnectReason),
}

/// Heartbeat parameters announced by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Heartbeat {
    /// Longest silence tolerated between two PINGs.
    pub fn max_silence(&self) -> Duration {
        self.interval + self.timeout
    }
}

/// One Socket.IO connection on the default namespace.
///
/// Single use: once it reaches `Disconnected` after having been opened, a
/// reconnect needs a new `Connection`.
pub struct Connection {
    namespace: String,
    auth: Option<Value>,
    state: LifecycleState,
    engine_sid: Option<String>,
    socket_sid: Option<String>,
    heartbeat: Option<Heartbeat>,
    opened_at: Option<Instant>,
    last_ping: Option<Instant>,
    /// Packets submitted while handshaking, flushed on CONNECT.
    outbound: VecDeque<SocketPacket>,
}

impl Connection {
    /// Creates a connection that will join `/` with an optional auth object.
    pub fn new(auth: Option<Value>) -> Self {
        Connection {
            namespace: DEFAULT_NAMESPACE.to_string(),
            auth,
            state: LifecycleState::Disconnected,
            engine_sid: None,
            socket_sid: None,
            heartbeat: None,
            opened_at: None,
            last_ping: None,
            outbound: VecDeque::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Namespace this connection joins.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Socket.IO session id, known once connected.
    pub fn session_id(&self) -> Option<&str> {
        self.socket_sid.as_deref()
    }

    /// Engine.IO session id from the OPEN packet.
    pub fn engine_session_id(&self) -> Option<&str> {
        self.engine_sid.as_deref()
    }

    /// Heartbeat parameters from the OPEN packet.
    pub fn heartbeat(&self) -> Option<Heartbeat> {
        self.heartbeat
    }

    /// When the transport was opened.
    pub fn opened_at(&self) -> Option<Instant> {
        self.opened_at
    }

    /// Number of packets waiting for the handshake to finish.
    pub fn queued(&self) -> usize {
        self.outbound.len()
    }

    /// The transport is open; wait for the server OPEN.
    pub fn on_transport_open(&mut self, now: Instant) {
        if self.state == LifecycleState::Disconnected && self.opened_at.is_none() {
            self.state = LifecycleState::Handshaking;
            self.opened_at = Some(now);
        }
    }

    /// Feeds one inbound packet.
    pub fn handle_packet(&mut self, packet: EnginePacket, now: Instant) -> Vec<Action> {
        if self.state == LifecycleState::Disconnected {
            trace!(?packet, "packet after close ignored");
            return Vec::new();
        }

        match packet {
            EnginePacket::Open(handshake) => self.on_open(handshake, now),
            EnginePacket::Ping(payload) => {
                self.last_ping = Some(now);
                vec![Action::Send(EnginePacket::Pong(payload))]
            }
            EnginePacket::Close => self.fail(DisconnectReason::ServerDisconnect),
            EnginePacket::Message(inner) => self.on_message(inner),
            EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => Vec::new(),
        }
    }

    /// Submits an outbound Socket.IO packet.
    ///
    /// Sent at once when connected, queued while handshaking, dropped otherwise.
    pub fn emit(&mut self, packet: SocketPacket) -> Vec<Action> {
        match self.state {
            LifecycleState::Connected => vec![Action::Send(EnginePacket::Message(packet))],
            LifecycleState::Handshaking => {
                self.outbound.push_back(packet);
                Vec::new()
            }
            LifecycleState::Disconnected | LifecycleState::Disconnecting => {
                warn!(state = %self.state, "emit on closed connection dropped");
                Vec::new()
            }
        }
    }

    /// Checks the heartbeat deadline.
    pub fn poll_heartbeat(&mut self, now: Instant) -> Vec<Action> {
        if !matches!(
            self.state,
            LifecycleState::Handshaking | LifecycleState::Connected
        ) {
            return Vec::new();
        }

        match (self.heartbeat, self.last_ping) {
            (Some(heartbeat), Some(last)) if now.duration_since(last) > heartbeat.max_silence() => {
                warn!(
                    silence_ms = now.duration_since(last).as_millis() as u64,
                    "no ping from server"
                );
                self.fail(DisconnectReason::HeartbeatTimeout)
            }
            _ => Vec::new(),
        }
    }

    /// Instant past which a missing PING is fatal.
    pub fn heartbeat_deadline(&self) -> Option<Instant> {
        Some(self.last_ping? + self.heartbeat?.max_silence())
    }

    /// Starts a local disconnect.
    pub fn close(&mut self) -> Vec<Action> {
        match self.state {
            LifecycleState::Connected => {
                self.state = LifecycleState::Disconnecting;
                vec![Action::Send(EnginePacket::Message(SocketPacket::disconnect(
                    &self.namespace,
                )))]
            }
            LifecycleState::Handshaking => {
                self.state = LifecycleState::Disconnecting;
                Vec::new()
            }
            LifecycleState::Disconnecting | LifecycleState::Disconnected => Vec::new(),
        }
    }

    /// Ends the connection with `reason`. No-op when already disconnected.
    pub fn fail(&mut self, reason: DisconnectReason) -> Vec<Action> {
        if self.state == LifecycleState::Disconnected {
            return Vec::new();
        }
        debug!(%reason, from = %self.state, "connection closed");
        self.state = LifecycleState::Disconnected;
        self.outbound.clear();
        vec![Action::Closed(reason)]
    }

    /// Ends the connection after `packet` could not be written.
    ///
    /// A PONG that cannot reach the server counts as a missed heartbeat.
    pub fn send_failed(&mut self, packet: &EnginePacket, error: NetworkError) -> Vec<Action> {
        let reason = match packet {
            EnginePacket::Pong(_) => DisconnectReason::HeartbeatTimeout,
            _ => DisconnectReason::Transport(error),
        };
        self.fail(reason)
    }

    fn on_open(&mut self, handshake: OpenHandshake, now: Instant) -> Vec<Action> {
        if self.state != LifecycleState::Handshaking || self.engine_sid.is_some() {
            warn!(sid = %handshake.sid, "unexpected OPEN ignored");
            return Vec::new();
        }

        debug!(
            sid = %handshake.sid,
            ping_interval = handshake.ping_interval,
            ping_timeout = handshake.ping_timeout,
            "engine.io open"
        );

        self.heartbeat = Some(Heartbeat {
            interval: Duration::from_millis(handshake.ping_interval),
            timeout: Duration::from_millis(handshake.ping_timeout),
        });
        self.last_ping = Some(now);
        self.engine_sid = Some(handshake.sid);

        vec![Action::Send(EnginePacket::Message(SocketPacket::connect(
            &self.namespace,
            self.auth.clone(),
        )))]
    }

    fn on_message(&mut self, packet: SocketPacket) -> Vec<Action> {
        if packet.namespace != self.namespace {
            trace!(namespace = %packet.namespace, "packet for foreign namespace ignored");
            return Vec::new();
        }

        match packet.kind {
            SocketPacketType::Connect => {
                if self.state != LifecycleState::Handshaking || self.engine_sid.is_none() {
                    warn!(state = %self.state, "unexpected CONNECT ignored");
                    return Vec::new();
                }
                let sid = packet.session_id().unwrap_or_default().to_string();
                self.socket_sid = Some(sid.clone());
                self.state = LifecycleState::Connected;

                let mut actions = vec![Action::Connected { sid }];
                actions.extend(
                    self.outbound
                        .drain(..)
                        .map(|queued| Action::Send(EnginePacket::Message(queued))),
                );
                actions
            }
            SocketPacketType::ConnectError => {
                if self.state != LifecycleState::Handshaking {
                    warn!(state = %self.state, "CONNECT_ERROR outside handshake ignored");
                    return Vec::new();
                }
                let message = packet.error_message();
                self.state = LifecycleState::Disconnected;
                self.outbound.clear();
                vec![Action::Rejected(message)]
            }
            SocketPacketType::Disconnect => self.fail(DisconnectReason::ServerDisconnect),
            SocketPacketType::Event => {
                if self.state != LifecycleState::Connected {
                    trace!(state = %self.state, "event outside connected state ignored");
                    return Vec::new();
                }
                let ack_id = packet.ack_id;
                let event = packet.event_name().unwrap_or_default().to_string();
                vec![Action::Dispatch {
                    event,
                    args: packet.into_args(),
                    ack_id,
                }]
            }
            SocketPacketType::Ack => match packet.ack_id {
                Some(id) => vec![Action::ResolveAck {
                    id,
                    args: packet.into_args(),
                }],
                None => Vec::new(),
            },
        }
    }
}
