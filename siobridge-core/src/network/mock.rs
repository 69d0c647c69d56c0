// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mock Transport
//!
//! In-memory transport with a scriptable Socket.IO server on the other end.
//! The [`MockTransport`] is handed to the code under test (and usually moved
//! into a driver thread); the [`MockServer`] handle stays with the test to
//! queue frames and inspect what was sent.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde_json::{json, Value};

use super::error::NetworkError;
use super::message::{EnginePacket, OpenHandshake, SocketPacket, SocketPacketType};
use super::protocol::{decode_packet, encode_packet};
use super::transport::{ConnectionState, Frame, Transport, TransportConfig, TransportResult};

type Responder = Box<dyn Fn(&SocketPacket) -> Vec<EnginePacket> + Send>;

struct MockState {
    state: ConnectionState,
    incoming: VecDeque<Frame>,
    sent: Vec<Frame>,
    connect_error: Option<NetworkError>,
    send_error: Option<NetworkError>,
    closed_by_peer: bool,
    handshake: Option<OpenHandshake>,
    reject_connect: Option<String>,
    ack_reply: Option<Vec<Value>>,
    responder: Option<Responder>,
    poll_interval: Duration,
    connect_count: usize,
    last_config: Option<TransportConfig>,
}

struct MockShared {
    state: Mutex<MockState>,
    changed: Condvar,
}

/// Test-side handle of a mock connection.
#[derive(Clone)]
pub struct MockServer {
    shared: Arc<MockShared>,
}

/// Mock transport for testing.
///
/// Records sent frames, replays queued frames, and can answer the Socket.IO
/// handshake and ack requests on its own.
pub struct MockTransport {
    shared: Arc<MockShared>,
}

impl MockServer {
    /// Creates a passive server: it only delivers what the test queues.
    pub fn new() -> Self {
        MockServer {
            shared: Arc::new(MockShared {
                state: Mutex::new(MockState {
                    state: ConnectionState::Disconnected,
                    incoming: VecDeque::new(),
                    sent: Vec::new(),
                    connect_error: None,
                    send_error: None,
                    closed_by_peer: false,
                    handshake: None,
                    reject_connect: None,
                    ack_reply: None,
                    responder: None,
                    poll_interval: Duration::from_millis(10),
                    connect_count: 0,
                    last_config: None,
                }),
                changed: Condvar::new(),
            }),
        }
    }

    /// Creates a server that completes the handshake and acks every
    /// ack-requesting event with `{"success": true}`.
    pub fn socket_io() -> Self {
        let server = MockServer::new();
        server.set_handshake(Some(Self::default_handshake()));
        server.set_auto_ack(Some(vec![json!({ "success": true })]));
        server
    }

    /// Handshake used by [`MockServer::socket_io`].
    pub fn default_handshake() -> OpenHandshake {
        OpenHandshake {
            sid: "mock-engine-sid".to_string(),
            upgrades: Vec::new(),
            ping_interval: 25_000,
            ping_timeout: 20_000,
            max_payload: Some(1_000_000),
        }
    }

    /// Creates a transport connected to this server.
    pub fn transport(&self) -> MockTransport {
        MockTransport {
            shared: self.shared.clone(),
        }
    }

    /// Sends an OPEN with this handshake on every connect (`None` disables).
    pub fn set_handshake(&self, handshake: Option<OpenHandshake>) {
        self.shared.state.lock().handshake = handshake;
    }

    /// Answers the next namespace CONNECT requests with CONNECT_ERROR.
    pub fn reject_connect(&self, message: &str) {
        self.shared.state.lock().reject_connect = Some(message.to_string());
    }

    /// Replies to ack-requesting events with these args (`None` disables).
    pub fn set_auto_ack(&self, reply: Option<Vec<Value>>) {
        self.shared.state.lock().ack_reply = reply;
    }

    /// Installs a custom reaction to every Socket.IO packet the client sends.
    pub fn set_responder<F>(&self, responder: F)
    where
        F: Fn(&SocketPacket) -> Vec<EnginePacket> + Send + 'static,
    {
        self.shared.state.lock().responder = Some(Box::new(responder));
    }

    /// Queues a frame for the client to receive.
    pub fn queue_receive(&self, frame: impl Into<Frame>) {
        let mut state = self.shared.state.lock();
        state.incoming.push_back(frame.into());
        self.shared.changed.notify_all();
    }

    /// Queues an encoded packet for the client to receive.
    pub fn queue_packet(&self, packet: &EnginePacket) {
        self.queue_receive(encode_packet(packet));
    }

    /// Makes the next `connect` fail with this error.
    pub fn inject_error(&self, error: NetworkError) {
        self.shared.state.lock().connect_error = Some(error);
    }

    /// Makes every `send` fail with this error (`None` heals).
    pub fn fail_sends(&self, error: Option<NetworkError>) {
        self.shared.state.lock().send_error = error;
    }

    /// Simulates the server dropping the stream.
    pub fn close_from_server(&self) {
        let mut state = self.shared.state.lock();
        state.closed_by_peer = true;
        self.shared.changed.notify_all();
    }

    /// Sets how long `receive` waits for a frame.
    pub fn set_poll_interval(&self, interval: Duration) {
        self.shared.state.lock().poll_interval = interval;
    }

    /// Forces the transport state.
    pub fn set_state(&self, state: ConnectionState) {
        self.shared.state.lock().state = state;
    }

    /// Returns the transport state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state.lock().state.clone()
    }

    /// Returns all frames sent by the client.
    pub fn sent_frames(&self) -> Vec<Frame> {
        self.shared.state.lock().sent.clone()
    }

    /// Returns sent frames decoded as packets (undecodable frames skipped).
    pub fn sent_packets(&self) -> Vec<EnginePacket> {
        self.sent_frames()
            .iter()
            .filter_map(Frame::as_text)
            .filter_map(|text| decode_packet(text).ok())
            .collect()
    }

    /// Returns the Socket.IO EVENT packets sent by the client.
    pub fn sent_events(&self) -> Vec<SocketPacket> {
        self.sent_packets()
            .into_iter()
            .filter_map(|packet| match packet {
                EnginePacket::Message(inner) if inner.kind == SocketPacketType::Event => Some(inner),
                _ => None,
            })
            .collect()
    }

    /// Clears the sent frames history.
    pub fn clear_sent(&self) {
        self.shared.state.lock().sent.clear();
    }

    /// Returns true if frames are waiting to be received.
    pub fn has_pending(&self) -> bool {
        !self.shared.state.lock().incoming.is_empty()
    }

    /// Number of `connect` calls seen.
    pub fn connect_count(&self) -> usize {
        self.shared.state.lock().connect_count
    }

    /// Config passed to the last `connect`.
    pub fn last_config(&self) -> Option<TransportConfig> {
        self.shared.state.lock().last_config.clone()
    }

    /// Blocks until `predicate` holds for the sent frames or `timeout` passes.
    pub fn wait_for_sent<F>(&self, timeout: Duration, predicate: F) -> bool
    where
        F: Fn(&[Frame]) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        loop {
            if predicate(&state.sent) {
                return true;
            }
            if self
                .shared
                .changed
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return predicate(&state.sent);
            }
        }
    }
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Creates a transport with its own passive server.
    pub fn new() -> Self {
        MockServer::new().transport()
    }

    /// Returns the server side of this transport.
    pub fn server(&self) -> MockServer {
        MockServer {
            shared: self.shared.clone(),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    fn react(&mut self, text: &str) {
        let packet = match decode_packet(text) {
            Ok(EnginePacket::Message(packet)) => packet,
            _ => return,
        };

        let mut replies = Vec::new();
        match packet.kind {
            SocketPacketType::Connect => match self.reject_connect.take() {
                Some(message) => replies.push(EnginePacket::Message(SocketPacket {
                    kind: SocketPacketType::ConnectError,
                    namespace: packet.namespace.clone(),
                    ack_id: None,
                    data: Some(json!({ "message": message })),
                })),
                None if self.handshake.is_some() => {
                    replies.push(EnginePacket::Message(SocketPacket::connect(
                        &packet.namespace,
                        Some(json!({ "sid": "mock-socket-sid" })),
                    )));
                }
                None => {}
            },
            SocketPacketType::Event => {
                if let (Some(id), Some(reply)) = (packet.ack_id, &self.ack_reply) {
                    replies.push(EnginePacket::Message(SocketPacket::ack(
                        &packet.namespace,
                        id,
                        reply.clone(),
                    )));
                }
            }
            _ => {}
        }

        if let Some(responder) = &self.responder {
            replies.extend(responder(&packet));
        }

        for reply in replies {
            self.incoming.push_back(Frame::Text(encode_packet(&reply)));
        }
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, config: &TransportConfig) -> TransportResult<()> {
        let mut state = self.shared.state.lock();
        state.connect_count += 1;
        state.last_config = Some(config.clone());

        if let Some(error) = state.connect_error.take() {
            return Err(error);
        }

        state.state = ConnectionState::Connected;
        state.closed_by_peer = false;
        if let Some(handshake) = state.handshake.clone() {
            state
                .incoming
                .push_back(Frame::Text(encode_packet(&EnginePacket::Open(handshake))));
        }
        self.shared.changed.notify_all();
        Ok(())
    }

    fn disconnect(&mut self) -> TransportResult<()> {
        let mut state = self.shared.state.lock();
        state.state = ConnectionState::Disconnected;
        self.shared.changed.notify_all();
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.shared.state.lock().state.clone()
    }

    fn send(&mut self, frame: Frame) -> TransportResult<()> {
        let mut state = self.shared.state.lock();
        if state.state != ConnectionState::Connected {
            return Err(NetworkError::NotConnected);
        }
        if let Some(error) = state.send_error.clone() {
            return Err(error);
        }

        if let Frame::Text(text) = &frame {
            state.react(text);
        }
        state.sent.push(frame);
        self.shared.changed.notify_all();
        Ok(())
    }

    fn receive(&mut self) -> TransportResult<Option<Frame>> {
        let mut state = self.shared.state.lock();
        if state.state != ConnectionState::Connected {
            return Err(NetworkError::NotConnected);
        }

        let deadline = Instant::now() + state.poll_interval;
        loop {
            if let Some(frame) = state.incoming.pop_front() {
                return Ok(Some(frame));
            }
            if state.closed_by_peer {
                state.state = ConnectionState::Disconnected;
                return Err(NetworkError::ConnectionClosed);
            }
            if self
                .shared
                .changed
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return Ok(None);
            }
        }
    }
}
