// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Socket.IO Fixture Server
//!
//! Minimal websocket-only Socket.IO server on a random local port:
//! - `test` is answered with `test_response {received: true}`
//! - `ackevent` is acknowledged with `{success: true}`
//! - `silent` requests are never acknowledged
//! - every event is recorded in arrival order

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tungstenite::{Message, WebSocket};

use siobridge_core::network::{
    decode_packet, encode_packet, EnginePacket, OpenHandshake, SocketPacket, SocketPacketType,
};

/// One recorded client event.
#[derive(Debug, Clone, PartialEq)]
pub struct Received {
    pub event: String,
    pub args: Vec<Value>,
    pub ack_id: Option<u64>,
}

/// Handle on a running fixture.
#[derive(Clone)]
pub struct FixtureServer {
    port: u16,
    received: Arc<Mutex<Vec<Received>>>,
    connections: Arc<Mutex<usize>>,
}

impl FixtureServer {
    /// Starts the fixture on 127.0.0.1 with an ephemeral port.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fixture");
        let port = listener.local_addr().expect("local addr").port();
        let server = FixtureServer {
            port,
            received: Arc::new(Mutex::new(Vec::new())),
            connections: Arc::new(Mutex::new(0)),
        };

        let handle = server.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let handle = handle.clone();
                thread::spawn(move || handle.serve(stream));
            }
        });

        server
    }

    /// `http://` url, as a script would pass it.
    pub fn http_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Events received so far.
    pub fn received(&self) -> Vec<Received> {
        self.received.lock().clone()
    }

    /// Names of the events received so far.
    pub fn event_names(&self) -> Vec<String> {
        self.received().into_iter().map(|r| r.event).collect()
    }

    /// Number of accepted websocket sessions.
    pub fn connections(&self) -> usize {
        *self.connections.lock()
    }

    fn serve(&self, stream: TcpStream) {
        let Ok(mut socket) = tungstenite::accept(stream) else {
            return;
        };
        *self.connections.lock() += 1;

        let open = EnginePacket::Open(OpenHandshake {
            sid: format!("fixture-{}", self.connections()),
            upgrades: Vec::new(),
            ping_interval: 25_000,
            ping_timeout: 20_000,
            max_payload: Some(1_000_000),
        });
        if send(&mut socket, &open).is_err() {
            return;
        }

        while let Ok(message) = socket.read() {
            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            let Ok(EnginePacket::Message(packet)) = decode_packet(&text) else {
                continue;
            };
            if !self.react(&mut socket, packet) {
                break;
            }
        }
    }

    fn react(&self, socket: &mut WebSocket<TcpStream>, packet: SocketPacket) -> bool {
        match packet.kind {
            SocketPacketType::Connect => {
                let reply = SocketPacket::connect("/", Some(json!({ "sid": "fixture-socket" })));
                send(socket, &EnginePacket::Message(reply)).is_ok()
            }
            SocketPacketType::Disconnect => false,
            SocketPacketType::Event => {
                let event = packet.event_name().unwrap_or_default().to_string();
                let ack_id = packet.ack_id;
                self.received.lock().push(Received {
                    event: event.clone(),
                    args: packet.into_args(),
                    ack_id,
                });

                match (event.as_str(), ack_id) {
                    ("test", _) => {
                        let reply = SocketPacket::event(
                            "/",
                            "test_response",
                            vec![json!({ "received": true })],
                            None,
                        );
                        send(socket, &EnginePacket::Message(reply)).is_ok()
                    }
                    ("silent", _) => true,
                    (_, Some(id)) => {
                        let reply = SocketPacket::ack("/", id, vec![json!({ "success": true })]);
                        send(socket, &EnginePacket::Message(reply)).is_ok()
                    }
                    _ => true,
                }
            }
            _ => true,
        }
    }
}

fn send(socket: &mut WebSocket<TcpStream>, packet: &EnginePacket) -> tungstenite::Result<()> {
    socket.send(Message::Text(encode_packet(packet)))
}
