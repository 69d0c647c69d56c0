// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for network::connection

use std::time::{Duration, Instant};

use serde_json::json;
use siobridge_core::network::*;

fn open(interval: u64, timeout: u64) -> EnginePacket {
    EnginePacket::Open(OpenHandshake {
        sid: "eio".into(),
        upgrades: vec!["websocket".into()],
        ping_interval: interval,
        ping_timeout: timeout,
        max_payload: None,
    })
}

fn message(packet: SocketPacket) -> EnginePacket {
    EnginePacket::Message(packet)
}

fn connected_at(now: Instant) -> Connection {
    let mut conn = Connection::new(None);
    conn.on_transport_open(now);
    conn.handle_packet(open(25_000, 20_000), now);
    conn.handle_packet(
        message(SocketPacket::connect("/", Some(json!({ "sid": "s1" })))),
        now,
    );
    conn
}

#[test]
fn test_new_connection_is_disconnected() {
    let conn = Connection::new(None);
    assert_eq!(conn.state(), LifecycleState::Disconnected);
    assert_eq!(conn.session_id(), None);
    assert_eq!(conn.opened_at(), None);
}

#[test]
fn test_full_handshake() {
    let now = Instant::now();
    let conn = connected_at(now);

    assert_eq!(conn.state(), LifecycleState::Connected);
    assert_eq!(conn.session_id(), Some("s1"));
    assert_eq!(conn.engine_session_id(), Some("eio"));
    assert_eq!(conn.opened_at(), Some(now));
}

#[test]
fn test_packets_before_transport_open_ignored() {
    let mut conn = Connection::new(None);
    let actions = conn.handle_packet(open(1, 1), Instant::now());
    assert!(actions.is_empty());
    assert_eq!(conn.state(), LifecycleState::Disconnected);
}

#[test]
fn test_connect_before_open_ignored() {
    let now = Instant::now();
    let mut conn = Connection::new(None);
    conn.on_transport_open(now);

    let actions = conn.handle_packet(message(SocketPacket::connect("/", None)), now);
    assert!(actions.is_empty());
    assert_eq!(conn.state(), LifecycleState::Handshaking);
}

#[test]
fn test_event_dispatch_with_server_ack_request() {
    let now = Instant::now();
    let mut conn = connected_at(now);

    let actions = conn.handle_packet(
        message(SocketPacket::event("/", "test_response", vec![json!({ "received": true })], Some(5))),
        now,
    );
    assert_eq!(
        actions,
        vec![Action::Dispatch {
            event: "test_response".into(),
            args: vec![json!({ "received": true })],
            ack_id: Some(5),
        }]
    );
}

#[test]
fn test_ack_packet_resolves() {
    let now = Instant::now();
    let mut conn = connected_at(now);

    let actions = conn.handle_packet(message(SocketPacket::ack("/", 3, vec![json!(42)])), now);
    assert_eq!(
        actions,
        vec![Action::ResolveAck {
            id: 3,
            args: vec![json!(42)]
        }]
    );
}

#[test]
fn test_foreign_namespace_ignored() {
    let now = Instant::now();
    let mut conn = connected_at(now);

    let actions = conn.handle_packet(
        message(SocketPacket::event("/admin", "secret", vec![], None)),
        now,
    );
    assert!(actions.is_empty());
}

#[test]
fn test_server_disconnect_closes() {
    let now = Instant::now();
    let mut conn = connected_at(now);

    let actions = conn.handle_packet(message(SocketPacket::disconnect("/")), now);
    assert_eq!(actions, vec![Action::Closed(DisconnectReason::ServerDisconnect)]);
    assert_eq!(conn.state(), LifecycleState::Disconnected);

    // Terminal: nothing more is processed
    assert!(conn
        .handle_packet(EnginePacket::Ping(String::new()), now)
        .is_empty());
}

#[test]
fn test_engine_close_closes() {
    let now = Instant::now();
    let mut conn = connected_at(now);

    let actions = conn.handle_packet(EnginePacket::Close, now);
    assert_eq!(actions, vec![Action::Closed(DisconnectReason::ServerDisconnect)]);
}

#[test]
fn test_heartbeat_timeout_during_handshake() {
    let start = Instant::now();
    let mut conn = Connection::new(None);
    conn.on_transport_open(start);
    conn.handle_packet(open(10, 10), start);

    let actions = conn.poll_heartbeat(start + Duration::from_millis(25));
    assert_eq!(actions, vec![Action::Closed(DisconnectReason::HeartbeatTimeout)]);
}

#[test]
fn test_failed_pong_is_heartbeat_timeout() {
    let now = Instant::now();
    let mut conn = connected_at(now);

    let actions = conn.send_failed(
        &EnginePacket::Pong(String::new()),
        NetworkError::SendFailed("broken pipe".into()),
    );
    assert_eq!(actions, vec![Action::Closed(DisconnectReason::HeartbeatTimeout)]);
    assert_eq!(conn.state(), LifecycleState::Disconnected);
}

#[test]
fn test_failed_event_send_is_transport_loss() {
    let now = Instant::now();
    let mut conn = connected_at(now);
    let error = NetworkError::SendFailed("broken pipe".into());

    let actions = conn.send_failed(
        &message(SocketPacket::event("/", "test", vec![], None)),
        error.clone(),
    );
    assert_eq!(actions, vec![Action::Closed(DisconnectReason::Transport(error))]);

    // Already closed: a second failure changes nothing
    assert!(conn
        .send_failed(&EnginePacket::Pong(String::new()), NetworkError::ConnectionClosed)
        .is_empty());
}

#[test]
fn test_emit_connected_sends_immediately() {
    let now = Instant::now();
    let mut conn = connected_at(now);
    let packet = SocketPacket::event("/", "ping", vec![json!({ "time": 1 })], None);

    let actions = conn.emit(packet.clone());
    assert_eq!(actions, vec![Action::Send(EnginePacket::Message(packet))]);
}

#[test]
fn test_emit_after_close_dropped() {
    let now = Instant::now();
    let mut conn = connected_at(now);
    conn.close();

    let actions = conn.emit(SocketPacket::event("/", "late", vec![], None));
    assert!(actions.is_empty());
}

#[test]
fn test_fail_is_idempotent() {
    let now = Instant::now();
    let mut conn = connected_at(now);

    let reason = DisconnectReason::Transport(NetworkError::ConnectionClosed);
    assert_eq!(conn.fail(reason.clone()), vec![Action::Closed(reason)]);
    assert!(conn.fail(DisconnectReason::ClientDisconnect).is_empty());
}

#[test]
fn test_lifecycle_state_display() {
    assert_eq!(LifecycleState::Handshaking.to_string(), "handshaking");
    assert_eq!(LifecycleState::Disconnecting.to_string(), "disconnecting");
}
