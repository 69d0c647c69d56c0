// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for network::mock

use std::time::Duration;

use serde_json::json;
use siobridge_core::network::*;

fn event_frame(name: &str, ack_id: Option<u64>) -> Frame {
    let packet = EnginePacket::Message(SocketPacket::event("/", name, vec![json!(1)], ack_id));
    Frame::Text(encode_packet(&packet))
}

#[test]
fn test_mock_transport_connect_disconnect() {
    let mut transport = MockTransport::new();

    assert_eq!(transport.state(), ConnectionState::Disconnected);

    transport.connect(&TransportConfig::default()).unwrap();
    assert_eq!(transport.state(), ConnectionState::Connected);

    transport.disconnect().unwrap();
    assert_eq!(transport.state(), ConnectionState::Disconnected);
}

#[test]
fn test_mock_transport_send_receive() {
    let server = MockServer::new();
    server.set_poll_interval(Duration::from_millis(1));
    let mut transport = server.transport();
    transport.connect(&TransportConfig::default()).unwrap();

    server.queue_receive("2");
    assert_eq!(transport.receive().unwrap(), Some(Frame::from("2")));

    // Nothing left: the poll interval elapses
    assert_eq!(transport.receive().unwrap(), None);
}

#[test]
fn test_mock_transport_records_sent_frames() {
    let mut transport = MockTransport::new();
    let server = transport.server();
    transport.connect(&TransportConfig::default()).unwrap();

    transport.send(event_frame("loop", None)).unwrap();

    assert_eq!(server.sent_frames().len(), 1);
    let events = server.sent_events();
    assert_eq!(events[0].event_name(), Some("loop"));
}

#[test]
fn test_mock_transport_error_injection() {
    let mut transport = MockTransport::new();
    transport
        .server()
        .inject_error(NetworkError::ConnectionFailed("test error".into()));

    let result = transport.connect(&TransportConfig::default());
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("test error"));

    // Injected errors are one-shot
    assert!(transport.connect(&TransportConfig::default()).is_ok());
    assert_eq!(transport.server().connect_count(), 2);
}

#[test]
fn test_mock_transport_send_requires_connection() {
    let mut transport = MockTransport::new();
    let result = transport.send(Frame::from("2"));
    assert_eq!(result, Err(NetworkError::NotConnected));
}

#[test]
fn test_mock_transport_fail_sends() {
    let mut transport = MockTransport::new();
    let server = transport.server();
    transport.connect(&TransportConfig::default()).unwrap();

    server.fail_sends(Some(NetworkError::SendFailed("broken pipe".into())));
    assert!(transport.send(Frame::from("3")).is_err());

    server.fail_sends(None);
    assert!(transport.send(Frame::from("3")).is_ok());
}

#[test]
fn test_mock_server_answers_handshake() {
    let server = MockServer::socket_io();
    server.set_poll_interval(Duration::from_millis(1));
    let mut transport = server.transport();
    transport.connect(&TransportConfig::default()).unwrap();

    let open = transport.receive().unwrap().unwrap();
    assert!(matches!(
        decode_packet(open.as_text().unwrap()),
        Ok(EnginePacket::Open(_))
    ));

    transport
        .send(Frame::Text(encode_packet(&EnginePacket::Message(
            SocketPacket::connect("/", None),
        ))))
        .unwrap();

    let reply = transport.receive().unwrap().unwrap();
    match decode_packet(reply.as_text().unwrap()).unwrap() {
        EnginePacket::Message(packet) => {
            assert_eq!(packet.kind, SocketPacketType::Connect);
            assert_eq!(packet.session_id(), Some("mock-socket-sid"));
        }
        other => panic!("expected CONNECT reply, got {:?}", other),
    }
}

#[test]
fn test_mock_server_auto_ack() {
    let server = MockServer::socket_io();
    server.set_poll_interval(Duration::from_millis(1));
    let mut transport = server.transport();
    transport.connect(&TransportConfig::default()).unwrap();
    transport.receive().unwrap(); // OPEN

    transport.send(event_frame("ackevent", Some(4))).unwrap();
    assert!(server.has_pending());

    let reply = transport.receive().unwrap().unwrap();
    assert_eq!(reply.as_text(), Some(r#"434[{"success":true}]"#));
}

#[test]
fn test_mock_server_rejects_connect() {
    let server = MockServer::socket_io();
    server.reject_connect("Not authorized");
    let mut transport = server.transport();
    transport.connect(&TransportConfig::default()).unwrap();
    transport.receive().unwrap(); // OPEN

    transport
        .send(Frame::Text(encode_packet(&EnginePacket::Message(
            SocketPacket::connect("/", None),
        ))))
        .unwrap();

    let reply = transport.receive().unwrap().unwrap();
    assert_eq!(reply.as_text(), Some(r#"44{"message":"Not authorized"}"#));
}

#[test]
fn test_mock_server_custom_responder() {
    let server = MockServer::new();
    server.set_responder(|packet| {
        if packet.event_name() == Some("ping") {
            vec![EnginePacket::Message(SocketPacket::event(
                "/",
                "pong",
                vec![],
                None,
            ))]
        } else {
            vec![]
        }
    });
    let mut transport = server.transport();
    transport.connect(&TransportConfig::default()).unwrap();

    transport.send(event_frame("ping", None)).unwrap();
    let reply = transport.receive().unwrap().unwrap();
    assert_eq!(reply.as_text(), Some(r#"42["pong"]"#));
}

#[test]
fn test_mock_server_close_from_server() {
    let server = MockServer::new();
    let mut transport = server.transport();
    transport.connect(&TransportConfig::default()).unwrap();

    server.close_from_server();
    assert_eq!(transport.receive(), Err(NetworkError::ConnectionClosed));
    assert_eq!(transport.state(), ConnectionState::Disconnected);
}

#[test]
fn test_mock_server_wait_for_sent() {
    let server = MockServer::new();
    let mut transport = server.transport();
    transport.connect(&TransportConfig::default()).unwrap();

    let waiter = {
        let server = server.clone();
        std::thread::spawn(move || {
            server.wait_for_sent(Duration::from_secs(2), |frames| frames.len() == 2)
        })
    };
    transport.send(Frame::from("3")).unwrap();
    transport.send(Frame::from("3")).unwrap();

    assert!(waiter.join().unwrap());
    assert!(!server.wait_for_sent(Duration::from_millis(10), |frames| frames.len() == 3));
}

#[test]
fn test_mock_server_records_connect_config() {
    let mut transport = MockTransport::new();
    let config = TransportConfig {
        server_url: "ws://mock/socket.io/?EIO=4&transport=websocket".into(),
        ..Default::default()
    };
    transport.connect(&config).unwrap();

    let seen = transport.server().last_config().unwrap();
    assert_eq!(seen.server_url, config.server_url);
}
