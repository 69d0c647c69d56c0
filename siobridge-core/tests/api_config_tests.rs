// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for api::config

use std::collections::HashMap;

use serde_json::json;
use siobridge_core::api::*;

#[test]
fn test_default_config() {
    let config = BridgeConfig::default();

    assert_eq!(config.default_url, "ws://localhost:4000");
    assert_eq!(config.connect_timeout_ms, 10_000);
    assert_eq!(config.ack_timeout_ms, 2_000);
    assert_eq!(config.disconnect_grace_ms, 1_000);
    assert_eq!(config.io_timeout_ms, 30_000);
    assert_eq!(config.path, "/socket.io/");
}

#[test]
fn test_builder_methods() {
    let config = BridgeConfig::default()
        .with_default_url("ws://example.com")
        .with_connect_timeout_ms(1)
        .with_ack_timeout_ms(2)
        .with_disconnect_grace_ms(3)
        .with_poll_interval_ms(4);

    assert_eq!(config.default_url, "ws://example.com");
    assert_eq!(config.connect_timeout_ms, 1);
    assert_eq!(config.ack_timeout().as_millis(), 2);
    assert_eq!(config.disconnect_grace().as_millis(), 3);
    assert_eq!(config.poll_interval_ms, 4);
}

#[test]
fn test_from_lookup_overrides() {
    let vars: HashMap<&str, &str> = [
        (ENV_URL, "https://load.example.com"),
        (ENV_ACK_TIMEOUT_MS, "5000"),
        (ENV_CONNECT_TIMEOUT_MS, "not-a-number"),
    ]
    .into_iter()
    .collect();

    let config = BridgeConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

    assert_eq!(config.default_url, "https://load.example.com");
    assert_eq!(config.ack_timeout_ms, 5_000);
    // Unparseable values keep the default
    assert_eq!(config.connect_timeout_ms, 10_000);
    assert_eq!(config.disconnect_grace_ms, 1_000);
}

#[test]
fn test_from_lookup_empty_url_ignored() {
    let config = BridgeConfig::from_lookup(|key| (key == ENV_URL).then(|| "  ".to_string()));
    assert_eq!(config.default_url, BridgeConfig::default().default_url);
}

#[test]
fn test_resolve_http_url() {
    let config = BridgeConfig::default();
    let url = config
        .resolve_url("http://localhost:4000", &ConnectOptions::default())
        .unwrap();
    assert_eq!(url, "ws://localhost:4000/socket.io/?EIO=4&transport=websocket");
}

#[test]
fn test_resolve_https_url() {
    let config = BridgeConfig::default();
    let url = config
        .resolve_url("https://io.example.com", &ConnectOptions::default())
        .unwrap();
    assert_eq!(url, "wss://io.example.com/socket.io/?EIO=4&transport=websocket");
}

#[test]
fn test_resolve_keeps_explicit_path_and_query() {
    let config = BridgeConfig::default();
    let url = config
        .resolve_url("ws://host:81/custom/?EIO=4", &ConnectOptions::default())
        .unwrap();
    assert_eq!(url, "ws://host:81/custom/?EIO=4&transport=websocket");
}

#[test]
fn test_resolve_empty_url_uses_default() {
    let config = BridgeConfig::default().with_default_url("ws://fallback:9000");
    let url = config.resolve_url("  ", &ConnectOptions::default()).unwrap();
    assert!(url.starts_with("ws://fallback:9000/socket.io/"));
}

#[test]
fn test_resolve_appends_query_options() {
    let config = BridgeConfig::default();
    let options = ConnectOptions::default().with_query("room", "lobby");
    let url = config.resolve_url("ws://localhost:4000", &options).unwrap();
    assert!(url.ends_with("EIO=4&transport=websocket&room=lobby"));
}

#[test]
fn test_resolve_rejects_bad_urls() {
    let config = BridgeConfig::default();
    assert!(matches!(
        config.resolve_url("not a url", &ConnectOptions::default()),
        Err(BridgeError::InvalidUrl(_))
    ));
    assert!(matches!(
        config.resolve_url("ftp://example.com", &ConnectOptions::default()),
        Err(BridgeError::InvalidUrl(_))
    ));
}

#[test]
fn test_transport_config_applies_overrides() {
    let config = BridgeConfig::default();
    let options = ConnectOptions::default()
        .with_auth(json!({ "token": "t" }))
        .with_header("X-Load-Test", "1")
        .with_connect_timeout_ms(250);

    let transport = config.to_transport_config("ws://h/socket.io/", &options);

    assert_eq!(transport.server_url, "ws://h/socket.io/");
    assert_eq!(transport.connect_timeout_ms, 250);
    assert_eq!(transport.io_timeout_ms, config.io_timeout_ms);
    assert_eq!(transport.poll_interval_ms, config.poll_interval_ms);
    assert_eq!(transport.headers, vec![("X-Load-Test".to_string(), "1".to_string())]);
}
