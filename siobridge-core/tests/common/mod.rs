// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Common Test Utilities
//!
//! Shared helpers, fixtures, and utilities used across test modules.

#![allow(dead_code)]

pub mod fixture;
pub mod strategies;

use std::sync::Once;
use std::time::Duration;

use siobridge_core::api::{Bridge, BridgeConfig, ConnectOptions};
use siobridge_core::network::{MockServer, MockTransport};

static TRACING: Once = Once::new();

/// Installs a test subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Config with short timeouts for tests.
pub fn test_config() -> BridgeConfig {
    BridgeConfig::default()
        .with_default_url("ws://mock.invalid:4000")
        .with_connect_timeout_ms(2_000)
        .with_ack_timeout_ms(1_000)
        .with_disconnect_grace_ms(500)
        .with_poll_interval_ms(5)
}

/// Bridge whose transports all talk to `server`.
pub fn mock_bridge(server: &MockServer) -> Bridge<MockTransport> {
    init_tracing();
    let server = server.clone();
    Bridge::with_transport_factory(test_config(), move || server.transport())
}

/// Bridge already connected to a fresh auto-answering mock server.
pub fn connected_bridge() -> (Bridge<MockTransport>, MockServer) {
    let server = MockServer::socket_io();
    server.set_poll_interval(Duration::from_millis(5));
    let mut bridge = mock_bridge(&server);
    bridge
        .connect("", ConnectOptions::default())
        .expect("mock connect");
    (bridge, server)
}

/// Polls `condition` until it holds or `timeout` passes.
pub fn wait_until<F: Fn() -> bool>(timeout: Duration, condition: F) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
