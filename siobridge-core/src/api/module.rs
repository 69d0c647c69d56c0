// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Host Module Surface
//!
//! What a load-testing runtime binds into scripts: one [`RootModule`] per
//! process, one [`ModuleInstance`] per virtual user.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use super::bridge::Bridge;
use super::config::{BridgeConfig, ConnectOptions};
use super::error::BridgeResult;
use crate::network::{LifecycleState, Transport, WebSocketTransport};

/// Import path scripts use for this module.
pub const MODULE_NAME: &str = "k6/x/socketio";

/// Names exported to scripts.
pub const EXPORTS: [&str; 6] = ["connect", "emit", "emitWithAck", "on", "onAny", "disconnect"];

type SharedFactory<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Process-wide module: holds the immutable defaults and hands out
/// per-VU instances.
pub struct RootModule<T: Transport + 'static = WebSocketTransport> {
    name: String,
    config: BridgeConfig,
    factory: SharedFactory<T>,
    next_vu: AtomicU64,
}

impl RootModule<WebSocketTransport> {
    /// Creates the module with websocket transports.
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_transport_factory(config, WebSocketTransport::new)
    }
}

impl<T: Transport + 'static> RootModule<T> {
    /// Creates the module with a custom transport factory.
    pub fn with_transport_factory<F>(config: BridgeConfig, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        RootModule {
            name: MODULE_NAME.to_string(),
            config,
            factory: Arc::new(factory),
            next_vu: AtomicU64::new(1),
        }
    }

    /// Overrides the name used in log lines.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared defaults.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Creates the instance for a new virtual user.
    pub fn new_instance(&self) -> ModuleInstance<T> {
        let vu_id = self.next_vu.fetch_add(1, Ordering::Relaxed);
        let factory = self.factory.clone();
        let bridge = Bridge::with_transport_factory(self.config.clone(), move || factory())
            .with_vu_id(vu_id);

        ModuleInstance {
            name: self.name.clone(),
            bridge,
        }
    }
}

/// Per-VU module instance.
///
/// Mirrors the script API: `emit` and `connect` surface errors to the
/// script, `emitWithAck` never fails and reports problems in its result.
pub struct ModuleInstance<T: Transport + 'static = WebSocketTransport> {
    name: String,
    bridge: Bridge<T>,
}

impl<T: Transport + 'static> ModuleInstance<T> {
    /// Names this instance exports.
    pub fn exports(&self) -> &'static [&'static str] {
        &EXPORTS
    }

    /// Virtual user id.
    pub fn vu_id(&self) -> u64 {
        self.bridge.vu_id()
    }

    /// The underlying bridge.
    pub fn bridge(&self) -> &Bridge<T> {
        &self.bridge
    }

    /// Mutable access to the underlying bridge.
    pub fn bridge_mut(&mut self) -> &mut Bridge<T> {
        &mut self.bridge
    }

    /// True while connected.
    pub fn is_connected(&self) -> bool {
        self.bridge.state() == LifecycleState::Connected
    }

    /// `connect(url)`
    pub fn connect(&mut self, url: &str) -> BridgeResult<()> {
        debug!("[{}] Connect: url={}", self.name, url);
        self.bridge.connect(url, ConnectOptions::default())
    }

    /// `emit(event, data)`
    pub fn emit(&self, event: &str, data: Value) -> BridgeResult<()> {
        debug!("[{}] Emit: event={}, data={}", self.name, event, data);
        self.bridge.emit(event, data)
    }

    /// `emitWithAck(event, data[, timeoutMs])`
    ///
    /// Returns the ack payload, or `{"success": false, "error": "..."}` on
    /// any failure (including not being connected).
    pub fn emit_with_ack(&self, event: &str, data: Value, timeout_ms: Option<u64>) -> Value {
        let timeout_ms = timeout_ms.unwrap_or(self.bridge.config().ack_timeout_ms);
        debug!(
            "[{}] EmitWithAck: event={}, data={}, timeout={}",
            self.name, event, data, timeout_ms
        );

        match self
            .bridge
            .emit_with_ack(event, data, Some(Duration::from_millis(timeout_ms)))
        {
            Ok(reply) => {
                debug!("[{}] Ack callback for {}: {}", self.name, event, reply);
                reply
            }
            Err(e) => {
                debug!("[{}] Ack callback for {}: error: {}", self.name, event, e);
                json!({ "success": false, "error": e.to_string() })
            }
        }
    }

    /// `on(event, handler)`
    pub fn on<F>(&self, event: &str, handler: F)
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.bridge.on(event, handler);
    }

    /// `onAny(handler)`
    pub fn on_any<F>(&self, handler: F)
    where
        F: Fn(&str, &[Value]) + Send + Sync + 'static,
    {
        self.bridge.on_any(handler);
    }

    /// `disconnect()`
    pub fn disconnect(&mut self) -> BridgeResult<()> {
        debug!("[{}] Disconnect", self.name);
        self.bridge.disconnect()
    }
}
