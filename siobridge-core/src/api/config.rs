// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Configuration
//!
//! Process-wide defaults, fixed before the first virtual user starts and
//! cloned into every bridge. Per-call overrides go through [`ConnectOptions`].

use std::time::Duration;

use serde_json::Value;
use url::Url;

use super::error::{BridgeError, BridgeResult};
use crate::network::{TransportConfig, ENGINE_IO_VERSION};

/// Environment variable for the default server url.
pub const ENV_URL: &str = "SIOBRIDGE_URL";
/// Environment variable for the connect timeout.
pub const ENV_CONNECT_TIMEOUT_MS: &str = "SIOBRIDGE_CONNECT_TIMEOUT_MS";
/// Environment variable for the default ack timeout.
pub const ENV_ACK_TIMEOUT_MS: &str = "SIOBRIDGE_ACK_TIMEOUT_MS";
/// Environment variable for the disconnect grace period.
pub const ENV_DISCONNECT_GRACE_MS: &str = "SIOBRIDGE_DISCONNECT_GRACE_MS";

/// Configuration shared by all bridges of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Url used when `connect` is given an empty one.
    pub default_url: String,

    /// Handshake deadline in milliseconds (transport open + OPEN + CONNECT).
    pub connect_timeout_ms: u64,

    /// Default `emit_with_ack` deadline in milliseconds.
    pub ack_timeout_ms: u64,

    /// How long `disconnect` waits for teardown before forcing it.
    pub disconnect_grace_ms: u64,

    /// Socket write timeout in milliseconds.
    pub io_timeout_ms: u64,

    /// Reader loop granularity in milliseconds.
    pub poll_interval_ms: u64,

    /// Engine.IO path appended to urls without one.
    pub path: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            default_url: "ws://localhost:4000".to_string(),
            connect_timeout_ms: 10_000,
            ack_timeout_ms: 2_000,
            disconnect_grace_ms: 1_000,
            io_timeout_ms: 30_000,
            poll_interval_ms: 20,
            path: "/socket.io/".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Defaults overridden by `SIOBRIDGE_*` environment variables.
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`BridgeConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = BridgeConfig::default();
        let millis = |key: &str, default: u64| {
            lookup(key)
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };

        BridgeConfig {
            default_url: lookup(ENV_URL)
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| defaults.default_url.clone()),
            connect_timeout_ms: millis(ENV_CONNECT_TIMEOUT_MS, defaults.connect_timeout_ms),
            ack_timeout_ms: millis(ENV_ACK_TIMEOUT_MS, defaults.ack_timeout_ms),
            disconnect_grace_ms: millis(ENV_DISCONNECT_GRACE_MS, defaults.disconnect_grace_ms),
            ..defaults
        }
    }

    /// Sets the default server url.
    pub fn with_default_url(mut self, url: impl Into<String>) -> Self {
        self.default_url = url.into();
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    /// Sets the default ack timeout.
    pub fn with_ack_timeout_ms(mut self, ms: u64) -> Self {
        self.ack_timeout_ms = ms;
        self
    }

    /// Sets the disconnect grace period.
    pub fn with_disconnect_grace_ms(mut self, ms: u64) -> Self {
        self.disconnect_grace_ms = ms;
        self
    }

    /// Sets the reader loop granularity.
    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Default ack timeout as a duration.
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    /// Disconnect grace period as a duration.
    pub fn disconnect_grace(&self) -> Duration {
        Duration::from_millis(self.disconnect_grace_ms)
    }

    /// Builds the websocket endpoint for a script-supplied url.
    ///
    /// `http`/`https` map to `ws`/`wss`, an empty path becomes
    /// [`BridgeConfig::path`], and the Engine.IO query (`EIO=4`,
    /// `transport=websocket`) plus any extra pairs are appended.
    pub fn resolve_url(&self, url: &str, options: &ConnectOptions) -> BridgeResult<String> {
        let raw = match url.trim() {
            "" => self.default_url.trim(),
            given => given,
        };
        let mut endpoint =
            Url::parse(raw).map_err(|e| BridgeError::InvalidUrl(format!("{}: {}", raw, e)))?;

        let scheme = match endpoint.scheme() {
            "ws" | "http" => "ws",
            "wss" | "https" => "wss",
            other => {
                return Err(BridgeError::InvalidUrl(format!(
                    "unsupported scheme: {}",
                    other
                )))
            }
        };
        if endpoint.scheme() != scheme && endpoint.set_scheme(scheme).is_err() {
            return Err(BridgeError::InvalidUrl(raw.to_string()));
        }

        if endpoint.path().is_empty() || endpoint.path() == "/" {
            endpoint.set_path(&self.path);
        }

        let existing: Vec<String> = endpoint.query_pairs().map(|(k, _)| k.into_owned()).collect();
        {
            let mut query = endpoint.query_pairs_mut();
            if !existing.iter().any(|k| k == "EIO") {
                query.append_pair("EIO", &ENGINE_IO_VERSION.to_string());
            }
            if !existing.iter().any(|k| k == "transport") {
                query.append_pair("transport", "websocket");
            }
            for (key, value) in &options.query {
                query.append_pair(key, value);
            }
        }

        Ok(endpoint.to_string())
    }

    /// Transport settings for an already resolved endpoint.
    pub fn to_transport_config(&self, endpoint: &str, options: &ConnectOptions) -> TransportConfig {
        TransportConfig {
            server_url: endpoint.to_string(),
            connect_timeout_ms: self.connect_timeout_for(options),
            io_timeout_ms: self.io_timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
            headers: options.headers.clone(),
        }
    }

    /// Connect timeout after applying the per-call override.
    pub fn connect_timeout_for(&self, options: &ConnectOptions) -> u64 {
        options.connect_timeout_ms.unwrap_or(self.connect_timeout_ms)
    }
}

/// Per-connect options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectOptions {
    /// Auth object sent with the namespace CONNECT.
    pub auth: Option<Value>,
    /// Extra query pairs for the handshake url.
    pub query: Vec<(String, String)>,
    /// Extra headers for the websocket upgrade request.
    pub headers: Vec<(String, String)>,
    /// Overrides [`BridgeConfig::connect_timeout_ms`].
    pub connect_timeout_ms: Option<u64>,
}

impl ConnectOptions {
    /// Sets the auth object.
    pub fn with_auth(mut self, auth: Value) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Adds a query pair.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Adds an upgrade request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the connect timeout for this call.
    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = Some(ms);
        self
    }
}
