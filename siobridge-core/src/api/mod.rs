// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Siobridge API Layer
//!
//! Blocking Socket.IO client API for load-test virtual users.
//!
//! # Overview
//!
//! The API layer provides the calls a virtual user's script makes and
//! coordinates:
//! - Connection setup and teardown
//! - Fire-and-forget and acknowledged emits
//! - Inbound event handlers
//!
//! # Example
//!
//! ```ignore
//! use siobridge_core::api::{BridgeConfig, RootModule};
//! use serde_json::json;
//!
//! let root = RootModule::new(BridgeConfig::from_env());
//! let mut vu = root.new_instance();
//!
//! vu.connect("http://localhost:4000")?;
//! vu.emit("test", json!({ "msg": "hello" }))?;
//! let reply = vu.emit_with_ack("ackevent", json!({ "foo": "bar" }), None);
//! vu.disconnect()?;
//! ```
//!
//! # Module Structure
//!
//! - [`error`] - Error types for the API layer
//! - [`config`] - Configuration types
//! - [`events`] - Event handler table
//! - [`bridge`] - Per-VU blocking client
//! - [`module`] - Host module surface

#[cfg(feature = "testing")]
pub mod bridge;
#[cfg(not(feature = "testing"))]
mod bridge;

#[cfg(feature = "testing")]
pub mod config;
#[cfg(not(feature = "testing"))]
mod config;

mod driver;

#[cfg(feature = "testing")]
pub mod error;
#[cfg(not(feature = "testing"))]
mod error;

#[cfg(feature = "testing")]
pub mod events;
#[cfg(not(feature = "testing"))]
mod events;

#[cfg(feature = "testing")]
pub mod module;
#[cfg(not(feature = "testing"))]
mod module;

// Error types
pub use error::{BridgeError, BridgeResult};

// Configuration
pub use config::{
    BridgeConfig, ConnectOptions, ENV_ACK_TIMEOUT_MS, ENV_CONNECT_TIMEOUT_MS,
    ENV_DISCONNECT_GRACE_MS, ENV_URL,
};

// Events
pub use events::{
    CallbackHandler, DispatchReport, EventHandler, EventRouter, HandlerError, HandlerResult,
    CONNECT_EVENT, DISCONNECT_EVENT,
};

// Bridge
pub use bridge::{unwrap_ack, Bridge};

// Host module
pub use module::{ModuleInstance, RootModule, EXPORTS, MODULE_NAME};
