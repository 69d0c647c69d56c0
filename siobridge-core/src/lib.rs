// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Siobridge Core Library
//!
//! Blocking Socket.IO client for load-testing virtual users: each virtual
//! user makes ordinary blocking calls while a per-connection driver thread
//! runs the Engine.IO / Socket.IO protocol underneath.

pub mod api;
pub mod network;

pub use api::{
    Bridge, BridgeConfig, BridgeError, BridgeResult, ConnectOptions, EventHandler, EventRouter,
    ModuleInstance, RootModule,
};
pub use network::{
    DisconnectReason, InterruptHandle, LifecycleState, MockServer, MockTransport, NetworkError,
    Transport, WebSocketTransport,
};
