// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Synchronous Bridge
//!
//! Blocking Socket.IO client for one virtual user.
//!
//! Every call returns a value or a typed [`BridgeError`]; the only calls that
//! suspend are [`Bridge::connect`], [`Bridge::emit_with_ack`] and
//! [`Bridge::disconnect`], each bounded by a wall-clock deadline and
//! releasable through the bridge's [`InterruptHandle`].

use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::config::{BridgeConfig, ConnectOptions};
use super::driver::{Command, Driver, SessionShared};
use super::error::{BridgeError, BridgeResult};
use super::events::{CallbackHandler, EventHandler, EventRouter, DISCONNECT_EVENT};
use crate::network::{
    AckFailure, AckId, AckRegistry, DisconnectReason, InterruptHandle, LifecycleState,
    NetworkError, SocketPacket, Transport, WaitOutcome, WebSocketTransport, DEFAULT_NAMESPACE,
};

type TransportFactory<T> = Box<dyn Fn() -> T + Send>;

/// The live connection of a bridge.
struct Session {
    shared: Arc<SessionShared>,
    commands: Sender<Command>,
    driver: Option<JoinHandle<()>>,
}

impl Session {
    fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Detaches the driver thread, joining it only if it already finished.
    fn release(mut self) {
        if let Some(handle) = self.driver.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    }
}

/// Blocking Socket.IO client owned by one virtual user.
///
/// # Example
///
/// ```ignore
/// use siobridge_core::{Bridge, BridgeConfig, ConnectOptions};
/// use serde_json::json;
///
/// let mut bridge = Bridge::new(BridgeConfig::default());
/// bridge.on("test_response", |args| println!("got {:?}", args));
/// bridge.connect("http://localhost:4000", ConnectOptions::default())?;
/// bridge.emit("test", json!({ "hello": "world" }))?;
/// let reply = bridge.emit_with_ack("ackevent", json!({ "foo": "bar" }), None)?;
/// bridge.disconnect()?;
/// ```
pub struct Bridge<T: Transport + 'static = WebSocketTransport> {
    vu_id: u64,
    config: BridgeConfig,
    factory: TransportFactory<T>,
    router: Arc<EventRouter>,
    interrupt: InterruptHandle,
    next_ack_id: AckId,
    last_reason: Option<DisconnectReason>,
    session: Option<Session>,
}

impl Bridge<WebSocketTransport> {
    /// Creates a bridge that connects over websockets.
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_transport_factory(config, WebSocketTransport::new)
    }
}

impl<T: Transport + 'static> Bridge<T> {
    /// Creates a bridge that builds a fresh transport for every connect.
    pub fn with_transport_factory<F>(config: BridgeConfig, factory: F) -> Self
    where
        F: Fn() -> T + Send + 'static,
    {
        Bridge {
            vu_id: 0,
            config,
            factory: Box::new(factory),
            router: Arc::new(EventRouter::new()),
            interrupt: InterruptHandle::new(),
            next_ack_id: 0,
            last_reason: None,
            session: None,
        }
    }

    /// Tags logs and the driver thread name with a virtual user id.
    pub fn with_vu_id(mut self, vu_id: u64) -> Self {
        self.vu_id = vu_id;
        self
    }

    /// Virtual user id of this bridge.
    pub fn vu_id(&self) -> u64 {
        self.vu_id
    }

    /// Configuration this bridge was built with.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.session
            .as_ref()
            .map_or(LifecycleState::Disconnected, |session| session.shared.state())
    }

    /// True while connected.
    pub fn is_connected(&self) -> bool {
        self.state() == LifecycleState::Connected
    }

    /// Socket.IO session id of the current connection.
    pub fn session_id(&self) -> Option<String> {
        self.session
            .as_ref()
            .and_then(|session| session.shared.session_id())
    }

    /// Why the last connection ended, if one did.
    pub fn last_disconnect_reason(&self) -> Option<DisconnectReason> {
        self.session
            .as_ref()
            .and_then(|session| session.shared.reason())
            .or_else(|| self.last_reason.clone())
    }

    /// Handle that cancels the call this bridge is suspended in.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Event router shared by every connection of this bridge.
    pub fn router(&self) -> &Arc<EventRouter> {
        &self.router
    }

    /// Connects and blocks until the namespace is joined.
    ///
    /// An empty `url` uses [`BridgeConfig::default_url`].
    pub fn connect(&mut self, url: &str, options: ConnectOptions) -> BridgeResult<()> {
        self.reap();
        if self.session.is_some() {
            return Err(BridgeError::AlreadyConnected);
        }

        let endpoint = self.config.resolve_url(url, &options)?;
        let transport_config = self.config.to_transport_config(&endpoint, &options);
        let timeout_ms = self.config.connect_timeout_for(&options);
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        let shared = Arc::new(SessionShared::new(AckRegistry::starting_at(
            self.next_ack_id,
        )));
        let (commands, inbox) = mpsc::channel();
        let driver = Driver::new(
            self.vu_id,
            (self.factory)(),
            transport_config,
            options.auth,
            shared.clone(),
            self.router.clone(),
            inbox,
        );
        let handle = thread::Builder::new()
            .name(format!("siobridge-vu-{}", self.vu_id))
            .spawn(move || driver.run())
            .map_err(|e| NetworkError::ConnectionFailed(format!("driver thread: {}", e)))?;

        info!(vu = self.vu_id, url = %endpoint, "connecting");
        self.last_reason = None;
        self.session = Some(Session {
            shared: shared.clone(),
            commands,
            driver: Some(handle),
        });

        let outcome = {
            let _armed = self.interrupt.arm(shared.handshake.clone());
            shared.handshake.wait_until(deadline)
        };

        match outcome {
            WaitOutcome::Ready(Ok(sid)) => {
                debug!(vu = self.vu_id, sid = %sid, "handshake complete");
                Ok(())
            }
            WaitOutcome::Ready(Err(e)) => {
                self.abort_session();
                Err(e)
            }
            WaitOutcome::TimedOut => {
                warn!(vu = self.vu_id, timeout_ms, "connect timed out");
                self.abort_session();
                Err(BridgeError::ConnectTimeout(timeout_ms))
            }
            WaitOutcome::Abandoned => {
                debug!(vu = self.vu_id, "connect cancelled");
                self.abort_session();
                Err(BridgeError::Cancelled)
            }
        }
    }

    /// Sends an event without waiting for anything.
    pub fn emit(&self, event: &str, payload: Value) -> BridgeResult<()> {
        self.emit_args(event, vec![payload])
    }

    /// Sends an event with any number of arguments.
    pub fn emit_args(&self, event: &str, args: Vec<Value>) -> BridgeResult<()> {
        let session = self.connected_session()?;
        debug!(vu = self.vu_id, event, "emit");

        let packet = SocketPacket::event(DEFAULT_NAMESPACE, event, args, None);
        if session.send(Command::Emit(packet)) {
            Ok(())
        } else {
            Err(BridgeError::NotConnected)
        }
    }

    /// Sends an event and blocks until the server acknowledges it.
    ///
    /// A single ack argument is returned as-is, several as an array.
    /// `timeout` defaults to [`BridgeConfig::ack_timeout_ms`].
    pub fn emit_with_ack(
        &self,
        event: &str,
        payload: Value,
        timeout: Option<Duration>,
    ) -> BridgeResult<Value> {
        let args = self.emit_args_with_ack(event, vec![payload], timeout)?;
        Ok(unwrap_ack(args))
    }

    /// Like [`Bridge::emit_with_ack`] but returns the raw ack arguments.
    pub fn emit_args_with_ack(
        &self,
        event: &str,
        args: Vec<Value>,
        timeout: Option<Duration>,
    ) -> BridgeResult<Vec<Value>> {
        let session = self.connected_session()?;
        let timeout = timeout.unwrap_or_else(|| self.config.ack_timeout());
        let deadline = Instant::now() + timeout;

        let (id, slot) = session
            .shared
            .acks
            .lock()
            .register(deadline)
            .map_err(BridgeError::ConnectionLost)?;
        debug!(
            vu = self.vu_id,
            event,
            ack_id = id,
            timeout_ms = timeout.as_millis() as u64,
            "emit with ack"
        );

        let packet = SocketPacket::event(DEFAULT_NAMESPACE, event, args, Some(id));
        if !session.send(Command::Emit(packet)) {
            session.shared.acks.lock().abandon(id);
            return Err(BridgeError::NotConnected);
        }

        let outcome = {
            let _armed = self.interrupt.arm(slot.clone());
            slot.wait_until(deadline)
        };

        match outcome {
            WaitOutcome::Ready(Ok(reply)) => Ok(reply),
            WaitOutcome::Ready(Err(failure)) => {
                debug!(vu = self.vu_id, ack_id = id, %failure, "ack failed");
                Err(failure.into())
            }
            WaitOutcome::TimedOut => {
                session.shared.acks.lock().abandon(id);
                debug!(vu = self.vu_id, ack_id = id, "ack timed out");
                Err(AckFailure::Timeout.into())
            }
            WaitOutcome::Abandoned => {
                session.shared.acks.lock().abandon(id);
                Err(BridgeError::Cancelled)
            }
        }
    }

    /// Registers a handler for one event.
    pub fn on<F>(&self, event: &str, handler: F)
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.router.on(
            event,
            Arc::new(CallbackHandler::new(move |_event: &str, args: &[Value]| {
                handler(args);
                Ok(())
            })),
        );
    }

    /// Registers the catch-all handler, which sees every server event.
    pub fn on_any<F>(&self, handler: F)
    where
        F: Fn(&str, &[Value]) + Send + Sync + 'static,
    {
        self.router.on_any(Arc::new(CallbackHandler::new(
            move |event: &str, args: &[Value]| {
                handler(event, args);
                Ok(())
            },
        )));
    }

    /// Registers a fallible handler for one event.
    pub fn add_handler(&self, event: &str, handler: Arc<dyn EventHandler>) {
        self.router.on(event, handler);
    }

    /// Disconnects and blocks until teardown finished or the grace period
    /// passed. Does nothing when not connected.
    pub fn disconnect(&mut self) -> BridgeResult<()> {
        let session = match self.session.take() {
            Some(session) => session,
            None => return Ok(()),
        };

        if session.shared.state() == LifecycleState::Disconnected {
            self.release_session(session);
            return Ok(());
        }

        debug!(vu = self.vu_id, "disconnecting");
        session.send(Command::Disconnect);
        let deadline = Instant::now() + self.config.disconnect_grace();

        let outcome = {
            let _armed = self.interrupt.arm(session.shared.closed.clone());
            session.shared.closed.wait_until(deadline)
        };

        let result = match outcome {
            WaitOutcome::Ready(_) => Ok(()),
            WaitOutcome::TimedOut => {
                warn!(
                    vu = self.vu_id,
                    grace_ms = self.config.disconnect_grace_ms,
                    "teardown forced"
                );
                Ok(())
            }
            WaitOutcome::Abandoned => Err(BridgeError::Cancelled),
        };

        if session.shared.state() != LifecycleState::Disconnected {
            session.shared.finish(DisconnectReason::ClientDisconnect);
        }
        self.release_session(session);
        result
    }

    fn connected_session(&self) -> BridgeResult<&Session> {
        match &self.session {
            Some(session) if session.shared.state() == LifecycleState::Connected => Ok(session),
            _ => Err(BridgeError::NotConnected),
        }
    }

    /// Drops a session whose driver already ended.
    fn reap(&mut self) {
        let finished = self
            .session
            .as_ref()
            .is_some_and(|session| session.shared.state() == LifecycleState::Disconnected);
        if finished {
            if let Some(session) = self.session.take() {
                self.release_session(session);
            }
        }
    }

    /// Abandons a session whose handshake failed, timed out or was cancelled.
    fn abort_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.shared.handshake.abandon();
            session.send(Command::Disconnect);
            self.release_session(session);
        }
    }

    /// Detaches a session from the router and keeps what the next connect needs.
    ///
    /// The `disconnect` event is dispatched here when the driver has not
    /// dispatched it yet, so a stalled driver can never deliver it late.
    fn release_session(&mut self, session: Session) {
        self.next_ack_id = session.shared.acks.lock().next_id();
        self.last_reason = session.shared.reason();
        let announce = session.shared.detach();
        session.release();

        if announce {
            let reason = self
                .last_reason
                .clone()
                .unwrap_or(DisconnectReason::ClientDisconnect);
            self.router
                .dispatch_lifecycle(DISCONNECT_EVENT, &[Value::String(reason.to_string())]);
        }
    }
}

impl<T: Transport + 'static> Drop for Bridge<T> {
    fn drop(&mut self) {
        if self.session.is_some() {
            let _ = self.disconnect();
        }
    }
}

/// Collapses a one-element ack reply to its element.
pub fn unwrap_ack(mut args: Vec<Value>) -> Value {
    if args.len() == 1 {
        args.remove(0)
    } else {
        Value::Array(args)
    }
}
