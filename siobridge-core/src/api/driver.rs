// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Connection Driver
//!
//! One background thread per connection. It owns the transport and the
//! protocol state machine, and it is the only code that resolves ack slots
//! or invokes the event router. The script thread talks to it through a
//! FIFO command queue and observes it through [`SessionShared`].

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use tracing::{debug, error, info, trace, warn};

use super::error::{BridgeError, BridgeResult};
use super::events::{EventRouter, CONNECT_EVENT, DISCONNECT_EVENT};
use crate::network::{
    decode_packet, encode_packet, Action, AckRegistry, Connection, DisconnectReason, Frame,
    LifecycleState, NetworkError, Slot, SocketPacket, Transport, TransportConfig,
};

/// Frames handled per loop turn before commands get another look.
const MAX_FRAMES_PER_TURN: usize = 64;

/// Request from the bridge to its driver.
#[derive(Debug)]
pub(crate) enum Command {
    /// Send a Socket.IO packet (queued by the state machine while handshaking).
    Emit(SocketPacket),
    /// Start a local disconnect.
    Disconnect,
}

#[derive(Debug, Clone)]
struct Status {
    state: LifecycleState,
    sid: Option<String>,
    reason: Option<DisconnectReason>,
    /// The bridge let go of this session; the driver no longer reaches the router.
    detached: bool,
    /// The `disconnect` lifecycle event was claimed by the driver or the bridge.
    announced: bool,
}

/// State shared between a bridge and its driver thread.
pub(crate) struct SessionShared {
    status: RwLock<Status>,
    /// Pending acks of this connection.
    pub(crate) acks: Mutex<AckRegistry>,
    /// Filled with the session id, or the failure, when the handshake ends.
    pub(crate) handshake: Arc<Slot<BridgeResult<String>>>,
    /// Filled with the close reason once teardown finished.
    pub(crate) closed: Arc<Slot<DisconnectReason>>,
}

impl SessionShared {
    pub(crate) fn new(acks: AckRegistry) -> Self {
        SessionShared {
            status: RwLock::new(Status {
                state: LifecycleState::Handshaking,
                sid: None,
                reason: None,
                detached: false,
                announced: false,
            }),
            acks: Mutex::new(acks),
            handshake: Arc::new(Slot::new()),
            closed: Arc::new(Slot::new()),
        }
    }

    pub(crate) fn state(&self) -> LifecycleState {
        self.status.read().state
    }

    pub(crate) fn session_id(&self) -> Option<String> {
        self.status.read().sid.clone()
    }

    pub(crate) fn reason(&self) -> Option<DisconnectReason> {
        self.status.read().reason.clone()
    }

    pub(crate) fn is_detached(&self) -> bool {
        self.status.read().detached
    }

    fn set_state(&self, state: LifecycleState) {
        let mut status = self.status.write();
        if status.state != LifecycleState::Disconnected {
            status.state = state;
        }
    }

    fn set_connected(&self, sid: &str) {
        let mut status = self.status.write();
        if status.state == LifecycleState::Disconnected {
            return;
        }
        status.state = LifecycleState::Connected;
        status.sid = Some(sid.to_string());
    }

    /// Claims the `disconnect` event for a session that had connected.
    ///
    /// True for exactly one caller per session.
    fn claim_disconnect_event(status: &mut Status) -> bool {
        if status.sid.is_none() || status.announced {
            return false;
        }
        status.announced = true;
        true
    }

    /// Called by the bridge when it releases the session. Returns true if
    /// the bridge must dispatch `disconnect` itself.
    pub(crate) fn detach(&self) -> bool {
        let mut status = self.status.write();
        status.detached = true;
        Self::claim_disconnect_event(&mut status)
    }

    /// Called by the driver after teardown. False once the bridge detached.
    fn announce_disconnect(&self) -> bool {
        let mut status = self.status.write();
        !status.detached && Self::claim_disconnect_event(&mut status)
    }

    /// Marks the session over and fails whatever still waits on it.
    pub(crate) fn finish(&self, reason: DisconnectReason) {
        {
            let mut status = self.status.write();
            status.state = LifecycleState::Disconnected;
            status.reason.get_or_insert_with(|| reason.clone());
        }
        self.acks.lock().fail_all(reason.clone());
        self.handshake
            .fill(Err(BridgeError::ConnectionLost(reason.clone())));
        self.closed.fill(reason);
    }
}

/// Runs one connection until it closes.
pub(crate) struct Driver<T: Transport> {
    vu_id: u64,
    transport: T,
    config: TransportConfig,
    connection: Connection,
    shared: Arc<SessionShared>,
    router: Arc<EventRouter>,
    commands: Receiver<Command>,
    reason: Option<DisconnectReason>,
}

impl<T: Transport> Driver<T> {
    pub(crate) fn new(
        vu_id: u64,
        transport: T,
        config: TransportConfig,
        auth: Option<Value>,
        shared: Arc<SessionShared>,
        router: Arc<EventRouter>,
        commands: Receiver<Command>,
    ) -> Self {
        Driver {
            vu_id,
            transport,
            config,
            connection: Connection::new(auth),
            shared,
            router,
            commands,
            reason: None,
        }
    }

    /// Thread body.
    pub(crate) fn run(mut self) {
        debug!(vu = self.vu_id, url = %self.config.server_url, "opening transport");

        if let Err(e) = self.transport.connect(&self.config) {
            warn!(vu = self.vu_id, error = %e, "transport connect failed");
            self.shared.finish(DisconnectReason::Transport(e));
            return;
        }
        self.connection.on_transport_open(Instant::now());

        while self.connection.state() != LifecycleState::Disconnected {
            if !self.drain_commands() {
                break;
            }
            if self.poll_transport() {
                let actions = self.connection.poll_heartbeat(Instant::now());
                self.execute(actions);
            }
            self.shared.acks.lock().sweep(Instant::now());
        }

        self.teardown();
    }

    /// Executes queued commands. Returns false once a local disconnect ran.
    fn drain_commands(&mut self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(Command::Emit(packet)) => {
                    let actions = self.connection.emit(packet);
                    self.execute(actions);
                }
                Ok(Command::Disconnect) => {
                    self.close_locally();
                    return false;
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => {
                    debug!(vu = self.vu_id, "bridge dropped, closing");
                    self.close_locally();
                    return false;
                }
            }
        }
    }

    fn close_locally(&mut self) {
        if self.connection.state() == LifecycleState::Connected {
            self.shared.set_state(LifecycleState::Disconnecting);
        }
        let actions = self.connection.close();
        self.execute(actions);
        let actions = self.connection.fail(DisconnectReason::ClientDisconnect);
        self.execute(actions);
    }

    /// Handles every frame that is already readable, up to
    /// [`MAX_FRAMES_PER_TURN`]. Returns true once the transport went idle,
    /// meaning no buffered PING can still be pending.
    fn poll_transport(&mut self) -> bool {
        for _ in 0..MAX_FRAMES_PER_TURN {
            if self.connection.state() == LifecycleState::Disconnected {
                return true;
            }
            match self.transport.receive() {
                Ok(Some(Frame::Text(text))) => match decode_packet(&text) {
                    Ok(packet) => {
                        trace!(vu = self.vu_id, frame = %text, "recv");
                        let actions = self.connection.handle_packet(packet, Instant::now());
                        self.execute(actions);
                    }
                    Err(e) => warn!(vu = self.vu_id, error = %e, "dropping undecodable frame"),
                },
                Ok(Some(Frame::Binary(bytes))) => {
                    warn!(vu = self.vu_id, len = bytes.len(), "dropping binary frame");
                }
                Ok(None) => return true,
                Err(e) => {
                    self.transport_failed(e);
                    return true;
                }
            }
        }
        false
    }

    fn transport_failed(&mut self, e: NetworkError) {
        if self.connection.state() != LifecycleState::Disconnected {
            error!(vu = self.vu_id, error = %e, "transport failed");
        }
        let actions = self.connection.fail(DisconnectReason::Transport(e));
        self.execute(actions);
    }

    fn execute(&mut self, actions: Vec<Action>) {
        let mut queue: VecDeque<Action> = actions.into();
        while let Some(action) = queue.pop_front() {
            match action {
                Action::Send(packet) => {
                    let frame = encode_packet(&packet);
                    trace!(vu = self.vu_id, frame = %frame, "send");
                    if let Err(e) = self.transport.send(Frame::Text(frame)) {
                        if self.connection.state() != LifecycleState::Disconnected {
                            error!(vu = self.vu_id, error = %e, "send failed");
                        }
                        queue.extend(self.connection.send_failed(&packet, e));
                    }
                }
                Action::Connected { sid } => {
                    info!(vu = self.vu_id, sid = %sid, "connected");
                    self.shared.set_connected(&sid);
                    self.shared.handshake.fill(Ok(sid.clone()));
                    if !self.shared.is_detached() {
                        self.router
                            .dispatch_lifecycle(CONNECT_EVENT, &[json!({ "sid": sid })]);
                    }
                }
                Action::Rejected(message) => {
                    warn!(vu = self.vu_id, %message, "handshake rejected");
                    self.shared
                        .handshake
                        .fill(Err(BridgeError::HandshakeRejected(message)));
                    self.reason = Some(DisconnectReason::ServerDisconnect);
                }
                Action::Dispatch { event, args, ack_id } => {
                    if self.shared.is_detached() {
                        debug!(vu = self.vu_id, event = %event, "event for released session dropped");
                    } else {
                        debug!(vu = self.vu_id, event = %event, "event received");
                        self.router.dispatch(&event, &args);
                    }
                    if let Some(id) = ack_id {
                        let reply = SocketPacket::ack(self.connection.namespace(), id, Vec::new());
                        queue.extend(self.connection.emit(reply));
                    }
                }
                Action::ResolveAck { id, args } => {
                    self.shared.acks.lock().resolve(id, args);
                }
                Action::Closed(reason) => {
                    self.reason.get_or_insert(reason);
                }
            }
        }
    }

    fn teardown(mut self) {
        let reason = self
            .reason
            .take()
            .unwrap_or(DisconnectReason::ClientDisconnect);

        if let Err(e) = self.transport.disconnect() {
            debug!(vu = self.vu_id, error = %e, "transport close failed");
        }

        info!(vu = self.vu_id, %reason, "disconnected");
        self.shared.finish(reason.clone());

        if self.shared.announce_disconnect() {
            self.router
                .dispatch_lifecycle(DISCONNECT_EVENT, &[Value::String(reason.to_string())]);
        }
    }
}
