// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Event System
//!
//! Handler table for inbound Socket.IO events.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{trace, warn};

/// Lifecycle event fired once the namespace is joined.
pub const CONNECT_EVENT: &str = "connect";

/// Lifecycle event fired when the connection ends.
pub const DISCONNECT_EVENT: &str = "disconnect";

/// Error a handler may report.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result of one handler invocation.
pub type HandlerResult = Result<(), HandlerError>;

/// Event handler trait.
///
/// Implement this trait to receive inbound events. Handlers run on the
/// connection's driver thread and should return quickly.
pub trait EventHandler: Send + Sync {
    /// Called with the event name and its arguments.
    fn on_event(&self, event: &str, args: &[Value]) -> HandlerResult;
}

/// Simple callback-based event handler.
///
/// Wraps a closure for easy event handling.
pub struct CallbackHandler<F>
where
    F: Fn(&str, &[Value]) -> HandlerResult + Send + Sync,
{
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: Fn(&str, &[Value]) -> HandlerResult + Send + Sync,
{
    /// Creates a new callback handler.
    pub fn new(callback: F) -> Self {
        CallbackHandler { callback }
    }
}

impl<F> EventHandler for CallbackHandler<F>
where
    F: Fn(&str, &[Value]) -> HandlerResult + Send + Sync,
{
    fn on_event(&self, event: &str, args: &[Value]) -> HandlerResult {
        (self.callback)(event, args)
    }
}

/// Outcome of dispatching one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that returned `Ok`.
    pub delivered: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

#[derive(Default)]
struct HandlerTable {
    by_event: HashMap<String, Vec<Arc<dyn EventHandler>>>,
    catch_all: Option<Arc<dyn EventHandler>>,
}

/// Routes inbound events to registered handlers.
///
/// Registration may happen from the script thread while the driver thread
/// dispatches; handlers are snapshotted per dispatch and invoked outside the
/// table lock.
#[derive(Default)]
pub struct EventRouter {
    table: RwLock<HandlerTable>,
}

impl EventRouter {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler for `event`.
    pub fn on(&self, event: &str, handler: Arc<dyn EventHandler>) {
        self.table
            .write()
            .by_event
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }

    /// Installs the catch-all handler, replacing any previous one.
    pub fn on_any(&self, handler: Arc<dyn EventHandler>) {
        self.table.write().catch_all = Some(handler);
    }

    /// Removes every handler for `event`.
    pub fn off(&self, event: &str) -> usize {
        self.table
            .write()
            .by_event
            .remove(event)
            .map_or(0, |handlers| handlers.len())
    }

    /// Removes all handlers.
    pub fn clear(&self) {
        let mut table = self.table.write();
        table.by_event.clear();
        table.catch_all = None;
    }

    /// Returns the number of handlers registered for `event`.
    pub fn handler_count(&self, event: &str) -> usize {
        self.table
            .read()
            .by_event
            .get(event)
            .map_or(0, |handlers| handlers.len())
    }

    /// Returns true if a catch-all handler is installed.
    pub fn has_catch_all(&self) -> bool {
        self.table.read().catch_all.is_some()
    }

    /// Dispatches a server event: per-event handlers in registration order,
    /// then the catch-all.
    pub fn dispatch(&self, event: &str, args: &[Value]) -> DispatchReport {
        let (handlers, catch_all) = {
            let table = self.table.read();
            (
                table.by_event.get(event).cloned().unwrap_or_default(),
                table.catch_all.clone(),
            )
        };

        trace!(event, handlers = handlers.len(), "dispatch");

        let mut report = DispatchReport::default();
        for handler in handlers.iter().chain(catch_all.iter()) {
            invoke(handler.as_ref(), event, args, &mut report);
        }
        report
    }

    /// Dispatches a lifecycle event (`connect`, `disconnect`).
    ///
    /// Only per-event handlers see it; the catch-all does not.
    pub fn dispatch_lifecycle(&self, event: &str, args: &[Value]) -> DispatchReport {
        let handlers = self
            .table
            .read()
            .by_event
            .get(event)
            .cloned()
            .unwrap_or_default();

        let mut report = DispatchReport::default();
        for handler in &handlers {
            invoke(handler.as_ref(), event, args, &mut report);
        }
        report
    }
}

fn invoke(handler: &dyn EventHandler, event: &str, args: &[Value], report: &mut DispatchReport) {
    match catch_unwind(AssertUnwindSafe(|| handler.on_event(event, args))) {
        Ok(Ok(())) => report.delivered += 1,
        Ok(Err(e)) => {
            report.failed += 1;
            warn!(event, error = %e, "event handler failed");
        }
        Err(_) => {
            report.failed += 1;
            warn!(event, "event handler panicked");
        }
    }
}
