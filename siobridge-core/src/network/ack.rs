// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Acknowledgement Registry
//!
//! Correlates outbound ack-requesting EVENTs with the server's ACK replies.
//! Every pending entry leaves the registry exactly once: resolved, timed out,
//! abandoned by its waiter, or failed on connection teardown.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use super::error::DisconnectReason;
use super::message::AckId;
use super::slot::Slot;

/// Why a pending ack resolved without a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckFailure {
    /// The deadline passed.
    Timeout,
    /// The connection went away first.
    ConnectionLost(DisconnectReason),
}

impl fmt::Display for AckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckFailure::Timeout => write!(f, "ack timeout"),
            AckFailure::ConnectionLost(reason) => write!(f, "connection lost: {}", reason),
        }
    }
}

/// What a waiter finds in its slot: the ACK arguments or a failure.
pub type AckOutcome = Result<Vec<Value>, AckFailure>;

struct PendingAck {
    created_at: Instant,
    deadline: Instant,
    slot: Arc<Slot<AckOutcome>>,
}

/// Pending acknowledgements of one connection.
pub struct AckRegistry {
    next_id: AckId,
    pending: BTreeMap<AckId, PendingAck>,
    closed: Option<DisconnectReason>,
    stale: u64,
}

impl AckRegistry {
    /// Creates an empty registry issuing ids from 0.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates an empty registry issuing ids from `next_id`.
    ///
    /// Used to continue the id sequence of a previous connection.
    pub fn starting_at(next_id: AckId) -> Self {
        AckRegistry {
            next_id,
            pending: BTreeMap::new(),
            closed: None,
            stale: 0,
        }
    }

    /// Allocates an id and a slot that resolves by `deadline`.
    ///
    /// Fails with the teardown reason once [`AckRegistry::fail_all`] ran.
    pub fn register(
        &mut self,
        deadline: Instant,
    ) -> Result<(AckId, Arc<Slot<AckOutcome>>), DisconnectReason> {
        if let Some(reason) = &self.closed {
            return Err(reason.clone());
        }

        let id = self.next_id;
        self.next_id += 1;

        let slot = Arc::new(Slot::new());
        self.pending.insert(
            id,
            PendingAck {
                created_at: Instant::now(),
                deadline,
                slot: slot.clone(),
            },
        );
        Ok((id, slot))
    }

    /// Delivers an ACK reply. Returns false for unknown or finished ids.
    pub fn resolve(&mut self, id: AckId, args: Vec<Value>) -> bool {
        match self.pending.remove(&id) {
            Some(entry) => {
                debug!(
                    ack_id = id,
                    elapsed_ms = entry.created_at.elapsed().as_millis() as u64,
                    "ack resolved"
                );
                if entry.slot.fill(Ok(args)) {
                    true
                } else {
                    self.stale += 1;
                    warn!(ack_id = id, "ack arrived for abandoned waiter");
                    false
                }
            }
            None => {
                self.stale += 1;
                warn!(ack_id = id, "stale or unknown ack ignored");
                false
            }
        }
    }

    /// Times out every entry whose deadline is at or before `now`.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let expired: Vec<AckId> = self
            .pending
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            if let Some(entry) = self.pending.remove(id) {
                debug!(ack_id = *id, "ack timed out");
                entry.slot.fill(Err(AckFailure::Timeout));
            }
        }
        expired.len()
    }

    /// Drops an entry whose waiter stopped waiting.
    pub fn abandon(&mut self, id: AckId) -> bool {
        match self.pending.remove(&id) {
            Some(entry) => {
                entry.slot.abandon();
                true
            }
            None => false,
        }
    }

    /// Fails every pending entry and refuses new registrations.
    pub fn fail_all(&mut self, reason: DisconnectReason) -> usize {
        let count = self.pending.len();
        for (_, entry) in std::mem::take(&mut self.pending) {
            entry
                .slot
                .fill(Err(AckFailure::ConnectionLost(reason.clone())));
        }
        if count > 0 {
            debug!(count, %reason, "pending acks failed");
        }
        self.closed = Some(reason);
        count
    }

    /// Id the next registration will get.
    pub fn next_id(&self) -> AckId {
        self.next_id
    }

    /// Number of unresolved entries.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of ACKs that matched no waiting entry.
    pub fn stale_acks(&self) -> u64 {
        self.stale
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|entry| entry.deadline).min()
    }

    /// True after [`AckRegistry::fail_all`].
    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }
}

impl Default for AckRegistry {
    fn default() -> Self {
        Self::new()
    }
}
