// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Result Slots
//!
//! Single-resolution hand-off between the driver thread and a blocked caller.
//! A slot is filled at most once; the waiter observes the value at most once.
//! A waiter that gives up abandons the slot, and later fills are discarded.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

enum SlotState<T> {
    Empty,
    Filled(T),
    Taken,
    Abandoned,
}

/// How a bounded wait on a [`Slot`] ended.
#[derive(Debug, PartialEq, Eq)]
pub enum WaitOutcome<T> {
    /// The slot was filled.
    Ready(T),
    /// The deadline passed with the slot still empty.
    TimedOut,
    /// The slot was abandoned (cancelled) while waiting.
    Abandoned,
}

/// A single-resolution result cell.
pub struct Slot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

impl<T> Slot<T> {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Slot {
            state: Mutex::new(SlotState::Empty),
            ready: Condvar::new(),
        }
    }

    /// Fills the slot and wakes the waiter.
    ///
    /// Returns false, dropping `value`, if the slot was already filled,
    /// consumed or abandoned.
    pub fn fill(&self, value: T) -> bool {
        let mut state = self.state.lock();
        if !matches!(*state, SlotState::Empty) {
            return false;
        }
        *state = SlotState::Filled(value);
        self.ready.notify_all();
        true
    }

    /// Marks the slot abandoned and wakes the waiter.
    ///
    /// Returns false if a value was already delivered.
    pub fn abandon(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            SlotState::Empty | SlotState::Filled(_) => {
                *state = SlotState::Abandoned;
                self.ready.notify_all();
                true
            }
            SlotState::Taken | SlotState::Abandoned => false,
        }
    }

    /// True once the slot holds, or has handed out, a value.
    pub fn is_resolved(&self) -> bool {
        matches!(*self.state.lock(), SlotState::Filled(_) | SlotState::Taken)
    }

    /// True if the slot was abandoned.
    pub fn is_abandoned(&self) -> bool {
        matches!(*self.state.lock(), SlotState::Abandoned)
    }

    /// Takes the value without blocking.
    pub fn try_take(&self) -> Option<T> {
        take_filled(&mut self.state.lock())
    }

    /// Blocks until the slot is filled, abandoned, or `deadline` passes.
    pub fn wait_until(&self, deadline: Instant) -> WaitOutcome<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(value) = take_filled(&mut state) {
                return WaitOutcome::Ready(value);
            }
            if !matches!(*state, SlotState::Empty) {
                return WaitOutcome::Abandoned;
            }
            if self.ready.wait_until(&mut state, deadline).timed_out() {
                return match take_filled(&mut state) {
                    Some(value) => WaitOutcome::Ready(value),
                    None if matches!(*state, SlotState::Empty) => WaitOutcome::TimedOut,
                    None => WaitOutcome::Abandoned,
                };
            }
        }
    }
}

fn take_filled<T>(state: &mut SlotState<T>) -> Option<T> {
    match std::mem::replace(state, SlotState::Taken) {
        SlotState::Filled(value) => Some(value),
        other => {
            *state = other;
            None
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Something a blocked call is waiting on that can be cancelled.
pub trait Cancel: Send + Sync {
    /// Releases the waiter.
    fn cancel(&self);
}

impl<T: Send> Cancel for Slot<T> {
    fn cancel(&self) {
        self.abandon();
    }
}

/// Cancels whatever call the owning bridge is currently blocked in.
///
/// Clone it and hand it to another thread (e.g. a script abort hook). An
/// interrupt that arrives while no call is suspended does nothing.
#[derive(Clone, Default)]
pub struct InterruptHandle {
    current: Arc<Mutex<Option<Arc<dyn Cancel>>>>,
}

impl InterruptHandle {
    /// Creates a handle with nothing armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Releases the suspended call, if any. Returns true if one was armed.
    pub fn interrupt(&self) -> bool {
        match self.current.lock().take() {
            Some(target) => {
                target.cancel();
                true
            }
            None => false,
        }
    }

    /// True while a call is suspended.
    pub fn is_armed(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Arms the handle for the duration of one suspended call.
    pub(crate) fn arm(&self, target: Arc<dyn Cancel>) -> ArmGuard<'_> {
        *self.current.lock() = Some(target);
        ArmGuard { handle: self }
    }
}

/// Disarms the [`InterruptHandle`] when the suspended call returns.
pub(crate) struct ArmGuard<'a> {
    handle: &'a InterruptHandle,
}

impl Drop for ArmGuard<'_> {
    fn drop(&mut self) {
        self.handle.current.lock().take();
    }
}
