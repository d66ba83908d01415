//! Two-step shutdown gate shared by every monitoring thread.
//!
//! The first interrupt only arms the gate so an accidental Ctrl+C does not
//! abort a morning's monitoring run. A second interrupt confirms the request,
//! at which point every cancellable sleep wakes up and returns [`Cancelled`].

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::warn;

/// Returned by any wait that was interrupted by a confirmed shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("monitoring run cancelled")]
pub struct Cancelled;

/// Observable state of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No shutdown requested.
    Running,
    /// One request received and deliberately ignored.
    Armed,
    /// Second request received; all waits unblock.
    Confirmed,
}

/// What a call to [`ShutdownGate::request`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTransition {
    Armed,
    Confirmed,
    AlreadyConfirmed,
}

#[derive(Debug)]
pub struct ShutdownGate {
    state: Mutex<GateState>,
    wake: Condvar,
}

impl Default for ShutdownGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Running),
            wake: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        // A poisoned gate still holds a valid enum; keep using it.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> GateState {
        *self.lock()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == GateState::Confirmed
    }

    /// Register a shutdown request (one per interrupt signal).
    pub fn request(&self) -> GateTransition {
        let mut state = self.lock();
        match *state {
            GateState::Running => {
                *state = GateState::Armed;
                warn!("Cancel request ignored once to prevent accidental interruption. Press Ctrl+C again to force shutdown.");
                GateTransition::Armed
            }
            GateState::Armed => {
                *state = GateState::Confirmed;
                warn!("Forced cancellation requested.");
                self.wake.notify_all();
                GateTransition::Confirmed
            }
            GateState::Confirmed => GateTransition::AlreadyConfirmed,
        }
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, returning early with [`Cancelled`] if the gate is
    /// confirmed before or during the wait.
    pub fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        let deadline = Instant::now() + duration;
        let mut state = self.lock();
        loop {
            if *state == GateState::Confirmed {
                return Err(Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            let (guard, _) = self
                .wake
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            state = guard;
        }
    }
}
