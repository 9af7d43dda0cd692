//! # Client State Store
//!
//! The only shared mutable state of a session: speed setting, last command
//! error, latest telemetry batch and the time it was fetched.
//!
//! Every mutation takes the write lock once and updates all affected fields
//! together, so readers never see a half-applied result.
//!
//! ## Poll ordering
//!
//! Polls may overlap. Each poll takes a [`PollTicket`] when it is issued and
//! its result is applied only if no newer ticket has been applied yet
//! (highest issue sequence wins). A slow, older poll finishing last is
//! dropped as [`PollOutcome::Stale`] instead of overwriting fresher data.

use chrono::{DateTime, Utc};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::command::{Ack, SpeedSetting};
use crate::error::{DispatchError, PollError};
use crate::telemetry::TelemetryReading;

/// Snapshot of everything the presentation layer shows
#[derive(Debug, Clone, PartialEq)]
pub struct ClientState {
    pub speed: SpeedSetting,
    pub last_error: Option<String>,
    pub readings: Vec<TelemetryReading>,
    pub last_update: Option<DateTime<Utc>>,
}

impl ClientState {
    /// Fresh session state: no error, no readings, never updated
    pub fn new(speed: SpeedSetting) -> Self {
        Self {
            speed,
            last_error: None,
            readings: Vec::new(),
            last_update: None,
        }
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new(SpeedSetting::default())
    }
}

/// Issue-order token for one poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PollTicket(u64);

impl PollTicket {
    pub fn seq(self) -> u64 {
        self.0
    }
}

/// What [`StateStore::record_poll_result`] did with a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Readings replaced and `last_update` advanced
    Applied,
    /// Poll failed: readings cleared, `last_update` kept
    Cleared,
    /// A newer poll was already applied
    Stale,
    /// Session is over
    Closed,
}

#[derive(Debug)]
struct Inner {
    state: ClientState,
    issued: u64,
    applied: u64,
    closed: bool,
}

/// Process-local store shared by the dispatcher, the poll task and the UI
#[derive(Debug)]
pub struct StateStore {
    inner: RwLock<Inner>,
}

impl StateStore {
    pub fn new(initial_speed: SpeedSetting) -> Self {
        Self {
            inner: RwLock::new(Inner {
                state: ClientState::new(initial_speed),
                issued: 0,
                applied: 0,
                closed: false,
            }),
        }
    }

    // Writers only do plain assignments, so a poisoned lock still holds a whole state
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the speed setting; does not send anything
    pub fn set_speed(&self, speed: SpeedSetting) {
        self.write().state.speed = speed;
    }

    pub fn speed(&self) -> SpeedSetting {
        self.read().state.speed
    }

    /// Clear `last_error` on success, set it to the error message on failure
    ///
    /// The speed setting is never touched.
    pub fn record_dispatch_result(&self, result: &Result<Ack, DispatchError>) {
        let mut inner = self.write();
        if inner.closed {
            return;
        }
        inner.state.last_error = match result {
            Ok(_) => None,
            Err(e) => Some(e.to_string()),
        };
    }

    /// Reserve the next poll sequence number
    pub fn begin_poll(&self) -> PollTicket {
        let mut inner = self.write();
        inner.issued += 1;
        PollTicket(inner.issued)
    }

    /// Apply a completed poll
    ///
    /// On success the readings are replaced and `last_update` set to the
    /// completion time (never earlier than the previous value). On failure
    /// the readings are cleared and `last_update` is kept.
    pub fn record_poll_result(
        &self,
        ticket: PollTicket,
        result: Result<Vec<TelemetryReading>, PollError>,
    ) -> PollOutcome {
        let mut inner = self.write();

        if inner.closed {
            debug!("Poll #{} completed after shutdown, discarded", ticket.seq());
            return PollOutcome::Closed;
        }
        if ticket.seq() <= inner.applied {
            debug!(
                "Poll #{} superseded by #{}, discarded",
                ticket.seq(),
                inner.applied
            );
            return PollOutcome::Stale;
        }
        inner.applied = ticket.seq();

        match result {
            Ok(readings) => {
                let now = Utc::now();
                let stamp = match inner.state.last_update {
                    Some(previous) if previous > now => previous,
                    _ => now,
                };
                inner.state.readings = readings;
                inner.state.last_update = Some(stamp);
                PollOutcome::Applied
            }
            Err(_) => {
                inner.state.readings.clear();
                PollOutcome::Cleared
            }
        }
    }

    /// Consistent copy of the whole state
    pub fn snapshot(&self) -> ClientState {
        self.read().state.clone()
    }

    /// End of session: later results are discarded
    pub fn close(&self) {
        self.write().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.read().closed
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(SpeedSetting::default())
    }
}
