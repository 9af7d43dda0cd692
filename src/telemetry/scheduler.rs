//! # Poll Scheduler
//!
//! Runs the telemetry poll on a fixed interval until stopped.
//!
//! ## Lifecycle
//!
//! 1. First poll fires immediately, then one per interval
//! 2. Every tick spawns its own fetch; fetches may overlap
//! 3. Finished fetches report back over a channel and are applied to the
//!    [`StateStore`] with the ticket taken at issue time
//! 4. [`PollTask::stop`] ends the timer; fetches still in flight are left
//!    to finish and their results are dropped

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::poller::Poller;
use super::types::TelemetryReading;
use crate::error::PollError;
use crate::state::{PollOutcome, PollTicket, StateStore};

type Completed = (PollTicket, Result<Vec<TelemetryReading>, PollError>);

/// Handle to the running poll loop
///
/// Dropping the handle also stops the timer.
#[derive(Debug)]
pub struct PollTask {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl PollTask {
    /// Start polling on the current tokio runtime
    ///
    /// # Arguments
    ///
    /// * `poller` - Fetches one batch per tick
    /// * `store` - Receives every completed poll
    /// * `period` - Time between ticks (first tick is immediate)
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime or with a zero `period`.
    pub fn spawn(poller: Arc<Poller>, store: Arc<StateStore>, period: Duration) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run(poller, store, period, stop_rx));

        info!("Telemetry polling started every {:?}", period);
        Self {
            stop_tx: Some(stop_tx),
            handle,
        }
    }

    /// True until the loop has exited
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the timer and wait for the loop to exit
    pub async fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            debug!("Telemetry poll loop ended abnormally: {}", e);
        }
        info!("Telemetry polling stopped");
    }
}

async fn run(
    poller: Arc<Poller>,
    store: Arc<StateStore>,
    period: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completed>();

    loop {
        tokio::select! {
            biased;

            // Explicit stop or handle dropped
            _ = &mut stop_rx => break,

            Some((ticket, result)) = done_rx.recv() => {
                match store.record_poll_result(ticket, result) {
                    PollOutcome::Applied => debug!("Poll #{} applied", ticket.seq()),
                    PollOutcome::Cleared => debug!("Poll #{} failed, telemetry cleared", ticket.seq()),
                    PollOutcome::Stale | PollOutcome::Closed => {}
                }
            }

            _ = ticker.tick() => {
                let ticket = store.begin_poll();
                let poller = Arc::clone(&poller);
                let done_tx = done_tx.clone();

                debug!("Poll #{} issued", ticket.seq());
                tokio::spawn(async move {
                    let result = poller.poll().await;
                    if done_tx.send((ticket, result)).is_err() {
                        debug!("Poll #{} finished after polling stopped, discarded", ticket.seq());
                    }
                });
            }
        }
    }
}
