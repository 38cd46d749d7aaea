//! Idle Refresh Scheduler
//!
//! Fires a generator on a fixed cadence while the wall is idle. The engine
//! owns the only scheduler and decides when it runs; the scheduler itself
//! only guarantees that a stopped timer never fires again.
//!
//! Every `start()` bumps an epoch that is passed to the generator. Ticks
//! that were already queued when the scheduler stopped carry an old epoch,
//! and [`IdleRefreshScheduler::is_current`] lets the consumer drop them.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Cancellable periodic timer
#[derive(Debug, Default)]
pub struct IdleRefreshScheduler {
    task: Option<JoinHandle<()>>,
    epoch: u64,
}

impl IdleRefreshScheduler {
    /// Stopped scheduler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `generator` every `interval`, replacing any running timer
    ///
    /// The first call happens one interval after `start`. Returns the epoch
    /// handed to every call of this run.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime, or if `interval` is zero.
    pub fn start<G>(&mut self, mut generator: G, interval: Duration) -> u64
    where
        G: FnMut(u64) + Send + 'static,
    {
        self.stop();
        self.epoch += 1;
        let epoch = self.epoch;

        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.task = Some(tokio::spawn(async move {
            loop {
                ticker.tick().await;
                trace!(epoch, "Idle refresh tick");
                generator(epoch);
            }
        }));

        debug!(epoch, interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX), "Idle refresh started");
        epoch
    }

    /// Cancel the timer; no further calls happen after this returns
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(epoch = self.epoch, "Idle refresh stopped");
        }
    }

    /// Whether a timer is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Epoch of the most recent `start`
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether a tick tagged `epoch` belongs to the running timer
    #[must_use]
    pub fn is_current(&self, epoch: u64) -> bool {
        self.is_running() && epoch == self.epoch
    }
}

impl Drop for IdleRefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
