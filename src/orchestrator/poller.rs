//! Owned, cancellable telemetry poll task.
//!
//! Exactly one of these exists while a campaign is Running. The
//! controller holds the only handle; outcomes flow back over a channel
//! tagged with the generation they were spawned under so late arrivals
//! from a cancelled task can be recognized and dropped.

use crate::api::{ApiError, ControlApi};
use crate::model::TelemetrySnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::MissedTickBehavior;

/// Result of a single stats fetch, tagged with its poll generation.
pub(crate) struct PollOutcome {
    pub generation: u64,
    pub result: Result<TelemetrySnapshot, ApiError>,
}

/// Handle to the active poll task.
pub(crate) struct PollTask {
    handle: tokio::task::JoinHandle<()>,
}

impl PollTask {
    /// Cancel the task. Aborting is required: dropping a JoinHandle does
    /// not stop a tokio task, it would keep fetching stats forever.
    pub(crate) fn cancel(self) {
        self.handle.abort();
    }
}

/// Spawn the recurring stats fetch at a fixed cadence.
pub(crate) fn spawn_poller<A: ControlApi>(
    api: Arc<A>,
    generation: u64,
    interval: Duration,
    outcome_tx: UnboundedSender<PollOutcome>,
) -> PollTask {
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let result = api.fetch_stats().await;
            if outcome_tx.send(PollOutcome { generation, result }).is_err() {
                // Controller is gone; nothing left to report to.
                break;
            }
        }
    });
    PollTask { handle }
}
