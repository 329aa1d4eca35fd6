//! Campaign lifecycle controller.
//!
//! Owns the single run state (phase, last telemetry, poll task) and
//! reconciles it with the remote controller across start/stop requests
//! and the recurring stats poll. Presentation layers drive it with
//! [`CampaignCommand`]s and observe it through [`ClientEvent`]s; no other
//! component may touch the poll task.

use super::poller::{self, PollOutcome, PollTask};
use crate::api::ControlApi;
use crate::model::{CampaignConfig, ClientEvent, Phase, TelemetrySnapshot};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// Commands emitted by presentation layers to control the campaign.
#[derive(Debug, Clone)]
pub(crate) enum CampaignCommand {
    Start(CampaignConfig),
    Stop,
    Quit,
}

/// Outcome of a network exchange, as seen by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CampaignEvent {
    /// Remote accepted a start request.
    StartAccepted,
    /// Start was rejected or never delivered.
    StartFailed,
    /// The stop exchange completed (acknowledged or rejected).
    StopAcked,
    /// The stop request could not be delivered.
    StopFailed,
    /// A poll returned a snapshot with the campaign still active.
    PollRunning,
    /// A poll reported the remote campaign ended on its own.
    PollEnded,
    /// A poll failed in transit or decoding; transient.
    PollFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Effect {
    BeginPolling,
    CancelPolling,
}

/// One step of the state machine: the next phase plus the poll-task
/// side effect it requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Step {
    pub next: Phase,
    pub effect: Option<Effect>,
}

/// Pure transition relation. Precondition checks (no start while
/// Running, no stop unless Running) happen before any network call and
/// therefore before an event ever reaches this function.
pub(crate) fn transition(phase: Phase, event: CampaignEvent) -> Step {
    use CampaignEvent::*;
    match (phase, event) {
        (Phase::Idle | Phase::Completed, StartAccepted) => Step {
            next: Phase::Running,
            effect: Some(Effect::BeginPolling),
        },
        // Optimistic local stop: the exchange completing is enough.
        (Phase::Running, StopAcked) => Step {
            next: Phase::Idle,
            effect: Some(Effect::CancelPolling),
        },
        // The only autonomous exit from Running.
        (Phase::Running, PollEnded) => Step {
            next: Phase::Completed,
            effect: Some(Effect::CancelPolling),
        },
        // Rejected starts, undeliverable stops and transient poll
        // failures leave the phase alone.
        (phase, _) => Step {
            next: phase,
            effect: None,
        },
    }
}

/// Campaign control client. Single owner of the run state and the poll
/// task for the lifetime of the process.
pub(crate) struct CampaignController<A: ControlApi> {
    api: Arc<A>,
    poll_interval: Duration,
    phase: Phase,
    last_telemetry: Option<TelemetrySnapshot>,
    poller: Option<PollTask>,
    generation: u64,
    poll_tx: UnboundedSender<PollOutcome>,
    event_tx: UnboundedSender<ClientEvent>,
}

impl<A: ControlApi> CampaignController<A> {
    pub(crate) fn new(
        api: Arc<A>,
        poll_interval: Duration,
        event_tx: UnboundedSender<ClientEvent>,
        poll_tx: UnboundedSender<PollOutcome>,
    ) -> Self {
        Self {
            api,
            poll_interval,
            phase: Phase::Idle,
            last_telemetry: None,
            poller: None,
            generation: 0,
            poll_tx,
            event_tx,
        }
    }

    /// Start a campaign with the given configuration.
    ///
    /// Duplicate starts are rejected locally before any network call.
    pub(crate) async fn handle_start(&mut self, config: CampaignConfig) {
        if !self.phase.can_start() {
            let _ = self
                .event_tx
                .send(ClientEvent::Info("campaign already running".into()));
            return;
        }
        match self.api.start_campaign(&config).await {
            Ok(()) => {
                info!(
                    users = config.concurrent_users,
                    duration_secs = config.duration,
                    intensity = ?config.intensity,
                    "campaign started"
                );
                // Fresh campaign, fresh display.
                self.last_telemetry = None;
                self.apply(CampaignEvent::StartAccepted);
            }
            Err(err) => {
                warn!("start request failed: {err}");
                let _ = self
                    .event_tx
                    .send(ClientEvent::ControlFailed(format!("failed to start campaign: {err}")));
                self.apply(CampaignEvent::StartFailed);
            }
        }
    }

    /// Stop the running campaign.
    ///
    /// If the HTTP exchange completes at all (acknowledged or rejected)
    /// the client stops locally without waiting for a poll to confirm.
    /// Only an undeliverable request leaves the client Running, with the
    /// poll loop as the recovery path.
    pub(crate) async fn handle_stop(&mut self) {
        if self.phase != Phase::Running {
            let _ = self
                .event_tx
                .send(ClientEvent::Info("no campaign is running".into()));
            return;
        }
        match self.api.stop_campaign().await {
            Ok(()) => {
                info!("campaign stop acknowledged");
                self.apply(CampaignEvent::StopAcked);
            }
            Err(err) if err.is_rejection() => {
                warn!("stop rejected by controller: {err}");
                let _ = self
                    .event_tx
                    .send(ClientEvent::Info(format!("stop rejected: {err}")));
                self.apply(CampaignEvent::StopAcked);
            }
            Err(err) => {
                warn!("stop request failed: {err}");
                let _ = self
                    .event_tx
                    .send(ClientEvent::ControlFailed(format!("failed to stop campaign: {err}")));
                self.apply(CampaignEvent::StopFailed);
            }
        }
    }

    /// Accept (or discard) the result of one poll.
    pub(crate) fn handle_poll_outcome(&mut self, outcome: PollOutcome) {
        // A poll that resolves after a stop or restart is stale; replaying
        // it would resurrect a cancelled campaign's display.
        if self.phase != Phase::Running || outcome.generation != self.generation {
            return;
        }
        match outcome.result {
            Ok(snapshot) => {
                let ended = !snapshot.running;
                let _ = self.event_tx.send(ClientEvent::Telemetry(snapshot.clone()));
                self.last_telemetry = Some(snapshot);
                if ended {
                    info!("remote campaign completed");
                    self.apply(CampaignEvent::PollEnded);
                } else {
                    self.apply(CampaignEvent::PollRunning);
                }
            }
            Err(err) => {
                // Transient; the next scheduled tick is the retry.
                debug!("stats poll failed: {err}");
                self.apply(CampaignEvent::PollFailed);
            }
        }
    }

    pub(crate) fn shutdown(&mut self) {
        self.cancel_poller();
    }

    fn apply(&mut self, event: CampaignEvent) {
        let step = transition(self.phase, event);
        match step.effect {
            Some(Effect::BeginPolling) => self.spawn_poller(),
            Some(Effect::CancelPolling) => self.cancel_poller(),
            None => {}
        }
        self.set_phase(step.next);
    }

    fn set_phase(&mut self, next: Phase) {
        if next != self.phase {
            self.phase = next;
            let _ = self.event_tx.send(ClientEvent::PhaseChanged(next));
        }
    }

    fn spawn_poller(&mut self) {
        // At most one poll task system-wide: cancel before spawning.
        self.cancel_poller();
        self.generation += 1;
        self.poller = Some(poller::spawn_poller(
            self.api.clone(),
            self.generation,
            self.poll_interval,
            self.poll_tx.clone(),
        ));
    }

    /// Idempotent: cancelling with no task active is a no-op.
    fn cancel_poller(&mut self) {
        if let Some(task) = self.poller.take() {
            task.cancel();
        }
    }
}

/// Drive the controller from a command channel, emitting events back to
/// presentation layers until a Quit arrives or all senders are dropped.
pub(crate) async fn run_controller<A: ControlApi>(
    api: A,
    poll_interval: Duration,
    event_tx: UnboundedSender<ClientEvent>,
    mut cmd_rx: UnboundedReceiver<CampaignCommand>,
) -> Result<()> {
    let (poll_tx, mut poll_rx) = mpsc::unbounded_channel::<PollOutcome>();
    let mut controller =
        CampaignController::new(Arc::new(api), poll_interval, event_tx, poll_tx);
    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(CampaignCommand::Start(config)) => controller.handle_start(config).await,
                Some(CampaignCommand::Stop) => controller.handle_stop().await,
                Some(CampaignCommand::Quit) | None => break,
            },
            // The controller holds the matching sender, so this channel
            // never closes from the poller side.
            Some(outcome) = poll_rx.recv() => controller.handle_poll_outcome(outcome),
        }
    }
    controller.shutdown();
    Ok(())
}
