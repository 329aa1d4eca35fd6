//! Campaign lifecycle orchestration.
//!
//! This module owns the run state machine (start/stop/completion) and the
//! telemetry poll task. Presentation layers drive it with commands and
//! subscribe to client events; no other component may start or cancel the
//! poll task.

mod controller;
mod poller;

pub(crate) use controller::{run_controller, CampaignCommand};
