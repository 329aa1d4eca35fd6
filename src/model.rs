use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Load profile selected by the operator. The set mirrors the wait-time
/// table the remote controller uses between journeys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    High,
    Extreme,
}

/// Per-category journey weights. Independent values; the remote service
/// normalizes, so no sum constraint is applied here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyMix {
    pub browse: u32,
    pub shopping: u32,
    pub order: u32,
    pub admin: u32,
}

/// Immutable configuration snapshot sent with a start request.
///
/// Built fresh for every start attempt and discarded once the request is
/// on the wire. Field names match the controller's JSON contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub concurrent_users: u32,
    pub intensity: Intensity,
    /// Duration in whole seconds. The CLI accepts humantime (`5m`) and
    /// converts; "until stopped" is not supported.
    pub duration: u64,
    pub headless: bool,
    pub journey_mix: JourneyMix,
}

/// Lifecycle phase of the local campaign client.
///
/// Idle and Completed are both valid starting points for a new campaign;
/// Running is the only phase with an active poll task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Completed,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::Running => "Running",
            Phase::Completed => "Completed",
        }
    }

    /// A new campaign may start only when no campaign is active locally.
    pub fn can_start(self) -> bool {
        matches!(self, Phase::Idle | Phase::Completed)
    }
}

/// Per-service call/error counters reported by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCounters {
    pub calls: u64,
    pub errors: u64,
}

/// Counters for the fixed set of downstream services the campaign exercises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStats {
    pub store: ServiceCounters,
    pub cart: ServiceCounters,
    pub order: ServiceCounters,
    pub users: ServiceCounters,
}

impl ServiceStats {
    /// (name, counters) pairs in display order.
    pub fn entries(&self) -> [(&'static str, ServiceCounters); 4] {
        [
            ("store", self.store),
            ("cart", self.cart),
            ("order", self.order),
            ("users", self.users),
        ]
    }
}

/// One entry of the controller's bounded recent-activity window
/// (newest first, capped remotely at 20).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: String,
    pub action: String,
    pub status: String,
}

/// Telemetry received from `GET /api/stats`. Value object: never mutated
/// after receipt, replaced wholesale on each successful poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Authoritative signal that the remote campaign is still active.
    pub running: bool,
    #[serde(rename = "runtime")]
    pub runtime_secs: u64,
    pub active_sessions: u64,
    pub total_journeys: u64,
    pub total_page_loads: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub service_stats: ServiceStats,
    #[serde(default)]
    pub recent_actions: Vec<ActivityEntry>,
}

impl TelemetrySnapshot {
    /// Rounded success percentage; 0 when no journey has finished yet.
    pub fn success_rate_percent(&self) -> u32 {
        let total = self.success_count + self.failure_count;
        if total == 0 {
            return 0;
        }
        ((self.success_count as f64 / total as f64) * 100.0).round() as u32
    }

    pub fn runtime_display(&self) -> String {
        format_runtime(self.runtime_secs)
    }
}

/// Format whole seconds as `m:ss` with zero-padded seconds.
pub fn format_runtime(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Events emitted by the campaign controller for presentation layers.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    PhaseChanged(Phase),
    /// Fresh snapshot accepted from a poll. Replaces, never extends,
    /// whatever the presentation layer showed before.
    Telemetry(TelemetrySnapshot),
    /// Blocking failure of a start or stop request, surfaced verbatim.
    ControlFailed(String),
    Info(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(success: u64, failure: u64) -> TelemetrySnapshot {
        TelemetrySnapshot {
            running: true,
            runtime_secs: 0,
            active_sessions: 0,
            total_journeys: 0,
            total_page_loads: 0,
            success_count: success,
            failure_count: failure,
            service_stats: ServiceStats::default(),
            recent_actions: Vec::new(),
        }
    }

    #[test]
    fn success_rate_is_zero_without_samples() {
        assert_eq!(snapshot(0, 0).success_rate_percent(), 0);
    }

    #[test]
    fn success_rate_rounds_to_whole_percent() {
        assert_eq!(snapshot(3, 1).success_rate_percent(), 75);
        assert_eq!(snapshot(2, 1).success_rate_percent(), 67);
        assert_eq!(snapshot(5, 0).success_rate_percent(), 100);
    }

    #[test]
    fn runtime_formats_with_padded_seconds() {
        assert_eq!(format_runtime(125), "2:05");
        assert_eq!(format_runtime(59), "0:59");
        assert_eq!(format_runtime(0), "0:00");
        assert_eq!(format_runtime(600), "10:00");
    }

    #[test]
    fn config_serializes_with_wire_field_names() {
        let cfg = CampaignConfig {
            concurrent_users: 8,
            intensity: Intensity::High,
            duration: 300,
            headless: true,
            journey_mix: JourneyMix {
                browse: 40,
                shopping: 30,
                order: 20,
                admin: 10,
            },
        };
        let v = serde_json::to_value(&cfg).unwrap();
        assert_eq!(v["concurrent_users"], 8);
        assert_eq!(v["intensity"], "high");
        assert_eq!(v["duration"], 300);
        assert_eq!(v["headless"], true);
        // All four mix keys are always present on the wire.
        for key in ["browse", "shopping", "order", "admin"] {
            assert!(v["journey_mix"].get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn snapshot_deserializes_from_stats_body() {
        let body = serde_json::json!({
            "running": true,
            "runtime": 125,
            "active_sessions": 5,
            "total_journeys": 12,
            "total_page_loads": 48,
            "success_count": 11,
            "failure_count": 1,
            "service_stats": {
                "store": {"calls": 30, "errors": 0},
                "cart": {"calls": 10, "errors": 1},
                "order": {"calls": 5, "errors": 0},
                "users": {"calls": 3, "errors": 0}
            },
            "recent_actions": [
                {"timestamp": "12:00:05", "action": "User 1: Browsing store", "status": "success"}
            ]
        });
        let snap: TelemetrySnapshot = serde_json::from_value(body).unwrap();
        assert!(snap.running);
        assert_eq!(snap.runtime_display(), "2:05");
        assert_eq!(snap.service_stats.cart.errors, 1);
        assert_eq!(snap.recent_actions.len(), 1);
        assert_eq!(snap.recent_actions[0].status, "success");
    }
}
