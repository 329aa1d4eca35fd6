//! Text rendering of telemetry snapshots for CLI output.
//!
//! This module formats human-readable lines for the watch and status
//! modes. It only consumes snapshots; all lifecycle logic lives in the
//! orchestrator.

use crate::model::TelemetrySnapshot;

/// How many recent-activity entries the summary shows. The controller
/// itself caps the feed at 20.
const ACTIVITY_LINES: usize = 8;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// One-line progress report emitted on every accepted poll.
pub(crate) fn status_line(snap: &TelemetrySnapshot) -> String {
    format!(
        "{} | sessions {} | journeys {} | pages {} | success {}%",
        snap.runtime_display(),
        snap.active_sessions,
        snap.total_journeys,
        snap.total_page_loads,
        snap.success_rate_percent()
    )
}

/// Build the full summary shown at completion and in status mode.
pub(crate) fn build_text_summary(snap: &TelemetrySnapshot) -> TextSummary {
    let mut lines = Vec::new();

    lines.push(format!(
        "Campaign {} | runtime {}",
        if snap.running { "running" } else { "finished" },
        snap.runtime_display()
    ));
    lines.push(format!(
        "Sessions: {}  Journeys: {}  Page loads: {}",
        snap.active_sessions, snap.total_journeys, snap.total_page_loads
    ));
    lines.push(format!(
        "Success rate: {}% ({} ok / {} failed)",
        snap.success_rate_percent(),
        snap.success_count,
        snap.failure_count
    ));

    for (name, counters) in snap.service_stats.entries() {
        lines.push(format!(
            "  {name:<6} {} calls, {} errors",
            counters.calls, counters.errors
        ));
    }

    if !snap.recent_actions.is_empty() {
        lines.push("Recent activity:".to_string());
        // The feed arrives newest first and replaces the previous window.
        for entry in snap.recent_actions.iter().take(ACTIVITY_LINES) {
            lines.push(format!(
                "  [{}] {} ({})",
                entry.timestamp, entry.action, entry.status
            ));
        }
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActivityEntry, ServiceCounters, ServiceStats};

    fn snap() -> TelemetrySnapshot {
        TelemetrySnapshot {
            running: false,
            runtime_secs: 125,
            active_sessions: 0,
            total_journeys: 12,
            total_page_loads: 48,
            success_count: 3,
            failure_count: 1,
            service_stats: ServiceStats {
                store: ServiceCounters {
                    calls: 30,
                    errors: 2,
                },
                ..Default::default()
            },
            recent_actions: (0..12)
                .map(|i| ActivityEntry {
                    timestamp: format!("12:00:{i:02}"),
                    action: format!("User {i}: Browsing store"),
                    status: "success".into(),
                })
                .collect(),
        }
    }

    #[test]
    fn status_line_shows_runtime_and_rate() {
        let line = status_line(&snap());
        assert!(line.starts_with("2:05 | "));
        assert!(line.contains("success 75%"));
    }

    #[test]
    fn summary_lists_all_services() {
        let summary = build_text_summary(&snap());
        let text = summary.lines.join("\n");
        for name in ["store", "cart", "order", "users"] {
            assert!(text.contains(name), "missing {name}");
        }
        assert!(text.contains("30 calls, 2 errors"));
    }

    #[test]
    fn summary_bounds_the_activity_feed() {
        let summary = build_text_summary(&snap());
        let shown = summary
            .lines
            .iter()
            .filter(|l| l.contains("Browsing store"))
            .count();
        assert_eq!(shown, ACTIVITY_LINES);
    }
}
