use crate::api::{ControlApi, HttpControlApi};
use crate::model::{CampaignConfig, ClientEvent, Intensity, JourneyMix, Phase};
use crate::orchestrator::{run_controller, CampaignCommand};
use crate::text_summary;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for the stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "traffic-campaign-cli",
    version,
    about = "Start, stop and watch synthetic-traffic campaigns on a remote controller"
)]
pub struct Cli {
    /// Base URL of the traffic controller
    #[arg(long, default_value = "http://localhost:5004")]
    pub base_url: String,

    /// Concurrent simulated users
    #[arg(long, default_value_t = 5)]
    pub users: u32,

    /// Load profile
    #[arg(long, value_enum, default_value = "medium")]
    pub intensity: Intensity,

    /// Campaign duration (e.g. 90s, 5m)
    #[arg(long, default_value = "5m")]
    pub duration: humantime::Duration,

    /// Run remote browser sessions headless
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub headless: bool,

    /// Journey mix weight: browse
    #[arg(long, default_value_t = 40)]
    pub browse_weight: u32,

    /// Journey mix weight: shopping
    #[arg(long, default_value_t = 30)]
    pub shopping_weight: u32,

    /// Journey mix weight: order
    #[arg(long, default_value_t = 20)]
    pub order_weight: u32,

    /// Journey mix weight: admin
    #[arg(long, default_value_t = 10)]
    pub admin_weight: u32,

    /// Telemetry poll interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = 10_000)]
    pub request_timeout_ms: u64,

    /// Print the final snapshot as JSON instead of the text summary
    #[arg(long)]
    pub json: bool,

    /// Fetch one telemetry snapshot and exit (no campaign started)
    #[arg(long)]
    pub status: bool,

    /// Stop the remote campaign and exit (no campaign started)
    #[arg(long)]
    pub stop: bool,

    /// Probe the controller's health endpoint and exit
    #[arg(long)]
    pub check: bool,
}

/// Build a `CampaignConfig` from CLI values.
///
/// Pure function of the parsed arguments; out-of-range numeric input is
/// clamped here, at the input boundary, so building never fails. Called
/// fresh on every start attempt.
pub fn build_config(args: &Cli) -> CampaignConfig {
    CampaignConfig {
        concurrent_users: args.users.max(1),
        intensity: args.intensity,
        duration: Duration::from(args.duration).as_secs().max(1),
        headless: args.headless,
        journey_mix: JourneyMix {
            browse: args.browse_weight,
            shopping: args.shopping_weight,
            order: args.order_weight,
            admin: args.admin_weight,
        },
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let api = HttpControlApi::new(
        &args.base_url,
        Duration::from_millis(args.request_timeout_ms.max(1)),
    )?;

    // One-shot modes take precedence over watch mode.
    if args.check {
        api.check_health()
            .await
            .context("controller health check failed")?;
        println!("controller at {} is healthy", args.base_url);
        return Ok(());
    }
    if args.stop {
        return run_stop(api).await;
    }
    if args.status {
        return run_status(&args, api).await;
    }

    run_watch(args, api).await
}

/// Send a stop request to a campaign started elsewhere.
async fn run_stop(api: HttpControlApi) -> Result<()> {
    api.stop_campaign()
        .await
        .context("failed to stop campaign")?;
    println!("Stop acknowledged");
    Ok(())
}

/// Fetch and print a single telemetry snapshot.
async fn run_status(args: &Cli, api: HttpControlApi) -> Result<()> {
    let snap = api
        .fetch_stats()
        .await
        .context("failed to fetch campaign stats")?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snap)?);
    } else {
        for line in text_summary::build_text_summary(&snap).lines {
            println!("{}", line);
        }
    }
    Ok(())
}

/// Current UTC time as an RFC 3339 stamp for the end-of-run banner.
fn utc_timestamp() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

/// Start a campaign and stream telemetry until it completes or the
/// operator interrupts. Ctrl-C stops the campaign; a second Ctrl-C
/// detaches and leaves it running remotely.
async fn run_watch(args: Cli, api: HttpControlApi) -> Result<()> {
    let config = build_config(&args);
    let (out_tx, out_handle) = spawn_output_writer();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ClientEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<CampaignCommand>();
    let poll_interval = Duration::from_millis(args.poll_interval_ms.max(1));

    let controller = tokio::spawn(run_controller(api, poll_interval, event_tx, cmd_rx));
    let _ = cmd_tx.send(CampaignCommand::Start(config));

    let mut last_snapshot = None;
    let mut reached_running = false;
    let mut stop_requested = false;
    let mut control_error: Option<String> = None;

    loop {
        tokio::select! {
            ev = event_rx.recv() => match ev {
                Some(ClientEvent::PhaseChanged(phase)) => {
                    let _ = out_tx.send(OutputLine::Stderr(format!("== {} ==", phase.label())));
                    match phase {
                        Phase::Running => reached_running = true,
                        // Completion or an acknowledged stop ends the watch.
                        Phase::Completed | Phase::Idle => {
                            let _ = cmd_tx.send(CampaignCommand::Quit);
                        }
                    }
                }
                Some(ClientEvent::Telemetry(snap)) => {
                    let _ = out_tx.send(OutputLine::Stderr(text_summary::status_line(&snap)));
                    last_snapshot = Some(snap);
                }
                Some(ClientEvent::ControlFailed(msg)) => {
                    let _ = out_tx.send(OutputLine::Stderr(msg.clone()));
                    if !reached_running {
                        // The campaign never started; nothing to watch.
                        control_error = Some(msg);
                        let _ = cmd_tx.send(CampaignCommand::Quit);
                    }
                }
                Some(ClientEvent::Info(msg)) => {
                    let _ = out_tx.send(OutputLine::Stderr(msg));
                }
                // Controller exited and dropped its event sender.
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                if stop_requested {
                    let _ = out_tx.send(OutputLine::Stderr(
                        "Detaching; campaign left running".into(),
                    ));
                    let _ = cmd_tx.send(CampaignCommand::Quit);
                } else {
                    stop_requested = true;
                    let _ = out_tx.send(OutputLine::Stderr("Stopping campaign...".into()));
                    let _ = cmd_tx.send(CampaignCommand::Stop);
                }
            }
        }
    }

    controller.await.context("controller task failed")??;

    if let Some(snap) = last_snapshot {
        if args.json {
            let _ = out_tx.send(OutputLine::Stdout(serde_json::to_string_pretty(&snap)?));
        } else {
            let _ = out_tx.send(OutputLine::Stderr(format!("Finished {}", utc_timestamp())));
            for line in text_summary::build_text_summary(&snap).lines {
                let _ = out_tx.send(OutputLine::Stdout(line));
            }
        }
    }

    drop(cmd_tx);
    drop(out_tx);
    let _ = out_handle.await;

    match control_error {
        Some(msg) => Err(anyhow::anyhow!(msg)),
        None => Ok(()),
    }
}
