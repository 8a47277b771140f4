//! Run vehicle actions against the simulator.
//!
//! Usage:
//!   cargo run -p action-cli --bin action -- arm takeoff rtl
//!   cargo run -p action-cli --bin action -- --async --json arm takeoff

use std::sync::Arc;
use std::time::Duration;

use action_cli::config::SimConfig;
use action_cli::sim::SimVehicle;
use action_core::{ActionKind, ActionResult, AirborneState, CommandOutcome, LandedState};
use action_sdk::Action;
use anyhow::Result;
use clap::Parser;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(author, version, about = "Send high-level actions to a simulated vehicle")]
struct Args {
    /// Actions to run in order (arm, disarm, kill, takeoff, land, rtl)
    #[arg(required = true)]
    actions: Vec<ActionKind>,

    /// Use the callback form instead of the blocking form
    #[arg(long = "async")]
    use_async: bool,

    /// Acknowledgement latency in milliseconds
    #[arg(long)]
    latency_ms: Option<u64>,

    /// Landed state the vehicle starts in
    #[arg(long)]
    initial_state: Option<LandedState>,

    /// Answer every command with this outcome (e.g. TIMEOUT, BUSY)
    #[arg(long)]
    force_outcome: Option<CommandOutcome>,

    /// Let the vehicle accept disarm/kill while airborne
    #[arg(long)]
    allow_in_air_disarm: bool,

    /// Do not run the simulated telemetry stream
    #[arg(long)]
    no_telemetry: bool,

    /// Print a JSON report instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct ActionReport {
    action: ActionKind,
    result: ActionResult,
    description: &'static str,
    state_before: AirborneState,
}

#[tokio::main]
async fn main() -> Result<()> {
    action_cli::init_tracing("action_cli=info")?;
    let args = Args::parse();

    let mut config = SimConfig::from_env();
    if let Some(ms) = args.latency_ms {
        config.latency = Duration::from_millis(ms);
    }
    if let Some(state) = args.initial_state {
        config.initial_state = state;
    }
    if args.force_outcome.is_some() {
        config.force_outcome = args.force_outcome;
    }
    config.allow_in_air_disarm |= args.allow_in_air_disarm;
    tracing::debug!("Simulator config: {:?}", config);

    let vehicle = SimVehicle::new(config);
    let action = Arc::new(Action::new(
        Arc::new(vehicle.clone()),
        Arc::new(vehicle.clone()),
    ));
    action.init();

    let telemetry = if args.no_telemetry {
        None
    } else {
        vehicle.report_state();
        Some(tokio::spawn(vehicle.clone().run_telemetry_loop()))
    };

    let mut reports = Vec::with_capacity(args.actions.len());
    for kind in args.actions {
        let state_before = action.airborne_state();
        let result = if args.use_async {
            action.perform_await(kind).await
        } else {
            let action = action.clone();
            tokio::task::spawn_blocking(move || action.perform(kind)).await?
        };

        if !args.json {
            println!("{:<18} {}", kind, result);
        }
        reports.push(ActionReport {
            action: kind,
            result,
            description: result.as_str(),
            state_before,
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    if let Some(handle) = telemetry {
        handle.abort();
    }
    action.deinit();
    Ok(())
}
