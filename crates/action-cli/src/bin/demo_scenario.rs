//! Demo Scenario - scripted flight against the simulated vehicle.
//!
//! 1. ARM before any telemetry (refused locally)
//! 2. ARM, TAKEOFF once the vehicle reports it is on the ground
//! 3. ARM/DISARM in flight (refused locally)
//! 4. RETURN-TO-LAUNCH, then DISARM on the ground
//! 5. Optional KILL in flight (sent regardless of state)
//!
//! Usage:
//!   cargo run -p action-cli --bin demo_scenario

use std::sync::Arc;

use action_cli::config::SimConfig;
use action_cli::sim::{
    create_kill_in_flight_scenario, create_standard_flight_scenario, run_scenario, SimVehicle,
    StepReport,
};
use action_sdk::Action;
use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Scripted arm/takeoff/RTL flight against the simulator")]
struct Args {
    /// Use the callback form instead of the blocking form
    #[arg(long = "async", default_value_t = false)]
    use_async: bool,

    /// Skip the kill-in-flight scenario
    #[arg(long)]
    no_kill: bool,

    /// Print the step reports as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    action_cli::init_tracing("action_cli=info,action_sdk=info")?;
    let args = Args::parse();
    let config = SimConfig::from_env();

    let mut scenarios = vec![(create_standard_flight_scenario(), config.clone())];
    if !args.no_kill {
        let allows = config.allow_in_air_disarm;
        scenarios.push((create_kill_in_flight_scenario(allows), config.clone()));
    }

    let mut failures = 0;
    for (scenario, config) in scenarios {
        println!("=== {} ===", scenario.name);

        let vehicle = SimVehicle::new(config);
        let action = Arc::new(Action::new(
            Arc::new(vehicle.clone()),
            Arc::new(vehicle.clone()),
        ));
        action.init();

        let reports = run_scenario(&action, &vehicle, &scenario, args.use_async).await?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        } else {
            for report in &reports {
                print_report(report);
            }
        }
        failures += reports.iter().filter(|r| !r.passed()).count();

        action.deinit();
    }

    if failures > 0 {
        anyhow::bail!("{} step(s) did not produce the expected result", failures);
    }
    println!("All steps produced the expected result");
    Ok(())
}

fn print_report(report: &StepReport) {
    let mark = if report.passed() { "ok" } else { "MISMATCH" };
    println!(
        "{:<18} {:<18} (expected {:<16}) in_air={} known={} [{}]",
        report.action,
        report.result.as_str(),
        report.expected.as_str(),
        report.state_before.in_air,
        report.state_before.state_known,
        mark
    );
}
