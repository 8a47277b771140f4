//! Pre-defined action scenarios for demos and testing.

use action_core::{ActionKind, ActionResult, AirborneState, LandedState};
use action_sdk::Action;
use serde::Serialize;

use super::SimVehicle;

/// One scripted step.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Publish the vehicle's current state (a telemetry tick).
    Report,
    /// Publish a landed state the vehicle did not actually change to.
    Inject(LandedState),
    /// Run an action and compare its result.
    Perform { kind: ActionKind, expect: ActionResult },
}

/// A named, ordered list of steps.
pub struct Scenario {
    pub name: String,
    pub steps: Vec<Step>,
}

/// Result of one performed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub action: ActionKind,
    pub result: ActionResult,
    pub expected: ActionResult,
    pub description: &'static str,
    pub state_before: AirborneState,
}

impl StepReport {
    pub fn passed(&self) -> bool {
        self.result == self.expected
    }
}

fn perform(kind: ActionKind, expect: ActionResult) -> Step {
    Step::Perform { kind, expect }
}

/// Arm, take off, try to re-arm/disarm in flight, return home, disarm.
///
/// The first arm happens before any telemetry and must be refused.
pub fn create_standard_flight_scenario() -> Scenario {
    use ActionKind::*;
    use ActionResult::*;

    Scenario {
        name: "standard-flight".to_string(),
        steps: vec![
            perform(Arm, CommandDenied),
            Step::Report,
            perform(Arm, Success),
            perform(Takeoff, Success),
            perform(Arm, CommandDenied),
            perform(Disarm, CommandDenied),
            // Transitional states must not clear the airborne flag.
            Step::Inject(LandedState::Landing),
            perform(Disarm, CommandDenied),
            perform(ReturnToLaunch, Success),
            perform(Disarm, Success),
        ],
    }
}

/// Kill bypasses the local gate; the vehicle decides.
///
/// With `allow_in_air_disarm` off on the simulator the kill is rejected
/// remotely, with it on it succeeds and the vehicle drops to the ground.
pub fn create_kill_in_flight_scenario(vehicle_allows: bool) -> Scenario {
    use ActionKind::*;
    use ActionResult::*;

    let kill_result = if vehicle_allows { Success } else { CommandDenied };
    Scenario {
        name: "kill-in-flight".to_string(),
        steps: vec![
            Step::Report,
            perform(Arm, Success),
            perform(Takeoff, Success),
            perform(Kill, kill_result),
        ],
    }
}

/// Run `scenario` against `vehicle` through `action`.
///
/// Uses the callback form when `use_async` is set, otherwise the blocking
/// form on the blocking thread pool.
pub async fn run_scenario(
    action: &std::sync::Arc<Action>,
    vehicle: &SimVehicle,
    scenario: &Scenario,
    use_async: bool,
) -> anyhow::Result<Vec<StepReport>> {
    let mut reports = Vec::new();
    for step in &scenario.steps {
        match *step {
            Step::Report => vehicle.report_state(),
            Step::Inject(landed) => vehicle.inject_landed_state(landed),
            Step::Perform { kind, expect } => {
                let state_before = action.airborne_state();
                let result = if use_async {
                    action.perform_await(kind).await
                } else {
                    let action = action.clone();
                    tokio::task::spawn_blocking(move || action.perform(kind)).await?
                };
                reports.push(StepReport {
                    action: kind,
                    result,
                    expected: expect,
                    description: result.as_str(),
                    state_before,
                });
            }
        }
    }
    Ok(reports)
}
