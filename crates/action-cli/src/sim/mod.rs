//! Simulation module for exercising the action SDK without hardware.
//!
//! Provides an in-process vehicle and scripted action scenarios.

mod scenarios;
mod vehicle;

pub use scenarios::{
    create_kill_in_flight_scenario, create_standard_flight_scenario, run_scenario, Scenario,
    Step, StepReport,
};
pub use vehicle::{SimVehicle, VehicleStatus};
