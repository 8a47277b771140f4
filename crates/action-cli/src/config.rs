//! Simulator configuration from environment.

use action_core::{CommandOutcome, LandedState};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Delay before the simulated vehicle acknowledges a command.
    pub latency: Duration,
    /// Landed state the vehicle starts in (reported on the first telemetry tick).
    pub initial_state: LandedState,
    /// Answer every command with this outcome instead of simulating it.
    pub force_outcome: Option<CommandOutcome>,
    /// Let the vehicle accept a disarm/kill while airborne.
    pub allow_in_air_disarm: bool,
    /// EXTENDED_SYS_STATE publish rate for the background telemetry loop.
    pub telemetry_rate_hz: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(50),
            initial_state: LandedState::OnGround,
            force_outcome: None,
            allow_in_air_disarm: false,
            telemetry_rate_hz: 2.0,
        }
    }
}

impl SimConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            latency: env::var("ACTION_SIM_LATENCY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.latency),
            initial_state: env::var("ACTION_SIM_INITIAL_STATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.initial_state),
            force_outcome: env::var("ACTION_SIM_FORCE_OUTCOME")
                .ok()
                .and_then(|s| s.parse().ok()),
            allow_in_air_disarm: env::var("ACTION_SIM_ALLOW_IN_AIR_DISARM")
                .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.allow_in_air_disarm),
            telemetry_rate_hz: env::var("ACTION_SIM_TELEMETRY_HZ")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|hz: &f64| hz.is_finite() && *hz > 0.0)
                .unwrap_or(defaults.telemetry_rate_hz),
        }
    }

    /// Tick period of the telemetry loop.
    ///
    /// Rates whose period is not a usable, non-zero `Duration` fall back to
    /// the default rate.
    pub fn telemetry_period(&self) -> Duration {
        let fallback = Duration::from_secs_f64(1.0 / Self::default().telemetry_rate_hz);
        match Duration::try_from_secs_f64(1.0 / self.telemetry_rate_hz) {
            Ok(period) if !period.is_zero() => period,
            _ => {
                tracing::warn!(
                    "Telemetry rate {} Hz is out of range, using {:?}",
                    self.telemetry_rate_hz,
                    fallback
                );
                fallback
            }
        }
    }

    /// No latency, useful for tests.
    pub fn instant() -> Self {
        Self {
            latency: Duration::ZERO,
            ..Self::default()
        }
    }
}
