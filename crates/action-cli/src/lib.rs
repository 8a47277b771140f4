//! Action CLI - tools for driving the action SDK against a simulated vehicle.
//!
//! Binaries:
//! - action: run one or more actions and print their results
//! - demo_scenario: scripted flight exercising the safety gate

pub mod config;
pub mod sim;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the fmt subscriber; `RUST_LOG` overrides the default directive.
pub fn init_tracing(default_directive: &str) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(default_directive.parse()?))
        .init();
    Ok(())
}
