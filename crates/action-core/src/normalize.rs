//! Mapping from device-channel outcomes to public action results.
//!
//! The two enumerations evolve independently; anything the public API
//! has no name for surfaces as [`ActionResult::Unknown`].

use crate::models::{ActionResult, CommandOutcome};

/// Normalize a low-level command outcome.
pub fn normalize(outcome: CommandOutcome) -> ActionResult {
    match outcome {
        CommandOutcome::Success => ActionResult::Success,
        CommandOutcome::NoDevice => ActionResult::NoDevice,
        CommandOutcome::ConnectionError => ActionResult::ConnectionError,
        CommandOutcome::Busy => ActionResult::Busy,
        CommandOutcome::CommandDenied => ActionResult::CommandDenied,
        CommandOutcome::Timeout => ActionResult::Timeout,
        _ => ActionResult::Unknown,
    }
}

impl From<CommandOutcome> for ActionResult {
    fn from(outcome: CommandOutcome) -> Self {
        normalize(outcome)
    }
}
