//! Safety preconditions evaluated against the cached airborne state.
//!
//! Only arm and disarm are gated here. Kill, takeoff, land and
//! return-to-launch always go to the vehicle, which is expected to
//! reject them itself when unsafe.

use crate::models::{ActionKind, AirborneState};
use thiserror::Error;

/// Why a gated action was refused locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("in air state unknown")]
    StateUnknown,
    #[error("still in air")]
    InAir,
}

fn on_ground(state: &AirborneState) -> Result<(), Denial> {
    if !state.state_known {
        return Err(Denial::StateUnknown);
    }
    if state.in_air {
        return Err(Denial::InAir);
    }
    Ok(())
}

pub fn arm_allowed(state: &AirborneState) -> bool {
    on_ground(state).is_ok()
}

/// Same policy as arming: refused while airborne or before any report.
pub fn disarm_allowed(state: &AirborneState) -> bool {
    on_ground(state).is_ok()
}

/// Evaluate the gate for `kind`. Ungated actions always pass.
pub fn check(kind: ActionKind, state: &AirborneState) -> Result<(), Denial> {
    let verdict = match kind {
        ActionKind::Arm | ActionKind::Disarm => on_ground(state),
        _ => Ok(()),
    };
    if let Err(denial) = verdict {
        tracing::debug!("{} denied: {}", kind, denial);
    }
    verdict
}
