//! Vehicle action core - result taxonomy, request construction and
//! safety gating shared by the SDK and tools.

pub mod gate;
pub mod models;
pub mod normalize;
pub mod state;

pub use gate::{arm_allowed, disarm_allowed, Denial};
pub use models::{
    mav, ActionKind, ActionResult, AirborneState, CommandOutcome, CommandRequest, LandedState,
    ParseError,
};
pub use normalize::normalize;
pub use state::AirborneCache;
