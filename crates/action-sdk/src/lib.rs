//! Action SDK - high-level vehicle commands
//!
//! Translates arm/disarm/kill/takeoff/land/return-to-launch into device
//! commands, gates the unsafe ones on the vehicle's landed state and
//! reports every outcome as an [`ActionResult`].

pub mod action;
pub mod channel;
pub mod telemetry;

pub use action::Action;
pub use action_core::{ActionKind, ActionResult, AirborneState, CommandOutcome, CommandRequest};
pub use channel::{DeviceChannel, OutcomeCallback};
pub use telemetry::{
    ExtendedSysState, HandlerOwner, Heartbeat, MessageHandler, MessageKind, MessageRouter,
    VehicleMessage,
};
