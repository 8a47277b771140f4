//! Core data models for vehicle actions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// MAVLink identifiers used when building action requests.
pub mod mav {
    pub use mavlink::common::{MavCmd, MavLandedState, MavMode, MavModeFlag, MavResult, MavState};

    /// PX4 custom main mode AUTO (not part of the common dialect).
    pub const PX4_CUSTOM_MAIN_MODE_AUTO: u8 = 4;
    /// PX4 AUTO sub mode RTL.
    pub const PX4_CUSTOM_SUB_MODE_AUTO_RTL: u8 = 5;

    /// Base mode sent with the return-to-launch mode switch.
    pub const RTL_BASE_MODE: u8 =
        MavMode::MAV_MODE_AUTO_ARMED as u8 | MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED.bits();

    /// param1 of COMPONENT_ARM_DISARM.
    pub const ARM: f32 = 1.0;
    pub const DISARM: f32 = 0.0;
}

use mav::{MavCmd, MavLandedState, MavResult};

/// Errors produced when parsing model values from text (CLI, env).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("unknown action result '{0}'")]
    UnknownResult(String),
    #[error("unknown command outcome '{0}'")]
    UnknownOutcome(String),
    #[error("unknown landed state '{0}'")]
    UnknownLandedState(String),
}

// ========== RESULTS ==========

/// Uniform result of a vehicle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionResult {
    Success,
    NoDevice,
    ConnectionError,
    Busy,
    /// Rejected either by the local precondition gate or by the vehicle.
    CommandDenied,
    Timeout,
    /// Any device outcome without an explicit mapping.
    Unknown,
}

impl ActionResult {
    pub const ALL: [ActionResult; 7] = [
        ActionResult::Success,
        ActionResult::NoDevice,
        ActionResult::ConnectionError,
        ActionResult::Busy,
        ActionResult::CommandDenied,
        ActionResult::Timeout,
        ActionResult::Unknown,
    ];

    /// Human-readable description for diagnostics and UI.
    pub fn as_str(self) -> &'static str {
        match self {
            ActionResult::Success => "Success",
            ActionResult::NoDevice => "No device",
            ActionResult::ConnectionError => "Connection error",
            ActionResult::Busy => "Busy",
            ActionResult::CommandDenied => "Command denied",
            ActionResult::Timeout => "Timeout",
            ActionResult::Unknown => "Unknown error",
        }
    }

    pub fn is_success(self) -> bool {
        self == ActionResult::Success
    }

    fn name(self) -> &'static str {
        match self {
            ActionResult::Success => "SUCCESS",
            ActionResult::NoDevice => "NO_DEVICE",
            ActionResult::ConnectionError => "CONNECTION_ERROR",
            ActionResult::Busy => "BUSY",
            ActionResult::CommandDenied => "COMMAND_DENIED",
            ActionResult::Timeout => "TIMEOUT",
            ActionResult::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ActionResult {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_ascii_uppercase();
        ActionResult::ALL
            .into_iter()
            .find(|r| r.name() == wanted)
            .ok_or_else(|| ParseError::UnknownResult(s.to_string()))
    }
}

/// Outcome reported by the device command channel after transmitting a
/// command and waiting for its acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandOutcome {
    Success,
    NoDevice,
    ConnectionError,
    Busy,
    CommandDenied,
    Timeout,
    /// Vehicle does not implement the command.
    Unsupported,
    /// Vehicle accepted the command but executing it failed.
    Failed,
    /// Vehicle is still working on the command.
    InProgress,
}

impl CommandOutcome {
    pub const ALL: [CommandOutcome; 9] = [
        CommandOutcome::Success,
        CommandOutcome::NoDevice,
        CommandOutcome::ConnectionError,
        CommandOutcome::Busy,
        CommandOutcome::CommandDenied,
        CommandOutcome::Timeout,
        CommandOutcome::Unsupported,
        CommandOutcome::Failed,
        CommandOutcome::InProgress,
    ];

    /// Classify the result field of a COMMAND_ACK.
    pub fn from_mav_result(result: MavResult) -> Self {
        match result {
            MavResult::MAV_RESULT_ACCEPTED => CommandOutcome::Success,
            MavResult::MAV_RESULT_TEMPORARILY_REJECTED => CommandOutcome::Busy,
            MavResult::MAV_RESULT_DENIED => CommandOutcome::CommandDenied,
            MavResult::MAV_RESULT_UNSUPPORTED => CommandOutcome::Unsupported,
            MavResult::MAV_RESULT_IN_PROGRESS => CommandOutcome::InProgress,
            _ => CommandOutcome::Failed,
        }
    }

    fn name(self) -> &'static str {
        match self {
            CommandOutcome::Success => "SUCCESS",
            CommandOutcome::NoDevice => "NO_DEVICE",
            CommandOutcome::ConnectionError => "CONNECTION_ERROR",
            CommandOutcome::Busy => "BUSY",
            CommandOutcome::CommandDenied => "COMMAND_DENIED",
            CommandOutcome::Timeout => "TIMEOUT",
            CommandOutcome::Unsupported => "UNSUPPORTED",
            CommandOutcome::Failed => "FAILED",
            CommandOutcome::InProgress => "IN_PROGRESS",
        }
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for CommandOutcome {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_ascii_uppercase();
        CommandOutcome::ALL
            .into_iter()
            .find(|o| o.name() == wanted)
            .ok_or_else(|| ParseError::UnknownOutcome(s.to_string()))
    }
}

// ========== VEHICLE STATE ==========

/// Landed state as reported in EXTENDED_SYS_STATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandedState {
    Undefined,
    OnGround,
    InAir,
    Takeoff,
    Landing,
    /// Value outside the known MAV_LANDED_STATE range
    Other(u8),
}

const LANDED_UNDEFINED: u8 = MavLandedState::MAV_LANDED_STATE_UNDEFINED as u8;
const LANDED_ON_GROUND: u8 = MavLandedState::MAV_LANDED_STATE_ON_GROUND as u8;
const LANDED_IN_AIR: u8 = MavLandedState::MAV_LANDED_STATE_IN_AIR as u8;
const LANDED_TAKEOFF: u8 = MavLandedState::MAV_LANDED_STATE_TAKEOFF as u8;
const LANDED_LANDING: u8 = MavLandedState::MAV_LANDED_STATE_LANDING as u8;

impl LandedState {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            LANDED_UNDEFINED => LandedState::Undefined,
            LANDED_ON_GROUND => LandedState::OnGround,
            LANDED_IN_AIR => LandedState::InAir,
            LANDED_TAKEOFF => LandedState::Takeoff,
            LANDED_LANDING => LandedState::Landing,
            other => LandedState::Other(other),
        }
    }

    pub fn as_raw(self) -> u8 {
        match self {
            LandedState::Undefined => LANDED_UNDEFINED,
            LandedState::OnGround => LANDED_ON_GROUND,
            LandedState::InAir => LANDED_IN_AIR,
            LandedState::Takeoff => LANDED_TAKEOFF,
            LandedState::Landing => LANDED_LANDING,
            LandedState::Other(raw) => raw,
        }
    }
}

impl From<MavLandedState> for LandedState {
    fn from(state: MavLandedState) -> Self {
        LandedState::from_raw(state as u8)
    }
}

impl FromStr for LandedState {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "undefined" => Ok(LandedState::Undefined),
            "on_ground" | "ground" => Ok(LandedState::OnGround),
            "in_air" | "air" => Ok(LandedState::InAir),
            "takeoff" => Ok(LandedState::Takeoff),
            "landing" => Ok(LandedState::Landing),
            other => other
                .parse::<u8>()
                .map(LandedState::from_raw)
                .map_err(|_| ParseError::UnknownLandedState(s.to_string())),
        }
    }
}

/// Cached airborne status used by the precondition gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirborneState {
    /// False until the first EXTENDED_SYS_STATE arrives.
    pub state_known: bool,
    pub in_air: bool,
}

// ========== COMMANDS ==========

/// A single COMMAND_LONG style request handed to the device channel.
///
/// Parameters that do not apply are encoded as NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandRequest {
    pub command: MavCmd,
    pub params: [f32; 7],
}

impl CommandRequest {
    /// Build a request from its leading parameters; the remaining slots
    /// are marked not applicable. Extra leading values past seven are ignored.
    pub fn new(command: MavCmd, leading: &[f32]) -> Self {
        let mut params = [f32::NAN; 7];
        for (slot, value) in params.iter_mut().zip(leading) {
            *slot = *value;
        }
        Self { command, params }
    }

    pub fn is_not_applicable(&self, index: usize) -> bool {
        self.params.get(index).map_or(true, |p| p.is_nan())
    }
}

/// The high-level vehicle actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Arm,
    Disarm,
    /// Unconditional motor stop; same wire command as disarm, never gated.
    Kill,
    Takeoff,
    Land,
    ReturnToLaunch,
}

impl ActionKind {
    pub const ALL: [ActionKind; 6] = [
        ActionKind::Arm,
        ActionKind::Disarm,
        ActionKind::Kill,
        ActionKind::Takeoff,
        ActionKind::Land,
        ActionKind::ReturnToLaunch,
    ];

    /// Whether the precondition gate is consulted before dispatch.
    pub fn is_gated(self) -> bool {
        matches!(self, ActionKind::Arm | ActionKind::Disarm)
    }

    /// Build the command request for this action.
    pub fn request(self) -> CommandRequest {
        use mav::*;
        match self {
            ActionKind::Arm => CommandRequest::new(MavCmd::MAV_CMD_COMPONENT_ARM_DISARM, &[ARM]),
            ActionKind::Disarm | ActionKind::Kill => {
                CommandRequest::new(MavCmd::MAV_CMD_COMPONENT_ARM_DISARM, &[DISARM])
            }
            ActionKind::Takeoff => CommandRequest::new(MavCmd::MAV_CMD_NAV_TAKEOFF, &[]),
            ActionKind::Land => CommandRequest::new(MavCmd::MAV_CMD_NAV_LAND, &[]),
            ActionKind::ReturnToLaunch => CommandRequest::new(
                MavCmd::MAV_CMD_DO_SET_MODE,
                &[
                    f32::from(RTL_BASE_MODE),
                    f32::from(PX4_CUSTOM_MAIN_MODE_AUTO),
                    f32::from(PX4_CUSTOM_SUB_MODE_AUTO_RTL),
                ],
            ),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Arm => "arm",
            ActionKind::Disarm => "disarm",
            ActionKind::Kill => "kill",
            ActionKind::Takeoff => "takeoff",
            ActionKind::Land => "land",
            ActionKind::ReturnToLaunch => "return-to-launch",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "rtl" | "return-to-land" => Ok(ActionKind::ReturnToLaunch),
            wanted => ActionKind::ALL
                .into_iter()
                .find(|k| k.as_str() == wanted)
                .ok_or_else(|| ParseError::UnknownAction(s.to_string())),
        }
    }
}
