//! In-process vehicle standing in for the device channel and the
//! telemetry router.

use std::sync::{Arc, Mutex};

use action_core::mav::{self, MavCmd, MavModeFlag, MavState};
use action_core::{CommandOutcome, CommandRequest, LandedState};
use action_sdk::{
    DeviceChannel, ExtendedSysState, HandlerOwner, Heartbeat, MessageHandler, MessageKind,
    MessageRouter, OutcomeCallback, VehicleMessage,
};
use dashmap::DashMap;
use serde::Serialize;
use tokio::time::interval;

use crate::config::SimConfig;

/// Snapshot of what the simulated vehicle believes about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VehicleStatus {
    pub armed: bool,
    pub landed: LandedState,
    /// (main mode, sub mode) of the last accepted DO_SET_MODE.
    pub custom_mode: Option<(u8, u8)>,
}

struct Inner {
    config: SimConfig,
    status: Mutex<VehicleStatus>,
    /// Serializes state changes with the telemetry they produce, so
    /// subscribers see reports in the order the state changed.
    publish_order: Mutex<()>,
    handlers: DashMap<HandlerOwner, Vec<(MessageKind, MessageHandler)>>,
}

/// Cheaply clonable handle to a simulated vehicle.
#[derive(Clone)]
pub struct SimVehicle {
    inner: Arc<Inner>,
}

impl SimVehicle {
    pub fn new(config: SimConfig) -> Self {
        let status = VehicleStatus {
            armed: false,
            landed: config.initial_state,
            custom_mode: None,
        };
        Self {
            inner: Arc::new(Inner {
                config,
                status: Mutex::new(status),
                publish_order: Mutex::new(()),
                handlers: DashMap::new(),
            }),
        }
    }

    pub fn status(&self) -> VehicleStatus {
        *lock(&self.inner.status)
    }

    pub fn handler_count(&self) -> usize {
        self.inner.handlers.iter().map(|entry| entry.value().len()).sum()
    }

    /// Publish the current landed state and heartbeat, as a telemetry tick would.
    pub fn report_state(&self) {
        let _order = lock(&self.inner.publish_order);
        let status = self.status();
        self.publish(extended_sys_state(status.landed));
        self.publish(heartbeat(&status));
    }

    /// Publish an arbitrary landed state without changing the vehicle.
    pub fn inject_landed_state(&self, landed: LandedState) {
        let _order = lock(&self.inner.publish_order);
        self.publish(extended_sys_state(landed));
    }

    /// Deliver `message` to every handler subscribed to its kind.
    pub fn publish(&self, message: VehicleMessage) {
        // Collect first so no map guard is held while handlers run.
        let targets: Vec<MessageHandler> = self
            .inner
            .handlers
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|(kind, _)| *kind == message.kind())
                    .map(|(_, handler)| handler.clone())
                    .collect::<Vec<_>>()
            })
            .collect();
        for handler in targets {
            handler(&message);
        }
    }

    /// Apply a command and return the acknowledgement the vehicle would send.
    pub fn execute(&self, request: &CommandRequest) -> CommandOutcome {
        if let Some(outcome) = self.inner.config.force_outcome {
            tracing::debug!("Forced outcome {} for {:?}", outcome, request.command);
            return outcome;
        }

        let _order = lock(&self.inner.publish_order);
        let (outcome, messages) = {
            let mut status = lock(&self.inner.status);
            let mut messages = Vec::new();
            let outcome = apply(&mut status, &self.inner.config, request, &mut messages);
            if outcome == CommandOutcome::Success {
                messages.push(heartbeat(&status));
            }
            (outcome, messages)
        };

        for message in messages {
            self.publish(message);
        }
        tracing::debug!("{:?} -> {}", request.command, outcome);
        outcome
    }

    /// Publish telemetry at the configured rate until the task is dropped.
    pub async fn run_telemetry_loop(self) {
        let mut ticker = interval(self.inner.config.telemetry_period());
        loop {
            ticker.tick().await;
            self.report_state();
        }
    }
}

impl DeviceChannel for SimVehicle {
    fn send_command_blocking(&self, request: &CommandRequest) -> CommandOutcome {
        if !self.inner.config.latency.is_zero() {
            std::thread::sleep(self.inner.config.latency);
        }
        self.execute(request)
    }

    fn send_command_async(&self, request: CommandRequest, on_outcome: OutcomeCallback) {
        let vehicle = self.clone();
        let latency = self.inner.config.latency;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    tokio::time::sleep(latency).await;
                    on_outcome(vehicle.execute(&request));
                });
            }
            Err(_) => {
                std::thread::spawn(move || {
                    std::thread::sleep(latency);
                    on_outcome(vehicle.execute(&request));
                });
            }
        }
    }
}

impl MessageRouter for SimVehicle {
    fn register_handler(&self, kind: MessageKind, handler: MessageHandler, owner: HandlerOwner) {
        self.inner
            .handlers
            .entry(owner)
            .or_default()
            .push((kind, handler));
    }

    fn unregister_all_handlers(&self, owner: HandlerOwner) {
        self.inner.handlers.remove(&owner);
    }
}

fn apply(
    status: &mut VehicleStatus,
    config: &SimConfig,
    request: &CommandRequest,
    messages: &mut Vec<VehicleMessage>,
) -> CommandOutcome {
    let airborne = status.landed == LandedState::InAir;
    match request.command {
        MavCmd::MAV_CMD_COMPONENT_ARM_DISARM => {
            if request.params[0] >= 0.5 {
                status.armed = true;
                return CommandOutcome::Success;
            }
            if airborne && !config.allow_in_air_disarm {
                return CommandOutcome::CommandDenied;
            }
            status.armed = false;
            if airborne {
                // Motors stopped in flight; the vehicle comes down.
                set_landed(status, LandedState::OnGround, messages);
            }
            CommandOutcome::Success
        }
        MavCmd::MAV_CMD_NAV_TAKEOFF => {
            if !status.armed {
                return CommandOutcome::CommandDenied;
            }
            if !airborne {
                set_landed(status, LandedState::Takeoff, messages);
                set_landed(status, LandedState::InAir, messages);
            }
            CommandOutcome::Success
        }
        MavCmd::MAV_CMD_NAV_LAND => {
            if airborne {
                touch_down(status, messages);
            }
            CommandOutcome::Success
        }
        MavCmd::MAV_CMD_DO_SET_MODE => {
            if request.params[1].is_nan() {
                return CommandOutcome::Failed;
            }
            let main_mode = request.params[1] as u8;
            let sub_mode = request.params[2] as u8;
            status.custom_mode = Some((main_mode, sub_mode));
            if main_mode == mav::PX4_CUSTOM_MAIN_MODE_AUTO
                && sub_mode == mav::PX4_CUSTOM_SUB_MODE_AUTO_RTL
                && airborne
            {
                touch_down(status, messages);
            }
            CommandOutcome::Success
        }
        other => {
            tracing::warn!("Simulator does not support {:?}", other);
            CommandOutcome::Unsupported
        }
    }
}

fn touch_down(status: &mut VehicleStatus, messages: &mut Vec<VehicleMessage>) {
    set_landed(status, LandedState::Landing, messages);
    set_landed(status, LandedState::OnGround, messages);
    status.armed = false;
}

fn set_landed(status: &mut VehicleStatus, landed: LandedState, messages: &mut Vec<VehicleMessage>) {
    status.landed = landed;
    messages.push(extended_sys_state(landed));
}

fn extended_sys_state(landed: LandedState) -> VehicleMessage {
    VehicleMessage::ExtendedSysState(ExtendedSysState::new(landed))
}

fn heartbeat(status: &VehicleStatus) -> VehicleMessage {
    let (main_mode, sub_mode) = status.custom_mode.unwrap_or((0, 0));
    VehicleMessage::Heartbeat(Heartbeat {
        base_mode: if status.armed {
            MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED.bits()
        } else {
            0
        },
        custom_mode: (u32::from(main_mode) << 16) | (u32::from(sub_mode) << 24),
        system_status: if status.armed {
            MavState::MAV_STATE_ACTIVE as u8
        } else {
            MavState::MAV_STATE_STANDBY as u8
        },
    })
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
