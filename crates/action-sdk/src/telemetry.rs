//! Telemetry messages and the message-routing seam.

use action_core::{AirborneCache, AirborneState, LandedState};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

/// Message categories a handler can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Heartbeat,
    ExtendedSysState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedSysState {
    pub vtol_state: u8,
    /// Raw MAV_LANDED_STATE value.
    pub landed_state: u8,
}

impl ExtendedSysState {
    pub fn new(landed: LandedState) -> Self {
        Self {
            vtol_state: 0,
            landed_state: landed.as_raw(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub base_mode: u8,
    pub custom_mode: u32,
    pub system_status: u8,
}

/// Decoded vehicle message as delivered by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleMessage {
    Heartbeat(Heartbeat),
    ExtendedSysState(ExtendedSysState),
}

impl VehicleMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            VehicleMessage::Heartbeat(_) => MessageKind::Heartbeat,
            VehicleMessage::ExtendedSysState(_) => MessageKind::ExtendedSysState,
        }
    }
}

/// Opaque token identifying everything one component registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerOwner(u64);

impl HandlerOwner {
    /// Allocate a token not shared with any other owner in this process.
    pub fn unique() -> Self {
        Self(NEXT_OWNER.fetch_add(1, Ordering::SeqCst))
    }
}

pub type MessageHandler = Arc<dyn Fn(&VehicleMessage) + Send + Sync + 'static>;

/// Routes inbound vehicle messages to registered handlers.
pub trait MessageRouter: Send + Sync {
    fn register_handler(&self, kind: MessageKind, handler: MessageHandler, owner: HandlerOwner);

    fn unregister_all_handlers(&self, owner: HandlerOwner);
}

/// Fold an EXTENDED_SYS_STATE report into the airborne cache.
pub fn process_extended_sys_state(cache: &AirborneCache, message: &ExtendedSysState) -> AirborneState {
    let landed = LandedState::from_raw(message.landed_state);
    let state = cache.apply(landed);
    tracing::trace!("Landed state {:?} -> {:?}", landed, state);
    state
}
