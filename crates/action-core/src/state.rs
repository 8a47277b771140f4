//! Vehicle state cache fed by EXTENDED_SYS_STATE notifications.

use crate::models::{AirborneState, LandedState};
use std::sync::atomic::{AtomicU8, Ordering};

const KNOWN: u8 = 0b01;
const IN_AIR: u8 = 0b10;

/// Thread-safe holder of the latest airborne status.
///
/// Both fields live in one atomic byte so a reader on the caller's thread
/// can never see a half-applied update from the telemetry thread.
#[derive(Debug, Default)]
pub struct AirborneCache {
    bits: AtomicU8,
}

impl AirborneCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a landed-state report.
    ///
    /// `InAir` and `OnGround` set the airborne flag; any other value keeps
    /// the previous one. Every report marks the state as known.
    pub fn apply(&self, landed: LandedState) -> AirborneState {
        let prev = self
            .bits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bits| {
                Some(next_bits(bits, landed))
            })
            .unwrap_or_else(|bits| bits);
        unpack(next_bits(prev, landed))
    }

    pub fn snapshot(&self) -> AirborneState {
        unpack(self.bits.load(Ordering::SeqCst))
    }
}

fn next_bits(bits: u8, landed: LandedState) -> u8 {
    let in_air = match landed {
        LandedState::InAir => IN_AIR,
        LandedState::OnGround => 0,
        _ => bits & IN_AIR,
    };
    KNOWN | in_air
}

fn unpack(bits: u8) -> AirborneState {
    AirborneState {
        state_known: bits & KNOWN != 0,
        in_air: bits & IN_AIR != 0,
    }
}
