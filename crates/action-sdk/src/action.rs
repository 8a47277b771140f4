//! High-level vehicle actions on top of the device command channel.

use std::sync::{Arc, Mutex, MutexGuard};

use action_core::{gate, normalize, ActionKind, ActionResult, AirborneCache, AirborneState};
use tokio::sync::oneshot;

use crate::channel::DeviceChannel;
use crate::telemetry::{
    process_extended_sys_state, HandlerOwner, MessageHandler, MessageKind, MessageRouter,
    VehicleMessage,
};

/// Dispatcher for arm, disarm, kill, takeoff, land and return-to-launch.
///
/// Arm and disarm are refused locally with [`ActionResult::CommandDenied`]
/// until the vehicle has reported it is on the ground. Everything else is
/// passed straight to the device channel.
pub struct Action {
    channel: Arc<dyn DeviceChannel>,
    router: Arc<dyn MessageRouter>,
    cache: Arc<AirborneCache>,
    owner: HandlerOwner,
    // Held across router calls so init/deinit never interleave.
    registered: Mutex<bool>,
}

impl Action {
    /// Create a new dispatcher. Call [`Action::init`] to start tracking
    /// the vehicle's landed state.
    pub fn new(channel: Arc<dyn DeviceChannel>, router: Arc<dyn MessageRouter>) -> Self {
        Self {
            channel,
            router,
            cache: Arc::new(AirborneCache::new()),
            owner: HandlerOwner::unique(),
            registered: Mutex::new(false),
        }
    }

    /// Subscribe to EXTENDED_SYS_STATE. Calling it twice is a no-op.
    pub fn init(&self) {
        let mut registered = self.registered();
        if *registered {
            return;
        }

        let cache = self.cache.clone();
        let handler: MessageHandler = Arc::new(move |message: &VehicleMessage| {
            if let VehicleMessage::ExtendedSysState(state) = message {
                process_extended_sys_state(&cache, state);
            }
        });
        self.router
            .register_handler(MessageKind::ExtendedSysState, handler, self.owner);
        *registered = true;
        tracing::debug!("Registered landed state handler ({:?})", self.owner);
    }

    /// Drop every handler registered by [`Action::init`].
    pub fn deinit(&self) {
        let mut registered = self.registered();
        if *registered {
            self.router.unregister_all_handlers(self.owner);
            *registered = false;
            tracing::debug!("Unregistered handlers ({:?})", self.owner);
        }
    }

    fn registered(&self) -> MutexGuard<'_, bool> {
        self.registered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Latest cached airborne state.
    pub fn airborne_state(&self) -> AirborneState {
        self.cache.snapshot()
    }

    // ========== BLOCKING ==========

    pub fn arm(&self) -> ActionResult {
        self.perform(ActionKind::Arm)
    }

    pub fn disarm(&self) -> ActionResult {
        self.perform(ActionKind::Disarm)
    }

    /// Stop the motors without consulting the landed-state gate.
    pub fn kill(&self) -> ActionResult {
        self.perform(ActionKind::Kill)
    }

    pub fn takeoff(&self) -> ActionResult {
        self.perform(ActionKind::Takeoff)
    }

    pub fn land(&self) -> ActionResult {
        self.perform(ActionKind::Land)
    }

    pub fn return_to_launch(&self) -> ActionResult {
        self.perform(ActionKind::ReturnToLaunch)
    }

    /// Run `kind` and block for as long as the device channel blocks.
    pub fn perform(&self, kind: ActionKind) -> ActionResult {
        if gate::check(kind, &self.cache.snapshot()).is_err() {
            return ActionResult::CommandDenied;
        }

        let request = kind.request();
        tracing::info!("Sending {} ({:?})", kind, request.command);
        let result = normalize(self.channel.send_command_blocking(&request));
        log_result(kind, result);
        result
    }

    // ========== ASYNC ==========

    pub fn arm_async(&self, callback: impl FnOnce(ActionResult) + Send + 'static) {
        self.perform_async(ActionKind::Arm, callback)
    }

    pub fn disarm_async(&self, callback: impl FnOnce(ActionResult) + Send + 'static) {
        self.perform_async(ActionKind::Disarm, callback)
    }

    pub fn kill_async(&self, callback: impl FnOnce(ActionResult) + Send + 'static) {
        self.perform_async(ActionKind::Kill, callback)
    }

    pub fn takeoff_async(&self, callback: impl FnOnce(ActionResult) + Send + 'static) {
        self.perform_async(ActionKind::Takeoff, callback)
    }

    pub fn land_async(&self, callback: impl FnOnce(ActionResult) + Send + 'static) {
        self.perform_async(ActionKind::Land, callback)
    }

    pub fn return_to_launch_async(&self, callback: impl FnOnce(ActionResult) + Send + 'static) {
        self.perform_async(ActionKind::ReturnToLaunch, callback)
    }

    /// Run `kind` without blocking.
    ///
    /// `callback` is invoked exactly once: inline when the gate refuses the
    /// action, otherwise from the device channel's completion path.
    pub fn perform_async<F>(&self, kind: ActionKind, callback: F)
    where
        F: FnOnce(ActionResult) + Send + 'static,
    {
        if gate::check(kind, &self.cache.snapshot()).is_err() {
            callback(ActionResult::CommandDenied);
            return;
        }

        let request = kind.request();
        tracing::info!("Sending {} async ({:?})", kind, request.command);
        self.channel.send_command_async(
            request,
            Box::new(move |outcome| {
                let result = normalize(outcome);
                log_result(kind, result);
                callback(result);
            }),
        );
    }

    /// Await the result of `kind` from async code.
    ///
    /// Resolves to [`ActionResult::Unknown`] if the channel drops the
    /// completion without calling it.
    pub async fn perform_await(&self, kind: ActionKind) -> ActionResult {
        let (tx, rx) = oneshot::channel();
        self.perform_async(kind, move |result| {
            let _ = tx.send(result);
        });
        rx.await.unwrap_or(ActionResult::Unknown)
    }
}

impl Drop for Action {
    fn drop(&mut self) {
        self.deinit();
    }
}

fn log_result(kind: ActionKind, result: ActionResult) {
    if result.is_success() {
        tracing::debug!("{} succeeded", kind);
    } else {
        tracing::warn!("{} failed: {}", kind, result);
    }
}
