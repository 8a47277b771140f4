//! Device command channel seam.
//!
//! The channel serializes a request, transmits it, waits for the
//! acknowledgement and applies its own retry/timeout policy. The SDK only
//! sees the final [`CommandOutcome`].

use action_core::{CommandOutcome, CommandRequest};

/// Continuation receiving the outcome of an asynchronously sent command.
pub type OutcomeCallback = Box<dyn FnOnce(CommandOutcome) + Send + 'static>;

/// Transport that delivers command requests to the vehicle.
pub trait DeviceChannel: Send + Sync {
    /// Send and block until an outcome is known.
    fn send_command_blocking(&self, request: &CommandRequest) -> CommandOutcome;

    /// Send without blocking. `on_outcome` must be invoked exactly once,
    /// possibly from another thread.
    fn send_command_async(&self, request: CommandRequest, on_outcome: OutcomeCallback);
}
