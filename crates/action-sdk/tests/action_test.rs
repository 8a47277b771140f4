//! Dispatcher tests against a recording device channel and an in-memory router.
//!
//! Run with: cargo test -p action-sdk --test action_test

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use action_core::mav;
use action_core::LandedState;
use action_sdk::{
    Action, ActionKind, ActionResult, CommandOutcome, CommandRequest, DeviceChannel,
    ExtendedSysState, HandlerOwner, MessageHandler, MessageKind, MessageRouter, OutcomeCallback,
    VehicleMessage,
};

#[derive(Clone, Copy)]
enum Completion {
    /// Invoke the continuation before returning.
    Inline,
    /// Invoke the continuation from a fresh thread.
    Thread,
    /// Drop the continuation (broken channel).
    Drop,
}

struct StubChannel {
    outcome: Mutex<CommandOutcome>,
    completion: Completion,
    sent: Mutex<Vec<CommandRequest>>,
}

impl StubChannel {
    fn new(outcome: CommandOutcome, completion: Completion) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(outcome),
            completion,
            sent: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    fn last(&self) -> CommandRequest {
        *self.sent.lock().unwrap().last().expect("no request sent")
    }
}

impl DeviceChannel for StubChannel {
    fn send_command_blocking(&self, request: &CommandRequest) -> CommandOutcome {
        self.sent.lock().unwrap().push(*request);
        *self.outcome.lock().unwrap()
    }

    fn send_command_async(&self, request: CommandRequest, on_outcome: OutcomeCallback) {
        self.sent.lock().unwrap().push(request);
        let outcome = *self.outcome.lock().unwrap();
        match self.completion {
            Completion::Inline => on_outcome(outcome),
            Completion::Thread => {
                std::thread::spawn(move || on_outcome(outcome));
            }
            Completion::Drop => drop(on_outcome),
        }
    }
}

#[derive(Default)]
struct StubRouter {
    handlers: Mutex<Vec<(MessageKind, MessageHandler, HandlerOwner)>>,
}

impl StubRouter {
    fn publish(&self, message: VehicleMessage) {
        let handlers: Vec<MessageHandler> = self
            .handlers
            .lock()
            .unwrap()
            .iter()
            .filter(|(kind, _, _)| *kind == message.kind())
            .map(|(_, handler, _)| handler.clone())
            .collect();
        for handler in handlers {
            handler(&message);
        }
    }

    fn landed(&self, landed: LandedState) {
        self.publish(VehicleMessage::ExtendedSysState(ExtendedSysState::new(landed)));
    }

    fn count(&self) -> usize {
        self.handlers.lock().unwrap().len()
    }
}

impl MessageRouter for StubRouter {
    fn register_handler(&self, kind: MessageKind, handler: MessageHandler, owner: HandlerOwner) {
        self.handlers.lock().unwrap().push((kind, handler, owner));
    }

    fn unregister_all_handlers(&self, owner: HandlerOwner) {
        self.handlers.lock().unwrap().retain(|(_, _, o)| *o != owner);
    }
}

fn setup(outcome: CommandOutcome, completion: Completion) -> (Action, Arc<StubChannel>, Arc<StubRouter>) {
    let channel = StubChannel::new(outcome, completion);
    let router = Arc::new(StubRouter::default());
    let action = Action::new(channel.clone(), router.clone());
    action.init();
    (action, channel, router)
}

fn counting_callback() -> (Arc<AtomicUsize>, Arc<Mutex<Vec<ActionResult>>>, impl FnOnce(ActionResult) + Send + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let results = Arc::new(Mutex::new(Vec::new()));
    let (c, r) = (count.clone(), results.clone());
    let callback = move |result| {
        c.fetch_add(1, Ordering::SeqCst);
        r.lock().unwrap().push(result);
    };
    (count, results, callback)
}

// ========== GATING ==========

#[test]
fn test_arm_denied_until_state_known() {
    let (action, channel, router) = setup(CommandOutcome::Success, Completion::Inline);

    assert_eq!(action.arm(), ActionResult::CommandDenied);
    assert_eq!(action.disarm(), ActionResult::CommandDenied);
    assert_eq!(channel.calls(), 0);

    router.landed(LandedState::OnGround);
    assert_eq!(action.arm(), ActionResult::Success);
    assert_eq!(channel.calls(), 1);
    assert_eq!(channel.last().command, mav::MavCmd::MAV_CMD_COMPONENT_ARM_DISARM);
    assert_eq!(channel.last().params[0], 1.0);

    assert_eq!(action.disarm(), ActionResult::Success);
    assert_eq!(channel.last().params[0], 0.0);
}

#[test]
fn test_arm_while_airborne_never_reaches_channel() {
    let (action, channel, router) = setup(CommandOutcome::Success, Completion::Inline);
    router.landed(LandedState::InAir);

    assert_eq!(action.arm(), ActionResult::CommandDenied);
    assert_eq!(action.disarm(), ActionResult::CommandDenied);
    assert_eq!(channel.calls(), 0);
}

#[test]
fn test_unrecognized_landed_state_keeps_airborne() {
    let (action, channel, router) = setup(CommandOutcome::Success, Completion::Inline);
    router.landed(LandedState::InAir);
    router.landed(LandedState::Landing);
    router.landed(LandedState::Other(42));

    let state = action.airborne_state();
    assert!(state.state_known);
    assert!(state.in_air);
    assert_eq!(action.arm(), ActionResult::CommandDenied);
    assert_eq!(channel.calls(), 0);

    router.landed(LandedState::OnGround);
    assert_eq!(action.arm(), ActionResult::Success);
}

#[test]
fn test_unrecognized_first_report_allows_arming() {
    let (action, _channel, router) = setup(CommandOutcome::Success, Completion::Inline);
    router.landed(LandedState::Undefined);

    assert!(action.airborne_state().state_known);
    assert!(!action.airborne_state().in_air);
    assert_eq!(action.arm(), ActionResult::Success);
}

#[test]
fn test_kill_ignores_gate() {
    let (action, channel, router) = setup(CommandOutcome::Success, Completion::Inline);
    router.landed(LandedState::InAir);

    assert_eq!(action.kill(), ActionResult::Success);
    assert_eq!(channel.calls(), 1);
    assert_eq!(channel.last().command, mav::MavCmd::MAV_CMD_COMPONENT_ARM_DISARM);
    assert_eq!(channel.last().params[0], 0.0);
}

#[test]
fn test_ungated_actions_dispatch_with_unknown_state() {
    let (action, channel, _router) = setup(CommandOutcome::Success, Completion::Inline);

    assert_eq!(action.takeoff(), ActionResult::Success);
    assert_eq!(channel.last().command, mav::MavCmd::MAV_CMD_NAV_TAKEOFF);
    assert_eq!(action.land(), ActionResult::Success);
    assert_eq!(channel.last().command, mav::MavCmd::MAV_CMD_NAV_LAND);
    assert!(channel.last().params.iter().all(|p| p.is_nan()));

    assert_eq!(action.return_to_launch(), ActionResult::Success);
    let rtl = channel.last();
    assert_eq!(rtl.command, mav::MavCmd::MAV_CMD_DO_SET_MODE);
    assert_eq!(rtl.params[0], f32::from(mav::RTL_BASE_MODE));
    assert_eq!(rtl.params[1], f32::from(mav::PX4_CUSTOM_MAIN_MODE_AUTO));
    assert_eq!(rtl.params[2], f32::from(mav::PX4_CUSTOM_SUB_MODE_AUTO_RTL));
    assert!(rtl.params[3..].iter().all(|p| p.is_nan()));

    assert_eq!(action.kill(), ActionResult::Success);
    assert_eq!(channel.calls(), 4);
}

// ========== RESULT MAPPING ==========

#[test]
fn test_channel_outcomes_are_normalized() {
    let cases = [
        (CommandOutcome::Timeout, ActionResult::Timeout),
        (CommandOutcome::Busy, ActionResult::Busy),
        (CommandOutcome::NoDevice, ActionResult::NoDevice),
        (CommandOutcome::ConnectionError, ActionResult::ConnectionError),
        (CommandOutcome::CommandDenied, ActionResult::CommandDenied),
        (CommandOutcome::Unsupported, ActionResult::Unknown),
        (CommandOutcome::InProgress, ActionResult::Unknown),
    ];
    for (outcome, expected) in cases {
        let (action, _channel, _router) = setup(outcome, Completion::Inline);
        assert_eq!(action.takeoff(), expected, "{:?}", outcome);
    }
}

// ========== ASYNC ==========

#[test]
fn test_async_denial_calls_back_once_inline() {
    let (action, channel, router) = setup(CommandOutcome::Success, Completion::Inline);
    router.landed(LandedState::InAir);

    let (count, results, callback) = counting_callback();
    action.arm_async(callback);

    // Invoked synchronously, before arm_async returned.
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(results.lock().unwrap().as_slice(), &[ActionResult::CommandDenied]);
    assert_eq!(channel.calls(), 0);

    let (count, _, callback) = counting_callback();
    action.disarm_async(callback);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_async_completion_from_other_thread() {
    let (action, channel, router) = setup(CommandOutcome::Timeout, Completion::Thread);
    router.landed(LandedState::OnGround);

    let caller = std::thread::current().id();
    let (tx, rx) = mpsc::channel();
    action.arm_async(move |result| {
        tx.send((result, std::thread::current().id())).unwrap();
    });

    let (result, thread) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(result, ActionResult::Timeout);
    assert_ne!(thread, caller);
    assert_eq!(channel.calls(), 1);
    // The sender was consumed by the single invocation.
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn test_every_async_action_calls_back_exactly_once() {
    let (action, channel, router) = setup(CommandOutcome::Success, Completion::Inline);
    router.landed(LandedState::OnGround);

    let total = Arc::new(AtomicUsize::new(0));
    let register = |total: &Arc<AtomicUsize>| {
        let total = total.clone();
        move |result: ActionResult| {
            assert_eq!(result, ActionResult::Success);
            total.fetch_add(1, Ordering::SeqCst);
        }
    };
    action.arm_async(register(&total));
    action.takeoff_async(register(&total));
    action.land_async(register(&total));
    action.return_to_launch_async(register(&total));
    action.disarm_async(register(&total));
    action.kill_async(register(&total));

    assert_eq!(total.load(Ordering::SeqCst), 6);
    assert_eq!(channel.calls(), 6);
}

#[tokio::test]
async fn test_perform_await() {
    let (action, _channel, router) = setup(CommandOutcome::Success, Completion::Thread);
    assert_eq!(action.perform_await(ActionKind::Arm).await, ActionResult::CommandDenied);

    router.landed(LandedState::OnGround);
    assert_eq!(action.perform_await(ActionKind::Arm).await, ActionResult::Success);
}

#[tokio::test]
async fn test_perform_await_with_dropped_completion() {
    let (action, channel, _router) = setup(CommandOutcome::Success, Completion::Drop);
    assert_eq!(action.perform_await(ActionKind::Land).await, ActionResult::Unknown);
    assert_eq!(channel.calls(), 1);
}

// ========== LIFECYCLE ==========

#[test]
fn test_init_is_idempotent_and_deinit_unregisters() {
    let (action, _channel, router) = setup(CommandOutcome::Success, Completion::Inline);
    action.init();
    assert_eq!(router.count(), 1);

    action.deinit();
    assert_eq!(router.count(), 0);

    // Reports after deinit are no longer observed.
    router.landed(LandedState::OnGround);
    assert!(!action.airborne_state().state_known);
    assert_eq!(action.arm(), ActionResult::CommandDenied);
}

#[test]
fn test_drop_unregisters_only_own_handlers() {
    let channel = StubChannel::new(CommandOutcome::Success, Completion::Inline);
    let router = Arc::new(StubRouter::default());
    let first = Action::new(channel.clone(), router.clone());
    let second = Action::new(channel.clone(), router.clone());
    first.init();
    second.init();
    assert_eq!(router.count(), 2);

    drop(first);
    assert_eq!(router.count(), 1);

    router.landed(LandedState::OnGround);
    assert_eq!(second.arm(), ActionResult::Success);
}

#[test]
fn test_concurrent_init_deinit_leaves_no_stale_handler() {
    let channel = StubChannel::new(CommandOutcome::Success, Completion::Inline);
    let router = Arc::new(StubRouter::default());
    let action = Action::new(channel, router.clone());

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let (action, router) = (&action, &router);
            scope.spawn(move || {
                for i in 0..500 {
                    if (i + worker) % 2 == 0 {
                        action.init();
                    } else {
                        action.deinit();
                    }
                    assert!(router.count() <= 1);
                }
            });
        }
    });

    action.deinit();
    assert_eq!(router.count(), 0);
    action.init();
    assert_eq!(router.count(), 1);
}

#[test]
fn test_heartbeat_does_not_touch_state() {
    let (action, _channel, router) = setup(CommandOutcome::Success, Completion::Inline);
    router.publish(VehicleMessage::Heartbeat(action_sdk::Heartbeat {
        base_mode: 0,
        custom_mode: 0,
        system_status: 3,
    }));
    assert!(!action.airborne_state().state_known);
}
