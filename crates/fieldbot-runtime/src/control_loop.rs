//! [`ControlLoop`] – the request → execute → capture cycle.
//!
//! Each [`tick`][ControlLoop::tick] runs one cycle to completion:
//!
//! 1. **Requesting** – ask the decision service for an action, passing the
//!    last acknowledged one.
//! 2. **Executing** – if an action came back, send its command to the
//!    controller and wait for the status line.  Recoverable failures are
//!    logged and the cycle carries on.
//! 3. **Capturing** – drain stale frames and grab a current one.  This runs
//!    whether or not an action was executed.
//!
//! Fatal errors (broken transport, broken controller link, camera failure)
//! move the loop to [`LoopPhase::Stopped`] and are returned to the caller.
//! A stopped loop refuses to tick again.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::atomic::AtomicBool;
//! use fieldbot_hal::{CaptureDevice, SimCamera, SimController};
//! use fieldbot_runtime::{ActionTable, ControlLoop, LoopConfig, WsSession};
//!
//! # async fn demo() -> Result<(), fieldbot_types::FieldError> {
//! let transport = WsSession::connect("ws://127.0.0.1:1980").await?;
//! let mut control = ControlLoop::new(
//!     Box::new(transport),
//!     Box::new(SimController::new("sim-arduino")),
//!     CaptureDevice::new(Box::new(SimCamera::new("sim-cam"))),
//!     ActionTable::new(),
//!     LoopConfig::default(),
//! );
//! let stop = AtomicBool::new(false);
//! control.run(Some(10), &stop).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use fieldbot_hal::{ActuationChannel, CameraFrame, CaptureDevice};
use fieldbot_types::{ActionId, FieldError, Status};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::executor::{ActionTable, CommandExecutor, RetryPolicy};
use crate::requester::{ActionRequester, Decision, NoActionReason};
use crate::transport::TransportSession;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration and state
// ─────────────────────────────────────────────────────────────────────────────

/// Per-cycle tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Deadline for each decision-service reply.
    pub reply_timeout: Duration,
    /// Buffered frames discarded before the one that is kept.
    pub flush_count: usize,
    pub retry: RetryPolicy,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            reply_timeout: Duration::from_millis(1000),
            flush_count: 30,
            retry: RetryPolicy::default(),
        }
    }
}

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Constructed, no cycle run yet.
    Idle,
    Requesting,
    Executing,
    Capturing,
    /// Terminal.
    Stopped,
}

/// What the decision service is told about the robot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopState {
    last_action: Option<ActionId>,
}

impl LoopState {
    /// The last action the controller acknowledged, if any.
    pub fn last_action(&self) -> Option<&ActionId> {
        self.last_action.as_ref()
    }

    /// Only the executor calls this, after a decoded acknowledgement.
    pub(crate) fn confirm(&mut self, action: ActionId) {
        self.last_action = Some(action);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cycle reports
// ─────────────────────────────────────────────────────────────────────────────

/// What happened to the command step of a cycle.
#[derive(Debug)]
pub enum CommandOutcome {
    NoAction(NoActionReason),
    Acknowledged { action: ActionId, status: Status },
    /// Recoverable failure; the loop state was not advanced.
    Failed { action: ActionId, error: FieldError },
}

/// Result of one completed cycle.  `frame` is the current camera image, for
/// whatever consumes it downstream.
#[derive(Debug)]
pub struct CycleReport {
    /// 1-based cycle number.
    pub cycle: u64,
    pub outcome: CommandOutcome,
    pub frame: CameraFrame,
}

// ─────────────────────────────────────────────────────────────────────────────
// ControlLoop
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the three leaf resources and drives them one cycle at a time.
pub struct ControlLoop {
    requester: ActionRequester<Box<dyn TransportSession>>,
    executor: CommandExecutor<Box<dyn ActuationChannel>>,
    camera: CaptureDevice,
    config: LoopConfig,
    state: LoopState,
    phase: LoopPhase,
    cycles: u64,
    run_id: Uuid,
}

impl ControlLoop {
    pub fn new(
        transport: Box<dyn TransportSession>,
        channel: Box<dyn ActuationChannel>,
        camera: CaptureDevice,
        actions: ActionTable,
        config: LoopConfig,
    ) -> Self {
        Self {
            requester: ActionRequester::new(transport, config.reply_timeout),
            executor: CommandExecutor::new(channel, actions),
            camera,
            config,
            state: LoopState::default(),
            phase: LoopPhase::Idle,
            cycles: 0,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    /// Number of completed cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Run one full cycle.
    ///
    /// # Errors
    ///
    /// Returns the fatal error that stopped the loop, or
    /// [`FieldError::Stopped`] if it was already stopped.
    pub async fn tick(&mut self) -> Result<CycleReport, FieldError> {
        if self.phase == LoopPhase::Stopped {
            return Err(FieldError::Stopped);
        }
        let cycle = self.cycles + 1;
        let span = info_span!("cycle", run_id = %self.run_id, cycle);
        match self.run_cycle(cycle).instrument(span).await {
            Ok(report) => {
                self.cycles = cycle;
                self.phase = LoopPhase::Requesting;
                Ok(report)
            }
            Err(e) => Err(self.stop(e)),
        }
    }

    /// Tick until `max_cycles` cycles have completed, `shutdown` is raised, or
    /// a fatal error stops the loop.  `shutdown` is checked between cycles
    /// only.  Returns the number of completed cycles.
    ///
    /// # Errors
    ///
    /// Returns the fatal error that stopped the loop.
    pub async fn run(
        &mut self,
        max_cycles: Option<u64>,
        shutdown: &AtomicBool,
    ) -> Result<u64, FieldError> {
        let span = info_span!("control_loop", run_id = %self.run_id);
        async {
            info!(?max_cycles, "control loop started");
            loop {
                if shutdown.load(Ordering::SeqCst) {
                    info!(cycles = self.cycles, "shutdown requested");
                    self.phase = LoopPhase::Stopped;
                    break;
                }
                if max_cycles.is_some_and(|max| self.cycles >= max) {
                    info!(cycles = self.cycles, "cycle limit reached");
                    break;
                }
                let report = self.tick().await?;
                debug!(
                    cycle = report.cycle,
                    frame = report.frame.sequence,
                    width = report.frame.width,
                    height = report.frame.height,
                    "cycle complete"
                );
            }
            Ok::<u64, FieldError>(self.cycles)
        }
        .instrument(span)
        .await
    }

    async fn run_cycle(&mut self, cycle: u64) -> Result<CycleReport, FieldError> {
        self.phase = LoopPhase::Requesting;
        let decision = self
            .requester
            .request_action(self.state.last_action())
            .await?;

        let outcome = match decision {
            Decision::NoAction(reason) => CommandOutcome::NoAction(reason),
            Decision::Act(action) => {
                self.phase = LoopPhase::Executing;
                match self
                    .executor
                    .execute(&action, &self.config.retry, &mut self.state)
                    .await
                {
                    Ok(status) => CommandOutcome::Acknowledged { action, status },
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(error) => {
                        warn!(action = %action, error = %error, "command skipped this cycle");
                        CommandOutcome::Failed { action, error }
                    }
                }
            }
        };

        self.phase = LoopPhase::Capturing;
        let frame = self.camera.capture_frame(self.config.flush_count)?;
        Ok(CycleReport {
            cycle,
            outcome,
            frame,
        })
    }

    /// Everything that escapes a cycle is fatal.
    fn stop(&mut self, e: FieldError) -> FieldError {
        error!(error = %e, phase = ?self.phase, cycles = self.cycles, "control loop stopped");
        self.phase = LoopPhase::Stopped;
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requester::tests::MockTransport;
    use fieldbot_hal::{ChannelLog, SimCamera, SimController};
    use fieldbot_types::{CommandSpec, Literal, TimeoutKind};
    use std::sync::atomic::AtomicU64;
    use std::sync::{Arc, Mutex};

    struct Harness {
        control: ControlLoop,
        requests: Arc<Mutex<Vec<String>>>,
        controller: ChannelLog,
        frames: Arc<AtomicU64>,
    }

    fn harness(replies: Vec<Result<String, FieldError>>, ctrl: SimController, cam: SimCamera) -> Harness {
        let transport = MockTransport::new(replies);
        let requests = Arc::clone(&transport.requests);
        let controller = ctrl.log();
        let frames = cam.read_counter();
        let mut actions = ActionTable::new();
        actions.insert(
            "advance".into(),
            CommandSpec::new(Literal::Dict(vec![
                (Literal::Str("left".into()), Literal::Int(100)),
                (Literal::Str("right".into()), Literal::Int(100)),
            ])),
        );
        let config = LoopConfig {
            retry: RetryPolicy {
                retry_delay: Duration::from_millis(1),
                ..RetryPolicy::default()
            },
            ..LoopConfig::default()
        };
        Harness {
            control: ControlLoop::new(
                Box::new(transport),
                Box::new(ctrl),
                CaptureDevice::new(Box::new(cam)),
                actions,
                config,
            ),
            requests,
            controller,
            frames,
        }
    }

    fn sent(h: &Harness) -> Vec<String> {
        h.requests.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn acknowledged_action_feeds_next_request() {
        let mut h = harness(
            vec![Ok(r#"{"action":"advance"}"#.into()), Ok("{}".into())],
            SimController::new("sim").with_not_ready_reads(1),
            SimCamera::new("cam"),
        );
        assert_eq!(h.control.phase(), LoopPhase::Idle);

        let report = h.control.tick().await.unwrap();
        match &report.outcome {
            CommandOutcome::Acknowledged { action, status } => {
                assert_eq!(action.as_str(), "advance");
                assert_eq!(status.get("ok"), Some(&Literal::Bool(true)));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(report.cycle, 1);
        assert_eq!(report.frame.sequence, 31);
        assert_eq!(h.frames.load(Ordering::Relaxed), 31);
        let stats = h.controller.snapshot();
        assert_eq!(stats.writes, vec!["{'left': 100, 'right': 100}".to_string()]);
        assert_eq!(stats.reads, 2);
        assert_eq!(h.control.state().last_action(), Some(&ActionId::from("advance")));

        h.control.tick().await.unwrap();
        assert_eq!(
            sent(&h),
            vec![
                r#"{"type":"request"}"#.to_string(),
                r#"{"type":"request","last_action":"advance"}"#.to_string(),
            ]
        );
        assert_eq!(h.control.cycles(), 2);
    }

    #[tokio::test]
    async fn omitted_action_still_captures() {
        let mut h = harness(
            vec![Ok(r#"{"status":"thinking"}"#.into())],
            SimController::new("sim"),
            SimCamera::new("cam"),
        );
        let report = h.control.tick().await.unwrap();
        assert!(matches!(
            report.outcome,
            CommandOutcome::NoAction(NoActionReason::Omitted)
        ));
        assert_eq!(h.controller.snapshot(), Default::default());
        assert_eq!(h.control.state().last_action(), None);
        assert_eq!(h.frames.load(Ordering::Relaxed), 31);
    }

    #[tokio::test]
    async fn timeout_behaves_like_no_action() {
        let mut h = harness(
            vec![Err(FieldError::TransportTimeout {
                kind: TimeoutKind::NoReadiness,
                waited_ms: 1000,
            })],
            SimController::new("sim"),
            SimCamera::new("cam"),
        );
        let report = h.control.tick().await.unwrap();
        assert!(matches!(
            report.outcome,
            CommandOutcome::NoAction(NoActionReason::Timeout(TimeoutKind::NoReadiness))
        ));
        assert!(h.controller.snapshot().writes.is_empty());
        assert_eq!(h.frames.load(Ordering::Relaxed), 31);
        assert_eq!(h.control.phase(), LoopPhase::Requesting);
    }

    #[tokio::test]
    async fn unknown_action_is_skipped_not_fatal() {
        let mut h = harness(
            vec![Ok(r#"{"action":"jump"}"#.into())],
            SimController::new("sim"),
            SimCamera::new("cam"),
        );
        let report = h.control.tick().await.unwrap();
        assert!(matches!(
            report.outcome,
            CommandOutcome::Failed {
                error: FieldError::UnknownAction(_),
                ..
            }
        ));
        assert_eq!(h.control.state().last_action(), None);
        assert_eq!(h.frames.load(Ordering::Relaxed), 31);
    }

    #[tokio::test]
    async fn capture_failure_stops_the_loop() {
        let mut h = harness(
            vec![Ok("{}".into()), Ok("{}".into())],
            SimController::new("sim"),
            SimCamera::new("cam").failing_from(10),
        );
        let err = h.control.tick().await.unwrap_err();
        assert!(matches!(err, FieldError::Capture { .. }));
        assert_eq!(h.control.phase(), LoopPhase::Stopped);
        assert!(matches!(h.control.tick().await, Err(FieldError::Stopped)));
        // No request was sent after the stop.
        assert_eq!(sent(&h).len(), 1);
    }

    #[tokio::test]
    async fn fatal_channel_stops_the_loop() {
        let mut h = harness(
            vec![Ok(r#"{"action":"advance"}"#.into())],
            SimController::new("sim").disconnected(),
            SimCamera::new("cam"),
        );
        let err = h.control.tick().await.unwrap_err();
        assert!(matches!(err, FieldError::FatalChannel { .. }));
        assert_eq!(h.control.phase(), LoopPhase::Stopped);
        assert_eq!(h.frames.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn run_honours_cycle_limit() {
        let mut h = harness(Vec::new(), SimController::new("sim"), SimCamera::new("cam"));
        let stop = AtomicBool::new(false);
        let cycles = h.control.run(Some(3), &stop).await.unwrap();
        assert_eq!(cycles, 3);
        assert_eq!(sent(&h).len(), 3);
        assert_eq!(h.frames.load(Ordering::Relaxed), 93);
    }

    #[tokio::test]
    async fn run_stops_at_shutdown_flag() {
        let mut h = harness(Vec::new(), SimController::new("sim"), SimCamera::new("cam"));
        let stop = AtomicBool::new(true);
        let cycles = h.control.run(None, &stop).await.unwrap();
        assert_eq!(cycles, 0);
        assert!(sent(&h).is_empty());
        assert_eq!(h.control.phase(), LoopPhase::Stopped);
    }

    #[tokio::test]
    async fn run_returns_fatal_error() {
        let mut h = harness(
            vec![Err(FieldError::FatalTransport("reset".into()))],
            SimController::new("sim"),
            SimCamera::new("cam"),
        );
        let stop = AtomicBool::new(false);
        let err = h.control.run(None, &stop).await.unwrap_err();
        assert!(matches!(err, FieldError::FatalTransport(_)));
        assert_eq!(h.control.cycles(), 0);
    }
}
