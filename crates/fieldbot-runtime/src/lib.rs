//! `fieldbot-runtime` – the control loop of the field robot.
//!
//! # Modules
//!
//! - [`transport`] – [`TransportSession`][transport::TransportSession] and
//!   its WebSocket implementation [`WsSession`][transport::WsSession]:
//!   one half-duplex request/reply exchange with the decision service at a
//!   time, with a per-reply deadline and a fresh connection after every
//!   timeout.
//! - [`requester`] – [`ActionRequester`][requester::ActionRequester]:
//!   builds the request from the last acknowledged action and turns the
//!   reply (or its absence) into a [`Decision`][requester::Decision].
//! - [`executor`] – [`CommandExecutor`][executor::CommandExecutor]:
//!   looks the action up in the [`ActionTable`][executor::ActionTable],
//!   writes the command to the controller and polls for the status line
//!   under a [`RetryPolicy`][executor::RetryPolicy].
//! - [`control_loop`] – [`ControlLoop`][control_loop::ControlLoop]:
//!   Requesting → Executing → Capturing, with the fatal/recoverable split
//!   that decides when the loop stops.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   console or JSON logs plus optional OTLP span export.
//!
//! # Keeping the decision service in sync
//!
//! The decision service plans from the `last_action` it is sent, so that
//! field must name what the robot actually did.  It only changes after the
//! controller's acknowledgement has been decoded; a timed-out exchange is
//! never answered late because the transport reconnects; stale controller
//! output is discarded before each command is written.

pub mod control_loop;
pub mod executor;
pub mod requester;
pub mod telemetry;
pub mod transport;

pub use control_loop::{
    CommandOutcome, ControlLoop, CycleReport, LoopConfig, LoopPhase, LoopState,
};
pub use executor::{ActionTable, Backoff, CommandExecutor, RetryPolicy};
pub use requester::{ActionRequester, Decision, NoActionReason};
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use transport::{TransportSession, WsSession};
