//! [`CommandExecutor`] – turns an [`ActionId`] into a controller command and
//! waits for the controller's acknowledgement.
//!
//! One call to [`CommandExecutor::execute`] performs exactly one write and
//! between one and [`RetryPolicy::max_attempts`] reads.  The loop state is
//! only advanced once a status line has been read *and* decoded, so the next
//! request to the decision service always names the last action the robot
//! really performed.

use std::collections::HashMap;
use std::time::Duration;

use fieldbot_hal::ActuationChannel;
use fieldbot_types::{ActionId, CommandSpec, FieldError, Status};
use tracing::{debug, info, warn};

use crate::control_loop::LoopState;

/// Static mapping from action identifiers to controller payloads.
pub type ActionTable = HashMap<ActionId, CommandSpec>;

// ─────────────────────────────────────────────────────────────────────────────
// Retry policy
// ─────────────────────────────────────────────────────────────────────────────

/// How the delay between status reads grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Every retry waits [`RetryPolicy::retry_delay`].
    #[default]
    Fixed,
    /// The delay doubles on every retry, capped at `max_delay`.
    Exponential { max_delay: Duration },
}

/// Bound on the "controller not ready" polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of reads, including the first one.  Must be ≥ 1.
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_millis(500),
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1 = the second read).
    pub fn delay_before(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.retry_delay,
            Backoff::Exponential { max_delay } => {
                let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
                self.retry_delay
                    .checked_mul(factor)
                    .unwrap_or(max_delay)
                    .min(max_delay)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Executor
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the actuation channel and the action table.
pub struct CommandExecutor<C: ActuationChannel> {
    channel: C,
    actions: ActionTable,
}

impl<C: ActuationChannel> CommandExecutor<C> {
    pub fn new(channel: C, actions: ActionTable) -> Self {
        Self { channel, actions }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn command_for(&self, action: &ActionId) -> Option<&CommandSpec> {
        self.actions.get(action)
    }

    /// Send the command bound to `action` and wait for its status line.
    ///
    /// # Errors
    ///
    /// - [`FieldError::UnknownAction`] if `action` is not in the table.
    ///   Nothing is written.
    /// - [`FieldError::Controller`] if the write or a read fails, or every
    ///   read came back empty.
    /// - [`FieldError::StatusParse`] if the status line is not a literal.
    /// - [`FieldError::FatalChannel`] if the channel is gone.
    ///
    /// `state` is left untouched in every error case.
    pub async fn execute(
        &mut self,
        action: &ActionId,
        policy: &RetryPolicy,
        state: &mut LoopState,
    ) -> Result<Status, FieldError> {
        let Some(spec) = self.actions.get(action) else {
            return Err(FieldError::UnknownAction(action.clone()));
        };
        let command = spec.to_wire();
        info!(channel = self.channel.id(), action = %action, command = %command, "sending command");
        self.channel.write_command(&command)?;

        let line = self.await_status_line(policy).await?;
        let status = Status::parse_line(&line)?;
        info!(action = %action, status = %status, "controller acknowledged");
        state.confirm(action.clone());
        Ok(status)
    }

    async fn await_status_line(&mut self, policy: &RetryPolicy) -> Result<String, FieldError> {
        let attempts = policy.max_attempts.max(1);
        for attempt in 1..=attempts {
            let line = self.channel.read_line()?;
            if !line.trim().is_empty() {
                return Ok(line);
            }
            if attempt == attempts {
                break;
            }
            let delay = policy.delay_before(attempt);
            debug!(attempt, ?delay, "controller not ready, retrying");
            tokio::time::sleep(delay).await;
        }
        warn!(channel = self.channel.id(), attempts, "controller never answered");
        Err(FieldError::Controller {
            component: self.channel.id().to_string(),
            details: format!("no status line after {attempts} reads"),
        })
    }
}
