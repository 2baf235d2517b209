//! [`ActionRequester`] – asks the decision service what to do next.
//!
//! Every recoverable failure of an exchange (timeout, undecodable reply) is
//! folded into [`Decision::NoAction`] so the control loop carries on with its
//! capture step.  Only fatal transport errors reach the caller as `Err`.

use std::time::Duration;

use fieldbot_types::{ActionId, FieldError, RequestMessage, ResponseMessage, TimeoutKind};
use tracing::{debug, info, warn};

use crate::transport::TransportSession;

/// Why a cycle ended up without an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoActionReason {
    /// The reply had no `"action"` field, a `null` one, or an empty one.
    Omitted,
    /// No reply arrived before the deadline.
    Timeout(TimeoutKind),
    /// The reply was not a JSON object of the expected shape.
    Undecodable,
}

/// Outcome of one [`ActionRequester::request_action`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Act(ActionId),
    NoAction(NoActionReason),
}

/// Sends [`RequestMessage`]s over a [`TransportSession`] and extracts the
/// action from each reply.
pub struct ActionRequester<T: TransportSession> {
    transport: T,
    reply_timeout: Duration,
}

impl<T: TransportSession> ActionRequester<T> {
    pub fn new(transport: T, reply_timeout: Duration) -> Self {
        Self {
            transport,
            reply_timeout,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn reply_timeout(&self) -> Duration {
        self.reply_timeout
    }

    /// Ask for the next action given the last acknowledged one.
    ///
    /// # Errors
    ///
    /// Only fatal errors are returned (see [`FieldError::is_fatal`]);
    /// everything else becomes [`Decision::NoAction`].
    pub async fn request_action(
        &mut self,
        last_action: Option<&ActionId>,
    ) -> Result<Decision, FieldError> {
        let request = serde_json::to_string(&RequestMessage::new(last_action))
            .map_err(|e| FieldError::FatalTransport(format!("request encoding failed: {e}")))?;
        info!(
            endpoint = self.transport.endpoint(),
            last_action = last_action.map(ActionId::as_str),
            "requesting action"
        );

        let reply = match self.transport.exchange(&request, self.reply_timeout).await {
            Ok(reply) => reply,
            Err(FieldError::TransportTimeout { kind, waited_ms }) => {
                warn!(waited_ms, "{kind} waiting for decision service");
                return Ok(Decision::NoAction(NoActionReason::Timeout(kind)));
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "decision-service exchange failed");
                return Ok(Decision::NoAction(NoActionReason::Undecodable));
            }
        };
        debug!(reply = %reply, "decision-service reply");

        let response: ResponseMessage = match serde_json::from_str(&reply) {
            Ok(response) => response,
            Err(e) => {
                let err = FieldError::ResponseDecode(e.to_string());
                warn!(error = %err, "ignoring reply");
                return Ok(Decision::NoAction(NoActionReason::Undecodable));
            }
        };

        match response.action {
            Some(action) if !action.as_str().is_empty() => {
                info!(action = %action, "received action");
                Ok(Decision::Act(action))
            }
            _ => {
                info!("no action available");
                Ok(Decision::NoAction(NoActionReason::Omitted))
            }
        }
    }
}
