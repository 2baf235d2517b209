//! `fieldbot-types` – shared data model for the field-robot control agent.
//!
//! Everything that crosses a crate boundary lives here: the action
//! identifiers exchanged with the decision service, the controller command and
//! status payloads, the decision-service wire messages, and the workspace-wide
//! [`FieldError`] taxonomy.

pub mod literal;

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use literal::{Literal, LiteralError};

// ─────────────────────────────────────────────────────────────────────────────
// Actions and commands
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque identifier of a robot behavior, e.g. `"advance"` or `"stop"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(String);

impl ActionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ActionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for ActionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Controller-specific payload bound to an [`ActionId`] in the action table.
///
/// Its wire form is the literal rendering of the payload, e.g.
/// `{'left': 120, 'right': 120}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandSpec(Literal);

impl CommandSpec {
    pub fn new(payload: Literal) -> Self {
        Self(payload)
    }

    pub fn payload(&self) -> &Literal {
        &self.0
    }

    /// Text written to the actuation channel.  No terminator is appended.
    pub fn to_wire(&self) -> String {
        self.0.to_string()
    }
}

/// Decoded controller acknowledgement.
///
/// The schema belongs to the controller firmware; this crate only guarantees
/// that a record's fields come back in the order the controller sent them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Status(Literal);

impl Status {
    /// Decode one status line (trailing newline allowed).
    ///
    /// # Errors
    ///
    /// Returns [`LiteralError`] if the line is not a single valid literal.
    pub fn parse_line(line: &str) -> Result<Self, LiteralError> {
        Literal::parse(line).map(Self)
    }

    /// Field lookup for record-shaped statuses.
    pub fn get(&self, key: &str) -> Option<&Literal> {
        self.0.get(key)
    }

    /// Record fields in controller order, or `None` if the status is not a
    /// record.
    pub fn fields(&self) -> Option<&[(Literal, Literal)]> {
        match &self.0 {
            Literal::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn literal(&self) -> &Literal {
        &self.0
    }
}

impl FromStr for Status {
    type Err = LiteralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_line(s)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision-service messages
// ─────────────────────────────────────────────────────────────────────────────

/// Message discriminator carried in the `"type"` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Request,
}

/// `{"type":"request","last_action":"..."}`, sent once per cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Omitted on the wire until the first command has been acknowledged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action: Option<ActionId>,
}

impl RequestMessage {
    pub fn new(last_action: Option<&ActionId>) -> Self {
        Self {
            kind: MessageKind::Request,
            last_action: last_action.cloned(),
        }
    }
}

/// Decision-service reply.  A missing or `null` `"action"` means "nothing to
/// do this cycle"; any other fields are kept but not interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub action: Option<ActionId>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Which way a decision-service reply failed to show up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeoutKind {
    /// The channel signalled activity but no reply payload arrived.
    ReadyWithoutData,
    /// Nothing at all arrived before the deadline.
    NoReadiness,
}

impl fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutKind::ReadyWithoutData => f.write_str("poll timeout"),
            TimeoutKind::NoReadiness => f.write_str("socket timeout"),
        }
    }
}

/// Workspace-wide error type.
///
/// Variants are split by recovery policy: everything attributable to a single
/// cycle's exchange is recoverable, anything saying a channel or device is
/// broken is fatal.  See [`FieldError::is_fatal`].
#[derive(Error, Debug)]
pub enum FieldError {
    #[error("Transport timeout after {waited_ms} ms ({kind})")]
    TransportTimeout { kind: TimeoutKind, waited_ms: u64 },

    #[error("Response decode error: {0}")]
    ResponseDecode(String),

    #[error("Unknown action: {0}")]
    UnknownAction(ActionId),

    #[error("Controller error on {component}: {details}")]
    Controller { component: String, details: String },

    #[error("Status parse error: {0}")]
    StatusParse(#[from] LiteralError),

    #[error("Capture error on {component}: {details}")]
    Capture { component: String, details: String },

    #[error("Fatal transport error: {0}")]
    FatalTransport(String),

    #[error("Fatal channel error on {component}: {details}")]
    FatalChannel { component: String, details: String },

    #[error("Initialisation failed for {component}: {details}")]
    Init { component: String, details: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Control loop is stopped")]
    Stopped,
}

impl FieldError {
    /// `true` when the error means the loop cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FieldError::Capture { .. }
                | FieldError::FatalTransport(_)
                | FieldError::FatalChannel { .. }
                | FieldError::Init { .. }
                | FieldError::Config(_)
                | FieldError::Stopped
        )
    }
}
