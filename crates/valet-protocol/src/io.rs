//! Turn-level input and output types.

use crate::permissions::Permissions;
use serde_json::{Map, Value};

/// One incoming user turn as seen by the engine and by capability modules.
#[derive(Debug, Clone, Default)]
pub struct Input {
    /// The user's message in plain text.
    pub message: String,
    /// Capability mask the front-end granted this turn; intersected with the
    /// bot's own mask before anything runs.
    pub permissions: Permissions,
    /// Opaque platform payload forwarded from the front-end.
    pub data: Option<Value>,
    /// Decoded arguments of the tool call currently being dispatched.
    pub parameters: Map<String, Value>,
}

impl Input {
    /// Build an input with a message and a permission mask.
    pub fn new(message: impl Into<String>, permissions: Permissions) -> Self {
        Self {
            message: message.into(),
            permissions,
            data: None,
            parameters: Map::new(),
        }
    }

    /// Fetch a string parameter from the decoded call arguments.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }

    /// Fetch an integer parameter from the decoded call arguments.
    pub fn param_i64(&self, key: &str) -> Option<i64> {
        self.parameters.get(key).and_then(Value::as_i64)
    }

    /// Fetch a boolean parameter, treating absence as false.
    pub fn param_bool(&self, key: &str) -> bool {
        self.parameters
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Non-textual data attached to an output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A file to hand to the user, e.g. a fetched database export.
    File {
        /// Suggested file name.
        name: String,
        /// Raw file bytes.
        content: Vec<u8>,
    },
}

/// The engine's answer to one turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Output {
    /// User-visible message text.
    pub message: String,
    /// Optional non-textual payload.
    pub payload: Option<Payload>,
    /// A capability-layer error. Carried inside the output rather than
    /// aborting the turn; wizard steps decide themselves how to recover.
    pub error: Option<String>,
}

impl Output {
    /// Build a plain text output.
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            payload: None,
            error: None,
        }
    }

    /// Build an output carrying a payload alongside its text.
    pub fn with_payload(message: impl Into<String>, payload: Payload) -> Self {
        Self {
            message: message.into(),
            payload: Some(payload),
            error: None,
        }
    }

    /// Build an output carrying a capability error.
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            message: String::new(),
            payload: None,
            error: Some(error.into()),
        }
    }

    /// Attach an error to an existing output.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// True when a capability error is attached.
    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }
}
