//! SSE event model

use std::fmt;

use bytes::Bytes;

use super::encoder::encode;

/// Status payload sent when a producer begins streaming
pub const STATUS_STARTED: &str = "started";

/// Status payload sent after the last token
pub const STATUS_DONE: &str = "done";

/// Event type
///
/// Closed set of the event types this pipeline produces, with an explicit
/// fallback for anything else seen on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Lifecycle marker (`started`, `done`)
    Status,
    /// One unit of generated text
    Token,
    /// Failure description
    Error,
    /// Default type when the frame carries no `event:` line
    Message,
    /// Any other type name
    Other(String),
}

impl EventKind {
    /// Wire name of this event type
    pub fn as_str(&self) -> &str {
        match self {
            Self::Status => "status",
            Self::Token => "token",
            Self::Error => "error",
            Self::Message => "message",
            Self::Other(name) => name,
        }
    }

    /// Map a wire name to an event type; empty names default to `message`
    pub fn from_name(name: &str) -> Self {
        match name {
            "status" => Self::Status,
            "token" => Self::Token,
            "error" => Self::Error,
            "message" | "" => Self::Message,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SSE event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub data: String,
}

impl Event {
    pub fn new(kind: EventKind, data: impl Into<String>) -> Self {
        Self {
            kind,
            data: data.into(),
        }
    }

    pub fn status(data: impl Into<String>) -> Self {
        Self::new(EventKind::Status, data)
    }

    pub fn token(data: impl Into<String>) -> Self {
        Self::new(EventKind::Token, data)
    }

    pub fn error(data: impl Into<String>) -> Self {
        Self::new(EventKind::Error, data)
    }

    /// Serialize to an on-wire frame
    pub fn to_frame(&self) -> Bytes {
        encode(Some(self.kind.as_str()), &self.data)
    }
}
