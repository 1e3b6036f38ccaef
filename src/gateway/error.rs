//! Relay error type definitions

use std::fmt;
use std::time::Duration;

use http::StatusCode;

use crate::sse::Event;

/// Maximum number of upstream error body bytes quoted in an error event
const MAX_ERROR_BODY_BYTES: usize = 512;

/// Relay error types
#[derive(Debug)]
pub enum RelayError {
    /// Upstream connection could not be established or the request failed to send
    Connect(reqwest::Error),

    /// Upstream connection timed out before a response arrived
    Timeout(reqwest::Error),

    /// Upstream accepted the connection but sent no response headers in time
    NoResponse(Duration),

    /// Upstream answered with a non-success status
    UpstreamStatus { status: StatusCode, body: String },

    /// Upstream connection failed after forwarding began
    MidStream(reqwest::Error),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Connect(e) => write!(f, "upstream unavailable: {}", e),
            RelayError::Timeout(e) => write!(f, "upstream timed out: {}", e),
            RelayError::NoResponse(waited) => {
                write!(f, "upstream timed out: no response after {:?}", waited)
            }
            RelayError::UpstreamStatus { status, body } => {
                if body.is_empty() {
                    write!(f, "upstream returned {}", status)
                } else {
                    write!(f, "upstream returned {}: {}", status, body)
                }
            }
            RelayError::MidStream(e) => write!(f, "upstream stream interrupted: {}", e),
        }
    }
}

impl std::error::Error for RelayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RelayError::Connect(e) | RelayError::Timeout(e) | RelayError::MidStream(e) => Some(e),
            RelayError::NoResponse(_) | RelayError::UpstreamStatus { .. } => None,
        }
    }
}

impl RelayError {
    /// Classify a failure to send the upstream request
    pub fn from_send(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RelayError::Timeout(e)
        } else {
            RelayError::Connect(e)
        }
    }

    /// Build an upstream status error, quoting the start of the body
    pub fn upstream_status(status: StatusCode, body: &[u8]) -> Self {
        let body = &body[..body.len().min(MAX_ERROR_BODY_BYTES)];
        RelayError::UpstreamStatus {
            status,
            body: String::from_utf8_lossy(body).trim().to_string(),
        }
    }

    /// Error event reported downstream
    pub fn to_event(&self) -> Event {
        Event::error(format!("error: {}", self))
    }
}
