//! Event consumer
//!
//! Drives a decoded event stream into an [`EventSink`] and reports how the
//! exchange ended.

use std::fmt;

use futures::{Stream, StreamExt};

use crate::sse::{Event, EventKind, STATUS_DONE};

/// Receiver of decoded events
pub trait EventSink {
    /// One unit of generated text
    fn on_token(&mut self, token: &str);

    /// Lifecycle marker other than the terminal `done`
    fn on_status(&mut self, _status: &str) {}

    /// Failure reported by the producer or the relay
    fn on_error(&mut self, _message: &str) {}

    /// Event of an unhandled type
    fn on_other(&mut self, _event: &Event) {}
}

/// How a consumed stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `status: done` received
    Completed,
    /// `error` event received
    Failed(String),
    /// Stream closed or failed without a terminal event
    Disconnected,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Completed => write!(f, "completed"),
            Outcome::Failed(message) => write!(f, "failed: {}", message),
            Outcome::Disconnected => write!(f, "connection lost before the stream completed"),
        }
    }
}

/// Consume events until a terminal event or the end of the stream
///
/// Stops polling (and drops the stream) as soon as the outcome is known.
pub async fn consume<S, E>(events: S, sink: &mut impl EventSink) -> Outcome
where
    S: Stream<Item = Result<Event, E>>,
    E: fmt::Display,
{
    let mut events = std::pin::pin!(events);

    while let Some(item) = events.next().await {
        let event = match item {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Event stream failed");
                return Outcome::Disconnected;
            }
        };

        match event.kind {
            EventKind::Token => sink.on_token(&event.data),
            EventKind::Status if event.data == STATUS_DONE => return Outcome::Completed,
            EventKind::Status => sink.on_status(&event.data),
            EventKind::Error => {
                sink.on_error(&event.data);
                return Outcome::Failed(event.data);
            }
            EventKind::Message | EventKind::Other(_) => sink.on_other(&event),
        }
    }

    tracing::debug!("Event stream ended without a terminal event");
    Outcome::Disconnected
}
