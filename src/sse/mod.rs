//! Server-Sent Events framing
//!
//! Encoder and decoder for the `text/event-stream` wire format shared by
//! every hop of the pipeline.

pub mod decoder;
pub mod encoder;
pub mod event;

pub use decoder::decode_stream;
pub use event::{Event, EventKind, STATUS_DONE, STATUS_STARTED};

/// Media type of an SSE response
pub const CONTENT_TYPE: &str = "text/event-stream";
