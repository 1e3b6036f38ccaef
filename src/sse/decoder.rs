//! SSE streaming decoder
//!
//! Reconstructs events from a byte stream that may be split at any offset.
//!
//! ```text
//!   feed(chunk) ──> [partial line buffer] ──> complete lines
//!                                               │
//!        event: X  → pending type = trim(X)     │
//!        data: X   → push trim_start(X)  <──────┘
//!        (blank)   → dispatch if data pending, then reset
//!        other     → ignored
//! ```
//!
//! Only `\n`-terminated lines are interpreted, so the decoded event sequence
//! does not depend on how the input was chunked. A frame still accumulating
//! when the input ends is discarded.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, BytesMut};
use futures::{Stream, ready};

use super::event::{Event, EventKind};

/// Default initial buffer capacity
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

/// Streaming SSE decoder
///
/// One instance per stream. Feed raw chunks, then drain dispatched events.
///
/// ```rust,ignore
/// let mut decoder = SseDecoder::new();
/// decoder.feed(b"event: token\nda");
/// assert!(decoder.decode().is_none());
/// decoder.feed(b"ta: hi\n\n");
/// assert_eq!(decoder.decode(), Some(Event::token("hi")));
/// ```
#[derive(Debug)]
pub struct SseDecoder {
    /// Bytes not yet consumed as complete lines
    buffer: BytesMut,
    /// Prefix of `buffer` already scanned without finding `\n`
    scanned: usize,
    /// Type from the last `event:` line of the current frame
    pending_event_type: Option<String>,
    /// `data:` lines of the current frame, in order
    pending_data_lines: Vec<String>,
    /// Number of events dispatched
    events_decoded: usize,
    /// Number of unrecognized lines skipped
    lines_ignored: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SseDecoder {
    /// Create new decoder
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }

    /// Create decoder with specified buffer size
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            scanned: 0,
            pending_event_type: None,
            pending_data_lines: Vec::new(),
            events_decoded: 0,
            lines_ignored: 0,
        }
    }

    /// Feed a chunk of raw bytes
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Try to decode the next event
    ///
    /// Consumes complete lines until one dispatches an event.
    /// Returns `None` when more input is needed.
    pub fn decode(&mut self) -> Option<Event> {
        while let Some(line) = self.next_line() {
            if let Some(event) = self.process_line(&line) {
                self.events_decoded += 1;
                return Some(event);
            }
        }
        None
    }

    /// Create decode iterator over the currently buffered input
    #[cfg(test)]
    pub fn decode_iter(&mut self) -> DecodeIter<'_> {
        DecodeIter { decoder: self }
    }

    /// Signal end of input
    ///
    /// Anything not terminated by a blank line is dropped.
    pub fn finish(&mut self) {
        if self.has_pending() {
            tracing::debug!(
                buffered_bytes = self.buffer_len(),
                data_lines = self.pending_data_lines.len(),
                "Stream ended mid-frame, discarding undispatched data"
            );
        }
        self.buffer.clear();
        self.scanned = 0;
        self.reset_frame();
    }

    /// Whether a partial line or an undispatched frame is buffered
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
            || self.pending_event_type.is_some()
            || !self.pending_data_lines.is_empty()
    }

    /// Get number of dispatched events
    pub fn events_decoded(&self) -> usize {
        self.events_decoded
    }

    /// Get number of ignored lines
    pub fn lines_ignored(&self) -> usize {
        self.lines_ignored
    }

    /// Get number of pending bytes in buffer
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Split off the next `\n`-terminated line, without the terminator
    fn next_line(&mut self) -> Option<String> {
        let pos = match self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
            Some(offset) => self.scanned + offset,
            None => {
                self.scanned = self.buffer.len();
                return None;
            }
        };

        let mut line = self.buffer.split_to(pos);
        self.buffer.advance(1);
        self.scanned = 0;

        // Tolerate CRLF line endings
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }

        Some(String::from_utf8_lossy(&line).into_owned())
    }

    fn process_line(&mut self, line: &str) -> Option<Event> {
        if line.is_empty() {
            return self.dispatch();
        }

        if let Some(rest) = line.strip_prefix("event:") {
            self.pending_event_type = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            self.pending_data_lines.push(rest.trim_start().to_string());
        } else {
            self.lines_ignored += 1;
            tracing::trace!(line = %line, "Ignoring unrecognized SSE line");
        }

        None
    }

    fn dispatch(&mut self) -> Option<Event> {
        let event = if self.pending_data_lines.is_empty() {
            None
        } else {
            let kind = self
                .pending_event_type
                .as_deref()
                .map(EventKind::from_name)
                .unwrap_or(EventKind::Message);
            Some(Event::new(kind, self.pending_data_lines.join("\n")))
        };

        self.reset_frame();
        event
    }

    fn reset_frame(&mut self) {
        self.pending_event_type = None;
        self.pending_data_lines.clear();
    }
}

/// Decode iterator
#[cfg(test)]
pub struct DecodeIter<'a> {
    decoder: &'a mut SseDecoder,
}

#[cfg(test)]
impl<'a> Iterator for DecodeIter<'a> {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.decode()
    }
}

/// Error surfaced by [`EventStream`] when the underlying transport fails
#[derive(Debug)]
pub struct DecodeError<E>(pub E);

impl<E: std::fmt::Display> std::fmt::Display for DecodeError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SSE transport error: {}", self.0)
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for DecodeError<E> {}

/// Lazy event sequence over a byte stream
///
/// Single-pass. Ends when the underlying stream ends or fails; dropping it
/// drops the underlying stream.
pub struct EventStream<S> {
    inner: Option<S>,
    decoder: SseDecoder,
}

/// Decode a stream of byte chunks into events
pub fn decode_stream<S, B, E>(stream: S) -> EventStream<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    EventStream {
        inner: Some(stream),
        decoder: SseDecoder::new(),
    }
}

impl<S, B, E> Stream for EventStream<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    type Item = Result<Event, DecodeError<E>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if let Some(event) = this.decoder.decode() {
                return Poll::Ready(Some(Ok(event)));
            }

            let Some(inner) = this.inner.as_mut() else {
                return Poll::Ready(None);
            };

            match ready!(Pin::new(inner).poll_next(cx)) {
                Some(Ok(chunk)) => this.decoder.feed(chunk.as_ref()),
                Some(Err(e)) => {
                    this.inner = None;
                    this.decoder.finish();
                    return Poll::Ready(Some(Err(DecodeError(e))));
                }
                None => {
                    this.inner = None;
                    this.decoder.finish();
                    tracing::debug!(
                        events = this.decoder.events_decoded(),
                        lines_ignored = this.decoder.lines_ignored(),
                        "SSE stream ended"
                    );
                    return Poll::Ready(None);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sse::encoder::encode;
    use bytes::Bytes;
    use futures::{StreamExt, stream};

    /// Decode a complete in-memory buffer
    fn decode_all(input: &[u8]) -> Vec<Event> {
        let mut decoder = SseDecoder::new();
        decoder.feed(input);
        let events = decoder.decode_iter().collect();
        decoder.finish();
        events
    }

    fn decode_chunks(chunks: &[&[u8]]) -> Vec<Event> {
        let mut decoder = SseDecoder::new();
        let mut events = Vec::new();
        for chunk in chunks {
            decoder.feed(chunk);
            events.extend(decoder.decode_iter());
        }
        decoder.finish();
        events
    }

    #[test]
    fn test_decode_single_frame() {
        let events = decode_all(b"event: token\ndata: hi\n\n");
        assert_eq!(events, vec![Event::token("hi")]);
    }

    #[test]
    fn test_decode_default_type_is_message() {
        let events = decode_all(b"data: hello\n\n");
        assert_eq!(events, vec![Event::new(EventKind::Message, "hello")]);
    }

    #[test]
    fn test_decode_multi_line_payload() {
        let events = decode_all(&encode(Some("token"), "a\nb"));
        assert_eq!(events, vec![Event::token("a\nb")]);
    }

    #[test]
    fn test_decode_round_trip() {
        let cases = [
            (Some("status"), "started", Event::status("started")),
            (Some("token"), "", Event::token("")),
            (Some("error"), "line1\nline2\n", Event::error("line1\nline2\n")),
            (None, "plain", Event::new(EventKind::Message, "plain")),
            (
                Some("ping"),
                "x",
                Event::new(EventKind::Other("ping".to_string()), "x"),
            ),
        ];
        for (event_type, data, expected) in cases {
            assert_eq!(decode_all(&encode(event_type, data)), vec![expected]);
        }
    }

    #[test]
    fn test_decode_strips_leading_whitespace_and_trims_type() {
        let events = decode_all(b"event:   token  \ndata:    hi\n\n");
        assert_eq!(events, vec![Event::token("hi")]);

        let events = decode_all(b"event:token\ndata:hi\n\n");
        assert_eq!(events, vec![Event::token("hi")]);
    }

    #[test]
    fn test_decode_truncated_frame_is_dropped() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"event: token\ndata: hi");
        assert!(decoder.decode().is_none());
        assert!(decoder.has_pending());

        decoder.finish();
        assert!(!decoder.has_pending());
        assert_eq!(decoder.events_decoded(), 0);

        // Complete lines but no blank terminator
        assert!(decode_all(b"event: token\ndata: hi\n").is_empty());
    }

    #[test]
    fn test_decode_blank_lines_only() {
        assert!(decode_all(b"\n\n\n").is_empty());
    }

    #[test]
    fn test_decode_event_without_data_is_discarded() {
        // Type set but no data: nothing emitted, and the type does not leak
        let events = decode_all(b"event: token\n\ndata: x\n\n");
        assert_eq!(events, vec![Event::new(EventKind::Message, "x")]);
    }

    #[test]
    fn test_decode_ignores_unknown_lines() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b": comment\nid: 7\nretry: 100\nEvent: nope\nevent: token\ndata: ok\n\n");
        let events: Vec<_> = decoder.decode_iter().collect();
        assert_eq!(events, vec![Event::token("ok")]);
        assert_eq!(decoder.lines_ignored(), 4);
    }

    #[test]
    fn test_decode_crlf_lines() {
        let events = decode_all(b"event: token\r\ndata: hi\r\n\r\n");
        assert_eq!(events, vec![Event::token("hi")]);
    }

    #[test]
    fn test_decode_last_event_line_wins() {
        let events = decode_all(b"event: status\nevent: token\ndata: x\n\n");
        assert_eq!(events, vec![Event::token("x")]);
    }

    #[test]
    fn test_decode_split_utf8_sequence() {
        let input = "event: token\ndata: héllo 世界\n\n".as_bytes();
        // Split inside the multi-byte 'é' and inside '世'
        let e_pos = input.iter().position(|&b| b == 0xC3).unwrap();
        let cjk_pos = input.iter().position(|&b| b == 0xE4).unwrap();
        let events = decode_chunks(&[
            &input[..e_pos + 1],
            &input[e_pos + 1..cjk_pos + 2],
            &input[cjk_pos + 2..],
        ]);
        assert_eq!(events, vec![Event::token("héllo 世界")]);
    }

    #[test]
    fn test_fragmentation_independence() {
        let mut input = Vec::new();
        input.extend_from_slice(&encode(Some("status"), "started"));
        input.extend_from_slice(&encode(Some("token"), "multi\nline"));
        input.extend_from_slice(b": keepalive\n\n");
        input.extend_from_slice(&encode(None, "default"));
        input.extend_from_slice(&encode(Some("status"), "done"));
        input.extend_from_slice(b"event: token\ndata: trunc");

        let whole = decode_all(&input);
        assert_eq!(whole.len(), 4);

        // Every single split point
        for split in 0..=input.len() {
            let events = decode_chunks(&[&input[..split], &input[split..]]);
            assert_eq!(events, whole, "split at {}", split);
        }

        // Byte-at-a-time and a few fixed chunk sizes
        for size in [1, 2, 3, 5, 7, 16] {
            let chunks: Vec<&[u8]> = input.chunks(size).collect();
            assert_eq!(decode_chunks(&chunks), whole, "chunk size {}", size);
        }
    }

    #[test]
    fn test_decoder_counters() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"data: a\n\ndata: b\n\ndata: c");
        assert_eq!(decoder.decode_iter().count(), 2);
        assert_eq!(decoder.events_decoded(), 2);
        assert_eq!(decoder.buffer_len(), 7);
    }

    #[tokio::test]
    async fn test_decode_stream() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"event: tok")),
            Ok(Bytes::from_static(b"en\ndata: H\n\nevent: token\n")),
            Ok(Bytes::from_static(b"data: i\n\n")),
            Ok(Bytes::from_static(b"data: lost")),
        ];
        let events: Vec<_> = decode_stream(stream::iter(chunks))
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(events, vec![Event::token("H"), Event::token("i")]);
    }

    #[tokio::test]
    async fn test_decode_stream_transport_error() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"data: a\n\ndata: b")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from_static(b"\n\n")),
        ];
        let mut events = decode_stream(stream::iter(chunks));

        let first = events.next().await.unwrap().unwrap();
        assert_eq!(first, Event::new(EventKind::Message, "a"));
        assert!(events.next().await.unwrap().is_err());
        // Sequence ends after a transport error; buffered data is not emitted
        assert!(events.next().await.is_none());
    }
}
