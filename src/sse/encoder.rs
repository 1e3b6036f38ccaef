//! SSE frame encoder

use bytes::{BufMut, Bytes, BytesMut};

/// Encode one event as an SSE frame
///
/// The `event:` line is omitted when `event_type` is absent or empty.
/// Carriage returns are stripped from `data`, then each `\n`-separated line
/// becomes one `data:` line. The frame ends with a blank line.
pub fn encode(event_type: Option<&str>, data: &str) -> Bytes {
    let data = data.replace('\r', "");
    let event_type = event_type.filter(|t| !t.is_empty());

    let mut buf = BytesMut::with_capacity(data.len() + 32);
    if let Some(event_type) = event_type {
        buf.put_slice(b"event: ");
        buf.put_slice(event_type.as_bytes());
        buf.put_u8(b'\n');
    }
    for line in data.split('\n') {
        buf.put_slice(b"data: ");
        buf.put_slice(line.as_bytes());
        buf.put_u8(b'\n');
    }
    buf.put_u8(b'\n');

    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_with_type() {
        let frame = encode(Some("status"), "started");
        assert_eq!(&frame[..], b"event: status\ndata: started\n\n");
    }

    #[test]
    fn test_encode_without_type() {
        assert_eq!(&encode(None, "x")[..], b"data: x\n\n");
        assert_eq!(&encode(Some(""), "x")[..], b"data: x\n\n");
    }

    #[test]
    fn test_encode_multi_line() {
        let frame = encode(Some("token"), "a\nb");
        assert_eq!(&frame[..], b"event: token\ndata: a\ndata: b\n\n");
    }

    #[test]
    fn test_encode_strips_carriage_return() {
        let frame = encode(Some("token"), "x\r\ny");
        assert!(!frame.contains(&b'\r'));
        assert_eq!(&frame[..], b"event: token\ndata: x\ndata: y\n\n");
    }

    #[test]
    fn test_encode_empty_data() {
        assert_eq!(&encode(Some("token"), "")[..], b"event: token\ndata: \n\n");
    }

    #[test]
    fn test_encode_trailing_newline() {
        // A trailing newline produces an empty final data line
        let frame = encode(None, "a\n");
        assert_eq!(&frame[..], b"data: a\ndata: \n\n");
    }

    #[test]
    fn test_frames_concatenate() {
        let mut stream = encode(Some("token"), "H").to_vec();
        stream.extend_from_slice(&encode(Some("token"), "i"));
        assert_eq!(
            stream,
            b"event: token\ndata: H\n\nevent: token\ndata: i\n\n".to_vec()
        );
    }
}
