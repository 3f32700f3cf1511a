//! Incremental SSE frame decoder.
//!
//! Turns the raw byte stream of a `text/event-stream` response into
//! complete frame payloads. The decoder is a push parser: feed it chunks
//! as they arrive and it yields every frame completed so far, buffering
//! the remainder. Frames may split anywhere across transport chunks,
//! including inside the delimiter or inside a multi-byte character.
//!
//! Decoding a payload into a [`StreamEvent`] is a separate step
//! ([`decode_event`]) so malformed payloads can be dropped without
//! disturbing the framing.

use bytes::BytesMut;
use quill_protocol::StreamEvent;

/// Incremental decoder for one SSE byte stream.
///
/// Holds no cross-session state; create one per exchange.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: BytesMut,
}

impl SseDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transport chunk and return the payloads of every frame
    /// completed by it, in wire order.
    ///
    /// A frame's payload is the concatenation of its `data` field lines.
    /// Comment lines and fields this protocol does not use (`event`,
    /// `id`, `retry`) are skipped; a frame with no `data` lines yields
    /// nothing.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some((end, delim_len)) = find_frame_boundary(&self.buf) {
            let frame = self.buf.split_to(end + delim_len);
            // The boundary sits on ASCII newlines, so multi-byte characters
            // never straddle the split; lossy conversion only fires on
            // genuinely invalid UTF-8.
            let text = String::from_utf8_lossy(&frame[..end]);
            if let Some(payload) = parse_frame(&text) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Consume the decoder at end of transport.
    ///
    /// A partial frame left in the buffer is discarded, never emitted.
    /// Returns the number of discarded bytes.
    pub fn finish(self) -> usize {
        let leftover = self.buf.len();
        if leftover > 0 {
            tracing::debug!(bytes = leftover, "discarding partial frame at end of stream");
        }
        leftover
    }
}

/// Find the first frame delimiter (blank line) in `buf`.
///
/// Returns the frame length and the delimiter length. Both bare-LF and
/// CRLF line endings are recognized.
fn find_frame_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    for i in 0..buf.len() {
        let rest = &buf[i..];
        if rest.starts_with(b"\r\n\r\n") {
            return Some((i, 4));
        }
        if rest.starts_with(b"\n\n") {
            return Some((i, 2));
        }
    }
    None
}

/// Extract the `data` payload from one frame's text.
fn parse_frame(text: &str) -> Option<String> {
    let mut data_lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        if line.starts_with(':') {
            // comment line
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            data_lines.push(value);
        }
    }
    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

/// Parse a frame payload into a [`StreamEvent`].
///
/// Malformed payloads are dropped silently (logged, not surfaced): a bad
/// frame must not abort the session. Unknown event kinds decode to
/// [`StreamEvent::Unknown`] and are filtered by consumers, not here.
pub fn decode_event(payload: &str) -> Option<StreamEvent> {
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }
    match serde_json::from_str::<StreamEvent>(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::debug!(error = %e, payload, "dropping malformed frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WIRE: &str = concat!(
        "data: {\"type\":\"thinking\",\"content\":\"Analyzing your request...\"}\n\n",
        "data: {\"type\":\"highlight\",\"line\":5}\n\n",
        "data: {\"type\":\"token\",\"content\":\"Hello\"}\n\n",
        "data: {\"type\":\"done\",\"summary\":\"Inserted content at line 5\"}\n\n",
    );

    fn decode_all(chunks: &[&[u8]]) -> Vec<StreamEvent> {
        let mut decoder = SseDecoder::new();
        let mut events = Vec::new();
        for chunk in chunks {
            for payload in decoder.feed(chunk) {
                if let Some(event) = decode_event(&payload) {
                    events.push(event);
                }
            }
        }
        assert_eq!(decoder.finish(), 0);
        events
    }

    #[test]
    fn test_single_chunk_many_frames() {
        let events = decode_all(&[WIRE.as_bytes()]);
        assert_eq!(events.len(), 4);
        assert_eq!(events[1], StreamEvent::Highlight { line: 5 });
        assert!(events[3].is_terminal());
    }

    #[test]
    fn test_every_split_point_yields_same_events() {
        // Property from the wire contract: chunking must never change the
        // decoded sequence, even when the cut lands inside the delimiter
        // or inside a payload.
        let wire = WIRE.as_bytes();
        let expected = decode_all(&[wire]);
        for cut in 1..wire.len() {
            let events = decode_all(&[&wire[..cut], &wire[cut..]]);
            assert_eq!(events, expected, "split at byte {cut} changed the output");
        }
    }

    #[test]
    fn test_one_byte_at_a_time() {
        let wire = WIRE.as_bytes();
        let chunks: Vec<&[u8]> = wire.chunks(1).collect();
        assert_eq!(decode_all(&chunks), decode_all(&[wire]));
    }

    #[test]
    fn test_crlf_delimiters() {
        let wire = b"data: {\"type\":\"token\",\"content\":\"A\"}\r\n\r\ndata: {\"type\":\"done\"}\r\n\r\n";
        let events = decode_all(&[wire.as_slice()]);
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            StreamEvent::Token {
                content: "A".to_string()
            }
        );
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let wire = "data: {\"type\":\"token\",\"content\":\"héllo\"}\n\n".as_bytes();
        // Cut inside the two-byte 'é' sequence.
        let cut = wire.iter().position(|&b| b == 0xc3).expect("multibyte start") + 1;
        let events = decode_all(&[&wire[..cut], &wire[cut..]]);
        assert_eq!(
            events,
            vec![StreamEvent::Token {
                content: "héllo".to_string()
            }]
        );
    }

    #[test]
    fn test_malformed_frame_dropped_and_stream_continues() {
        let wire = b"data: {not json at all\n\ndata: {\"type\":\"token\",\"content\":\"ok\"}\n\n";
        let events = decode_all(&[wire.as_slice()]);
        assert_eq!(
            events,
            vec![StreamEvent::Token {
                content: "ok".to_string()
            }]
        );
    }

    #[test]
    fn test_comments_and_unused_fields_ignored() {
        let wire =
            b": keep-alive\n\nevent: message\nid: 7\ndata: {\"type\":\"highlight\",\"line\":3}\n\n";
        let events = decode_all(&[wire.as_slice()]);
        assert_eq!(events, vec![StreamEvent::Highlight { line: 3 }]);
    }

    #[test]
    fn test_multiline_data_joined() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b"data: first\ndata: second\n\n");
        assert_eq!(payloads, vec!["first\nsecond".to_string()]);
    }

    #[test]
    fn test_partial_frame_at_end_discarded() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b"data: {\"type\":\"token\",\"content\":\"A\"}\n\ndata: {\"type\":\"to");
        assert_eq!(payloads.len(), 1);
        // The dangling fragment never becomes a trailing event.
        assert!(decoder.finish() > 0);
    }

    #[test]
    fn test_decode_event_skips_sentinels() {
        assert_eq!(decode_event(""), None);
        assert_eq!(decode_event("[DONE]"), None);
    }

    #[test]
    fn test_unknown_event_kind_passes_through() {
        let event = decode_event(r#"{"type":"metrics","latency_ms":12}"#);
        assert_eq!(event, Some(StreamEvent::Unknown));
    }
}
