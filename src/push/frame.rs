//! Push line protocol.
//!
//! Every pushed event is one frame:
//!
//! ```text
//! event: <channel>\n
//! data: <json-payload>\n
//! \n
//! ```
//!
//! `encode` produces frames for the hub. `FrameParser` is the client half: it
//! accepts arbitrary byte chunks from a response body and yields complete
//! events, tolerating CRLF line endings, multi-line data and comment lines.

use axum::body::Bytes;
use serde_json::Value;

pub fn encode(channel: &str, data: &str) -> Bytes {
    Bytes::from(format!("event: {channel}\ndata: {data}\n\n"))
}

/// One decoded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    /// Event name; the channel the event was emitted on.
    pub event: Option<String>,
    pub data: String,
}

impl PushEvent {
    /// The data parsed as JSON; an empty object if it is not valid JSON.
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.data).unwrap_or_else(|_| Value::Object(Default::default()))
    }
}

#[derive(Debug, Default)]
pub struct FrameParser {
    buf: Vec<u8>,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<PushEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some((end, terminator)) = frame_end(&self.buf) {
            let block: Vec<u8> = self.buf.drain(..end + terminator).collect();
            if let Some(event) = parse_block(&String::from_utf8_lossy(&block[..end])) {
                events.push(event);
            }
        }
        events
    }

    /// Bytes received but not yet terminated by a blank line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Position and length of the first blank-line terminator.
fn frame_end(buf: &[u8]) -> Option<(usize, usize)> {
    (0..buf.len()).find_map(|i| {
        let rest = &buf[i..];
        if rest.starts_with(b"\n\n") {
            Some((i, 2))
        } else if rest.starts_with(b"\r\n\r\n") {
            Some((i, 4))
        } else {
            None
        }
    })
}

fn parse_block(block: &str) -> Option<PushEvent> {
    let mut event = None;
    let mut data = Vec::new();

    for line in block.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_owned()),
            "data" => data.push(value),
            _ => {}
        }
    }

    // Frames without data (keep-alive comments, bare event lines) are not events.
    if data.is_empty() {
        return None;
    }

    Some(PushEvent {
        event,
        data: data.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encodes_wire_frame() {
        let frame = encode("scores", r#"{"value":42}"#);
        assert_eq!(&frame[..], b"event: scores\ndata: {\"value\":42}\n\n");
    }

    #[test]
    fn parses_encoded_frame() {
        let mut parser = FrameParser::new();
        let events = parser.feed(&encode("scores", r#"{"value":42}"#));

        assert_eq!(
            events,
            vec![PushEvent {
                event: Some("scores".into()),
                data: r#"{"value":42}"#.into()
            }]
        );
        assert_eq!(events[0].json(), json!({ "value": 42 }));
        assert_eq!(parser.pending(), 0);
    }

    #[test]
    fn reassembles_split_chunks() {
        let mut parser = FrameParser::new();
        assert!(parser.feed(b"event: a\nda").is_empty());
        assert!(parser.feed(b"ta: 1\n").is_empty());
        let events = parser.feed(b"\nevent: b\ndata: 2\n\n");

        let names: Vec<_> = events.iter().map(|e| e.event.as_deref()).collect();
        assert_eq!(names, vec![Some("a"), Some("b")]);
    }

    #[test]
    fn handles_crlf_comments_and_multiline_data() {
        let mut parser = FrameParser::new();
        let events = parser.feed(b": keep-alive\r\n\r\nevent: log\r\ndata: one\r\ndata: two\r\n\r\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("log"));
        assert_eq!(events[0].data, "one\ntwo");
    }

    #[test]
    fn invalid_json_falls_back_to_empty_object() {
        let event = PushEvent {
            event: None,
            data: "not json".into(),
        };
        assert_eq!(event.json(), json!({}));
    }
}
