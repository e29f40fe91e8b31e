//! Incremental parser for the device's server-sent event stream.
//!
//! The firmware writes frames as `event: <name>\ndata: <json>\n\n` over a
//! socket it keeps open for the life of the subscription. Chunks arrive
//! with no alignment to frame boundaries, so the parser buffers raw bytes
//! and only decodes complete lines.

/// One dispatched event: a name and its data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name from the `event:` field, or `"message"` if none was given.
    pub event: String,
    /// Data payload. Multiple `data:` lines are joined with `\n`.
    pub data: String,
}

/// Streaming SSE frame parser. Feed it byte chunks as they arrive and it
/// returns every event completed by that chunk.
#[derive(Debug, Default)]
pub struct SseParser {
    buf: Vec<u8>,
    event_type: String,
    data: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return events whose terminating blank line
    /// arrived within it. Incomplete trailing lines stay buffered.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop(); // the '\n'
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        // Lines starting with ':' are comments (used as keepalives by
        // some servers)
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.find(':') {
            Some(pos) => {
                let value = &line[pos + 1..];
                // A single space after the colon is part of the delimiter
                (&line[..pos], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };

        match field {
            "event" => self.event_type = value.to_string(),
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            // "id" and "retry" are valid SSE fields the firmware never
            // sends; unknown fields are ignored for forward compatibility
            _ => {}
        }
        None
    }

    /// Blank line: emit the accumulated event. Frames without any data
    /// line are dropped, matching EventSource behavior.
    fn dispatch(&mut self) -> Option<SseEvent> {
        let event_type = std::mem::take(&mut self.event_type);
        let mut data = std::mem::take(&mut self.data);

        if data.is_empty() {
            return None;
        }
        // The accumulator leaves one trailing newline per data line
        data.pop();

        Some(SseEvent {
            event: if event_type.is_empty() {
                "message".to_string()
            } else {
                event_type
            },
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame() {
        let mut parser = SseParser::new();
        let events = parser.push(b"event: connected\ndata: {\"status\":\"connected\"}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "connected");
        assert_eq!(events[0].data, r#"{"status":"connected"}"#);
    }

    #[test]
    fn test_two_frames_in_one_chunk() {
        let mut parser = SseParser::new();
        let events = parser.push(
            b"event: connected\ndata: {}\n\nevent: relay_status\ndata: {\"type\":\"relay_status\"}\n\n",
        );
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, "connected");
        assert_eq!(events[1].event, "relay_status");
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.push(b"event: relay_st").is_empty());
        assert!(parser.push(b"atus\ndata: {\"door\"").is_empty());
        let events = parser.push(b":true}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "relay_status");
        assert_eq!(events[0].data, r#"{"door":true}"#);
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut parser = SseParser::new();
        let events = parser.push(b"event: connected\r\ndata: ok\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "connected");
        assert_eq!(events[0].data, "ok");
    }

    #[test]
    fn test_comment_lines_ignored() {
        let mut parser = SseParser::new();
        let events = parser.push(b": keepalive\n\ndata: real\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "real");
    }

    #[test]
    fn test_multi_line_data_joined() {
        let mut parser = SseParser::new();
        let events = parser.push(b"data: line one\ndata: line two\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "line one\nline two");
    }

    #[test]
    fn test_frame_without_data_dropped() {
        let mut parser = SseParser::new();
        let events = parser.push(b"event: connected\n\n");
        assert!(events.is_empty());

        // The dropped frame must not leak its name into the next one
        let events = parser.push(b"data: x\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "message");
    }

    #[test]
    fn test_default_event_name() {
        let mut parser = SseParser::new();
        let events = parser.push(b"data: hello\n\n");
        assert_eq!(events[0].event, "message");
    }

    #[test]
    fn test_value_without_space_after_colon() {
        let mut parser = SseParser::new();
        let events = parser.push(b"data:tight\n\n");
        assert_eq!(events[0].data, "tight");
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let mut parser = SseParser::new();
        let events = parser.push(b"id: 7\nretry: 3000\ndata: payload\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "payload");
    }
}
