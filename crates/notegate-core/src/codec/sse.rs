//! Incremental Server-Sent-Events parser for upstream backend streams

use super::line_buffer::LineBuffer;

/// One dispatched SSE event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if the backend names its events
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
}

/// Turns arbitrarily split body chunks into SSE events.
///
/// Events are dispatched on a blank line. Comment lines (leading `:`) and
/// fields other than `event` and `data` are ignored.
#[derive(Debug, Default)]
pub struct SseEventParser {
    lines: LineBuffer,
    event: Option<String>,
    data: Vec<String>,
}

impl SseEventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns the events it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();
        for line in self.lines.push(chunk) {
            self.handle_line(&line, &mut events);
        }
        events
    }

    /// Flush at end of body. A final event without its blank line is still dispatched.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if let Some(line) = self.lines.finish() {
            self.handle_line(&line, &mut events);
        }
        self.dispatch(&mut events);
        events
    }

    fn handle_line(&mut self, line: &str, events: &mut Vec<SseEvent>) {
        if line.is_empty() {
            self.dispatch(events);
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
    }

    fn dispatch(&mut self, events: &mut Vec<SseEvent>) {
        let event = self.event.take();
        if self.data.is_empty() {
            return;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        events.push(SseEvent { event, data });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_only_events() {
        let mut parser = SseEventParser::new();
        let events = parser.push(b"data: {\"a\":1}\n\ndata: [DONE]\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "{\"a\":1}");
        assert!(events[0].event.is_none());
        assert_eq!(events[1].data, "[DONE]");
    }

    #[test]
    fn test_named_events() {
        let mut parser = SseEventParser::new();
        let events = parser.push(b"event: ping\ndata: {}\n\nevent: message_stop\ndata: {\"type\":\"message_stop\"}\n\n");
        assert_eq!(events[0].event.as_deref(), Some("ping"));
        assert_eq!(events[1].event.as_deref(), Some("message_stop"));
    }

    #[test]
    fn test_comments_and_keepalive_ignored() {
        let mut parser = SseEventParser::new();
        let events = parser.push(b": keep-alive\n\nretry: 100\n\ndata: x\n\n");
        assert_eq!(events, vec![SseEvent { event: None, data: "x".to_string() }]);
    }

    #[test]
    fn test_multiline_data() {
        let mut parser = SseEventParser::new();
        let events = parser.push(b"data: a\ndata: b\n\n");
        assert_eq!(events[0].data, "a\nb");
    }

    #[test]
    fn test_split_across_pushes() {
        let mut parser = SseEventParser::new();
        assert!(parser.push(b"da").is_empty());
        assert!(parser.push(b"ta: hel").is_empty());
        assert!(parser.push(b"lo\n").is_empty());
        let events = parser.push(b"\n");
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut parser = SseEventParser::new();
        assert!(parser.push(b"data: last").is_empty());
        let events = parser.finish();
        assert_eq!(events[0].data, "last");
        assert!(parser.finish().is_empty());
    }
}
