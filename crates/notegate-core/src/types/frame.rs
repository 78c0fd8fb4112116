//! Frames of the gateway's own server-to-client SSE stream

use serde::{Deserialize, Serialize};

/// Prefix of every data line on the wire
pub const DATA_PREFIX: &str = "data: ";

/// Literal payload of the terminal sentinel line
pub const DONE_SENTINEL: &str = "[DONE]";

/// A page reference emitted in the `sources` frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: String,
    pub title: String,
}

impl SourceRef {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// One self-describing unit of the server-to-client stream.
///
/// `Done` is the sentinel and has no JSON form; it is written as the literal
/// `[DONE]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamFrame {
    /// Retrieved-context pages, at most once and before any content
    Sources { pages: Vec<SourceRef> },
    /// Incremental text delta
    Content { text: String },
    /// Terminal failure
    Error { error: String },
    /// Terminal success sentinel
    #[serde(skip)]
    Done,
}

impl StreamFrame {
    pub fn sources(pages: Vec<SourceRef>) -> Self {
        StreamFrame::Sources { pages }
    }

    pub fn content(text: impl Into<String>) -> Self {
        StreamFrame::Content { text: text.into() }
    }

    pub fn error(error: impl Into<String>) -> Self {
        StreamFrame::Error { error: error.into() }
    }

    /// Whether this frame ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamFrame::Error { .. } | StreamFrame::Done)
    }

    /// The payload that follows `data: ` on the wire
    pub fn data(&self) -> String {
        match self {
            StreamFrame::Done => DONE_SENTINEL.to_string(),
            frame => serde_json::to_string(frame).unwrap_or_default(),
        }
    }

    /// `data: <payload>\n\n`, for writers that frame the body bytes
    /// themselves instead of going through an SSE response type
    pub fn encode(&self) -> String {
        format!("{}{}\n\n", DATA_PREFIX, self.data())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_payloads() {
        let sources = StreamFrame::sources(vec![SourceRef::new("p1", "Intro")]);
        assert_eq!(
            sources.data(),
            r#"{"type":"sources","pages":[{"id":"p1","title":"Intro"}]}"#
        );
        assert_eq!(
            StreamFrame::content("Hel").data(),
            r#"{"type":"content","text":"Hel"}"#
        );
        assert_eq!(
            StreamFrame::error("boom").data(),
            r#"{"type":"error","error":"boom"}"#
        );
        assert_eq!(StreamFrame::Done.data(), "[DONE]");
    }

    #[test]
    fn test_encode() {
        assert_eq!(StreamFrame::Done.encode(), "data: [DONE]\n\n");
        assert_eq!(
            StreamFrame::content("a\nb").encode(),
            "data: {\"type\":\"content\",\"text\":\"a\\nb\"}\n\n"
        );
    }

    #[test]
    fn test_terminal() {
        assert!(StreamFrame::Done.is_terminal());
        assert!(StreamFrame::error("x").is_terminal());
        assert!(!StreamFrame::content("x").is_terminal());
        assert!(!StreamFrame::sources(vec![]).is_terminal());
    }

    #[test]
    fn test_parse_frame() {
        let frame: StreamFrame = serde_json::from_str(r#"{"type":"content","text":"hi"}"#).unwrap();
        assert_eq!(frame, StreamFrame::content("hi"));
        assert!(serde_json::from_str::<StreamFrame>(r#"{"type":"mystery"}"#).is_err());
    }
}
