//! Incremental decoder for the gateway's `data: <json>` lines

use crate::codec::LineBuffer;
use crate::types::{StreamFrame, DONE_SENTINEL};

/// Turns arbitrarily split body chunks into frames.
///
/// Lines are split on raw bytes, so a multi-byte character straddling two
/// reads is reassembled before decoding. Lines that are not `data:` lines,
/// malformed JSON and unknown frame types are ignored. Nothing is returned
/// after the first terminal frame.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    lines: LineBuffer,
    finished: bool,
    ignored: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns the frames of every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        let mut frames = Vec::new();
        if self.finished {
            return frames;
        }
        for line in self.lines.push(chunk) {
            if let Some(frame) = self.decode_line(&line) {
                let terminal = frame.is_terminal();
                frames.push(frame);
                if terminal {
                    self.finished = true;
                    self.lines.clear();
                    break;
                }
            }
        }
        frames
    }

    /// Whether a terminal frame has been decoded
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of data lines dropped as malformed or unknown
    pub fn ignored(&self) -> usize {
        self.ignored
    }

    /// Bytes held back waiting for the end of their line
    pub fn pending_len(&self) -> usize {
        self.lines.pending_len()
    }

    fn decode_line(&mut self, line: &str) -> Option<StreamFrame> {
        let payload = line.strip_prefix("data:")?;
        let payload = payload.strip_prefix(' ').unwrap_or(payload).trim();
        if payload.is_empty() {
            return None;
        }
        if payload == DONE_SENTINEL {
            return Some(StreamFrame::Done);
        }
        match serde_json::from_str::<StreamFrame>(payload) {
            Ok(frame) => Some(frame),
            Err(_) => {
                self.ignored += 1;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceRef;

    const WIRE: &str = concat!(
        "data: {\"type\":\"sources\",\"pages\":[{\"id\":\"p1\",\"title\":\"Intro\"}]}\n\n",
        "data: {\"type\":\"content\",\"text\":\"Hel\"}\n\n",
        "data: {\"type\":\"content\",\"text\":\"lo, \"}\n\n",
        "data: {\"type\":\"content\",\"text\":\"world ✓\"}\n\n",
        "data: [DONE]\n\n",
    );

    fn expected() -> Vec<StreamFrame> {
        vec![
            StreamFrame::sources(vec![SourceRef::new("p1", "Intro")]),
            StreamFrame::content("Hel"),
            StreamFrame::content("lo, "),
            StreamFrame::content("world ✓"),
            StreamFrame::Done,
        ]
    }

    #[test]
    fn test_whole_body() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.push(WIRE.as_bytes()), expected());
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_any_chunk_boundary() {
        let bytes = WIRE.as_bytes();
        for size in 1..=bytes.len() {
            let mut decoder = FrameDecoder::new();
            let mut frames = Vec::new();
            for chunk in bytes.chunks(size) {
                frames.extend(decoder.push(chunk));
            }
            assert_eq!(frames, expected(), "chunk size {}", size);
        }
    }

    #[test]
    fn test_bad_lines_ignored() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(
            concat!(
                ": comment\n",
                "event: ping\n",
                "data: {not json\n",
                "data: {\"type\":\"reasoning\",\"text\":\"x\"}\n",
                "data: {\"type\":\"content\",\"text\":\"ok\"}\n",
            )
            .as_bytes(),
        );
        assert_eq!(frames, vec![StreamFrame::content("ok")]);
        assert_eq!(decoder.ignored(), 2);
    }

    #[test]
    fn test_nothing_after_terminal() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(
            b"data: {\"type\":\"error\",\"error\":\"boom\"}\n\ndata: {\"type\":\"content\",\"text\":\"late\"}\n\n",
        );
        assert_eq!(frames, vec![StreamFrame::error("boom")]);
        assert!(decoder.push(b"data: [DONE]\n\n").is_empty());
    }

    #[test]
    fn test_fragment_never_parsed_alone() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: {\"type\":\"content\",\"text\":\"a\"}").is_empty());
        assert!(decoder.pending_len() > 0);
        assert_eq!(decoder.push(b"\n"), vec![StreamFrame::content("a")]);
    }
}
