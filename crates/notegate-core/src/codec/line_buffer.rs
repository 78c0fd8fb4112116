//! Newline framing over a byte stream whose reads split lines arbitrarily

/// Accumulates bytes and hands out complete lines.
///
/// The trailing fragment of each push is kept for the next one and never
/// returned on its own until `finish`. Splitting happens on raw bytes, so a
/// multi-byte UTF-8 character cut across two reads is reassembled intact.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, without terminators.
    ///
    /// A `\r` before the `\n` is stripped as well.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + pos;
            lines.push(decode_line(&self.pending[start..end]));
            start = end + 1;
        }
        self.pending.drain(..start);
        lines
    }

    /// Take the unterminated remainder, if it holds anything.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(decode_line(&rest))
    }

    /// Bytes currently held back waiting for a newline
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop any partial line
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
