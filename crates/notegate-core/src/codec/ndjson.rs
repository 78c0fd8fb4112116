//! Newline-delimited JSON decoding

use serde::de::DeserializeOwned;

use super::line_buffer::LineBuffer;

/// Decodes NDJSON from arbitrarily split chunks.
///
/// Each complete line is parsed independently. Blank lines are ignored and
/// lines that fail to parse are skipped and counted, never fatal.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    lines: LineBuffer,
    skipped: usize,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns the objects of every line it completed.
    pub fn push<T: DeserializeOwned>(&mut self, chunk: &[u8]) -> Vec<T> {
        let lines = self.lines.push(chunk);
        lines.iter().filter_map(|line| self.parse(line)).collect()
    }

    /// Parse whatever remains once the body has ended.
    pub fn finish<T: DeserializeOwned>(&mut self) -> Option<T> {
        let rest = self.lines.finish()?;
        self.parse(&rest)
    }

    /// Number of lines dropped because they were not valid JSON
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn parse<T: DeserializeOwned>(&mut self, line: &str) -> Option<T> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str(line) {
            Ok(value) => Some(value),
            Err(_) => {
                self.skipped += 1;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        n: u32,
    }

    #[test]
    fn test_decodes_lines() {
        let mut decoder = NdjsonDecoder::new();
        let items: Vec<Item> = decoder.push(b"{\"n\":1}\n{\"n\":2}\n");
        assert_eq!(items, vec![Item { n: 1 }, Item { n: 2 }]);
    }

    #[test]
    fn test_object_split_mid_line() {
        let mut decoder = NdjsonDecoder::new();
        let first: Vec<Item> = decoder.push(b"{\"n\"");
        assert!(first.is_empty());
        let second: Vec<Item> = decoder.push(b":7}\n");
        assert_eq!(second, vec![Item { n: 7 }]);
    }

    #[test]
    fn test_bad_lines_skipped() {
        let mut decoder = NdjsonDecoder::new();
        let items: Vec<Item> = decoder.push(b"{\"n\":1}\nnot json\n\n{\"n\":3}\n");
        assert_eq!(items, vec![Item { n: 1 }, Item { n: 3 }]);
        assert_eq!(decoder.skipped(), 1);
    }

    #[test]
    fn test_finish_parses_trailing_line() {
        let mut decoder = NdjsonDecoder::new();
        let items: Vec<Item> = decoder.push(b"{\"n\":1}\n{\"n\":2}");
        assert_eq!(items.len(), 1);
        assert_eq!(decoder.finish::<Item>(), Some(Item { n: 2 }));
    }
}
