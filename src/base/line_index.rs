use text_size::{TextRange, TextSize};

use super::position::{Position, Span};

/// Maps byte offsets to line/column positions.
///
/// Built once per file from its text; lookups binary-search the
/// newline table.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset at the start of each line (line 0 starts at 0)
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset into a 0-indexed line/column position.
    pub fn position(&self, offset: TextSize) -> Position {
        let offset = u32::from(offset);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next_line) => next_line - 1,
        };
        Position::new(line as u32, offset - self.line_starts[line])
    }

    /// Convert a byte range into a line/column span.
    pub fn span(&self, range: TextRange) -> Span {
        Span::new(self.position(range.start()), self.position(range.end()))
    }
}
