//! Source location tracking
//!
//! Tokens and syntax nodes carry raw byte offsets into the template buffer.
//! [`SourceMap`] resolves those offsets into 1-based line/column positions
//! when a human-readable location is needed.
use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in source text with line, column, and byte offset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    /// Byte offset from start of input (0-based)
    pub offset: usize,
    /// Line number (1-based)
    pub line: u32,
    /// Column number in characters (1-based)
    pub column: u32,
}

impl Position {
    pub fn new(offset: usize, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Offset 0, line 1, column 1
    pub fn start() -> Self {
        Self::new(0, 1, 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A resolved range of source text. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(
            start.offset <= end.offset,
            "Span start must not be after end"
        );
        Self { start, end }
    }

    /// Zero-width span at a position
    pub fn point(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// Byte length of the span
    pub fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }

    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }

    /// Smallest span covering both
    pub fn merge(self, other: Self) -> Self {
        let start = if self.start.offset <= other.start.offset {
            self.start
        } else {
            other.start
        };
        let end = if self.end.offset >= other.end.offset {
            self.end
        } else {
            other.end
        };
        Self { start, end }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(
                f,
                "{}:{}-{}",
                self.start.line, self.start.column, self.end.column
            )
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Line index over a template buffer
#[derive(Debug, Clone)]
pub struct SourceMap {
    source: String,
    /// Byte offsets of line starts
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(offset, _)| offset + 1),
        );
        Self {
            source,
            line_starts,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Line and column for a byte offset. Offsets past the end clamp to
    /// the end of input; offsets inside a multi-byte char snap back to it.
    pub fn position_at(&self, offset: usize) -> Position {
        let mut offset = offset.min(self.source.len());
        while !self.source.is_char_boundary(offset) {
            offset -= 1;
        }

        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_start = self.line_starts[line];
        let column = self.source[line_start..offset].chars().count();

        Position::new(offset, (line + 1) as u32, (column + 1) as u32)
    }

    /// Resolve a byte range
    pub fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.position_at(start), self.position_at(end.max(start)))
    }

    /// Text of a 1-based line without its terminator
    pub fn get_line(&self, line_num: u32) -> Option<&str> {
        let idx = (line_num as usize).checked_sub(1)?;
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|next| next - 1)
            .unwrap_or(self.source.len());

        Some(self.source[start..end].trim_end_matches('\r'))
    }

    /// Source text covered by a span
    pub fn span_text(&self, span: &Span) -> &str {
        &self.source[span.start.offset..span.end.offset]
    }

    /// Cargo-style rendering of a message with the offending line underlined
    pub fn format_error(&self, file: &str, span: &Span, message: &str) -> String {
        let mut result = String::new();

        result.push_str(&format!("error: {}\n", message));
        result.push_str(&format!(
            "  --> {}:{}:{}\n",
            file, span.start.line, span.start.column
        ));

        if let Some(line) = self.get_line(span.start.line) {
            let line_num_str = span.start.line.to_string();
            let padding = " ".repeat(line_num_str.len());

            result.push_str(&format!("{} |\n", padding));
            result.push_str(&format!("{} | {}\n", line_num_str, line));

            let caret_len = if span.start.line == span.end.line {
                (span.end.column - span.start.column) as usize
            } else {
                line.chars().count() + 1 - span.start.column as usize
            };

            result.push_str(&format!(
                "{} | {}{}\n",
                padding,
                " ".repeat((span.start.column - 1) as usize),
                "^".repeat(caret_len.max(1))
            ));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_at_multiline() {
        let map = SourceMap::new("ab\ncd\n");
        assert_eq!(map.position_at(0), Position::new(0, 1, 1));
        assert_eq!(map.position_at(3), Position::new(3, 2, 1));
        assert_eq!(map.position_at(4), Position::new(4, 2, 2));
        assert_eq!(map.position_at(6), Position::new(6, 3, 1));
        assert_eq!(map.line_count(), 3);
    }

    #[test]
    fn test_position_at_clamps_and_snaps() {
        let map = SourceMap::new("é");
        assert_eq!(map.position_at(1).offset, 0);
        assert_eq!(map.position_at(99).offset, 2);
    }

    #[test]
    fn test_get_line() {
        let map = SourceMap::new("first\r\nsecond");
        assert_eq!(map.get_line(1), Some("first"));
        assert_eq!(map.get_line(2), Some("second"));
        assert_eq!(map.get_line(0), None);
        assert_eq!(map.get_line(3), None);
    }

    #[test]
    fn test_format_error_underlines_span() {
        let map = SourceMap::new("{{ unclosed");
        let span = map.span(3, 11);
        let rendered = map.format_error("page.j2", &span, "Expected variable end delimiter");

        assert!(rendered.contains("error: Expected variable end delimiter"));
        assert!(rendered.contains("--> page.j2:1:4"));
        assert!(rendered.contains("1 | {{ unclosed"));
        assert!(rendered.contains("  |    ^^^^^^^^"));
    }

    #[test]
    fn test_merge() {
        let map = SourceMap::new("abcdef");
        let merged = map.span(1, 2).merge(map.span(4, 6));
        assert_eq!(merged.start.offset, 1);
        assert_eq!(merged.end.offset, 6);
        assert_eq!(merged.len(), 5);
    }
}
