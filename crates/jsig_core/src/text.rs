//! Source ranges and line lookup.
//!
//! Positions are character offsets into the source text, which is how the
//! scanner walks it. Every diagnostic reports a 1-based line derived from a
//! [`LineMap`].

use std::fmt;

/// A position in source text, measured in characters from the start.
pub type TextPos = u32;

/// A half-open range `[pos, end)` in source text.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct TextRange {
    /// Start offset (inclusive).
    pub pos: TextPos,
    /// End offset (exclusive).
    pub end: TextPos,
}

impl TextRange {
    #[inline]
    pub fn new(pos: TextPos, end: TextPos) -> Self {
        debug_assert!(end >= pos);
        Self { pos, end }
    }

    /// An empty range at a position.
    #[inline]
    pub fn empty(pos: TextPos) -> Self {
        Self { pos, end: pos }
    }

    #[inline]
    pub fn len(&self) -> TextPos {
        self.end - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos == self.end
    }

    #[inline]
    pub fn contains(&self, pos: TextPos) -> bool {
        pos >= self.pos && pos < self.end
    }

    /// The smallest range covering both.
    pub fn cover(&self, other: &TextRange) -> TextRange {
        TextRange::new(self.pos.min(other.pos), self.end.max(other.end))
    }
}

impl fmt::Debug for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.pos, self.end)
    }
}

/// A 1-based line and column.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LineAndColumn {
    pub line: u32,
    pub column: u32,
}

/// Maps character offsets to line numbers.
#[derive(Debug, Clone)]
pub struct LineMap {
    /// Character offset of the first character on each line.
    line_starts: Vec<TextPos>,
}

impl LineMap {
    /// Build a line map from source text. `\r\n`, `\r` and `\n` all end a line.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0u32];
        let mut chars = text.chars().enumerate().peekable();
        while let Some((i, ch)) = chars.next() {
            match ch {
                '\r' => {
                    if let Some(&(_, '\n')) = chars.peek() {
                        chars.next();
                        line_starts.push((i + 2) as u32);
                    } else {
                        line_starts.push((i + 1) as u32);
                    }
                }
                '\n' | '\u{2028}' | '\u{2029}' => line_starts.push((i + 1) as u32),
                _ => {}
            }
        }
        Self { line_starts }
    }

    /// 0-based line index of an offset.
    pub fn line_index(&self, pos: TextPos) -> usize {
        match self.line_starts.binary_search(&pos) {
            Ok(line) => line,
            Err(line) => line - 1,
        }
    }

    /// 1-based line number of an offset.
    #[inline]
    pub fn line_number(&self, pos: TextPos) -> u32 {
        self.line_index(pos) as u32 + 1
    }

    /// 1-based line and column of an offset.
    pub fn line_and_column(&self, pos: TextPos) -> LineAndColumn {
        let index = self.line_index(pos);
        LineAndColumn {
            line: index as u32 + 1,
            column: pos - self.line_starts[index] + 1,
        }
    }
}
