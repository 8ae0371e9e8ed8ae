//! Grammar errors.

use thiserror::Error;

/// A signature that does not match the grammar.
///
/// Parsing stops at the first error; nothing is recovered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{column}: expected {} but found {found}", .expected.join(" or "))]
pub struct SignatureError {
    /// Byte offset into the parsed text.
    pub offset: usize,
    /// 1-based line.
    pub line: u32,
    /// 1-based column, in characters.
    pub column: u32,
    /// The alternatives that would have been accepted.
    pub expected: Vec<String>,
    /// What was found instead.
    pub found: String,
}

impl SignatureError {
    /// Build an error at `offset` into `source`.
    pub fn at(source: &str, offset: usize, expected: &[&str], found: impl Into<String>) -> Self {
        let offset = offset.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() as u32 + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() as u32 + 1;
        Self {
            offset,
            line,
            column,
            expected: expected.iter().map(|s| s.to_string()).collect(),
            found: found.into(),
        }
    }

    /// Shift the reported line for text that starts on `first_line`.
    pub fn starting_at_line(mut self, first_line: u32) -> Self {
        self.line += first_line.saturating_sub(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_and_column() {
        let err = SignatureError::at("a : String\nb : ?", 15, &["type"], "'?'");
        assert_eq!((err.line, err.column), (2, 5));
        assert_eq!(err.to_string(), "2:5: expected type but found '?'");
    }

    #[test]
    fn test_line_offset() {
        let err = SignatureError::at("x", 0, &["':'"], "end of input").starting_at_line(10);
        assert_eq!(err.line, 10);
    }
}
