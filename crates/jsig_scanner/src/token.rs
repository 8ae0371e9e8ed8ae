//! Trivia recorded by the scanner.

use jsig_core::text::TextRange;

/// A block comment the scanner skipped, delimiters included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedComment {
    /// Character range of the comment in the source.
    pub range: TextRange,
    /// Full comment text, `/*` and `*/` included.
    pub text: String,
}

