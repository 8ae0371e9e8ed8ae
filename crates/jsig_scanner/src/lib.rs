//! jsig_scanner: Lexer for the JavaScript subset the verifier reads.
//!
//! Produces tokens from source text with support for:
//! - ES5 punctuation, keywords and literals
//! - Regular expression literals (rescanned on parser request)
//! - Unicode identifiers
//! - Recording block comments for inline signature headers

mod scanner;
mod token;

pub use scanner::{is_identifier_part, is_identifier_start, Scanner};
pub use token::ScannedComment;
