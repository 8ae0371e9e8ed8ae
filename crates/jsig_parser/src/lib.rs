//! jsig_parser: Recursive descent parser for JavaScript.
//!
//! Parses token streams from the scanner into an arena-allocated AST.

mod parser;
mod precedence;

pub use parser::{ParseResult, Parser};
