//! jsig_core: Core utilities shared by every jsig crate.
//!
//! Provides source ranges and the line map used to turn offsets into the
//! 1-based line numbers that diagnostics report.

pub mod text;

pub use text::{LineMap, TextPos, TextRange};
