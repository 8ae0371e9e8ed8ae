//! jsig_ast: Syntax tree for the ES5 subset the verifier reads.
//!
//! Nodes live in a caller-owned arena. [`visitor`] provides a default
//! traversal that analyses override per node kind.

pub mod node;
pub mod syntax_kind;
pub mod types;
pub mod visitor;

pub use node::*;
pub use syntax_kind::SyntaxKind;
pub use types::*;
