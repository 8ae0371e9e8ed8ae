//! jsig_types: The signature type model.
//!
//! Declared signatures are parsed into [`TypeNode`] trees shared through
//! [`TypeRef`]. Trees are immutable once built; the only interior state is
//! the lazily rendered source text of a [`RenamedLiteral`].

pub mod builtins;
mod display;
pub mod node;

pub use builtins::{builtins, is_builtin_class, BuiltinRegistry};
pub use node::*;
