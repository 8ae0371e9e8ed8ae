//! jsig_checker: The type verifier.
//!
//! Checks a parsed JavaScript file against its header: function signatures,
//! returns, field accesses, constructors and `module.exports`. Results are
//! collected into a [`Meta`] rather than failing fast, so one pass reports
//! every problem in the file.

mod checker;
mod meta;
mod subtype;

pub use checker::{verify, Checker, ExportPolicy, ImportedType};
pub use meta::Meta;
pub use subtype::{is_subtype, Mismatch, SubtypeChecker};
