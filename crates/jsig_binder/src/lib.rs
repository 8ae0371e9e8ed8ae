//! jsig_binder: Scopes and program analysis.
//!
//! The environment maps names to declared types through a chain of nested
//! scopes and resolves type aliases. The analyzer walks the syntax tree once
//! and summarizes what the code actually implements: functions and their
//! arity, `this` field accesses, return sites, prototype assignments and
//! module exports.

mod analyzer;
mod environment;
mod scope;

pub use analyzer::{
    analyze, Completion, ExportAssignment, ExportTarget, FunctionKind, FunctionSummary,
    ProgramSummary, PrototypeAssignment, ReturnSite, ThisAccess,
};
pub use environment::{substitute, TypeAlias, TypeEnvironment};
pub use scope::{Binding, Scope, ScopeKind};
