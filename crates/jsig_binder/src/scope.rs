//! Scopes and bindings.

use jsig_types::TypeRef;
use rustc_hash::FxHashMap;

/// Where a scope sits in the nesting order global → header → module →
/// function → block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Header,
    Module,
    Function,
    Block,
}

/// A name bound to a declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub ty: TypeRef,
    /// 1-based declaration line; 0 for builtins.
    pub line: u32,
}

/// One level of the scope chain.
#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    names: FxHashMap<String, Binding>,
    /// The `this` type of a function scope.
    this_type: Option<TypeRef>,
}

impl Scope {
    pub fn new(kind: ScopeKind) -> Self {
        Self { kind, names: FxHashMap::default(), this_type: None }
    }

    pub fn function(this_type: Option<TypeRef>) -> Self {
        Self { kind: ScopeKind::Function, names: FxHashMap::default(), this_type }
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.names.get(name)
    }

    pub fn set(&mut self, binding: Binding) {
        self.names.insert(binding.name.clone(), binding);
    }

    pub fn has(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn this_type(&self) -> Option<&TypeRef> {
        self.this_type.as_ref()
    }
}
