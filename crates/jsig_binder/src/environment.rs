//! The type environment.
//!
//! A stack of [`Scope`]s plus a table of type aliases. The bottom scope is
//! the global scope, pre-populated from the builtin registry; it is never
//! popped.

use jsig_types::{
    builtins, FunctionType, GenericType, IntersectionType, ModuleExportsType, ObjectType, Param,
    TupleType, TypeNode, TypeRef, UnionType,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::scope::{Binding, Scope, ScopeKind};

/// A named type, possibly generic over `params`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAlias {
    pub params: Vec<String>,
    pub ty: TypeRef,
}

#[derive(Debug)]
pub struct TypeEnvironment {
    scopes: Vec<Scope>,
    aliases: FxHashMap<String, TypeAlias>,
}

impl Default for TypeEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeEnvironment {
    /// Alias chains longer than this are treated as unresolvable.
    const MAX_ALIAS_DEPTH: u32 = 64;

    pub fn new() -> Self {
        let mut global = Scope::new(ScopeKind::Global);
        for (name, ty) in builtins().globals() {
            global.set(Binding { name: name.to_string(), ty: Arc::clone(ty), line: 0 });
        }
        Self { scopes: vec![global], aliases: FxHashMap::default() }
    }

    // ========================================================================
    // Scope management
    // ========================================================================

    pub fn push_scope(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope::new(kind));
    }

    pub fn push_function_scope(&mut self, this_type: Option<TypeRef>) {
        self.scopes.push(Scope::function(this_type));
    }

    /// Pop the innermost scope. The global scope stays.
    pub fn pop_scope(&mut self) -> Option<Scope> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    pub fn current_kind(&self) -> ScopeKind {
        self.current().kind
    }

    fn current(&self) -> &Scope {
        // The global scope is never popped.
        &self.scopes[self.scopes.len() - 1]
    }

    // ========================================================================
    // Bindings
    // ========================================================================

    /// Bind `name` in the innermost scope.
    ///
    /// Redeclaring a name in the same scope succeeds only with an identical
    /// type; otherwise the existing binding is returned.
    pub fn declare(&mut self, name: &str, ty: TypeRef, line: u32) -> Result<(), Binding> {
        let index = self.scopes.len() - 1;
        self.declare_at(index, name, ty, line)
    }

    /// Bind `name` in the nearest function, module, header or global scope,
    /// the way `var` and function declarations hoist out of blocks.
    pub fn declare_var(&mut self, name: &str, ty: TypeRef, line: u32) -> Result<(), Binding> {
        let index = self
            .scopes
            .iter()
            .rposition(|s| s.kind != ScopeKind::Block)
            .unwrap_or(0);
        self.declare_at(index, name, ty, line)
    }

    fn declare_at(&mut self, index: usize, name: &str, ty: TypeRef, line: u32) -> Result<(), Binding> {
        let scope = &mut self.scopes[index];
        if let Some(existing) = scope.get(name) {
            if *existing.ty == *ty {
                return Ok(());
            }
            return Err(existing.clone());
        }
        scope.set(Binding { name: name.to_string(), ty, line });
        Ok(())
    }

    /// Replace the type bound to `name` in the scope that holds it.
    ///
    /// Used to narrow an untyped variable once its first value is known.
    pub fn rebind(&mut self, name: &str, ty: TypeRef) -> bool {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(existing) = scope.get(name) {
                let line = existing.line;
                scope.set(Binding { name: name.to_string(), ty, line });
                return true;
            }
        }
        false
    }

    /// The nearest binding of `name`, innermost scope first.
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    /// The binding of `name` in the innermost scope only.
    pub fn lookup_local(&self, name: &str) -> Option<&Binding> {
        self.current().get(name)
    }

    /// The binding of `name` in the nearest scope of `kind`.
    pub fn lookup_in(&self, kind: ScopeKind, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find(|s| s.kind == kind).and_then(|s| s.get(name))
    }

    /// The `this` type of the nearest function scope.
    pub fn this_type(&self) -> Option<&TypeRef> {
        self.scopes
            .iter()
            .rev()
            .find(|s| s.kind == ScopeKind::Function)
            .and_then(|s| s.this_type())
    }

    // ========================================================================
    // Type aliases
    // ========================================================================

    /// Define a type alias. An existing alias with a different definition is
    /// returned unchanged.
    pub fn define_alias(&mut self, name: &str, params: Vec<String>, ty: TypeRef) -> Result<(), TypeAlias> {
        let alias = TypeAlias { params, ty };
        if let Some(existing) = self.aliases.get(name) {
            if *existing == alias {
                return Ok(());
            }
            return Err(existing.clone());
        }
        self.aliases.insert(name.to_string(), alias);
        Ok(())
    }

    pub fn alias(&self, name: &str) -> Option<&TypeAlias> {
        self.aliases.get(name)
    }

    /// Expand user-named and generic references through the alias table.
    ///
    /// Builtin literals, structural types and unknown names come back as
    /// they are. Renamed literals resolve through their original name.
    pub fn resolve(&self, ty: &TypeRef) -> TypeRef {
        let mut current = Arc::clone(ty);
        for _ in 0..Self::MAX_ALIAS_DEPTH {
            let next = match &*current {
                TypeNode::Literal(lit) if !lit.builtin => self.plain_alias(&lit.name),
                TypeNode::Renamed(renamed) => self.plain_alias(&renamed.original.name),
                TypeNode::Generic(generic) => generic
                    .base
                    .literal_name()
                    .and_then(|name| self.aliases.get(name))
                    .filter(|alias| alias.params.len() == generic.args.len())
                    .map(|alias| substitute(&alias.ty, &alias.params, &generic.args)),
                TypeNode::ModuleExports(m) => Some(Arc::clone(&m.value)),
                _ => None,
            };
            match next {
                Some(next) => current = next,
                None => return current,
            }
        }
        current
    }

    fn plain_alias(&self, name: &str) -> Option<TypeRef> {
        self.aliases
            .get(name)
            .filter(|alias| alias.params.is_empty())
            .map(|alias| Arc::clone(&alias.ty))
    }

    /// The instance type of constructor `ctor`: the resolved `this` type of
    /// its declared signature, or an alias of the same name.
    pub fn instance_type(&self, ctor: &str) -> Option<TypeRef> {
        let declared = self
            .lookup(ctor)
            .and_then(|b| b.ty.as_function())
            .and_then(|f| f.this_type.clone());
        match declared {
            Some(this_type) => Some(self.resolve(&this_type)),
            None => self.alias(ctor).filter(|a| a.params.is_empty()).map(|a| Arc::clone(&a.ty)),
        }
    }
}

/// Replace references to the type parameters `params` inside `ty` with the
/// matching `args`.
pub fn substitute(ty: &TypeRef, params: &[String], args: &[TypeRef]) -> TypeRef {
    let sub = |t: &TypeRef| substitute(t, params, args);
    match &**ty {
        TypeNode::Literal(lit) if !lit.builtin => match params.iter().position(|p| *p == lit.name) {
            Some(i) => args.get(i).cloned().unwrap_or_else(|| Arc::clone(ty)),
            None => Arc::clone(ty),
        },
        TypeNode::Literal(_) | TypeNode::Value(_) | TypeNode::Renamed(_) => Arc::clone(ty),
        TypeNode::Function(f) => Arc::new(TypeNode::Function(FunctionType {
            params: f.params.iter().map(|p| Param::new(p.name.clone(), sub(&p.ty))).collect(),
            result: sub(&f.result),
            this_type: f.this_type.as_ref().map(sub),
        })),
        TypeNode::Object(o) => Arc::new(TypeNode::Object(ObjectType {
            fields: o.fields.iter().map(|(k, v)| (k.clone(), sub(v))).collect(),
        })),
        TypeNode::Union(u) => Arc::new(TypeNode::Union(UnionType { members: u.members.iter().map(sub).collect() })),
        TypeNode::Intersection(i) => Arc::new(TypeNode::Intersection(IntersectionType {
            members: i.members.iter().map(sub).collect(),
        })),
        TypeNode::Generic(g) => Arc::new(TypeNode::Generic(GenericType {
            base: sub(&g.base),
            args: g.args.iter().map(sub).collect(),
        })),
        TypeNode::Tuple(t) => Arc::new(TypeNode::Tuple(TupleType { items: t.items.iter().map(sub).collect() })),
        TypeNode::ModuleExports(m) => Arc::new(TypeNode::ModuleExports(ModuleExportsType { value: sub(&m.value) })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsig_types::ValueKind;

    fn lit(name: &str) -> TypeRef {
        TypeNode::literal(name)
    }

    #[test]
    fn test_globals_are_bound() {
        let env = TypeEnvironment::new();
        assert!(env.lookup("require").is_some());
        assert_eq!(env.lookup("module").map(|b| b.line), Some(0));
        assert!(env.lookup("nope").is_none());
    }

    #[test]
    fn test_scope_management() {
        let mut env = TypeEnvironment::new();
        assert_eq!(env.current_kind(), ScopeKind::Global);
        env.push_scope(ScopeKind::Module);
        env.push_function_scope(None);
        assert_eq!(env.current_kind(), ScopeKind::Function);
        assert!(env.pop_scope().is_some());
        assert!(env.pop_scope().is_some());
        assert!(env.pop_scope().is_none());
        assert_eq!(env.current_kind(), ScopeKind::Global);
    }

    #[test]
    fn test_lookup_walks_outward() {
        let mut env = TypeEnvironment::new();
        env.push_scope(ScopeKind::Module);
        env.declare("a", lit("String"), 1).unwrap();
        env.push_function_scope(None);
        env.declare("a", lit("Number"), 5).unwrap();
        assert_eq!(env.lookup("a").map(|b| b.line), Some(5));
        env.pop_scope();
        assert_eq!(env.lookup("a").map(|b| b.line), Some(1));
        assert!(env.lookup_in(ScopeKind::Header, "a").is_none());
        assert_eq!(env.lookup_in(ScopeKind::Module, "a").map(|b| b.line), Some(1));
    }

    #[test]
    fn test_redeclaration() {
        let mut env = TypeEnvironment::new();
        env.push_scope(ScopeKind::Module);
        env.declare("a", lit("String"), 1).unwrap();
        assert!(env.declare("a", lit("String"), 2).is_ok());
        let existing = env.declare("a", lit("Number"), 3).unwrap_err();
        assert_eq!(existing.line, 1);
        assert_eq!(existing.ty.literal_name(), Some("String"));
    }

    #[test]
    fn test_declare_var_hoists_out_of_blocks() {
        let mut env = TypeEnvironment::new();
        env.push_function_scope(None);
        env.push_scope(ScopeKind::Block);
        env.declare_var("x", lit("Number"), 3).unwrap();
        env.pop_scope();
        assert!(env.lookup_local("x").is_some());
    }

    #[test]
    fn test_this_type_comes_from_nearest_function() {
        let mut env = TypeEnvironment::new();
        env.push_function_scope(Some(lit("Outer")));
        env.push_scope(ScopeKind::Block);
        assert_eq!(env.this_type().and_then(|t| t.literal_name()), Some("Outer"));
        env.push_function_scope(None);
        assert!(env.this_type().is_none());
    }

    #[test]
    fn test_resolve_aliases() {
        let mut env = TypeEnvironment::new();
        env.define_alias("Id", vec![], lit("String")).unwrap();
        env.define_alias("Key", vec![], lit("Id")).unwrap();
        assert_eq!(env.resolve(&lit("Key")).literal_name(), Some("String"));
        assert_eq!(env.resolve(&lit("Unknown")).literal_name(), Some("Unknown"));
        assert_eq!(env.resolve(&lit("Number")).literal_name(), Some("Number"));
    }

    #[test]
    fn test_resolve_generic_alias() {
        let mut env = TypeEnvironment::new();
        let callback = TypeNode::function(
            vec![Param::new(Some("value".into()), lit("T"))],
            lit("void"),
            None,
        );
        env.define_alias("Callback", vec!["T".into()], callback).unwrap();
        let applied = TypeNode::generic(lit("Callback"), vec![lit("Number")]);
        assert_eq!(env.resolve(&applied).to_source(), "(value: Number) => void");
    }

    #[test]
    fn test_recursive_alias_terminates() {
        let mut env = TypeEnvironment::new();
        env.define_alias("A", vec![], lit("B")).unwrap();
        env.define_alias("B", vec![], lit("A")).unwrap();
        let resolved = env.resolve(&lit("A"));
        assert!(resolved.literal_name().is_some());
    }

    #[test]
    fn test_instance_type() {
        let mut env = TypeEnvironment::new();
        let fields = [("x".to_string(), TypeNode::value("1", ValueKind::Number))].into_iter().collect();
        env.define_alias("Point", vec![], TypeNode::object(fields)).unwrap();
        env.push_scope(ScopeKind::Module);
        let ctor = TypeNode::function(vec![], lit("void"), Some(lit("Point")));
        env.declare("Point", ctor, 1).unwrap();
        let instance = env.instance_type("Point").unwrap();
        assert!(instance.as_object().unwrap().field("x").is_some());
    }
}
