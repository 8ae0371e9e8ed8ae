//! The builtin registry.
//!
//! A process-wide table of builtin classes and typed globals, built once on
//! first use and shared read-only by every verification thread.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::node::*;

/// Names of the builtin classes.
pub const BUILTIN_CLASSES: &[&str] = &[
    "String", "Number", "Boolean", "Object", "Array", "Function", "Error", "RegExp", "Date", "void",
    "Any",
];

/// Whether `name` is a builtin class.
pub fn is_builtin_class(name: &str) -> bool {
    BUILTIN_CLASSES.contains(&name)
}

static REGISTRY: Lazy<BuiltinRegistry> = Lazy::new(BuiltinRegistry::new);

/// The shared builtin registry.
pub fn builtins() -> &'static BuiltinRegistry {
    &REGISTRY
}

#[derive(Debug)]
pub struct BuiltinRegistry {
    classes: FxHashMap<&'static str, TypeRef>,
    globals: IndexMap<&'static str, TypeRef>,
}

impl BuiltinRegistry {
    fn new() -> Self {
        let classes: FxHashMap<&'static str, TypeRef> = BUILTIN_CLASSES
            .iter()
            .map(|&name| (name, Arc::new(TypeNode::Literal(LiteralType::new(name, true)))))
            .collect();

        let class = |name: &str| -> TypeRef {
            match classes.get(name) {
                Some(ty) => Arc::clone(ty),
                None => Arc::new(TypeNode::Literal(LiteralType::new(name, false))),
            }
        };
        let func = |params: Vec<TypeRef>, result: TypeRef| -> TypeRef {
            TypeNode::function(params.into_iter().map(|ty| Param::new(None, ty)).collect(), result, None)
        };
        let object = |fields: Vec<(&str, TypeRef)>| -> TypeRef {
            TypeNode::object(fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
        };

        let any = class("Any");
        let mut globals: IndexMap<&'static str, TypeRef> = IndexMap::new();

        // CommonJS
        globals.insert("module", object(vec![("exports", any.clone())]));
        globals.insert("exports", any.clone());
        globals.insert("require", func(vec![class("String")], any.clone()));

        // Host objects with open-ended shapes
        for name in ["console", "process", "Math", "Buffer", "setTimeout", "setInterval", "parseInt", "global", "arguments"] {
            globals.insert(name, any.clone());
        }
        globals.insert(
            "JSON",
            object(vec![
                ("parse", func(vec![class("String")], any.clone())),
                ("stringify", func(vec![any.clone()], class("String"))),
            ]),
        );
        globals.insert("clearTimeout", func(vec![any.clone()], class("void")));
        globals.insert("clearInterval", func(vec![any.clone()], class("void")));
        globals.insert("parseFloat", func(vec![class("String")], class("Number")));
        globals.insert("isNaN", func(vec![any.clone()], class("Boolean")));

        // Constant values
        globals.insert("undefined", TypeNode::value("undefined", ValueKind::Undefined));
        globals.insert("NaN", class("Number"));
        globals.insert("Infinity", class("Number"));

        // Builtin classes are also callable constructors
        for &name in BUILTIN_CLASSES {
            if name != "void" && name != "Any" {
                globals.insert(name, any.clone());
            }
        }

        Self { classes, globals }
    }

    /// The shared literal node of a builtin class.
    pub fn class(&self, name: &str) -> Option<TypeRef> {
        self.classes.get(name).cloned()
    }

    /// The builtin `Any` type.
    pub fn any(&self) -> TypeRef {
        self.class_or_user("Any")
    }

    /// The builtin `void` type.
    pub fn void(&self) -> TypeRef {
        self.class_or_user("void")
    }

    fn class_or_user(&self, name: &str) -> TypeRef {
        self.class(name)
            .unwrap_or_else(|| Arc::new(TypeNode::Literal(LiteralType::new(name, false))))
    }

    /// The type of a global value.
    pub fn global(&self, name: &str) -> Option<&TypeRef> {
        self.globals.get(name)
    }

    /// Every global value in registration order.
    pub fn globals(&self) -> impl Iterator<Item = (&'static str, &TypeRef)> {
        self.globals.iter().map(|(name, ty)| (*name, ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_classes() {
        assert!(is_builtin_class("String"));
        assert!(is_builtin_class("void"));
        assert!(!is_builtin_class("BatchClient"));
        assert!(builtins().any().is_any());
        assert!(builtins().void().is_void());
    }

    #[test]
    fn test_class_nodes_are_shared() {
        let a = builtins().class("Number").unwrap();
        let b = builtins().class("Number").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_globals() {
        let require = builtins().global("require").unwrap();
        assert_eq!(require.to_source(), "(String) => Any");
        assert!(builtins().global("module").unwrap().as_object().unwrap().field("exports").is_some());
        assert!(builtins().global("console").unwrap().is_any());
        assert!(builtins().global("window").is_none());
    }
}
