//! Structural subtyping between signature types.
//!
//! `Any` fits everything both ways. Literal values widen to their class,
//! renamed literals are transparent, user names resolve through the
//! environment's aliases, and objects use width subtyping. There is no
//! numeric or string coercion.

use jsig_binder::TypeEnvironment;
use jsig_types::{FunctionType, TypeNode, TypeRef, ValueKind};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::trace;

/// Why an actual type does not fit an expected one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub expected: String,
    pub actual: String,
    /// Field names and parameter positions leading to the failing pair,
    /// outermost first.
    pub path: Vec<String>,
}

impl Mismatch {
    fn new(actual: &TypeNode, expected: &TypeNode) -> Self {
        Self { expected: expected.class_name(), actual: actual.class_name(), path: Vec::new() }
    }

    fn within(mut self, segment: impl Into<String>) -> Self {
        self.path.insert(0, segment.into());
        self
    }
}

/// Check that `actual` can be used where `expected` is required.
pub fn is_subtype(env: &TypeEnvironment, actual: &TypeRef, expected: &TypeRef) -> Result<(), Mismatch> {
    SubtypeChecker::new(env).check(actual, expected)
}

pub struct SubtypeChecker<'e> {
    env: &'e TypeEnvironment,
    /// Pairs of alias expansions currently under comparison.
    assumed: FxHashSet<(String, String)>,
}

impl<'e> SubtypeChecker<'e> {
    pub fn new(env: &'e TypeEnvironment) -> Self {
        Self { env, assumed: FxHashSet::default() }
    }

    pub fn check(&mut self, actual: &TypeRef, expected: &TypeRef) -> Result<(), Mismatch> {
        trace!(actual = %actual, expected = %expected, "subtype");
        if actual.is_any() || expected.is_any() {
            return Ok(());
        }

        match (&**actual, &**expected) {
            (TypeNode::ModuleExports(m), _) => return self.check(&m.value, expected),
            (_, TypeNode::ModuleExports(m)) => return self.check(actual, &m.value),
            (TypeNode::Value(a), TypeNode::Value(e)) => {
                return if a == e { Ok(()) } else { Err(Mismatch::new(actual, expected)) };
            }
            (TypeNode::Union(union), _) => {
                for member in &union.members {
                    self.check(member, expected).map_err(|_| Mismatch::new(actual, expected))?;
                }
                return Ok(());
            }
            (_, TypeNode::Union(union)) => {
                return if union.members.iter().any(|m| self.check(actual, m).is_ok()) {
                    Ok(())
                } else {
                    Err(Mismatch::new(actual, expected))
                };
            }
            (_, TypeNode::Intersection(intersection)) => {
                for member in &intersection.members {
                    self.check(actual, member)?;
                }
                return Ok(());
            }
            (TypeNode::Intersection(intersection), _) => {
                return if intersection.members.iter().any(|m| self.check(m, expected).is_ok()) {
                    Ok(())
                } else {
                    Err(Mismatch::new(actual, expected))
                };
            }
            (TypeNode::Value(value), _) => {
                if value.kind == ValueKind::Undefined && expected.is_void() {
                    return Ok(());
                }
                return self.check(&actual.widen(), expected).map_err(|_| Mismatch::new(actual, expected));
            }
            (TypeNode::Renamed(renamed), _) => {
                let original = Arc::new(TypeNode::Literal(renamed.original.clone()));
                return self.check(&original, expected).map_err(|_| Mismatch::new(actual, expected));
            }
            (_, TypeNode::Renamed(renamed)) => {
                let original = Arc::new(TypeNode::Literal(renamed.original.clone()));
                return self.check(actual, &original).map_err(|_| Mismatch::new(actual, expected));
            }
            (TypeNode::Literal(a), TypeNode::Literal(e)) if a == e => return Ok(()),
            _ => {}
        }

        // User names expand through the alias table before any structural
        // comparison.
        let resolved_actual = self.env.resolve(actual);
        let resolved_expected = self.env.resolve(expected);
        if !Arc::ptr_eq(&resolved_actual, actual) || !Arc::ptr_eq(&resolved_expected, expected) {
            let key = (resolved_actual.to_source(), resolved_expected.to_source());
            if self.assumed.contains(&key) {
                return Ok(());
            }
            // The assumption only holds while this pair is being compared;
            // a failed attempt must not satisfy a later identical one.
            self.assumed.insert(key.clone());
            let result = self.check(&resolved_actual, &resolved_expected);
            self.assumed.remove(&key);
            return result
                .map_err(|m| Mismatch { expected: expected.class_name(), actual: actual.class_name(), path: m.path });
        }

        self.check_structural(actual, expected)
    }

    fn check_structural(&mut self, actual: &TypeRef, expected: &TypeRef) -> Result<(), Mismatch> {
        let mismatch = || Mismatch::new(actual, expected);
        match (&**actual, &**expected) {
            (TypeNode::Object(a), TypeNode::Object(e)) => {
                for (name, expected_field) in &e.fields {
                    let actual_field = a.field(name).ok_or_else(|| mismatch().within(name.as_str()))?;
                    self.check(actual_field, expected_field).map_err(|m| m.within(name.as_str()))?;
                }
                Ok(())
            }
            (TypeNode::Function(a), TypeNode::Function(e)) => self.check_function(a, e).map_err(|m| Mismatch {
                expected: expected.class_name(),
                actual: actual.class_name(),
                path: m.path,
            }),
            (TypeNode::Generic(a), TypeNode::Generic(e)) => {
                if a.base.literal_name() != e.base.literal_name() || a.args.len() != e.args.len() {
                    return Err(mismatch());
                }
                for (i, (actual_arg, expected_arg)) in a.args.iter().zip(&e.args).enumerate() {
                    self.check(actual_arg, expected_arg).map_err(|m| m.within(format!("<{}>", i)))?;
                }
                Ok(())
            }
            (TypeNode::Tuple(a), TypeNode::Tuple(e)) => {
                if a.items.len() != e.items.len() {
                    return Err(mismatch());
                }
                for (i, (actual_item, expected_item)) in a.items.iter().zip(&e.items).enumerate() {
                    self.check(actual_item, expected_item).map_err(|m| m.within(format!("[{}]", i)))?;
                }
                Ok(())
            }
            (TypeNode::Tuple(a), TypeNode::Generic(e)) if is_builtin_named(&e.base, "Array") && e.args.len() == 1 => {
                for (i, item) in a.items.iter().enumerate() {
                    self.check(item, &e.args[0]).map_err(|m| m.within(format!("[{}]", i)))?;
                }
                Ok(())
            }
            // A raw Array or Object accepts any instantiation, and an
            // instantiation accepts a raw value of its base.
            (TypeNode::Generic(a), TypeNode::Literal(_)) if same_builtin(&a.base, expected) => Ok(()),
            (TypeNode::Literal(_), TypeNode::Generic(e)) if same_builtin(actual, &e.base) => Ok(()),
            (TypeNode::Tuple(_), TypeNode::Literal(_)) if is_builtin_named(expected, "Array") => Ok(()),
            (TypeNode::Object(_) | TypeNode::Generic(_) | TypeNode::Tuple(_), TypeNode::Literal(_))
                if is_builtin_named(expected, "Object") =>
            {
                Ok(())
            }
            (TypeNode::Function(_), TypeNode::Literal(_)) if is_builtin_named(expected, "Function") => Ok(()),
            _ => Err(mismatch()),
        }
    }

    fn check_function(&mut self, actual: &FunctionType, expected: &FunctionType) -> Result<(), Mismatch> {
        if actual.arity() != expected.arity() {
            return Err(Mismatch {
                expected: format!("{} argument(s)", expected.arity()),
                actual: format!("{} argument(s)", actual.arity()),
                path: Vec::new(),
            });
        }
        if let (Some(actual_this), Some(expected_this)) = (&actual.this_type, &expected.this_type) {
            self.check(expected_this, actual_this).map_err(|m| m.within("this"))?;
        }
        for (i, (actual_param, expected_param)) in actual.params.iter().zip(&expected.params).enumerate() {
            let segment = expected_param.name.clone().unwrap_or_else(|| format!("arg{}", i));
            self.check(&expected_param.ty, &actual_param.ty).map_err(|m| m.within(segment))?;
        }
        // A callback declared to return nothing may return anything.
        if expected.result.is_void() {
            return Ok(());
        }
        self.check(&actual.result, &expected.result).map_err(|m| m.within("return"))
    }
}

fn is_builtin_named(ty: &TypeNode, name: &str) -> bool {
    matches!(ty, TypeNode::Literal(lit) if lit.builtin && lit.name == name)
}

fn same_builtin(a: &TypeNode, b: &TypeNode) -> bool {
    match (a, b) {
        (TypeNode::Literal(a), TypeNode::Literal(b)) => {
            a.builtin && a == b && (a.name == "Array" || a.name == "Object")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsig_binder::ScopeKind;
    use jsig_types::Param;

    fn lit(name: &str) -> TypeRef {
        TypeNode::literal(name)
    }

    fn object(fields: &[(&str, TypeRef)]) -> TypeRef {
        TypeNode::object(fields.iter().map(|(k, v)| (k.to_string(), Arc::clone(v))).collect())
    }

    fn check(actual: &TypeRef, expected: &TypeRef) -> Result<(), Mismatch> {
        is_subtype(&TypeEnvironment::new(), actual, expected)
    }

    #[test]
    fn test_any_is_compatible_both_ways() {
        assert!(check(&lit("Any"), &lit("Number")).is_ok());
        assert!(check(&lit("String"), &lit("Any")).is_ok());
    }

    #[test]
    fn test_literal_names_and_values() {
        assert!(check(&lit("Number"), &lit("Number")).is_ok());
        let err = check(&lit("String"), &lit("Number")).unwrap_err();
        assert_eq!((err.expected.as_str(), err.actual.as_str()), ("Number", "String"));

        let forty_two = TypeNode::value("42", ValueKind::Number);
        assert!(check(&forty_two, &lit("Number")).is_ok());
        assert!(check(&forty_two, &TypeNode::value("42", ValueKind::Number)).is_ok());
        assert!(check(&forty_two, &TypeNode::value("43", ValueKind::Number)).is_err());
        assert!(check(&lit("Number"), &forty_two).is_err());
    }

    #[test]
    fn test_value_fits_union_of_values() {
        let methods = TypeNode::union(vec![
            TypeNode::value("'GET'", ValueKind::String),
            TypeNode::value("'POST'", ValueKind::String),
        ]);
        assert!(check(&TypeNode::value("'GET'", ValueKind::String), &methods).is_ok());
        assert!(check(&TypeNode::value("'PUT'", ValueKind::String), &methods).is_err());
        assert!(check(&lit("String"), &methods).is_err());
    }

    #[test]
    fn test_unions() {
        let nullable = TypeNode::union(vec![lit("Error"), TypeNode::value("null", ValueKind::Null)]);
        assert!(check(&TypeNode::value("null", ValueKind::Null), &nullable).is_ok());
        assert!(check(&lit("Error"), &nullable).is_ok());
        assert!(check(&nullable, &lit("Error")).is_err());
    }

    #[test]
    fn test_intersections() {
        let a = object(&[("a", lit("Number"))]);
        let b = object(&[("b", lit("String"))]);
        let both = object(&[("a", lit("Number")), ("b", lit("String"))]);
        let expected = TypeNode::intersection(vec![a.clone(), b]);
        assert!(check(&both, &expected).is_ok());
        assert!(check(&a, &expected).is_err());
        assert!(check(&expected, &a).is_ok());
    }

    #[test]
    fn test_object_width_subtyping() {
        let wide = object(&[("a", lit("Number")), ("b", lit("String"))]);
        let narrow = object(&[("a", lit("Number"))]);
        assert!(check(&wide, &narrow).is_ok());
        let err = check(&narrow, &wide).unwrap_err();
        assert_eq!(err.path, vec!["b".to_string()]);
    }

    #[test]
    fn test_functions() {
        let f = |params: Vec<TypeRef>, result: &str| {
            TypeNode::function(params.into_iter().map(|t| Param::new(None, t)).collect(), lit(result), None)
        };
        assert!(check(&f(vec![lit("Number")], "String"), &f(vec![lit("Number")], "String")).is_ok());
        assert!(check(&f(vec![lit("Number")], "String"), &f(vec![], "String")).is_err());
        assert!(check(&f(vec![lit("Number")], "String"), &f(vec![lit("String")], "String")).is_err());
        assert!(check(&f(vec![lit("Any")], "String"), &f(vec![lit("Number")], "String")).is_ok());
        assert!(check(&f(vec![], "Number"), &f(vec![], "void")).is_ok());
        assert!(check(&f(vec![], "Number"), &lit("Function")).is_ok());
    }

    #[test]
    fn test_generics_and_tuples() {
        let numbers = TypeNode::generic(lit("Array"), vec![lit("Number")]);
        let strings = TypeNode::generic(lit("Array"), vec![lit("String")]);
        assert!(check(&numbers, &numbers.clone()).is_ok());
        assert!(check(&numbers, &strings).is_err());
        assert!(check(&numbers, &lit("Array")).is_ok());

        let pair = TypeNode::tuple(vec![lit("Number"), lit("Number")]);
        assert!(check(&pair, &numbers).is_ok());
        assert!(check(&pair, &strings).is_err());
        assert!(check(&pair, &TypeNode::tuple(vec![lit("Number")])).is_err());
    }

    #[test]
    fn test_renamed_literal_is_transparent() {
        assert!(check(&TypeNode::renamed("Str", "String"), &lit("String")).is_ok());
        assert!(check(&lit("String"), &TypeNode::renamed("Str", "String")).is_ok());
        let err = check(&TypeNode::renamed("Str", "String"), &lit("Number")).unwrap_err();
        assert_eq!(err.actual, "Str");
    }

    #[test]
    fn test_user_names_resolve_through_aliases() {
        let mut env = TypeEnvironment::new();
        env.push_scope(ScopeKind::Header);
        env.define_alias("Point", vec![], object(&[("x", lit("Number"))])).unwrap();
        let point = object(&[("x", lit("Number")), ("y", lit("Number"))]);
        assert!(is_subtype(&env, &point, &lit("Point")).is_ok());
        assert!(is_subtype(&env, &lit("Point"), &point).is_err());
        assert!(is_subtype(&env, &lit("Point"), &lit("Other")).is_err());
    }

    #[test]
    fn test_recursive_aliases_terminate() {
        let mut env = TypeEnvironment::new();
        env.define_alias("List", vec![], object(&[("next", lit("List"))])).unwrap();
        env.define_alias("Chain", vec![], object(&[("next", lit("Chain"))])).unwrap();
        assert!(is_subtype(&env, &lit("List"), &lit("Chain")).is_ok());
    }

    #[test]
    fn test_failed_alias_pair_is_not_assumed_later() {
        let mut env = TypeEnvironment::new();
        env.define_alias("P", vec![], object(&[("x", lit("Number"))])).unwrap();
        env.define_alias("Q", vec![], object(&[("x", lit("String"))])).unwrap();
        assert!(is_subtype(&env, &lit("P"), &lit("Q")).is_err());

        let actual = object(&[("f", lit("P")), ("g", lit("P"))]);
        let expected = TypeNode::union(vec![object(&[("f", lit("Q"))]), object(&[("g", lit("Q"))])]);
        assert!(is_subtype(&env, &actual, &expected).is_err());

        let both = TypeNode::intersection(vec![object(&[("f", lit("P"))]), object(&[("f", lit("P"))])]);
        assert!(is_subtype(&env, &both, &object(&[("f", lit("Q"))])).is_err());
    }
}
