//! Expression typing.
//!
//! `infer_expression` derives the type of an expression, optionally guided
//! by the type the surrounding context expects. Function expressions take
//! their signature from that context. Assignments route to the field,
//! prototype and export rules.

use indexmap::IndexMap;
use jsig_ast::node::*;
use jsig_ast::syntax_kind::SyntaxKind;
use jsig_diagnostics::{messages, TypeDiagnostic};
use jsig_types::{builtins, is_builtin_class, FunctionType, TypeNode, TypeRef, ValueKind};
use rustc_hash::FxHashSet;
use std::sync::Arc;

use super::{Checker, ANONYMOUS};

impl<'m> Checker<'m> {
    pub(super) fn infer_expression(&mut self, expr: &Expression<'_>, expected: Option<&TypeRef>) -> TypeRef {
        match expr {
            Expression::Identifier(id) => self.infer_identifier(id),
            Expression::StringLiteral(lit) => {
                let quote = if lit.is_single_quote { '\'' } else { '"' };
                TypeNode::value(format!("{}{}{}", quote, lit.text, quote), ValueKind::String)
            }
            Expression::NumericLiteral(lit) => TypeNode::value(lit.text, ValueKind::Number),
            Expression::RegularExpressionLiteral(_) => TypeNode::literal("RegExp"),
            Expression::ArrayLiteral(node) => self.infer_array_literal(node, expected),
            Expression::ObjectLiteral(node) => self.infer_object_literal(node, expected),
            Expression::PropertyAccess(node) if expr.is_property_access_of("module", "exports") => {
                let line = self.line(node.name.data.range.pos);
                match self.unassigned_export() {
                    Some(declared) => {
                        self.report_missing_export(&declared, line);
                        declared
                    }
                    None => {
                        let object = self.infer_expression(node.expression, None);
                        self.member_type(&object, node.expression, node.name.text, line)
                    }
                }
            }
            Expression::PropertyAccess(node) => {
                let object = self.infer_expression(node.expression, None);
                let line = self.line(node.name.data.range.pos);
                self.member_type(&object, node.expression, node.name.text, line)
            }
            Expression::ElementAccess(node) => {
                self.infer_expression(node.expression, None);
                self.infer_expression(node.argument_expression, None);
                builtins().any()
            }
            Expression::Call(node) => self.infer_call(node),
            Expression::New(node) => self.infer_new(node),
            Expression::Parenthesized(node) => self.infer_expression(node.expression, expected),
            Expression::FunctionExpression(node) => self.check_function(node.as_function_like(), expected, ANONYMOUS),
            Expression::Delete(node) => {
                self.infer_expression(node.expression, None);
                TypeNode::literal("Boolean")
            }
            Expression::TypeOf(node) => {
                // `typeof name` is legal for names that were never declared.
                let unbound = node
                    .expression
                    .as_identifier_text()
                    .map_or(false, |name| self.env.lookup(name).is_none());
                if !unbound {
                    self.infer_expression(node.expression, None);
                }
                TypeNode::literal("String")
            }
            Expression::Void(node) => {
                self.infer_expression(node.expression, None);
                TypeNode::value("undefined", ValueKind::Undefined)
            }
            Expression::PrefixUnary(node) => {
                self.infer_expression(node.operand, None);
                if node.operator == SyntaxKind::ExclamationToken {
                    TypeNode::literal("Boolean")
                } else {
                    TypeNode::literal("Number")
                }
            }
            Expression::PostfixUnary(node) => {
                self.infer_expression(node.operand, None);
                TypeNode::literal("Number")
            }
            Expression::Binary(node) => self.infer_binary(node, expected),
            Expression::Conditional(node) => {
                self.infer_expression(node.condition, None);
                let when_true = self.infer_expression(node.when_true, expected);
                let when_false = self.infer_expression(node.when_false, expected);
                join(vec![when_true, when_false])
            }
            Expression::OmittedExpression(_) => TypeNode::value("undefined", ValueKind::Undefined),
            Expression::ThisKeyword(_) => self.env.this_type().cloned().unwrap_or_else(|| builtins().any()),
            Expression::NullKeyword(_) => TypeNode::value("null", ValueKind::Null),
            Expression::TrueKeyword(_) => TypeNode::value("true", ValueKind::True),
            Expression::FalseKeyword(_) => TypeNode::value("false", ValueKind::False),
        }
    }

    fn infer_identifier(&mut self, id: &Identifier<'_>) -> TypeRef {
        if let Some(binding) = self.env.lookup(id.text) {
            return Arc::clone(&binding.ty);
        }
        let line = self.line(id.data.range.pos);
        self.report(TypeDiagnostic::new(&messages::UNKNOWN_IDENTIFIER, line).with_name(id.text));
        builtins().any()
    }

    /// Check `expr` where a value of type `expected` is required.
    ///
    /// Function expressions are verified against `expected` directly; other
    /// values must be subtypes of it.
    pub(super) fn check_assignment(&mut self, expr: &Expression<'_>, expected: &TypeRef, line: u32, context_name: &str) {
        if let Expression::FunctionExpression(func) = expr.skip_parentheses() {
            self.check_function(func.as_function_like(), Some(expected), context_name);
            return;
        }
        let actual = self.infer_expression(expr, Some(expected));
        let desc = describe_actual(expr, &actual);
        self.check_subtype(&desc, &actual, expected, line);
    }

    // ========================================================================
    // Members
    // ========================================================================

    /// The type of `receiver.field`, where `object` is the receiver's type.
    fn member_type(&mut self, object: &TypeRef, receiver: &Expression<'_>, field: &str, line: u32) -> TypeRef {
        let resolved = self.env.resolve(object);
        match &*resolved {
            TypeNode::Object(o) => match o.field(field) {
                Some(ty) => Arc::clone(ty),
                None => {
                    self.report(
                        TypeDiagnostic::new(&messages::NON_EXISTANT_FIELD, line)
                            .with_field_name(field)
                            .with_obj_name(expression_text(receiver)),
                    );
                    builtins().any()
                }
            },
            TypeNode::Intersection(intersection) => intersection
                .members
                .iter()
                .find_map(|m| self.env.resolve(m).as_object().and_then(|o| o.field(field).cloned()))
                .unwrap_or_else(|| builtins().any()),
            _ if field == "length" && has_length(&resolved) => TypeNode::literal("Number"),
            _ => builtins().any(),
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn infer_call(&mut self, node: &CallExpression<'_>) -> TypeRef {
        let callee = self.infer_expression(node.expression, None);
        let resolved = self.env.resolve(&callee);
        match resolved.as_function() {
            Some(signature) => {
                let line = self.line(node.data.range.pos);
                self.check_call_arguments(signature, node.arguments, &expression_text(node.expression), line);
                Arc::clone(&signature.result)
            }
            None => {
                let any = builtins().any();
                for arg in node.arguments.iter() {
                    self.infer_expression(arg, Some(&any));
                }
                any
            }
        }
    }

    fn infer_new(&mut self, node: &NewExpression<'_>) -> TypeRef {
        let callee = self.infer_expression(node.expression, None);
        let args = node.arguments.unwrap_or(&[]);
        let resolved = self.env.resolve(&callee);
        if let Some(signature) = resolved.as_function() {
            let line = self.line(node.data.range.pos);
            self.check_call_arguments(signature, args, &expression_text(node.expression), line);
            return signature.this_type.clone().unwrap_or_else(|| builtins().any());
        }

        let any = builtins().any();
        for arg in args.iter() {
            self.infer_expression(arg, Some(&any));
        }
        match node.expression.as_identifier_text() {
            Some(name) if is_builtin_class(name) && name != "Any" && name != "void" => TypeNode::literal(name),
            _ => any,
        }
    }

    fn check_call_arguments(&mut self, signature: &FunctionType, args: &[Expression<'_>], callee: &str, line: u32) {
        let expected_args = signature.arity();
        let required = signature
            .params
            .iter()
            .rposition(|p| !p.ty.admits_undefined())
            .map_or(0, |i| i + 1);
        if args.len() > expected_args {
            self.report(
                TypeDiagnostic::new(&messages::TOO_MANY_ARGS_IN_CALL, line)
                    .with_func_name(callee)
                    .with_args(expected_args, args.len()),
            );
        } else if args.len() < required {
            self.report(
                TypeDiagnostic::new(&messages::TOO_FEW_ARGS_IN_CALL, line)
                    .with_func_name(callee)
                    .with_args(expected_args, args.len()),
            );
        }

        for (i, arg) in args.iter().enumerate() {
            let arg_line = self.line(arg.pos());
            match signature.params.get(i) {
                Some(param) => {
                    let context = param.name.as_deref().unwrap_or(ANONYMOUS);
                    self.check_assignment(arg, &param.ty, arg_line, context);
                }
                None => {
                    self.infer_expression(arg, Some(&builtins().any()));
                }
            }
        }
    }

    // ========================================================================
    // Literals
    // ========================================================================

    fn infer_object_literal(&mut self, node: &ObjectLiteralExpression<'_>, expected: Option<&TypeRef>) -> TypeRef {
        let expected = expected.map(|t| self.env.resolve(t));
        let open = expected.as_ref().map_or(false, |t| t.is_any());
        let mut fields = IndexMap::new();
        for property in node.properties.iter() {
            let name = property.name.text();
            let context = match expected.as_ref().and_then(|t| t.as_object()) {
                Some(object) => object.field(name).cloned(),
                None if open => Some(builtins().any()),
                None => None,
            };
            let ty = match (&context, property.initializer.skip_parentheses()) {
                (Some(context), Expression::FunctionExpression(func)) => {
                    self.check_function(func.as_function_like(), Some(context), name)
                }
                _ => self.infer_expression(property.initializer, context.as_ref()),
            };
            fields.insert(name.to_string(), ty.widen());
        }
        TypeNode::object(fields)
    }

    fn infer_array_literal(&mut self, node: &ArrayLiteralExpression<'_>, expected: Option<&TypeRef>) -> TypeRef {
        let resolved = expected.map(|t| self.env.resolve(t));
        let (tuple_items, element) = match resolved.as_deref() {
            Some(TypeNode::Tuple(tuple)) => (Some(tuple.items.clone()), None),
            Some(TypeNode::Generic(generic))
                if generic.base.literal_name() == Some("Array") && generic.args.len() == 1 =>
            {
                (None, Some(Arc::clone(&generic.args[0])))
            }
            _ => (None, None),
        };

        let mut types = Vec::with_capacity(node.elements.len());
        for (i, element_expr) in node.elements.iter().enumerate() {
            let context = match &tuple_items {
                Some(items) => items.get(i).cloned(),
                None => element.clone(),
            };
            types.push(self.infer_expression(element_expr, context.as_ref()));
        }

        if tuple_items.is_some() {
            return TypeNode::tuple(types);
        }
        if types.is_empty() {
            return expected.cloned().unwrap_or_else(|| TypeNode::literal("Array"));
        }
        TypeNode::generic(TypeNode::literal("Array"), vec![join(types)])
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn infer_binary(&mut self, node: &BinaryExpression<'_>, expected: Option<&TypeRef>) -> TypeRef {
        let op = node.operator;
        if op == SyntaxKind::EqualsToken {
            return self.check_assignment_expression(node);
        }
        match op {
            SyntaxKind::AmpersandAmpersandToken | SyntaxKind::BarBarToken => {
                let left = self.infer_expression(node.left, expected);
                let right = self.infer_expression(node.right, expected);
                join(vec![left, right])
            }
            SyntaxKind::CommaToken => {
                self.infer_expression(node.left, None);
                self.infer_expression(node.right, expected)
            }
            SyntaxKind::EqualsEqualsToken
            | SyntaxKind::ExclamationEqualsToken
            | SyntaxKind::EqualsEqualsEqualsToken
            | SyntaxKind::ExclamationEqualsEqualsToken
            | SyntaxKind::LessThanToken
            | SyntaxKind::GreaterThanToken
            | SyntaxKind::LessThanEqualsToken
            | SyntaxKind::GreaterThanEqualsToken
            | SyntaxKind::InKeyword
            | SyntaxKind::InstanceOfKeyword => {
                self.infer_expression(node.left, None);
                self.infer_expression(node.right, None);
                TypeNode::literal("Boolean")
            }
            SyntaxKind::PlusToken | SyntaxKind::PlusEqualsToken => {
                let left = self.infer_expression(node.left, None);
                let right = self.infer_expression(node.right, None);
                if is_string(&left) || is_string(&right) {
                    TypeNode::literal("String")
                } else if left.is_any() || right.is_any() {
                    builtins().any()
                } else {
                    TypeNode::literal("Number")
                }
            }
            _ => {
                self.infer_expression(node.left, None);
                self.infer_expression(node.right, None);
                TypeNode::literal("Number")
            }
        }
    }

    // ========================================================================
    // Assignments
    // ========================================================================

    fn check_assignment_expression(&mut self, node: &BinaryExpression<'_>) -> TypeRef {
        let line = self.line(node.data.range.pos);
        match node.left.skip_parentheses() {
            Expression::Identifier(id) => self.assign_identifier(id, node.right, line),
            Expression::PropertyAccess(target) => self.assign_property(target, node.right, line),
            other => {
                self.infer_expression(other, None);
                self.infer_expression(node.right, Some(&builtins().any()))
            }
        }
    }

    fn assign_identifier(&mut self, id: &Identifier<'_>, value: &Expression<'_>, line: u32) -> TypeRef {
        let declared = self.env.lookup(id.text).map(|b| Arc::clone(&b.ty));
        match declared {
            None => {
                self.report(TypeDiagnostic::new(&messages::UNKNOWN_IDENTIFIER, line).with_name(id.text));
                self.infer_expression(value, Some(&builtins().any()))
            }
            Some(declared) if declared.is_any() => self.infer_expression(value, None),
            Some(declared) => {
                self.check_assignment(value, &declared, line, id.text);
                declared
            }
        }
    }

    fn assign_property(&mut self, target: &PropertyAccessExpression<'_>, value: &Expression<'_>, line: u32) -> TypeRef {
        let object = target.expression.skip_parentheses();
        let field = target.name.text;

        if object.as_identifier_text() == Some("module") && field == "exports" {
            return self.assign_module_exports(value, line);
        }
        if object.is_property_access_of("module", "exports") || object.as_identifier_text() == Some("exports") {
            return self.assign_export_property(field, value, line);
        }
        if let Expression::PropertyAccess(inner) = object {
            if inner.name.text == "prototype" {
                if let Some(ctor) = inner.expression.as_identifier_text() {
                    return self.assign_prototype_field(ctor, field, value, line);
                }
            }
        }

        let object_type = self.infer_expression(object, None);
        let resolved = self.env.resolve(&object_type);
        let Some(fields) = resolved.as_object() else {
            return self.infer_expression(value, Some(&builtins().any()));
        };
        match fields.field(field).cloned() {
            Some(field_type) => {
                self.check_assignment(value, &field_type, line, field);
                field_type
            }
            None => {
                self.report(
                    TypeDiagnostic::new(&messages::NON_EXISTANT_FIELD, line)
                        .with_field_name(field)
                        .with_obj_name(expression_text(object)),
                );
                self.infer_expression(value, Some(&builtins().any()))
            }
        }
    }

    fn assign_prototype_field(&mut self, ctor: &str, field: &str, value: &Expression<'_>, line: u32) -> TypeRef {
        if self.env.lookup(ctor).is_none() {
            self.report(TypeDiagnostic::new(&messages::UNKNOWN_IDENTIFIER, line).with_name(ctor));
        }
        if !self.policy.allow_prototype_after_export && self.exported_ctors.contains(ctor) {
            self.report(
                TypeDiagnostic::new(&messages::PROTOTYPE_ASSIGNMENT_AFTER_EXPORT, line)
                    .with_field_name(field)
                    .with_func_name(ctor),
            );
        }

        let Some(instance) = self.env.instance_type(ctor) else {
            return self.infer_expression(value, None);
        };
        let Some(fields) = instance.as_object() else {
            return self.infer_expression(value, Some(&builtins().any()));
        };
        match fields.field(field).cloned() {
            Some(field_type) => {
                self.check_assignment(value, &field_type, line, field);
                field_type
            }
            None => {
                self.report(
                    TypeDiagnostic::new(&messages::NON_EXISTANT_FIELD, line)
                        .with_field_name(field)
                        .with_obj_name(format!("{}.prototype", ctor)),
                );
                self.infer_expression(value, Some(&builtins().any()))
            }
        }
    }

    fn assign_module_exports(&mut self, value: &Expression<'_>, line: u32) -> TypeRef {
        let derived = match self.declared_export.clone() {
            Some(declared) => {
                self.check_assignment(value, &declared, line, "module.exports");
                declared
            }
            None => self.infer_expression(value, None).widen(),
        };

        if self.module_exports_assigned {
            if !self.policy.allow_export_reassignment {
                let previous = self.meta.module_exports_type.as_ref().map_or_else(|| "Any".to_string(), |t| t.class_name());
                self.report(
                    TypeDiagnostic::new(&messages::REASSIGNING_MODULE_EXPORTS, line)
                        .with_types(previous, derived.class_name()),
                );
            }
        } else {
            self.module_exports_assigned = true;
            self.meta.module_exports_type = Some(TypeNode::module_exports(Arc::clone(&derived)));
        }

        if let Some(name) = value.as_identifier_text() {
            self.on_export(name, line);
        }
        derived
    }

    fn assign_export_property(&mut self, name: &str, value: &Expression<'_>, line: u32) -> TypeRef {
        let declared_object = self.declared_export.as_ref().map(|t| self.env.resolve(t));
        let context = match declared_object.as_ref().and_then(|t| t.as_object()) {
            Some(object) => match object.field(name) {
                Some(ty) => Some(Arc::clone(ty)),
                None => {
                    self.report(
                        TypeDiagnostic::new(&messages::NON_EXISTANT_FIELD, line)
                            .with_field_name(name)
                            .with_obj_name("module.exports"),
                    );
                    Some(builtins().any())
                }
            },
            None => self.env.lookup_in(jsig_binder::ScopeKind::Header, name).map(|b| Arc::clone(&b.ty)),
        };

        let ty = match context {
            Some(context) => {
                self.check_assignment(value, &context, line, name);
                context
            }
            None => self.infer_expression(value, None).widen(),
        };
        self.property_exports.insert(name.to_string(), Arc::clone(&ty));
        if let Some(exported) = value.as_identifier_text() {
            self.on_export(exported, line);
        }
        ty
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// The `actual` side of a mismatch: `"name: Class"` for identifiers, the
/// widened class otherwise.
fn describe_actual(expr: &Expression<'_>, actual: &TypeRef) -> String {
    match expr.as_identifier_text() {
        Some(name) => format!("{}: {}", name, actual.class_name()),
        None => actual.class_name(),
    }
}

/// Source-like text of a receiver expression, for diagnostics.
pub(crate) fn expression_text(expr: &Expression<'_>) -> String {
    match expr {
        Expression::Identifier(id) => id.text.to_string(),
        Expression::ThisKeyword(_) => "this".to_string(),
        Expression::PropertyAccess(node) => format!("{}.{}", expression_text(node.expression), node.name.text),
        Expression::ElementAccess(node) => format!("{}[]", expression_text(node.expression)),
        Expression::Call(node) => format!("{}()", expression_text(node.expression)),
        Expression::Parenthesized(node) => expression_text(node.expression),
        Expression::FunctionExpression(_) => "function".to_string(),
        _ => "(expression)".to_string(),
    }
}

fn is_string(ty: &TypeRef) -> bool {
    ty.widen().literal_name() == Some("String")
}

fn has_length(ty: &TypeNode) -> bool {
    match ty {
        TypeNode::Value(v) => v.kind == ValueKind::String,
        TypeNode::Literal(lit) => lit.builtin && (lit.name == "String" || lit.name == "Array"),
        TypeNode::Generic(g) => g.base.literal_name() == Some("Array"),
        TypeNode::Tuple(_) => true,
        _ => false,
    }
}

/// The least specific description of several inferred types: values widen,
/// duplicates collapse, and `Any` absorbs everything.
fn join(types: Vec<TypeRef>) -> TypeRef {
    let mut seen = FxHashSet::default();
    let mut members = Vec::with_capacity(types.len());
    for ty in types {
        let ty = ty.widen();
        if ty.is_any() {
            return ty;
        }
        if seen.insert(ty.to_source()) {
            members.push(ty);
        }
    }
    TypeNode::union(members)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_widens_and_deduplicates() {
        let joined = join(vec![
            TypeNode::value("1", ValueKind::Number),
            TypeNode::literal("Number"),
            TypeNode::value("'a'", ValueKind::String),
        ]);
        assert_eq!(joined.to_source(), "Number | String");
        assert!(join(vec![TypeNode::literal("String"), TypeNode::literal("Any")]).is_any());
        assert_eq!(join(vec![TypeNode::literal("Number")]).to_source(), "Number");
    }

    #[test]
    fn test_has_length() {
        assert!(has_length(&TypeNode::literal("String")));
        assert!(has_length(&TypeNode::generic(TypeNode::literal("Array"), vec![TypeNode::literal("Number")])));
        assert!(!has_length(&TypeNode::literal("Number")));
    }
}
