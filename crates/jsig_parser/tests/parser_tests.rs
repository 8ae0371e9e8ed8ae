//! Parser integration tests.
//!
//! Verifies that the parser builds the expected AST structures from JavaScript source.

use bumpalo::Bump;
use jsig_ast::node::*;
use jsig_ast::syntax_kind::SyntaxKind;
use jsig_ast::types::NodeFlags;
use jsig_parser::Parser;

/// Helper: parse source text and return the number of top-level statements.
fn parse(source: &str) -> usize {
    let arena = Bump::new();
    let result = Parser::new(&arena, "test.js", source).parse_source_file();
    assert!(result.errors.is_empty(), "unexpected errors for {:?}: {:?}", source, result.errors);
    result.source_file.statements.len()
}

/// Helper: assert that parsing produces the expected number of top-level statements.
fn assert_statement_count(source: &str, expected: usize) {
    assert_eq!(parse(source), expected, "source: {}", source);
}

/// Helper: count syntax errors.
fn error_count(source: &str) -> usize {
    let arena = Bump::new();
    Parser::new(&arena, "test.js", source).parse_source_file().errors.len()
}

// ============================================================================
// Variable Declarations
// ============================================================================

#[test]
fn test_parse_var_declaration() {
    assert_statement_count("var z = true;", 1);
}

#[test]
fn test_parse_let_and_const_flags() {
    let arena = Bump::new();
    let result = Parser::new(&arena, "test.js", "let a = 1; const b = 2;").parse_source_file();
    let flags: Vec<NodeFlags> = result
        .source_file
        .statements
        .iter()
        .map(|s| match s {
            Statement::VariableStatement(v) => v.declaration_list.data.flags,
            other => panic!("expected variable statement, got {:?}", other.kind()),
        })
        .collect();
    assert_eq!(flags, vec![NodeFlags::LET, NodeFlags::CONST]);
}

#[test]
fn test_parse_multiple_declarators() {
    let arena = Bump::new();
    let result = Parser::new(&arena, "test.js", "var a = 1, b, c = 'x';").parse_source_file();
    match &result.source_file.statements[0] {
        Statement::VariableStatement(v) => {
            let names: Vec<&str> = v.declaration_list.declarations.iter().map(|d| d.name.text).collect();
            assert_eq!(names, vec!["a", "b", "c"]);
            assert!(v.declaration_list.declarations[1].initializer.is_none());
        }
        other => panic!("unexpected {:?}", other.kind()),
    }
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_parse_function_declaration() {
    let arena = Bump::new();
    let result = Parser::new(&arena, "test.js", "function add(a, b) { return a + b; }").parse_source_file();
    match &result.source_file.statements[0] {
        Statement::FunctionDeclaration(f) => {
            assert_eq!(f.name.text, "add");
            assert_eq!(f.parameters.len(), 2);
            assert_eq!(f.parameters[1].name.text, "b");
            assert_eq!(f.body.statements.len(), 1);
        }
        other => panic!("unexpected {:?}", other.kind()),
    }
}

#[test]
fn test_parse_prototype_method_assignment() {
    let source = "Foo.prototype.bar = function bar(x) {\n  return x;\n};";
    let arena = Bump::new();
    let result = Parser::new(&arena, "test.js", source).parse_source_file();
    assert!(result.errors.is_empty());
    let Statement::ExpressionStatement(stmt) = &result.source_file.statements[0] else {
        panic!("expected expression statement");
    };
    let Expression::Binary(assign) = stmt.expression else {
        panic!("expected assignment");
    };
    assert_eq!(assign.operator, SyntaxKind::EqualsToken);
    let Expression::PropertyAccess(target) = assign.left else {
        panic!("expected property access");
    };
    assert_eq!(target.name.text, "bar");
    assert!(target.expression.is_property_access_of("Foo", "prototype"));
    assert!(matches!(assign.right, Expression::FunctionExpression(_)));
}

#[test]
fn test_function_expression_name_is_optional() {
    assert_statement_count("var f = function (a) { return a; };", 1);
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_parse_control_flow() {
    assert_statement_count(
        "if (a) { b(); } else c();\nwhile (x) { x--; }\ndo { y++ } while (y < 3)\nfor (var i = 0; i < 3; i++) {}\n",
        4,
    );
}

#[test]
fn test_parse_for_in() {
    let arena = Bump::new();
    let result = Parser::new(&arena, "test.js", "for (var k in obj) { count++; }").parse_source_file();
    assert!(result.errors.is_empty());
    assert!(matches!(result.source_file.statements[0], Statement::ForInStatement(_)));
}

#[test]
fn test_parse_try_catch_finally() {
    assert_statement_count("try { a(); } catch (e) { b(e); } finally { c(); }", 1);
}

#[test]
fn test_parse_switch() {
    let arena = Bump::new();
    let source = "switch (x) { case 1: a(); break; case 2: default: b(); }";
    let result = Parser::new(&arena, "test.js", source).parse_source_file();
    let Statement::SwitchStatement(sw) = &result.source_file.statements[0] else {
        panic!("expected switch");
    };
    assert_eq!(sw.clauses.len(), 3);
    assert!(sw.clauses[2].expression.is_none());
    assert_eq!(sw.clauses[2].data.kind, SyntaxKind::DefaultClause);
}

#[test]
fn test_parse_labeled_break() {
    assert_statement_count("outer: for (;;) { break outer; }", 1);
}

#[test]
fn test_return_without_value_before_line_break() {
    let arena = Bump::new();
    let source = "function f() {\n  return\n  42;\n}";
    let result = Parser::new(&arena, "test.js", source).parse_source_file();
    let Statement::FunctionDeclaration(f) = &result.source_file.statements[0] else {
        panic!("expected function");
    };
    let Statement::ReturnStatement(ret) = &f.body.statements[0] else {
        panic!("expected return");
    };
    assert!(ret.expression.is_none());
    assert_eq!(f.body.statements.len(), 2);
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn test_binary_precedence() {
    let arena = Bump::new();
    let result = Parser::new(&arena, "test.js", "x = 1 + 2 * 3;").parse_source_file();
    let Statement::ExpressionStatement(stmt) = &result.source_file.statements[0] else {
        panic!("expected expression statement");
    };
    let Expression::Binary(assign) = stmt.expression else { panic!() };
    let Expression::Binary(sum) = assign.right else { panic!() };
    assert_eq!(sum.operator, SyntaxKind::PlusToken);
    let Expression::Binary(product) = sum.right else { panic!() };
    assert_eq!(product.operator, SyntaxKind::AsteriskToken);
}

#[test]
fn test_parse_object_and_array_literals() {
    let arena = Bump::new();
    let source = "var o = { a: 1, 'b': [1, , 3], default: null, };";
    let result = Parser::new(&arena, "test.js", source).parse_source_file();
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    let Statement::VariableStatement(v) = &result.source_file.statements[0] else { panic!() };
    let Some(Expression::ObjectLiteral(obj)) = v.declaration_list.declarations[0].initializer else {
        panic!("expected object literal");
    };
    let keys: Vec<&str> = obj.properties.iter().map(|p| p.name.text()).collect();
    assert_eq!(keys, vec!["a", "b", "default"]);
    let Expression::ArrayLiteral(arr) = obj.properties[1].initializer else { panic!() };
    assert_eq!(arr.elements.len(), 3);
    assert!(matches!(arr.elements[1], Expression::OmittedExpression(_)));
}

#[test]
fn test_parse_new_with_member_callee() {
    let arena = Bump::new();
    let result = Parser::new(&arena, "test.js", "var c = new a.B(1).run();").parse_source_file();
    let Statement::VariableStatement(v) = &result.source_file.statements[0] else { panic!() };
    let Some(Expression::Call(call)) = v.declaration_list.declarations[0].initializer else {
        panic!("expected call");
    };
    let Expression::PropertyAccess(pa) = call.expression else { panic!() };
    let Expression::New(new_expr) = pa.expression else { panic!("expected new") };
    assert_eq!(new_expr.arguments.map(|a| a.len()), Some(1));
}

#[test]
fn test_parse_regex_literal() {
    let arena = Bump::new();
    let result = Parser::new(&arena, "test.js", "var r = /a+b/g.test(s);").parse_source_file();
    assert!(result.errors.is_empty());
}

#[test]
fn test_parse_conditional_and_unary() {
    assert_statement_count("var t = typeof x === 'string' ? !y : void 0;", 1);
}

// ============================================================================
// Comments and errors
// ============================================================================

#[test]
fn test_block_comments_are_collected() {
    let arena = Bump::new();
    let source = "/*@jsig\n  foo : (String) => void\n*/\n// line\nfunction foo(a) {} /* trailing */";
    let result = Parser::new(&arena, "test.js", source).parse_source_file();
    let comments = result.source_file.comments;
    assert_eq!(comments.len(), 2);
    assert!(comments[0].text.starts_with("/*@jsig"));
    assert_eq!(comments[0].body(), "@jsig\n  foo : (String) => void\n");
    assert_eq!(comments[1].body(), " trailing ");
}

#[test]
fn test_missing_semicolon_on_same_line_is_an_error() {
    assert_eq!(error_count("var a = 1 var b = 2;"), 1);
}

#[test]
fn test_asi_across_lines() {
    assert_statement_count("var a = 1\nvar b = 2\na = b", 3);
}

#[test]
fn test_invalid_assignment_target() {
    assert!(error_count("1 = 2;") > 0);
}

#[test]
fn test_unbalanced_braces_report_errors_and_terminate() {
    assert!(error_count("function f() { if (x) { }") > 0);
    assert!(error_count("}}} var a;") > 0);
}

#[test]
fn test_unsupported_syntax_is_rejected() {
    assert!(error_count("var f = (a) => a;") > 0);
    assert!(error_count("class A {}") > 0);
}
