//! Tree traversal.
//!
//! [`AstVisitor`] has one hook per node kind the analyses care about. Every
//! hook defaults to the matching `walk_*` function, which visits the node's
//! children in source order. An override that still wants the subtree
//! visited calls the `walk_*` function itself.

use crate::node::*;

pub trait AstVisitor<'a>: Sized {
    fn visit_source_file(&mut self, node: &SourceFile<'a>) {
        walk_statements(self, node.statements);
    }

    fn visit_statement(&mut self, stmt: &Statement<'a>) {
        walk_statement(self, stmt);
    }

    fn visit_block(&mut self, node: &Block<'a>) {
        walk_statements(self, node.statements);
    }

    fn visit_function_declaration(&mut self, node: &FunctionDeclaration<'a>) {
        self.visit_block(&node.body);
    }

    fn visit_return_statement(&mut self, node: &ReturnStatement<'a>) {
        walk_optional(self, node.expression);
    }

    fn visit_switch_statement(&mut self, node: &SwitchStatement<'a>) {
        walk_switch(self, node);
    }

    fn visit_expression(&mut self, expr: &Expression<'a>) {
        walk_expression(self, expr);
    }

    fn visit_property_access(&mut self, node: &PropertyAccessExpression<'a>) {
        self.visit_expression(node.expression);
    }

    fn visit_function_expression(&mut self, node: &FunctionExpression<'a>) {
        self.visit_block(&node.body);
    }

    fn visit_binary_expression(&mut self, node: &BinaryExpression<'a>) {
        self.visit_expression(node.left);
        self.visit_expression(node.right);
    }
}

pub fn walk_statements<'a, V: AstVisitor<'a>>(v: &mut V, statements: &[Statement<'a>]) {
    statements.iter().for_each(|stmt| v.visit_statement(stmt));
}

fn walk_optional<'a, V: AstVisitor<'a>>(v: &mut V, expr: Option<&Expression<'a>>) {
    if let Some(expr) = expr {
        v.visit_expression(expr);
    }
}

fn walk_all<'a, V: AstVisitor<'a>>(v: &mut V, exprs: &[Expression<'a>]) {
    exprs.iter().for_each(|expr| v.visit_expression(expr));
}

fn walk_declarations<'a, V: AstVisitor<'a>>(v: &mut V, list: &VariableDeclarationList<'a>) {
    for decl in list.declarations.iter() {
        walk_optional(v, decl.initializer);
    }
}

fn walk_for_head<'a, V: AstVisitor<'a>>(v: &mut V, head: &ForInitializer<'a>) {
    match head {
        ForInitializer::VariableDeclarationList(list) => walk_declarations(v, list),
        ForInitializer::Expression(expr) => v.visit_expression(expr),
    }
}

pub fn walk_switch<'a, V: AstVisitor<'a>>(v: &mut V, node: &SwitchStatement<'a>) {
    v.visit_expression(node.expression);
    for clause in node.clauses.iter() {
        walk_optional(v, clause.expression);
        walk_statements(v, clause.statements);
    }
}

pub fn walk_statement<'a, V: AstVisitor<'a>>(v: &mut V, stmt: &Statement<'a>) {
    use Statement as S;
    match stmt {
        S::VariableStatement(n) => walk_declarations(v, &n.declaration_list),
        S::FunctionDeclaration(n) => v.visit_function_declaration(n),
        S::Block(n) => v.visit_block(n),
        S::ExpressionStatement(n) => v.visit_expression(n.expression),
        S::IfStatement(n) => {
            v.visit_expression(n.expression);
            v.visit_statement(n.then_statement);
            if let Some(otherwise) = n.else_statement {
                v.visit_statement(otherwise);
            }
        }
        S::DoStatement(n) => {
            v.visit_statement(n.statement);
            v.visit_expression(n.expression);
        }
        S::WhileStatement(n) => {
            v.visit_expression(n.expression);
            v.visit_statement(n.statement);
        }
        S::ForStatement(n) => {
            if let Some(head) = &n.initializer {
                walk_for_head(v, head);
            }
            walk_optional(v, n.condition);
            walk_optional(v, n.incrementor);
            v.visit_statement(n.statement);
        }
        S::ForInStatement(n) => {
            walk_for_head(v, &n.initializer);
            v.visit_expression(n.expression);
            v.visit_statement(n.statement);
        }
        S::ReturnStatement(n) => v.visit_return_statement(n),
        S::SwitchStatement(n) => v.visit_switch_statement(n),
        S::LabeledStatement(n) => v.visit_statement(n.statement),
        S::ThrowStatement(n) => v.visit_expression(n.expression),
        S::TryStatement(n) => {
            v.visit_block(&n.try_block);
            if let Some(catch) = &n.catch_clause {
                v.visit_block(&catch.block);
            }
            if let Some(finally) = &n.finally_block {
                v.visit_block(finally);
            }
        }
        S::EmptyStatement(_) | S::ContinueStatement(_) | S::BreakStatement(_) | S::DebuggerStatement(_) => {}
    }
}

pub fn walk_expression<'a, V: AstVisitor<'a>>(v: &mut V, expr: &Expression<'a>) {
    use Expression as E;
    match expr {
        E::ArrayLiteral(n) => walk_all(v, n.elements),
        E::ObjectLiteral(n) => n.properties.iter().for_each(|prop| v.visit_expression(prop.initializer)),
        E::PropertyAccess(n) => v.visit_property_access(n),
        E::ElementAccess(n) => {
            v.visit_expression(n.expression);
            v.visit_expression(n.argument_expression);
        }
        E::Call(n) => {
            v.visit_expression(n.expression);
            walk_all(v, n.arguments);
        }
        E::New(n) => {
            v.visit_expression(n.expression);
            walk_all(v, n.arguments.unwrap_or_default());
        }
        E::FunctionExpression(n) => v.visit_function_expression(n),
        E::Binary(n) => v.visit_binary_expression(n),
        E::Conditional(n) => {
            v.visit_expression(n.condition);
            v.visit_expression(n.when_true);
            v.visit_expression(n.when_false);
        }
        E::Parenthesized(n) => v.visit_expression(n.expression),
        E::Delete(n) => v.visit_expression(n.expression),
        E::TypeOf(n) => v.visit_expression(n.expression),
        E::Void(n) => v.visit_expression(n.expression),
        E::PrefixUnary(n) => v.visit_expression(n.operand),
        E::PostfixUnary(n) => v.visit_expression(n.operand),
        E::Identifier(_)
        | E::StringLiteral(_)
        | E::NumericLiteral(_)
        | E::RegularExpressionLiteral(_)
        | E::OmittedExpression(_)
        | E::ThisKeyword(_)
        | E::NullKeyword(_)
        | E::TrueKeyword(_)
        | E::FalseKeyword(_) => {}
    }
}
