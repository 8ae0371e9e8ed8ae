//! Program analysis.
//!
//! A single read-only walk over the syntax tree that records what the code
//! implements, independent of any declared signature:
//! - every function with its arity and completion
//! - `this.field` reads and writes per function
//! - return sites and whether they are reachable
//! - `Ctor.prototype.field = ...` assignments
//! - `module.exports` and `exports.name` assignments

use jsig_ast::node::*;
use jsig_ast::syntax_kind::SyntaxKind;
use jsig_ast::visitor::AstVisitor;
use jsig_core::{LineMap, TextPos};
use rustc_hash::FxHashMap;

// ============================================================================
// Summary types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Declaration,
    Expression,
}

/// How control leaves a function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every path ends in a `return`.
    Returns,
    /// Every path ends in a `throw`.
    Throws,
    /// Some path reaches the end of the body.
    FallsThrough,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThisAccess {
    pub field: String,
    pub is_write: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnSite {
    pub pos: TextPos,
    pub line: u32,
    pub reachable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSummary {
    pub name: Option<String>,
    pub kind: FunctionKind,
    pub pos: TextPos,
    pub line: u32,
    pub param_count: usize,
    pub this_accesses: Vec<ThisAccess>,
    pub returns: Vec<ReturnSite>,
    pub completion: Completion,
}

impl FunctionSummary {
    /// Whether `this.field` is assigned anywhere in the body.
    pub fn writes_this_field(&self, field: &str) -> bool {
        self.this_accesses.iter().any(|a| a.is_write && a.field == field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrototypeAssignment {
    pub ctor: String,
    pub field: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    /// `module.exports = expr`
    Module,
    /// `module.exports.name = expr` or `exports.name = expr`
    Property(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportAssignment {
    pub target: ExportTarget,
    /// The exported identifier, when the value is a plain identifier.
    pub value_name: Option<String>,
    pub line: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramSummary {
    pub functions: Vec<FunctionSummary>,
    pub prototype_assignments: Vec<PrototypeAssignment>,
    pub exports: Vec<ExportAssignment>,
    by_pos: FxHashMap<TextPos, usize>,
}

impl ProgramSummary {
    /// The function whose node starts at `pos`.
    pub fn function_at(&self, pos: TextPos) -> Option<&FunctionSummary> {
        self.by_pos.get(&pos).map(|&i| &self.functions[i])
    }

    /// The first function declaration named `name`.
    pub fn function_declaration(&self, name: &str) -> Option<&FunctionSummary> {
        self.functions
            .iter()
            .find(|f| f.kind == FunctionKind::Declaration && f.name.as_deref() == Some(name))
    }

    pub fn prototype_assignments_of<'s>(&'s self, ctor: &'s str) -> impl Iterator<Item = &'s PrototypeAssignment> {
        self.prototype_assignments.iter().filter(move |p| p.ctor == ctor)
    }

    /// The first `module.exports = <ctor>` or property export of `ctor`.
    pub fn export_of(&self, name: &str) -> Option<&ExportAssignment> {
        self.exports.iter().find(|e| e.value_name.as_deref() == Some(name))
    }
}

/// Summarize `source_file`.
pub fn analyze(source_file: &SourceFile<'_>, line_map: &LineMap) -> ProgramSummary {
    let mut analyzer = Analyzer {
        line_map,
        summary: ProgramSummary::default(),
        frames: Vec::new(),
        unreachable: false,
    };
    analyzer.visit_statement_list(source_file.statements);
    analyzer.summary
}

// ============================================================================
// Reachability
// ============================================================================

/// Whether control can flow past `stmt` to the next statement.
fn can_complete(stmt: &Statement<'_>) -> bool {
    match stmt {
        Statement::ReturnStatement(_)
        | Statement::ThrowStatement(_)
        | Statement::BreakStatement(_)
        | Statement::ContinueStatement(_) => false,
        Statement::Block(block) => can_complete_list(block.statements),
        Statement::IfStatement(node) => match node.else_statement {
            Some(else_stmt) => can_complete(node.then_statement) || can_complete(else_stmt),
            None => true,
        },
        Statement::SwitchStatement(node) => {
            let has_default = node.clauses.iter().any(|c| c.expression.is_none());
            let last_completes = node
                .clauses
                .last()
                .map_or(true, |c| can_complete_list(c.statements));
            !has_default || last_completes || node.clauses.iter().any(|c| contains_break(c.statements))
        }
        Statement::TryStatement(node) => {
            if let Some(finally) = &node.finally_block {
                if !can_complete_list(finally.statements) {
                    return false;
                }
            }
            can_complete_list(node.try_block.statements)
                || node.catch_clause.as_ref().map_or(false, |c| can_complete_list(c.block.statements))
        }
        Statement::LabeledStatement(node) => can_complete(node.statement) || contains_labeled_break(node.statement),
        _ => true,
    }
}

fn can_complete_list(statements: &[Statement<'_>]) -> bool {
    statements.iter().all(can_complete)
}

/// Whether an unlabeled `break` in `statements` targets the enclosing switch.
fn contains_break(statements: &[Statement<'_>]) -> bool {
    statements.iter().any(|stmt| match stmt {
        Statement::BreakStatement(b) => b.label.is_none(),
        Statement::Block(block) => contains_break(block.statements),
        Statement::IfStatement(node) => {
            contains_break(std::slice::from_ref(node.then_statement))
                || node.else_statement.map_or(false, |e| contains_break(std::slice::from_ref(e)))
        }
        Statement::TryStatement(node) => {
            contains_break(node.try_block.statements)
                || node.catch_clause.as_ref().map_or(false, |c| contains_break(c.block.statements))
                || node.finally_block.as_ref().map_or(false, |f| contains_break(f.statements))
        }
        Statement::LabeledStatement(node) => contains_break(std::slice::from_ref(node.statement)),
        // Loops and nested switches own their unlabeled breaks.
        _ => false,
    })
}

/// Conservatively true when any labeled `break` appears under `stmt`.
fn contains_labeled_break(stmt: &Statement<'_>) -> bool {
    match stmt {
        Statement::BreakStatement(b) => b.label.is_some(),
        Statement::Block(block) => block.statements.iter().any(contains_labeled_break),
        Statement::IfStatement(node) => {
            contains_labeled_break(node.then_statement) || node.else_statement.map_or(false, contains_labeled_break)
        }
        Statement::WhileStatement(node) => contains_labeled_break(node.statement),
        Statement::DoStatement(node) => contains_labeled_break(node.statement),
        Statement::ForStatement(node) => contains_labeled_break(node.statement),
        Statement::ForInStatement(node) => contains_labeled_break(node.statement),
        Statement::LabeledStatement(node) => contains_labeled_break(node.statement),
        Statement::SwitchStatement(node) => node.clauses.iter().any(|c| c.statements.iter().any(contains_labeled_break)),
        Statement::TryStatement(node) => {
            node.try_block.statements.iter().any(contains_labeled_break)
                || node.catch_clause.as_ref().map_or(false, |c| c.block.statements.iter().any(contains_labeled_break))
                || node.finally_block.as_ref().map_or(false, |f| f.statements.iter().any(contains_labeled_break))
        }
        _ => false,
    }
}

// ============================================================================
// Walker
// ============================================================================

struct Analyzer<'m> {
    line_map: &'m LineMap,
    summary: ProgramSummary,
    /// Indices into `summary.functions` of the enclosing functions.
    frames: Vec<usize>,
    unreachable: bool,
}

impl<'m> Analyzer<'m> {
    fn line(&self, pos: TextPos) -> u32 {
        self.line_map.line_number(pos)
    }

    fn current_function(&mut self) -> Option<&mut FunctionSummary> {
        let index = *self.frames.last()?;
        self.summary.functions.get_mut(index)
    }

    fn visit_statement_list<'a>(&mut self, statements: &[Statement<'a>]) {
        let saved = self.unreachable;
        for stmt in statements {
            self.visit_statement(stmt);
            if !can_complete(stmt) {
                self.unreachable = true;
            }
        }
        self.unreachable = saved;
    }

    fn visit_function<'a>(&mut self, function: FunctionLike<'_, 'a>, kind: FunctionKind) {
        let pos = function.data.range.pos;
        let completion = if can_complete_list(function.body.statements) {
            Completion::FallsThrough
        } else {
            // Provisional; a reachable return below makes it `Returns`.
            Completion::Throws
        };
        let index = self.summary.functions.len();
        self.summary.functions.push(FunctionSummary {
            name: function.name.map(|n| n.text.to_string()),
            kind,
            pos,
            line: self.line(pos),
            param_count: function.parameters.len(),
            this_accesses: Vec::new(),
            returns: Vec::new(),
            completion,
        });
        self.summary.by_pos.insert(pos, index);

        self.frames.push(index);
        let saved = std::mem::replace(&mut self.unreachable, false);
        self.visit_statement_list(function.body.statements);
        self.unreachable = saved;
        self.frames.pop();

        let summary = &mut self.summary.functions[index];
        if summary.completion == Completion::Throws && summary.returns.iter().any(|r| r.reachable) {
            summary.completion = Completion::Returns;
        }
    }

    fn record_this_access(&mut self, field: &str, is_write: bool) {
        if let Some(function) = self.current_function() {
            function.this_accesses.push(ThisAccess { field: field.to_string(), is_write });
        }
    }

    /// Record `left = right` if it is a prototype or export assignment.
    fn record_assignment<'a>(&mut self, left: &PropertyAccessExpression<'a>, right: &Expression<'a>, pos: TextPos) {
        let line = self.line(pos);
        let object = left.expression.skip_parentheses();

        // Ctor.prototype.field = ...
        if let Expression::PropertyAccess(inner) = object {
            if inner.name.text == "prototype" {
                if let Some(ctor) = inner.expression.as_identifier_text() {
                    self.summary.prototype_assignments.push(PrototypeAssignment {
                        ctor: ctor.to_string(),
                        field: left.name.text.to_string(),
                        line,
                    });
                    return;
                }
            }
        }

        let target = if object.as_identifier_text() == Some("module") && left.name.text == "exports" {
            Some(ExportTarget::Module)
        } else if object.is_property_access_of("module", "exports") || object.as_identifier_text() == Some("exports") {
            Some(ExportTarget::Property(left.name.text.to_string()))
        } else {
            None
        };
        if let Some(target) = target {
            self.summary.exports.push(ExportAssignment {
                target,
                value_name: right.as_identifier_text().map(str::to_string),
                line,
            });
        }
    }
}

impl<'a, 'm> AstVisitor<'a> for Analyzer<'m> {
    fn visit_source_file(&mut self, node: &SourceFile<'a>) {
        self.visit_statement_list(node.statements);
    }

    fn visit_block(&mut self, node: &Block<'a>) {
        self.visit_statement_list(node.statements);
    }

    fn visit_switch_statement(&mut self, node: &SwitchStatement<'a>) {
        self.visit_expression(node.expression);
        for clause in node.clauses.iter() {
            if let Some(expr) = clause.expression {
                self.visit_expression(expr);
            }
            self.visit_statement_list(clause.statements);
        }
    }

    fn visit_function_declaration(&mut self, node: &FunctionDeclaration<'a>) {
        self.visit_function(node.as_function_like(), FunctionKind::Declaration);
    }

    fn visit_function_expression(&mut self, node: &FunctionExpression<'a>) {
        self.visit_function(node.as_function_like(), FunctionKind::Expression);
    }

    fn visit_return_statement(&mut self, node: &ReturnStatement<'a>) {
        let site = ReturnSite {
            pos: node.data.range.pos,
            line: self.line(node.data.range.pos),
            reachable: !self.unreachable,
        };
        if let Some(function) = self.current_function() {
            function.returns.push(site);
        }
        if let Some(expr) = node.expression {
            self.visit_expression(expr);
        }
    }

    fn visit_property_access(&mut self, node: &PropertyAccessExpression<'a>) {
        if let Expression::ThisKeyword(_) = node.expression {
            self.record_this_access(node.name.text, false);
        }
        self.visit_expression(node.expression);
    }

    fn visit_binary_expression(&mut self, node: &BinaryExpression<'a>) {
        if node.operator.is_assignment_operator() {
            if let Expression::PropertyAccess(target) = node.left.skip_parentheses() {
                if let Expression::ThisKeyword(_) = target.expression {
                    if node.operator != SyntaxKind::EqualsToken {
                        self.record_this_access(target.name.text, false);
                    }
                    self.record_this_access(target.name.text, true);
                } else {
                    if node.operator == SyntaxKind::EqualsToken {
                        self.record_assignment(target, node.right, node.data.range.pos);
                    }
                    self.visit_expression(target.expression);
                }
                self.visit_expression(node.right);
                return;
            }
        }
        self.visit_expression(node.left);
        self.visit_expression(node.right);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_complete_basic_statements() {
        use bumpalo::Bump;
        use jsig_parser::Parser;

        let arena = Bump::new();
        let source = "return 1;\nthrow e;\nif (a) { return 1; } else { throw e; }\nif (a) return 1;\nfoo();";
        // Top-level return is accepted by the parser as a statement.
        let result = Parser::new(&arena, "t.js", source).parse_source_file();
        let flags: Vec<bool> = result.source_file.statements.iter().map(can_complete).collect();
        assert_eq!(flags, vec![false, false, false, true, true]);
    }
}
