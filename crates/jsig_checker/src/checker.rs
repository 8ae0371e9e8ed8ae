//! The verifier.
//!
//! Walks one source file in declaration order with a scope chain rooted at
//! the builtin globals and the file's header, and checks what the code
//! implements against what the header declares:
//! - functions against their declared signatures (arity, returns, body)
//! - `this` and prototype field writes against instance types
//! - constructors for fields they never assign
//! - `module.exports` against the declared export
//!
//! Expression typing lives in the `expressions` submodule.

mod expressions;

use indexmap::IndexMap;
use jsig_ast::node::*;
use jsig_ast::types::NodeFlags;
use jsig_binder::{analyze, Completion, ProgramSummary, ScopeKind, TypeEnvironment};
use jsig_core::{LineMap, TextPos};
use jsig_diagnostics::{messages, TypeDiagnostic};
use jsig_signature::Header;
use jsig_types::{builtins, TypeNode, TypeRef};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::debug;

use crate::meta::Meta;
use crate::subtype::SubtypeChecker;

/// Name reported for function expressions without a name or context.
const ANONYMOUS: &str = "(anonymous)";

/// Ordering rules for `module.exports` and prototype assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportPolicy {
    /// Allow a second `module.exports = ...` in the same file.
    pub allow_export_reassignment: bool,
    /// Allow `Ctor.prototype.field = ...` after `Ctor` was exported.
    pub allow_prototype_after_export: bool,
}

impl Default for ExportPolicy {
    fn default() -> Self {
        Self { allow_export_reassignment: false, allow_prototype_after_export: true }
    }
}

/// A type brought in by a header `import`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedType {
    /// The name in the exporting header.
    pub name: String,
    /// The name bound in the importing header.
    pub local_name: String,
    pub params: Vec<String>,
    pub ty: TypeRef,
}

/// The signature the body of the innermost function is checked against.
struct FunctionFrame {
    name: String,
    pos: TextPos,
    /// `None` when returns are not checked.
    result: Option<TypeRef>,
}

pub struct Checker<'m> {
    line_map: &'m LineMap,
    policy: ExportPolicy,
    env: TypeEnvironment,
    summary: ProgramSummary,
    meta: Meta,
    frames: Vec<FunctionFrame>,
    /// Function declarations that were hoisted without a declared type.
    untyped_declarations: FxHashSet<TextPos>,
    declared_export: Option<TypeRef>,
    declared_export_line: u32,
    module_exports_assigned: bool,
    property_exports: IndexMap<String, TypeRef>,
    /// Constructors whose export has been reached.
    exported_ctors: FxHashSet<String>,
    /// Constructors whose fields have been checked.
    completed_ctors: FxHashSet<String>,
    /// Constructors verified before their export was reached.
    pending_ctors: Vec<(String, u32)>,
}

/// Verify `source_file` against `header`.
pub fn verify(
    source_file: &SourceFile<'_>,
    line_map: &LineMap,
    header: &Header,
    imports: &[ImportedType],
    policy: ExportPolicy,
) -> Meta {
    let mut checker = Checker::new(line_map, policy);
    checker.load_imports(imports);
    checker.load_header(header);
    checker.check_source_file(source_file)
}

impl<'m> Checker<'m> {
    pub fn new(line_map: &'m LineMap, policy: ExportPolicy) -> Self {
        let mut env = TypeEnvironment::new();
        env.push_scope(ScopeKind::Header);
        Self {
            line_map,
            policy,
            env,
            summary: ProgramSummary::default(),
            meta: Meta::default(),
            frames: Vec::new(),
            untyped_declarations: FxHashSet::default(),
            declared_export: None,
            declared_export_line: 0,
            module_exports_assigned: false,
            property_exports: IndexMap::new(),
            exported_ctors: FxHashSet::default(),
            completed_ctors: FxHashSet::default(),
            pending_ctors: Vec::new(),
        }
    }

    // ========================================================================
    // Header loading
    // ========================================================================

    pub fn load_imports(&mut self, imports: &[ImportedType]) {
        for import in imports {
            debug!(name = %import.name, local = %import.local_name, "imported type");
            if self.env.define_alias(&import.name, import.params.clone(), Arc::clone(&import.ty)).is_err() {
                debug!(name = %import.name, "conflicting import ignored");
            }
            if import.local_name != import.name {
                let renamed = TypeNode::renamed(import.local_name.as_str(), import.name.as_str());
                if self.env.define_alias(&import.local_name, Vec::new(), renamed).is_err() {
                    debug!(name = %import.local_name, "conflicting import alias ignored");
                }
            }
        }
    }

    pub fn load_header(&mut self, header: &Header) {
        for alias in header.type_aliases() {
            debug!(name = %alias.name, line = alias.line, "type alias");
            if self.env.define_alias(&alias.name, alias.params.clone(), Arc::clone(&alias.ty)).is_err() {
                debug!(name = %alias.name, "conflicting type alias ignored");
            }
        }
        for decl in header.declarations() {
            debug!(name = %decl.name, line = decl.line, ty = %decl.ty, "declaration");
            if let Err(existing) = self.env.declare(&decl.name, Arc::clone(&decl.ty), decl.line) {
                self.check_subtype(&decl.name, &decl.ty, &existing.ty, decl.line);
            }
        }
        if let Some(export) = header.export_default() {
            debug!(ty = %export.ty, line = export.line, "export default");
            self.declared_export = Some(self.export_default_type(&export.ty));
            self.declared_export_line = export.line;
        }
    }

    /// `export default Name` names the value declared as `Name` when there
    /// is one, and the type alias otherwise.
    fn export_default_type(&self, ty: &TypeRef) -> TypeRef {
        if let TypeNode::Literal(lit) = &**ty {
            if !lit.builtin {
                if let Some(binding) = self.env.lookup_in(ScopeKind::Header, &lit.name) {
                    return Arc::clone(&binding.ty);
                }
            }
        }
        Arc::clone(ty)
    }

    // ========================================================================
    // Entry point
    // ========================================================================

    pub fn check_source_file(mut self, source_file: &SourceFile<'_>) -> Meta {
        self.summary = analyze(source_file, self.line_map);
        self.env.push_scope(ScopeKind::Module);
        self.hoist_declarations(source_file.statements);
        self.check_statements(source_file.statements);
        self.finish()
    }

    fn finish(mut self) -> Meta {
        for (ctor, line) in std::mem::take(&mut self.pending_ctors) {
            self.check_constructor_fields(&ctor, line);
        }
        if let Some(declared) = self.unassigned_export() {
            self.report_missing_export(&declared, self.declared_export_line);
        }
        if self.meta.module_exports_type.is_none() && !self.property_exports.is_empty() {
            let derived = TypeNode::object(std::mem::take(&mut self.property_exports));
            self.meta.module_exports_type = Some(TypeNode::module_exports(self.declared_export.take().unwrap_or(derived)));
        }
        self.meta
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn line(&self, pos: TextPos) -> u32 {
        self.line_map.line_number(pos)
    }

    fn report(&mut self, diagnostic: TypeDiagnostic) {
        debug!(kind = %diagnostic.kind, line = diagnostic.line, "{}", diagnostic.message());
        self.meta.errors.push(diagnostic);
    }

    /// The declared `export default` type while nothing has been exported.
    fn unassigned_export(&self) -> Option<TypeRef> {
        if self.module_exports_assigned || !self.property_exports.is_empty() {
            return None;
        }
        self.declared_export.clone()
    }

    fn report_missing_export(&mut self, declared: &TypeRef, line: u32) {
        self.report(
            TypeDiagnostic::new(&messages::MISSING_MODULE_EXPORT, line).with_types(declared.class_name(), "undefined"),
        );
    }

    /// Check `actual` against `expected`, reporting a mismatch at `line`
    /// with `actual_desc` as the actual side.
    fn check_subtype(&mut self, actual_desc: &str, actual: &TypeRef, expected: &TypeRef, line: u32) -> bool {
        let result = SubtypeChecker::new(&self.env).check(actual, expected);
        match result {
            Ok(()) => true,
            Err(mismatch) => {
                debug!(path = ?mismatch.path, expected = %mismatch.expected, actual = %mismatch.actual, "mismatch");
                let mut diagnostic = TypeDiagnostic::new(&messages::TYPE_CLASS_MISMATCH, line)
                    .with_types(expected.class_name(), actual_desc);
                // Name the nested field or parameter that failed.
                if !mismatch.path.is_empty() {
                    diagnostic = diagnostic.with_field_name(mismatch.path.join("."));
                }
                self.report(diagnostic);
                false
            }
        }
    }

    /// Declare every `var` and function declaration of a body up front.
    ///
    /// Functions the environment already knows keep their declared type;
    /// others are bound as `Function` and remembered as untyped. Module
    /// level `var`s take their header type, other `var`s start as `Any`.
    fn hoist_declarations(&mut self, statements: &[Statement<'_>]) {
        let mut vars = Vec::new();
        collect_vars(statements, &mut vars);
        for (name, pos) in vars {
            let declared = if self.frames.is_empty() {
                self.env.lookup_in(ScopeKind::Header, name).map(|b| Arc::clone(&b.ty))
            } else {
                None
            };
            let ty = declared.unwrap_or_else(|| builtins().any());
            let line = self.line(pos);
            // An existing binding (a parameter, say) wins.
            let _ = self.env.declare_var(name, ty, line);
        }

        for stmt in statements {
            if let Statement::FunctionDeclaration(func) = stmt {
                if self.env.lookup(func.name.text).is_none() {
                    let line = self.line(func.data.range.pos);
                    let _ = self.env.declare_var(func.name.text, TypeNode::literal("Function"), line);
                    self.untyped_declarations.insert(func.data.range.pos);
                }
            }
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn check_statements(&mut self, statements: &[Statement<'_>]) {
        for stmt in statements {
            self.check_statement(stmt);
        }
    }

    fn check_block(&mut self, statements: &[Statement<'_>]) {
        self.env.push_scope(ScopeKind::Block);
        self.hoist_declarations(statements);
        self.check_statements(statements);
        self.env.pop_scope();
    }

    fn check_statement(&mut self, stmt: &Statement<'_>) {
        match stmt {
            Statement::VariableStatement(node) => self.check_variable_list(&node.declaration_list),
            Statement::FunctionDeclaration(node) => self.check_function_declaration(node),
            Statement::Block(node) => self.check_block(node.statements),
            Statement::ExpressionStatement(node) => {
                self.infer_expression(node.expression, None);
            }
            Statement::IfStatement(node) => {
                self.infer_expression(node.expression, None);
                self.check_statement(node.then_statement);
                if let Some(else_stmt) = node.else_statement {
                    self.check_statement(else_stmt);
                }
            }
            Statement::DoStatement(node) => {
                self.check_statement(node.statement);
                self.infer_expression(node.expression, None);
            }
            Statement::WhileStatement(node) => {
                self.infer_expression(node.expression, None);
                self.check_statement(node.statement);
            }
            Statement::ForStatement(node) => {
                self.env.push_scope(ScopeKind::Block);
                match &node.initializer {
                    Some(ForInitializer::VariableDeclarationList(list)) => self.check_variable_list(list),
                    Some(ForInitializer::Expression(expr)) => {
                        self.infer_expression(expr, None);
                    }
                    None => {}
                }
                if let Some(condition) = node.condition {
                    self.infer_expression(condition, None);
                }
                if let Some(incrementor) = node.incrementor {
                    self.infer_expression(incrementor, None);
                }
                self.check_statement(node.statement);
                self.env.pop_scope();
            }
            Statement::ForInStatement(node) => {
                self.env.push_scope(ScopeKind::Block);
                match &node.initializer {
                    ForInitializer::VariableDeclarationList(list) => {
                        for decl in list.declarations.iter() {
                            let line = self.line(decl.data.range.pos);
                            let key = TypeNode::literal("String");
                            let declared = if list.data.flags.intersects(NodeFlags::BLOCK_SCOPED) {
                                self.env.declare(decl.name.text, key, line)
                            } else {
                                self.env.declare_var(decl.name.text, key, line)
                            };
                            if declared.is_err() {
                                self.env.rebind(decl.name.text, TypeNode::literal("String"));
                            }
                        }
                    }
                    ForInitializer::Expression(expr) => {
                        self.infer_expression(expr, None);
                    }
                }
                self.infer_expression(node.expression, None);
                self.check_statement(node.statement);
                self.env.pop_scope();
            }
            Statement::ReturnStatement(node) => self.check_return(node),
            Statement::SwitchStatement(node) => {
                self.infer_expression(node.expression, None);
                for clause in node.clauses.iter() {
                    if let Some(expr) = clause.expression {
                        self.infer_expression(expr, None);
                    }
                    self.check_block(clause.statements);
                }
            }
            Statement::LabeledStatement(node) => self.check_statement(node.statement),
            Statement::ThrowStatement(node) => {
                self.infer_expression(node.expression, None);
            }
            Statement::TryStatement(node) => {
                self.check_block(node.try_block.statements);
                if let Some(catch) = &node.catch_clause {
                    self.env.push_scope(ScopeKind::Block);
                    let line = self.line(catch.variable.data.range.pos);
                    let _ = self.env.declare(catch.variable.text, builtins().any(), line);
                    self.check_block(catch.block.statements);
                    self.env.pop_scope();
                }
                if let Some(finally) = &node.finally_block {
                    self.check_block(finally.statements);
                }
            }
            Statement::EmptyStatement(_)
            | Statement::DebuggerStatement(_)
            | Statement::ContinueStatement(_)
            | Statement::BreakStatement(_) => {}
        }
    }

    fn check_variable_list(&mut self, list: &VariableDeclarationList<'_>) {
        let block_scoped = list.data.flags.intersects(NodeFlags::BLOCK_SCOPED);
        for decl in list.declarations.iter() {
            self.check_variable_declaration(decl, block_scoped);
        }
    }

    fn check_variable_declaration(&mut self, decl: &VariableDeclaration<'_>, block_scoped: bool) {
        let name = decl.name.text;
        let line = self.line(decl.data.range.pos);
        let declared = if self.frames.is_empty() {
            self.env.lookup_in(ScopeKind::Header, name).map(|b| Arc::clone(&b.ty))
        } else {
            None
        };

        let ty = match (declared, decl.initializer) {
            (Some(declared), Some(init)) => {
                self.check_assignment(init, &declared, line, name);
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(init)) => self.infer_expression(init, None).widen(),
            (None, None) => {
                if self.env.lookup_local(name).is_some() || !block_scoped {
                    // Already hoisted.
                    return;
                }
                builtins().any()
            }
        };

        let result = if block_scoped {
            self.env.declare(name, Arc::clone(&ty), line)
        } else {
            self.env.declare_var(name, Arc::clone(&ty), line)
        };
        if let Err(existing) = result {
            if existing.ty.is_any() {
                self.env.rebind(name, ty);
            } else {
                let desc = format!("{}: {}", name, ty.class_name());
                self.check_subtype(&desc, &ty, &existing.ty, line);
            }
        }
    }

    fn check_return(&mut self, node: &ReturnStatement<'_>) {
        let pos = node.data.range.pos;
        let line = self.line(pos);
        let Some(frame) = self.frames.last() else {
            if let Some(expr) = node.expression {
                self.infer_expression(expr, None);
            }
            return;
        };
        let name = frame.name.clone();
        let function_pos = frame.pos;
        let Some(result) = frame.result.clone() else {
            if let Some(expr) = node.expression {
                self.infer_expression(expr, Some(&builtins().any()));
            }
            return;
        };

        let resolved = self.env.resolve(&result);
        match node.expression {
            Some(expr) if resolved.is_void() => {
                let actual = self.infer_expression(expr, None);
                if !actual.admits_undefined() {
                    self.report(
                        TypeDiagnostic::new(&messages::NON_VOID_RETURN_TYPE, line)
                            .with_func_name(name)
                            .with_types("void", actual.class_name()),
                    );
                }
            }
            Some(expr) => self.check_assignment(expr, &result, line, ANONYMOUS),
            None => {
                let reachable = self
                    .summary
                    .function_at(function_pos)
                    .and_then(|f| f.returns.iter().find(|r| r.pos == pos))
                    .map_or(true, |r| r.reachable);
                if reachable && !resolved.admits_undefined() {
                    self.report(
                        TypeDiagnostic::new(&messages::MISSING_RETURN_STATEMENT, line)
                            .with_func_name(name)
                            .with_types(result.class_name(), "void"),
                    );
                }
            }
        }
    }

    // ========================================================================
    // Functions
    // ========================================================================

    fn check_function_declaration(&mut self, node: &FunctionDeclaration<'_>) {
        let name = node.name.text;
        let line = self.line(node.data.range.pos);
        let declared = if self.untyped_declarations.contains(&node.data.range.pos) {
            None
        } else {
            self.env.lookup(name).map(|b| Arc::clone(&b.ty))
        };
        self.check_function(node.as_function_like(), declared.as_ref(), name);

        if declared.is_some() && self.is_constructor(name) && !self.completed_ctors.contains(name) {
            if self.summary.export_of(name).is_some() {
                self.pending_ctors.push((name.to_string(), line));
            } else {
                self.check_constructor_fields(name, line);
            }
        }
    }

    /// Check a function against `declared` and return the type it is known
    /// by afterwards.
    fn check_function(&mut self, function: FunctionLike<'_, '_>, declared: Option<&TypeRef>, context_name: &str) -> TypeRef {
        let name = function.name.map_or(context_name, |n| n.text).to_string();
        let pos = function.data.range.pos;
        let line = self.line(pos);

        let Some(declared) = declared else {
            self.report(TypeDiagnostic::new(&messages::UNTYPED_FUNCTION_FOUND, line).with_func_name(name.as_str()));
            self.check_function_body(function, name, None, &[], None);
            return TypeNode::literal("Function");
        };

        let resolved = self.env.resolve(declared);
        if resolved.is_any() || matches!(&*resolved, TypeNode::Literal(lit) if lit.builtin && lit.name == "Function") {
            self.check_function_body(function, name, None, &[], None);
            return Arc::clone(declared);
        }
        let Some(signature) = resolved.as_function() else {
            self.report(
                TypeDiagnostic::new(&messages::TYPE_CLASS_MISMATCH, line).with_types(declared.class_name(), "Function"),
            );
            self.check_function_body(function, name, None, &[], None);
            return TypeNode::literal("Function");
        };

        let expected_args = signature.arity();
        let actual_args = function.parameters.len();
        if actual_args != expected_args {
            let message = if actual_args > expected_args {
                &messages::TOO_MANY_FUNCTION_ARGS
            } else {
                &messages::TOO_FEW_FUNCTION_ARGS
            };
            self.report(
                TypeDiagnostic::new(message, line)
                    .with_func_name(name)
                    .with_args(expected_args, actual_args),
            );
            return Arc::clone(declared);
        }

        let this_type = signature.this_type.as_ref().map(|t| self.env.resolve(t));
        let params: Vec<TypeRef> = signature.params.iter().map(|p| Arc::clone(&p.ty)).collect();
        let result = Arc::clone(&signature.result);
        self.check_function_body(function, name, this_type, &params, Some(result));
        Arc::clone(declared)
    }

    fn check_function_body(
        &mut self,
        function: FunctionLike<'_, '_>,
        name: String,
        this_type: Option<TypeRef>,
        params: &[TypeRef],
        result: Option<TypeRef>,
    ) {
        let pos = function.data.range.pos;
        self.env.push_function_scope(this_type);
        for (i, param) in function.parameters.iter().enumerate() {
            let ty = params.get(i).cloned().unwrap_or_else(|| builtins().any());
            let line = self.line(param.data.range.pos);
            let _ = self.env.declare(param.name.text, ty, line);
        }
        self.frames.push(FunctionFrame { name: name.clone(), pos, result: result.clone() });
        self.hoist_declarations(function.body.statements);
        self.check_statements(function.body.statements);
        self.frames.pop();
        self.env.pop_scope();

        let Some(result) = result else { return };
        let falls_through = self
            .summary
            .function_at(pos)
            .map_or(false, |f| f.completion == Completion::FallsThrough);
        if falls_through && !self.env.resolve(&result).admits_undefined() {
            let line = self.line(pos);
            self.report(
                TypeDiagnostic::new(&messages::MISSING_RETURN_STATEMENT, line)
                    .with_func_name(name)
                    .with_types(result.class_name(), "void"),
            );
        }
    }

    // ========================================================================
    // Constructors
    // ========================================================================

    /// A function declaration whose declared `this` type carries its own
    /// name, or that has prototype assignments.
    fn is_constructor(&self, name: &str) -> bool {
        if self.summary.function_declaration(name).is_none() {
            return false;
        }
        let own_this = self
            .env
            .lookup(name)
            .and_then(|b| b.ty.as_function())
            .and_then(|f| f.this_type.as_ref())
            .and_then(|t| t.literal_name())
            == Some(name);
        own_this || self.summary.prototype_assignments_of(name).next().is_some()
    }

    /// Report instance fields that neither the constructor body nor a
    /// prototype assignment provides. Runs at most once per constructor.
    fn check_constructor_fields(&mut self, ctor: &str, line: u32) {
        if !self.completed_ctors.insert(ctor.to_string()) {
            return;
        }
        let Some(instance) = self.env.instance_type(ctor) else { return };
        let Some(object) = instance.as_object() else { return };

        let body = self.summary.function_declaration(ctor);
        let missing: Vec<String> = object
            .fields
            .iter()
            .filter(|(field, ty)| {
                !is_optional(ty)
                    && !body.map_or(false, |b| b.writes_this_field(field))
                    && !self.summary.prototype_assignments_of(ctor).any(|p| p.field == **field)
            })
            .map(|(field, _)| field.clone())
            .collect();

        for field in missing {
            self.report(
                TypeDiagnostic::new(&messages::MISSING_FIELD_IN_CONSTRUCTOR, line)
                    .with_field_name(field)
                    .with_other_field("no-field")
                    .with_func_name(ctor),
            );
        }
    }

    /// Record that `name` was exported at `line`.
    fn on_export(&mut self, name: &str, line: u32) {
        if self.is_constructor(name) {
            self.exported_ctors.insert(name.to_string());
            self.check_constructor_fields(name, line);
        }
    }
}

/// Whether a field may be left unassigned.
fn is_optional(ty: &TypeNode) -> bool {
    match ty {
        TypeNode::Value(_) => ty.admits_undefined(),
        TypeNode::Union(_) => ty.admits_undefined(),
        _ => false,
    }
}

/// The `var` names declared in `statements`, outside nested functions.
fn collect_vars<'a>(statements: &[Statement<'a>], out: &mut Vec<(&'a str, TextPos)>) {
    fn var_list<'a>(list: &VariableDeclarationList<'a>, out: &mut Vec<(&'a str, TextPos)>) {
        if !list.data.flags.intersects(NodeFlags::BLOCK_SCOPED) {
            out.extend(list.declarations.iter().map(|d| (d.name.text, d.data.range.pos)));
        }
    }

    for stmt in statements {
        match stmt {
            Statement::VariableStatement(node) => var_list(&node.declaration_list, out),
            Statement::Block(node) => collect_vars(node.statements, out),
            Statement::IfStatement(node) => {
                collect_vars(std::slice::from_ref(node.then_statement), out);
                if let Some(else_stmt) = node.else_statement {
                    collect_vars(std::slice::from_ref(else_stmt), out);
                }
            }
            Statement::DoStatement(node) => collect_vars(std::slice::from_ref(node.statement), out),
            Statement::WhileStatement(node) => collect_vars(std::slice::from_ref(node.statement), out),
            Statement::ForStatement(node) => {
                if let Some(ForInitializer::VariableDeclarationList(list)) = &node.initializer {
                    var_list(list, out);
                }
                collect_vars(std::slice::from_ref(node.statement), out);
            }
            Statement::ForInStatement(node) => {
                if let ForInitializer::VariableDeclarationList(list) = &node.initializer {
                    var_list(list, out);
                }
                collect_vars(std::slice::from_ref(node.statement), out);
            }
            Statement::SwitchStatement(node) => {
                for clause in node.clauses.iter() {
                    collect_vars(clause.statements, out);
                }
            }
            Statement::LabeledStatement(node) => collect_vars(std::slice::from_ref(node.statement), out),
            Statement::TryStatement(node) => {
                collect_vars(node.try_block.statements, out);
                if let Some(catch) = &node.catch_clause {
                    collect_vars(catch.block.statements, out);
                }
                if let Some(finally) = &node.finally_block {
                    collect_vars(finally.statements, out);
                }
            }
            _ => {}
        }
    }
}
