//! The JavaScript parser implementation.
//!
//! A recursive descent parser over the scanner's token stream that builds an
//! arena-allocated AST. It accepts ES5 statements and expressions plus
//! `let`/`const`; anything else is reported as a syntax error.

use bumpalo::Bump;
use jsig_ast::node::*;
use jsig_ast::syntax_kind::SyntaxKind;
use jsig_ast::types::*;
use jsig_diagnostics::{syntax_messages, SyntaxError};
use jsig_scanner::Scanner;

use crate::precedence::Precedence;

/// Maximum recursion depth to prevent stack overflow on deeply nested input.
const MAX_RECURSION_DEPTH: u32 = 200;

/// Move a Vec into the arena as a slice.
fn alloc_vec_in<T>(arena: &Bump, vec: Vec<T>) -> &[T] {
    if vec.is_empty() {
        return &[];
    }
    arena.alloc_slice_fill_iter(vec)
}

/// The output of a parse: the tree and every syntax error found.
#[derive(Debug)]
pub struct ParseResult<'a> {
    pub source_file: SourceFile<'a>,
    pub errors: Vec<SyntaxError>,
}

/// The parser produces a SourceFile AST from JavaScript source text.
pub struct Parser<'a> {
    arena: &'a Bump,
    scanner: Scanner,
    file_name: &'a str,
    /// End of the previously consumed token; nodes end here.
    prev_token_end: u32,
    /// Set while parsing a `for` head, where `in` ends the initializer.
    disallow_in: bool,
    errors: Vec<SyntaxError>,
    /// Tracks recursion depth to prevent stack overflow on deeply nested input.
    recursion_depth: u32,
}

impl<'a> Parser<'a> {
    pub fn new(arena: &'a Bump, file_name: &str, source_text: &str) -> Self {
        Self {
            arena,
            scanner: Scanner::new(source_text),
            file_name: arena.alloc_str(file_name),
            prev_token_end: 0,
            disallow_in: false,
            errors: Vec::new(),
            recursion_depth: 0,
        }
    }

    pub fn parse_source_file(mut self) -> ParseResult<'a> {
        self.scanner.skip_shebang();
        self.next_token();

        let mut statements = self.parse_statement_list();
        while self.current_token() == SyntaxKind::CloseBraceToken {
            // A stray `}` at the top level.
            self.error(syntax_messages::DECLARATION_OR_STATEMENT_EXPECTED);
            self.next_token();
            statements.extend(self.parse_statement_list());
        }
        let statements = alloc_vec_in(self.arena, statements);
        let end = self.scanner.text_len() as u32;

        let comments: Vec<CommentRange<'a>> = self
            .scanner
            .take_comments()
            .into_iter()
            .map(|c| CommentRange {
                range: c.range,
                text: self.arena.alloc_str(&c.text),
            })
            .collect();

        let mut errors = self.scanner.take_errors();
        errors.append(&mut self.errors);
        errors.sort_by_key(|e| e.pos);

        ParseResult {
            source_file: SourceFile {
                data: NodeData::new(SyntaxKind::SourceFile, 0, end),
                statements,
                file_name: self.file_name,
                comments: alloc_vec_in(self.arena, comments),
            },
            errors,
        }
    }

    // ========================================================================
    // Token management
    // ========================================================================

    #[inline]
    fn current_token(&self) -> SyntaxKind { self.scanner.token() }

    #[inline]
    fn next_token(&mut self) -> SyntaxKind {
        self.prev_token_end = self.scanner.token_end() as u32;
        self.scanner.scan()
    }

    #[inline]
    fn token_pos(&self) -> u32 { self.scanner.token_start() as u32 }

    #[inline]
    fn token_end(&self) -> u32 { self.scanner.token_end() as u32 }

    #[inline]
    fn token_value(&self) -> &str { self.scanner.token_value() }

    fn expect_token(&mut self, kind: SyntaxKind) -> bool {
        if self.current_token() == kind {
            self.next_token();
            true
        } else {
            let text = kind.punctuation_text().unwrap_or("token");
            self.error(&format!("'{}' expected.", text));
            false
        }
    }

    fn optional_token(&mut self, kind: SyntaxKind) -> bool {
        if self.current_token() == kind {
            self.next_token();
            true
        } else {
            false
        }
    }

    /// Consume a `;`, or accept an automatically inserted one.
    fn parse_expected_semicolon(&mut self) {
        if self.current_token() == SyntaxKind::SemicolonToken {
            self.next_token();
            return;
        }
        let can_insert = self.current_token() == SyntaxKind::CloseBraceToken
            || self.current_token() == SyntaxKind::EndOfFileToken
            || self.scanner.has_preceding_line_break();
        if !can_insert {
            self.error("';' expected.");
        }
    }

    fn error(&mut self, message: &str) {
        let pos = self.token_pos();
        if self.errors.last().map_or(false, |e| e.pos == pos) {
            return;
        }
        self.errors.push(SyntaxError::new(pos, message));
    }

    fn alloc_text(&self, text: &str) -> &'a str {
        self.arena.alloc_str(text)
    }

    // ========================================================================
    // Statement parsing
    // ========================================================================

    fn parse_statements(&mut self) -> &'a [Statement<'a>] {
        let statements = self.parse_statement_list();
        alloc_vec_in(self.arena, statements)
    }

    fn parse_statement_list(&mut self) -> Vec<Statement<'a>> {
        let mut statements = Vec::new();
        while !matches!(self.current_token(), SyntaxKind::EndOfFileToken | SyntaxKind::CloseBraceToken) {
            let start = self.token_pos();
            statements.push(self.parse_statement());
            if self.token_pos() == start {
                // No progress: drop the token and resynchronize.
                self.next_token();
                self.resynchronize();
            }
        }
        statements
    }

    /// Skip to the next `}` or statement keyword.
    fn resynchronize(&mut self) {
        loop {
            let token = self.current_token();
            if matches!(token, SyntaxKind::EndOfFileToken | SyntaxKind::CloseBraceToken) || token.begins_statement() {
                return;
            }
            self.next_token();
        }
    }

    /// A statement node that is just its keyword and an optional `;`.
    fn parse_bare_statement(&mut self, kind: SyntaxKind) -> NodeData {
        let pos = self.token_pos();
        self.next_token();
        let data = NodeData::new(kind, pos, self.prev_token_end);
        if kind == SyntaxKind::EmptyStatement {
            return data;
        }
        self.parse_expected_semicolon();
        data
    }

    fn parse_statement(&mut self) -> Statement<'a> {
        use SyntaxKind as K;
        match self.current_token() {
            K::SemicolonToken => Statement::EmptyStatement(self.parse_bare_statement(K::EmptyStatement)),
            K::DebuggerKeyword => Statement::DebuggerStatement(self.parse_bare_statement(K::DebuggerStatement)),
            K::OpenBraceToken => Statement::Block(self.parse_block()),
            K::VarKeyword | K::LetKeyword | K::ConstKeyword => self.parse_variable_statement(),
            K::FunctionKeyword => self.parse_function_declaration(),
            K::IfKeyword => self.parse_if_statement(),
            K::ReturnKeyword => self.parse_return_statement(),
            K::WhileKeyword => self.parse_while_statement(),
            K::ForKeyword => self.parse_for_statement(),
            K::DoKeyword => self.parse_do_statement(),
            K::ThrowKeyword => self.parse_throw_statement(),
            K::TryKeyword => self.parse_try_statement(),
            K::BreakKeyword => self.parse_break_statement(),
            K::ContinueKeyword => self.parse_continue_statement(),
            K::SwitchKeyword => self.parse_switch_statement(),
            K::WithKeyword => {
                self.error(syntax_messages::UNSUPPORTED_SYNTAX);
                self.next_token();
                self.parse_statement()
            }
            K::Identifier if self.is_labeled_statement() => self.parse_labeled_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn is_labeled_statement(&mut self) -> bool {
        self.scanner.look_ahead(|s| s.scan() == SyntaxKind::ColonToken)
    }

    fn parse_block(&mut self) -> Block<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::OpenBraceToken);
        let statements = self.parse_statements();
        self.expect_token(SyntaxKind::CloseBraceToken);
        let end = self.prev_token_end;
        Block {
            data: NodeData::new(SyntaxKind::Block, pos, end),
            statements,
        }
    }

    fn parse_variable_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        let decl_list = self.parse_variable_declaration_list();
        let end = self.prev_token_end;
        self.parse_expected_semicolon();
        Statement::VariableStatement(VariableStatement {
            data: NodeData::new(SyntaxKind::VariableStatement, pos, end),
            declaration_list: decl_list,
        })
    }

    fn parse_variable_declaration_list(&mut self) -> VariableDeclarationList<'a> {
        let pos = self.token_pos();
        let flags = match self.current_token() {
            SyntaxKind::LetKeyword => NodeFlags::LET,
            SyntaxKind::ConstKeyword => NodeFlags::CONST,
            _ => NodeFlags::NONE,
        };
        self.next_token();

        let mut declarations = Vec::new();
        loop {
            declarations.push(self.parse_variable_declaration());
            if !self.optional_token(SyntaxKind::CommaToken) {
                break;
            }
        }
        let end = self.prev_token_end;
        VariableDeclarationList {
            data: NodeData::new(SyntaxKind::VariableDeclarationList, pos, end).with_flags(flags),
            declarations: alloc_vec_in(self.arena, declarations),
        }
    }

    fn parse_variable_declaration(&mut self) -> VariableDeclaration<'a> {
        let pos = self.token_pos();
        let name = self.parse_identifier();
        let initializer = if self.optional_token(SyntaxKind::EqualsToken) {
            Some(self.parse_assignment_expression_and_alloc())
        } else {
            None
        };
        let end = self.prev_token_end;
        VariableDeclaration {
            data: NodeData::new(SyntaxKind::VariableDeclaration, pos, end),
            name,
            initializer,
        }
    }

    /// Parse a binding identifier. Reserved words are rejected.
    fn parse_identifier(&mut self) -> Identifier<'a> {
        let pos = self.token_pos();
        let end = self.token_end();
        if self.current_token() == SyntaxKind::Identifier {
            let text = self.alloc_text(self.token_value());
            self.next_token();
            return Identifier { data: NodeData::new(SyntaxKind::Identifier, pos, end), text };
        }
        self.error(syntax_messages::IDENTIFIER_EXPECTED);
        // Always advance to prevent infinite loops in callers.
        if self.current_token() != SyntaxKind::EndOfFileToken
            && self.current_token() != SyntaxKind::CloseBraceToken
        {
            self.next_token();
        }
        Identifier {
            data: NodeData::new(SyntaxKind::Identifier, pos, end).with_flags(NodeFlags::THIS_NODE_HAS_ERROR),
            text: "",
        }
    }

    /// Parse a property name after `.`; reserved words are allowed.
    fn parse_identifier_name(&mut self) -> Identifier<'a> {
        if self.current_token().is_keyword() {
            let pos = self.token_pos();
            let end = self.token_end();
            let text = self.alloc_text(self.token_value());
            self.next_token();
            return Identifier { data: NodeData::new(SyntaxKind::Identifier, pos, end), text };
        }
        self.parse_identifier()
    }

    fn parse_expression_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        let expr = self.parse_expression_and_alloc();
        let end = self.prev_token_end;
        self.parse_expected_semicolon();
        Statement::ExpressionStatement(ExpressionStatement {
            data: NodeData::new(SyntaxKind::ExpressionStatement, pos, end),
            expression: expr,
        })
    }

    fn parse_if_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::IfKeyword);
        self.expect_token(SyntaxKind::OpenParenToken);
        let expression = self.parse_expression_and_alloc();
        self.expect_token(SyntaxKind::CloseParenToken);
        let then_statement = self.parse_statement_and_alloc();
        let else_statement = if self.optional_token(SyntaxKind::ElseKeyword) {
            Some(self.parse_statement_and_alloc())
        } else {
            None
        };
        let end = self.prev_token_end;
        Statement::IfStatement(IfStatement {
            data: NodeData::new(SyntaxKind::IfStatement, pos, end),
            expression,
            then_statement,
            else_statement,
        })
    }

    fn parse_statement_and_alloc(&mut self) -> &'a Statement<'a> {
        let stmt = self.parse_statement();
        self.arena.alloc(stmt)
    }

    fn parse_return_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::ReturnKeyword);
        let expression = if self.current_token() != SyntaxKind::SemicolonToken
            && self.current_token() != SyntaxKind::CloseBraceToken
            && self.current_token() != SyntaxKind::EndOfFileToken
            && !self.scanner.has_preceding_line_break()
        {
            Some(self.parse_expression_and_alloc())
        } else {
            None
        };
        let end = self.prev_token_end;
        self.parse_expected_semicolon();
        Statement::ReturnStatement(ReturnStatement {
            data: NodeData::new(SyntaxKind::ReturnStatement, pos, end),
            expression,
        })
    }

    fn parse_while_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::WhileKeyword);
        self.expect_token(SyntaxKind::OpenParenToken);
        let expression = self.parse_expression_and_alloc();
        self.expect_token(SyntaxKind::CloseParenToken);
        let statement = self.parse_statement_and_alloc();
        let end = self.prev_token_end;
        Statement::WhileStatement(WhileStatement {
            data: NodeData::new(SyntaxKind::WhileStatement, pos, end),
            expression,
            statement,
        })
    }

    fn parse_for_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::ForKeyword);
        self.expect_token(SyntaxKind::OpenParenToken);

        let saved_disallow_in = self.disallow_in;
        self.disallow_in = true;
        let initializer = if self.current_token() != SyntaxKind::SemicolonToken {
            if matches!(
                self.current_token(),
                SyntaxKind::VarKeyword | SyntaxKind::LetKeyword | SyntaxKind::ConstKeyword
            ) {
                Some(ForInitializer::VariableDeclarationList(self.parse_variable_declaration_list()))
            } else {
                Some(ForInitializer::Expression(self.parse_expression_and_alloc()))
            }
        } else {
            None
        };
        self.disallow_in = saved_disallow_in;

        if self.current_token() == SyntaxKind::InKeyword {
            self.next_token();
            let expression = self.parse_expression_and_alloc();
            self.expect_token(SyntaxKind::CloseParenToken);
            let statement = self.parse_statement_and_alloc();
            let end = self.prev_token_end;
            let initializer = match initializer {
                Some(init) => init,
                None => {
                    self.error(syntax_messages::EXPRESSION_EXPECTED);
                    ForInitializer::Expression(self.arena.alloc(Expression::OmittedExpression(
                        NodeData::new(SyntaxKind::OmittedExpression, pos, pos),
                    )))
                }
            };
            return Statement::ForInStatement(ForInStatement {
                data: NodeData::new(SyntaxKind::ForInStatement, pos, end),
                initializer,
                expression,
                statement,
            });
        }

        // Regular for statement
        self.expect_token(SyntaxKind::SemicolonToken);
        let condition = if self.current_token() != SyntaxKind::SemicolonToken {
            Some(self.parse_expression_and_alloc())
        } else {
            None
        };
        self.expect_token(SyntaxKind::SemicolonToken);
        let incrementor = if self.current_token() != SyntaxKind::CloseParenToken {
            Some(self.parse_expression_and_alloc())
        } else {
            None
        };
        self.expect_token(SyntaxKind::CloseParenToken);
        let statement = self.parse_statement_and_alloc();
        let end = self.prev_token_end;

        Statement::ForStatement(ForStatement {
            data: NodeData::new(SyntaxKind::ForStatement, pos, end),
            initializer,
            condition,
            incrementor,
            statement,
        })
    }

    fn parse_do_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::DoKeyword);
        let statement = self.parse_statement_and_alloc();
        self.expect_token(SyntaxKind::WhileKeyword);
        self.expect_token(SyntaxKind::OpenParenToken);
        let expression = self.parse_expression_and_alloc();
        self.expect_token(SyntaxKind::CloseParenToken);
        let end = self.prev_token_end;
        // A `;` after do-while is optional even on the same line.
        self.optional_token(SyntaxKind::SemicolonToken);
        Statement::DoStatement(DoStatement {
            data: NodeData::new(SyntaxKind::DoStatement, pos, end),
            statement,
            expression,
        })
    }

    fn parse_throw_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::ThrowKeyword);
        // No line terminator is allowed between `throw` and its expression.
        if self.scanner.has_preceding_line_break() {
            self.error(syntax_messages::EXPRESSION_EXPECTED);
        }
        let expression = self.parse_expression_and_alloc();
        let end = self.prev_token_end;
        self.parse_expected_semicolon();
        Statement::ThrowStatement(ThrowStatement {
            data: NodeData::new(SyntaxKind::ThrowStatement, pos, end),
            expression,
        })
    }

    fn parse_try_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::TryKeyword);
        let try_block = self.parse_block();
        let catch_clause = if self.current_token() == SyntaxKind::CatchKeyword {
            let catch_pos = self.token_pos();
            self.next_token();
            self.expect_token(SyntaxKind::OpenParenToken);
            let variable = self.parse_identifier();
            self.expect_token(SyntaxKind::CloseParenToken);
            let block = self.parse_block();
            let catch_end = self.prev_token_end;
            Some(CatchClause {
                data: NodeData::new(SyntaxKind::CatchClause, catch_pos, catch_end),
                variable,
                block,
            })
        } else {
            None
        };
        let finally_block = if self.optional_token(SyntaxKind::FinallyKeyword) {
            Some(self.parse_block())
        } else {
            None
        };
        if catch_clause.is_none() && finally_block.is_none() {
            self.error("'catch' or 'finally' expected.");
        }
        let end = self.prev_token_end;
        Statement::TryStatement(TryStatement {
            data: NodeData::new(SyntaxKind::TryStatement, pos, end),
            try_block,
            catch_clause,
            finally_block,
        })
    }

    fn parse_optional_label(&mut self) -> Option<Identifier<'a>> {
        if self.current_token() == SyntaxKind::Identifier && !self.scanner.has_preceding_line_break() {
            Some(self.parse_identifier())
        } else {
            None
        }
    }

    fn parse_break_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::BreakKeyword);
        let label = self.parse_optional_label();
        let end = self.prev_token_end;
        self.parse_expected_semicolon();
        Statement::BreakStatement(BreakStatement {
            data: NodeData::new(SyntaxKind::BreakStatement, pos, end),
            label,
        })
    }

    fn parse_continue_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::ContinueKeyword);
        let label = self.parse_optional_label();
        let end = self.prev_token_end;
        self.parse_expected_semicolon();
        Statement::ContinueStatement(ContinueStatement {
            data: NodeData::new(SyntaxKind::ContinueStatement, pos, end),
            label,
        })
    }

    fn parse_switch_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::SwitchKeyword);
        self.expect_token(SyntaxKind::OpenParenToken);
        let expression = self.parse_expression_and_alloc();
        self.expect_token(SyntaxKind::CloseParenToken);
        self.expect_token(SyntaxKind::OpenBraceToken);

        let mut clauses = Vec::new();
        while self.current_token() != SyntaxKind::CloseBraceToken
            && self.current_token() != SyntaxKind::EndOfFileToken
        {
            let clause_pos = self.token_pos();
            let (kind, case_expr) = match self.current_token() {
                SyntaxKind::CaseKeyword => {
                    self.next_token();
                    (SyntaxKind::CaseClause, Some(self.parse_expression_and_alloc()))
                }
                SyntaxKind::DefaultKeyword => {
                    self.next_token();
                    (SyntaxKind::DefaultClause, None)
                }
                _ => {
                    self.error("'case' or 'default' expected.");
                    self.next_token(); // error recovery
                    continue;
                }
            };
            self.expect_token(SyntaxKind::ColonToken);
            let mut stmts = Vec::new();
            while !matches!(
                self.current_token(),
                SyntaxKind::CaseKeyword
                    | SyntaxKind::DefaultKeyword
                    | SyntaxKind::CloseBraceToken
                    | SyntaxKind::EndOfFileToken
            ) {
                stmts.push(self.parse_statement());
            }
            let clause_end = self.prev_token_end;
            clauses.push(CaseClause {
                data: NodeData::new(kind, clause_pos, clause_end),
                expression: case_expr,
                statements: alloc_vec_in(self.arena, stmts),
            });
        }
        self.expect_token(SyntaxKind::CloseBraceToken);
        let end = self.prev_token_end;

        Statement::SwitchStatement(SwitchStatement {
            data: NodeData::new(SyntaxKind::SwitchStatement, pos, end),
            expression,
            clauses: alloc_vec_in(self.arena, clauses),
        })
    }

    fn parse_labeled_statement(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        let label = self.parse_identifier();
        self.expect_token(SyntaxKind::ColonToken);
        let statement = self.parse_statement_and_alloc();
        let end = self.prev_token_end;
        Statement::LabeledStatement(LabeledStatement {
            data: NodeData::new(SyntaxKind::LabeledStatement, pos, end),
            label,
            statement,
        })
    }

    // ========================================================================
    // Functions
    // ========================================================================

    fn parse_function_declaration(&mut self) -> Statement<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::FunctionKeyword);
        let name = self.parse_identifier();
        let parameters = self.parse_parameter_list();
        let body = self.parse_function_body();
        let end = self.prev_token_end;
        Statement::FunctionDeclaration(FunctionDeclaration {
            data: NodeData::new(SyntaxKind::FunctionDeclaration, pos, end),
            name,
            parameters,
            body,
        })
    }

    fn parse_function_expression(&mut self) -> Expression<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::FunctionKeyword);
        let name = if self.current_token() == SyntaxKind::Identifier {
            Some(self.parse_identifier())
        } else {
            None
        };
        let parameters = self.parse_parameter_list();
        let body = self.parse_function_body();
        let end = self.prev_token_end;
        Expression::FunctionExpression(FunctionExpression {
            data: NodeData::new(SyntaxKind::FunctionExpression, pos, end),
            name,
            parameters,
            body,
        })
    }

    fn parse_parameter_list(&mut self) -> &'a [Parameter<'a>] {
        self.expect_token(SyntaxKind::OpenParenToken);
        let mut parameters = Vec::new();
        while self.current_token() != SyntaxKind::CloseParenToken
            && self.current_token() != SyntaxKind::EndOfFileToken
        {
            let pos = self.token_pos();
            let name = self.parse_identifier();
            parameters.push(Parameter {
                data: NodeData::new(SyntaxKind::Parameter, pos, self.prev_token_end),
                name,
            });
            if !self.optional_token(SyntaxKind::CommaToken) {
                break;
            }
        }
        self.expect_token(SyntaxKind::CloseParenToken);
        alloc_vec_in(self.arena, parameters)
    }

    fn parse_function_body(&mut self) -> Block<'a> {
        let saved_disallow_in = std::mem::replace(&mut self.disallow_in, false);
        let body = self.parse_block();
        self.disallow_in = saved_disallow_in;
        body
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn parse_expression_and_alloc(&mut self) -> &'a Expression<'a> {
        let expr = self.parse_expression();
        self.arena.alloc(expr)
    }

    fn parse_assignment_expression_and_alloc(&mut self) -> &'a Expression<'a> {
        let expr = self.parse_assignment_expression();
        self.arena.alloc(expr)
    }

    /// Parse with `in` allowed again, as inside brackets of any kind.
    fn parse_expression_allowing_in(&mut self) -> Expression<'a> {
        let saved_disallow_in = std::mem::replace(&mut self.disallow_in, false);
        let expr = self.parse_expression();
        self.disallow_in = saved_disallow_in;
        expr
    }

    fn parse_expression(&mut self) -> Expression<'a> {
        self.recursion_depth += 1;
        if self.recursion_depth > MAX_RECURSION_DEPTH {
            self.error(syntax_messages::EXPRESSION_EXPECTED);
            self.recursion_depth -= 1;
            let pos = self.token_pos();
            return Expression::OmittedExpression(NodeData::new(SyntaxKind::OmittedExpression, pos, pos));
        }
        // Comma expression: a, b, c → nested Binary(left, CommaToken, right)
        let mut expr = self.parse_assignment_expression();
        while self.current_token() == SyntaxKind::CommaToken {
            let pos = expr.pos();
            self.next_token(); // consume comma
            let right = self.parse_assignment_expression();
            let end = self.prev_token_end;
            let left_ref = self.arena.alloc(expr);
            let right_ref = self.arena.alloc(right);
            expr = Expression::Binary(BinaryExpression {
                data: NodeData::new(SyntaxKind::BinaryExpression, pos, end),
                left: left_ref,
                operator: SyntaxKind::CommaToken,
                right: right_ref,
            });
        }
        self.recursion_depth -= 1;
        expr
    }

    fn parse_assignment_expression(&mut self) -> Expression<'a> {
        let expr = self.parse_conditional_expression();

        // Assignment operators
        if self.current_token().is_assignment_operator() {
            if !is_valid_assignment_target(&expr) {
                self.error(syntax_messages::INVALID_ASSIGNMENT_TARGET);
            }
            let pos = expr.pos();
            let operator = self.current_token();
            self.next_token();
            let right = self.parse_assignment_expression();
            let right_ref = self.arena.alloc(right);
            let expr_ref = self.arena.alloc(expr);
            let end = self.prev_token_end;
            return Expression::Binary(BinaryExpression {
                data: NodeData::new(SyntaxKind::BinaryExpression, pos, end),
                left: expr_ref,
                operator,
                right: right_ref,
            });
        }

        expr
    }

    fn parse_conditional_expression(&mut self) -> Expression<'a> {
        let expr = self.parse_binary_expression(Precedence::LOWEST);

        // Ternary: cond ? true : false
        if self.current_token() == SyntaxKind::QuestionToken {
            let pos = expr.pos();
            self.next_token();
            let saved_disallow_in = std::mem::replace(&mut self.disallow_in, false);
            let when_true = self.parse_assignment_expression_and_alloc();
            self.disallow_in = saved_disallow_in;
            self.expect_token(SyntaxKind::ColonToken);
            let when_false = self.parse_assignment_expression_and_alloc();
            let condition = self.arena.alloc(expr);
            let end = self.prev_token_end;
            return Expression::Conditional(ConditionalExpression {
                data: NodeData::new(SyntaxKind::ConditionalExpression, pos, end),
                condition,
                when_true,
                when_false,
            });
        }

        expr
    }

    fn parse_binary_expression(&mut self, min_precedence: Precedence) -> Expression<'a> {
        let mut left = self.parse_unary_expression();

        loop {
            let operator = self.current_token();
            if operator == SyntaxKind::InKeyword && self.disallow_in {
                break;
            }
            let Some(precedence) = Precedence::of_binary(operator).filter(|p| *p > min_precedence) else {
                break;
            };

            let pos = left.pos();
            self.next_token();
            let right = self.parse_binary_expression(precedence);
            let left_ref = self.arena.alloc(left);
            let right_ref = self.arena.alloc(right);
            let end = self.prev_token_end;
            left = Expression::Binary(BinaryExpression {
                data: NodeData::new(SyntaxKind::BinaryExpression, pos, end),
                left: left_ref,
                operator,
                right: right_ref,
            });
        }

        left
    }

    fn parse_unary_expression(&mut self) -> Expression<'a> {
        let pos = self.token_pos();
        match self.current_token() {
            SyntaxKind::PlusPlusToken
            | SyntaxKind::MinusMinusToken
            | SyntaxKind::PlusToken
            | SyntaxKind::MinusToken
            | SyntaxKind::TildeToken
            | SyntaxKind::ExclamationToken => {
                let operator = self.current_token();
                self.next_token();
                let operand = self.parse_unary_expression();
                let operand = self.arena.alloc(operand);
                let end = self.prev_token_end;
                Expression::PrefixUnary(PrefixUnaryExpression {
                    data: NodeData::new(SyntaxKind::PrefixUnaryExpression, pos, end),
                    operator,
                    operand,
                })
            }
            SyntaxKind::TypeOfKeyword => {
                self.next_token();
                let expression = self.parse_unary_expression();
                let expression = self.arena.alloc(expression);
                let end = self.prev_token_end;
                Expression::TypeOf(TypeOfExpression {
                    data: NodeData::new(SyntaxKind::TypeOfExpression, pos, end),
                    expression,
                })
            }
            SyntaxKind::DeleteKeyword => {
                self.next_token();
                let expression = self.parse_unary_expression();
                let expression = self.arena.alloc(expression);
                let end = self.prev_token_end;
                Expression::Delete(DeleteExpression {
                    data: NodeData::new(SyntaxKind::DeleteExpression, pos, end),
                    expression,
                })
            }
            SyntaxKind::VoidKeyword => {
                self.next_token();
                let expression = self.parse_unary_expression();
                let expression = self.arena.alloc(expression);
                let end = self.prev_token_end;
                Expression::Void(VoidExpression {
                    data: NodeData::new(SyntaxKind::VoidExpression, pos, end),
                    expression,
                })
            }
            _ => self.parse_postfix_expression(),
        }
    }

    fn parse_postfix_expression(&mut self) -> Expression<'a> {
        let expr = self.parse_left_hand_side_expression();
        if !self.scanner.has_preceding_line_break()
            && matches!(self.current_token(), SyntaxKind::PlusPlusToken | SyntaxKind::MinusMinusToken)
        {
            let pos = expr.pos();
            let operator = self.current_token();
            let end = self.token_end();
            self.next_token();
            let operand = self.arena.alloc(expr);
            return Expression::PostfixUnary(PostfixUnaryExpression {
                data: NodeData::new(SyntaxKind::PostfixUnaryExpression, pos, end),
                operand,
                operator,
            });
        }
        expr
    }

    fn parse_left_hand_side_expression(&mut self) -> Expression<'a> {
        let expr = if self.current_token() == SyntaxKind::NewKeyword {
            self.parse_new_expression()
        } else {
            self.parse_primary_expression()
        };
        self.parse_member_and_call_tail(expr, true)
    }

    /// Parse `.name`, `[expr]` and (when allowed) `(args)` suffixes.
    fn parse_member_and_call_tail(&mut self, mut expr: Expression<'a>, allow_calls: bool) -> Expression<'a> {
        loop {
            let pos = expr.pos();
            match self.current_token() {
                SyntaxKind::DotToken => {
                    self.next_token();
                    let name = self.parse_identifier_name();
                    let end = self.prev_token_end;
                    let expression = self.arena.alloc(expr);
                    expr = Expression::PropertyAccess(PropertyAccessExpression {
                        data: NodeData::new(SyntaxKind::PropertyAccessExpression, pos, end),
                        expression,
                        name,
                    });
                }
                SyntaxKind::OpenBracketToken => {
                    self.next_token();
                    let argument = self.parse_expression_allowing_in();
                    let argument_expression = self.arena.alloc(argument);
                    self.expect_token(SyntaxKind::CloseBracketToken);
                    let end = self.prev_token_end;
                    let expression = self.arena.alloc(expr);
                    expr = Expression::ElementAccess(ElementAccessExpression {
                        data: NodeData::new(SyntaxKind::ElementAccessExpression, pos, end),
                        expression,
                        argument_expression,
                    });
                }
                SyntaxKind::OpenParenToken if allow_calls => {
                    let arguments = self.parse_argument_list();
                    let end = self.prev_token_end;
                    let expression = self.arena.alloc(expr);
                    expr = Expression::Call(CallExpression {
                        data: NodeData::new(SyntaxKind::CallExpression, pos, end),
                        expression,
                        arguments,
                    });
                }
                _ => break,
            }
        }
        expr
    }

    fn parse_new_expression(&mut self) -> Expression<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::NewKeyword);
        let callee = if self.current_token() == SyntaxKind::NewKeyword {
            self.parse_new_expression()
        } else {
            self.parse_primary_expression()
        };
        // Member access binds tighter than `new`, the argument list does not.
        let callee = self.parse_member_and_call_tail(callee, false);
        let expression = self.arena.alloc(callee);
        let arguments = if self.current_token() == SyntaxKind::OpenParenToken {
            Some(self.parse_argument_list())
        } else {
            None
        };
        let end = self.prev_token_end;
        Expression::New(NewExpression {
            data: NodeData::new(SyntaxKind::NewExpression, pos, end),
            expression,
            arguments,
        })
    }

    fn parse_argument_list(&mut self) -> &'a [Expression<'a>] {
        self.expect_token(SyntaxKind::OpenParenToken);
        let saved_disallow_in = std::mem::replace(&mut self.disallow_in, false);
        let mut args = Vec::new();
        while self.current_token() != SyntaxKind::CloseParenToken
            && self.current_token() != SyntaxKind::EndOfFileToken
        {
            args.push(self.parse_assignment_expression());
            if !self.optional_token(SyntaxKind::CommaToken) {
                break;
            }
        }
        self.disallow_in = saved_disallow_in;
        self.expect_token(SyntaxKind::CloseParenToken);
        alloc_vec_in(self.arena, args)
    }

    fn parse_primary_expression(&mut self) -> Expression<'a> {
        let pos = self.token_pos();
        let end = self.token_end();
        match self.current_token() {
            SyntaxKind::Identifier => Expression::Identifier(self.parse_identifier()),
            SyntaxKind::NumericLiteral => Expression::NumericLiteral(self.parse_numeric_literal()),
            SyntaxKind::StringLiteral => Expression::StringLiteral(self.parse_string_literal()),
            SyntaxKind::TrueKeyword => {
                self.next_token();
                Expression::TrueKeyword(NodeData::new(SyntaxKind::TrueKeyword, pos, end))
            }
            SyntaxKind::FalseKeyword => {
                self.next_token();
                Expression::FalseKeyword(NodeData::new(SyntaxKind::FalseKeyword, pos, end))
            }
            SyntaxKind::NullKeyword => {
                self.next_token();
                Expression::NullKeyword(NodeData::new(SyntaxKind::NullKeyword, pos, end))
            }
            SyntaxKind::ThisKeyword => {
                self.next_token();
                Expression::ThisKeyword(NodeData::new(SyntaxKind::ThisKeyword, pos, end))
            }
            SyntaxKind::OpenParenToken => self.parse_parenthesized_expression(),
            SyntaxKind::OpenBracketToken => self.parse_array_literal(),
            SyntaxKind::OpenBraceToken => self.parse_object_literal(),
            SyntaxKind::FunctionKeyword => self.parse_function_expression(),
            SyntaxKind::SlashToken | SyntaxKind::SlashEqualsToken => {
                self.scanner.rescan_slash_token();
                let end = self.token_end();
                let text = self.alloc_text(self.token_value());
                self.next_token();
                Expression::RegularExpressionLiteral(RegularExpressionLiteral {
                    data: NodeData::new(SyntaxKind::RegularExpressionLiteral, pos, end),
                    text,
                })
            }
            _ => self.parse_missing_expression(),
        }
    }

    fn parse_numeric_literal(&mut self) -> NumericLiteral<'a> {
        let pos = self.token_pos();
        let end = self.token_end();
        let text = self.alloc_text(self.token_value());
        let numeric_literal_flags = self.scanner.token_flags() & TokenFlags::NUMERIC_LITERAL_FLAGS;
        self.next_token();
        NumericLiteral {
            data: NodeData::new(SyntaxKind::NumericLiteral, pos, end),
            text,
            numeric_literal_flags,
        }
    }

    fn parse_string_literal(&mut self) -> StringLiteral<'a> {
        let pos = self.token_pos();
        let end = self.token_end();
        let text = self.alloc_text(self.token_value());
        let is_single_quote = self.scanner.source_char(pos as usize) == Some('\'');
        self.next_token();
        StringLiteral {
            data: NodeData::new(SyntaxKind::StringLiteral, pos, end),
            text,
            is_single_quote,
        }
    }

    fn parse_missing_expression(&mut self) -> Expression<'a> {
        let pos = self.token_pos();
        self.error(syntax_messages::EXPRESSION_EXPECTED);
        if !matches!(
            self.current_token(),
            SyntaxKind::EndOfFileToken | SyntaxKind::CloseBraceToken | SyntaxKind::SemicolonToken
        ) {
            self.next_token();
        }
        Expression::OmittedExpression(
            NodeData::new(SyntaxKind::OmittedExpression, pos, pos).with_flags(NodeFlags::THIS_NODE_HAS_ERROR),
        )
    }

    fn parse_parenthesized_expression(&mut self) -> Expression<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::OpenParenToken);
        let inner = self.parse_expression_allowing_in();
        let expression = self.arena.alloc(inner);
        self.expect_token(SyntaxKind::CloseParenToken);
        let end = self.prev_token_end;
        Expression::Parenthesized(ParenthesizedExpression {
            data: NodeData::new(SyntaxKind::ParenthesizedExpression, pos, end),
            expression,
        })
    }

    fn parse_array_literal(&mut self) -> Expression<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::OpenBracketToken);
        let saved_disallow_in = std::mem::replace(&mut self.disallow_in, false);
        let mut elements = Vec::new();
        while self.current_token() != SyntaxKind::CloseBracketToken
            && self.current_token() != SyntaxKind::EndOfFileToken
        {
            if self.current_token() == SyntaxKind::CommaToken {
                let epos = self.token_pos();
                elements.push(Expression::OmittedExpression(NodeData::new(SyntaxKind::OmittedExpression, epos, epos)));
            } else {
                elements.push(self.parse_assignment_expression());
            }
            if !self.optional_token(SyntaxKind::CommaToken) {
                break;
            }
        }
        self.disallow_in = saved_disallow_in;
        self.expect_token(SyntaxKind::CloseBracketToken);
        let end = self.prev_token_end;
        Expression::ArrayLiteral(ArrayLiteralExpression {
            data: NodeData::new(SyntaxKind::ArrayLiteralExpression, pos, end),
            elements: alloc_vec_in(self.arena, elements),
        })
    }

    fn parse_object_literal(&mut self) -> Expression<'a> {
        let pos = self.token_pos();
        self.expect_token(SyntaxKind::OpenBraceToken);
        let saved_disallow_in = std::mem::replace(&mut self.disallow_in, false);
        let mut properties = Vec::new();
        while self.current_token() != SyntaxKind::CloseBraceToken
            && self.current_token() != SyntaxKind::EndOfFileToken
        {
            if let Some(property) = self.parse_property_assignment() {
                properties.push(property);
            }
            if !self.optional_token(SyntaxKind::CommaToken) {
                break;
            }
        }
        self.disallow_in = saved_disallow_in;
        self.expect_token(SyntaxKind::CloseBraceToken);
        let end = self.prev_token_end;
        Expression::ObjectLiteral(ObjectLiteralExpression {
            data: NodeData::new(SyntaxKind::ObjectLiteralExpression, pos, end),
            properties: alloc_vec_in(self.arena, properties),
        })
    }

    fn parse_property_assignment(&mut self) -> Option<PropertyAssignment<'a>> {
        let pos = self.token_pos();
        let name = match self.current_token() {
            SyntaxKind::StringLiteral => PropertyName::StringLiteral(self.parse_string_literal()),
            SyntaxKind::NumericLiteral => PropertyName::NumericLiteral(self.parse_numeric_literal()),
            kind if kind.is_identifier_or_keyword() => {
                let is_accessor = matches!(self.token_value(), "get" | "set")
                    && self.scanner.look_ahead(|s| s.scan().is_identifier_or_keyword());
                if is_accessor {
                    self.error(syntax_messages::UNSUPPORTED_SYNTAX);
                    self.skip_accessor();
                    return None;
                }
                PropertyName::Identifier(self.parse_identifier_name())
            }
            _ => {
                self.error("Property assignment expected.");
                self.next_token();
                return None;
            }
        };
        self.expect_token(SyntaxKind::ColonToken);
        let initializer = self.parse_assignment_expression_and_alloc();
        let end = self.prev_token_end;
        Some(PropertyAssignment {
            data: NodeData::new(SyntaxKind::PropertyAssignment, pos, end),
            name,
            initializer,
        })
    }

    /// Skip `get name() { ... }` so that parsing can continue after it.
    fn skip_accessor(&mut self) {
        self.next_token(); // get / set
        self.next_token(); // name
        self.parse_parameter_list();
        self.parse_function_body();
    }
}

/// Whether an expression may appear on the left of an assignment.
fn is_valid_assignment_target(expr: &Expression<'_>) -> bool {
    match expr {
        Expression::Identifier(_)
        | Expression::PropertyAccess(_)
        | Expression::ElementAccess(_) => true,
        Expression::Parenthesized(p) => is_valid_assignment_target(p.expression),
        _ => false,
    }
}
