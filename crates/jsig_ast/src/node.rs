//! AST node definitions for annotated JavaScript.
//!
//! Nodes are allocated in a `bumpalo` arena owned by the caller and reference
//! their children through `&'a` borrows. Identifier and literal text is copied
//! into the same arena.

use crate::syntax_kind::SyntaxKind;
use crate::types::*;
use jsig_core::text::TextRange;

// ============================================================================
// Core Node Wrapper
// ============================================================================

/// Common data shared by all AST nodes.
#[derive(Debug, Clone, Copy)]
pub struct NodeData {
    /// The kind of this node.
    pub kind: SyntaxKind,
    /// Source position range.
    pub range: TextRange,
    /// Node flags.
    pub flags: NodeFlags,
}

impl NodeData {
    pub fn new(kind: SyntaxKind, pos: u32, end: u32) -> Self {
        Self {
            kind,
            range: TextRange::new(pos, end),
            flags: NodeFlags::NONE,
        }
    }

    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// A list of nodes, allocated in the arena.
pub type NodeList<'a, T> = &'a [T];

/// An optional arena-allocated node.
pub type OptionalNode<'a, T> = Option<&'a T>;

// ============================================================================
// Source File
// ============================================================================

#[derive(Debug)]
pub struct SourceFile<'a> {
    pub data: NodeData,
    pub statements: NodeList<'a, Statement<'a>>,
    pub file_name: &'a str,
    /// Every `/* ... */` comment in the file, in source order.
    pub comments: NodeList<'a, CommentRange<'a>>,
}

/// A block comment and its full text, delimiters included.
#[derive(Debug, Clone, Copy)]
pub struct CommentRange<'a> {
    pub range: TextRange,
    pub text: &'a str,
}

impl<'a> CommentRange<'a> {
    /// Text between `/*` and `*/`.
    pub fn body(&self) -> &'a str {
        let text = self.text.strip_prefix("/*").unwrap_or(self.text);
        text.strip_suffix("*/").unwrap_or(text)
    }
}

// ============================================================================
// Identifier
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct Identifier<'a> {
    pub data: NodeData,
    pub text: &'a str,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug)]
pub enum Statement<'a> {
    VariableStatement(VariableStatement<'a>),
    FunctionDeclaration(FunctionDeclaration<'a>),
    Block(Block<'a>),
    EmptyStatement(NodeData),
    ExpressionStatement(ExpressionStatement<'a>),
    IfStatement(IfStatement<'a>),
    DoStatement(DoStatement<'a>),
    WhileStatement(WhileStatement<'a>),
    ForStatement(ForStatement<'a>),
    ForInStatement(ForInStatement<'a>),
    ContinueStatement(ContinueStatement<'a>),
    BreakStatement(BreakStatement<'a>),
    ReturnStatement(ReturnStatement<'a>),
    SwitchStatement(SwitchStatement<'a>),
    LabeledStatement(LabeledStatement<'a>),
    ThrowStatement(ThrowStatement<'a>),
    TryStatement(TryStatement<'a>),
    DebuggerStatement(NodeData),
}

#[derive(Debug)]
pub struct Block<'a> {
    pub data: NodeData,
    pub statements: NodeList<'a, Statement<'a>>,
}

#[derive(Debug)]
pub struct VariableStatement<'a> {
    pub data: NodeData,
    pub declaration_list: VariableDeclarationList<'a>,
}

/// `var`, `let` or `const` declarations; the flags carry `LET`/`CONST`.
#[derive(Debug)]
pub struct VariableDeclarationList<'a> {
    pub data: NodeData,
    pub declarations: NodeList<'a, VariableDeclaration<'a>>,
}

#[derive(Debug)]
pub struct VariableDeclaration<'a> {
    pub data: NodeData,
    pub name: Identifier<'a>,
    pub initializer: OptionalNode<'a, Expression<'a>>,
}

#[derive(Debug)]
pub struct ExpressionStatement<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct IfStatement<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
    pub then_statement: &'a Statement<'a>,
    pub else_statement: OptionalNode<'a, Statement<'a>>,
}

#[derive(Debug)]
pub struct DoStatement<'a> {
    pub data: NodeData,
    pub statement: &'a Statement<'a>,
    pub expression: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct WhileStatement<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
    pub statement: &'a Statement<'a>,
}

/// Initializer of a `for` or `for-in` head.
#[derive(Debug)]
pub enum ForInitializer<'a> {
    VariableDeclarationList(VariableDeclarationList<'a>),
    Expression(&'a Expression<'a>),
}

#[derive(Debug)]
pub struct ForStatement<'a> {
    pub data: NodeData,
    pub initializer: Option<ForInitializer<'a>>,
    pub condition: OptionalNode<'a, Expression<'a>>,
    pub incrementor: OptionalNode<'a, Expression<'a>>,
    pub statement: &'a Statement<'a>,
}

#[derive(Debug)]
pub struct ForInStatement<'a> {
    pub data: NodeData,
    pub initializer: ForInitializer<'a>,
    pub expression: &'a Expression<'a>,
    pub statement: &'a Statement<'a>,
}

#[derive(Debug)]
pub struct ContinueStatement<'a> {
    pub data: NodeData,
    pub label: Option<Identifier<'a>>,
}

#[derive(Debug)]
pub struct BreakStatement<'a> {
    pub data: NodeData,
    pub label: Option<Identifier<'a>>,
}

#[derive(Debug)]
pub struct ReturnStatement<'a> {
    pub data: NodeData,
    pub expression: OptionalNode<'a, Expression<'a>>,
}

#[derive(Debug)]
pub struct SwitchStatement<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
    pub clauses: NodeList<'a, CaseClause<'a>>,
}

/// A `case` clause, or the `default` clause when `expression` is `None`.
#[derive(Debug)]
pub struct CaseClause<'a> {
    pub data: NodeData,
    pub expression: OptionalNode<'a, Expression<'a>>,
    pub statements: NodeList<'a, Statement<'a>>,
}

#[derive(Debug)]
pub struct LabeledStatement<'a> {
    pub data: NodeData,
    pub label: Identifier<'a>,
    pub statement: &'a Statement<'a>,
}

#[derive(Debug)]
pub struct ThrowStatement<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct TryStatement<'a> {
    pub data: NodeData,
    pub try_block: Block<'a>,
    pub catch_clause: Option<CatchClause<'a>>,
    pub finally_block: Option<Block<'a>>,
}

#[derive(Debug)]
pub struct CatchClause<'a> {
    pub data: NodeData,
    pub variable: Identifier<'a>,
    pub block: Block<'a>,
}

// ============================================================================
// Functions
// ============================================================================

#[derive(Debug)]
pub struct Parameter<'a> {
    pub data: NodeData,
    pub name: Identifier<'a>,
}

#[derive(Debug)]
pub struct FunctionDeclaration<'a> {
    pub data: NodeData,
    pub name: Identifier<'a>,
    pub parameters: NodeList<'a, Parameter<'a>>,
    pub body: Block<'a>,
}

#[derive(Debug)]
pub struct FunctionExpression<'a> {
    pub data: NodeData,
    pub name: Option<Identifier<'a>>,
    pub parameters: NodeList<'a, Parameter<'a>>,
    pub body: Block<'a>,
}

/// The parts of a function the verifier needs, shared by declarations and
/// expressions.
#[derive(Debug, Clone, Copy)]
pub struct FunctionLike<'n, 'a> {
    pub data: &'n NodeData,
    pub name: Option<&'n Identifier<'a>>,
    pub parameters: NodeList<'a, Parameter<'a>>,
    pub body: &'n Block<'a>,
}

impl<'a> FunctionDeclaration<'a> {
    pub fn as_function_like(&self) -> FunctionLike<'_, 'a> {
        FunctionLike {
            data: &self.data,
            name: Some(&self.name),
            parameters: self.parameters,
            body: &self.body,
        }
    }
}

impl<'a> FunctionExpression<'a> {
    pub fn as_function_like(&self) -> FunctionLike<'_, 'a> {
        FunctionLike {
            data: &self.data,
            name: self.name.as_ref(),
            parameters: self.parameters,
            body: &self.body,
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug)]
pub enum Expression<'a> {
    Identifier(Identifier<'a>),
    StringLiteral(StringLiteral<'a>),
    NumericLiteral(NumericLiteral<'a>),
    RegularExpressionLiteral(RegularExpressionLiteral<'a>),
    ArrayLiteral(ArrayLiteralExpression<'a>),
    ObjectLiteral(ObjectLiteralExpression<'a>),
    PropertyAccess(PropertyAccessExpression<'a>),
    ElementAccess(ElementAccessExpression<'a>),
    Call(CallExpression<'a>),
    New(NewExpression<'a>),
    Parenthesized(ParenthesizedExpression<'a>),
    FunctionExpression(FunctionExpression<'a>),
    Delete(DeleteExpression<'a>),
    TypeOf(TypeOfExpression<'a>),
    Void(VoidExpression<'a>),
    PrefixUnary(PrefixUnaryExpression<'a>),
    PostfixUnary(PostfixUnaryExpression<'a>),
    Binary(BinaryExpression<'a>),
    Conditional(ConditionalExpression<'a>),
    OmittedExpression(NodeData),
    // Keyword expressions
    ThisKeyword(NodeData),
    NullKeyword(NodeData),
    TrueKeyword(NodeData),
    FalseKeyword(NodeData),
}

// -- Literal Expressions --

/// A string literal. `text` is the cooked value without quotes.
#[derive(Debug, Clone, Copy)]
pub struct StringLiteral<'a> {
    pub data: NodeData,
    pub text: &'a str,
    pub is_single_quote: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct NumericLiteral<'a> {
    pub data: NodeData,
    pub text: &'a str,
    pub numeric_literal_flags: TokenFlags,
}

#[derive(Debug, Clone, Copy)]
pub struct RegularExpressionLiteral<'a> {
    pub data: NodeData,
    pub text: &'a str,
}

// -- Compound Expressions --

#[derive(Debug)]
pub struct ArrayLiteralExpression<'a> {
    pub data: NodeData,
    pub elements: NodeList<'a, Expression<'a>>,
}

#[derive(Debug)]
pub struct ObjectLiteralExpression<'a> {
    pub data: NodeData,
    pub properties: NodeList<'a, PropertyAssignment<'a>>,
}

#[derive(Debug)]
pub struct PropertyAssignment<'a> {
    pub data: NodeData,
    pub name: PropertyName<'a>,
    pub initializer: &'a Expression<'a>,
}

#[derive(Debug, Clone, Copy)]
pub enum PropertyName<'a> {
    Identifier(Identifier<'a>),
    StringLiteral(StringLiteral<'a>),
    NumericLiteral(NumericLiteral<'a>),
}

impl<'a> PropertyName<'a> {
    /// The key this name introduces.
    pub fn text(&self) -> &'a str {
        match self {
            PropertyName::Identifier(id) => id.text,
            PropertyName::StringLiteral(s) => s.text,
            PropertyName::NumericLiteral(n) => n.text,
        }
    }
}

#[derive(Debug)]
pub struct PropertyAccessExpression<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
    pub name: Identifier<'a>,
}

#[derive(Debug)]
pub struct ElementAccessExpression<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
    pub argument_expression: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct CallExpression<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
    pub arguments: NodeList<'a, Expression<'a>>,
}

#[derive(Debug)]
pub struct NewExpression<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
    pub arguments: Option<NodeList<'a, Expression<'a>>>,
}

#[derive(Debug)]
pub struct ParenthesizedExpression<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct DeleteExpression<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct TypeOfExpression<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct VoidExpression<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct PrefixUnaryExpression<'a> {
    pub data: NodeData,
    pub operator: SyntaxKind,
    pub operand: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct PostfixUnaryExpression<'a> {
    pub data: NodeData,
    pub operand: &'a Expression<'a>,
    pub operator: SyntaxKind,
}

#[derive(Debug)]
pub struct BinaryExpression<'a> {
    pub data: NodeData,
    pub left: &'a Expression<'a>,
    pub operator: SyntaxKind,
    pub right: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct ConditionalExpression<'a> {
    pub data: NodeData,
    pub condition: &'a Expression<'a>,
    pub when_true: &'a Expression<'a>,
    pub when_false: &'a Expression<'a>,
}

// ============================================================================
// Span access
// ============================================================================

/// Implements `data`, `kind`, `pos` and `end` for a node enum. Variants listed
/// after `;` hold a bare `NodeData`.
macro_rules! impl_span_access {
    ($enum:ident { $($wrapped:ident),* ; $($bare:ident),* }) => {
        impl<'a> $enum<'a> {
            pub fn data(&self) -> &NodeData {
                match self {
                    $($enum::$wrapped(node) => &node.data,)*
                    $($enum::$bare(data) => data,)*
                }
            }

            #[inline]
            pub fn kind(&self) -> SyntaxKind {
                self.data().kind
            }

            #[inline]
            pub fn pos(&self) -> u32 {
                self.data().range.pos
            }

            #[inline]
            pub fn end(&self) -> u32 {
                self.data().range.end
            }
        }
    };
}

impl_span_access!(Statement {
    VariableStatement, FunctionDeclaration, Block, ExpressionStatement, IfStatement, DoStatement,
    WhileStatement, ForStatement, ForInStatement, ContinueStatement, BreakStatement, ReturnStatement,
    SwitchStatement, LabeledStatement, ThrowStatement, TryStatement;
    EmptyStatement, DebuggerStatement
});

impl_span_access!(Expression {
    Identifier, StringLiteral, NumericLiteral, RegularExpressionLiteral, ArrayLiteral, ObjectLiteral,
    PropertyAccess, ElementAccess, Call, New, Parenthesized, FunctionExpression, Delete, TypeOf, Void,
    PrefixUnary, PostfixUnary, Binary, Conditional;
    OmittedExpression, ThisKeyword, NullKeyword, TrueKeyword, FalseKeyword
});

impl<'a> Expression<'a> {
    /// The expression under any number of enclosing parentheses.
    pub fn skip_parentheses(&self) -> &Expression<'a> {
        match self {
            Expression::Parenthesized(inner) => inner.expression.skip_parentheses(),
            other => other,
        }
    }

    /// Name of a plain identifier, looking through parentheses.
    pub fn as_identifier_text(&self) -> Option<&'a str> {
        if let Expression::Identifier(id) = self.skip_parentheses() {
            Some(id.text)
        } else {
            None
        }
    }

    /// `object.name`, where `object` is an identifier.
    pub fn is_property_access_of(&self, object: &str, name: &str) -> bool {
        matches!(
            self.skip_parentheses(),
            Expression::PropertyAccess(access)
                if access.name.text == name && access.expression.as_identifier_text() == Some(object)
        )
    }
}
