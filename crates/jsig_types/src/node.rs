//! Type AST node definitions.
//!
//! Nodes are reference counted so the environment, the header declarations
//! and derived types can share subtrees without copying. Nodes never point
//! back at their parents; recursive types are expressed through named
//! aliases that the environment resolves on demand.

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::builtins::is_builtin_class;

/// A shared, immutable type node.
pub type TypeRef = Arc<TypeNode>;

// ============================================================================
// Type Node
// ============================================================================

/// A node of the signature type language.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeNode {
    /// A named class type: `String`, `Number`, or a user type name.
    Literal(LiteralType),
    /// A literal value type: `"a"`, `42`, `null`, `undefined`, `true`, `false`.
    Value(ValueType),
    /// `Original as Name`, an imported or locally renamed class type.
    Renamed(RenamedLiteral),
    /// `(this: T, a: A) => R`
    Function(FunctionType),
    /// `{ a: A, b: B }`
    Object(ObjectType),
    /// `A | B`
    Union(UnionType),
    /// `A & B`
    Intersection(IntersectionType),
    /// `Base<A, B>`
    Generic(GenericType),
    /// `[A, B]`
    Tuple(TupleType),
    /// The declared or derived type of `module.exports`.
    ModuleExports(ModuleExportsType),
}

// ============================================================================
// Literals
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LiteralType {
    pub name: String,
    /// Whether `name` refers to a builtin class rather than a user type.
    pub builtin: bool,
}

impl LiteralType {
    pub fn new(name: impl Into<String>, builtin: bool) -> Self {
        Self { name: name.into(), builtin }
    }

    /// A literal whose `builtin` flag is looked up in the builtin registry.
    pub fn resolve(name: impl Into<String>) -> Self {
        let name = name.into();
        let builtin = is_builtin_class(&name);
        Self { name, builtin }
    }
}

/// The six kinds of literal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Number,
    Null,
    Undefined,
    True,
    False,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Null => "null",
            ValueKind::Undefined => "undefined",
            ValueKind::True => "true",
            ValueKind::False => "false",
        }
    }

    /// The class a value of this kind widens to.
    pub fn class_name(self) -> &'static str {
        match self {
            ValueKind::String => "String",
            ValueKind::Number => "Number",
            ValueKind::True | ValueKind::False => "Boolean",
            ValueKind::Null => "null",
            ValueKind::Undefined => "undefined",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueType {
    /// The literal text. String values keep their quotes.
    pub value: String,
    pub kind: ValueKind,
}

impl ValueType {
    pub fn new(value: impl Into<String>, kind: ValueKind) -> Self {
        Self { value: value.into(), kind }
    }

    /// The class this value widens to, as a literal type.
    pub fn widen(&self) -> LiteralType {
        let class = self.kind.class_name();
        LiteralType::new(class, is_builtin_class(class))
    }
}

/// Either raw text or an already built literal node.
///
/// Used at constructor boundaries that accept both.
#[derive(Debug, Clone)]
pub enum LiteralArg {
    Text(String),
    Node(LiteralType),
}

impl From<&str> for LiteralArg {
    fn from(text: &str) -> Self {
        LiteralArg::Text(text.to_string())
    }
}

impl From<String> for LiteralArg {
    fn from(text: String) -> Self {
        LiteralArg::Text(text)
    }
}

impl From<LiteralType> for LiteralArg {
    fn from(node: LiteralType) -> Self {
        LiteralArg::Node(node)
    }
}

/// A class type known under another name.
#[derive(Debug, Clone)]
pub struct RenamedLiteral {
    pub name: String,
    pub builtin: bool,
    pub original: LiteralType,
    raw: OnceCell<String>,
}

impl RenamedLiteral {
    /// Build a renamed literal.
    ///
    /// A text `name` becomes a user literal; a text `original` takes its
    /// `builtin` flag from the registry. `name` and `builtin` are then copied
    /// from the normalized name literal.
    pub fn new(name: impl Into<LiteralArg>, original: impl Into<LiteralArg>) -> Self {
        let token = match name.into() {
            LiteralArg::Text(text) => LiteralType::new(text, false),
            LiteralArg::Node(node) => node,
        };
        let original = match original.into() {
            LiteralArg::Text(text) => LiteralType::resolve(text),
            LiteralArg::Node(node) => node,
        };
        Self { name: token.name, builtin: token.builtin, original, raw: OnceCell::new() }
    }

    /// Source text of this node, rendered on first request.
    pub fn raw(&self) -> &str {
        self.raw.get_or_init(|| format!("{} as {}", self.original.name, self.name))
    }

    /// Whether the source text has been rendered yet.
    pub fn is_raw_cached(&self) -> bool {
        self.raw.get().is_some()
    }
}

impl PartialEq for RenamedLiteral {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.builtin == other.builtin && self.original == other.original
    }
}

// ============================================================================
// Structured Types
// ============================================================================

/// A positional function parameter. Unnamed parameters are allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Option<String>,
    pub ty: TypeRef,
}

impl Param {
    pub fn new(name: Option<String>, ty: TypeRef) -> Self {
        Self { name, ty }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub params: Vec<Param>,
    pub result: TypeRef,
    pub this_type: Option<TypeRef>,
}

impl FunctionType {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectType {
    pub fields: IndexMap<String, TypeRef>,
}

impl ObjectType {
    pub fn field(&self, name: &str) -> Option<&TypeRef> {
        self.fields.get(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionType {
    pub members: Vec<TypeRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionType {
    pub members: Vec<TypeRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericType {
    pub base: TypeRef,
    pub args: Vec<TypeRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TupleType {
    pub items: Vec<TypeRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleExportsType {
    pub value: TypeRef,
}

// ============================================================================
// Construction
// ============================================================================

impl TypeNode {
    /// A named class type, builtin flag from the registry.
    pub fn literal(name: impl Into<String>) -> TypeRef {
        Arc::new(TypeNode::Literal(LiteralType::resolve(name)))
    }

    pub fn value(value: impl Into<String>, kind: ValueKind) -> TypeRef {
        Arc::new(TypeNode::Value(ValueType::new(value, kind)))
    }

    pub fn renamed(name: impl Into<LiteralArg>, original: impl Into<LiteralArg>) -> TypeRef {
        Arc::new(TypeNode::Renamed(RenamedLiteral::new(name, original)))
    }

    pub fn function(params: Vec<Param>, result: TypeRef, this_type: Option<TypeRef>) -> TypeRef {
        Arc::new(TypeNode::Function(FunctionType { params, result, this_type }))
    }

    pub fn object(fields: IndexMap<String, TypeRef>) -> TypeRef {
        Arc::new(TypeNode::Object(ObjectType { fields }))
    }

    /// A union; a single member collapses to itself.
    pub fn union(mut members: Vec<TypeRef>) -> TypeRef {
        if members.len() == 1 {
            return members.remove(0);
        }
        Arc::new(TypeNode::Union(UnionType { members }))
    }

    /// An intersection; a single member collapses to itself.
    pub fn intersection(mut members: Vec<TypeRef>) -> TypeRef {
        if members.len() == 1 {
            return members.remove(0);
        }
        Arc::new(TypeNode::Intersection(IntersectionType { members }))
    }

    pub fn generic(base: TypeRef, args: Vec<TypeRef>) -> TypeRef {
        Arc::new(TypeNode::Generic(GenericType { base, args }))
    }

    pub fn tuple(items: Vec<TypeRef>) -> TypeRef {
        Arc::new(TypeNode::Tuple(TupleType { items }))
    }

    pub fn module_exports(value: TypeRef) -> TypeRef {
        Arc::new(TypeNode::ModuleExports(ModuleExportsType { value }))
    }
}

// ============================================================================
// Queries
// ============================================================================

impl TypeNode {
    /// The class name of a literal or renamed literal.
    pub fn literal_name(&self) -> Option<&str> {
        match self {
            TypeNode::Literal(lit) => Some(&lit.name),
            TypeNode::Renamed(renamed) => Some(&renamed.name),
            _ => None,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, TypeNode::Literal(lit) if lit.builtin && lit.name == "Any")
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeNode::Literal(lit) if lit.builtin && lit.name == "void")
    }

    /// Whether `undefined` is an acceptable value of this type.
    pub fn admits_undefined(&self) -> bool {
        match self {
            TypeNode::Value(v) => v.kind == ValueKind::Undefined,
            TypeNode::Literal(_) => self.is_any() || self.is_void(),
            TypeNode::Union(u) => u.members.iter().any(|m| m.admits_undefined()),
            TypeNode::ModuleExports(m) => m.value.admits_undefined(),
            _ => false,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionType> {
        match self {
            TypeNode::Function(f) => Some(f),
            TypeNode::ModuleExports(m) => m.value.as_function(),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            TypeNode::Object(o) => Some(o),
            TypeNode::ModuleExports(m) => m.value.as_object(),
            _ => None,
        }
    }

    /// Widen a literal value to its class; other nodes are returned as is.
    pub fn widen(self: &Arc<Self>) -> TypeRef {
        match &**self {
            TypeNode::Value(v) => Arc::new(TypeNode::Literal(v.widen())),
            _ => Arc::clone(self),
        }
    }

    /// The short name used in diagnostics.
    ///
    /// Literal values name their class, renamed literals their new name,
    /// and structured types their source text.
    pub fn class_name(&self) -> String {
        match self {
            TypeNode::Literal(lit) => lit.name.clone(),
            TypeNode::Renamed(renamed) => renamed.name.clone(),
            TypeNode::Value(v) => v.kind.class_name().to_string(),
            TypeNode::ModuleExports(m) => m.value.class_name(),
            _ => self.to_source(),
        }
    }
}
