//! jsig_diagnostics: Verification diagnostics.
//!
//! Every diagnostic the verifier can report has a stable taxonomy string
//! (`jsig.verify.*` or `jsig.sub-type.*`), a message template, and a
//! structured record carrying the 1-based line plus the kind-specific fields
//! (`funcName`, `expected`, `actualArgs`, ...). Records serialize in
//! camelCase so tooling sees the same field names the messages use.

use jsig_core::TextPos;
use serde::{Serialize, Serializer};
use std::fmt;

/// The taxonomy of verification diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    TooManyFunctionArgs,
    TooFewFunctionArgs,
    TooManyArgsInCall,
    TooFewArgsInCall,
    MissingReturnStatement,
    NonVoidReturnType,
    NonExistantField,
    MissingFieldInConstructor,
    UntypedFunctionFound,
    UnknownIdentifier,
    ReassigningModuleExports,
    MissingModuleExport,
    PrototypeAssignmentAfterExport,
    TypeClassMismatch,
}

impl DiagnosticKind {
    /// The taxonomy string, e.g. `jsig.verify.too-many-function-args`.
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::TooManyFunctionArgs => "jsig.verify.too-many-function-args",
            DiagnosticKind::TooFewFunctionArgs => "jsig.verify.too-few-function-args",
            DiagnosticKind::TooManyArgsInCall => "jsig.verify.too-many-args-in-call",
            DiagnosticKind::TooFewArgsInCall => "jsig.verify.too-few-args-in-call",
            DiagnosticKind::MissingReturnStatement => "jsig.verify.missing-return-statement",
            DiagnosticKind::NonVoidReturnType => "jsig.verify.non-void-return-type",
            // The misspelling is part of the published taxonomy.
            DiagnosticKind::NonExistantField => "jsig.verify.non-existant-field",
            DiagnosticKind::MissingFieldInConstructor => "jsig.verify.missing-field-in-constructor",
            DiagnosticKind::UntypedFunctionFound => "jsig.verify.untyped-function-found",
            DiagnosticKind::UnknownIdentifier => "jsig.verify.unknown-identifier",
            DiagnosticKind::ReassigningModuleExports => "jsig.verify.reassigning-module-exports",
            DiagnosticKind::MissingModuleExport => "jsig.verify.missing-module-export",
            DiagnosticKind::PrototypeAssignmentAfterExport => {
                "jsig.verify.prototype-assignment-after-export"
            }
            DiagnosticKind::TypeClassMismatch => "jsig.sub-type.type-class-mismatch",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DiagnosticKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A diagnostic message template bound to its kind.
///
/// Templates use named placeholders matching the record's serialized field
/// names, e.g. `{funcName}` or `{expectedArgs}`.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticMessage {
    pub kind: DiagnosticKind,
    pub message: &'static str,
}

/// A realized verification diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDiagnostic {
    pub kind: DiagnosticKind,
    template: &'static str,
    /// 1-based source line.
    pub line: u32,
    pub func_name: Option<String>,
    pub field_name: Option<String>,
    pub obj_name: Option<String>,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub expected_args: Option<usize>,
    pub actual_args: Option<usize>,
    pub other_field: Option<String>,
    pub name: Option<String>,
}

/// The serialized shape of a [`TypeDiagnostic`], with the rendered message.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DiagnosticRecord<'d> {
    #[serde(rename = "type")]
    kind: DiagnosticKind,
    message: String,
    line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    func_name: Option<&'d str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field_name: Option<&'d str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    obj_name: Option<&'d str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected: Option<&'d str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    actual: Option<&'d str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_args: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    actual_args: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    other_field: Option<&'d str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'d str>,
}

impl Serialize for TypeDiagnostic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DiagnosticRecord {
            kind: self.kind,
            message: self.message(),
            line: self.line,
            func_name: self.func_name.as_deref(),
            field_name: self.field_name.as_deref(),
            obj_name: self.obj_name.as_deref(),
            expected: self.expected.as_deref(),
            actual: self.actual.as_deref(),
            expected_args: self.expected_args,
            actual_args: self.actual_args,
            other_field: self.other_field.as_deref(),
            name: self.name.as_deref(),
        }
        .serialize(serializer)
    }
}

impl TypeDiagnostic {
    pub fn new(message: &DiagnosticMessage, line: u32) -> Self {
        Self {
            kind: message.kind,
            template: message.message,
            line,
            func_name: None,
            field_name: None,
            obj_name: None,
            expected: None,
            actual: None,
            expected_args: None,
            actual_args: None,
            other_field: None,
            name: None,
        }
    }

    pub fn with_func_name(mut self, name: impl Into<String>) -> Self {
        self.func_name = Some(name.into());
        self
    }

    pub fn with_field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = Some(name.into());
        self
    }

    pub fn with_obj_name(mut self, name: impl Into<String>) -> Self {
        self.obj_name = Some(name.into());
        self
    }

    pub fn with_types(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }

    pub fn with_args(mut self, expected: usize, actual: usize) -> Self {
        self.expected_args = Some(expected);
        self.actual_args = Some(actual);
        self
    }

    pub fn with_other_field(mut self, other: impl Into<String>) -> Self {
        self.other_field = Some(other.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The human-readable message with every placeholder filled in.
    pub fn message(&self) -> String {
        let expected_args = self.expected_args.map(|n| n.to_string());
        let actual_args = self.actual_args.map(|n| n.to_string());
        format_message(
            self.template,
            &[
                ("funcName", self.func_name.as_deref()),
                ("fieldName", self.field_name.as_deref()),
                ("objName", self.obj_name.as_deref()),
                ("expected", self.expected.as_deref()),
                ("actual", self.actual.as_deref()),
                ("expectedArgs", expected_args.as_deref()),
                ("actualArgs", actual_args.as_deref()),
                ("otherField", self.other_field.as_deref()),
                ("name", self.name.as_deref()),
            ],
        )
    }
}

impl fmt::Display for TypeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} ({})", self.line, self.message(), self.kind)
    }
}

/// Replace `{key}` placeholders. Missing values render as `?`.
pub fn format_message(template: &str, args: &[(&str, Option<&str>)]) -> String {
    let mut result = template.to_string();
    for (key, value) in args {
        let placeholder = format!("{{{}}}", key);
        if result.contains(&placeholder) {
            result = result.replace(&placeholder, value.unwrap_or("?"));
        }
    }
    result
}

// ============================================================================
// Syntax errors
// ============================================================================

/// A JavaScript syntax error reported by the scanner or parser.
///
/// Syntax errors are fatal for the file: they are surfaced to the caller
/// rather than mixed into the verification diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Character offset where the error was detected.
    pub pos: TextPos,
    pub message: String,
}

impl SyntaxError {
    pub fn new(pos: TextPos, message: impl Into<String>) -> Self {
        Self { pos, message: message.into() }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at offset {})", self.message, self.pos)
    }
}

pub mod syntax_messages {
    pub const UNTERMINATED_STRING_LITERAL: &str = "Unterminated string literal.";
    pub const UNTERMINATED_COMMENT: &str = "'*/' expected.";
    pub const UNTERMINATED_REGULAR_EXPRESSION_LITERAL: &str = "Unterminated regular expression literal.";
    pub const INVALID_CHARACTER: &str = "Invalid character.";
    pub const IDENTIFIER_EXPECTED: &str = "Identifier expected.";
    pub const EXPRESSION_EXPECTED: &str = "Expression expected.";
    pub const DECLARATION_OR_STATEMENT_EXPECTED: &str = "Declaration or statement expected.";
    pub const INVALID_ASSIGNMENT_TARGET: &str = "Invalid left-hand side in assignment.";
    pub const UNSUPPORTED_SYNTAX: &str = "This syntax is not supported.";
}

// ============================================================================
// Diagnostic Messages
// ============================================================================

pub mod messages {
    use super::*;

    macro_rules! diag {
        ($kind:ident, $msg:expr) => {
            DiagnosticMessage { kind: DiagnosticKind::$kind, message: $msg }
        };
    }

    // ========================================================================
    // Function shape
    // ========================================================================
    pub const TOO_MANY_FUNCTION_ARGS: DiagnosticMessage = diag!(TooManyFunctionArgs, "Function '{funcName}' is declared with {expectedArgs} argument(s) but implemented with {actualArgs}.");
    pub const TOO_FEW_FUNCTION_ARGS: DiagnosticMessage = diag!(TooFewFunctionArgs, "Function '{funcName}' is declared with {expectedArgs} argument(s) but implemented with only {actualArgs}.");
    pub const TOO_MANY_ARGS_IN_CALL: DiagnosticMessage = diag!(TooManyArgsInCall, "Call to '{funcName}' passes {actualArgs} argument(s) but it expects {expectedArgs}.");
    pub const TOO_FEW_ARGS_IN_CALL: DiagnosticMessage = diag!(TooFewArgsInCall, "Call to '{funcName}' passes only {actualArgs} argument(s) but it expects {expectedArgs}.");
    pub const UNTYPED_FUNCTION_FOUND: DiagnosticMessage = diag!(UntypedFunctionFound, "Function '{funcName}' has no type signature.");

    // ========================================================================
    // Returns
    // ========================================================================
    pub const MISSING_RETURN_STATEMENT: DiagnosticMessage = diag!(MissingReturnStatement, "Function '{funcName}' must return {expected} but can finish with {actual}.");
    pub const NON_VOID_RETURN_TYPE: DiagnosticMessage = diag!(NonVoidReturnType, "Function '{funcName}' is declared to return {expected} but returns {actual}.");

    // ========================================================================
    // Fields and constructors
    // ========================================================================
    pub const NON_EXISTANT_FIELD: DiagnosticMessage = diag!(NonExistantField, "Field '{fieldName}' does not exist on '{objName}'.");
    pub const MISSING_FIELD_IN_CONSTRUCTOR: DiagnosticMessage = diag!(MissingFieldInConstructor, "Constructor '{funcName}' never assigns field '{fieldName}' ({otherField}).");

    // ========================================================================
    // Names and exports
    // ========================================================================
    pub const UNKNOWN_IDENTIFIER: DiagnosticMessage = diag!(UnknownIdentifier, "Cannot find identifier '{name}'.");
    pub const REASSIGNING_MODULE_EXPORTS: DiagnosticMessage = diag!(ReassigningModuleExports, "module.exports is already assigned; cannot reassign it to {actual}.");
    pub const MISSING_MODULE_EXPORT: DiagnosticMessage = diag!(MissingModuleExport, "module.exports is declared as {expected} but is {actual}.");
    pub const PROTOTYPE_ASSIGNMENT_AFTER_EXPORT: DiagnosticMessage = diag!(PrototypeAssignmentAfterExport, "Field '{fieldName}' is added to the prototype of '{funcName}' after it was exported.");

    // ========================================================================
    // Subtyping
    // ========================================================================
    pub const TYPE_CLASS_MISMATCH: DiagnosticMessage = diag!(TypeClassMismatch, "Expected {expected} but got {actual}.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message() {
        let msg = format_message("Expected {expected} but got {actual}.", &[("expected", Some("Number")), ("actual", Some("String"))]);
        assert_eq!(msg, "Expected Number but got String.");
    }

    #[test]
    fn test_format_message_missing_value() {
        let msg = format_message("Cannot find '{name}'.", &[("name", None)]);
        assert_eq!(msg, "Cannot find '?'.");
    }

    #[test]
    fn test_taxonomy_strings() {
        assert_eq!(DiagnosticKind::NonExistantField.as_str(), "jsig.verify.non-existant-field");
        assert_eq!(DiagnosticKind::TypeClassMismatch.as_str(), "jsig.sub-type.type-class-mismatch");
        assert_eq!(DiagnosticKind::MissingModuleExport.as_str(), "jsig.verify.missing-module-export");
    }

    #[test]
    fn test_missing_module_export_message() {
        let diag = TypeDiagnostic::new(&messages::MISSING_MODULE_EXPORT, 2).with_types("(a: Number) => Number", "undefined");
        assert_eq!(diag.message(), "module.exports is declared as (a: Number) => Number but is undefined.");
        assert_eq!(diag.kind, DiagnosticKind::MissingModuleExport);
    }

    #[test]
    fn test_message_uses_fields() {
        let diag = TypeDiagnostic::new(&messages::TOO_MANY_FUNCTION_ARGS, 13)
            .with_func_name("_sendRequest")
            .with_args(1, 2);
        assert_eq!(diag.message(), "Function '_sendRequest' is declared with 1 argument(s) but implemented with 2.");
        assert!(diag.to_string().starts_with("line 13: "));
    }

    #[test]
    fn test_serializes_camel_case_and_skips_absent_fields() {
        let diag = TypeDiagnostic::new(&messages::NON_EXISTANT_FIELD, 8)
            .with_field_name("x")
            .with_obj_name("this");
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["type"], "jsig.verify.non-existant-field");
        assert_eq!(json["fieldName"], "x");
        assert_eq!(json["objName"], "this");
        assert_eq!(json["line"], 8);
        assert_eq!(json["message"], "Field 'x' does not exist on 'this'.");
        assert!(json.get("expected").is_none());
    }
}
