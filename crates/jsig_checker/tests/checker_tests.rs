//! Verifier integration tests.

use bumpalo::Bump;
use jsig_checker::*;
use jsig_core::LineMap;
use jsig_diagnostics::DiagnosticKind;
use jsig_parser::Parser;
use jsig_signature::parse_header;

/// Helper: verify `source` against `header` with the default policy.
fn check(header: &str, source: &str) -> Meta {
    check_with(header, source, ExportPolicy::default())
}

fn check_with(header: &str, source: &str, policy: ExportPolicy) -> Meta {
    let arena = Bump::new();
    let result = Parser::new(&arena, "test.js", source).parse_source_file();
    assert!(result.errors.is_empty(), "unexpected syntax errors: {:?}", result.errors);
    let header = parse_header(header).unwrap();
    verify(&result.source_file, &LineMap::new(source), &header, &[], policy)
}

fn kinds(meta: &Meta) -> Vec<DiagnosticKind> {
    meta.errors.iter().map(|e| e.kind).collect()
}

const CLIENT_HEADER: &str = "
type Channel : { send: (key: String, value: String) => Number }
type BatchClient : {
    channel: Channel,
    timeout: Number,
    _sendRequest: (this: BatchClient, key: String) => Number
}
BatchClient : (this: BatchClient, channel: Channel) => void
";

// ============================================================================
// Constructors and methods
// ============================================================================

#[test]
fn test_clean_client() {
    let meta = check(
        CLIENT_HEADER,
        "'use strict';

module.exports = BatchClient;

function BatchClient(channel) {
    this.channel = channel;
    this.timeout = 500;
}

BatchClient.prototype._sendRequest = function _sendRequest(key) {
    return this.channel.send(key, 'ping');
};
",
    );
    assert!(meta.errors.is_empty(), "{:?}", meta.errors);
    assert_eq!(meta.module_exports_type.unwrap().to_source(), "(this: BatchClient, channel: Channel) => void");
}

#[test]
fn test_method_with_extra_parameter() {
    let meta = check(
        CLIENT_HEADER,
        "function BatchClient(channel) {
    this.channel = channel;
    this.timeout = 500;
}
BatchClient.prototype._sendRequest = function _sendRequest(key, value) {
    return this.channel.send(key, value);
};
",
    );
    assert_eq!(kinds(&meta), vec![DiagnosticKind::TooManyFunctionArgs]);
    let err = &meta.errors[0];
    assert_eq!(err.line, 5);
    assert_eq!(err.func_name.as_deref(), Some("_sendRequest"));
    assert_eq!(err.expected_args, Some(1));
    assert_eq!(err.actual_args, Some(2));
}

#[test]
fn test_unknown_field_on_this() {
    let meta = check(
        CLIENT_HEADER,
        "function BatchClient(channel) {
    this.channel = channel;
    this.timeout = 500;
    this.x = 1;
}
BatchClient.prototype._sendRequest = function _sendRequest(key) {
    return 1;
};
",
    );
    assert_eq!(kinds(&meta), vec![DiagnosticKind::NonExistantField]);
    assert_eq!(meta.errors[0].line, 4);
    assert_eq!(meta.errors[0].field_name.as_deref(), Some("x"));
    assert_eq!(meta.errors[0].obj_name.as_deref(), Some("this"));
}

#[test]
fn test_constructor_missing_field() {
    let meta = check(
        CLIENT_HEADER,
        "function BatchClient(channel) {
    this.channel = channel;
}
BatchClient.prototype._sendRequest = function _sendRequest(key) {
    return 1;
};
",
    );
    assert_eq!(kinds(&meta), vec![DiagnosticKind::MissingFieldInConstructor]);
    let err = &meta.errors[0];
    assert_eq!(err.line, 1);
    assert_eq!(err.field_name.as_deref(), Some("timeout"));
    assert_eq!(err.func_name.as_deref(), Some("BatchClient"));
}

#[test]
fn test_optional_field_may_stay_unassigned() {
    let meta = check(
        "type Box : { value: Number, label: String | undefined }
Box : (this: Box) => void",
        "function Box() {
    this.value = 1;
}
",
    );
    assert!(meta.errors.is_empty(), "{:?}", meta.errors);
}

#[test]
fn test_prototype_after_export_policy() {
    let source = "module.exports = BatchClient;
function BatchClient(channel) {
    this.channel = channel;
    this.timeout = 500;
}
BatchClient.prototype._sendRequest = function _sendRequest(key) {
    return 1;
};
";
    assert!(check(CLIENT_HEADER, source).errors.is_empty());

    let strict = ExportPolicy { allow_prototype_after_export: false, ..ExportPolicy::default() };
    let meta = check_with(CLIENT_HEADER, source, strict);
    assert_eq!(kinds(&meta), vec![DiagnosticKind::PrototypeAssignmentAfterExport]);
    assert_eq!(meta.errors[0].line, 6);
}

// ============================================================================
// Returns
// ============================================================================

#[test]
fn test_wrong_return_type() {
    let meta = check(
        "add : (a: Number, b: Number) => Number",
        "function add(a, b) {
    return 'sum';
}
",
    );
    assert_eq!(kinds(&meta), vec![DiagnosticKind::TypeClassMismatch]);
    assert_eq!(meta.errors[0].line, 2);
    assert_eq!(meta.errors[0].expected.as_deref(), Some("Number"));
    assert_eq!(meta.errors[0].actual.as_deref(), Some("String"));
}

#[test]
fn test_missing_return() {
    let meta = check(
        "name : () => String",
        "function name() {
    var x = 1;
}
",
    );
    assert_eq!(kinds(&meta), vec![DiagnosticKind::MissingReturnStatement]);
    assert_eq!(meta.errors[0].line, 1);
    assert_eq!(meta.errors[0].expected.as_deref(), Some("String"));
    assert_eq!(meta.errors[0].actual.as_deref(), Some("void"));
}

#[test]
fn test_all_paths_return() {
    let meta = check(
        "sign : (n: Number) => String",
        "function sign(n) {
    if (n > 0) {
        return 'positive';
    } else {
        return 'other';
    }
}
",
    );
    assert!(meta.errors.is_empty(), "{:?}", meta.errors);
}

#[test]
fn test_value_returned_from_void_function() {
    let meta = check(
        "log : (msg: String) => void",
        "function log(msg) {
    return msg.length;
}
",
    );
    assert_eq!(kinds(&meta), vec![DiagnosticKind::NonVoidReturnType]);
    assert_eq!(meta.errors[0].expected.as_deref(), Some("void"));
    assert_eq!(meta.errors[0].actual.as_deref(), Some("Number"));
}

// ============================================================================
// Calls and identifiers
// ============================================================================

#[test]
fn test_call_argument_mismatch() {
    let meta = check(
        "delay : (attempts: Number) => Number
run : (name: String) => Number",
        "function run(name) {
    return delay(name);
}
function delay(attempts) {
    return attempts * 2;
}
",
    );
    assert_eq!(kinds(&meta), vec![DiagnosticKind::TypeClassMismatch]);
    assert_eq!(meta.errors[0].line, 2);
    assert_eq!(meta.errors[0].expected.as_deref(), Some("Number"));
    assert_eq!(meta.errors[0].actual.as_deref(), Some("name: String"));
}

#[test]
fn test_call_arity() {
    let meta = check(
        "pair : (a: Number, b: Number) => Number",
        "function pair(a, b) {
    return a + b;
}
pair(1);
pair(1, 2, 3);
",
    );
    assert_eq!(kinds(&meta), vec![DiagnosticKind::TooFewArgsInCall, DiagnosticKind::TooManyArgsInCall]);
    assert_eq!(meta.errors[0].line, 4);
    assert_eq!(meta.errors[1].line, 5);
}

#[test]
fn test_unknown_identifier() {
    let meta = check("", "var a = missing + 1;\nif (typeof other === 'undefined') {}\n");
    assert_eq!(kinds(&meta), vec![DiagnosticKind::UnknownIdentifier]);
    assert_eq!(meta.errors[0].name.as_deref(), Some("missing"));
}

#[test]
fn test_untyped_function() {
    let meta = check("", "function helper() {\n    return 1;\n}\n");
    assert_eq!(kinds(&meta), vec![DiagnosticKind::UntypedFunctionFound]);
    assert_eq!(meta.errors[0].func_name.as_deref(), Some("helper"));
}

#[test]
fn test_callbacks_to_untyped_callees_are_not_flagged() {
    let meta = check("", "setTimeout(function () {\n    return 1;\n}, 10);\n");
    assert!(meta.errors.is_empty(), "{:?}", meta.errors);
}

#[test]
fn test_mismatch_names_the_failing_field() {
    let meta = check("point : { x: Number, y: Number }", "var point = { x: 1, y: 'a' };\n");
    assert_eq!(kinds(&meta), vec![DiagnosticKind::TypeClassMismatch]);
    assert_eq!(meta.errors[0].field_name.as_deref(), Some("y"));

    let flat = check("", "var n = 1;\nn = 'a';\n");
    assert_eq!(flat.errors[0].field_name, None);
}

#[test]
fn test_var_rebinds_after_first_initialization() {
    let meta = check("", "var n = 1;\nn = 'a';\n");
    assert_eq!(kinds(&meta), vec![DiagnosticKind::TypeClassMismatch]);
    assert_eq!(meta.errors[0].line, 2);
    assert_eq!(meta.errors[0].actual.as_deref(), Some("String"));
}

// ============================================================================
// Exports
// ============================================================================

#[test]
fn test_export_reassignment() {
    let source = "module.exports = 1;\nmodule.exports = 'a';\n";
    let meta = check("", source);
    assert_eq!(kinds(&meta), vec![DiagnosticKind::ReassigningModuleExports]);
    assert_eq!(meta.errors[0].line, 2);

    let relaxed = ExportPolicy { allow_export_reassignment: true, ..ExportPolicy::default() };
    assert!(check_with("", source, relaxed).errors.is_empty());
}

#[test]
fn test_property_exports_form_an_object() {
    let meta = check("", "exports.a = 1;\nexports.b = 'x';\n");
    assert!(meta.errors.is_empty(), "{:?}", meta.errors);
    assert_eq!(meta.module_exports_type.unwrap().to_source(), "{ a: Number, b: String }");
}

#[test]
fn test_declared_export_checks_value() {
    let meta = check("export default String", "module.exports = 42;\n");
    assert_eq!(kinds(&meta), vec![DiagnosticKind::TypeClassMismatch]);
    assert_eq!(meta.errors[0].expected.as_deref(), Some("String"));
}

#[test]
fn test_declared_export_never_assigned() {
    let meta = check("foo : (a: Number) => Number\nexport default foo", "function foo(a) { return a; }\n");
    assert_eq!(kinds(&meta), vec![DiagnosticKind::MissingModuleExport]);
    assert_eq!(meta.errors[0].line, 2);
    assert_eq!(meta.errors[0].actual.as_deref(), Some("undefined"));
    assert!(meta.module_exports_type.is_none());
}

#[test]
fn test_declared_export_read_before_assignment() {
    let meta = check("export default String", "var early = module.exports;\nmodule.exports = 'a';\nvar late = module.exports;\n");
    assert_eq!(kinds(&meta), vec![DiagnosticKind::MissingModuleExport]);
    assert_eq!(meta.errors[0].line, 1);
    assert_eq!(meta.errors[0].expected.as_deref(), Some("String"));
}

#[test]
fn test_declared_export_satisfied_by_property_exports() {
    let meta = check("export default { a: Number }", "exports.a = 1;\n");
    assert!(meta.errors.is_empty(), "{:?}", meta.errors);
}
