//! Signature language integration tests.
//!
//! Exercises headers as they appear in companion files and inline comments.

use jsig_signature::*;
use jsig_types::TypeNode;

// ============================================================================
// Headers
// ============================================================================

const BATCH_CLIENT_HEADER: &str = r#"
import { Channel, RequestOptions as Opts } from "./channel"

type Callback<T> : (err: Error | null, value: T) => void

type BatchClient : {
    channel: Channel;
    timeout: Number;
    _sendRequest: (this: BatchClient, key: String) => Number
}

BatchClient : (this: BatchClient, channel: Channel, opts: Opts) => void

export default BatchClient
"#;

#[test]
fn test_parse_batch_client_header() {
    let header = parse_header(BATCH_CLIENT_HEADER).unwrap();
    assert_eq!(header.statements.len(), 5);

    let import = header.imports().next().unwrap();
    assert_eq!(import.path, "./channel");
    let locals: Vec<&str> = import.names.iter().map(ImportName::local_name).collect();
    assert_eq!(locals, vec!["Channel", "Opts"]);

    let aliases: Vec<(&str, usize)> = header.type_aliases().map(|a| (a.name.as_str(), a.params.len())).collect();
    assert_eq!(aliases, vec![("Callback", 1), ("BatchClient", 0)]);

    let ctor = header.declarations().next().unwrap();
    assert_eq!(ctor.name, "BatchClient");
    assert_eq!(ctor.line, 12);
    assert_eq!(ctor.ty.as_function().map(|f| f.arity()), Some(2));

    let export = header.export_default().unwrap();
    assert_eq!(export.ty.literal_name(), Some("BatchClient"));
    assert_eq!(export.line, 14);
}

#[test]
fn test_exported_type_prefers_plain_alias() {
    let header = parse_header(BATCH_CLIENT_HEADER).unwrap();
    let instance = header.exported_type("BatchClient").unwrap();
    assert!(instance.as_object().is_some());
    assert!(header.exported_type("Callback").is_none());
}

#[test]
fn test_semicolons_are_optional() {
    let a = parse_header("a : String; b : Number;;").unwrap();
    let b = parse_header("a : String\nb : Number").unwrap();
    assert_eq!(a.statements.len(), 2);
    assert_eq!(b.statements.len(), 2);
}

#[test]
fn test_headers_extend_in_order() {
    let mut companion = parse_header("a : String").unwrap();
    companion.extend(parse_header_at("b : Number", 20).unwrap());
    let names: Vec<&str> = companion.declarations().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(companion.statements[1].line(), 20);
}

#[test]
fn test_inline_comment_header() {
    let comment = "@jsig\n  add : (a: Number, b: Number) => Number\n";
    let body = inline_header_body(comment).unwrap();
    let header = parse_header_at(body, 3).unwrap();
    let decl = header.declarations().next().unwrap();
    assert_eq!(decl.line, 4);
    assert_eq!(decl.ty.to_source(), "(a: Number, b: Number) => Number");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_error_reports_file_line() {
    let err = parse_header_at("a : String\nb : => Number", 10).unwrap_err();
    assert_eq!(err.line, 11);
    assert_eq!(err.column, 5);
    assert_eq!(err.found, "'=>'");
}

#[test]
fn test_import_requires_quoted_path() {
    let err = parse_header("import { A } from channel").unwrap_err();
    assert_eq!(err.expected, vec!["module path"]);
}

#[test]
fn test_unterminated_block_comment() {
    assert!(parse_header("a : String /* never closed").is_err());
}

#[test]
fn test_value_literal_entry_point() {
    let value = parse_value_literal("'GET'").unwrap();
    assert_eq!(value.value, "'GET'");
    assert!(parse_value_literal("GET").is_err());
    assert!(matches!(*parse_type("'GET'").unwrap(), TypeNode::Value(_)));
}
