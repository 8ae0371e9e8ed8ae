//! Literal value parsing.
//!
//! Recognizes the six literal value forms of the signature language. The
//! alternatives are tried in a fixed order (string, number, `null`,
//! `undefined`, `true`, `false`) and the first match wins.

use jsig_types::{ValueKind, ValueType};

use crate::error::SignatureError;

/// Accepted alternatives, in the order they are tried.
pub const VALUE_LITERAL_ALTERNATIVES: &[&str] = &["string", "number", "null", "undefined", "true", "false"];

const KEYWORDS: &[(&str, ValueKind)] = &[
    ("null", ValueKind::Null),
    ("undefined", ValueKind::Undefined),
    ("true", ValueKind::True),
    ("false", ValueKind::False),
];

/// Match a literal value at the start of `text`.
///
/// Returns the value and the number of bytes consumed.
pub fn scan_value_literal(text: &str) -> Option<(ValueType, usize)> {
    scan_string(text)
        .or_else(|| scan_number(text))
        .or_else(|| scan_keyword(text))
}

/// Parse `text` as exactly one literal value.
pub fn parse_value_literal(text: &str) -> Result<ValueType, SignatureError> {
    match scan_value_literal(text) {
        Some((value, len)) if len == text.len() => Ok(value),
        Some((_, len)) => Err(SignatureError::at(text, len, &["end of input"], describe(&text[len..]))),
        None => Err(SignatureError::at(text, 0, VALUE_LITERAL_ALTERNATIVES, describe(text))),
    }
}

fn describe(rest: &str) -> String {
    match rest.chars().next() {
        Some(ch) => format!("'{}'", ch),
        None => "end of input".to_string(),
    }
}

fn is_quote(byte: u8) -> bool {
    byte == b'"' || byte == b'\''
}

/// A quote, a run without quotes, and the same quote again. The value keeps
/// its quotes.
fn scan_string(text: &str) -> Option<(ValueType, usize)> {
    let bytes = text.as_bytes();
    let quote = *bytes.first()?;
    if !is_quote(quote) {
        return None;
    }
    let close = memchr::memchr2(b'"', b'\'', &bytes[1..])? + 1;
    if bytes[close] != quote {
        return None;
    }
    let len = close + 1;
    Some((ValueType::new(&text[..len], ValueKind::String), len))
}

/// `-? digits ('.' digits)? ([eE] [+-]? digits)?`
fn scan_number(text: &str) -> Option<(ValueType, usize)> {
    let bytes = text.as_bytes();
    let mut pos = 0;
    if bytes.first() == Some(&b'-') {
        pos += 1;
    }
    let digits = count_digits(&bytes[pos..]);
    if digits == 0 {
        return None;
    }
    pos += digits;
    if bytes.get(pos) == Some(&b'.') {
        let fraction = count_digits(&bytes[pos + 1..]);
        if fraction > 0 {
            pos += 1 + fraction;
        }
    }
    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        let mut exp = pos + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = count_digits(&bytes[exp.min(bytes.len())..]);
        if exp_digits > 0 {
            pos = exp + exp_digits;
        }
    }
    Some((ValueType::new(&text[..pos], ValueKind::Number), pos))
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

fn scan_keyword(text: &str) -> Option<(ValueType, usize)> {
    for &(word, kind) in KEYWORDS {
        if let Some(rest) = text.strip_prefix(word) {
            if rest.chars().next().map_or(true, |ch| !crate::lexer::is_identifier_part(ch)) {
                return Some((ValueType::new(word, kind), word.len()));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(text: &str) -> ValueType {
        parse_value_literal(text).unwrap()
    }

    #[test]
    fn test_strings_keep_quotes() {
        assert_eq!(value("\"foo\""), ValueType::new("\"foo\"", ValueKind::String));
        assert_eq!(value("'bar'"), ValueType::new("'bar'", ValueKind::String));
        assert_eq!(value("\"\""), ValueType::new("\"\"", ValueKind::String));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(value("42").kind, ValueKind::Number);
        assert_eq!(value("-3.5").value, "-3.5");
        assert_eq!(value("1e10").value, "1e10");
        assert_eq!(value("2.5E-3").value, "2.5E-3");
    }

    #[test]
    fn test_keywords() {
        assert_eq!(value("null").kind, ValueKind::Null);
        assert_eq!(value("undefined").kind, ValueKind::Undefined);
        assert_eq!(value("true").kind, ValueKind::True);
        assert_eq!(value("false").kind, ValueKind::False);
    }

    #[test]
    fn test_keyword_must_end_at_word_boundary() {
        assert!(scan_value_literal("nullable").is_none());
        assert!(scan_value_literal("trueish").is_none());
        assert_eq!(scan_value_literal("null|").map(|(_, len)| len), Some(4));
    }

    #[test]
    fn test_unbalanced_quotes_fail() {
        let err = parse_value_literal("\"foo").unwrap_err();
        assert_eq!(err.offset, 0);
        assert_eq!(err.expected, VALUE_LITERAL_ALTERNATIVES);
        assert!(parse_value_literal("\"foo'").is_err());
        assert!(parse_value_literal("'a\"b'").is_err());
    }

    #[test]
    fn test_trailing_input_fails() {
        let err = parse_value_literal("12abc").unwrap_err();
        assert_eq!(err.offset, 2);
        assert_eq!(err.found, "'a'");
    }

    #[test]
    fn test_round_trip() {
        for text in ["\"a\"", "'b'", "0", "-1.25", "null", "undefined", "true", "false"] {
            assert_eq!(value(text).value, text);
        }
    }
}
