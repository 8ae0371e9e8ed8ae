//! Tokenizer for signature text.

use jsig_types::ValueType;
use unicode_xid::UnicodeXID;

use crate::error::SignatureError;
use crate::value_literal::scan_value_literal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Identifier,
    /// A literal value; the token's `value` carries it.
    Value,
    Pipe,
    Ampersand,
    LessThan,
    GreaterThan,
    Comma,
    Semicolon,
    Colon,
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Arrow,
    Eof,
}

impl TokenKind {
    pub(crate) fn describe(self) -> &'static str {
        match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Value => "literal value",
            TokenKind::Pipe => "'|'",
            TokenKind::Ampersand => "'&'",
            TokenKind::LessThan => "'<'",
            TokenKind::GreaterThan => "'>'",
            TokenKind::Comma => "','",
            TokenKind::Semicolon => "';'",
            TokenKind::Colon => "':'",
            TokenKind::OpenParen => "'('",
            TokenKind::CloseParen => "')'",
            TokenKind::OpenBrace => "'{'",
            TokenKind::CloseBrace => "'}'",
            TokenKind::OpenBracket => "'['",
            TokenKind::CloseBracket => "']'",
            TokenKind::Arrow => "'=>'",
            TokenKind::Eof => "end of input",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte range in the source.
    pub start: usize,
    pub end: usize,
    pub value: Option<ValueType>,
}

pub(crate) fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$' || (!ch.is_ascii() && ch.is_xid_start())
}

pub(crate) fn is_identifier_part(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' || (!ch.is_ascii() && ch.is_xid_continue())
}

/// Split `source` into tokens, ending with a single `Eof` token.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, SignatureError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    loop {
        pos = skip_trivia(source, pos)?;
        let Some(ch) = source[pos..].chars().next() else {
            tokens.push(Token { kind: TokenKind::Eof, start: pos, end: pos, value: None });
            return Ok(tokens);
        };
        let start = pos;

        let punct = match ch {
            '|' => Some(TokenKind::Pipe),
            '&' => Some(TokenKind::Ampersand),
            '<' => Some(TokenKind::LessThan),
            '>' => Some(TokenKind::GreaterThan),
            ',' => Some(TokenKind::Comma),
            ';' => Some(TokenKind::Semicolon),
            ':' => Some(TokenKind::Colon),
            '(' => Some(TokenKind::OpenParen),
            ')' => Some(TokenKind::CloseParen),
            '{' => Some(TokenKind::OpenBrace),
            '}' => Some(TokenKind::CloseBrace),
            '[' => Some(TokenKind::OpenBracket),
            ']' => Some(TokenKind::CloseBracket),
            _ => None,
        };
        if let Some(kind) = punct {
            tokens.push(Token { kind, start, end: start + 1, value: None });
            pos += 1;
            continue;
        }

        if ch == '=' && bytes.get(pos + 1) == Some(&b'>') {
            tokens.push(Token { kind: TokenKind::Arrow, start, end: start + 2, value: None });
            pos += 2;
            continue;
        }

        if ch == '"' || ch == '\'' || ch == '-' || ch.is_ascii_digit() {
            let Some((value, len)) = scan_value_literal(&source[pos..]) else {
                let expected: &[&str] = if ch == '-' { &["number"] } else { &["closing quote"] };
                return Err(SignatureError::at(source, pos, expected, "end of input"));
            };
            tokens.push(Token { kind: TokenKind::Value, start, end: start + len, value: Some(value) });
            pos += len;
            continue;
        }

        if is_identifier_start(ch) {
            let len: usize = source[pos..]
                .chars()
                .take_while(|&c| is_identifier_part(c))
                .map(char::len_utf8)
                .sum();
            let text = &source[pos..pos + len];
            let token = match scan_value_literal(text) {
                Some((value, consumed)) if consumed == len => {
                    Token { kind: TokenKind::Value, start, end: start + len, value: Some(value) }
                }
                _ => Token { kind: TokenKind::Identifier, start, end: start + len, value: None },
            };
            tokens.push(token);
            pos += len;
            continue;
        }

        return Err(SignatureError::at(source, pos, &["type"], format!("'{}'", ch)));
    }
}

/// Skip whitespace, `//` line comments and `/* */` block comments.
fn skip_trivia(source: &str, mut pos: usize) -> Result<usize, SignatureError> {
    let bytes = source.as_bytes();
    loop {
        match bytes.get(pos) {
            Some(b) if b.is_ascii_whitespace() => pos += 1,
            Some(b'/') if bytes.get(pos + 1) == Some(&b'/') => {
                pos = match memchr::memchr(b'\n', &bytes[pos..]) {
                    Some(i) => pos + i + 1,
                    None => bytes.len(),
                };
            }
            Some(b'/') if bytes.get(pos + 1) == Some(&b'*') => {
                match memchr::memmem::find(&bytes[pos + 2..], b"*/") {
                    Some(i) => pos += 2 + i + 2,
                    None => return Err(SignatureError::at(source, pos, &["'*/'"], "end of input")),
                }
            }
            Some(_) => {
                // Non-ASCII whitespace
                match source[pos..].chars().next() {
                    Some(ch) if ch.is_whitespace() => pos += ch.len_utf8(),
                    _ => return Ok(pos),
                }
            }
            None => return Ok(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_function_signature_tokens() {
        assert_eq!(
            kinds("(this: A, b: String) => void"),
            vec![
                TokenKind::OpenParen,
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::Identifier,
                TokenKind::Comma,
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::Identifier,
                TokenKind::CloseParen,
                TokenKind::Arrow,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_values_and_nested_generics() {
        assert_eq!(
            kinds("Array<Array<\"a\" | -1 | null>>"),
            vec![
                TokenKind::Identifier,
                TokenKind::LessThan,
                TokenKind::Identifier,
                TokenKind::LessThan,
                TokenKind::Value,
                TokenKind::Pipe,
                TokenKind::Value,
                TokenKind::Pipe,
                TokenKind::Value,
                TokenKind::GreaterThan,
                TokenKind::GreaterThan,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        let tokens = tokenize("nullable").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].end, 8);
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(kinds("// leading\nA /* inner */ | B"), vec![TokenKind::Identifier, TokenKind::Pipe, TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        let err = tokenize("a : \"foo").unwrap_err();
        assert_eq!(err.offset, 4);
        assert_eq!(err.expected, vec!["closing quote"]);
    }

    #[test]
    fn test_invalid_character() {
        let err = tokenize("A ? B").unwrap_err();
        assert_eq!(err.found, "'?'");
        assert_eq!(err.column, 3);
    }
}
