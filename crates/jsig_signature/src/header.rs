//! Header files and inline header comments.
//!
//! A header is a sequence of statements, each optionally ended by `;`:
//!
//! ```text
//! import { Channel, Options as Opts } from "./channel"
//! type Callback<T> : (err: Error | null, value: T) => void
//! BatchClient : (this: BatchClient, channel: Channel) => void
//! export default BatchClient
//! ```

use jsig_types::TypeRef;

use crate::error::SignatureError;
use crate::lexer::TokenKind;
use crate::parser::SignatureParser;

/// Marker that opens an inline header comment: `/*@jsig ... */`.
pub const INLINE_HEADER_MARKER: &str = "@jsig";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Header {
    pub statements: Vec<HeaderStatement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderStatement {
    Import(ImportStatement),
    TypeAlias(TypeAliasDeclaration),
    ExportDefault(ExportDefault),
    Declaration(ValueDeclaration),
}

impl HeaderStatement {
    pub fn line(&self) -> u32 {
        match self {
            HeaderStatement::Import(s) => s.line,
            HeaderStatement::TypeAlias(s) => s.line,
            HeaderStatement::ExportDefault(s) => s.line,
            HeaderStatement::Declaration(s) => s.line,
        }
    }
}

/// `import { A, B as C } from "./path"`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportStatement {
    pub names: Vec<ImportName>,
    /// The module specifier without quotes.
    pub path: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportName {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportName {
    /// The name this import binds locally.
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// `type Name<P, Q> : T`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDeclaration {
    pub name: String,
    pub params: Vec<String>,
    pub ty: TypeRef,
    pub line: u32,
}

/// `export default T`
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDefault {
    pub ty: TypeRef,
    pub line: u32,
}

/// `name : T`
#[derive(Debug, Clone, PartialEq)]
pub struct ValueDeclaration {
    pub name: String,
    pub ty: TypeRef,
    pub line: u32,
}

impl Header {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Append the statements of `other` after this header's.
    pub fn extend(&mut self, other: Header) {
        self.statements.extend(other.statements);
    }

    pub fn imports(&self) -> impl Iterator<Item = &ImportStatement> {
        self.statements.iter().filter_map(|s| match s {
            HeaderStatement::Import(i) => Some(i),
            _ => None,
        })
    }

    pub fn type_aliases(&self) -> impl Iterator<Item = &TypeAliasDeclaration> {
        self.statements.iter().filter_map(|s| match s {
            HeaderStatement::TypeAlias(a) => Some(a),
            _ => None,
        })
    }

    pub fn declarations(&self) -> impl Iterator<Item = &ValueDeclaration> {
        self.statements.iter().filter_map(|s| match s {
            HeaderStatement::Declaration(d) => Some(d),
            _ => None,
        })
    }

    /// The last `export default` in the header.
    pub fn export_default(&self) -> Option<&ExportDefault> {
        self.statements.iter().rev().find_map(|s| match s {
            HeaderStatement::ExportDefault(e) => Some(e),
            _ => None,
        })
    }

    /// The type exported under `name`: a type alias without parameters, or a
    /// value declaration.
    pub fn exported_type(&self, name: &str) -> Option<&TypeRef> {
        self.type_aliases()
            .find(|a| a.name == name && a.params.is_empty())
            .map(|a| &a.ty)
            .or_else(|| self.declarations().find(|d| d.name == name).map(|d| &d.ty))
    }
}

/// Parse a complete header.
pub fn parse_header(source: &str) -> Result<Header, SignatureError> {
    parse_header_at(source, 1)
}

/// Parse a header whose text starts on `first_line` of its file.
pub fn parse_header_at(source: &str, first_line: u32) -> Result<Header, SignatureError> {
    let mut parser = SignatureParser::starting_at_line(source, first_line)?;
    let mut statements = Vec::new();
    while !parser.is_at_end() {
        if parser.optional(TokenKind::Semicolon) {
            continue;
        }
        statements.push(parse_statement(&mut parser)?);
        parser.optional(TokenKind::Semicolon);
    }
    Ok(Header { statements })
}

/// The header text inside a block comment body, if the comment is an inline
/// header (`/*@jsig ... */`, whitespace before the marker allowed).
pub fn inline_header_body(comment_body: &str) -> Option<&str> {
    let rest = comment_body.trim_start().strip_prefix(INLINE_HEADER_MARKER)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(ch) if ch.is_whitespace() => Some(rest),
        Some(_) => None,
    }
}

fn parse_statement(parser: &mut SignatureParser<'_>) -> Result<HeaderStatement, SignatureError> {
    let line = parser.line();
    if parser.peek_kind(1) != TokenKind::Colon {
        if parser.at_word("import") {
            return parse_import(parser, line).map(HeaderStatement::Import);
        }
        if parser.at_word("type") {
            return parse_type_alias(parser, line).map(HeaderStatement::TypeAlias);
        }
        if parser.at_word("export") {
            parser.next_token();
            parser.expect_word("default")?;
            let ty = parser.parse_type()?;
            return Ok(HeaderStatement::ExportDefault(ExportDefault { ty, line }));
        }
    }
    if parser.kind() != TokenKind::Identifier {
        return Err(parser.error(&["'import'", "'type'", "'export'", "identifier"]));
    }
    let name = parser.parse_identifier()?.to_string();
    parser.expect(TokenKind::Colon)?;
    let ty = parser.parse_type()?;
    Ok(HeaderStatement::Declaration(ValueDeclaration { name, ty, line }))
}

fn parse_import(parser: &mut SignatureParser<'_>, line: u32) -> Result<ImportStatement, SignatureError> {
    parser.expect_word("import")?;
    parser.expect(TokenKind::OpenBrace)?;
    let mut names = Vec::new();
    while parser.kind() != TokenKind::CloseBrace {
        let name = parser.parse_identifier()?.to_string();
        let alias = if parser.at_word("as") {
            parser.next_token();
            Some(parser.parse_identifier()?.to_string())
        } else {
            None
        };
        names.push(ImportName { name, alias });
        if !parser.optional(TokenKind::Comma) {
            break;
        }
    }
    parser.expect(TokenKind::CloseBrace)?;
    parser.expect_word("from")?;

    let text = parser.token_text();
    let quoted = parser.kind() == TokenKind::Value
        && text.len() >= 2
        && text.starts_with(|c: char| c == '"' || c == '\'');
    if !quoted {
        return Err(parser.error(&["module path"]));
    }
    let path = text[1..text.len() - 1].to_string();
    parser.next_token();
    Ok(ImportStatement { names, path, line })
}

fn parse_type_alias(parser: &mut SignatureParser<'_>, line: u32) -> Result<TypeAliasDeclaration, SignatureError> {
    parser.expect_word("type")?;
    let name = parser.parse_identifier()?.to_string();
    let mut params = Vec::new();
    if parser.optional(TokenKind::LessThan) {
        params.push(parser.parse_identifier()?.to_string());
        while parser.optional(TokenKind::Comma) {
            params.push(parser.parse_identifier()?.to_string());
        }
        parser.expect(TokenKind::GreaterThan)?;
    }
    parser.expect(TokenKind::Colon)?;
    let ty = parser.parse_type()?;
    Ok(TypeAliasDeclaration { name, params, ty, line })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_header_body() {
        assert_eq!(inline_header_body("@jsig\n  foo : String\n"), Some("\n  foo : String\n"));
        assert_eq!(inline_header_body(" @jsig "), Some(" "));
        assert_eq!(inline_header_body("@jsig"), Some(""));
        assert_eq!(inline_header_body("@jsignature"), None);
        assert_eq!(inline_header_body(" plain comment "), None);
    }

    #[test]
    fn test_statement_lines() {
        let header = parse_header_at("\n  a : String\n  type B : Number;\n", 7).unwrap();
        let lines: Vec<u32> = header.statements.iter().map(HeaderStatement::line).collect();
        assert_eq!(lines, vec![8, 9]);
    }

    #[test]
    fn test_keywords_as_declaration_names() {
        let header = parse_header("type : String\nimport : Number").unwrap();
        let names: Vec<&str> = header.declarations().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["type", "import"]);
    }

    #[test]
    fn test_bad_statement() {
        let err = parse_header("export String").unwrap_err();
        assert_eq!(err.expected, vec!["'default'"]);
        assert_eq!(err.found, "'String'");
    }
}
