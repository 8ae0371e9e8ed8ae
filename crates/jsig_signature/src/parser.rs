//! Recursive-descent parser for signature types.
//!
//! ```text
//! type         := union
//! union        := intersection ('|' intersection)*
//! intersection := applied ('&' applied)*
//! applied      := primary ('<' type (',' type)* '>')?
//! primary      := value | Ident ('as' Ident)? | object | tuple | function | '(' type ')'
//! ```

use indexmap::IndexMap;
use jsig_types::{Param, TypeNode, TypeRef};

use crate::error::SignatureError;
use crate::lexer::{tokenize, Token, TokenKind};

/// Parse `source` as exactly one type.
pub fn parse_type(source: &str) -> Result<TypeRef, SignatureError> {
    let mut parser = SignatureParser::new(source)?;
    let ty = parser.parse_type()?;
    parser.expect(TokenKind::Eof)?;
    Ok(ty)
}

/// A parser over one piece of signature text.
pub struct SignatureParser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    index: usize,
    /// Line of the first character of `source` in its enclosing file.
    first_line: u32,
}

impl<'s> SignatureParser<'s> {
    pub fn new(source: &'s str) -> Result<Self, SignatureError> {
        Self::starting_at_line(source, 1)
    }

    /// A parser whose reported lines are offset so `source` begins on
    /// `first_line`.
    pub fn starting_at_line(source: &'s str, first_line: u32) -> Result<Self, SignatureError> {
        let tokens = tokenize(source).map_err(|e| e.starting_at_line(first_line))?;
        Ok(Self { source, tokens, index: 0, first_line })
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    pub(crate) fn token(&self) -> &Token {
        // The token list always ends with Eof and `index` never passes it.
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    pub(crate) fn kind(&self) -> TokenKind {
        self.token().kind
    }

    pub(crate) fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.index + offset)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    pub(crate) fn token_text(&self) -> &'s str {
        let token = self.token();
        &self.source[token.start..token.end]
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.kind() == TokenKind::Eof
    }

    pub(crate) fn next_token(&mut self) {
        if self.kind() != TokenKind::Eof {
            self.index += 1;
        }
    }

    /// Whether the current token is the identifier `word`.
    pub(crate) fn at_word(&self, word: &str) -> bool {
        self.kind() == TokenKind::Identifier && self.token_text() == word
    }

    pub(crate) fn optional(&mut self, kind: TokenKind) -> bool {
        if self.kind() == kind {
            self.next_token();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<(), SignatureError> {
        if self.optional(kind) {
            Ok(())
        } else {
            Err(self.error(&[kind.describe()]))
        }
    }

    pub(crate) fn expect_word(&mut self, word: &str) -> Result<(), SignatureError> {
        if self.at_word(word) {
            self.next_token();
            Ok(())
        } else {
            let expected = format!("'{}'", word);
            Err(self.error(&[expected.as_str()]))
        }
    }

    pub(crate) fn parse_identifier(&mut self) -> Result<&'s str, SignatureError> {
        if self.kind() != TokenKind::Identifier {
            return Err(self.error(&["identifier"]));
        }
        let text = self.token_text();
        self.next_token();
        Ok(text)
    }

    /// 1-based line of the current token in the enclosing file.
    pub(crate) fn line(&self) -> u32 {
        let start = self.token().start;
        self.source[..start].matches('\n').count() as u32 + self.first_line
    }

    pub(crate) fn error(&self, expected: &[&str]) -> SignatureError {
        let token = self.token();
        let found = match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", &self.source[token.start..token.end]),
        };
        SignatureError::at(self.source, token.start, expected, found).starting_at_line(self.first_line)
    }

    // ========================================================================
    // Types
    // ========================================================================

    pub fn parse_type(&mut self) -> Result<TypeRef, SignatureError> {
        self.parse_union()
    }

    fn parse_union(&mut self) -> Result<TypeRef, SignatureError> {
        let mut members = vec![self.parse_intersection()?];
        while self.optional(TokenKind::Pipe) {
            members.push(self.parse_intersection()?);
        }
        Ok(TypeNode::union(members))
    }

    fn parse_intersection(&mut self) -> Result<TypeRef, SignatureError> {
        let mut members = vec![self.parse_applied()?];
        while self.optional(TokenKind::Ampersand) {
            members.push(self.parse_applied()?);
        }
        Ok(TypeNode::intersection(members))
    }

    fn parse_applied(&mut self) -> Result<TypeRef, SignatureError> {
        let base = self.parse_primary()?;
        if !self.optional(TokenKind::LessThan) {
            return Ok(base);
        }
        let mut args = vec![self.parse_type()?];
        while self.optional(TokenKind::Comma) {
            args.push(self.parse_type()?);
        }
        self.expect(TokenKind::GreaterThan)?;
        Ok(TypeNode::generic(base, args))
    }

    fn parse_primary(&mut self) -> Result<TypeRef, SignatureError> {
        match self.kind() {
            TokenKind::Value => {
                let value = self.token().value.clone();
                match value {
                    Some(value) => {
                        self.next_token();
                        Ok(TypeNode::value(value.value, value.kind))
                    }
                    None => Err(self.error(&["literal value"])),
                }
            }
            TokenKind::Identifier => {
                let name = self.parse_identifier()?;
                if self.at_word("as") {
                    self.next_token();
                    let alias = self.parse_identifier()?;
                    return Ok(TypeNode::renamed(alias, name));
                }
                Ok(TypeNode::literal(name))
            }
            TokenKind::OpenBrace => self.parse_object(),
            TokenKind::OpenBracket => self.parse_tuple(),
            TokenKind::OpenParen => self.parse_function_or_group(),
            _ => Err(self.error(&["type"])),
        }
    }

    fn parse_object(&mut self) -> Result<TypeRef, SignatureError> {
        self.expect(TokenKind::OpenBrace)?;
        let mut fields = IndexMap::new();
        while self.kind() != TokenKind::CloseBrace {
            let name = match self.kind() {
                TokenKind::Identifier => self.parse_identifier()?.to_string(),
                TokenKind::Value if self.token_text().starts_with(|c: char| c == '"' || c == '\'') => {
                    let text = self.token_text();
                    self.next_token();
                    text[1..text.len() - 1].to_string()
                }
                _ => return Err(self.error(&["field name", "'}'"])),
            };
            if fields.contains_key(&name) {
                return Err(self.error(&["unique field name"]));
            }
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            fields.insert(name, ty);
            if !self.optional(TokenKind::Comma) {
                self.optional(TokenKind::Semicolon);
            }
        }
        self.expect(TokenKind::CloseBrace)?;
        Ok(TypeNode::object(fields))
    }

    fn parse_tuple(&mut self) -> Result<TypeRef, SignatureError> {
        self.expect(TokenKind::OpenBracket)?;
        let mut items = Vec::new();
        if self.kind() != TokenKind::CloseBracket {
            items.push(self.parse_type()?);
            while self.optional(TokenKind::Comma) {
                items.push(self.parse_type()?);
            }
        }
        self.expect(TokenKind::CloseBracket)?;
        Ok(TypeNode::tuple(items))
    }

    /// `( params ) => type`, or `( type )` when a single unnamed parameter is
    /// not followed by an arrow.
    fn parse_function_or_group(&mut self) -> Result<TypeRef, SignatureError> {
        self.expect(TokenKind::OpenParen)?;
        let mut params = Vec::new();
        let mut this_type = None;

        if self.kind() != TokenKind::CloseParen {
            loop {
                if self.at_word("this") && self.peek_kind(1) == TokenKind::Colon {
                    if this_type.is_some() || !params.is_empty() {
                        return Err(self.error(&["parameter"]));
                    }
                    self.next_token();
                    self.next_token();
                    this_type = Some(self.parse_type()?);
                } else {
                    params.push(self.parse_param()?);
                }
                if !self.optional(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::CloseParen)?;

        if self.optional(TokenKind::Arrow) {
            let result = self.parse_type()?;
            return Ok(TypeNode::function(params, result, this_type));
        }
        if this_type.is_none() && params.len() == 1 && params[0].name.is_none() {
            if let Some(param) = params.pop() {
                return Ok(param.ty);
            }
        }
        Err(self.error(&[TokenKind::Arrow.describe()]))
    }

    fn parse_param(&mut self) -> Result<Param, SignatureError> {
        if self.kind() == TokenKind::Identifier && self.peek_kind(1) == TokenKind::Colon {
            let name = self.parse_identifier()?.to_string();
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            return Ok(Param::new(Some(name), ty));
        }
        Ok(Param::new(None, self.parse_type()?))
    }
}
