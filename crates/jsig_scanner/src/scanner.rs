//! The JavaScript scanner.
//!
//! Converts source text into the token stream the parser consumes. Block
//! comments are recorded as they are skipped so that inline `/*@jsig ... */`
//! headers can be recovered after parsing. Positions are character offsets.

use crate::token::ScannedComment;
use jsig_ast::syntax_kind::SyntaxKind;
use jsig_ast::types::TokenFlags;
use jsig_core::text::TextRange;
use jsig_diagnostics::{syntax_messages, SyntaxError};

/// ES5 punctuators, longest spelling first so the first hit is the
/// maximal munch.
const PUNCTUATORS: &[(&str, SyntaxKind)] = &[
    (">>>=", SyntaxKind::GreaterThanGreaterThanGreaterThanEqualsToken),
    ("===", SyntaxKind::EqualsEqualsEqualsToken),
    ("!==", SyntaxKind::ExclamationEqualsEqualsToken),
    (">>>", SyntaxKind::GreaterThanGreaterThanGreaterThanToken),
    ("<<=", SyntaxKind::LessThanLessThanEqualsToken),
    (">>=", SyntaxKind::GreaterThanGreaterThanEqualsToken),
    ("==", SyntaxKind::EqualsEqualsToken),
    ("!=", SyntaxKind::ExclamationEqualsToken),
    ("<=", SyntaxKind::LessThanEqualsToken),
    (">=", SyntaxKind::GreaterThanEqualsToken),
    ("<<", SyntaxKind::LessThanLessThanToken),
    (">>", SyntaxKind::GreaterThanGreaterThanToken),
    ("++", SyntaxKind::PlusPlusToken),
    ("--", SyntaxKind::MinusMinusToken),
    ("&&", SyntaxKind::AmpersandAmpersandToken),
    ("||", SyntaxKind::BarBarToken),
    ("+=", SyntaxKind::PlusEqualsToken),
    ("-=", SyntaxKind::MinusEqualsToken),
    ("*=", SyntaxKind::AsteriskEqualsToken),
    ("/=", SyntaxKind::SlashEqualsToken),
    ("%=", SyntaxKind::PercentEqualsToken),
    ("&=", SyntaxKind::AmpersandEqualsToken),
    ("|=", SyntaxKind::BarEqualsToken),
    ("^=", SyntaxKind::CaretEqualsToken),
    ("(", SyntaxKind::OpenParenToken),
    (")", SyntaxKind::CloseParenToken),
    ("{", SyntaxKind::OpenBraceToken),
    ("}", SyntaxKind::CloseBraceToken),
    ("[", SyntaxKind::OpenBracketToken),
    ("]", SyntaxKind::CloseBracketToken),
    (";", SyntaxKind::SemicolonToken),
    (",", SyntaxKind::CommaToken),
    (":", SyntaxKind::ColonToken),
    ("?", SyntaxKind::QuestionToken),
    ("~", SyntaxKind::TildeToken),
    (".", SyntaxKind::DotToken),
    ("<", SyntaxKind::LessThanToken),
    (">", SyntaxKind::GreaterThanToken),
    ("=", SyntaxKind::EqualsToken),
    ("!", SyntaxKind::ExclamationToken),
    ("+", SyntaxKind::PlusToken),
    ("-", SyntaxKind::MinusToken),
    ("*", SyntaxKind::AsteriskToken),
    ("/", SyntaxKind::SlashToken),
    ("%", SyntaxKind::PercentToken),
    ("&", SyntaxKind::AmpersandToken),
    ("|", SyntaxKind::BarToken),
    ("^", SyntaxKind::CaretToken),
];

pub struct Scanner {
    text: Vec<char>,
    pos: usize,
    token_start: usize,
    token: SyntaxKind,
    /// Cooked text of the current token.
    token_value: String,
    token_flags: TokenFlags,
    comments: Vec<ScannedComment>,
    /// Comments are recorded once; lookahead rescans the same trivia.
    comments_end: usize,
    errors: Vec<SyntaxError>,
}

impl Scanner {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.chars().collect(),
            pos: 0,
            token_start: 0,
            token: SyntaxKind::Unknown,
            token_value: String::new(),
            token_flags: TokenFlags::NONE,
            comments: Vec::new(),
            comments_end: 0,
            errors: Vec::new(),
        }
    }

    /// Skip a leading `#!` line. Only meaningful before the first `scan`.
    pub fn skip_shebang(&mut self) {
        if self.pos == 0 && self.text.starts_with(&['#', '!']) {
            self.skip_to_line_end();
        }
    }

    pub fn text_len(&self) -> usize {
        self.text.len()
    }

    /// The source character at `pos`.
    pub fn source_char(&self, pos: usize) -> Option<char> {
        self.text.get(pos).copied()
    }

    /// Run `f` from the current token, then rewind to it.
    pub fn look_ahead<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let (pos, token_start, token, token_flags) = (self.pos, self.token_start, self.token, self.token_flags);
        let token_value = self.token_value.clone();
        let result = f(self);
        self.pos = pos;
        self.token_start = token_start;
        self.token = token;
        self.token_flags = token_flags;
        self.token_value = token_value;
        result
    }

    pub fn token(&self) -> SyntaxKind {
        self.token
    }

    pub fn token_value(&self) -> &str {
        &self.token_value
    }

    pub fn token_start(&self) -> usize {
        self.token_start
    }

    pub fn token_end(&self) -> usize {
        self.pos
    }

    pub fn token_flags(&self) -> TokenFlags {
        self.token_flags
    }

    pub fn has_preceding_line_break(&self) -> bool {
        self.token_flags.contains(TokenFlags::PRECEDING_LINE_BREAK)
    }

    pub fn take_errors(&mut self) -> Vec<SyntaxError> {
        std::mem::take(&mut self.errors)
    }

    /// Block comments recorded so far, in source order.
    pub fn take_comments(&mut self) -> Vec<ScannedComment> {
        std::mem::take(&mut self.comments)
    }

    fn error(&mut self, pos: usize, message: &str) {
        // Lookahead may rescan the same bad input.
        if !self.errors.iter().any(|e| e.pos == pos as u32) {
            self.errors.push(SyntaxError::new(pos as u32, message));
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.text.get(self.pos + offset).copied()
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.text[start..end].iter().collect()
    }

    fn at_str(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek(i) == Some(c))
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek(0).is_some_and(&pred) {
            self.pos += 1;
        }
    }

    fn skip_to_line_end(&mut self) {
        self.eat_while(|c| !is_line_break(c));
    }

    // ========================================================================
    // Trivia
    // ========================================================================

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek(0) {
            if is_line_break(ch) {
                self.token_flags |= TokenFlags::PRECEDING_LINE_BREAK;
                self.pos += 1;
            } else if is_inline_space(ch) {
                self.pos += 1;
            } else if self.at_str("//") {
                self.skip_to_line_end();
            } else if self.at_str("/*") {
                self.skip_block_comment();
            } else {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) {
        let start = self.pos;
        self.pos += 2;
        loop {
            match self.peek(0) {
                None => {
                    self.error(start, syntax_messages::UNTERMINATED_COMMENT);
                    break;
                }
                Some('*') if self.peek(1) == Some('/') => {
                    self.pos += 2;
                    break;
                }
                Some(ch) => {
                    if is_line_break(ch) {
                        self.token_flags |= TokenFlags::PRECEDING_LINE_BREAK;
                    }
                    self.pos += 1;
                }
            }
        }
        if start >= self.comments_end {
            let text = self.slice(start, self.pos);
            self.comments.push(ScannedComment { range: TextRange::new(start as u32, self.pos as u32), text });
            self.comments_end = self.pos;
        }
    }

    // ========================================================================
    // Tokens
    // ========================================================================

    pub fn scan(&mut self) -> SyntaxKind {
        self.token_flags = TokenFlags::NONE;
        self.token_value.clear();
        self.skip_trivia();
        self.token_start = self.pos;

        self.token = match self.peek(0) {
            None => SyntaxKind::EndOfFileToken,
            Some(quote @ ('\'' | '"')) => self.scan_string_literal(quote),
            Some(c) if c.is_ascii_digit() => self.scan_number(),
            Some('.') if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => self.scan_number(),
            Some(c) if is_identifier_start(c) => self.scan_identifier(),
            Some(_) => self.scan_punctuator(),
        };
        self.token
    }

    fn scan_punctuator(&mut self) -> SyntaxKind {
        match PUNCTUATORS.iter().find(|(text, _)| self.at_str(text)) {
            Some(&(text, kind)) => {
                self.pos += text.len();
                kind
            }
            None => {
                self.error(self.pos, syntax_messages::INVALID_CHARACTER);
                self.pos += 1;
                SyntaxKind::Unknown
            }
        }
    }

    fn scan_string_literal(&mut self, quote: char) -> SyntaxKind {
        let start = self.pos;
        self.pos += 1;
        let mut cooked = String::new();
        loop {
            match self.peek(0) {
                Some(ch) if ch == quote => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => {
                    self.pos += 1;
                    self.scan_escape_sequence(&mut cooked);
                }
                Some(ch) if !is_line_break(ch) => {
                    cooked.push(ch);
                    self.pos += 1;
                }
                _ => {
                    self.error(start, syntax_messages::UNTERMINATED_STRING_LITERAL);
                    self.token_flags |= TokenFlags::UNTERMINATED;
                    break;
                }
            }
        }
        self.token_value = cooked;
        SyntaxKind::StringLiteral
    }

    /// Cook one escape sequence; `pos` is just past the backslash.
    fn scan_escape_sequence(&mut self, out: &mut String) {
        let Some(ch) = self.peek(0) else { return };
        self.pos += 1;
        let cooked = match ch {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{0008}',
            'f' => '\u{000C}',
            'v' => '\u{000B}',
            '0' if !self.peek(0).is_some_and(|c| c.is_ascii_digit()) => '\0',
            'x' => return self.scan_hex_escape(2, out),
            'u' => {
                self.token_flags |= TokenFlags::UNICODE_ESCAPE;
                return self.scan_hex_escape(4, out);
            }
            // Line continuations produce nothing.
            '\r' => {
                if self.peek(0) == Some('\n') {
                    self.pos += 1;
                }
                return;
            }
            c if is_line_break(c) => return,
            other => other,
        };
        out.push(cooked);
    }

    fn scan_hex_escape(&mut self, digits: usize, out: &mut String) {
        let hex: Option<u32> = (0..digits)
            .map(|i| self.peek(i).and_then(|c| c.to_digit(16)))
            .try_fold(0, |acc, d| d.map(|d| acc * 16 + d));
        match hex {
            Some(value) => {
                self.pos += digits;
                out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            // Malformed: the escape letter stands for itself and the
            // following characters are scanned normally.
            None => out.push(self.text[self.pos - 1]),
        }
    }

    /// Rescan the current `/` or `/=` token as a regular expression literal.
    /// The parser calls this where an expression operand is expected.
    pub fn rescan_slash_token(&mut self) -> SyntaxKind {
        self.pos = self.token_start + 1;
        let mut in_class = false;
        loop {
            match self.peek(0) {
                Some('\\') => {
                    self.pos += 1;
                    if self.peek(0).is_some_and(|c| !is_line_break(c)) {
                        self.pos += 1;
                    }
                }
                Some('/') if !in_class => {
                    self.pos += 1;
                    self.eat_while(is_identifier_part);
                    break;
                }
                Some(ch) if !is_line_break(ch) => {
                    match ch {
                        '[' => in_class = true,
                        ']' => in_class = false,
                        _ => {}
                    }
                    self.pos += 1;
                }
                _ => {
                    self.error(self.token_start, syntax_messages::UNTERMINATED_REGULAR_EXPRESSION_LITERAL);
                    self.token_flags |= TokenFlags::UNTERMINATED;
                    break;
                }
            }
        }
        self.token_value = self.slice(self.token_start, self.pos);
        self.token = SyntaxKind::RegularExpressionLiteral;
        self.token
    }

    fn scan_number(&mut self) -> SyntaxKind {
        let start = self.pos;
        let leading_zero = self.peek(0) == Some('0');

        if leading_zero && matches!(self.peek(1), Some('x' | 'X')) {
            self.pos += 2;
            self.token_flags |= TokenFlags::HEX_SPECIFIER;
            self.eat_while(|c| c.is_ascii_hexdigit());
        } else {
            if leading_zero && self.peek(1).is_some_and(|c| ('0'..='7').contains(&c)) {
                // 0755
                self.token_flags |= TokenFlags::OCTAL;
            }
            self.eat_while(|c| c.is_ascii_digit());
            if self.peek(0) == Some('.') {
                self.pos += 1;
                self.eat_while(|c| c.is_ascii_digit());
            }
            if matches!(self.peek(0), Some('e' | 'E')) {
                self.token_flags |= TokenFlags::SCIENTIFIC;
                self.pos += 1;
                if matches!(self.peek(0), Some('+' | '-')) {
                    self.pos += 1;
                }
                self.eat_while(|c| c.is_ascii_digit());
            }
        }

        self.token_value = self.slice(start, self.pos);
        SyntaxKind::NumericLiteral
    }

    fn scan_identifier(&mut self) -> SyntaxKind {
        let start = self.pos;
        self.pos += 1;
        self.eat_while(is_identifier_part);
        self.token_value = self.slice(start, self.pos);
        SyntaxKind::from_keyword(&self.token_value).unwrap_or(SyntaxKind::Identifier)
    }
}

/// `\n`, `\r`, U+2028 and U+2029 end a line.
fn is_line_break(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Whitespace that does not end a line.
fn is_inline_space(ch: char) -> bool {
    match ch {
        ' ' | '\t' | '\u{000B}' | '\u{000C}' | '\u{00A0}' | '\u{FEFF}' => true,
        _ if (ch as u32) < 0x1680 => false,
        _ => !is_line_break(ch) && ch.is_whitespace(),
    }
}

pub fn is_identifier_start(ch: char) -> bool {
    matches!(ch, '_' | '$') || ch.is_ascii_alphabetic() || (!ch.is_ascii() && unicode_xid::UnicodeXID::is_xid_start(ch))
}

pub fn is_identifier_part(ch: char) -> bool {
    matches!(ch, '_' | '$') || ch.is_ascii_alphanumeric() || (!ch.is_ascii() && unicode_xid::UnicodeXID::is_xid_continue(ch))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<SyntaxKind> {
        let mut scanner = Scanner::new(source);
        let mut out = Vec::new();
        loop {
            let kind = scanner.scan();
            if kind == SyntaxKind::EndOfFileToken {
                return out;
            }
            out.push(kind);
        }
    }

    #[test]
    fn test_punctuation() {
        use SyntaxKind as K;
        assert_eq!(
            kinds("( ) { } [ ] ; , : ? ~"),
            vec![
                K::OpenParenToken,
                K::CloseParenToken,
                K::OpenBraceToken,
                K::CloseBraceToken,
                K::OpenBracketToken,
                K::CloseBracketToken,
                K::SemicolonToken,
                K::CommaToken,
                K::ColonToken,
                K::QuestionToken,
                K::TildeToken,
            ]
        );
    }

    #[test]
    fn test_operators_take_the_longest_match() {
        use SyntaxKind as K;
        assert_eq!(
            kinds("+ ++ += - -- -= * *= / /= % %= === !== == != >>> >>= >>>= && ||="),
            vec![
                K::PlusToken,
                K::PlusPlusToken,
                K::PlusEqualsToken,
                K::MinusToken,
                K::MinusMinusToken,
                K::MinusEqualsToken,
                K::AsteriskToken,
                K::AsteriskEqualsToken,
                K::SlashToken,
                K::SlashEqualsToken,
                K::PercentToken,
                K::PercentEqualsToken,
                K::EqualsEqualsEqualsToken,
                K::ExclamationEqualsEqualsToken,
                K::EqualsEqualsToken,
                K::ExclamationEqualsToken,
                K::GreaterThanGreaterThanGreaterThanToken,
                K::GreaterThanGreaterThanEqualsToken,
                K::GreaterThanGreaterThanGreaterThanEqualsToken,
                K::AmpersandAmpersandToken,
                K::BarBarToken,
                K::EqualsToken,
            ]
        );
        assert_eq!(kinds("a<<=b"), vec![K::Identifier, K::LessThanLessThanEqualsToken, K::Identifier]);
    }

    #[test]
    fn test_identifiers_and_keywords() {
        let mut scanner = Scanner::new("var x = 42;");
        assert_eq!(scanner.scan(), SyntaxKind::VarKeyword);
        assert_eq!(scanner.scan(), SyntaxKind::Identifier);
        assert_eq!(scanner.token_value(), "x");
        assert_eq!(scanner.scan(), SyntaxKind::EqualsToken);
        assert_eq!(scanner.scan(), SyntaxKind::NumericLiteral);
        assert_eq!(scanner.token_value(), "42");
        assert_eq!(kinds("$a _b ünï"), vec![SyntaxKind::Identifier; 3]);
    }

    #[test]
    fn test_string_escapes_are_cooked() {
        let mut scanner = Scanner::new(r#""hel\"lo" 'a\nb' '\x41B' 'é' 'a\
b' '\xZ'"#);
        let mut values = Vec::new();
        while scanner.scan() == SyntaxKind::StringLiteral {
            values.push(scanner.token_value().to_string());
        }
        assert_eq!(values, vec!["hel\"lo", "a\nb", "AB", "é", "ab", "xZ"]);
    }

    #[test]
    fn test_unterminated_string_reports_error() {
        let mut scanner = Scanner::new("'abc\n");
        assert_eq!(scanner.scan(), SyntaxKind::StringLiteral);
        assert!(scanner.token_flags().contains(TokenFlags::UNTERMINATED));
        let errors = scanner.take_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].pos, 0);
    }

    #[test]
    fn test_number_formats() {
        let mut scanner = Scanner::new("42 3.14 0xff 1e3 .5 0755");
        let mut values = Vec::new();
        while scanner.scan() == SyntaxKind::NumericLiteral {
            values.push((scanner.token_value().to_string(), scanner.token_flags()));
        }
        let text: Vec<&str> = values.iter().map(|(v, _)| v.as_str()).collect();
        assert_eq!(text, vec!["42", "3.14", "0xff", "1e3", ".5", "0755"]);
        assert!(values[2].1.contains(TokenFlags::HEX_SPECIFIER));
        assert!(values[3].1.contains(TokenFlags::SCIENTIFIC));
        assert!(values[5].1.contains(TokenFlags::OCTAL));
    }

    #[test]
    fn test_block_comments_are_recorded() {
        let mut scanner = Scanner::new("// comment\nvar /* block */ x");
        assert_eq!(scanner.scan(), SyntaxKind::VarKeyword);
        assert!(scanner.has_preceding_line_break());
        assert_eq!(scanner.scan(), SyntaxKind::Identifier);
        assert!(!scanner.has_preceding_line_break());
        let comments = scanner.take_comments();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].text, "/* block */");
        assert_eq!(comments[0].range, TextRange::new(15, 26));
    }

    #[test]
    fn test_unterminated_comment() {
        let mut scanner = Scanner::new("a /* open");
        scanner.scan();
        assert_eq!(scanner.scan(), SyntaxKind::EndOfFileToken);
        assert_eq!(scanner.take_errors()[0].message, syntax_messages::UNTERMINATED_COMMENT);
        assert_eq!(scanner.take_comments()[0].text, "/* open");
    }

    #[test]
    fn test_look_ahead_rewinds_without_duplicating_comments() {
        let mut scanner = Scanner::new("a /*@jsig x : String */ b");
        scanner.scan();
        let next = scanner.look_ahead(|s| s.scan());
        assert_eq!(next, SyntaxKind::Identifier);
        assert_eq!(scanner.token_value(), "a");
        assert_eq!(scanner.token_end(), 1);
        scanner.scan();
        assert_eq!(scanner.token_value(), "b");
        assert_eq!(scanner.take_comments().len(), 1);
    }

    #[test]
    fn test_rescan_regex() {
        let mut scanner = Scanner::new("/ab[/]c\\//gi;");
        assert_eq!(scanner.scan(), SyntaxKind::SlashToken);
        assert_eq!(scanner.rescan_slash_token(), SyntaxKind::RegularExpressionLiteral);
        assert_eq!(scanner.token_value(), "/ab[/]c\\//gi");
        assert_eq!(scanner.scan(), SyntaxKind::SemicolonToken);

        let mut open = Scanner::new("/abc\n");
        open.scan();
        open.rescan_slash_token();
        assert!(open.token_flags().contains(TokenFlags::UNTERMINATED));
    }

    #[test]
    fn test_invalid_character() {
        let mut scanner = Scanner::new("a # b");
        scanner.scan();
        assert_eq!(scanner.scan(), SyntaxKind::Unknown);
        assert_eq!(scanner.scan(), SyntaxKind::Identifier);
        assert_eq!(scanner.take_errors()[0].pos, 2);
    }

    #[test]
    fn test_shebang() {
        let mut scanner = Scanner::new("#!/usr/bin/env node\nvar x = 1;");
        scanner.skip_shebang();
        assert_eq!(scanner.scan(), SyntaxKind::VarKeyword);
        assert!(scanner.has_preceding_line_break());
    }

    #[test]
    fn test_positions_are_characters() {
        let mut scanner = Scanner::new("'é' x");
        scanner.scan();
        assert_eq!(scanner.token_end(), 3);
        assert_eq!(scanner.source_char(0), Some('\''));
        scanner.scan();
        assert_eq!(scanner.token_start(), 4);
    }
}
