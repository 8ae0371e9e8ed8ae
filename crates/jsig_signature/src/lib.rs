//! jsig_signature: Parser for the signature type language.
//!
//! Signature text is lexed into tokens (literal values are recognized by
//! [`value_literal`]) and parsed by recursive descent into
//! [`jsig_types::TypeNode`] trees. The same parser reads header files: a
//! sequence of imports, type aliases, value declarations and a default
//! export.

pub mod error;
pub mod header;
mod lexer;
mod parser;
pub mod value_literal;

pub use error::SignatureError;
pub use header::{
    inline_header_body, parse_header, parse_header_at, ExportDefault, Header, HeaderStatement,
    ImportName, ImportStatement, TypeAliasDeclaration, ValueDeclaration,
};
pub use parser::{parse_type, SignatureParser};
pub use value_literal::{parse_value_literal, scan_value_literal};
