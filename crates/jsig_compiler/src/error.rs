//! Load failures.
//!
//! These stop verification of one file. They are never mixed into the
//! diagnostics of a [`jsig_checker::Meta`].

use jsig_module::HeaderResolveError;
use jsig_signature::SignatureError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    /// The JavaScript source does not parse.
    #[error("{}:{line}: {}", file.display(), messages.join("; "))]
    Syntax { file: PathBuf, line: u32, messages: Vec<String> },
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not valid UTF-8", path.display())]
    InvalidUtf8 { path: PathBuf },
    /// The companion or an inline header does not parse.
    #[error("{}: {source}", path.display())]
    Signature {
        path: PathBuf,
        #[source]
        source: SignatureError,
    },
    #[error(transparent)]
    Header(#[from] HeaderResolveError),
}
