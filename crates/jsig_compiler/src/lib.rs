//! jsig_compiler: Verification orchestration.
//!
//! Loads each source file with its companion header and inline `@jsig`
//! comments, resolves header imports, and runs the verifier. Files are
//! independent, so a [`Program`] verifies them in parallel and reports in
//! input order.

mod error;

pub use error::CompileError;

use bumpalo::Bump;
use jsig_checker::{verify, ExportPolicy, Meta};
use jsig_core::LineMap;
use jsig_module::{companion_header_path, resolve_imports};
use jsig_options::{JsigConfig, DEFAULT_HEADER_EXTENSION};
use jsig_parser::Parser;
use jsig_signature::{inline_header_body, parse_header_at, Header};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span};

/// Options shared by every file of a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub policy: ExportPolicy,
    /// Companion header extension, without the dot.
    pub header_extension: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { policy: ExportPolicy::default(), header_extension: DEFAULT_HEADER_EXTENSION.to_string() }
    }
}

impl CompileOptions {
    pub fn from_config(config: &JsigConfig) -> Self {
        Self {
            policy: ExportPolicy {
                allow_export_reassignment: config.allow_export_reassignment(),
                allow_prototype_after_export: config.allow_prototype_after_export(),
            },
            header_extension: config.header_extension().to_string(),
        }
    }
}

/// The verification result of one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub file: PathBuf,
    #[serde(flatten)]
    pub meta: Meta,
}

/// The set of files verified together.
pub struct Program {
    /// Compile options.
    pub options: CompileOptions,
    /// The root file names.
    pub root_files: Vec<PathBuf>,
}

impl Program {
    pub fn new(root_files: Vec<PathBuf>, options: CompileOptions) -> Self {
        Self { options, root_files }
    }

    /// Verify every root file. Results keep the order of `root_files`.
    pub fn verify(&self) -> Vec<Result<FileReport, CompileError>> {
        info!(files = self.root_files.len(), "verifying program");
        self.root_files.par_iter().map(|path| verify_file(path, &self.options)).collect()
    }
}

/// Verify one file on disk with its companion header.
pub fn verify_file(path: &Path, options: &CompileOptions) -> Result<FileReport, CompileError> {
    let span = info_span!("verify_file", file = %path.display());
    let _enter = span.enter();

    let source = read_source(path)?;
    let header_path = companion_header_path(path, &options.header_extension);
    let header_text = if header_path.is_file() {
        debug!(header = %header_path.display(), "companion header");
        Some(read_source(&header_path)?)
    } else {
        None
    };
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let meta = verify_source(path, &source, header_text.as_deref(), base_dir, options)?;
    debug!(errors = meta.errors.len(), "verified");
    Ok(FileReport { file: path.to_path_buf(), meta })
}

/// Verify source text. `header` is the companion header text, if any;
/// header imports are resolved against `base_dir`.
pub fn verify_source(
    file: &Path,
    source: &str,
    header: Option<&str>,
    base_dir: &Path,
    options: &CompileOptions,
) -> Result<Meta, CompileError> {
    let arena = Bump::new();
    let file_name = file.to_string_lossy();
    let result = Parser::new(&arena, &file_name, source).parse_source_file();
    let line_map = LineMap::new(source);
    if let Some(first) = result.errors.first() {
        return Err(CompileError::Syntax {
            file: file.to_path_buf(),
            line: line_map.line_number(first.pos),
            messages: result.errors.iter().map(|e| e.message.clone()).collect(),
        });
    }

    let mut statements = Vec::new();
    if let Some(text) = header {
        let companion = parse_header_at(text, 1).map_err(|source| CompileError::Signature {
            path: companion_header_path(file, &options.header_extension),
            source,
        })?;
        statements.extend(companion.statements);
    }
    for comment in result.source_file.comments.iter() {
        let body = comment.body();
        let Some(inline) = inline_header_body(body) else { continue };
        let skipped = &body[..body.len() - inline.len()];
        let first_line = line_map.line_number(comment.range.pos) + skipped.matches('\n').count() as u32;
        debug!(line = first_line, "inline header");
        let parsed = parse_header_at(inline, first_line)
            .map_err(|source| CompileError::Signature { path: file.to_path_buf(), source })?;
        statements.extend(parsed.statements);
    }
    let header = Header { statements };

    let imports = resolve_imports(&header, base_dir, &options.header_extension)?;
    Ok(verify(&result.source_file, &line_map, &header, &imports, options.policy))
}

fn read_source(path: &Path) -> Result<String, CompileError> {
    let bytes = std::fs::read(path).map_err(|source| CompileError::Io { path: path.to_path_buf(), source })?;
    match simdutf8::basic::from_utf8(&bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(_) => Err(CompileError::InvalidUtf8 { path: path.to_path_buf() }),
    }
}
