//! jsig_module: Header lookup and source discovery.
//!
//! Implements the file system side of verification:
//! - companion header lookup (`lib/client.js` -> `lib/client.hjs`)
//! - header `import` resolution into imported types
//! - source file discovery for directories and project files

use jsig_checker::ImportedType;
use jsig_signature::{parse_header, Header, ImportStatement, SignatureError};
use jsig_types::TypeRef;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// A header import that could not be satisfied.
#[derive(Debug, Error)]
pub enum HeaderResolveError {
    #[error("cannot read header {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid header {}: {source}", path.display())]
    Syntax {
        path: PathBuf,
        #[source]
        source: SignatureError,
    },
    #[error("{} does not export '{name}' (imported on line {line})", path.display())]
    MissingExport { path: PathBuf, name: String, line: u32 },
}

// ============================================================================
// Header lookup
// ============================================================================

/// The companion header path of a source file: the same stem with
/// `extension`.
pub fn companion_header_path(source: &Path, extension: &str) -> PathBuf {
    source.with_extension(extension)
}

/// Read and parse a header file.
pub fn load_header_file(path: &Path) -> Result<Header, HeaderResolveError> {
    let text = std::fs::read_to_string(path).map_err(|source| HeaderResolveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_header(&text).map_err(|source| HeaderResolveError::Syntax {
        path: path.to_path_buf(),
        source,
    })
}

/// The header a module specifier refers to, relative to `base_dir`.
///
/// A specifier without an extension gets `extension`; `./channel.js`
/// refers to the companion header of `channel.js`.
pub fn resolve_import_path(base_dir: &Path, specifier: &str, extension: &str) -> PathBuf {
    let candidate = base_dir.join(specifier);
    match candidate.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext == extension => candidate,
        Some("js") => candidate.with_extension(extension),
        _ => {
            let mut raw = candidate.into_os_string();
            raw.push(".");
            raw.push(extension);
            PathBuf::from(raw)
        }
    }
}

// ============================================================================
// Import resolution
// ============================================================================

/// Resolve every `import` of `header` against headers next to `base_dir`.
///
/// Imports are resolved one level deep: an imported type is taken as
/// written in its header, and names it refers to are not imported along
/// with it.
pub fn resolve_imports(
    header: &Header,
    base_dir: &Path,
    extension: &str,
) -> Result<Vec<ImportedType>, HeaderResolveError> {
    let mut imported = Vec::new();
    for import in header.imports() {
        let path = resolve_import_path(base_dir, &import.path, extension);
        debug!(path = %path.display(), line = import.line, "resolving header import");
        let exporting = load_header_file(&path)?;
        imported.extend(import_names(import, &exporting, &path)?);
    }
    Ok(imported)
}

/// The types `import` names, looked up in the already loaded `exporting`
/// header found at `path`.
pub fn import_names(
    import: &ImportStatement,
    exporting: &Header,
    path: &Path,
) -> Result<Vec<ImportedType>, HeaderResolveError> {
    import
        .names
        .iter()
        .map(|name| {
            let (params, ty) = exported_alias(exporting, &name.name).ok_or_else(|| {
                HeaderResolveError::MissingExport {
                    path: path.to_path_buf(),
                    name: name.name.clone(),
                    line: import.line,
                }
            })?;
            Ok(ImportedType {
                name: name.name.clone(),
                local_name: name.local_name().to_string(),
                params,
                ty,
            })
        })
        .collect()
}

/// A type alias (generic or not) or a value declaration named `name`.
fn exported_alias(header: &Header, name: &str) -> Option<(Vec<String>, TypeRef)> {
    if let Some(alias) = header.type_aliases().find(|a| a.name == name) {
        return Some((alias.params.clone(), Arc::clone(&alias.ty)));
    }
    header.exported_type(name).map(|ty| (Vec::new(), Arc::clone(ty)))
}

// ============================================================================
// Source discovery
// ============================================================================

/// Directories never searched for sources.
const SKIPPED_DIRECTORIES: &[&str] = &["node_modules", ".git"];

/// Collect the `.js` files a project names.
///
/// An explicit `files` list wins. Otherwise each `include` entry is a file
/// or a directory searched recursively. Paths containing an `exclude`
/// entry are skipped. The result is sorted and free of duplicates.
pub fn discover_source_files(
    root_dir: &Path,
    include: &[String],
    exclude: &[String],
    files: Option<&[String]>,
) -> Vec<PathBuf> {
    if let Some(file_list) = files {
        return file_list
            .iter()
            .map(|f| root_dir.join(f))
            .filter(|path| path.is_file())
            .collect();
    }

    let mut result = Vec::new();
    for entry in include {
        collect_source_files(&root_dir.join(entry), exclude, &mut result);
    }
    result.sort();
    result.dedup();
    result
}

/// Collect `.js` files under `path`, which may itself be a file.
pub fn collect_source_files(path: &Path, exclude: &[String], result: &mut Vec<PathBuf>) {
    if is_excluded(path, exclude) {
        return;
    }
    if path.is_file() {
        if is_source_file(path) {
            result.push(path.to_path_buf());
        }
        return;
    }

    let entries = match std::fs::read_dir(path) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let child = entry.path();
        if child.is_dir() {
            let dir_name = child.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if SKIPPED_DIRECTORIES.contains(&dir_name) {
                continue;
            }
        }
        collect_source_files(&child, exclude, result);
    }
}

fn is_source_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("js")
}

fn is_excluded(path: &Path, exclude: &[String]) -> bool {
    let path = path.to_string_lossy();
    exclude
        .iter()
        .map(|pattern| pattern.trim_start_matches("./"))
        .any(|pattern| !pattern.is_empty() && path.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_companion_header_path() {
        let path = companion_header_path(Path::new("lib/client.js"), "hjs");
        assert_eq!(path, PathBuf::from("lib/client.hjs"));
    }

    #[test]
    fn test_resolve_import_path() {
        let base = Path::new("lib");
        assert_eq!(resolve_import_path(base, "./channel", "hjs"), PathBuf::from("lib/./channel.hjs"));
        assert_eq!(resolve_import_path(base, "./channel.js", "hjs"), PathBuf::from("lib/./channel.hjs"));
        assert_eq!(resolve_import_path(base, "./channel.hjs", "hjs"), PathBuf::from("lib/./channel.hjs"));
        assert_eq!(resolve_import_path(base, "./v1.2/types", "hjs"), PathBuf::from("lib/./v1.2/types.hjs"));
    }

    #[test]
    fn test_import_names() {
        let exporting = parse_header(
            "type Channel : { send: (key: String) => Number }
type Callback<T> : (err: Error | null, value: T) => void
makeChannel : () => Channel",
        )
        .unwrap();
        let importing = parse_header("import { Channel as C, Callback, makeChannel } from \"./channel\"").unwrap();
        let import = importing.imports().next().unwrap();

        let types = import_names(import, &exporting, Path::new("channel.hjs")).unwrap();
        assert_eq!(types.len(), 3);
        assert_eq!(types[0].name, "Channel");
        assert_eq!(types[0].local_name, "C");
        assert_eq!(types[1].params, vec!["T".to_string()]);
        assert_eq!(types[2].ty.to_source(), "() => Channel");
    }

    #[test]
    fn test_import_of_missing_name() {
        let exporting = parse_header("type Channel : String").unwrap();
        let importing = parse_header("import { Socket } from \"./channel\"").unwrap();
        let import = importing.imports().next().unwrap();
        let err = import_names(import, &exporting, Path::new("channel.hjs")).unwrap_err();
        assert!(matches!(err, HeaderResolveError::MissingExport { ref name, line: 1, .. } if name == "Socket"));
    }

    #[test]
    fn test_is_excluded() {
        let exclude = vec!["./lib/vendor".to_string()];
        assert!(is_excluded(Path::new("root/lib/vendor/a.js"), &exclude));
        assert!(!is_excluded(Path::new("root/lib/a.js"), &exclude));
        assert!(!is_excluded(Path::new("root/lib/a.js"), &[String::new()]));
    }
}
