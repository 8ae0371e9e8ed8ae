//! jsig_options: jsig.json parsing and verifier options.
//!
//! A project file names the sources to verify and tunes the export
//! ordering rules. Every field is optional; command line flags override
//! whatever the file sets.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extension of companion header files, without the dot.
pub const DEFAULT_HEADER_EXTENSION: &str = "hjs";

/// Verifier options, matching the `verify` section of jsig.json.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VerifyOptions {
    pub allow_prototype_after_export: Option<bool>,
    pub allow_export_reassignment: Option<bool>,
    pub header_extension: Option<String>,
}

/// The jsig.json file structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsigConfig {
    /// Explicit source files, relative to the config file.
    pub files: Option<Vec<String>>,
    /// Directories to search for `.js` files.
    pub include: Option<Vec<String>>,
    /// Path prefixes to skip while searching.
    pub exclude: Option<Vec<String>>,
    pub verify: Option<VerifyOptions>,
}

impl JsigConfig {
    pub fn allow_prototype_after_export(&self) -> bool {
        self.verify.as_ref().and_then(|v| v.allow_prototype_after_export).unwrap_or(true)
    }

    pub fn allow_export_reassignment(&self) -> bool {
        self.verify.as_ref().and_then(|v| v.allow_export_reassignment).unwrap_or(false)
    }

    /// The header extension, with any leading dot removed.
    pub fn header_extension(&self) -> &str {
        self.verify
            .as_ref()
            .and_then(|v| v.header_extension.as_deref())
            .map_or(DEFAULT_HEADER_EXTENSION, |ext| ext.trim_start_matches('.'))
    }
}

/// A project file that could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid project file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Parse a jsig.json file from a string.
pub fn parse_config(content: &str) -> Result<JsigConfig, ConfigError> {
    Ok(serde_json::from_str(content)?)
}

/// Parse a jsig.json file from a path.
pub fn parse_config_file(path: &Path) -> Result<JsigConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config, JsigConfig::default());
        assert!(config.allow_prototype_after_export());
        assert!(!config.allow_export_reassignment());
        assert_eq!(config.header_extension(), "hjs");
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"{
                "files": ["index.js"],
                "include": ["lib"],
                "exclude": ["lib/vendor"],
                "verify": {
                    "allowPrototypeAfterExport": false,
                    "allowExportReassignment": true,
                    "headerExtension": ".d.hjs"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(config.files.as_deref(), Some(&["index.js".to_string()][..]));
        assert_eq!(config.include.as_deref(), Some(&["lib".to_string()][..]));
        assert!(!config.allow_prototype_after_export());
        assert!(config.allow_export_reassignment());
        assert_eq!(config.header_extension(), "d.hjs");
    }

    #[test]
    fn test_unknown_verify_option_is_rejected() {
        let err = parse_config(r#"{ "verify": { "strict": true } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = parse_config_file(Path::new("/nonexistent/jsig.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().starts_with("cannot read /nonexistent/jsig.json"));
    }
}
