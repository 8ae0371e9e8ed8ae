//! jsig: Verify JavaScript files against their signature headers.
//!
//! Usage:
//!   jsig [options] [file|dir...]
//!
//! Each `lib/client.js` is checked against `lib/client.hjs` and any
//! `/*@jsig ... */` comments it contains.

mod tracing_config;

use clap::Parser as ClapParser;
use jsig_compiler::{CompileError, CompileOptions, FileReport, Program};
use jsig_diagnostics::TypeDiagnostic;
use jsig_options::JsigConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

#[derive(ClapParser, Debug)]
#[command(name = "jsig", version, about = "jsig - verify annotated JavaScript against type signatures")]
struct Cli {
    /// JavaScript files or directories to verify.
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to jsig.json.
    #[arg(short = 'p', long = "project")]
    project: Option<PathBuf>,

    /// Print one JSON report instead of text.
    #[arg(long)]
    json: bool,

    /// Allow `Ctor.prototype.x = ...` after `Ctor` was exported.
    #[arg(long)]
    allow_prototype_after_export: bool,

    /// Allow assigning `module.exports` more than once.
    #[arg(long)]
    allow_export_reassignment: bool,

    /// List the files that are verified.
    #[arg(long)]
    list_files: bool,
}

/// Exit code when every file loaded and verified cleanly.
const EXIT_CLEAN: i32 = 0;
/// Exit code when a file could not be read or parsed.
const EXIT_LOAD_FAILURE: i32 = 1;
/// Exit code when verification found diagnostics.
const EXIT_DIAGNOSTICS: i32 = 2;

// ANSI color codes
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const GRAY: &str = "\x1b[90m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn main() {
    tracing_config::init_tracing();
    let cli = Cli::parse();
    process::exit(run(&cli));
}

fn run(cli: &Cli) -> i32 {
    let start = Instant::now();
    let (files, config) = match resolve_input_files(cli) {
        Ok(resolved) => resolved,
        Err(message) => {
            print_error(&message);
            return EXIT_LOAD_FAILURE;
        }
    };
    if files.is_empty() {
        print_error("No input files found.");
        return EXIT_LOAD_FAILURE;
    }
    if cli.list_files {
        for f in &files {
            println!("{}", f.display());
        }
    }

    let mut options = CompileOptions::from_config(&config);
    // CLI flags override jsig.json
    if cli.allow_prototype_after_export {
        options.policy.allow_prototype_after_export = true;
    }
    if cli.allow_export_reassignment {
        options.policy.allow_export_reassignment = true;
    }

    let program = Program::new(files, options);
    let results = program.verify();
    let outcome = Outcome::from_results(&results);

    if cli.json {
        print_json(&program.root_files, &results);
    } else {
        print_text(&results, &outcome, start);
    }
    outcome.exit_code()
}

// ============================================================================
// Input
// ============================================================================

fn resolve_input_files(cli: &Cli) -> Result<(Vec<PathBuf>, JsigConfig), String> {
    if let Some(project) = &cli.project {
        return load_files_from_config(project);
    }
    if !cli.paths.is_empty() {
        return Ok((expand_paths(&cli.paths), JsigConfig::default()));
    }
    let default_project = Path::new("jsig.json");
    if default_project.is_file() {
        return load_files_from_config(default_project);
    }
    Ok((Vec::new(), JsigConfig::default()))
}

fn load_files_from_config(path: &Path) -> Result<(Vec<PathBuf>, JsigConfig), String> {
    let config = jsig_options::parse_config_file(path)
        .map_err(|e| format!("Failed to read project '{}': {}", path.display(), e))?;
    let root_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let default_include = vec![".".to_string()];
    let include = config.include.as_deref().unwrap_or(&default_include);
    let exclude = config.exclude.as_deref().unwrap_or(&[]);
    let files = jsig_module::discover_source_files(root_dir, include, exclude, config.files.as_deref());
    Ok((files, config))
}

/// Files stay as given; directories expand to their sorted `.js` files.
fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found = Vec::new();
            jsig_module::collect_source_files(path, &[], &mut found);
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    files
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Default, PartialEq, Eq)]
struct Outcome {
    diagnostics: usize,
    failures: usize,
}

impl Outcome {
    fn from_results(results: &[Result<FileReport, CompileError>]) -> Self {
        let mut outcome = Outcome::default();
        for result in results {
            match result {
                Ok(report) => outcome.diagnostics += report.meta.errors.len(),
                Err(_) => outcome.failures += 1,
            }
        }
        outcome
    }

    fn exit_code(&self) -> i32 {
        if self.failures > 0 {
            EXIT_LOAD_FAILURE
        } else if self.diagnostics > 0 {
            EXIT_DIAGNOSTICS
        } else {
            EXIT_CLEAN
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'r> {
    files: Vec<&'r FileReport>,
    failures: Vec<JsonFailure<'r>>,
}

#[derive(Serialize)]
struct JsonFailure<'r> {
    file: &'r Path,
    message: String,
}

fn print_json(files: &[PathBuf], results: &[Result<FileReport, CompileError>]) {
    let mut report = JsonReport { files: Vec::new(), failures: Vec::new() };
    for (file, result) in files.iter().zip(results) {
        match result {
            Ok(file_report) => report.files.push(file_report),
            Err(e) => report.failures.push(JsonFailure { file, message: e.to_string() }),
        }
    }
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => print_error(&format!("Failed to serialize report: {}", e)),
    }
}

fn print_text(results: &[Result<FileReport, CompileError>], outcome: &Outcome, start: Instant) {
    let use_color = atty_is_terminal();
    for result in results {
        match result {
            Ok(report) => {
                for diag in &report.meta.errors {
                    print_diagnostic(&report.file, diag, use_color);
                }
            }
            Err(e) => print_error(&e.to_string()),
        }
    }

    let count = outcome.diagnostics;
    if count > 0 {
        let plural = if count == 1 { "" } else { "s" };
        if use_color {
            eprintln!("\n{}Found {} error{}.{}", RED, count, plural, RESET);
        } else {
            eprintln!("\nFound {} error{}.", count, plural);
        }
    } else if use_color {
        eprintln!("{}Verified {} file(s) in {:.2}s.{}", GRAY, results.len(), start.elapsed().as_secs_f64(), RESET);
    }
}

fn print_diagnostic(file: &Path, diag: &TypeDiagnostic, use_color: bool) {
    if use_color {
        eprintln!(
            "{}{}{}:{}: {}{}{} {}",
            CYAN,
            file.display(),
            RESET,
            diag.line,
            BOLD,
            diag.kind,
            RESET,
            diag.message()
        );
    } else {
        eprintln!("{}:{}: {} {}", file.display(), diag.line, diag.kind, diag.message());
    }
}

fn print_error(msg: &str) {
    if atty_is_terminal() {
        eprintln!("{}{}error{}: {}", BOLD, RED, RESET, msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

fn atty_is_terminal() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: isatty only inspects the descriptor.
        unsafe { libc::isatty(2) != 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from(["jsig", "--json", "--allow-export-reassignment", "lib", "index.js"]);
        assert!(cli.json);
        assert!(cli.allow_export_reassignment);
        assert!(!cli.allow_prototype_after_export);
        assert_eq!(cli.paths, vec![PathBuf::from("lib"), PathBuf::from("index.js")]);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Outcome::default().exit_code(), EXIT_CLEAN);
        assert_eq!(Outcome { diagnostics: 3, failures: 0 }.exit_code(), EXIT_DIAGNOSTICS);
        assert_eq!(Outcome { diagnostics: 3, failures: 1 }.exit_code(), EXIT_LOAD_FAILURE);
    }

    #[test]
    fn test_unreadable_file_is_a_load_failure() {
        let results = vec![Err(CompileError::InvalidUtf8 { path: PathBuf::from("a.js") })];
        assert_eq!(Outcome::from_results(&results), Outcome { diagnostics: 0, failures: 1 });
    }
}
