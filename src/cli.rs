//! The stepcheck command-line interface.
//!
//! `validate` reads every given file (walking directories for YAML files),
//! prints diagnostics and exits with 0 when valid, 2 when any blocking
//! diagnostic was found, and 3 when a file could not be read or parsed.
//! `schema` prints the assembled JSON schema.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::ConfigReader;
use crate::diagnostics::{has_errors, Diagnostic};
use crate::errors::ConfigError;
use crate::validation::SchemaValidator;

pub mod args;
pub mod output;

use args::{Command, OutputFormat, StepcheckArgs};
use output::{color_choice, print_error, print_text, render_json};

pub const EXIT_VALID: u8 = 0;
pub const EXIT_INVALID: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;

/// The main entry point for the CLI.
pub fn run() -> ExitCode {
    let args = StepcheckArgs::parse();

    let code = match args.command {
        Command::Validate {
            paths,
            verbose,
            format,
            no_color,
        } => run_validate(&paths, verbose, format, no_color),
        Command::Schema => run_schema(),
    };
    ExitCode::from(code)
}

// ============================================================================
// SUBCOMMANDS
// ============================================================================

fn run_validate(paths: &[PathBuf], verbose: bool, format: OutputFormat, no_color: bool) -> u8 {
    let schema = match SchemaValidator::new() {
        Ok(schema) => schema,
        Err(err) => {
            print_error(ConfigError::from(err));
            return EXIT_RUNTIME;
        }
    };
    let reader = ConfigReader::new(&schema);

    let files = match collect_files(paths) {
        Ok(files) => files,
        Err(err) => {
            print_error(err);
            return EXIT_RUNTIME;
        }
    };
    if files.is_empty() {
        warn!("no YAML files found");
    }

    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut runtime_failure = false;
    for file in &files {
        match reader.read_config_with_validation(file) {
            Ok((config, found)) => {
                debug!(file = %file.display(), steps = config.steps.len(), "checked");
                diagnostics.extend(found);
            }
            Err(err) => {
                runtime_failure = true;
                print_error(err);
            }
        }
    }

    let written = match format {
        OutputFormat::Json => render_json(&diagnostics)
            .map(|json| println!("{json}"))
            .map_err(std::io::Error::from),
        OutputFormat::Text => print_text(&diagnostics, verbose, color_choice(no_color)),
    };
    if let Err(err) = written {
        warn!(error = %err, "cannot write output");
        return EXIT_RUNTIME;
    }

    if runtime_failure {
        EXIT_RUNTIME
    } else if has_errors(&diagnostics) {
        EXIT_INVALID
    } else {
        EXIT_VALID
    }
}

fn run_schema() -> u8 {
    let schema = match SchemaValidator::new() {
        Ok(schema) => schema,
        Err(err) => {
            print_error(ConfigError::from(err));
            return EXIT_RUNTIME;
        }
    };
    match serde_json::to_string_pretty(schema.schema_document()) {
        Ok(json) => {
            println!("{json}");
            EXIT_VALID
        }
        Err(err) => {
            warn!(error = %err, "cannot serialize schema");
            EXIT_RUNTIME
        }
    }
}

// ============================================================================
// FILE DISCOVERY
// ============================================================================

/// Expands directories into their YAML files, sorted by path. Explicit file
/// arguments are kept whatever their extension.
pub fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>, ConfigError> {
    let mut files = Vec::new();
    for path in paths {
        let name = path.display().to_string();
        let metadata = fs::metadata(path).map_err(|e| ConfigError::io(&name, e))?;
        if !metadata.is_dir() {
            files.push(path.clone());
            continue;
        }
        let mut found = Vec::new();
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|e| ConfigError::io(&name, e.into()))?;
            if entry.file_type().is_file() && is_yaml(entry.path()) {
                found.push(entry.into_path());
            }
        }
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yml" | "yaml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yaml() {
        assert!(is_yaml(Path::new("a/b.yml")));
        assert!(is_yaml(Path::new("b.yaml")));
        assert!(!is_yaml(Path::new("b.json")));
        assert!(!is_yaml(Path::new("yml")));
    }

    #[test]
    fn test_missing_path_is_io_error() {
        let result = collect_files(&[PathBuf::from("definitely/not/here.yml")]);
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
