//! Command-line arguments and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "stepcheck",
    version,
    about = "Validate YAML step files and point at the exact line of every problem."
)]
pub struct StepcheckArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate step files and report diagnostics.
    Validate {
        /// Files or directories. Directories are searched for *.yml and *.yaml.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Show each problem with its source line and enclosing step.
        #[arg(short, long)]
        verbose: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Disable coloured output.
        #[arg(long)]
        no_color: bool,
    },
    /// Print the JSON schema step files are checked against.
    Schema,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_args() {
        let args = StepcheckArgs::parse_from(["stepcheck", "validate", "-v", "--format", "json", "a.yml", "dir"]);
        match args.command {
            Command::Validate {
                paths,
                verbose,
                format,
                no_color,
            } => {
                assert_eq!(paths, vec![PathBuf::from("a.yml"), PathBuf::from("dir")]);
                assert!(verbose);
                assert_eq!(format, OutputFormat::Json);
                assert!(!no_color);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_validate_requires_a_path() {
        assert!(StepcheckArgs::try_parse_from(["stepcheck", "validate"]).is_err());
    }
}
