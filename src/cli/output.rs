//! User-facing output for the CLI.
//!
//! Everything that reaches stdout or stderr goes through here so that the
//! text, JSON and error renderings stay consistent. Writers take any
//! [`WriteColor`] so the same code serves the terminal and tests.

use std::io::{self, IsTerminal};

use miette::Report;
use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::diagnostics::{format_diagnostics, has_errors, render_contextual, Diagnostic};

// ============================================================================
// OUTCOME
// ============================================================================

/// Overall verdict for a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Valid,
    Warnings,
    Invalid,
}

impl Outcome {
    pub fn of(diagnostics: &[Diagnostic]) -> Self {
        if has_errors(diagnostics) {
            Outcome::Invalid
        } else if diagnostics.is_empty() {
            Outcome::Valid
        } else {
            Outcome::Warnings
        }
    }

    pub fn is_valid(self) -> bool {
        self != Outcome::Invalid
    }
}

/// Color is used only when requested and stdout is a terminal.
pub fn color_choice(no_color: bool) -> ColorChoice {
    if no_color || !io::stdout().is_terminal() {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

// ============================================================================
// TEXT
// ============================================================================

/// Writes the diagnostics followed by a one-line verdict.
pub fn write_text(
    out: &mut impl WriteColor,
    diagnostics: &[Diagnostic],
    verbose: bool,
) -> io::Result<()> {
    if !diagnostics.is_empty() {
        if verbose {
            write!(out, "{}", render_contextual(diagnostics))?;
        } else {
            writeln!(out, "{}", format_diagnostics(diagnostics))?;
        }
    }
    write_status(out, Outcome::of(diagnostics))
}

pub fn write_status(out: &mut impl WriteColor, outcome: Outcome) -> io::Result<()> {
    let (color, text) = match outcome {
        Outcome::Valid => (Color::Green, "✓ Configuration is valid"),
        Outcome::Warnings => (Color::Yellow, "\n⚠️  Validation passed with warnings"),
        Outcome::Invalid => (Color::Red, "\n❌ Validation failed"),
    };
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    writeln!(out, "{text}")?;
    out.reset()
}

pub fn print_text(diagnostics: &[Diagnostic], verbose: bool, choice: ColorChoice) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(choice);
    write_text(&mut stdout, diagnostics, verbose)
}

// ============================================================================
// JSON
// ============================================================================

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    valid: bool,
    diagnostics: &'a [Diagnostic],
}

/// `{ "valid": bool, "diagnostics": [...] }`, pretty printed.
pub fn render_json(diagnostics: &[Diagnostic]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        valid: Outcome::of(diagnostics).is_valid(),
        diagnostics,
    })
}

// ============================================================================
// ERRORS
// ============================================================================

/// Renders a fatal error with its source snippet on stderr.
pub fn print_error<E>(error: E)
where
    E: miette::Diagnostic + Send + Sync + 'static,
{
    let report = Report::new(error);
    eprintln!("{report:?}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Position;
    use termcolor::Buffer;

    fn render(diagnostics: &[Diagnostic]) -> String {
        let mut buffer = Buffer::no_color();
        write_text(&mut buffer, diagnostics, false).unwrap();
        String::from_utf8(buffer.into_inner()).unwrap()
    }

    #[test]
    fn test_valid_status() {
        assert_eq!(render(&[]), "✓ Configuration is valid\n");
    }

    #[test]
    fn test_flat_errors_then_status() {
        let diagnostics = [Diagnostic::error("a.yml", Position::new(3, 5), "Bad thing")];
        assert_eq!(render(&diagnostics), "a.yml:3:5: Bad thing\n\n❌ Validation failed\n");
    }

    #[test]
    fn test_warnings_only() {
        let diagnostics = [Diagnostic::warning("a.yml", Position::new(1, 1), "Hmm")];
        assert_eq!(
            render(&diagnostics),
            "a.yml:1:1: warning: Hmm\n\n⚠️  Validation passed with warnings\n"
        );
        assert_eq!(Outcome::of(&diagnostics), Outcome::Warnings);
    }

    #[test]
    fn test_json_report() {
        let diagnostics = [Diagnostic::error("a.yml", Position::new(2, 3), "Nope")];
        let json: serde_json::Value = serde_json::from_str(&render_json(&diagnostics).unwrap()).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["diagnostics"][0]["file"], "a.yml");
        assert_eq!(json["diagnostics"][0]["line"], 2);
        assert_eq!(json["diagnostics"][0]["severity"], "error");
        assert!(render_json(&[]).unwrap().starts_with("{\n  \"valid\": true"));
    }
}
