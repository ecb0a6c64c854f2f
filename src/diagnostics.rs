//! Diagnostics: positioned, user-facing problem reports.
//!
//! A [`Diagnostic`] is produced by the validators and never mutated afterward.
//! This module holds the record itself, the flat one-line-per-diagnostic
//! renderer, and the blocking check used for exit status. The contextual
//! renderer lives in [`context`].

use std::fmt;

use serde::{Serialize, Serializer};

use crate::document::Position;

pub mod context;

pub use context::{render_contextual, render_contextual_with};

// ============================================================================
// SEVERITY
// ============================================================================

/// Diagnostic severity. `Unspecified` blocks exactly like `Error`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Unspecified,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Unspecified => "",
        }
    }

    pub fn is_blocking(&self) -> bool {
        !matches!(self, Severity::Warning)
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ============================================================================
// DIAGNOSTIC
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    #[serde(rename = "file")]
    pub file_path: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn new(
        file_path: impl Into<String>,
        position: Position,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            line: position.line,
            column: position.column,
            message: message.into(),
            severity,
        }
    }

    pub fn error(file_path: impl Into<String>, position: Position, message: impl Into<String>) -> Self {
        Self::new(file_path, position, message, Severity::Error)
    }

    pub fn warning(file_path: impl Into<String>, position: Position, message: impl Into<String>) -> Self {
        Self::new(file_path, position, message, Severity::Warning)
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

/// `file:line:col: [severity: ]message`. The severity prefix is shown only
/// for non-error severities.
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}: ", self.file_path, self.line, self.column)?;
        if self.severity == Severity::Warning {
            write!(f, "{}: ", self.severity.as_str())?;
        }
        f.write_str(&self.message)
    }
}

// ============================================================================
// FLAT RENDERING AND EXIT STATUS
// ============================================================================

/// Renders each diagnostic on its own line, joined by newlines.
pub fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(Diagnostic::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// True when any diagnostic is an error or has unspecified severity.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity.is_blocking())
}

/// Every diagnostic of a failed validation run, as a single error value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub diagnostics: Vec<Diagnostic>,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.diagnostics.as_slice() {
            [] => f.write_str("validation failed with no specific errors"),
            [only] => write!(f, "{only}"),
            all => write!(
                f,
                "validation failed with {} error(s):\n{}",
                all.len(),
                format_diagnostics(all)
            ),
        }
    }
}

impl std::error::Error for ValidationFailure {}
