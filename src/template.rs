//! Template markup syntax.
//!
//! String fields may embed `{{ expression }}`, `{% tag %}` and `{# comment #}`
//! markup that is rendered at execution time. This module only checks that
//! the markup is well formed; variables are never resolved.

use thiserror::Error;

pub mod parser;

pub use parser::check_syntax;

/// Malformed template markup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error in template (line {line}, col {column}): {message}")]
pub struct TemplateSyntaxError {
    /// Position inside the template text, not inside the configuration file.
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl TemplateSyntaxError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

/// The part of an error worth showing next to a field name: anything up to
/// and including the first `:` of an `Error in ...:` prefix is dropped.
pub fn error_cause(error: &impl std::fmt::Display) -> String {
    let text = error.to_string();
    if text.contains("Error in") {
        if let Some((_, cause)) = text.split_once(':') {
            return cause.trim().to_string();
        }
    }
    text
}
