//! Fatal errors.
//!
//! Problems inside a well-formed configuration are [`Diagnostic`]s and never
//! abort a run. The errors here are the ones that stop a file from being
//! validated at all: it cannot be read, it is not YAML, it does not decode
//! into the step model, or the embedded schema is broken.
//!
//! [`Diagnostic`]: crate::diagnostics::Diagnostic

use std::sync::Arc;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::diagnostics::ValidationFailure;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    #[diagnostic(code(stepcheck::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {message}")]
    #[diagnostic(code(stepcheck::parse))]
    Parse {
        path: String,
        message: String,
        #[source_code]
        src: Arc<NamedSource<String>>,
        #[label("here")]
        span: Option<SourceSpan>,
    },

    #[error("cannot decode {path}: {message}")]
    #[diagnostic(
        code(stepcheck::decode),
        help("check that every field has the expected kind of value")
    )]
    Decode { path: String, message: String },

    #[error("{path}: expected a list of steps or a mapping with a 'steps' list")]
    #[diagnostic(code(stepcheck::layout))]
    Layout { path: String },

    #[error(transparent)]
    #[diagnostic(code(stepcheck::validation))]
    Validation(#[from] ValidationFailure),

    #[error(transparent)]
    #[diagnostic(code(stepcheck::schema))]
    Schema(#[from] SchemaBuildError),
}

impl ConfigError {
    /// A YAML syntax error, with a span when the parser reported a location.
    pub fn parse(path: &str, source: &str, error: &serde_yaml::Error) -> Self {
        let offset = error.location().map(|location| location.index());
        Self::syntax(path, source, error, offset)
    }

    /// A syntax error from the position-tracking loader. Its marker counts
    /// characters, so the span is converted to a byte offset.
    pub fn scan(path: &str, source: &str, error: &yaml_rust2::ScanError) -> Self {
        let chars = error.marker().index();
        let offset = source
            .char_indices()
            .nth(chars)
            .map_or(source.len(), |(offset, _)| offset);
        Self::syntax(path, source, error, Some(offset))
    }

    pub fn syntax(
        path: &str,
        source: &str,
        message: impl std::fmt::Display,
        offset: Option<usize>,
    ) -> Self {
        ConfigError::Parse {
            path: path.to_string(),
            message: message.to_string(),
            src: Arc::new(NamedSource::new(path, source.to_string())),
            span: offset.map(|offset| SourceSpan::from((offset, 0))),
        }
    }

    pub fn io(path: &str, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.to_string(),
            source,
        }
    }

    pub fn decode(path: &str, error: impl std::fmt::Display) -> Self {
        ConfigError::Decode {
            path: path.to_string(),
            message: error.to_string(),
        }
    }
}

/// The embedded schema could not be assembled or compiled.
#[derive(Error, Diagnostic, Debug)]
pub enum SchemaBuildError {
    #[error("embedded schema is not valid JSON: {0}")]
    #[diagnostic(code(stepcheck::schema::json))]
    Json(#[from] serde_json::Error),

    #[error("embedded schema is missing '{0}'")]
    #[diagnostic(code(stepcheck::schema::shape))]
    Shape(&'static str),

    #[error("embedded schema does not compile: {0}")]
    #[diagnostic(code(stepcheck::schema::compile))]
    Compile(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_has_span() {
        let source = "steps:\n  - name: [unclosed\n";
        let error = serde_yaml::from_str::<serde_yaml::Value>(source).unwrap_err();
        match ConfigError::parse("bad.yml", source, &error) {
            ConfigError::Parse { path, span, .. } => {
                assert_eq!(path, "bad.yml");
                assert!(span.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_scan_error_span_is_in_bytes() {
        let source = "- név: ü\n- [unclosed\n";
        let error = crate::document::load(source).unwrap_err();
        match ConfigError::scan("bad.yml", source, &error) {
            ConfigError::Parse { span, .. } => {
                let offset = span.unwrap().offset();
                assert!(offset <= source.len());
                assert!(source.is_char_boundary(offset));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_validation_is_transparent() {
        let failure = ValidationFailure { diagnostics: vec![] };
        let error = ConfigError::from(failure);
        assert_eq!(error.to_string(), "validation failed with no specific errors");
    }
}
