//! Reading configuration files: decode, map positions, validate.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use super::{ParsedConfig, Step, StructuredRoot, Vars};
use crate::diagnostics::{has_errors, Diagnostic, ValidationFailure};
use crate::document::{self, LocationMap, Position};
use crate::errors::ConfigError;
use crate::validation::{template, SchemaValidator};

/// Reads and validates configuration files against one compiled schema.
#[derive(Debug, Clone, Copy)]
pub struct ConfigReader<'s> {
    schema: &'s SchemaValidator,
}

impl<'s> ConfigReader<'s> {
    pub fn new(schema: &'s SchemaValidator) -> Self {
        Self { schema }
    }

    /// Reads `path` and returns the decoded model with every diagnostic,
    /// schema violations first, then template syntax problems.
    pub fn read_config_with_validation(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<(ParsedConfig, Vec<Diagnostic>), ConfigError> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let source = fs::read_to_string(path).map_err(|e| ConfigError::io(&name, e))?;
        self.validate_source(&source, &name)
    }

    /// Like [`read_config_with_validation`](Self::read_config_with_validation),
    /// but blocking diagnostics become a [`ConfigError::Validation`].
    pub fn read_config(&self, path: impl AsRef<Path>) -> Result<ParsedConfig, ConfigError> {
        let (config, diagnostics) = self.read_config_with_validation(path)?;
        if has_errors(&diagnostics) {
            return Err(ValidationFailure { diagnostics }.into());
        }
        Ok(config)
    }

    /// Validates in-memory YAML text. `file_name` is used in diagnostics only.
    pub fn validate_source(
        &self,
        source: &str,
        file_name: &str,
    ) -> Result<(ParsedConfig, Vec<Diagnostic>), ConfigError> {
        let Some(config) = decode(source, file_name)? else {
            debug!(file = file_name, "empty document");
            return Ok((ParsedConfig::default(), Vec::new()));
        };

        let tree = document::load(source).map_err(|e| ConfigError::scan(file_name, source, &e))?;
        let locations = LocationMap::build(&tree);

        let mut diagnostics = self.schema.validate(&config, &locations, file_name);
        diagnostics.extend(template::validate_config(&config, &locations, file_name));

        debug!(
            file = file_name,
            steps = config.steps.len(),
            diagnostics = diagnostics.len(),
            "validated"
        );
        Ok((config, diagnostics))
    }
}

/// Decodes the typed model, or `None` for an empty document.
fn decode(source: &str, file_name: &str) -> Result<Option<ParsedConfig>, ConfigError> {
    if source.trim().is_empty() {
        return Ok(None);
    }
    let value: serde_yaml::Value =
        serde_yaml::from_str(source).map_err(|e| ConfigError::parse(file_name, source, &e))?;

    let config = match value {
        serde_yaml::Value::Null => return Ok(None),
        serde_yaml::Value::Sequence(_) => {
            let steps: Vec<Step> =
                serde_yaml::from_value(value).map_err(|e| ConfigError::decode(file_name, e))?;
            ParsedConfig::from_steps(steps)
        }
        serde_yaml::Value::Mapping(_) => {
            let root: StructuredRoot =
                serde_yaml::from_value(value).map_err(|e| ConfigError::decode(file_name, e))?;
            ParsedConfig::from(root)
        }
        _ => {
            return Err(ConfigError::Layout {
                path: file_name.to_string(),
            })
        }
    };
    Ok(Some(config))
}

// ============================================================================
// CONVENIENCE ENTRY POINTS
// ============================================================================

/// Reads and validates `path` with a freshly compiled schema.
///
/// If the embedded schema cannot be compiled the configuration is still
/// returned, with a single warning in place of validation results.
pub fn read_config_with_validation(
    path: impl AsRef<Path>,
) -> Result<(ParsedConfig, Vec<Diagnostic>), ConfigError> {
    let path = path.as_ref();
    match SchemaValidator::new() {
        Ok(schema) => ConfigReader::new(&schema).read_config_with_validation(path),
        Err(err) => {
            warn!(error = %err, "schema unavailable, skipping validation");
            let name = path.display().to_string();
            let source = fs::read_to_string(path).map_err(|e| ConfigError::io(&name, e))?;
            let config = decode(&source, &name)?.unwrap_or_default();
            let notice = Diagnostic::warning(
                name,
                Position::new(1, 1),
                format!("schema validator initialization failed: {err}"),
            );
            Ok((config, vec![notice]))
        }
    }
}

/// Reads `path`, failing on any blocking diagnostic.
pub fn read_config(path: impl AsRef<Path>) -> Result<ParsedConfig, ConfigError> {
    let schema = SchemaValidator::new()?;
    ConfigReader::new(&schema).read_config(path)
}

/// Reads a YAML mapping of variables. An empty path yields no variables.
pub fn read_variables(path: impl AsRef<Path>) -> Result<Vars, ConfigError> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Ok(Vars::new());
    }
    let name = path.display().to_string();
    let source = fs::read_to_string(path).map_err(|e| ConfigError::io(&name, e))?;
    if source.trim().is_empty() {
        return Ok(Vars::new());
    }
    let vars: Option<Vars> =
        serde_yaml::from_str(&source).map_err(|e| ConfigError::parse(&name, &source, &e))?;
    Ok(vars.unwrap_or_default())
}
