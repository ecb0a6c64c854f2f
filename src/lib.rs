//! Source-mapped validation for YAML provisioning step files.
//!
//! A file is decoded into the typed [`config`] model, re-parsed into a
//! position-annotated [`document`] tree, and checked by the structural schema
//! and the template syntax checker in [`validation`]. Every problem comes
//! back as a [`Diagnostic`] carrying the exact line and column in the file.

pub use crate::config::{read_config, read_config_with_validation, ConfigReader, ParsedConfig};
pub use crate::diagnostics::{Diagnostic, Severity};
pub use crate::errors::ConfigError;
pub use crate::validation::SchemaValidator;

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod errors;
pub mod template;
pub mod validation;
