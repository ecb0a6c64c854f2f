//! The decoded configuration model.
//!
//! Two document layouts are accepted:
//!
//! ```yaml
//! # step list
//! - name: greet
//!   shell: echo hello
//! ```
//!
//! ```yaml
//! # structured
//! version: "1"
//! vars:
//!   user: ops
//! steps:
//!   - name: greet
//!     shell: echo {{ user }}
//! ```

use serde::{Deserialize, Deserializer, Serialize};

pub mod actions;
pub mod reader;
pub mod step;

pub use actions::{
    Action, ActionKind, Assert, AssertCommand, AssertFile, AssertHttp, Copy, FileAction,
    FileReplace, PresetInvocation, PrintAction, RepoSearch, RepoTree, ServiceAction,
    ServiceDropin, ServiceUnit, ShellAction, Template, UnknownFields, Vars,
};
pub use reader::{read_config, read_config_with_validation, read_variables, ConfigReader};
pub use step::{ActionCountError, Step};

/// Which top-level shape a document used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DocumentLayout {
    #[default]
    StepList,
    Structured,
}

impl DocumentLayout {
    pub const ALL: [DocumentLayout; 2] = [DocumentLayout::StepList, DocumentLayout::Structured];

    /// Structural path of the step sequence.
    pub fn steps_pointer(&self) -> &'static str {
        match self {
            DocumentLayout::StepList => "",
            DocumentLayout::Structured => "/steps",
        }
    }
}

/// A decoded configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedConfig {
    pub version: String,
    pub vars: Vars,
    pub steps: Vec<Step>,
    pub layout: DocumentLayout,
    /// Unrecognised top-level keys of a structured document.
    pub unknown: UnknownFields,
}

impl ParsedConfig {
    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Re-encodes the model as a generic JSON value in its source layout, so
    /// that instance paths line up with source paths.
    pub fn to_instance(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self.layout {
            DocumentLayout::StepList => serde_json::to_value(&self.steps),
            DocumentLayout::Structured => serde_json::to_value(StructuredRef {
                version: (!self.version.is_empty()).then_some(self.version.as_str()),
                vars: (!self.vars.is_empty()).then_some(&self.vars),
                steps: &self.steps,
                unknown: &self.unknown,
            }),
        }
    }
}

/// Wire shape of a structured document.
#[derive(Debug, Deserialize)]
pub(crate) struct StructuredRoot {
    #[serde(default, deserialize_with = "scalar_text")]
    pub version: Option<String>,
    #[serde(default)]
    pub vars: Option<Vars>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

impl From<StructuredRoot> for ParsedConfig {
    fn from(root: StructuredRoot) -> Self {
        Self {
            version: root.version.unwrap_or_default(),
            vars: root.vars.unwrap_or_default(),
            steps: root.steps,
            layout: DocumentLayout::Structured,
            unknown: root.unknown,
        }
    }
}

#[derive(Serialize)]
struct StructuredRef<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vars: Option<&'a Vars>,
    steps: &'a [Step],
    #[serde(flatten)]
    unknown: &'a UnknownFields,
}

/// Accepts `version: 1`, `version: 1.0` and `version: "1.0"` alike.
fn scalar_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    use serde::de::Error;

    match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(text)) => Ok(Some(text)),
        Some(serde_yaml::Value::Number(number)) => Ok(Some(number.to_string())),
        Some(serde_yaml::Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(_) => Err(D::Error::custom("version must be a scalar")),
    }
}
