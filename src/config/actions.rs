//! Step actions.
//!
//! A step carries exactly one action. [`ActionKind`] names them in canonical
//! order; the structs below are the decoded shapes. Every struct keeps keys it
//! does not recognise in `unknown`, so a misspelt field survives re-encoding
//! and is reported by the schema instead of vanishing silently.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Free-form key/value data: preset parameters, template vars, `vars` steps.
pub type Vars = BTreeMap<String, serde_yaml::Value>;

/// Keys present in the source but not part of the model.
pub type UnknownFields = BTreeMap<String, serde_yaml::Value>;

// ============================================================================
// ACTION KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    Shell,
    Template,
    File,
    FileReplace,
    Copy,
    Service,
    Assert,
    Preset,
    Print,
    Include,
    IncludeVars,
    Vars,
    RepoSearch,
    RepoTree,
}

impl ActionKind {
    pub const ALL: [ActionKind; 14] = [
        ActionKind::Shell,
        ActionKind::Template,
        ActionKind::File,
        ActionKind::FileReplace,
        ActionKind::Copy,
        ActionKind::Service,
        ActionKind::Assert,
        ActionKind::Preset,
        ActionKind::Print,
        ActionKind::Include,
        ActionKind::IncludeVars,
        ActionKind::Vars,
        ActionKind::RepoSearch,
        ActionKind::RepoTree,
    ];

    /// The step key selecting this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Shell => "shell",
            ActionKind::Template => "template",
            ActionKind::File => "file",
            ActionKind::FileReplace => "file_replace",
            ActionKind::Copy => "copy",
            ActionKind::Service => "service",
            ActionKind::Assert => "assert",
            ActionKind::Preset => "preset",
            ActionKind::Print => "print",
            ActionKind::Include => "include",
            ActionKind::IncludeVars => "include_vars",
            ActionKind::Vars => "vars",
            ActionKind::RepoSearch => "repo_search",
            ActionKind::RepoTree => "repo_tree",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == key)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A borrowed view of a step's single action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action<'a> {
    Shell(&'a ShellAction),
    Template(&'a Template),
    File(&'a FileAction),
    FileReplace(&'a FileReplace),
    Copy(&'a Copy),
    Service(&'a ServiceAction),
    Assert(&'a Assert),
    Preset(&'a PresetInvocation),
    Print(&'a PrintAction),
    Include(&'a str),
    IncludeVars(&'a str),
    Vars(&'a Vars),
    RepoSearch(&'a RepoSearch),
    RepoTree(&'a RepoTree),
}

impl Action<'_> {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Shell(_) => ActionKind::Shell,
            Action::Template(_) => ActionKind::Template,
            Action::File(_) => ActionKind::File,
            Action::FileReplace(_) => ActionKind::FileReplace,
            Action::Copy(_) => ActionKind::Copy,
            Action::Service(_) => ActionKind::Service,
            Action::Assert(_) => ActionKind::Assert,
            Action::Preset(_) => ActionKind::Preset,
            Action::Print(_) => ActionKind::Print,
            Action::Include(_) => ActionKind::Include,
            Action::IncludeVars(_) => ActionKind::IncludeVars,
            Action::Vars(_) => ActionKind::Vars,
            Action::RepoSearch(_) => ActionKind::RepoSearch,
            Action::RepoTree(_) => ActionKind::RepoTree,
        }
    }
}

// ============================================================================
// STRING SHORTHAND
// ============================================================================

/// Actions that may be written as a bare string, e.g. `shell: "make"`.
pub trait FromShorthand: Sized {
    fn from_shorthand(value: String) -> Self;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Shorthand<T> {
    Bare(String),
    Full(T),
}

/// `deserialize_with` helper accepting either the bare-string form or the
/// full mapping.
pub(crate) fn shorthand<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromShorthand,
{
    let form = Option::<Shorthand<T>>::deserialize(deserializer)?;
    Ok(form.map(|form| match form {
        Shorthand::Bare(value) => T::from_shorthand(value),
        Shorthand::Full(action) => action,
    }))
}

// ============================================================================
// ACTION STRUCTS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShellAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    /// bash, sh, pwsh, or cmd.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture: Option<bool>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

impl FromShorthand for ShellAction {
    fn from_shorthand(value: String) -> Self {
        Self {
            cmd: Some(value),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub dest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vars: Option<Vars>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileAction {
    #[serde(default)]
    pub path: String,
    /// file, directory, absent, touch, link, hardlink, or perms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurse: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<bool>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

/// In-place regex replacement within one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileReplace {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub replace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_no_match: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<bool>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Copy {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub dest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceAction {
    #[serde(default)]
    pub name: String,
    /// started, stopped, restarted, or reloaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daemon_reload: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<ServiceUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropin: Option<ServiceDropin>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

/// A systemd unit file or launchd plist managed alongside the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceUnit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDropin {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_template: Option<String>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

/// Verification step: command exit code, file properties, or HTTP response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<AssertCommand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<AssertFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<AssertHttp>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssertCommand {
    #[serde(default)]
    pub cmd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i64>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssertFile {
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssertHttp {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_equals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonpath: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonpath_value: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetInvocation {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with: Option<Vars>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

impl FromShorthand for PresetInvocation {
    fn from_shorthand(value: String) -> Self {
        Self {
            name: value,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrintAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

impl FromShorthand for PrintAction {
    fn from_shorthand(value: String) -> Self {
        Self {
            msg: Some(value),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoSearch {
    #[serde(default)]
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_dirs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoTree {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_dirs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_files: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::from_key(kind.as_str()), Some(kind));
        }
        assert_eq!(ActionKind::from_key("command"), None);
    }

    #[test]
    fn test_unknown_fields_survive_encoding() {
        let file: FileAction = serde_yaml::from_str("path: /tmp/x\nperms: 644\n").unwrap();
        assert!(file.unknown.contains_key("perms"));
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["perms"], 644);
        assert_eq!(json["path"], "/tmp/x");
    }
}
