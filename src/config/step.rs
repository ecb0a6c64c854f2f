//! The step record and its action accessors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::actions::{
    shorthand, Action, ActionKind, Assert, Copy, FileAction, FileReplace, PresetInvocation,
    PrintAction, RepoSearch, RepoTree, ServiceAction, ShellAction, Template, UnknownFields, Vars,
};

/// One unit of work: universal fields plus exactly one action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    /// Skip the step when this path exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creates: Option<String>,
    /// Skip the step when this command succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unless: Option<String>,

    // Actions
    #[serde(default, deserialize_with = "shorthand", skip_serializing_if = "Option::is_none")]
    pub shell: Option<ShellAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<Template>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_replace: Option<FileReplace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy: Option<Copy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assert: Option<Assert>,
    #[serde(default, deserialize_with = "shorthand", skip_serializing_if = "Option::is_none")]
    pub preset: Option<PresetInvocation>,
    #[serde(default, deserialize_with = "shorthand", skip_serializing_if = "Option::is_none")]
    pub print: Option<PrintAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_vars: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vars: Option<Vars>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_search: Option<RepoSearch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_tree: Option<RepoTree>,

    // Privilege escalation
    #[serde(rename = "become", default, skip_serializing_if = "Option::is_none")]
    pub r#become: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub become_user: Option<String>,

    // Environment
    /// Values stay untyped so non-string values reach the schema.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    // Execution control
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<String>,

    // Result overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_when: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_when: Option<String>,

    // Loops
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_filetree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_items: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register: Option<String>,

    #[serde(flatten)]
    pub unknown: UnknownFields,
}

/// A step did not carry exactly one action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionCountError {
    #[error("step has no action")]
    None,
    #[error("step has more than one action: {}", list(.0))]
    Multiple(Vec<ActionKind>),
}

fn list(kinds: &[ActionKind]) -> String {
    kinds
        .iter()
        .map(ActionKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Step {
    /// Every action present on this step, in canonical order.
    pub fn action_kinds(&self) -> Vec<ActionKind> {
        ActionKind::ALL
            .into_iter()
            .filter(|kind| self.has_action(*kind))
            .collect()
    }

    pub fn has_action(&self, kind: ActionKind) -> bool {
        match kind {
            ActionKind::Shell => self.shell.is_some(),
            ActionKind::Template => self.template.is_some(),
            ActionKind::File => self.file.is_some(),
            ActionKind::FileReplace => self.file_replace.is_some(),
            ActionKind::Copy => self.copy.is_some(),
            ActionKind::Service => self.service.is_some(),
            ActionKind::Assert => self.assert.is_some(),
            ActionKind::Preset => self.preset.is_some(),
            ActionKind::Print => self.print.is_some(),
            ActionKind::Include => self.include.is_some(),
            ActionKind::IncludeVars => self.include_vars.is_some(),
            ActionKind::Vars => self.vars.is_some(),
            ActionKind::RepoSearch => self.repo_search.is_some(),
            ActionKind::RepoTree => self.repo_tree.is_some(),
        }
    }

    /// The step's single action.
    pub fn action(&self) -> Result<Action<'_>, ActionCountError> {
        let kinds = self.action_kinds();
        match kinds.as_slice() {
            [] => Err(ActionCountError::None),
            [only] => self.borrow_action(*only).ok_or(ActionCountError::None),
            _ => Err(ActionCountError::Multiple(kinds)),
        }
    }

    fn borrow_action(&self, kind: ActionKind) -> Option<Action<'_>> {
        let action = match kind {
            ActionKind::Shell => Action::Shell(self.shell.as_ref()?),
            ActionKind::Template => Action::Template(self.template.as_ref()?),
            ActionKind::File => Action::File(self.file.as_ref()?),
            ActionKind::FileReplace => Action::FileReplace(self.file_replace.as_ref()?),
            ActionKind::Copy => Action::Copy(self.copy.as_ref()?),
            ActionKind::Service => Action::Service(self.service.as_ref()?),
            ActionKind::Assert => Action::Assert(self.assert.as_ref()?),
            ActionKind::Preset => Action::Preset(self.preset.as_ref()?),
            ActionKind::Print => Action::Print(self.print.as_ref()?),
            ActionKind::Include => Action::Include(self.include.as_deref()?),
            ActionKind::IncludeVars => Action::IncludeVars(self.include_vars.as_deref()?),
            ActionKind::Vars => Action::Vars(self.vars.as_ref()?),
            ActionKind::RepoSearch => Action::RepoSearch(self.repo_search.as_ref()?),
            ActionKind::RepoTree => Action::RepoTree(self.repo_tree.as_ref()?),
        };
        Some(action)
    }

    /// Display name, falling back to the action kind.
    pub fn display_name(&self) -> String {
        match (&self.name, self.action_kinds().first()) {
            (Some(name), _) => name.clone(),
            (None, Some(kind)) => kind.to_string(),
            (None, None) => "unnamed step".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(yaml: &str) -> Step {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_shell_shorthand() {
        let s = step("name: t\nshell: echo 1\n");
        assert_eq!(s.shell.as_ref().and_then(|sh| sh.cmd.as_deref()), Some("echo 1"));
        let full = step("shell:\n  cmd: echo 1\n  interpreter: sh\n");
        assert_eq!(full.shell.as_ref().and_then(|sh| sh.interpreter.as_deref()), Some("sh"));
    }

    #[test]
    fn test_become_keeps_its_key() {
        let s = step("shell: ls\nbecome: true\nbecome_user: root\n");
        assert_eq!(s.r#become, Some(true));
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["become"], true);
        assert_eq!(json["become_user"], "root");
        assert!(s.unknown.is_empty());
    }

    #[test]
    fn test_shorthand_encodes_as_mapping() {
        let s = step("shell: ls\n");
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["shell"]["cmd"], "ls");
    }

    #[test]
    fn test_print_and_preset_shorthand() {
        let s = step("print: hello\n");
        assert_eq!(s.print.and_then(|p| p.msg).as_deref(), Some("hello"));
        let p = step("preset: ollama\n");
        assert_eq!(p.preset.map(|p| p.name).as_deref(), Some("ollama"));
    }

    #[test]
    fn test_single_action() {
        let s = step("name: t\nfile:\n  path: /tmp/x\n");
        let action = s.action().unwrap();
        assert_eq!(action.kind(), ActionKind::File);
        assert!(matches!(action, Action::File(file) if file.path == "/tmp/x"));
    }

    #[test]
    fn test_no_action() {
        let s = step("name: t\nwhen: os == 'linux'\n");
        assert_eq!(s.action(), Err(ActionCountError::None));
    }

    #[test]
    fn test_multiple_actions() {
        let s = step("shell: echo 1\nfile:\n  path: /tmp/x\n");
        assert_eq!(
            s.action(),
            Err(ActionCountError::Multiple(vec![ActionKind::Shell, ActionKind::File]))
        );
        assert_eq!(
            ActionCountError::Multiple(vec![ActionKind::Shell, ActionKind::File]).to_string(),
            "step has more than one action: shell, file"
        );
    }

    #[test]
    fn test_unknown_step_field_is_kept() {
        let s = step("name: t\ncmd: ls\n");
        assert!(s.unknown.contains_key("cmd"));
    }
}
