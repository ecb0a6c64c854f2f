//! Template syntax checks over every templated step field.

use std::borrow::Cow;

use crate::config::{ParsedConfig, Step};
use crate::diagnostics::Diagnostic;
use crate::document::{push_index, push_key, LocationMap, Position};
use crate::template::{check_syntax, error_cause};

/// One string field that is rendered at execution time.
#[derive(Debug)]
struct TemplatedField<'a> {
    name: Cow<'static, str>,
    value: &'a str,
    path: String,
    /// Where to point when `path` was not recorded, e.g. a shorthand
    /// `shell: cmd` has no `/shell/cmd` node in the source.
    fallback: Option<String>,
}

impl<'a> TemplatedField<'a> {
    fn new(name: &'static str, value: &'a str, path: String) -> Self {
        Self {
            name: Cow::Borrowed(name),
            value,
            path,
            fallback: None,
        }
    }

    fn position(&self, locations: &LocationMap) -> Position {
        let fallback = self
            .fallback
            .as_deref()
            .map_or(Position::new(1, 1), |path| {
                locations.get_or(path, Position::new(1, 1))
            });
        locations.get_or(&self.path, fallback)
    }
}

/// Checks every templated field of every step.
pub fn validate_config(
    config: &ParsedConfig,
    locations: &LocationMap,
    file_path: &str,
) -> Vec<Diagnostic> {
    validate_steps(&config.steps, config.layout.steps_pointer(), locations, file_path)
}

/// Checks `steps`, whose sequence lives at `steps_pointer`.
pub fn validate_steps(
    steps: &[Step],
    steps_pointer: &str,
    locations: &LocationMap,
    file_path: &str,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for (index, step) in steps.iter().enumerate() {
        let step_path = push_index(steps_pointer, index);
        for field in templated_fields(step, &step_path) {
            if field.value.is_empty() {
                continue;
            }
            if let Err(err) = check_syntax(field.value) {
                diagnostics.push(Diagnostic::error(
                    file_path,
                    field.position(locations),
                    format!(
                        "Invalid template syntax in {}: {}",
                        field.name,
                        error_cause(&err)
                    ),
                ));
            }
        }
    }
    diagnostics
}

fn templated_fields<'a>(step: &'a Step, step_path: &str) -> Vec<TemplatedField<'a>> {
    let at = |key: &str| push_key(step_path, key);
    let mut fields = Vec::new();

    let universal = [
        ("when", &step.when),
        ("changed_when", &step.changed_when),
        ("failed_when", &step.failed_when),
        ("cwd", &step.cwd),
        ("timeout", &step.timeout),
        ("retry_delay", &step.retry_delay),
        ("become_user", &step.become_user),
        ("creates", &step.creates),
        ("unless", &step.unless),
    ];
    for (name, value) in universal {
        if let Some(value) = value {
            fields.push(TemplatedField::new(name, value, at(name)));
        }
    }

    if let Some(cmd) = step.shell.as_ref().and_then(|shell| shell.cmd.as_deref()) {
        fields.push(TemplatedField {
            fallback: Some(at("shell")),
            ..TemplatedField::new("shell", cmd, push_key(&at("shell"), "cmd"))
        });
    }

    let optional = [
        ("with_items", &step.with_items),
        ("with_filetree", &step.with_filetree),
        ("include", &step.include),
        ("include_vars", &step.include_vars),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            fields.push(TemplatedField::new(name, value, at(name)));
        }
    }

    let env = at("env");
    for (key, value) in &step.env {
        if let Some(value) = value.as_str() {
            fields.push(TemplatedField {
                name: Cow::Owned(format!("env.{key}")),
                value,
                path: push_key(&env, key),
                fallback: Some(env.clone()),
            });
        }
    }

    if let Some(template) = &step.template {
        let base = at("template");
        fields.push(TemplatedField::new("template.src", &template.src, push_key(&base, "src")));
        fields.push(TemplatedField::new("template.dest", &template.dest, push_key(&base, "dest")));
    }

    if let Some(file) = &step.file {
        let base = at("file");
        fields.push(TemplatedField::new("file.path", &file.path, push_key(&base, "path")));
        if let Some(content) = &file.content {
            fields.push(TemplatedField::new("file.content", content, push_key(&base, "content")));
        }
    }

    if let Some(msg) = step.print.as_ref().and_then(|print| print.msg.as_deref()) {
        fields.push(TemplatedField {
            fallback: Some(at("print")),
            ..TemplatedField::new("print", msg, push_key(&at("print"), "msg"))
        });
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::load;

    fn check(source: &str) -> Vec<Diagnostic> {
        let steps: Vec<Step> = serde_yaml::from_str(source).unwrap();
        let locations = LocationMap::build(&load(source).unwrap());
        validate_steps(&steps, "", &locations, "steps.yml")
    }

    #[test]
    fn test_valid_fields() {
        let diagnostics = check(
            "- name: ok\n  when: os == 'linux'\n  shell: echo {{ user }}\n  env:\n    HOME: \"{{ home }}\"\n",
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn test_shorthand_shell_points_at_key() {
        let diagnostics = check("- name: t\n  shell: \"{{unclosed\"\n");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .message
            .starts_with("Invalid template syntax in shell: "));
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (2, 3));
    }

    #[test]
    fn test_mapping_shell_points_at_cmd() {
        let diagnostics = check("- shell:\n    cmd: \"{{variable}\"\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (2, 5));
    }

    #[test]
    fn test_env_field_name() {
        let diagnostics = check("- shell: ls\n  env:\n    PATH: \"{{broken syntax\"\n    N: 3\n");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .message
            .starts_with("Invalid template syntax in env.PATH: "));
        assert_eq!(diagnostics[0].line, 3);
    }

    #[test]
    fn test_action_fields() {
        let diagnostics = check(
            "- template:\n    src: \"{{ a\"\n    dest: /etc/x\n- file:\n    path: /tmp/x\n    content: \"{% if a %}\"\n",
        );
        let messages: Vec<_> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages.len(), 2, "{messages:?}");
        assert!(messages[0].starts_with("Invalid template syntax in template.src: "));
        assert_eq!(
            messages[1],
            "Invalid template syntax in file.content: 'if' tag is never closed"
        );
        assert_eq!(diagnostics[1].line, 6);
    }

    #[test]
    fn test_structured_paths() {
        let source = "steps:\n  - when: \"{{ x\"\n    shell: ls\n";
        let config: crate::config::StructuredRoot = serde_yaml::from_str(source).unwrap();
        let config = ParsedConfig::from(config);
        let locations = LocationMap::build(&load(source).unwrap());
        let diagnostics = validate_config(&config, &locations, "s.yml");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (2, 5));
    }
}
