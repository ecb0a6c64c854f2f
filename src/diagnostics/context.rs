//! Contextual rendering: diagnostics grouped per file, each with the offending
//! source line and the name of the step it belongs to.

use std::fmt::Write as _;
use std::fs;

use tracing::warn;

use super::{Diagnostic, Severity};

/// How far above a diagnostic the step-name search looks.
const STEP_NAME_LOOKBACK: usize = 10;

/// Fragments identifying raw schema-validator output that carries no
/// information beyond the action-selection messages.
const SCHEMA_NOISE: &[&str] = &["doesn't validate with", "https://stepcheck.dev/schemas"];
const DEFINITIONS_PATH: &str = "/definitions/";
const ACTION_SELECTION_HINT: &str = "step must have";

/// Renders diagnostics with source context, reading each file from disk.
///
/// A file that cannot be read is rendered without context lines.
pub fn render_contextual(diagnostics: &[Diagnostic]) -> String {
    render_contextual_with(diagnostics, |path| match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(err) => {
            warn!(file = path, error = %err, "source unavailable for context");
            None
        }
    })
}

/// Renders diagnostics with source context supplied by `load`.
///
/// `load` is called at most once per distinct file.
pub fn render_contextual_with<F>(diagnostics: &[Diagnostic], mut load: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    if diagnostics.is_empty() {
        return String::new();
    }

    let shown: Vec<&Diagnostic> = diagnostics.iter().filter(|d| is_user_facing(d)).collect();

    let mut groups: Vec<(&str, Vec<&Diagnostic>)> = Vec::new();
    for diagnostic in shown.iter().copied() {
        match groups.iter_mut().find(|(file, _)| *file == diagnostic.file_path) {
            Some((_, members)) => members.push(diagnostic),
            None => groups.push((diagnostic.file_path.as_str(), vec![diagnostic])),
        }
    }

    let mut out = String::new();
    for (file, members) in groups {
        let _ = write!(out, "\nError: {file}\n\n");
        let text = load(file).unwrap_or_default();
        let lines: Vec<&str> = text.lines().collect();

        for diagnostic in members {
            let _ = writeln!(out, "  Line {}: {}", diagnostic.line, diagnostic.message);
            if let Some(source_line) = line_at(&lines, diagnostic.line) {
                let _ = writeln!(out, "    {}", source_line.trim());
                if let Some(step) = step_name_near(&lines, diagnostic.line) {
                    let _ = writeln!(out, "    (in step: {step})");
                }
            }
            out.push('\n');
        }
    }

    let warnings = shown
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();
    let errors = shown.len() - warnings;
    if errors > 0 {
        let _ = write!(out, "Found {errors} error(s)");
        if warnings > 0 {
            let _ = write!(out, " and {warnings} warning(s)");
        }
        out.push('\n');
    }

    out
}

fn is_user_facing(diagnostic: &Diagnostic) -> bool {
    let message = diagnostic.message.as_str();
    if SCHEMA_NOISE.iter().any(|noise| message.contains(noise)) {
        return false;
    }
    !(message.contains(DEFINITIONS_PATH) && !message.contains(ACTION_SELECTION_HINT))
}

fn line_at<'a>(lines: &[&'a str], line: usize) -> Option<&'a str> {
    if line == 0 {
        return None;
    }
    lines.get(line - 1).copied()
}

/// Scans upward from `line` for the enclosing step's `name:` field, stopping
/// at the previous list item.
fn step_name_near(lines: &[&str], line: usize) -> Option<String> {
    if line == 0 || line > lines.len() {
        return None;
    }
    let start = line - 1;
    let floor = start.saturating_sub(STEP_NAME_LOOKBACK);

    for index in (floor..=start).rev() {
        let text = lines[index].trim();
        let candidate = text.strip_prefix("- ").map(str::trim_start).unwrap_or(text);
        if let Some(value) = candidate.strip_prefix("name:") {
            let name = value.trim().trim_matches(|c| c == '"' || c == '\'');
            return (!name.is_empty()).then(|| name.to_string());
        }
        if index < start && text.starts_with("- ") {
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Position;

    const SOURCE: &str = "\
- name: install deps
  shell: apt-get install -y curl

- name: \"write config\"
  template:
    src: ./app.j2
    dest: /etc/app.conf
    mode: \"0999\"
";

    fn at(line: usize, message: &str) -> Diagnostic {
        Diagnostic::error("steps.yml", Position::new(line, 5), message)
    }

    fn render(diagnostics: &[Diagnostic]) -> String {
        render_contextual_with(diagnostics, |_| Some(SOURCE.to_string()))
    }

    #[test]
    fn test_empty_renders_nothing() {
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn test_golden_output() {
        let out = render(&[at(8, "Invalid file mode.")]);
        assert_eq!(
            out,
            "\nError: steps.yml\n\n  Line 8: Invalid file mode.\n    mode: \"0999\"\n    (in step: write config)\n\nFound 1 error(s)\n"
        );
    }

    #[test]
    fn test_name_on_list_item_line() {
        let out = render(&[at(2, "bad shell")]);
        assert!(out.contains("(in step: install deps)"), "{out}");
    }

    #[test]
    fn test_search_stops_at_previous_item() {
        let source = "- shell: a\n- name: first\n  shell: b\n";
        let lines: Vec<&str> = source.lines().collect();
        assert_eq!(step_name_near(&lines, 1), None);
        assert_eq!(step_name_near(&lines, 3).as_deref(), Some("first"));
    }

    #[test]
    fn test_drops_schema_noise() {
        let out = render(&[
            at(1, "doesn't validate with '/definitions/step'"),
            at(1, "jsonschema: '/0' does not validate with https://stepcheck.dev/schemas/steps.json"),
            at(1, "at '/definitions/file': something"),
            at(1, "step must have an action, see /definitions/step"),
        ]);
        assert!(!out.contains("doesn't validate with"));
        assert!(!out.contains("https://"));
        assert!(out.contains("step must have an action"));
        assert!(out.ends_with("Found 1 error(s)\n"));
    }

    #[test]
    fn test_counts_warnings() {
        let warning = Diagnostic::warning("steps.yml", Position::new(2, 3), "deprecated");
        let out = render(&[at(8, "bad"), warning]);
        assert!(out.ends_with("Found 1 error(s) and 1 warning(s)\n"));
    }

    #[test]
    fn test_missing_file_degrades() {
        let out = render_contextual_with(&[at(3, "bad")], |_| None);
        assert_eq!(out, "\nError: steps.yml\n\n  Line 3: bad\n\nFound 1 error(s)\n");
    }

    #[test]
    fn test_groups_in_first_seen_order() {
        let mut calls = Vec::new();
        let other = Diagnostic::error("b.yml", Position::new(1, 1), "x");
        let out = render_contextual_with(&[at(1, "a1"), other, at(2, "a2")], |path| {
            calls.push(path.to_string());
            None
        });
        assert_eq!(calls, vec!["steps.yml", "b.yml"]);
        let first = out.find("Error: steps.yml").unwrap();
        let second = out.find("Error: b.yml").unwrap();
        assert!(first < second);
        assert!(out.contains("Line 2: a2"));
    }
}
