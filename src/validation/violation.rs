//! Violation trees and their flattening into diagnostics.
//!
//! The schema library reports a flat list of errors. Each one is turned into
//! a [`ViolationNode`] carrying the failing keyword's location, the failing
//! value's location and a normalized raw message. `oneOf` nodes additionally
//! carry one cause per branch, so the union can be classified as a whole.

use std::borrow::Cow;

use jsonschema::error::ValidationErrorKind;
use jsonschema::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::messages::{self, format_violation};
use crate::config::ActionKind;
use crate::diagnostics::Diagnostic;
use crate::document::{push_key, LocationMap, Position};

/// One node of a violation tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViolationNode {
    /// Schema path of the failing keyword, e.g. `/items/$ref/properties/file/required`.
    pub keyword_location: String,
    /// Structural path of the failing value, e.g. `/0/file`.
    pub instance_location: String,
    pub message: String,
    pub causes: Vec<ViolationNode>,
    /// For `oneOf` nodes: how many action keys the failing value carries.
    pub action_count: Option<usize>,
}

impl ViolationNode {
    pub fn new(
        keyword_location: impl Into<String>,
        instance_location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            keyword_location: keyword_location.into(),
            instance_location: instance_location.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    /// A synthetic root with no message of its own.
    pub fn root(causes: Vec<ViolationNode>) -> Self {
        Self {
            causes,
            ..Self::default()
        }
    }

    pub fn with_causes(mut self, causes: Vec<ViolationNode>) -> Self {
        self.causes = causes;
        self
    }

    pub fn with_action_count(mut self, count: Option<usize>) -> Self {
        self.action_count = count;
        self
    }

    /// True for nodes raised by a union ("exactly one of") constraint.
    pub fn is_union(&self) -> bool {
        messages::keyword_of(&self.keyword_location) == "oneOf"
    }

    /// Every node in the tree, depth first, this one included.
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.causes.iter());
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.causes.is_empty() && self.message.is_empty()
    }
}

// ============================================================================
// NORMALIZATION
// ============================================================================

static EXPECTED_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"is not of types? "([^"]+)""#).unwrap());

/// Converts one library error into violation nodes. An `additionalProperties`
/// error yields one node per unexpected key, located at that key.
pub fn nodes_from_error(error: &ValidationError<'_>) -> Vec<ViolationNode> {
    let schema_path = error.schema_path.to_string();
    let instance_location = error.instance_path.to_string();
    let instance: &Value = &error.instance;

    let (keyword, message) = match &error.kind {
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            let keyword_location = keyword_path(&schema_path, "additionalProperties");
            return unexpected
                .iter()
                .map(|name| {
                    ViolationNode::new(
                        keyword_location.clone(),
                        push_key(&instance_location, name),
                        format!("additionalProperties '{name}' not allowed"),
                    )
                })
                .collect();
        }
        ValidationErrorKind::Required { property } => (
            "required",
            format!("missing properties: '{}'", plain(property)),
        ),
        ValidationErrorKind::Type { .. } => {
            let text = error.to_string();
            let expected = EXPECTED_TYPE
                .captures_iter(&text)
                .last()
                .and_then(|c| c.get(1))
                .map_or("a different type", |m| m.as_str())
                .to_string();
            (
                "type",
                format!("expected {expected}, but got {}", type_name(instance)),
            )
        }
        ValidationErrorKind::Enum { options } => {
            ("enum", format!("value must be one of {}", quoted_list(options)))
        }
        ValidationErrorKind::Pattern { pattern } => {
            ("pattern", format!("does not match pattern '{pattern}'"))
        }
        ValidationErrorKind::Format { format } => (
            "format",
            format!("'{}' is not valid '{format}'", plain(instance)),
        ),
        ValidationErrorKind::MinLength { limit } => (
            "minLength",
            format!("length must be >= {limit}, but got {}", text_length(instance)),
        ),
        ValidationErrorKind::MaxLength { limit } => (
            "maxLength",
            format!("length must be <= {limit}, but got {}", text_length(instance)),
        ),
        ValidationErrorKind::Minimum { limit } => {
            ("minimum", format!("must be >= {limit} but found {instance}"))
        }
        ValidationErrorKind::Maximum { limit } => {
            ("maximum", format!("must be <= {limit} but found {instance}"))
        }
        ValidationErrorKind::MinItems { limit } => (
            "minItems",
            format!("minimum {limit} items required, but found {} items", item_count(instance)),
        ),
        ValidationErrorKind::MaxItems { limit } => (
            "maxItems",
            format!("maximum {limit} items allowed, but found {} items", item_count(instance)),
        ),
        ValidationErrorKind::MinProperties { limit } => (
            "minProperties",
            format!("minimum {limit} properties required"),
        ),
        ValidationErrorKind::UniqueItems { .. } => ("uniqueItems", "items must be unique".to_string()),
        ValidationErrorKind::OneOfNotValid { .. } => ("oneOf", "oneOf failed, none matched".to_string()),
        ValidationErrorKind::OneOfMultipleValid { .. } => {
            ("oneOf", "valid against more than one oneOf subschema".to_string())
        }
        ValidationErrorKind::Not { .. } => ("not", "not failed".to_string()),
        _ => {
            let node = ViolationNode::new(schema_path, instance_location, error.to_string());
            return vec![node];
        }
    };

    vec![ViolationNode::new(
        keyword_path(&schema_path, keyword),
        instance_location,
        message,
    )]
}

/// Ensures the keyword location ends with `keyword`.
fn keyword_path(schema_path: &str, keyword: &str) -> String {
    if messages::keyword_of(schema_path) == keyword {
        schema_path.to_string()
    } else {
        format!("{schema_path}/{keyword}")
    }
}

fn plain(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(text) => Cow::Borrowed(text),
        other => Cow::Owned(other.to_string()),
    }
}

fn quoted_list(options: &Value) -> String {
    match options {
        Value::Array(items) => items
            .iter()
            .map(|item| format!("'{}'", plain(item)))
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn text_length(value: &Value) -> usize {
    value.as_str().map_or(0, |text| text.chars().count())
}

fn item_count(value: &Value) -> usize {
    value.as_array().map_or(0, Vec::len)
}

/// Action keys present on `value`, or `None` if it is not an object.
pub fn count_actions(value: &Value) -> Option<usize> {
    let object = value.as_object()?;
    Some(
        object
            .keys()
            .filter(|key| ActionKind::from_key(key).is_some())
            .count(),
    )
}

// ============================================================================
// FLATTENING
// ============================================================================

/// Flattens a violation tree into diagnostics, in depth-first order.
///
/// Union nodes produce exactly one diagnostic and their causes are never
/// reported individually. Every other node reports its formatted message,
/// when non-empty, and then its causes.
pub fn flatten(root: &ViolationNode, locations: &LocationMap, file_path: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        let position = locations.get_or(&node.instance_location, Position::new(1, 1));

        if node.is_union() {
            diagnostics.push(Diagnostic::error(file_path, position, classify_union(node)));
            continue;
        }

        let message = format_violation(
            &node.keyword_location,
            &node.message,
            &node.instance_location,
        );
        if !message.is_empty() {
            diagnostics.push(Diagnostic::error(file_path, position, message));
        }
        stack.extend(node.causes.iter().rev());
    }

    diagnostics
}

/// Picks the sentence for a failed union: no action, several actions, or
/// the generic fallback.
pub fn classify_union(node: &ViolationNode) -> String {
    match node.action_count {
        Some(0) => return messages::no_action_message(),
        Some(n) if n >= 2 => return messages::multiple_actions_message(),
        _ => {}
    }

    if node.causes.is_empty() {
        return messages::ambiguous_action_message();
    }
    let negated = |cause: &ViolationNode| cause.keyword_location.contains("/not");
    let all_missing = node
        .causes
        .iter()
        .all(|cause| cause.message.starts_with("missing properties"));

    if all_missing && !node.causes.iter().any(negated) {
        messages::no_action_message()
    } else if node.causes.iter().any(negated) {
        messages::multiple_actions_message()
    } else {
        messages::ambiguous_action_message()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{load, LocationMap};

    fn union(causes: Vec<ViolationNode>, count: Option<usize>) -> ViolationNode {
        ViolationNode::new("/items/$ref/oneOf", "/0", "oneOf failed, none matched")
            .with_causes(causes)
            .with_action_count(count)
    }

    fn required(branch: usize, name: &str) -> ViolationNode {
        ViolationNode::new(
            format!("/items/$ref/oneOf/{branch}/required"),
            "/0",
            format!("missing properties: '{name}'"),
        )
    }

    fn negation(branch: usize) -> ViolationNode {
        ViolationNode::new(format!("/items/$ref/oneOf/{branch}/not"), "/0", "not failed")
    }

    #[test]
    fn test_count_decides_first() {
        let node = union(vec![negation(0)], Some(0));
        assert_eq!(classify_union(&node), messages::no_action_message());
        let node = union(vec![required(0, "shell")], Some(3));
        assert_eq!(classify_union(&node), messages::multiple_actions_message());
    }

    #[test]
    fn test_all_missing_means_no_action() {
        let node = union(vec![required(0, "shell"), required(1, "template")], None);
        assert_eq!(classify_union(&node), messages::no_action_message());
    }

    #[test]
    fn test_any_negation_means_multiple() {
        let node = union(vec![required(1, "template"), negation(0)], None);
        assert_eq!(classify_union(&node), messages::multiple_actions_message());
    }

    #[test]
    fn test_causeless_union_is_ambiguous() {
        let node = union(vec![], Some(1));
        assert_eq!(classify_union(&node), messages::ambiguous_action_message());
        let odd = union(
            vec![ViolationNode::new("/items/$ref/oneOf/0/type", "/0", "expected object, but got string")],
            None,
        );
        assert_eq!(classify_union(&odd), messages::ambiguous_action_message());
    }

    #[test]
    fn test_flatten_union_reports_once() {
        let tree = load("- name: t\n  when: x\n").unwrap();
        let locations = LocationMap::build(&tree);
        let root = ViolationNode::root(vec![union(
            vec![required(0, "shell"), required(1, "template")],
            Some(0),
        )]);
        let diagnostics = flatten(&root, &locations, "f.yml");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, 1);
        assert_eq!(diagnostics[0].message, messages::no_action_message());
    }

    #[test]
    fn test_flatten_keeps_sibling_order() {
        let tree = load("- name: 1\n  become: maybe\n").unwrap();
        let locations = LocationMap::build(&tree);
        let root = ViolationNode::root(vec![
            ViolationNode::new(
                "/items/$ref/properties/name/type",
                "/0/name",
                "expected string, but got number",
            ),
            ViolationNode::new(
                "/items/$ref/properties/become/type",
                "/0/become",
                "expected boolean, but got string",
            ),
        ]);
        let diagnostics = flatten(&root, &locations, "f.yml");
        assert_eq!(diagnostics.len(), 2);
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (1, 3));
        assert!(diagnostics[0].message.starts_with("Expected text value, but got a number"));
        assert_eq!((diagnostics[1].line, diagnostics[1].column), (2, 3));
        assert_eq!(
            diagnostics[1].message,
            "Expected true or false (boolean), not text or number"
        );
    }

    #[test]
    fn test_unknown_location_falls_back_to_first_line() {
        let locations = LocationMap::default();
        let root = ViolationNode::root(vec![ViolationNode::new(
            "/items/$ref/required",
            "/7/nowhere",
            "missing properties: 'path'",
        )]);
        let diagnostics = flatten(&root, &locations, "f.yml");
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (1, 1));
    }

    #[test]
    fn test_empty_root_emits_nothing() {
        let locations = LocationMap::default();
        assert!(flatten(&ViolationNode::root(vec![]), &locations, "f.yml").is_empty());
    }

    #[test]
    fn test_count_actions() {
        let step = serde_json::json!({"name": "t", "shell": {"cmd": "ls"}, "file": {"path": "/x"}});
        assert_eq!(count_actions(&step), Some(2));
        assert_eq!(count_actions(&serde_json::json!("text")), None);
    }

    #[test]
    fn test_tree_len() {
        let node = union(vec![required(0, "shell"), negation(1)], None);
        assert_eq!(ViolationNode::root(vec![node]).len(), 4);
    }
}
