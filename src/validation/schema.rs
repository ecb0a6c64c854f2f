//! The compiled structural schema.
//!
//! The schema document is embedded at build time. The "exactly one action"
//! rule is not written out by hand: it is generated from [`ActionKind::ALL`]
//! and injected into the step definition when the validator is built, so the
//! schema and the model can never disagree about which keys are actions.

use std::fmt;

use jsonschema::{Draft, Validator};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::violation::{self, count_actions, nodes_from_error, ViolationNode};
use crate::config::{ActionKind, DocumentLayout, ParsedConfig};
use crate::diagnostics::Diagnostic;
use crate::document::{LocationMap, Position};
use crate::errors::SchemaBuildError;

const EMBEDDED_SCHEMA: &str = include_str!("steps.schema.json");

/// A compiled, read-only schema. Safe to share across threads.
pub struct SchemaValidator {
    document: Value,
    step_list: Validator,
    structured: Validator,
    /// One standalone validator per action branch of the union, in
    /// [`ActionKind::ALL`] order. Used to explain why a union failed.
    branches: Vec<Validator>,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("id", &self.document.get("$id"))
            .field("branches", &self.branches.len())
            .finish_non_exhaustive()
    }
}

impl SchemaValidator {
    /// Compiles the embedded schema.
    pub fn new() -> Result<Self, SchemaBuildError> {
        let document: Value = serde_json::from_str(EMBEDDED_SCHEMA)?;
        Self::from_document(document)
    }

    /// Compiles a schema document with the same `definitions` layout as the
    /// embedded one.
    pub fn from_document(mut document: Value) -> Result<Self, SchemaBuildError> {
        for required in ["/definitions/stepList", "/definitions/structured"] {
            if document.pointer(required).is_none() {
                return Err(SchemaBuildError::Shape(required));
            }
        }
        let step = document
            .pointer_mut("/definitions/step")
            .and_then(Value::as_object_mut)
            .ok_or(SchemaBuildError::Shape("/definitions/step"))?;
        let branches = action_branches();
        step.insert("oneOf".to_string(), Value::Array(branches.clone()));

        let root = document
            .as_object_mut()
            .ok_or(SchemaBuildError::Shape("root object"))?;
        root.insert(
            "oneOf".to_string(),
            json!([
                { "$ref": "#/definitions/stepList" },
                { "$ref": "#/definitions/structured" }
            ]),
        );

        let step_list = compile(&entry_schema(&document, "stepList"))?;
        let structured = compile(&entry_schema(&document, "structured"))?;
        let branches = branches
            .iter()
            .map(compile)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(branches = branches.len(), "schema compiled");
        Ok(Self {
            document,
            step_list,
            structured,
            branches,
        })
    }

    /// The assembled schema, union constraint included.
    pub fn schema_document(&self) -> &Value {
        &self.document
    }

    /// Validates a decoded configuration and returns diagnostics positioned
    /// through `locations`, in traversal order.
    pub fn validate(
        &self,
        config: &ParsedConfig,
        locations: &LocationMap,
        file_path: &str,
    ) -> Vec<Diagnostic> {
        let instance = match config.to_instance() {
            Ok(instance) => instance,
            Err(err) => {
                warn!(file = file_path, error = %err, "cannot encode configuration");
                return vec![Diagnostic::error(
                    file_path,
                    Position::new(1, 1),
                    format!("failed to encode configuration for validation: {err}"),
                )];
            }
        };
        let tree = self.violations(&instance, config.layout);
        violation::flatten(&tree, locations, file_path)
    }

    /// Raw violation tree for an already encoded instance.
    pub fn violations(&self, instance: &Value, layout: DocumentLayout) -> ViolationNode {
        let validator = match layout {
            DocumentLayout::StepList => &self.step_list,
            DocumentLayout::Structured => &self.structured,
        };

        let mut nodes = Vec::new();
        for error in validator.iter_errors(instance) {
            let failing: &Value = &error.instance;
            for node in nodes_from_error(&error) {
                if node.is_union() {
                    let causes = self.branch_causes(&node, failing);
                    nodes.push(
                        node.with_causes(causes)
                            .with_action_count(count_actions(failing)),
                    );
                } else {
                    nodes.push(node);
                }
            }
        }
        ViolationNode::root(nodes)
    }

    /// Why each action branch rejected `value`, located under the union.
    fn branch_causes(&self, union: &ViolationNode, value: &Value) -> Vec<ViolationNode> {
        let mut causes = Vec::new();
        for (index, branch) in self.branches.iter().enumerate() {
            for error in branch.iter_errors(value) {
                for mut cause in nodes_from_error(&error) {
                    cause.keyword_location =
                        format!("{}/{index}{}", union.keyword_location, cause.keyword_location);
                    cause.instance_location = union.instance_location.clone();
                    causes.push(cause);
                }
            }
        }
        causes
    }
}

/// One branch per action: the action's key is present and no other is.
fn action_branches() -> Vec<Value> {
    ActionKind::ALL
        .iter()
        .map(|kind| {
            let others: Vec<Value> = ActionKind::ALL
                .iter()
                .filter(|other| *other != kind)
                .map(|other| json!({ "required": [other.as_str()] }))
                .collect();
            json!({
                "required": [kind.as_str()],
                "not": { "anyOf": others }
            })
        })
        .collect()
}

/// The full document with its root replaced by a single layout.
fn entry_schema(document: &Value, definition: &str) -> Value {
    let mut entry = document.clone();
    if let Some(root) = entry.as_object_mut() {
        root.remove("oneOf");
        root.insert(
            "allOf".to_string(),
            json!([{ "$ref": format!("#/definitions/{definition}") }]),
        );
    }
    entry
}

fn compile(schema: &Value) -> Result<Validator, SchemaBuildError> {
    let mut options = jsonschema::options();
    options.with_draft(Draft::Draft7);
    options.should_validate_formats(true);
    options
        .build(schema)
        .map_err(|e| SchemaBuildError::Compile(e.to_string()))
}
