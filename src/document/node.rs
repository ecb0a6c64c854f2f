//! The document tree consumed by the location mapper.

use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, ScanError};

use super::location::Position;

/// One node of a position-annotated document.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceNode {
    pub kind: NodeKind,
    pub position: Position,
}

/// Node shapes, mirroring the YAML representation graph.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Wraps the single root content node of a document.
    Document(Box<SourceNode>),
    Sequence(Vec<SourceNode>),
    /// Key/value pairs in source order. Keys are usually scalars.
    Mapping(Vec<(SourceNode, SourceNode)>),
    Scalar(String),
    /// Reference to an anchored node, by the parser's anchor id. Aliases are
    /// leaves: the anchored content is not copied here.
    Alias(usize),
}

impl SourceNode {
    pub fn new(kind: NodeKind, position: Position) -> Self {
        Self { kind, position }
    }

    pub fn scalar(value: impl Into<String>, position: Position) -> Self {
        Self::new(NodeKind::Scalar(value.into()), position)
    }

    pub fn document(root: SourceNode) -> Self {
        Self::new(NodeKind::Document(Box::new(root)), Position::new(1, 1))
    }

    /// The text of a scalar node; `None` for containers and aliases.
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Unwraps a document node to its content; other nodes return themselves.
    pub fn content(&self) -> &SourceNode {
        match &self.kind {
            NodeKind::Document(root) => root.content(),
            _ => self,
        }
    }
}

/// Parses the first document of YAML text into a tree.
///
/// Only positions are of interest here, so any top-level shape is accepted,
/// anchors and aliases included; whether that shape is a valid configuration
/// is decided elsewhere.
pub fn load(source: &str) -> Result<SourceNode, ScanError> {
    let mut builder = TreeBuilder::default();
    Parser::new_from_str(source).load(&mut builder, false)?;
    let root = builder
        .root
        .unwrap_or_else(|| SourceNode::scalar("", Position::UNKNOWN));
    Ok(SourceNode::document(root))
}

// ============================================================================
// EVENT RECEIVER
// ============================================================================

/// An open container while its children are still arriving.
enum Frame {
    Sequence {
        position: Position,
        items: Vec<SourceNode>,
    },
    Mapping {
        position: Position,
        pairs: Vec<(SourceNode, SourceNode)>,
        key: Option<SourceNode>,
    },
}

impl Frame {
    fn finish(self) -> SourceNode {
        match self {
            Frame::Sequence { position, items } => {
                SourceNode::new(NodeKind::Sequence(items), position)
            }
            // A mapping starts where its first key does.
            Frame::Mapping {
                position, pairs, ..
            } => {
                let position = pairs
                    .first()
                    .map(|(key, _)| key.position)
                    .filter(Position::is_known)
                    .unwrap_or(position);
                SourceNode::new(NodeKind::Mapping(pairs), position)
            }
        }
    }
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Frame>,
    root: Option<SourceNode>,
}

impl TreeBuilder {
    fn attach(&mut self, node: SourceNode) {
        match self.stack.last_mut() {
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
            Some(Frame::Sequence { items, .. }) => items.push(node),
            Some(Frame::Mapping { pairs, key, .. }) => match key.take() {
                Some(name) => pairs.push((name, node)),
                None => *key = Some(node),
            },
        }
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, event: Event, mark: Marker) {
        // Marker columns are 0-based.
        let position = Position::new(mark.line(), mark.col() + 1);
        match event {
            Event::Scalar(value, ..) => self.attach(SourceNode::scalar(value, position)),
            Event::Alias(anchor) => {
                self.attach(SourceNode::new(NodeKind::Alias(anchor), position))
            }
            Event::SequenceStart(..) => self.stack.push(Frame::Sequence {
                position,
                items: Vec::new(),
            }),
            Event::MappingStart(..) => self.stack.push(Frame::Mapping {
                position,
                pairs: Vec::new(),
                key: None,
            }),
            Event::SequenceEnd | Event::MappingEnd => {
                if let Some(frame) = self.stack.pop() {
                    let node = frame.finish();
                    self.attach(node);
                }
            }
            _ => {}
        }
    }
}
