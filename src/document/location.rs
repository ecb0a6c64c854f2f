//! Structural path to source position table.
//!
//! Paths are JSON-Pointer-like: `/` separated, sequence indices in decimal,
//! mapping keys escaped per RFC 6901 (`~` becomes `~0`, `/` becomes `~1`).
//! The empty string addresses the document root.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::node::{NodeKind, SourceNode};

// ============================================================================
// POSITION
// ============================================================================

/// A 1-based source coordinate. `(0, 0)` means "unknown".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const UNKNOWN: Position = Position { line: 0, column: 0 };

    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub fn is_known(&self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// ============================================================================
// LOCATION MAP
// ============================================================================

/// Immutable path -> position table for one source document.
#[derive(Debug, Clone, Default)]
pub struct LocationMap {
    positions: HashMap<String, Position>,
}

impl LocationMap {
    /// Walks a document tree and records a position for every reachable path.
    ///
    /// Every container records its own start position. For a mapping entry the
    /// key's position is recorded at the entry path and takes precedence over
    /// the value's own start, since the key is where a reader looks for it.
    pub fn build(root: &SourceNode) -> Self {
        let mut positions = HashMap::new();
        let mut pending: Vec<(&SourceNode, String)> = vec![(root, String::new())];

        while let Some((node, path)) = pending.pop() {
            match &node.kind {
                NodeKind::Document(content) => pending.push((content, path)),
                NodeKind::Sequence(items) => {
                    record(&mut positions, &path, start_of(node));
                    // Reverse so items are visited in source order.
                    for (index, item) in items.iter().enumerate().rev() {
                        pending.push((item, push_index(&path, index)));
                    }
                }
                NodeKind::Mapping(pairs) => {
                    record(&mut positions, &path, start_of(node));
                    for (key, value) in pairs.iter().rev() {
                        let Some(name) = key.as_str() else {
                            continue;
                        };
                        let child = push_key(&path, name);
                        if key.position.is_known() {
                            positions.insert(child.clone(), key.position);
                        }
                        pending.push((value, child));
                    }
                }
                NodeKind::Scalar(_) | NodeKind::Alias(_) => {
                    record(&mut positions, &path, node.position);
                }
            }
        }

        Self { positions }
    }

    /// The position recorded at `path`, or [`Position::UNKNOWN`].
    pub fn get(&self, path: &str) -> Position {
        self.positions.get(path).copied().unwrap_or_default()
    }

    /// The position recorded at `path`, or `fallback` when none was recorded.
    pub fn get_or(&self, path: &str, fallback: Position) -> Position {
        self.positions.get(path).copied().unwrap_or(fallback)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.positions.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

fn record(positions: &mut HashMap<String, Position>, path: &str, position: Position) {
    if position.is_known() {
        positions.entry(path.to_string()).or_insert(position);
    }
}

/// A container's start, falling back to its first entry when the loader
/// reported none.
fn start_of(node: &SourceNode) -> Position {
    if node.position.is_known() {
        return node.position;
    }
    match &node.kind {
        NodeKind::Mapping(pairs) => pairs
            .first()
            .map(|(key, _)| key.position)
            .unwrap_or_default(),
        NodeKind::Sequence(items) => items.first().map(start_of).unwrap_or_default(),
        _ => node.position,
    }
}

// ============================================================================
// PATH SEGMENTS
// ============================================================================

/// Escapes one path segment: `~` -> `~0`, `/` -> `~1`.
pub fn escape_segment(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for ch in segment.chars() {
        match ch {
            '~' => escaped.push_str("~0"),
            '/' => escaped.push_str("~1"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Inverse of [`escape_segment`]. Decoding is a single left-to-right pass so
/// that `~01` yields `~1` rather than `/`.
pub fn unescape_segment(segment: &str) -> String {
    let mut unescaped = String::with_capacity(segment.len());
    let mut chars = segment.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '~' {
            unescaped.push(ch);
            continue;
        }
        match chars.peek() {
            Some('0') => {
                chars.next();
                unescaped.push('~');
            }
            Some('1') => {
                chars.next();
                unescaped.push('/');
            }
            _ => unescaped.push('~'),
        }
    }
    unescaped
}

pub fn push_index(parent: &str, index: usize) -> String {
    format!("{parent}/{index}")
}

pub fn push_key(parent: &str, key: &str) -> String {
    format!("{parent}/{}", escape_segment(key))
}
