//! Position-annotated view of a YAML source document.
//!
//! The typed model produced by `serde_yaml` forgets where things came from.
//! This module keeps a second, untyped tree in which every node carries the
//! 1-based line and column it started at, and turns that tree into a
//! [`LocationMap`] keyed by structural path.

pub mod location;
pub mod node;

pub use location::{escape_segment, push_index, push_key, unescape_segment, LocationMap, Position};
pub use node::{load, NodeKind, SourceNode};
