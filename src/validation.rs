//! Validation of decoded configuration.
//!
//! Two independent passes produce diagnostics: the structural schema
//! ([`schema`]) and template markup syntax ([`template`]). Raw schema
//! violations are turned into readable sentences by [`messages`].

pub mod messages;
pub mod schema;
pub mod template;
pub mod violation;

pub use messages::format_violation;
pub use schema::SchemaValidator;
pub use violation::{flatten, ViolationNode};
