//! nestkey Codec - Schema packing and field generation
//!
//! This crate builds on the path encoder from `nestkey-format`:
//!
//! - Schema documents (`single` / `object` / `iterate` nodes with handlers)
//! - Conditions and pruning actions
//! - Data store lookups with late-bound `"%i"` placeholders
//! - The schema packer
//! - Field generation and continuation of repeaters

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod access;
pub mod condition;
pub mod context;
pub mod continuation;
pub mod error;
pub mod escape;
pub mod fields;
pub mod limits;
pub mod packer;
pub mod schema;
pub mod value;

// Re-export commonly used types
pub use nestkey_format::{
    Geometry, MaterializedPath, PathEncoder, PathError, PathKey, PathPrefix, PathStyle,
};

// Re-export our own types
pub use condition::{Action, Condition, Replacement, Severity, Subject, Test};
pub use context::PackContext;
pub use continuation::ContinuationRequest;
pub use error::{PackError, Result, SchemaError};
pub use escape::Escape;
pub use fields::{FieldDefinition, FieldGenerator, GeneratedField, RepeatCount};
pub use limits::PackLimits;
pub use packer::{pack, Packer};
pub use schema::{DataKey, DataPath, NodeKind, SchemaNode, ValueSource};
pub use value::{CastType, ValueType};

/// Parse a schema document from JSON text
pub fn parse_schema(json: &str) -> Result<SchemaNode> {
    Ok(serde_json::from_str(json)?)
}

/// Parse a field definition list from JSON text
pub fn parse_definitions(json: &str) -> Result<Vec<FieldDefinition>> {
    let definitions: Vec<FieldDefinition> = serde_json::from_str(json)?;
    fields::validate_definitions(&definitions)?;
    Ok(definitions)
}
