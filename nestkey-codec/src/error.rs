//! Error types for packing and field generation

use nestkey_format::PathError;
use thiserror::Error;

/// A schema or field-definition document is malformed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A node is missing a sub-field its type requires
    #[error("'{node_type}' node is missing required field '{field}'")]
    MissingField {
        /// Node type being built
        node_type: &'static str,
        /// Name of the missing field
        field: &'static str,
    },
    /// A node sets sub-fields that exclude each other
    #[error("'{node_type}' node sets conflicting fields: {fields}")]
    ConflictingFields {
        /// Node type being built
        node_type: &'static str,
        /// The conflicting field names
        fields: String,
    },
    /// A condition operand does not fit its operator
    #[error("Invalid operand for '{op}': {reason}")]
    InvalidOperand {
        /// Operator name
        op: &'static str,
        /// Explanation of the mismatch
        reason: String,
    },
    /// A data access path is empty or contains an unusable key
    #[error("Invalid data path: {0}")]
    InvalidDataPath(String),
    /// Field definition keys must be unique among siblings
    #[error("Duplicate field key '{0}'")]
    DuplicateKey(String),
}

/// Errors that stop a pack or generation run
#[derive(Debug, Error)]
pub enum PackError {
    /// Iteration path arithmetic failed (overflow, depth, malformed path)
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    /// Schema document is malformed
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
    /// Nested objects or concatenations went deeper than allowed
    #[error("Recursion limit exceeded: depth {depth} (max: {max_depth})")]
    RecursionLimit {
        /// Depth that was about to be entered
        depth: usize,
        /// Configured maximum
        max_depth: usize,
    },
    /// Too many values were produced in one run
    #[error("Item limit exceeded: more than {max_items} values produced")]
    ItemLimit {
        /// Configured maximum
        max_items: usize,
    },
    /// Limits configuration exceeds hard maximums
    #[error("Configuration exceeds hard limits: {0}")]
    Configuration(String),
    /// Continuation request parameters could not be parsed
    #[error("Malformed continuation request: {0}")]
    MalformedRequest(String),
    /// Continuation path does not name a repeatable field
    #[error("Continuation target not found: {path} ({reason})")]
    TargetNotFound {
        /// The continuation path
        path: String,
        /// Explanation of where resolution stopped
        reason: String,
    },
    /// JSON parsing or serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PackError>;
