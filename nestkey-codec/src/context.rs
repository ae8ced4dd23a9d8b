//! Request-scoped settings shared by the packer and field generator

use crate::limits::PackLimits;
use nestkey_format::{Geometry, PathPrefix};
use serde_json::{Map, Value};

/// Settings and host metadata for one run
#[derive(Debug, Clone, Default)]
pub struct PackContext {
    /// Iteration state geometry
    pub geometry: Geometry,
    /// Prefix written ahead of generated field names
    pub prefix: PathPrefix,
    /// Traversal bounds
    pub limits: PackLimits,
    /// Values readable by `meta` nodes
    pub metadata: Map<String, Value>,
}

impl PackContext {
    /// Context with default limits and no metadata
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            ..Self::default()
        }
    }

    /// Replace the field name prefix
    pub fn with_prefix(mut self, prefix: PathPrefix) -> Self {
        self.prefix = prefix;
        self
    }

    /// Replace the traversal limits
    pub fn with_limits(mut self, limits: PackLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Add one metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Metadata entry, `null` when absent
    pub fn meta(&self, key: &str) -> Value {
        self.metadata.get(key).cloned().unwrap_or(Value::Null)
    }
}
