//! Data store lookups
//!
//! A data store is any JSON value. Keys descend through it as follows:
//!
//! - a name on an object reads that member
//! - an index on an array reads that position; on an object it reads the
//!   member named by the decimal index
//! - a name on an array reads from the first element, matching the wire
//!   format's implicit zero index
//!
//! Anything that cannot be followed resolves to `null`.

use crate::schema::{DataKey, DataPath};
use nestkey_format::{PathEncoder, PathKey};
use serde_json::Value;
use tracing::warn;

/// Read-only view used while resolving data paths
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    store: &'a Value,
    encoder: &'a PathEncoder,
}

impl<'a> Scope<'a> {
    /// Create a scope over `store`, binding placeholders through `encoder`
    pub fn new(store: &'a Value, encoder: &'a PathEncoder) -> Self {
        Self { store, encoder }
    }

    /// Encoder whose levels bind `"%i"` placeholders
    pub fn encoder(&self) -> &'a PathEncoder {
        self.encoder
    }

    /// Resolve a data path, cloning the value it reaches
    ///
    /// The k-th placeholder binds to the repeat index of level k. A
    /// placeholder beyond the entered depth makes the path unresolvable.
    pub fn resolve(&self, path: &DataPath) -> Value {
        let mut current = self.store;
        let mut placeholder_level = 0u32;

        for key in path.keys() {
            let next = match key {
                DataKey::Name(name) => by_name(current, name),
                DataKey::Index(index) => by_index(current, *index),
                DataKey::Iteration => {
                    placeholder_level += 1;
                    match self.encoder.repeat_index(placeholder_level) {
                        Some(index) => by_index(current, index),
                        None => None,
                    }
                }
            };
            match next {
                Some(value) => current = value,
                None => return Value::Null,
            }
        }

        current.clone()
    }
}

/// Read the value addressed by an associative key sequence
pub fn lookup_keys<'v>(store: &'v Value, keys: &[PathKey]) -> Option<&'v Value> {
    keys.iter().try_fold(store, |current, key| match key {
        PathKey::Name(name) => by_name(current, name),
        PathKey::Index(index) => by_index(current, *index),
    })
}

fn by_name<'v>(value: &'v Value, name: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(name),
        Value::Array(items) => items.first().and_then(|first| by_name(first, name)),
        _ => None,
    }
}

fn by_index(value: &Value, index: u64) -> Option<&Value> {
    match value {
        Value::Array(items) => usize::try_from(index).ok().and_then(|i| items.get(i)),
        Value::Object(map) => map.get(&index.to_string()),
        _ => None,
    }
}

/// Interpret a resolved value as a repeat count
///
/// Containers count their elements; numbers and numeric strings are
/// truncated; `true` counts as one. Anything else counts as zero.
pub fn as_count(value: &Value) -> u64 {
    match value {
        Value::Null => 0,
        Value::Bool(flag) => u64::from(*flag),
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(f) if f > 0.0 && f.is_finite() => f as u64,
            Ok(_) => 0,
            Err(_) => {
                warn!(value = %s, "non-numeric repeat count treated as zero");
                0
            }
        },
        Value::Array(items) => items.len() as u64,
        Value::Object(map) => map.len() as u64,
    }
}
