//! Schema document model
//!
//! A schema is a tree of [`SchemaNode`]s. JSON documents map onto it as:
//!
//! ```json
//! {
//!   "type": "object",
//!   "fields": {
//!     "title": { "type": "single", "data": ["post", "title"], "escape": "html" },
//!     "lines": {
//!       "type": "iterate",
//!       "count": ["order", "lines"],
//!       "schema": {
//!         "type": "object",
//!         "fields": {
//!           "sku": { "type": "single", "data": ["order", "lines", "%i", "sku"] }
//!         }
//!       },
//!       "conditions": [{ "op": "is_empty", "do": "suppress_key" }]
//!     }
//!   }
//! }
//! ```
//!
//! Object fields keep their declaration order.

use crate::condition::Condition;
use crate::error::SchemaError;
use crate::escape::Escape;
use crate::value::CastType;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Data access path token bound to the current iteration index
pub const ITERATION_PLACEHOLDER: &str = "%i";

/// One key of a data access path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDataKey", into = "RawDataKey")]
pub enum DataKey {
    /// Object key
    Name(String),
    /// Sequence position
    Index(u64),
    /// Late-bound repeat index (`"%i"`)
    Iteration,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawDataKey {
    Index(u64),
    Name(String),
}

impl From<RawDataKey> for DataKey {
    fn from(raw: RawDataKey) -> Self {
        match raw {
            RawDataKey::Index(index) => DataKey::Index(index),
            RawDataKey::Name(name) if name == ITERATION_PLACEHOLDER => DataKey::Iteration,
            RawDataKey::Name(name) => DataKey::Name(name),
        }
    }
}

impl From<DataKey> for RawDataKey {
    fn from(key: DataKey) -> Self {
        match key {
            DataKey::Name(name) => RawDataKey::Name(name),
            DataKey::Index(index) => RawDataKey::Index(index),
            DataKey::Iteration => RawDataKey::Name(ITERATION_PLACEHOLDER.to_string()),
        }
    }
}

impl From<&str> for DataKey {
    fn from(name: &str) -> Self {
        DataKey::from(RawDataKey::Name(name.to_string()))
    }
}

/// Non-empty sequence of data store keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DataKey>", into = "Vec<DataKey>")]
pub struct DataPath(Vec<DataKey>);

impl DataPath {
    /// Build a path from keys; `"%i"` names become placeholders
    pub fn new<I, K>(keys: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = K>,
        K: Into<DataKey>,
    {
        Self::try_from(keys.into_iter().map(Into::into).collect::<Vec<_>>())
    }

    /// Keys of the path
    pub fn keys(&self) -> &[DataKey] {
        &self.0
    }
}

impl TryFrom<Vec<DataKey>> for DataPath {
    type Error = SchemaError;

    fn try_from(keys: Vec<DataKey>) -> Result<Self, SchemaError> {
        if keys.is_empty() {
            return Err(SchemaError::InvalidDataPath("path has no keys".to_string()));
        }
        Ok(Self(keys))
    }
}

impl From<DataPath> for Vec<DataKey> {
    fn from(path: DataPath) -> Self {
        path.0
    }
}

/// Where a `single` node's value comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSource {
    /// Fixed value
    Default(Value),
    /// Value read from the data store
    Data(DataPath),
    /// Host metadata entry from the pack context
    Meta(String),
    /// Text concatenation of nested nodes, in declared order
    Concat(Vec<SchemaNode>),
}

/// Node kinds
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Scalar read
    Single(ValueSource),
    /// Nested schema, fields in declaration order
    Object(Vec<(String, SchemaNode)>),
    /// Repeated schema; the repeat count is read from the data store
    Iterate {
        /// Path whose value yields the repeat count
        count: DataPath,
        /// Schema packed once per repetition
        schema: Box<SchemaNode>,
    },
}

/// A schema node with its handlers
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawNode")]
pub struct SchemaNode {
    /// What the node produces
    pub kind: NodeKind,
    /// Escape applied to the resolved value before conditions
    pub escape: Option<Escape>,
    /// Cast applied after conditions, to non-null values only
    pub convert: Option<CastType>,
    /// Conditions, evaluated in order
    pub conditions: Vec<Condition>,
}

impl SchemaNode {
    fn with_kind(kind: NodeKind) -> Self {
        Self {
            kind,
            escape: None,
            convert: None,
            conditions: Vec::new(),
        }
    }

    /// `single` node with a fixed value
    pub fn constant(value: Value) -> Self {
        Self::with_kind(NodeKind::Single(ValueSource::Default(value)))
    }

    /// `single` node reading the data store
    pub fn data(path: DataPath) -> Self {
        Self::with_kind(NodeKind::Single(ValueSource::Data(path)))
    }

    /// `single` node reading host metadata
    pub fn meta(name: impl Into<String>) -> Self {
        Self::with_kind(NodeKind::Single(ValueSource::Meta(name.into())))
    }

    /// `single` node concatenating nested nodes
    pub fn concat(parts: Vec<SchemaNode>) -> Self {
        Self::with_kind(NodeKind::Single(ValueSource::Concat(parts)))
    }

    /// `object` node
    pub fn object<K: Into<String>>(fields: Vec<(K, SchemaNode)>) -> Self {
        Self::with_kind(NodeKind::Object(
            fields
                .into_iter()
                .map(|(key, node)| (key.into(), node))
                .collect(),
        ))
    }

    /// `iterate` node
    pub fn iterate(count: DataPath, schema: SchemaNode) -> Self {
        Self::with_kind(NodeKind::Iterate {
            count,
            schema: Box::new(schema),
        })
    }

    /// Append a condition
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Set the escape handler
    pub fn with_escape(mut self, escape: Escape) -> Self {
        self.escape = Some(escape);
        self
    }

    /// Set the conversion handler
    pub fn with_convert(mut self, convert: CastType) -> Self {
        self.convert = Some(convert);
        self
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum NodeType {
    Single,
    Object,
    Iterate,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNode {
    #[serde(rename = "type")]
    node_type: NodeType,
    #[serde(default, deserialize_with = "present")]
    default: Option<Value>,
    #[serde(default)]
    data: Option<DataPath>,
    #[serde(default)]
    meta: Option<String>,
    #[serde(default)]
    concat: Option<Vec<SchemaNode>>,
    #[serde(default)]
    fields: Option<FieldList>,
    #[serde(default)]
    count: Option<DataPath>,
    #[serde(default)]
    schema: Option<Box<SchemaNode>>,
    #[serde(default)]
    escape: Option<Escape>,
    #[serde(default)]
    convert: Option<CastType>,
    #[serde(default)]
    conditions: Vec<Condition>,
}

impl TryFrom<RawNode> for SchemaNode {
    type Error = SchemaError;

    fn try_from(raw: RawNode) -> Result<Self, SchemaError> {
        let kind = match raw.node_type {
            NodeType::Single => {
                let mut sources = Vec::new();
                if let Some(value) = raw.default {
                    sources.push(("default", ValueSource::Default(value)));
                }
                if let Some(path) = raw.data {
                    sources.push(("data", ValueSource::Data(path)));
                }
                if let Some(name) = raw.meta {
                    sources.push(("meta", ValueSource::Meta(name)));
                }
                if let Some(parts) = raw.concat {
                    sources.push(("concat", ValueSource::Concat(parts)));
                }
                if sources.len() > 1 {
                    return Err(SchemaError::ConflictingFields {
                        node_type: "single",
                        fields: sources
                            .iter()
                            .map(|(name, _)| *name)
                            .collect::<Vec<_>>()
                            .join(", "),
                    });
                }
                match sources.pop() {
                    Some((_, source)) => NodeKind::Single(source),
                    None => {
                        return Err(SchemaError::MissingField {
                            node_type: "single",
                            field: "default | data | meta | concat",
                        })
                    }
                }
            }
            NodeType::Object => NodeKind::Object(
                raw.fields
                    .ok_or(SchemaError::MissingField {
                        node_type: "object",
                        field: "fields",
                    })?
                    .0,
            ),
            NodeType::Iterate => NodeKind::Iterate {
                count: raw.count.ok_or(SchemaError::MissingField {
                    node_type: "iterate",
                    field: "count",
                })?,
                schema: raw.schema.ok_or(SchemaError::MissingField {
                    node_type: "iterate",
                    field: "schema",
                })?,
            },
        };

        Ok(Self {
            kind,
            escape: raw.escape,
            convert: raw.convert,
            conditions: raw.conditions,
        })
    }
}

/// Keeps an explicit `null` as `Some(Value::Null)`
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Object fields in document order
struct FieldList(Vec<(String, SchemaNode)>);

impl<'de> Deserialize<'de> for FieldList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FieldListVisitor)
    }
}

struct FieldListVisitor;

impl<'de> Visitor<'de> for FieldListVisitor {
    type Value = FieldList;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of field names to schema nodes")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<FieldList, A::Error> {
        let mut fields = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, node)) = map.next_entry::<String, SchemaNode>()? {
            fields.push((key, node));
        }
        Ok(FieldList(fields))
    }
}
