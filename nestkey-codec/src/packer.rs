//! Schema packer
//!
//! Walks a [`SchemaNode`] tree depth-first against a read-only data store and
//! produces one JSON value. Every node resolves its raw value, runs its
//! escape handler, then its conditions in order, then its conversion (for
//! non-null values). `iterate` nodes drive a [`PathEncoder`] so that `"%i"`
//! placeholders in data paths see the current repeat indices.

use crate::access::{as_count, Scope};
use crate::condition::{evaluate, Evaluation, Severity};
use crate::context::PackContext;
use crate::error::{PackError, Result};
use crate::schema::{DataPath, NodeKind, SchemaNode, ValueSource};
use crate::value::{cast, to_text};
use nestkey_format::{PathEncoder, PathError};
use serde_json::{Map, Value};
use tracing::{debug, trace};

/// Level name used when the schema root is itself an `iterate` node
pub const ROOT_LEVEL_NAME: &str = "root";

/// Pack `schema` against `store`
pub fn pack(schema: &SchemaNode, store: &Value, context: &PackContext) -> Result<Value> {
    Packer::new(store, context)?.pack(schema)
}

/// Why a traversal stopped early
enum Halt {
    /// An `abort` action fired; the whole pack yields `null`
    Abort,
    Error(PackError),
}

impl From<PackError> for Halt {
    fn from(err: PackError) -> Self {
        Halt::Error(err)
    }
}

impl From<PathError> for Halt {
    fn from(err: PathError) -> Self {
        Halt::Error(PackError::Path(err))
    }
}

type Step<T> = std::result::Result<T, Halt>;

/// One packing run; owns its encoder
pub struct Packer<'a> {
    store: &'a Value,
    context: &'a PackContext,
    encoder: PathEncoder,
    depth: usize,
    items: usize,
}

impl<'a> Packer<'a> {
    /// Create a packer; fails when the context limits are out of range
    pub fn new(store: &'a Value, context: &'a PackContext) -> Result<Self> {
        context.limits.validate()?;
        Ok(Self {
            store,
            context,
            encoder: Self::fresh_encoder(context),
            depth: 0,
            items: 0,
        })
    }

    fn fresh_encoder(context: &PackContext) -> PathEncoder {
        PathEncoder::new(context.geometry, context.prefix.clone())
    }

    /// Pack the schema root
    ///
    /// A pruning action on the root itself, or an `abort` anywhere below it,
    /// yields `null`.
    pub fn pack(&mut self, schema: &SchemaNode) -> Result<Value> {
        debug!(
            architecture = self.context.geometry.architecture(),
            levels = self.context.geometry.levels(),
            "packing schema"
        );
        self.encoder = Self::fresh_encoder(self.context);
        self.depth = 0;
        self.items = 0;

        match self.evaluate_node(schema, ROOT_LEVEL_NAME) {
            Ok(Evaluation { value, severity }) => {
                debug!(items = self.items, pruned = severity.is_some(), "pack finished");
                Ok(match severity {
                    Some(_) => Value::Null,
                    None => value,
                })
            }
            Err(Halt::Abort) => {
                debug!(items = self.items, "pack aborted");
                Ok(Value::Null)
            }
            Err(Halt::Error(err)) => Err(err),
        }
    }

    /// Number of values produced so far
    pub fn items(&self) -> usize {
        self.items
    }

    fn evaluate_node(&mut self, node: &SchemaNode, key: &str) -> Step<Evaluation> {
        let raw = self.resolve(node, key)?;
        let escaped = match node.escape {
            Some(escape) => escape.apply(raw),
            None => raw,
        };

        let mut evaluation = evaluate(
            &node.conditions,
            escaped,
            &Scope::new(self.store, &self.encoder),
        );
        if let Some(target) = node.convert {
            if !evaluation.value.is_null() {
                evaluation.value = cast(&evaluation.value, target);
            }
        }
        Ok(evaluation)
    }

    fn resolve(&mut self, node: &SchemaNode, key: &str) -> Step<Value> {
        match &node.kind {
            NodeKind::Single(source) => self.resolve_source(source, key),
            NodeKind::Object(fields) => self.pack_object(fields),
            NodeKind::Iterate { count, schema } => self.pack_iterate(key, count, schema),
        }
    }

    fn resolve_source(&mut self, source: &ValueSource, key: &str) -> Step<Value> {
        match source {
            ValueSource::Default(value) => Ok(value.clone()),
            ValueSource::Data(path) => Ok(Scope::new(self.store, &self.encoder).resolve(path)),
            ValueSource::Meta(name) => Ok(self.context.meta(name)),
            ValueSource::Concat(parts) => {
                self.descend()?;
                let mut text = String::new();
                for part in parts {
                    let Evaluation { value, severity } = self.evaluate_node(part, key)?;
                    match severity {
                        Some(Severity::Abort) => return Err(Halt::Abort),
                        Some(Severity::SuppressSiblings) => break,
                        Some(Severity::SuppressKey) => continue,
                        None => text.push_str(&to_text(&value)),
                    }
                }
                self.ascend();
                Ok(Value::String(text))
            }
        }
    }

    fn pack_object(&mut self, fields: &[(String, SchemaNode)]) -> Step<Value> {
        self.descend()?;
        let mut out = Map::new();

        for (key, child) in fields {
            let Evaluation { value, severity } = self.evaluate_node(child, key)?;
            match severity {
                Some(Severity::Abort) => {
                    trace!(key = %key, "abort");
                    return Err(Halt::Abort);
                }
                Some(Severity::SuppressSiblings) => {
                    trace!(key = %key, "suppress siblings");
                    break;
                }
                Some(Severity::SuppressKey) => {
                    trace!(key = %key, "suppress key");
                }
                None => {
                    self.count_item()?;
                    out.insert(key.clone(), value);
                }
            }
        }

        self.ascend();
        Ok(Value::Object(out))
    }

    fn pack_iterate(&mut self, key: &str, count: &DataPath, schema: &SchemaNode) -> Step<Value> {
        let repetitions = as_count(&Scope::new(self.store, &self.encoder).resolve(count));
        trace!(key = %key, repetitions, "iterate");
        self.context
            .geometry
            .check_repetitions(self.encoder.current_level() + 1, u128::from(repetitions))?;

        self.encoder.enter_level(key)?;
        let mut items = Vec::new();
        for repetition in 0..repetitions {
            if repetition > 0 {
                self.encoder.iterate(0)?;
            }
            self.count_item()?;
            let Evaluation { value, severity } = self.evaluate_node(schema, key)?;
            match severity {
                Some(Severity::Abort) => return Err(Halt::Abort),
                Some(_) => {}
                None if value.is_null() => {}
                None => items.push(value),
            }
        }
        self.encoder.leave_level()?;

        Ok(if items.is_empty() {
            Value::Null
        } else {
            Value::Array(items)
        })
    }

    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.context.limits.max_depth {
            return Err(PackError::RecursionLimit {
                depth: self.depth,
                max_depth: self.context.limits.max_depth,
            });
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    fn count_item(&mut self) -> Result<()> {
        self.items += 1;
        if self.items > self.context.limits.max_items {
            return Err(PackError::ItemLimit {
                max_items: self.context.limits.max_items,
            });
        }
        Ok(())
    }
}
