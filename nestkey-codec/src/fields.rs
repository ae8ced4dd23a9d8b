//! Field generation
//!
//! [`FieldGenerator`] walks a tree of [`FieldDefinition`]s and emits one
//! [`GeneratedField`] per input, named by the encoder's bracketed path. Each
//! sibling list occupies one encoder level; repeaters advance their level
//! once per repetition, so a field three levels down inside the third
//! repetition of `b` is named `NS[a][b][2][c]`.
//!
//! [`FieldGenerator::resume`] continues a repeater from a field name emitted
//! by an earlier run.

use crate::access::{as_count, lookup_keys};
use crate::context::PackContext;
use crate::continuation::ContinuationRequest;
use crate::error::{PackError, Result, SchemaError};
use nestkey_format::sanitize::{sanitize_key, sanitize_name};
use nestkey_format::{PathEncoder, PathKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, trace};

/// How many times a repeater renders its fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatCount {
    /// Fixed number of repetitions
    Fixed(u64),
    /// Read from a sibling field's stored value
    Selector {
        /// Key of the sibling holding the count
        key: String,
        /// Count used when the sibling has no stored value
        #[serde(default = "default_fallback")]
        fallback: u64,
    },
}

fn default_fallback() -> u64 {
    1
}

impl Default for RepeatCount {
    fn default() -> Self {
        RepeatCount::Fixed(1)
    }
}

/// A node of the field definition tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldDefinition {
    /// Leaf field
    Input {
        /// Field key
        key: String,
        /// Value used when the store has none
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<Value>,
    },
    /// Nested fields rendered once
    Group {
        /// Field key
        key: String,
        /// Nested definitions
        fields: Vec<FieldDefinition>,
    },
    /// Nested fields rendered `count` times
    Repeater {
        /// Field key
        key: String,
        /// Nested definitions
        fields: Vec<FieldDefinition>,
        /// Repetition count
        #[serde(default)]
        count: RepeatCount,
    },
}

impl FieldDefinition {
    /// Input without a default
    pub fn input(key: impl Into<String>) -> Self {
        FieldDefinition::Input {
            key: key.into(),
            default: None,
        }
    }

    /// Input with a default value
    pub fn input_with_default(key: impl Into<String>, default: impl Into<Value>) -> Self {
        FieldDefinition::Input {
            key: key.into(),
            default: Some(default.into()),
        }
    }

    /// Group of nested fields
    pub fn group(key: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        FieldDefinition::Group {
            key: key.into(),
            fields,
        }
    }

    /// Repeater of nested fields
    pub fn repeater(key: impl Into<String>, fields: Vec<FieldDefinition>, count: RepeatCount) -> Self {
        FieldDefinition::Repeater {
            key: key.into(),
            fields,
            count,
        }
    }

    /// Declared key
    pub fn key(&self) -> &str {
        match self {
            FieldDefinition::Input { key, .. }
            | FieldDefinition::Group { key, .. }
            | FieldDefinition::Repeater { key, .. } => key,
        }
    }

    fn children(&self) -> &[FieldDefinition] {
        match self {
            FieldDefinition::Input { .. } => &[],
            FieldDefinition::Group { fields, .. } | FieldDefinition::Repeater { fields, .. } => {
                fields
            }
        }
    }
}

/// One emitted input field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedField {
    /// Bracketed wire name
    pub name: String,
    /// Associative key sequence
    pub keys: Vec<PathKey>,
    /// Number of entered levels
    pub depth: u32,
    /// Raw iteration state word
    pub state: u64,
    /// Stored value, or the input's default
    pub value: Value,
}

/// Generates fields for one definition tree and data store
pub struct FieldGenerator<'a> {
    definitions: &'a [FieldDefinition],
    store: &'a Value,
    context: &'a PackContext,
}

impl<'a> FieldGenerator<'a> {
    /// Validate the definitions and context limits
    pub fn new(
        definitions: &'a [FieldDefinition],
        store: &'a Value,
        context: &'a PackContext,
    ) -> Result<Self> {
        context.limits.validate()?;
        validate_definitions(definitions)?;
        Ok(Self {
            definitions,
            store,
            context,
        })
    }

    /// Emit every field of the tree in declaration order
    pub fn generate(&self) -> Result<Vec<GeneratedField>> {
        let mut encoder = PathEncoder::new(self.context.geometry, self.context.prefix.clone());
        let mut out = Vec::new();
        self.walk_list(&mut encoder, self.definitions, &mut out)?;
        debug!(fields = out.len(), "generated fields");
        Ok(out)
    }

    /// Emit further repetitions of the repeater enclosing `request.caller_path`
    ///
    /// The innermost repeater along the path is continued at repeat index
    /// `previous_count` for `additional_count` repetitions.
    pub fn resume(&self, request: &ContinuationRequest) -> Result<Vec<GeneratedField>> {
        let path = request.caller_path.as_str();
        let mut encoder = PathEncoder::parse_continuation(
            self.context.geometry,
            path,
            self.context.prefix.depth(),
        )?;
        if encoder.prefix() != &self.context.prefix {
            return Err(target_not_found(
                path,
                format!(
                    "prefix {:?} does not match {:?}",
                    encoder.prefix().segments(),
                    self.context.prefix.segments()
                ),
            ));
        }

        let (level, fields) = self.locate_repeater(encoder.names(), path)?;
        while encoder.current_level() > level {
            encoder.leave_level()?;
        }
        if request.additional_count > 0 {
            self.context.geometry.check_repetitions(
                level,
                u128::from(request.previous_count) + u128::from(request.additional_count),
            )?;
        }
        encoder.seek_repetition(request.previous_count)?;
        debug!(
            path,
            level,
            previous = request.previous_count,
            additional = request.additional_count,
            "resuming repeater"
        );

        let mut out = Vec::new();
        if fields.is_empty() {
            return Ok(out);
        }
        for repetition in 0..request.additional_count {
            if repetition > 0 {
                encoder.iterate(0)?;
            }
            self.walk_list(&mut encoder, fields, &mut out)?;
        }
        Ok(out)
    }

    fn locate_repeater(&self, names: &[String], path: &str) -> Result<(u32, &'a [FieldDefinition])> {
        let mut list = self.definitions;
        let mut found = None;

        for (depth, name) in names.iter().enumerate() {
            let definition = list
                .iter()
                .find(|definition| sanitize_key(definition.key()) == *name)
                .ok_or_else(|| {
                    target_not_found(path, format!("no field '{}' at level {}", name, depth + 1))
                })?;
            if let FieldDefinition::Repeater { fields, .. } = definition {
                found = Some((depth as u32 + 1, fields.as_slice()));
            }
            list = definition.children();
        }

        found.ok_or_else(|| target_not_found(path, "path crosses no repeater".to_string()))
    }

    fn walk_list(
        &self,
        encoder: &mut PathEncoder,
        definitions: &[FieldDefinition],
        out: &mut Vec<GeneratedField>,
    ) -> Result<()> {
        let Some(first) = definitions.first() else {
            return Ok(());
        };

        encoder.enter_level(first.key())?;
        for definition in definitions {
            encoder.reset_current_level_iteration()?;
            encoder.set_level_name(definition.key())?;
            self.walk_field(encoder, definition, out)?;
        }
        encoder.leave_level()?;
        Ok(())
    }

    fn walk_field(
        &self,
        encoder: &mut PathEncoder,
        definition: &FieldDefinition,
        out: &mut Vec<GeneratedField>,
    ) -> Result<()> {
        match definition {
            FieldDefinition::Input { default, .. } => self.emit(encoder, default.as_ref(), out),
            FieldDefinition::Group { fields, .. } => self.walk_list(encoder, fields, out),
            FieldDefinition::Repeater { fields, count, .. } => {
                let repetitions = self.repeat_count(encoder, count);
                trace!(key = definition.key(), repetitions, "repeater");
                self.context
                    .geometry
                    .check_repetitions(encoder.current_level(), u128::from(repetitions))?;
                if fields.is_empty() {
                    return Ok(());
                }
                for repetition in 0..repetitions {
                    if repetition > 0 {
                        encoder.iterate(0)?;
                    }
                    self.walk_list(encoder, fields, out)?;
                }
                Ok(())
            }
        }
    }

    fn repeat_count(&self, encoder: &PathEncoder, count: &RepeatCount) -> u64 {
        match count {
            RepeatCount::Fixed(n) => *n,
            RepeatCount::Selector { key, fallback } => {
                let mut keys = encoder.to_keys();
                keys.pop();
                keys.push(PathKey::Name(sanitize_key(key)));
                match lookup_keys(self.store, &keys) {
                    None | Some(Value::Null) => *fallback,
                    Some(value) => as_count(value),
                }
            }
        }
    }

    fn emit(
        &self,
        encoder: &PathEncoder,
        default: Option<&Value>,
        out: &mut Vec<GeneratedField>,
    ) -> Result<()> {
        if out.len() >= self.context.limits.max_items {
            return Err(PackError::ItemLimit {
                max_items: self.context.limits.max_items,
            });
        }

        let keys = encoder.to_keys();
        let value = match lookup_keys(self.store, &keys) {
            None | Some(Value::Null) => default.cloned().unwrap_or(Value::Null),
            Some(value) => value.clone(),
        };
        out.push(GeneratedField {
            name: encoder.to_bracketed(),
            keys,
            depth: encoder.current_level(),
            state: encoder.state().raw(),
            value,
        });
        Ok(())
    }
}

fn target_not_found(path: &str, reason: String) -> PackError {
    PackError::TargetNotFound {
        path: path.to_string(),
        reason,
    }
}

/// Check that every key is a usable level name and unique among its siblings
pub fn validate_definitions(definitions: &[FieldDefinition]) -> Result<()> {
    let mut seen = HashSet::with_capacity(definitions.len());
    for definition in definitions {
        let name = sanitize_name(definition.key())?;
        if !seen.insert(name) {
            return Err(SchemaError::DuplicateKey(definition.key().to_string()).into());
        }
        validate_definitions(definition.children())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nestkey_format::{Geometry, PathError, PathPrefix};
    use serde_json::json;

    fn context() -> PackContext {
        PackContext::new(Geometry::default()).with_prefix(PathPrefix::new("NS").unwrap())
    }

    fn names(fields: &[GeneratedField]) -> Vec<&str> {
        fields.iter().map(|field| field.name.as_str()).collect()
    }

    #[test]
    fn names_follow_levels_and_repetitions() {
        let definitions = vec![FieldDefinition::group(
            "a",
            vec![FieldDefinition::repeater(
                "b",
                vec![FieldDefinition::input("c"), FieldDefinition::input("d")],
                RepeatCount::Fixed(3),
            )],
        )];
        let store = json!({});
        let ctx = context();
        let fields = FieldGenerator::new(&definitions, &store, &ctx)
            .unwrap()
            .generate()
            .unwrap();

        assert_eq!(
            names(&fields),
            vec![
                "NS[a][b][c]",
                "NS[a][b][d]",
                "NS[a][b][1][c]",
                "NS[a][b][1][d]",
                "NS[a][b][2][c]",
                "NS[a][b][2][d]",
            ]
        );
        assert!(fields.iter().all(|field| field.depth == 3));
        assert_eq!(
            fields[4].keys,
            vec![
                PathKey::from("a"),
                PathKey::from("b"),
                PathKey::Index(2),
                PathKey::from("c"),
            ]
        );
    }

    #[test]
    fn siblings_restart_their_level() {
        let definitions = vec![
            FieldDefinition::repeater("x", vec![FieldDefinition::input("v")], RepeatCount::Fixed(2)),
            FieldDefinition::input("y"),
        ];
        let store = json!({});
        let ctx = PackContext::default();
        let fields = FieldGenerator::new(&definitions, &store, &ctx)
            .unwrap()
            .generate()
            .unwrap();
        assert_eq!(names(&fields), vec!["x[v]", "x[1][v]", "y"]);
    }

    #[test]
    fn values_come_from_store_or_default() {
        let definitions = vec![FieldDefinition::repeater(
            "rows",
            vec![FieldDefinition::input_with_default("qty", 1)],
            RepeatCount::Fixed(3),
        )];
        let store = json!({"rows": {"qty": 5, "2": {"qty": 9}}});
        let ctx = PackContext::default();
        let fields = FieldGenerator::new(&definitions, &store, &ctx)
            .unwrap()
            .generate()
            .unwrap();
        let values: Vec<&Value> = fields.iter().map(|field| &field.value).collect();
        assert_eq!(values, vec![&json!(5), &json!(1), &json!(9)]);
    }

    #[test]
    fn selector_sets_repeat_count() {
        let definitions = vec![FieldDefinition::group(
            "order",
            vec![
                FieldDefinition::input("line_count"),
                FieldDefinition::repeater(
                    "lines",
                    vec![FieldDefinition::input("sku")],
                    RepeatCount::Selector {
                        key: "line_count".to_string(),
                        fallback: 1,
                    },
                ),
            ],
        )];
        let ctx = PackContext::default();

        let store = json!({"order": {"line_count": "3"}});
        let fields = FieldGenerator::new(&definitions, &store, &ctx)
            .unwrap()
            .generate()
            .unwrap();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[3].name, "order[lines][2][sku]");

        let empty = json!({});
        let fields = FieldGenerator::new(&definitions, &empty, &ctx)
            .unwrap()
            .generate()
            .unwrap();
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn resume_matches_single_pass() {
        let definitions = vec![FieldDefinition::group(
            "a",
            vec![FieldDefinition::repeater(
                "b",
                vec![FieldDefinition::input("c"), FieldDefinition::input("d")],
                RepeatCount::Fixed(60),
            )],
        )];
        let store = json!({});
        let ctx = context();
        let generator = FieldGenerator::new(&definitions, &store, &ctx).unwrap();

        let full = generator.generate().unwrap();
        let request = ContinuationRequest::new("NS[a][b][49][c]")
            .with_previous(50)
            .with_additional(10);
        let resumed = generator.resume(&request).unwrap();

        assert_eq!(resumed.len(), 20);
        assert_eq!(resumed.as_slice(), &full[100..]);
        assert_eq!(resumed[0].name, "NS[a][b][50][c]");
    }

    #[test]
    fn resume_without_additional_is_empty() {
        let definitions = vec![FieldDefinition::repeater(
            "b",
            vec![FieldDefinition::input("c")],
            RepeatCount::Fixed(1),
        )];
        let store = json!({});
        let ctx = context();
        let generator = FieldGenerator::new(&definitions, &store, &ctx).unwrap();
        assert!(generator
            .resume(&ContinuationRequest::new("NS[b][c]"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn resume_rejects_unknown_targets() {
        let definitions = vec![FieldDefinition::group("a", vec![FieldDefinition::input("c")])];
        let store = json!({});
        let ctx = context();
        let generator = FieldGenerator::new(&definitions, &store, &ctx).unwrap();

        for path in ["NS[a][c]", "NS[z][c]", "OTHER[a][c]"] {
            let request = ContinuationRequest::new(path).with_additional(1);
            assert!(matches!(
                generator.resume(&request),
                Err(PackError::TargetNotFound { .. })
            ));
        }

        let request = ContinuationRequest::new("NS[a][[c]").with_additional(1);
        assert!(matches!(
            generator.resume(&request),
            Err(PackError::Path(PathError::MalformedPath { .. }))
        ));
    }

    #[test]
    fn resume_past_capacity_overflows() {
        let definitions = vec![FieldDefinition::repeater(
            "b",
            vec![FieldDefinition::input("c")],
            RepeatCount::Fixed(1),
        )];
        let store = json!({});
        let ctx = PackContext::new(Geometry::new(32, 5).unwrap());
        let generator = FieldGenerator::new(&definitions, &store, &ctx).unwrap();

        let request = ContinuationRequest::new("b[c]")
            .with_previous(62)
            .with_additional(1);
        assert_eq!(generator.resume(&request).unwrap()[0].name, "b[62][c]");

        let request = ContinuationRequest::new("b[c]")
            .with_previous(62)
            .with_additional(2);
        assert!(matches!(
            generator.resume(&request),
            Err(PackError::Path(PathError::Overflow { .. }))
        ));
    }

    #[test]
    fn huge_repeat_counts_fail_before_walking() {
        let definitions = vec![FieldDefinition::repeater(
            "rows",
            vec![FieldDefinition::input("v")],
            RepeatCount::Fixed(1 << 32),
        )];
        let store = json!({});
        let ctx = PackContext::new(Geometry::new(64, 2).unwrap());
        let generator = FieldGenerator::new(&definitions, &store, &ctx).unwrap();
        assert!(matches!(
            generator.generate(),
            Err(PackError::Path(PathError::Overflow {
                level: 1,
                requested: 4_294_967_296,
                ..
            }))
        ));

        let request = ContinuationRequest::new("rows[v]")
            .with_previous(1)
            .with_additional(u64::MAX);
        assert!(matches!(
            generator.resume(&request),
            Err(PackError::Path(PathError::Overflow { level: 1, .. }))
        ));
    }

    #[test]
    fn empty_repeater_emits_nothing() {
        let definitions = vec![
            FieldDefinition::repeater("rows", Vec::new(), RepeatCount::Fixed(u64::MAX)),
            FieldDefinition::input("after"),
        ];
        let store = json!({});
        let ctx = PackContext::new(Geometry::new(64, 1).unwrap());
        let fields = FieldGenerator::new(&definitions, &store, &ctx)
            .unwrap()
            .generate()
            .unwrap();
        assert_eq!(names(&fields), vec!["after"]);
    }

    #[test]
    fn rejects_duplicate_and_numeric_keys() {
        let store = json!({});
        let ctx = PackContext::default();

        let duplicate = vec![FieldDefinition::input("a"), FieldDefinition::input("a!")];
        assert!(matches!(
            FieldGenerator::new(&duplicate, &store, &ctx),
            Err(PackError::Schema(SchemaError::DuplicateKey(_)))
        ));

        let numeric = vec![FieldDefinition::group("g", vec![FieldDefinition::input("12")])];
        assert!(matches!(
            FieldGenerator::new(&numeric, &store, &ctx),
            Err(PackError::Path(PathError::InvalidName(_)))
        ));
    }

    #[test]
    fn item_limit_enforced() {
        let definitions = vec![FieldDefinition::repeater(
            "r",
            vec![FieldDefinition::input("v")],
            RepeatCount::Fixed(10),
        )];
        let store = json!({});
        let ctx = PackContext::default().with_limits(crate::limits::PackLimits {
            max_items: 4,
            ..Default::default()
        });
        let err = FieldGenerator::new(&definitions, &store, &ctx)
            .unwrap()
            .generate()
            .unwrap_err();
        assert!(matches!(err, PackError::ItemLimit { max_items: 4 }));
    }

    #[test]
    fn deserializes_definitions() {
        let definitions: Vec<FieldDefinition> = serde_json::from_value(json!([
            { "type": "input", "key": "title", "default": "untitled" },
            {
                "type": "repeater",
                "key": "rows",
                "count": { "selector": { "key": "title" } },
                "fields": [{ "type": "input", "key": "cell" }]
            },
            { "type": "group", "key": "meta", "fields": [] }
        ]))
        .unwrap();

        assert_eq!(
            definitions[0],
            FieldDefinition::input_with_default("title", "untitled")
        );
        assert_eq!(
            definitions[1],
            FieldDefinition::repeater(
                "rows",
                vec![FieldDefinition::input("cell")],
                RepeatCount::Selector {
                    key: "title".to_string(),
                    fallback: 1,
                }
            )
        );
        assert_eq!(definitions[2], FieldDefinition::group("meta", vec![]));
    }
}
