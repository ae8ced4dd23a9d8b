//! Conditions attached to schema nodes
//!
//! A condition tests a subject (the node's value, or a data store value) and
//! runs an action when the test passes. Value actions rewrite the node's
//! value for the conditions that follow; pruning actions record a severity
//! that the enclosing object applies after all conditions have run.

use crate::access::Scope;
use crate::error::SchemaError;
use crate::schema::DataPath;
use crate::value::{
    cast, element_count, first_element, is_empty, loose_eq, loose_gt, round, strict_eq, CastType,
    ValueType,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;

/// What a condition tests
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    /// The node's value as produced so far
    #[default]
    Value,
    /// A value read from the data store
    Data(DataPath),
}

/// Comparison run against the subject
#[derive(Debug, Clone, PartialEq)]
pub enum Test {
    /// Loose, type-coercing equality
    Equals(Value),
    /// Negated loose equality
    NotEquals(Value),
    /// Same type and value
    StrictEquals(Value),
    /// Negated strict equality
    StrictNotEquals(Value),
    /// Loose numeric or text ordering
    GreaterThan(Value),
    /// Null, false, zero, `""`, `"0"` or an empty container
    IsEmpty,
    /// Element count equals the operand
    CountEquals(usize),
    /// Element count exceeds the operand
    CountGreaterThan(usize),
    /// Value has the given type
    TypeIs(ValueType),
    /// Value does not have the given type
    TypeIsNot(ValueType),
}

impl Test {
    /// Run the test against `subject`
    pub fn matches(&self, subject: &Value) -> bool {
        match self {
            Test::Equals(operand) => loose_eq(subject, operand),
            Test::NotEquals(operand) => !loose_eq(subject, operand),
            Test::StrictEquals(operand) => strict_eq(subject, operand),
            Test::StrictNotEquals(operand) => !strict_eq(subject, operand),
            Test::GreaterThan(operand) => loose_gt(subject, operand),
            Test::IsEmpty => is_empty(subject),
            Test::CountEquals(n) => element_count(subject) == *n,
            Test::CountGreaterThan(n) => element_count(subject) > *n,
            Test::TypeIs(ty) => ty.matches(subject),
            Test::TypeIsNot(ty) => !ty.matches(subject),
        }
    }
}

/// Value substituted by a `replace` action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Replacement {
    /// A fixed value
    Value(Value),
    /// Zero-based repeat index of the innermost entered level
    CurrentIteration,
    /// Number of entered levels
    CurrentLevel,
}

/// Action run when a condition's test passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Omit this key from the enclosing object
    SuppressKey,
    /// Omit this key and every later sibling
    SuppressSiblings,
    /// Stop packing; the whole pack yields `null`
    Abort,
    /// Substitute the value
    Replace(Replacement),
    /// Keep only the first element of a container
    TakeFirst,
    /// Round a number to the given decimal places
    Round(u32),
    /// Cast the value
    Convert(CastType),
}

/// Pruning effect of a condition, ordered from mildest to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Omit the key
    SuppressKey,
    /// Omit the key and later siblings
    SuppressSiblings,
    /// Abandon the whole pack
    Abort,
}

impl Action {
    /// Severity of a pruning action, `None` for value actions
    pub fn severity(&self) -> Option<Severity> {
        match self {
            Action::SuppressKey => Some(Severity::SuppressKey),
            Action::SuppressSiblings => Some(Severity::SuppressSiblings),
            Action::Abort => Some(Severity::Abort),
            _ => None,
        }
    }
}

/// One condition of a schema node
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawCondition")]
pub struct Condition {
    /// What is tested
    pub subject: Subject,
    /// The test
    pub test: Test,
    /// What happens when the test passes
    pub action: Action,
}

impl Condition {
    /// Condition on the node's own value
    pub fn on_value(test: Test, action: Action) -> Self {
        Self {
            subject: Subject::Value,
            test,
            action,
        }
    }

    /// Condition on a data store value
    pub fn on_data(path: DataPath, test: Test, action: Action) -> Self {
        Self {
            subject: Subject::Data(path),
            test,
            action,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Operator {
    Equals,
    NotEquals,
    StrictEquals,
    StrictNotEquals,
    GreaterThan,
    IsEmpty,
    CountEquals,
    CountGreaterThan,
    TypeIs,
    TypeIsNot,
}

impl Operator {
    fn name(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::StrictEquals => "strict_equals",
            Operator::StrictNotEquals => "strict_not_equals",
            Operator::GreaterThan => "greater_than",
            Operator::IsEmpty => "is_empty",
            Operator::CountEquals => "count_equals",
            Operator::CountGreaterThan => "count_greater_than",
            Operator::TypeIs => "type_is",
            Operator::TypeIsNot => "type_is_not",
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCondition {
    #[serde(default)]
    subject: Subject,
    op: Operator,
    #[serde(default)]
    operand: Value,
    #[serde(rename = "do")]
    action: Action,
}

impl TryFrom<RawCondition> for Condition {
    type Error = SchemaError;

    fn try_from(raw: RawCondition) -> Result<Self, SchemaError> {
        let op = raw.op;
        let count_operand = |operand: &Value| -> Result<usize, SchemaError> {
            operand
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| SchemaError::InvalidOperand {
                    op: op.name(),
                    reason: format!("expected a non-negative integer, found {}", operand),
                })
        };
        let type_operand = |operand: Value| -> Result<ValueType, SchemaError> {
            serde_json::from_value(operand).map_err(|err| SchemaError::InvalidOperand {
                op: op.name(),
                reason: err.to_string(),
            })
        };

        let test = match op {
            Operator::Equals => Test::Equals(raw.operand),
            Operator::NotEquals => Test::NotEquals(raw.operand),
            Operator::StrictEquals => Test::StrictEquals(raw.operand),
            Operator::StrictNotEquals => Test::StrictNotEquals(raw.operand),
            Operator::GreaterThan => Test::GreaterThan(raw.operand),
            Operator::IsEmpty => Test::IsEmpty,
            Operator::CountEquals => Test::CountEquals(count_operand(&raw.operand)?),
            Operator::CountGreaterThan => Test::CountGreaterThan(count_operand(&raw.operand)?),
            Operator::TypeIs => Test::TypeIs(type_operand(raw.operand)?),
            Operator::TypeIsNot => Test::TypeIsNot(type_operand(raw.operand)?),
        };

        Ok(Self {
            subject: raw.subject,
            test,
            action: raw.action,
        })
    }
}

/// Value after conditions, with the most severe pruning action seen
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Rewritten value
    pub value: Value,
    /// Most severe pruning action, if any fired
    pub severity: Option<Severity>,
}

/// Run `conditions` in order against `value`
pub fn evaluate(conditions: &[Condition], mut value: Value, scope: &Scope<'_>) -> Evaluation {
    let mut severity = None;

    for condition in conditions {
        let passed = {
            let subject = match &condition.subject {
                Subject::Value => Cow::Borrowed(&value),
                Subject::Data(path) => Cow::Owned(scope.resolve(path)),
            };
            condition.test.matches(&subject)
        };
        if !passed {
            continue;
        }

        match &condition.action {
            Action::SuppressKey | Action::SuppressSiblings | Action::Abort => {
                severity = severity.max(condition.action.severity());
            }
            Action::Replace(replacement) => {
                value = match replacement {
                    Replacement::Value(v) => v.clone(),
                    Replacement::CurrentIteration => scope
                        .encoder()
                        .current_iteration()
                        .map_or(Value::Null, Value::from),
                    Replacement::CurrentLevel => Value::from(scope.encoder().current_level()),
                };
            }
            Action::TakeFirst => value = first_element(&value),
            Action::Round(precision) => value = round(&value, *precision),
            Action::Convert(target) => value = cast(&value, *target),
        }
    }

    Evaluation { value, severity }
}
