//! Value semantics used by conditions and conversions
//!
//! Data store values are plain `serde_json::Value`s; an absent value is
//! `Value::Null`. Comparisons here are the loose, type-coercing kind that
//! form data calls for: `"3" == 3`, `"" == null`, `"0"` is empty.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Type names accepted by `type_is` / `type_is_not`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Absent or null
    Null,
    /// `true` / `false`
    Bool,
    /// Integral number
    Int,
    /// Non-integral number
    Float,
    /// Any number
    Number,
    /// String
    String,
    /// Sequence
    Array,
    /// Key/value map
    Object,
}

impl ValueType {
    /// Whether `value` is of this type
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (ValueType::Null, Value::Null) => true,
            (ValueType::Bool, Value::Bool(_)) => true,
            (ValueType::Int, Value::Number(n)) => !n.is_f64(),
            (ValueType::Float, Value::Number(n)) => n.is_f64(),
            (ValueType::Number, Value::Number(_)) => true,
            (ValueType::String, Value::String(_)) => true,
            (ValueType::Array, Value::Array(_)) => true,
            (ValueType::Object, Value::Object(_)) => true,
            _ => false,
        }
    }
}

/// Cast targets of conversion handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastType {
    /// Text form of the value
    String,
    /// Truncated integer, leading-numeric for strings
    Int,
    /// Floating point, leading-numeric for strings
    Float,
    /// Truthiness
    Bool,
    /// Sequence; scalars are wrapped, objects yield their values
    Array,
}

/// Empty-value test: null, `false`, zero, `""`, `"0"` and empty containers
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Boolean interpretation of a value
pub fn truthy(value: &Value) -> bool {
    !is_empty(value)
}

/// Element count: null is 0, scalars are 1, containers their length
pub fn element_count(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        _ => 1,
    }
}

/// Parse a string that is numeric as a whole (surrounding whitespace allowed)
pub fn numeric_str(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    let (number, rest) = split_leading_number(trimmed);
    if number.is_empty() || !rest.is_empty() {
        return None;
    }
    number.parse::<f64>().ok()
}

/// Leading-numeric interpretation of a string; `0.0` when there is none
pub fn leading_number(s: &str) -> f64 {
    let (number, _) = split_leading_number(s.trim_start());
    number.parse::<f64>().unwrap_or(0.0)
}

fn split_leading_number(s: &str) -> (&str, &str) {
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return ("", s);
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    s.split_at(end)
}

/// Numeric interpretation used by ordering comparisons
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => numeric_str(s),
        _ => None,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        _ => match (a.as_u64(), b.as_u64()) {
            (Some(x), Some(y)) => x == y,
            _ => a.as_f64() == b.as_f64(),
        },
    }
}

/// Loose (type-coercing) equality
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), other) | (other, Value::Bool(x)) => *x == truthy(other),
        (Value::Null, Value::String(s)) | (Value::String(s), Value::Null) => s.is_empty(),
        (Value::Null, other) | (other, Value::Null) => is_empty(other),
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            match numeric_str(s) {
                Some(parsed) => n.as_f64() == Some(parsed),
                None => n.to_string() == *s,
            }
        }
        (Value::String(x), Value::String(y)) => match (numeric_str(x), numeric_str(y)) {
            (Some(p), Some(q)) => p == q,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| loose_eq(p, q))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, p)| y.get(key).map(|q| loose_eq(p, q)).unwrap_or(false))
        }
        _ => false,
    }
}

/// Strict equality: identical type and value
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.is_f64() == y.is_f64() && numbers_equal(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| strict_eq(p, q))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, p)| y.get(key).map(|q| strict_eq(p, q)).unwrap_or(false))
        }
        _ => a == b,
    }
}

/// Loose ordering; `None` when the values are not comparable
pub fn loose_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y))
            if numeric_str(x).is_none() || numeric_str(y).is_none() =>
        {
            Some(x.cmp(y))
        }
        (Value::Array(x), Value::Array(y)) => Some(x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => Some(x.len().cmp(&y.len())),
        _ => as_number(a)?.partial_cmp(&as_number(b)?),
    }
}

/// Loose `a > b`
pub fn loose_gt(a: &Value, b: &Value) -> bool {
    loose_cmp(a, b) == Some(Ordering::Greater)
}

/// Text form used by concatenation and string casts
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::Number(n) => format_number(n),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn format_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

/// Convert a value to a cast target
pub fn cast(value: &Value, target: CastType) -> Value {
    match target {
        CastType::String => Value::String(to_text(value)),
        CastType::Bool => Value::Bool(truthy(value)),
        CastType::Int => Value::from(to_f64(value).trunc() as i64),
        CastType::Float => Value::from(to_f64(value)),
        CastType::Array => match value {
            Value::Null => Value::Array(Vec::new()),
            Value::Array(_) => value.clone(),
            Value::Object(map) => Value::Array(map.values().cloned().collect()),
            scalar => Value::Array(vec![scalar.clone()]),
        },
    }
}

fn to_f64(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => leading_number(s),
        Value::Array(items) => f64::from(u8::from(!items.is_empty())),
        Value::Object(map) => f64::from(u8::from(!map.is_empty())),
    }
}

/// Round a numeric value to `precision` decimal places.
///
/// Integers pass through, and precision 0 yields an integer. Non-numeric
/// values and results that are not finite are returned unchanged.
pub fn round(value: &Value, precision: u32) -> Value {
    let number = match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => return value.clone(),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => numeric_str(s),
        _ => None,
    };
    let Some(f) = number else {
        return value.clone();
    };

    let factor = 10f64.powi(precision.min(15) as i32);
    let rounded = (f * factor).round() / factor;
    if !rounded.is_finite() {
        return value.clone();
    }
    if precision == 0 && rounded.abs() < i64::MAX as f64 {
        Value::from(rounded as i64)
    } else {
        Value::from(rounded)
    }
}

/// First element of a container; scalars pass through
pub fn first_element(value: &Value) -> Value {
    match value {
        Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
        Value::Object(map) => map.values().next().cloned().unwrap_or(Value::Null),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_values() {
        let empty = [
            json!(null),
            json!(false),
            json!(0),
            json!(0.0),
            json!(""),
            json!("0"),
            json!([]),
            json!({}),
        ];
        for value in empty {
            assert!(is_empty(&value), "{} should be empty", value);
        }
        let filled = [
            json!(true),
            json!(1),
            json!("a"),
            json!("00"),
            json!([0]),
            json!({"a": null}),
        ];
        for value in filled {
            assert!(!is_empty(&value), "{} should not be empty", value);
        }
    }

    #[test]
    fn element_counts() {
        assert_eq!(element_count(&json!(null)), 0);
        assert_eq!(element_count(&json!("text")), 1);
        assert_eq!(element_count(&json!(0)), 1);
        assert_eq!(element_count(&json!([1, 2, 3])), 3);
        assert_eq!(element_count(&json!({"a": 1, "b": 2})), 2);
    }

    #[test]
    fn loose_equality_coerces() {
        assert!(loose_eq(&json!("3"), &json!(3)));
        assert!(loose_eq(&json!(3.0), &json!(3)));
        assert!(loose_eq(&json!(" 1e1"), &json!("10")));
        assert!(loose_eq(&json!(null), &json!("")));
        assert!(loose_eq(&json!(null), &json!(0)));
        assert!(loose_eq(&json!(true), &json!("yes")));
        assert!(loose_eq(&json!(false), &json!("0")));
        assert!(loose_eq(&json!([1, "2"]), &json!(["1", 2])));
        assert!(!loose_eq(&json!("abc"), &json!(0)));
        assert!(!loose_eq(&json!("a"), &json!("b")));
        assert!(!loose_eq(&json!([1]), &json!(1)));
    }

    #[test]
    fn strict_equality_requires_same_type() {
        assert!(strict_eq(&json!(3), &json!(3)));
        assert!(!strict_eq(&json!(3), &json!(3.0)));
        assert!(!strict_eq(&json!("3"), &json!(3)));
        assert!(strict_eq(&json!({"a": [1]}), &json!({"a": [1]})));
        assert!(!strict_eq(&json!(null), &json!(false)));
    }

    #[test]
    fn greater_than_compares_numerically_when_possible() {
        assert!(loose_gt(&json!("10"), &json!(9)));
        assert!(loose_gt(&json!(2.5), &json!("2")));
        assert!(!loose_gt(&json!("10"), &json!("9a")));
        assert!(loose_gt(&json!("b"), &json!("a")));
        assert!(!loose_gt(&json!(null), &json!(0)));
        assert!(!loose_gt(&json!({"a": 1}), &json!(0)));
    }

    #[test]
    fn numeric_string_parsing() {
        assert_eq!(numeric_str(" 42 "), Some(42.0));
        assert_eq!(numeric_str("-1.5e2"), Some(-150.0));
        assert_eq!(numeric_str(".5"), Some(0.5));
        assert_eq!(numeric_str("12abc"), None);
        assert_eq!(numeric_str("inf"), None);
        assert_eq!(numeric_str(""), None);
        assert_eq!(leading_number("12abc"), 12.0);
        assert_eq!(leading_number("abc"), 0.0);
    }

    #[test]
    fn text_forms() {
        assert_eq!(to_text(&json!(null)), "");
        assert_eq!(to_text(&json!(true)), "1");
        assert_eq!(to_text(&json!(false)), "");
        assert_eq!(to_text(&json!(7)), "7");
        assert_eq!(to_text(&json!(2.0)), "2");
        assert_eq!(to_text(&json!(2.5)), "2.5");
        assert_eq!(to_text(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn casts() {
        assert_eq!(cast(&json!("12abc"), CastType::Int), json!(12));
        assert_eq!(cast(&json!(3.9), CastType::Int), json!(3));
        assert_eq!(cast(&json!("2.5"), CastType::Float), json!(2.5));
        assert_eq!(cast(&json!("0"), CastType::Bool), json!(false));
        assert_eq!(cast(&json!(5), CastType::String), json!("5"));
        assert_eq!(cast(&json!("x"), CastType::Array), json!(["x"]));
        assert_eq!(cast(&json!({"a": 1, "b": 2}), CastType::Array), json!([1, 2]));
    }

    #[test]
    fn rounding() {
        assert_eq!(round(&json!(2.346), 2), json!(2.35));
        assert_eq!(round(&json!("1.5"), 0), json!(2));
        assert_eq!(round(&json!(-2.5), 0), json!(-3));
        assert_eq!(round(&json!("n/a"), 2), json!("n/a"));
    }

    #[test]
    fn rounding_keeps_integers_and_non_finite_inputs() {
        assert_eq!(round(&json!(5), 2), json!(5));
        assert_eq!(round(&json!(5), 0), json!(5));
        assert_eq!(round(&json!(u64::MAX), 0), json!(u64::MAX));
        assert_eq!(round(&json!("1e308"), 15), json!("1e308"));
        assert_eq!(round(&json!(1.0e308), 15), json!(1.0e308));
    }

    #[test]
    fn first_elements() {
        assert_eq!(first_element(&json!([3, 4])), json!(3));
        assert_eq!(first_element(&json!([])), json!(null));
        assert_eq!(first_element(&json!({"k": "v"})), json!("v"));
        assert_eq!(first_element(&json!("s")), json!("s"));
    }

    #[test]
    fn value_types() {
        assert!(ValueType::Int.matches(&json!(1)));
        assert!(!ValueType::Int.matches(&json!(1.5)));
        assert!(ValueType::Float.matches(&json!(1.5)));
        assert!(ValueType::Number.matches(&json!(1)));
        assert!(ValueType::Null.matches(&json!(null)));
        assert!(!ValueType::String.matches(&json!(1)));
    }
}
