//! Escape handlers applied to resolved values before conditions run

use nestkey_format::sanitize::sanitize_key;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Escape functions a schema node may name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Escape {
    /// Entity-escape `& < > " '`
    Html,
    /// Remove `<...>` tags
    StripTags,
    /// Trim surrounding whitespace
    Trim,
    /// Keep only `[A-Za-z0-9_-]`
    Key,
}

impl Escape {
    /// Escape every string inside `value`; other scalars pass through
    pub fn apply(&self, value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.apply_str(&s)),
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|item| self.apply(item)).collect())
            }
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, item)| (key, self.apply(item)))
                    .collect(),
            ),
            other => other,
        }
    }

    fn apply_str(&self, s: &str) -> String {
        match self {
            Escape::Html => escape_html(s),
            Escape::StripTags => strip_tags(s),
            Escape::Trim => s.trim().to_string(),
            Escape::Key => sanitize_key(s),
        }
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match (in_tag, ch) {
            (false, '<') => in_tag = true,
            (true, '>') => in_tag = false,
            (false, other) => out.push(other),
            (true, _) => {}
        }
    }
    out
}
