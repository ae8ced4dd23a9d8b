//! Path model and the bracketed wire format
//!
//! A materialized path is written as a head segment followed by bracketed
//! segments: `NS[group][a][b][2][c]`. The prefix (up to three segments)
//! comes first, then one name per entered level, each followed by its
//! zero-based repeat index when that index is non-zero.

use crate::constants::{MAX_PREFIX_SEGMENTS, SEGMENT_CLOSE, SEGMENT_OPEN};
use crate::error::{PathError, Result};
use crate::sanitize::{is_name_char, sanitize_name};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// One key of an associative path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathKey {
    /// Zero-based repeat index
    Index(u64),
    /// Level name
    Name(String),
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Index(index) => write!(f, "{}", index),
            PathKey::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for PathKey {
    fn from(name: &str) -> Self {
        PathKey::Name(name.to_string())
    }
}

impl From<u64> for PathKey {
    fn from(index: u64) -> Self {
        PathKey::Index(index)
    }
}

/// Name and optional non-zero repeat index of one level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    /// Sanitized level name
    pub name: String,
    /// Zero-based repeat index, present only when non-zero
    pub index: Option<u64>,
}

/// Leading segments of every materialized path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathPrefix {
    segments: SmallVec<[String; MAX_PREFIX_SEGMENTS]>,
}

impl PathPrefix {
    /// Prefix with no segments; the first level name becomes the head
    pub fn none() -> Self {
        Self::default()
    }

    /// Prefix made of a namespace segment
    pub fn new(namespace: &str) -> Result<Self> {
        Self::none().with_segment(namespace)
    }

    /// Append a segment (option group, then secondary key)
    pub fn with_segment(mut self, raw: &str) -> Result<Self> {
        if self.segments.len() == MAX_PREFIX_SEGMENTS {
            return Err(PathError::PrefixTooLong(self.segments.len() + 1));
        }
        self.segments.push(sanitize_name(raw)?);
        Ok(self)
    }

    /// Build a prefix from raw segments
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        segments
            .into_iter()
            .try_fold(Self::none(), |prefix, segment| {
                prefix.with_segment(segment.as_ref())
            })
    }

    /// Sanitized prefix segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of prefix segments
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

/// Output form requested from `materialize`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    /// Delimiter-joined key string including the prefix
    Bracketed,
    /// Ordered key sequence, without the prefix
    Associative,
}

/// A materialized path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterializedPath {
    /// `NS[a][b][2][c]`
    Bracketed(String),
    /// `["a", "b", 2, "c"]`
    Associative(Vec<PathKey>),
}

/// Write the bracketed form of a prefix followed by level segments
pub fn write_bracketed(prefix: &PathPrefix, segments: &[PathSegment]) -> String {
    let mut out = String::new();
    let mut push = |token: &str| {
        if out.is_empty() {
            out.push_str(token);
        } else {
            out.push(SEGMENT_OPEN);
            out.push_str(token);
            out.push(SEGMENT_CLOSE);
        }
    };

    for segment in prefix.segments() {
        push(segment.as_str());
    }
    for segment in segments {
        push(segment.name.as_str());
        if let Some(index) = segment.index {
            push(index.to_string().as_str());
        }
    }
    out
}

/// Associative key sequence of level segments
pub fn associative_keys(segments: &[PathSegment]) -> Vec<PathKey> {
    let mut keys = Vec::with_capacity(segments.len() * 2);
    for segment in segments {
        keys.push(PathKey::Name(segment.name.clone()));
        if let Some(index) = segment.index {
            keys.push(PathKey::Index(index));
        }
    }
    keys
}

/// Split a bracketed path into its raw tokens.
///
/// `NS[a][2]` yields `["NS", "a", "2"]`. The empty string yields no tokens.
pub fn tokenize(path: &str) -> Result<Vec<&str>> {
    if path.is_empty() {
        return Ok(Vec::new());
    }

    let malformed = |reason: &str| PathError::MalformedPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    let (head, mut rest) = match path.find(SEGMENT_OPEN) {
        Some(pos) => (&path[..pos], &path[pos..]),
        None => (path, ""),
    };
    if head.is_empty() {
        return Err(malformed("path must start with a head segment"));
    }

    let mut tokens = vec![head];
    while !rest.is_empty() {
        let body = rest
            .strip_prefix(SEGMENT_OPEN)
            .ok_or_else(|| malformed("expected '[' after ']'"))?;
        let close = body
            .find(SEGMENT_CLOSE)
            .ok_or_else(|| malformed("unterminated '[' segment"))?;
        let token = &body[..close];
        if token.is_empty() {
            return Err(malformed("empty segment"));
        }
        tokens.push(token);
        rest = &body[close + 1..];
    }

    if let Some(bad) = tokens
        .iter()
        .find(|token| !token.chars().all(is_name_char))
    {
        return Err(malformed(&format!("segment '{}' has unsafe characters", bad)));
    }

    Ok(tokens)
}
