//! Path encoder
//!
//! [`PathEncoder`] tracks a depth-first walk through nested, repeatable
//! structures. The repeat counter of every entered level lives in one
//! [`IterationState`] word and the name of every entered level in a name
//! table, so the position of the walk can be written out as a field key and
//! later parsed back to resume the walk.
//!
//! Fields use one-based storage: `0` marks a level that has not been
//! entered, and a stored `n >= 1` means the walk is at repeat index `n - 1`.

use crate::constants::{FIELD_FIRST_REPETITION, FIELD_UNSET};
use crate::error::{PathError, Result};
use crate::iteration::IterationState;
use crate::limits::Geometry;
use crate::path::{
    associative_keys, tokenize, write_bracketed, MaterializedPath, PathKey, PathPrefix,
    PathSegment, PathStyle,
};
use crate::sanitize::{is_index_token, sanitize_name};

/// Iteration state plus level name table for one traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEncoder {
    geometry: Geometry,
    prefix: PathPrefix,
    state: IterationState,
    current_level: u32,
    names: Vec<String>,
}

impl PathEncoder {
    /// Create an encoder with no level entered
    pub fn new(geometry: Geometry, prefix: PathPrefix) -> Self {
        Self {
            geometry,
            prefix,
            state: IterationState::EMPTY,
            current_level: 0,
            names: Vec::with_capacity(geometry.levels() as usize),
        }
    }

    /// Build an encoder positioned at the given `(name, repeat index)` levels
    pub fn from_segments(
        geometry: Geometry,
        prefix: PathPrefix,
        segments: &[(&str, u64)],
    ) -> Result<Self> {
        let mut encoder = Self::new(geometry, prefix);
        for (name, index) in segments {
            encoder.enter_level(name)?;
            encoder.seek_repetition(*index)?;
        }
        Ok(encoder)
    }

    /// Rebuild an encoder from a previously materialized bracketed path.
    ///
    /// The first `assumed_prefix_depth` segments become the prefix. Every
    /// remaining name segment enters a level; a numeric segment positions the
    /// level named just before it at that repeat index.
    pub fn parse_continuation(
        geometry: Geometry,
        path: &str,
        assumed_prefix_depth: usize,
    ) -> Result<Self> {
        let tokens = tokenize(path)?;
        if tokens.len() < assumed_prefix_depth {
            return Err(PathError::MalformedPath {
                path: path.to_string(),
                reason: format!(
                    "expected at least {} prefix segments, found {}",
                    assumed_prefix_depth,
                    tokens.len()
                ),
            });
        }

        let (prefix_tokens, level_tokens) = tokens.split_at(assumed_prefix_depth);
        let prefix = PathPrefix::from_segments(prefix_tokens)?;
        let mut encoder = Self::new(geometry, prefix);
        let mut index_allowed = false;

        for token in level_tokens {
            if is_index_token(token) {
                if !index_allowed {
                    return Err(PathError::MalformedPath {
                        path: path.to_string(),
                        reason: format!("index '{}' does not follow a level name", token),
                    });
                }
                let index = token.parse::<u64>().map_err(|_| PathError::MalformedPath {
                    path: path.to_string(),
                    reason: format!("index '{}' is out of range", token),
                })?;
                if index > 0 {
                    encoder.iterate(index - 1)?;
                }
                index_allowed = false;
            } else {
                encoder.enter_level(token)?;
                index_allowed = true;
            }
        }

        Ok(encoder)
    }

    /// Geometry of the iteration state
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Prefix written ahead of every bracketed path
    pub fn prefix(&self) -> &PathPrefix {
        &self.prefix
    }

    /// Current iteration state
    pub fn state(&self) -> IterationState {
        self.state
    }

    /// Number of entered levels
    pub fn current_level(&self) -> u32 {
        self.current_level
    }

    /// Names of the entered levels, outermost first
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Enter the next level under `name`, positioned at its first repetition
    pub fn enter_level(&mut self, name: &str) -> Result<()> {
        let name = sanitize_name(name)?;
        if self.current_level >= self.geometry.levels() {
            return Err(PathError::DepthExceeded {
                attempted: self.current_level + 1,
                max_depth: self.geometry.levels(),
            });
        }

        self.current_level += 1;
        self.names.push(name);
        self.iterate(0)
    }

    /// Advance the current level by `extra_count + 1` repetitions
    pub fn iterate(&mut self, extra_count: u64) -> Result<()> {
        let level = self.require_level()?;
        let current = self.state.field(&self.geometry, level);
        let requested = current as u128 + extra_count as u128 + 1;
        if requested >= self.geometry.max_count_per_level() {
            return Err(PathError::Overflow {
                level,
                requested,
                max_count: self.geometry.max_count_per_level(),
            });
        }

        self.state.set_field(&self.geometry, level, requested as u64);
        Ok(())
    }

    /// Undo `iterate(extra_count)` on the current level
    pub fn deiterate(&mut self, extra_count: u64) -> Result<()> {
        let level = self.require_level()?;
        let current = self.state.field(&self.geometry, level);
        let requested = extra_count as u128 + 1;
        if (current as u128) < requested + FIELD_FIRST_REPETITION as u128 {
            return Err(PathError::Underflow {
                level,
                requested,
                current,
            });
        }

        self.state
            .set_field(&self.geometry, level, (current as u128 - requested) as u64);
        Ok(())
    }

    /// Clear the current level's field and re-enter its first repetition
    pub fn reset_current_level_iteration(&mut self) -> Result<()> {
        let level = self.require_level()?;
        self.state.clear_field(&self.geometry, level);
        self.iterate(0)
    }

    /// Position the current level at a zero-based repeat index
    pub fn seek_repetition(&mut self, index: u64) -> Result<()> {
        self.reset_current_level_iteration()?;
        if index > 0 {
            self.iterate(index - 1)?;
        }
        Ok(())
    }

    /// Leave the current level, clearing its field and name
    pub fn leave_level(&mut self) -> Result<()> {
        let level = self.require_level()?;
        self.state.clear_field(&self.geometry, level);
        self.current_level -= 1;
        self.names.pop();
        Ok(())
    }

    /// Name the key about to be visited on the current level
    pub fn set_level_name(&mut self, name: &str) -> Result<()> {
        self.require_level()?;
        let name = sanitize_name(name)?;
        if let Some(slot) = self.names.last_mut() {
            *slot = name;
        }
        Ok(())
    }

    /// Zero-based repeat index of an entered 1-based level
    pub fn repeat_index(&self, level: u32) -> Option<u64> {
        if level == 0 || level > self.current_level {
            return None;
        }
        match self.state.field(&self.geometry, level) {
            FIELD_UNSET => None,
            field => Some(field - FIELD_FIRST_REPETITION),
        }
    }

    /// Zero-based repeat index of the innermost entered level
    pub fn current_iteration(&self) -> Option<u64> {
        self.repeat_index(self.current_level)
    }

    /// Zero-based repeat indices of all entered levels, outermost first
    pub fn indices(&self) -> Vec<u64> {
        self.state
            .fields(&self.geometry, self.current_level)
            .iter()
            .map(|field| field.saturating_sub(FIELD_FIRST_REPETITION))
            .collect()
    }

    /// Name and non-zero repeat index of each entered level
    pub fn segments(&self) -> Vec<PathSegment> {
        self.state
            .fields(&self.geometry, self.current_level)
            .iter()
            .zip(&self.names)
            .map(|(field, name)| PathSegment {
                name: name.clone(),
                index: (*field > FIELD_FIRST_REPETITION).then(|| field - FIELD_FIRST_REPETITION),
            })
            .collect()
    }

    /// Materialize the current position in the requested style
    pub fn materialize(&self, style: PathStyle) -> MaterializedPath {
        match style {
            PathStyle::Bracketed => MaterializedPath::Bracketed(self.to_bracketed()),
            PathStyle::Associative => MaterializedPath::Associative(self.to_keys()),
        }
    }

    /// Bracketed field key, `NS[a][b][2][c]`
    pub fn to_bracketed(&self) -> String {
        write_bracketed(&self.prefix, &self.segments())
    }

    /// Associative key sequence, `["a", "b", 2, "c"]`
    pub fn to_keys(&self) -> Vec<PathKey> {
        associative_keys(&self.segments())
    }

    fn require_level(&self) -> Result<u32> {
        if self.current_level == 0 {
            return Err(PathError::NotInLevel);
        }
        Ok(self.current_level)
    }
}
