//! Traversal limits

use crate::error::PackError;
use serde::{Deserialize, Serialize};

/// Bounds on one pack or generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackLimits {
    /// Maximum nesting of object and concatenation nodes
    pub max_depth: usize,
    /// Maximum number of values produced (packed leaves or generated fields)
    pub max_items: usize,
}

impl Default for PackLimits {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_items: 100_000,
        }
    }
}

impl PackLimits {
    /// Hard maximum limits that cannot be exceeded
    pub fn hard_maximums() -> Self {
        Self {
            max_depth: 256,
            max_items: 10_000_000,
        }
    }

    /// Validate limits against hard maximums
    pub fn validate(&self) -> Result<(), PackError> {
        let hard = Self::hard_maximums();

        if self.max_depth == 0 || self.max_depth > hard.max_depth {
            return Err(PackError::Configuration(format!(
                "max_depth {} must be within 1..={}",
                self.max_depth, hard.max_depth
            )));
        }

        if self.max_items > hard.max_items {
            return Err(PackError::Configuration(format!(
                "max_items {} exceeds hard limit {}",
                self.max_items, hard.max_items
            )));
        }

        Ok(())
    }
}
