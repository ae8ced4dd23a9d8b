//! Iteration state geometry

use crate::constants::{DEFAULT_ARCHITECTURE, DEFAULT_LEVELS, SUPPORTED_ARCHITECTURES};
use crate::error::{PathError, Result};
use serde::{Deserialize, Serialize};

/// Partitioning of one iteration state word into per-level bit fields.
///
/// Fixed for the lifetime of an encoder. Construct through [`Geometry::new`],
/// which rejects unsupported word sizes and level counts that leave no bits
/// for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GeometryConfig", into = "GeometryConfig")]
pub struct Geometry {
    architecture: u32,
    levels: u32,
    bits_per_level: u32,
}

/// Serialized form of [`Geometry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Bit width of the iteration state
    #[serde(default = "default_architecture")]
    pub architecture: u32,
    /// Maximum nesting depth
    #[serde(default = "default_levels")]
    pub levels: u32,
}

fn default_architecture() -> u32 {
    DEFAULT_ARCHITECTURE
}

fn default_levels() -> u32 {
    DEFAULT_LEVELS
}

impl Geometry {
    /// Validate and build a geometry
    pub fn new(architecture: u32, levels: u32) -> Result<Self> {
        if !SUPPORTED_ARCHITECTURES.contains(&architecture) {
            return Err(PathError::UnsupportedArchitecture(architecture));
        }
        if levels == 0 || levels > architecture {
            return Err(PathError::InvalidLevels {
                levels,
                architecture,
            });
        }

        Ok(Self {
            architecture,
            levels,
            bits_per_level: architecture / levels,
        })
    }

    /// Bit width of the iteration state
    pub fn architecture(&self) -> u32 {
        self.architecture
    }

    /// Maximum nesting depth
    pub fn levels(&self) -> u32 {
        self.levels
    }

    /// Width of one level's field
    pub fn bits_per_level(&self) -> u32 {
        self.bits_per_level
    }

    /// Exclusive upper bound of a field value (`2^bits_per_level`)
    pub fn max_count_per_level(&self) -> u128 {
        1u128 << self.bits_per_level
    }

    /// Largest value one field can hold
    pub fn field_mask(&self) -> u64 {
        (self.max_count_per_level() - 1) as u64
    }

    /// Fail with [`PathError::Overflow`] when `count` repetitions of `level`
    /// would not fit its field
    pub fn check_repetitions(&self, level: u32, count: u128) -> Result<()> {
        if count >= self.max_count_per_level() {
            return Err(PathError::Overflow {
                level,
                requested: count,
                max_count: self.max_count_per_level(),
            });
        }
        Ok(())
    }

    /// Bit offset of a 1-based level's field; `level` must be in `1..=levels`
    pub(crate) fn shift_of(&self, level: u32) -> u32 {
        (level - 1) * self.bits_per_level
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            architecture: DEFAULT_ARCHITECTURE,
            levels: DEFAULT_LEVELS,
            bits_per_level: DEFAULT_ARCHITECTURE / DEFAULT_LEVELS,
        }
    }
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            architecture: DEFAULT_ARCHITECTURE,
            levels: DEFAULT_LEVELS,
        }
    }
}

impl TryFrom<GeometryConfig> for Geometry {
    type Error = PathError;

    fn try_from(config: GeometryConfig) -> Result<Self> {
        Geometry::new(config.architecture, config.levels)
    }
}

impl From<Geometry> for GeometryConfig {
    fn from(geometry: Geometry) -> Self {
        Self {
            architecture: geometry.architecture,
            levels: geometry.levels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_bits_for_32_bit_words() {
        let geometry = Geometry::new(32, 5).unwrap();
        assert_eq!(geometry.bits_per_level(), 6);
        assert_eq!(geometry.max_count_per_level(), 64);
        assert_eq!(geometry.field_mask(), 63);
    }

    #[test]
    fn derives_bits_for_64_bit_words() {
        let geometry = Geometry::new(64, 5).unwrap();
        assert_eq!(geometry.bits_per_level(), 12);
        assert_eq!(geometry.max_count_per_level(), 4096);
    }

    #[test]
    fn single_level_uses_whole_word() {
        let geometry = Geometry::new(64, 1).unwrap();
        assert_eq!(geometry.bits_per_level(), 64);
        assert_eq!(geometry.field_mask(), u64::MAX);
    }

    #[test]
    fn repetition_check_matches_field_width() {
        let geometry = Geometry::new(64, 2).unwrap();
        assert!(geometry.check_repetitions(1, (1 << 32) - 1).is_ok());
        assert_eq!(
            geometry.check_repetitions(2, 1 << 32),
            Err(PathError::Overflow {
                level: 2,
                requested: 1 << 32,
                max_count: 1 << 32,
            })
        );
    }

    #[test]
    fn rejects_unsupported_architecture() {
        assert_eq!(
            Geometry::new(48, 4),
            Err(PathError::UnsupportedArchitecture(48))
        );
    }

    #[test]
    fn rejects_zero_and_excessive_levels() {
        assert!(matches!(
            Geometry::new(32, 0),
            Err(PathError::InvalidLevels { .. })
        ));
        assert!(matches!(
            Geometry::new(8, 9),
            Err(PathError::InvalidLevels { .. })
        ));
    }

    #[test]
    fn default_matches_default_config() {
        let from_config = Geometry::try_from(GeometryConfig::default()).unwrap();
        assert_eq!(from_config, Geometry::default());
    }
}
