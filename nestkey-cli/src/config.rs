//! `nestkey.toml` configuration
//!
//! ```toml
//! [encoder]
//! architecture = 32
//! levels = 5
//!
//! [prefix]
//! namespace = "form"
//! group = "contact"
//!
//! [limits]
//! max_depth = 32
//! max_items = 100000
//!
//! [metadata]
//! site = "example.org"
//! ```

use nestkey_codec::{Geometry, PackContext, PackError, PackLimits, PathError, PathPrefix};
use nestkey_format::GeometryConfig;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
    /// The file is not valid TOML for this layout
    #[error("Invalid config {path}: {source}")]
    Toml {
        /// Config file path
        path: PathBuf,
        /// Underlying parse error
        source: toml::de::Error,
    },
    /// Geometry or prefix values are unusable
    #[error(transparent)]
    Path(#[from] PathError),
    /// Limits exceed hard maximums
    #[error(transparent)]
    Pack(#[from] PackError),
}

/// Prefix segments, written in the order namespace, group, secondary
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrefixConfig {
    /// Namespace segment
    pub namespace: Option<String>,
    /// Option group segment
    pub group: Option<String>,
    /// Secondary key segment
    pub secondary: Option<String>,
}

impl PrefixConfig {
    fn segments(&self) -> impl Iterator<Item = &str> {
        [&self.namespace, &self.group, &self.secondary]
            .into_iter()
            .flatten()
            .map(String::as_str)
    }
}

/// Whole configuration file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Iteration state geometry
    pub encoder: GeometryConfig,
    /// Field name prefix
    pub prefix: PrefixConfig,
    /// Traversal limits
    pub limits: PackLimits,
    /// Values readable by `meta` schema nodes
    pub metadata: Map<String, Value>,
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--architecture`
    pub architecture: Option<u32>,
    /// `--levels`
    pub levels: Option<u32>,
    /// `--prefix`, replacing every configured segment
    pub prefix: Option<Vec<String>>,
}

impl CliConfig {
    /// Load a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse config text
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Build a pack context, applying command-line overrides
    pub fn to_context(&self, overrides: &Overrides) -> Result<PackContext, ConfigError> {
        let geometry = Geometry::new(
            overrides.architecture.unwrap_or(self.encoder.architecture),
            overrides.levels.unwrap_or(self.encoder.levels),
        )?;
        let prefix = match &overrides.prefix {
            Some(segments) => PathPrefix::from_segments(segments)?,
            None => PathPrefix::from_segments(self.prefix.segments())?,
        };
        self.limits.validate()?;

        let mut context = PackContext::new(geometry)
            .with_prefix(prefix)
            .with_limits(self.limits.clone());
        context.metadata = self.metadata.clone();
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_file_uses_defaults() {
        let config = CliConfig::parse("").unwrap();
        assert_eq!(config, CliConfig::default());

        let context = config.to_context(&Overrides::default()).unwrap();
        assert_eq!(context.geometry, Geometry::default());
        assert_eq!(context.prefix.depth(), 0);
    }

    #[test]
    fn parses_all_tables() {
        let config = CliConfig::parse(
            r#"
            [encoder]
            architecture = 32
            levels = 5

            [prefix]
            namespace = "form"
            group = "contact"

            [limits]
            max_depth = 8

            [metadata]
            site = "example.org"
            year = 2024
            "#,
        )
        .unwrap();

        let context = config.to_context(&Overrides::default()).unwrap();
        assert_eq!(context.geometry.bits_per_level(), 6);
        assert_eq!(context.prefix.segments(), ["form", "contact"]);
        assert_eq!(context.limits.max_depth, 8);
        assert_eq!(context.limits.max_items, PackLimits::default().max_items);
        assert_eq!(context.meta("site"), json!("example.org"));
        assert_eq!(context.meta("year"), json!(2024));
    }

    #[test]
    fn overrides_win() {
        let config = CliConfig::parse("[encoder]\narchitecture = 32\n[prefix]\nnamespace = \"a\"").unwrap();
        let overrides = Overrides {
            architecture: Some(16),
            levels: Some(4),
            prefix: Some(vec!["NS".to_string(), "grp".to_string()]),
        };
        let context = config.to_context(&overrides).unwrap();
        assert_eq!(context.geometry.architecture(), 16);
        assert_eq!(context.geometry.bits_per_level(), 4);
        assert_eq!(context.prefix.segments(), ["NS", "grp"]);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(CliConfig::parse("[encoder]\narchitecture = 12")
            .unwrap()
            .to_context(&Overrides::default())
            .is_err());
        assert!(CliConfig::parse("[limits]\nmax_depth = 0")
            .unwrap()
            .to_context(&Overrides::default())
            .is_err());
        assert!(CliConfig::parse("[prefix]\nnamespace = \"42\"")
            .unwrap()
            .to_context(&Overrides::default())
            .is_err());
        assert!(CliConfig::parse("[colour]\nred = 1").is_err());
    }
}
