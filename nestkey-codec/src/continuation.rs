//! Continuation requests
//!
//! A continuation asks the field generator for more repetitions of a
//! repeater that was already rendered, identified by one of its field names.

use crate::error::{PackError, Result};
use serde::{Deserialize, Serialize};

/// Parameter carrying the caller's field name
pub const PATH_PARAM: &str = "path";
/// Parameter carrying the number of repetitions already rendered
pub const PREVIOUS_PARAM: &str = "previous";
/// Parameter carrying the number of repetitions to add
pub const ADDITIONAL_PARAM: &str = "additional";

const DEFAULT_PREVIOUS_COUNT: u64 = 1;
const DEFAULT_ADDITIONAL_COUNT: u64 = 0;

fn default_previous_count() -> u64 {
    DEFAULT_PREVIOUS_COUNT
}

/// Request for more repetitions of a repeater
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationRequest {
    /// Bracketed field name inside the repeater
    pub caller_path: String,
    /// Repetitions already rendered; the first new one has this index
    #[serde(default = "default_previous_count")]
    pub previous_count: u64,
    /// Repetitions to emit
    #[serde(default)]
    pub additional_count: u64,
}

impl ContinuationRequest {
    /// Request with default counts
    pub fn new(caller_path: impl Into<String>) -> Self {
        Self {
            caller_path: caller_path.into(),
            previous_count: DEFAULT_PREVIOUS_COUNT,
            additional_count: DEFAULT_ADDITIONAL_COUNT,
        }
    }

    /// Set the number of repetitions already rendered
    pub fn with_previous(mut self, previous_count: u64) -> Self {
        self.previous_count = previous_count;
        self
    }

    /// Set the number of repetitions to add
    pub fn with_additional(mut self, additional_count: u64) -> Self {
        self.additional_count = additional_count;
        self
    }

    /// Parse raw string parameters (`path`, `previous`, `additional`)
    ///
    /// Blank counts take their defaults. Unknown parameters are ignored.
    pub fn from_params<'a, I>(params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut caller_path = None;
        let mut previous_count = DEFAULT_PREVIOUS_COUNT;
        let mut additional_count = DEFAULT_ADDITIONAL_COUNT;

        for (name, raw) in params {
            match name {
                PATH_PARAM => caller_path = Some(raw.trim().to_string()),
                PREVIOUS_PARAM => previous_count = parse_count(name, raw, DEFAULT_PREVIOUS_COUNT)?,
                ADDITIONAL_PARAM => {
                    additional_count = parse_count(name, raw, DEFAULT_ADDITIONAL_COUNT)?
                }
                _ => {}
            }
        }

        let caller_path = caller_path
            .filter(|path| !path.is_empty())
            .ok_or_else(|| PackError::MalformedRequest(format!("missing '{}'", PATH_PARAM)))?;

        Ok(Self {
            caller_path,
            previous_count,
            additional_count,
        })
    }
}

fn parse_count(name: &str, raw: &str, default: u64) -> Result<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(default);
    }
    trimmed.parse::<u64>().map_err(|_| {
        PackError::MalformedRequest(format!("'{}' is not a count: {:?}", name, raw))
    })
}
