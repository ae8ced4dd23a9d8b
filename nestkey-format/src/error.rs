//! Error types for nestkey format primitives

use thiserror::Error;

/// Path encoder error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// Architecture is not one of the supported word sizes.
    #[error("Unsupported architecture: {0} bits (supported: 8, 16, 32, 64)")]
    UnsupportedArchitecture(u32),
    /// Level count cannot be partitioned out of the architecture.
    #[error("Invalid level count {levels} for a {architecture}-bit architecture")]
    InvalidLevels {
        /// Requested number of levels
        levels: u32,
        /// Architecture bit width
        architecture: u32,
    },
    /// `enter_level` was called beyond the configured depth.
    #[error("Depth exceeded: cannot enter level {attempted} (max: {max_depth})")]
    DepthExceeded {
        /// Level that was about to be entered
        attempted: u32,
        /// Configured maximum depth
        max_depth: u32,
    },
    /// A level operation was attempted while no level is entered.
    #[error("No level entered")]
    NotInLevel,
    /// A repeat count does not fit in its level's bit field.
    #[error("Overflow at level {level}: field value {requested} does not fit (max count: {max_count})")]
    Overflow {
        /// Level whose field would overflow
        level: u32,
        /// Field value that was requested
        requested: u128,
        /// Exclusive maximum for one field
        max_count: u128,
    },
    /// `deiterate` would move a level below its first repetition.
    #[error("Underflow at level {level}: cannot remove {requested} from field value {current}")]
    Underflow {
        /// Level whose field would underflow
        level: u32,
        /// Amount that was requested to be removed
        requested: u128,
        /// Current field value
        current: u64,
    },
    /// A level or prefix name is empty after sanitizing, or purely numeric.
    #[error("Invalid name: '{0}'")]
    InvalidName(String),
    /// Prefix has more segments than the wire format allows.
    #[error("Prefix too long: {0} segments (max: 3)")]
    PrefixTooLong(usize),
    /// A path string could not be parsed.
    #[error("Malformed path '{path}': {reason}")]
    MalformedPath {
        /// The path string
        path: String,
        /// Explanation of why the path was rejected
        reason: String,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PathError>;
