//! Constants for the nestkey path format

/// Word sizes an iteration state may be configured with.
pub const SUPPORTED_ARCHITECTURES: [u32; 4] = [8, 16, 32, 64];

/// Default iteration state width in bits.
pub const DEFAULT_ARCHITECTURE: u32 = 64;

/// Default maximum nesting depth.
pub const DEFAULT_LEVELS: u32 = 5;

/// Maximum number of prefix segments (namespace, option group, secondary key).
pub const MAX_PREFIX_SEGMENTS: usize = 3;

/// Opening delimiter of a bracketed path segment.
pub const SEGMENT_OPEN: char = '[';

/// Closing delimiter of a bracketed path segment.
pub const SEGMENT_CLOSE: char = ']';

/// Field value of a level that has not been entered.
pub const FIELD_UNSET: u64 = 0;

/// Field value of the first repetition of an entered level.
pub const FIELD_FIRST_REPETITION: u64 = 1;
