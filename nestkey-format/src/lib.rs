//! nestkey Format - Core primitives for hierarchical iteration paths
//!
//! This crate provides the iteration-path arithmetic shared by the nestkey
//! packer and field generator, with no I/O dependencies. It includes:
//!
//! - Constants
//! - Iteration state geometry (architecture / levels)
//! - Per-level bit fields of the iteration state
//! - Name sanitizing
//! - The bracketed path wire format
//! - The path encoder
//! - Error types

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod constants;
pub mod encoder;
pub mod error;
pub mod iteration;
pub mod limits;
pub mod path;
pub mod sanitize;

// Re-export commonly used types
pub use encoder::PathEncoder;
pub use error::{PathError, Result};
pub use iteration::IterationState;
pub use limits::{Geometry, GeometryConfig};
pub use path::{MaterializedPath, PathKey, PathPrefix, PathSegment, PathStyle};
