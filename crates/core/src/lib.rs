//! Shared data model for geowatch
//!
//! This crate provides:
//! - Dataset families and their capabilities
//! - Timestamp, range and granule name grammars
//! - Marker names and line-oriented marker bodies
//! - Atomic filesystem primitives (whole-file replace, exclusive create)
//! - The task dispatcher boundary
//! - The shared error type

pub mod error;
pub mod family;
pub mod granule;
pub mod marker;
pub mod store;
pub mod task;
pub mod timestamp;
pub mod watch;

// Re-exports
pub use error::{Result, WatchError};
pub use family::{Coverage, Family, IdentifierRule};
pub use granule::{list_granules, Granule};
pub use marker::{list_markers, MarkerBody, MarkerFile, MarkerKind, MarkerSuffixes};
pub use task::{TaskDispatcher, TaskRequest};
pub use timestamp::{GranulePattern, MarkerRange, TimestampFormat};
pub use watch::{WatchSpec, DEFAULT_CATALOG_TASK};
