//! Publisher-side bookkeeping
//!
//! This crate provides:
//! - Published marker writing with range supersession
//! - Retention pruning anchored to the newest published granule
//! - Catalog removal requests for pruned granules

pub mod publication;
pub mod retention;

pub use publication::{Publication, PublishedRecord};
pub use retention::{PruneReport, RetentionPolicy, RetentionPruner};
