//! Readiness detection and idempotent triggering for marker-driven datasets
//!
//! A check scans the watched directories for ready markers, picks the latest
//! batch, skips it when a published marker already covers it, and otherwise
//! claims it and submits a task. Claim markers debounce repeated checks and
//! carry the retry counter; batches that keep failing are recorded in the
//! failure sentinel.

pub mod check;
pub mod claim;
pub mod classify;
pub mod payload;
pub mod scan;
pub mod select;
pub mod sentinel;

pub use check::{CheckOutcome, DataWatcher, PlannedAction};
pub use claim::{ClaimController, ClaimDecision, ClaimState, RETRY_BUDGET};
pub use classify::{is_published, published_range, PublishedRange};
pub use payload::{Payload, TaskPayload};
pub use scan::{scan, Candidate};
pub use select::{select_latest, Batch};
pub use sentinel::{FailureSentinel, StuckEntry, DEFAULT_SENTINEL_PATH};
