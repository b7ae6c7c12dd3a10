//! Claim / debounce controller
//!
//! A claim marker says "a trigger for this batch is in flight". Its mtime
//! gives its age, its last `Retry:` line the number of earlier attempts. The
//! state machine, evaluated once per tick for an unpublished batch:
//!
//! ```text
//! NoClaim ──claim(retry=0)──▶ Claimed ──published──▶ (terminal)
//!                               │ age > debounce
//!                               ├─ retry < budget ──▶ reclaim(retry+1) ──▶ Claimed
//!                               └─ retry ≥ budget ──▶ Failed (sentinel, claim removed)
//! ```
//!
//! New claims are created with an exclusive create, so two overlapping
//! checkers can never both win the same transition.

use crate::classify::read_if_present;
use crate::select::Batch;
use crate::sentinel::{FailureSentinel, StuckEntry};
use chrono::Utc;
use geowatch_core::marker::{list_markers, MarkerFile, MarkerKind};
use geowatch_core::store;
use geowatch_core::{Coverage, MarkerBody, MarkerRange, Result, WatchSpec};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

/// Number of re-triggers allowed after the first attempt
pub const RETRY_BUDGET: u32 = 1;

/// Snapshot of one claim marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimState {
    pub path: PathBuf,
    pub stem: String,
    pub age: Duration,
    pub retry: u32,
}

/// Result of evaluating the claims covering a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimDecision {
    /// Nothing claims the batch
    Absent,
    /// A claim younger than the debounce window exists
    InFlight(ClaimState),
    /// Every covering claim is older than the debounce window
    Stale { claims: Vec<ClaimState>, retry: u32 },
}

impl ClaimDecision {
    /// Retry number the next claim carries, or `None` once the budget is spent
    pub fn next_retry(&self) -> Option<u32> {
        match self {
            Self::Absent => Some(0),
            Self::InFlight(_) => None,
            Self::Stale { retry, .. } if *retry >= RETRY_BUDGET => None,
            Self::Stale { retry, .. } => Some(retry + 1),
        }
    }

    fn stale_claims(&self) -> &[ClaimState] {
        match self {
            Self::Stale { claims, .. } => claims,
            _ => &[],
        }
    }
}

/// Evaluates and transitions claim markers for one watch
pub struct ClaimController<'a> {
    spec: &'a WatchSpec,
    now: SystemTime,
}

impl<'a> ClaimController<'a> {
    pub fn new(spec: &'a WatchSpec, now: SystemTime) -> Self {
        Self { spec, now }
    }

    /// Whether a claim of this age is still inside the debounce window
    pub fn is_fresh(&self, age: Duration) -> bool {
        age <= self.spec.debounce
    }

    /// Claims that cover `batch`
    pub fn locate(&self, batch: &Batch) -> Result<Vec<ClaimState>> {
        let suffixes = &self.spec.suffixes;

        let covering: Vec<MarkerFile> = match self.spec.family.coverage() {
            Coverage::Exact => {
                let name = suffixes.claim_name(&batch.identifier);
                vec![MarkerFile {
                    path: batch.dir().join(&name),
                    file_name: name,
                    stem: batch.identifier.clone(),
                }]
            }
            Coverage::RangeEnd => {
                let format = self.spec.family.range_format();
                list_markers(batch.dir(), suffixes, MarkerKind::Claim)?
                    .into_iter()
                    .filter(|marker| match MarkerRange::parse(&marker.stem, format) {
                        Ok(range) => batch.timestamp <= range.end,
                        Err(_) => {
                            debug!("Ignoring unparsable claim {}", marker.file_name);
                            false
                        }
                    })
                    .collect()
            }
            Coverage::RecordedRun => {
                let mut found = Vec::new();
                for marker in list_markers(batch.dir(), suffixes, MarkerKind::Claim)? {
                    if marker.stem == batch.identifier {
                        found.push(marker);
                        continue;
                    }
                    if let Some(body) = read_if_present(&marker)? {
                        if body.last("Batch") == Some(batch.identifier.as_str()) {
                            found.push(marker);
                        }
                    }
                }
                found
            }
        };

        let mut states = Vec::new();
        for marker in covering {
            let Some(age) = store::file_age(&marker.path, self.now)? else {
                continue;
            };
            let retry = match read_if_present(&marker) {
                Ok(Some(body)) => body.retry(),
                Ok(None) => continue,
                Err(e) => {
                    warn!("Failed to read retry count from {}: {}", marker.path.display(), e);
                    0
                }
            };
            states.push(ClaimState {
                path: marker.path,
                stem: marker.stem,
                age,
                retry,
            });
        }
        Ok(states)
    }

    /// Classify the claims covering `batch` against the debounce window
    pub fn evaluate(&self, batch: &Batch) -> Result<ClaimDecision> {
        let claims = self.locate(batch)?;
        if claims.is_empty() {
            return Ok(ClaimDecision::Absent);
        }

        let youngest = claims.iter().min_by_key(|c| c.age).cloned();
        if let Some(claim) = youngest.filter(|c| self.is_fresh(c.age)) {
            return Ok(ClaimDecision::InFlight(claim));
        }

        let retry = claims.iter().map(|c| c.retry).max().unwrap_or(0);
        Ok(ClaimDecision::Stale { claims, retry })
    }

    /// Write a new claim named `<stem><claim suffix>` for `batch`
    ///
    /// Stale claims from `decision` are removed first. Returns `None` when a
    /// concurrent checker got there first; the batch is then in flight.
    pub fn acquire(
        &self,
        batch: &Batch,
        stem: &str,
        decision: &ClaimDecision,
        extra: &[(&'static str, String)],
    ) -> Result<Option<ClaimState>> {
        let Some(retry) = decision.next_retry() else {
            return Ok(None);
        };

        for stale in decision.stale_claims() {
            if !self.reap(stale)? {
                return Ok(None);
            }
        }

        let mut body = MarkerBody::new(format!("Checked at {}", Utc::now().to_rfc3339()))
            .with("File", batch.source_file())
            .with("Batch", &batch.identifier);
        for (key, value) in extra {
            body = body.with(key, value);
        }
        let body = body.with("Retry", retry);

        let path = batch.dir().join(self.spec.suffixes.claim_name(stem));
        if !store::create_exclusive(&path, body.render().as_bytes())? {
            info!("Claim {} was created concurrently, leaving it in flight", path.display());
            return Ok(None);
        }

        info!("Created {} (retry {})", path.display(), retry);
        Ok(Some(ClaimState {
            path,
            stem: stem.to_string(),
            age: Duration::ZERO,
            retry,
        }))
    }

    /// Declare `batch` permanently failed: record it in the sentinel, drop its claims
    pub fn escalate(&self, batch: &Batch, decision: &ClaimDecision, sentinel: &FailureSentinel) -> Result<StuckEntry> {
        let claims = decision.stale_claims();
        let retry = claims.iter().map(|c| c.retry).max().unwrap_or(0);
        let claim = claims
            .iter()
            .max_by_key(|c| c.retry)
            .map(|c| c.stem.clone())
            .unwrap_or_else(|| batch.identifier.clone());

        let entry = StuckEntry {
            watch: self.spec.name.clone(),
            batch: batch.identifier.clone(),
            claim,
            retries: retry + 1,
            at: Utc::now(),
        };

        error!(
            "{} batch {} has been retried {} times, marking as permanently failed in {}",
            self.spec.name,
            batch.identifier,
            entry.retries,
            sentinel.path().display()
        );
        sentinel.record(entry.clone())?;

        for stale in claims {
            store::remove_if_exists(&stale.path)?;
        }
        Ok(entry)
    }

    /// Remove a stale claim if it is still stale
    ///
    /// A claim that turned fresh since evaluation was replaced by another
    /// checker and must be left alone.
    fn reap(&self, stale: &ClaimState) -> Result<bool> {
        match store::file_age(&stale.path, SystemTime::now())? {
            Some(age) if self.is_fresh(age) => {
                info!("Claim {} was renewed concurrently", stale.path.display());
                Ok(false)
            }
            Some(age) => {
                info!(
                    "Claim {} pending for {}s (> {}s), removing and re-triggering",
                    stale.stem,
                    age.as_secs(),
                    self.spec.debounce.as_secs()
                );
                store::remove_if_exists(&stale.path)?;
                Ok(true)
            }
            None => Ok(true),
        }
    }
}
