//! One check tick for one watch

use crate::claim::{ClaimController, ClaimDecision};
use crate::classify::is_published;
use crate::payload::{self, Payload};
use crate::scan::{display_dirs, scan};
use crate::select::{select_latest, Batch};
use crate::sentinel::FailureSentinel;
use geowatch_core::{Result, TaskDispatcher, TaskRequest, WatchError, WatchSpec};
use std::fmt;
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// What a planned (dry-run) check would have done
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    /// Claim with this retry number and dispatch
    Dispatch { retry: u32, claim: String },
    /// Give up on the batch and record it in the sentinel
    Escalate { retries: u32 },
}

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// No ready marker in any directory
    NoCandidates,
    AlreadyPublished { batch: String },
    /// A claim younger than the debounce window exists (or was just won by someone else)
    ClaimInFlight { batch: String, claim: String, age: Option<Duration> },
    /// The batch was escalated earlier and waits for an operator
    Failed { batch: String },
    /// The retry budget ran out in this check
    Escalated { batch: String, retries: u32 },
    /// Streaming batch with nothing left to publish
    NothingPending { batch: String },
    Dispatched { batch: String, task: String, claim: String, retry: u32 },
    DryRun { batch: String, action: PlannedAction },
}

impl CheckOutcome {
    /// Batch identifier the outcome refers to, if any
    pub fn batch(&self) -> Option<&str> {
        match self {
            Self::NoCandidates => None,
            Self::AlreadyPublished { batch }
            | Self::ClaimInFlight { batch, .. }
            | Self::Failed { batch }
            | Self::Escalated { batch, .. }
            | Self::NothingPending { batch }
            | Self::Dispatched { batch, .. }
            | Self::DryRun { batch, .. } => Some(batch),
        }
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCandidates => write!(f, "no ready markers"),
            Self::AlreadyPublished { batch } => write!(f, "{} already published", batch),
            Self::ClaimInFlight { batch, claim, age } => match age {
                Some(age) => write!(f, "{} in flight (claim {}, {}s old)", batch, claim, age.as_secs()),
                None => write!(f, "{} claimed concurrently ({})", batch, claim),
            },
            Self::Failed { batch } => write!(f, "{} permanently failed, awaiting operator", batch),
            Self::Escalated { batch, retries } => {
                write!(f, "{} escalated after {} attempts", batch, retries)
            }
            Self::NothingPending { batch } => write!(f, "{} has nothing pending", batch),
            Self::Dispatched { batch, task, claim, retry } => {
                write!(f, "{} dispatched to {} (claim {}, retry {})", batch, task, claim, retry)
            }
            Self::DryRun { batch, action } => match action {
                PlannedAction::Dispatch { retry, claim } => {
                    write!(f, "{} would be claimed as {} (retry {}) and dispatched", batch, claim, retry)
                }
                PlannedAction::Escalate { retries } => {
                    write!(f, "{} would be escalated after {} attempts", batch, retries)
                }
            },
        }
    }
}

/// Checks one watch and triggers its latest unpublished batch
pub struct DataWatcher<'a, D: TaskDispatcher> {
    spec: &'a WatchSpec,
    dispatcher: D,
    sentinel: &'a FailureSentinel,
    dry_run: bool,
}

impl<'a, D: TaskDispatcher> DataWatcher<'a, D> {
    pub fn new(spec: &'a WatchSpec, dispatcher: D, sentinel: &'a FailureSentinel) -> Self {
        Self {
            spec,
            dispatcher,
            sentinel,
            dry_run: false,
        }
    }

    /// Evaluate without writing claims, sentinel entries or dispatching
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run one check
    ///
    /// Non-fatal situations are reported as outcomes. Errors are unexpected
    /// I/O or dispatch failures; the next tick retries from scratch.
    pub fn check(&self) -> Result<CheckOutcome> {
        let spec = self.spec;
        let candidates = scan(&spec.dirs, &spec.suffixes.ready, &spec.suffixes.terminal_overlaps())?;

        let Some(batch) = select_latest(spec.family, candidates, &spec.suffixes.ready) else {
            debug!("{}: no {} files in {}", spec.name, spec.suffixes.ready, display_dirs(&spec.dirs));
            return Ok(CheckOutcome::NoCandidates);
        };
        debug!("{}: latest batch {} in {}", spec.name, batch.identifier, batch.dir().display());

        if is_published(spec, &batch)? {
            debug!("{}: {} already published", spec.name, batch.identifier);
            return Ok(CheckOutcome::AlreadyPublished {
                batch: batch.identifier,
            });
        }

        if self.sentinel.is_stuck(&spec.name, &batch.identifier)? {
            debug!("{}: {} is recorded as stuck", spec.name, batch.identifier);
            return Ok(CheckOutcome::Failed {
                batch: batch.identifier,
            });
        }

        let controller = ClaimController::new(spec, SystemTime::now());
        let decision = controller.evaluate(&batch)?;

        let retry = match &decision {
            ClaimDecision::InFlight(claim) => {
                debug!(
                    "{}: {} pending for {}s (<= {}s), skipping",
                    spec.name,
                    claim.stem,
                    claim.age.as_secs(),
                    spec.debounce.as_secs()
                );
                return Ok(CheckOutcome::ClaimInFlight {
                    batch: batch.identifier,
                    claim: claim.stem.clone(),
                    age: Some(claim.age),
                });
            }
            ClaimDecision::Absent => 0,
            ClaimDecision::Stale { retry: last, .. } => match decision.next_retry() {
                Some(retry) => retry,
                None => return self.escalate(&controller, batch, &decision, *last),
            },
        };

        let task = match payload::build(spec, &batch)? {
            Payload::Ready(task) => task,
            Payload::NothingPending => {
                return Ok(CheckOutcome::NothingPending {
                    batch: batch.identifier,
                })
            }
        };

        if self.dry_run {
            return Ok(CheckOutcome::DryRun {
                batch: batch.identifier,
                action: PlannedAction::Dispatch {
                    retry,
                    claim: task.claim_stem,
                },
            });
        }

        let Some(claim) = controller.acquire(&batch, &task.claim_stem, &decision, &task.claim_fields)? else {
            return Ok(CheckOutcome::ClaimInFlight {
                batch: batch.identifier,
                claim: task.claim_stem,
                age: None,
            });
        };

        let request = TaskRequest::new(spec.task.clone(), task.args);
        self.dispatcher.submit(&request).map_err(|e| match e {
            WatchError::Dispatch { .. } => e,
            other => WatchError::Dispatch {
                task: spec.task.clone(),
                reason: other.to_string(),
            },
        })?;

        info!(
            "{}: triggered {} for {} (task {}, retry {})",
            spec.name, spec.task, batch.identifier, request.id, claim.retry
        );
        Ok(CheckOutcome::Dispatched {
            batch: batch.identifier,
            task: spec.task.clone(),
            claim: claim.stem,
            retry: claim.retry,
        })
    }

    /// Record a batch whose stale claim has spent its retries
    fn escalate(
        &self,
        controller: &ClaimController<'_>,
        batch: Batch,
        decision: &ClaimDecision,
        retry: u32,
    ) -> Result<CheckOutcome> {
        if self.dry_run {
            return Ok(CheckOutcome::DryRun {
                batch: batch.identifier,
                action: PlannedAction::Escalate { retries: retry + 1 },
            });
        }

        let entry = controller.escalate(&batch, decision, self.sentinel)?;
        Ok(CheckOutcome::Escalated {
            batch: batch.identifier,
            retries: entry.retries,
        })
    }
}
