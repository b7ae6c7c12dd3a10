//! Batch identifier resolution and latest-batch selection

use crate::scan::Candidate;
use chrono::NaiveDateTime;
use geowatch_core::{Family, IdentifierRule};
use std::path::Path;
use tracing::warn;

/// Logical unit of work derived from the latest ready marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Canonical identifier (`2025010100`, `202501011200`, ...)
    pub identifier: String,
    /// Ordering key parsed from the identifier
    pub timestamp: NaiveDateTime,
    /// Ready marker the batch was derived from
    pub source: Candidate,
}

impl Batch {
    pub fn dir(&self) -> &Path {
        &self.source.dir
    }

    pub fn source_file(&self) -> &str {
        &self.source.file_name
    }
}

/// Extract the batch identifier from a ready marker name
pub fn identifier(rule: IdentifierRule, file_name: &str, ready_suffix: &str) -> String {
    match rule {
        IdentifierRule::StripReadySuffix => match file_name.find(ready_suffix) {
            Some(at) => file_name[..at].to_string(),
            None => first_segment(file_name),
        },
        IdentifierRule::FirstSeparator => first_segment(file_name),
    }
}

fn first_segment(file_name: &str) -> String {
    file_name.split('.').next().unwrap_or(file_name).to_string()
}

/// Pick the candidate with the largest ordering key
///
/// Candidates whose identifier does not parse are skipped with a warning.
/// Among equal keys the one visited last wins.
pub fn select_latest(family: Family, candidates: Vec<Candidate>, ready_suffix: &str) -> Option<Batch> {
    let format = family.id_format();

    candidates
        .into_iter()
        .filter_map(|candidate| {
            let identifier = identifier(family.identifier_rule(), &candidate.file_name, ready_suffix);
            match format.parse(&identifier) {
                Ok(timestamp) => Some(Batch {
                    identifier,
                    timestamp,
                    source: candidate,
                }),
                Err(e) => {
                    warn!("Skipping {} in {}: {}", candidate.file_name, candidate.dir.display(), e);
                    None
                }
            }
        })
        // `max_by_key` returns the last of several equal maxima
        .max_by_key(|batch| batch.timestamp)
}
