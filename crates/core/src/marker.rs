//! Marker file names and line-oriented marker bodies
//!
//! A marker is a file named `<stem><suffix>`. The suffix selects its kind
//! (ready, claim or published); the stem is a batch identifier or a
//! `<start>-<end>` range. Bodies are a free-form headline followed by
//! `Key: value` lines.

use crate::error::{Result, WatchError};
use crate::store;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Suffixes reserved for the three marker kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerSuffixes {
    pub ready: String,
    pub claim: String,
    pub published: String,
}

impl Default for MarkerSuffixes {
    fn default() -> Self {
        Self {
            ready: ".READY".to_string(),
            claim: ".CHECKED".to_string(),
            published: ".PUBLISHED.READY".to_string(),
        }
    }
}

/// Kind of a marker file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Ready,
    Claim,
    Published,
}

impl MarkerSuffixes {
    pub fn ready_name(&self, stem: &str) -> String {
        format!("{}{}", stem, self.ready)
    }

    pub fn claim_name(&self, stem: &str) -> String {
        format!("{}{}", stem, self.claim)
    }

    pub fn published_name(&self, stem: &str) -> String {
        format!("{}{}", stem, self.published)
    }

    pub fn suffix(&self, kind: MarkerKind) -> &str {
        match kind {
            MarkerKind::Ready => &self.ready,
            MarkerKind::Claim => &self.claim,
            MarkerKind::Published => &self.published,
        }
    }

    /// Suffixes that also end in the ready suffix but mark something else
    pub fn terminal_overlaps(&self) -> Vec<&str> {
        [self.claim.as_str(), self.published.as_str()]
            .into_iter()
            .filter(|s| s.ends_with(self.ready.as_str()) && *s != self.ready)
            .collect()
    }

    /// Classify a file name, preferring the most specific suffix
    pub fn classify(&self, file_name: &str) -> Option<(MarkerKind, String)> {
        let mut kinds = [MarkerKind::Ready, MarkerKind::Claim, MarkerKind::Published];
        kinds.sort_by_key(|kind| std::cmp::Reverse(self.suffix(*kind).len()));

        kinds.into_iter().find_map(|kind| {
            file_name
                .strip_suffix(self.suffix(kind))
                .filter(|stem| !stem.is_empty())
                .map(|stem| (kind, stem.to_string()))
        })
    }

    pub fn validate(&self) -> Result<()> {
        for (label, suffix) in [
            ("ready", &self.ready),
            ("claim", &self.claim),
            ("published", &self.published),
        ] {
            if suffix.is_empty() {
                return Err(WatchError::Config(format!("{} suffix must not be empty", label)));
            }
        }
        if self.ready == self.claim || self.ready == self.published || self.claim == self.published {
            return Err(WatchError::Config("marker suffixes must be distinct".to_string()));
        }
        Ok(())
    }
}

/// A marker file found in a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerFile {
    pub path: PathBuf,
    pub file_name: String,
    pub stem: String,
}

impl MarkerFile {
    pub fn read_body(&self) -> Result<MarkerBody> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| WatchError::io(&self.path, e))?;
        Ok(MarkerBody::parse(&text))
    }
}

/// List markers of one kind in `dir`, sorted by name
///
/// Returns an empty list when the directory does not exist.
pub fn list_markers(dir: &Path, suffixes: &MarkerSuffixes, kind: MarkerKind) -> Result<Vec<MarkerFile>> {
    let names = match store::list_file_names(dir)? {
        Some(names) => names,
        None => return Ok(Vec::new()),
    };

    Ok(names
        .into_iter()
        .filter_map(|name| match suffixes.classify(&name) {
            Some((found, stem)) if found == kind => Some(MarkerFile {
                path: dir.join(&name),
                file_name: name,
                stem,
            }),
            _ => None,
        })
        .collect())
}

/// Line-oriented marker content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerBody {
    headline: Option<String>,
    fields: Vec<(String, String)>,
}

impl MarkerBody {
    pub fn new(headline: impl Into<String>) -> Self {
        Self {
            headline: Some(headline.into()),
            fields: Vec::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    /// Parse marker text; lines without `Key: value` shape are kept as headline only if first
    pub fn parse(text: &str) -> Self {
        let mut body = Self::default();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim_end();
            match line.split_once(':') {
                Some((key, value)) if is_key(key) => {
                    body.fields.push((key.to_string(), value.trim().to_string()));
                }
                _ if index == 0 && !line.is_empty() => body.headline = Some(line.to_string()),
                _ => {}
            }
        }
        body
    }

    pub fn headline(&self) -> Option<&str> {
        self.headline.as_deref()
    }

    /// Last value recorded for `key`
    pub fn last(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Retry counter of a claim; 0 when absent or malformed
    pub fn retry(&self) -> u32 {
        self.last("Retry").and_then(|v| v.parse().ok()).unwrap_or(0)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(headline) = &self.headline {
            out.push_str(headline);
            out.push('\n');
        }
        for (key, value) in &self.fields {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
        out
    }
}

fn is_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
