//! Time-based staleness: how long since a document was last synced.
//!
//! Independent of content. Boundaries come from [`StalenessThresholds`]
//! (days, inclusive upper bounds):
//!
//! | level        | days since sync          | priority |
//! |--------------|--------------------------|----------|
//! | `Fresh`      | ≤ `fresh_days`           | low      |
//! | `Aging`      | ≤ `aging_days`           | low      |
//! | `Stale`      | ≤ `stale_days`           | medium   |
//! | `VeryStale`  | > `stale_days`           | high     |
//! | `NeverSynced`| no `last_synced_at`      | high     |

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use docsync_core::{Document, DocumentId, DocumentStore, ProjectId, StalenessThresholds};

use crate::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalenessLevel {
    Fresh,
    Aging,
    Stale,
    VeryStale,
    NeverSynced,
}

impl StalenessLevel {
    pub fn needs_review(&self) -> bool {
        !matches!(self, StalenessLevel::Fresh | StalenessLevel::Aging)
    }

    pub fn priority(&self) -> Priority {
        match self {
            StalenessLevel::Fresh | StalenessLevel::Aging => Priority::Low,
            StalenessLevel::Stale => Priority::Medium,
            StalenessLevel::VeryStale | StalenessLevel::NeverSynced => Priority::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StalenessLevel::Fresh => "fresh",
            StalenessLevel::Aging => "aging",
            StalenessLevel::Stale => "stale",
            StalenessLevel::VeryStale => "very_stale",
            StalenessLevel::NeverSynced => "never_synced",
        }
    }
}

impl fmt::Display for StalenessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review priority; ordered low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StalenessResult {
    pub document_id: DocumentId,
    pub level: StalenessLevel,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub days_since_sync: Option<i64>,
    pub needs_review: bool,
    pub priority: Priority,
    /// Compact age (`"3d"`, `"5h"`), absent when never synced.
    pub age: Option<String>,
}

/// Per-level counts for a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StalenessReport {
    pub project_id: Option<ProjectId>,
    pub fresh: usize,
    pub aging: usize,
    pub stale: usize,
    pub very_stale: usize,
    pub never_synced: usize,
    pub results: Vec<StalenessResult>,
}

impl StalenessReport {
    pub fn needs_review(&self) -> usize {
        self.results.iter().filter(|r| r.needs_review).count()
    }

    fn record(&mut self, result: StalenessResult) {
        match result.level {
            StalenessLevel::Fresh => self.fresh += 1,
            StalenessLevel::Aging => self.aging += 1,
            StalenessLevel::Stale => self.stale += 1,
            StalenessLevel::VeryStale => self.very_stale += 1,
            StalenessLevel::NeverSynced => self.never_synced += 1,
        }
        self.results.push(result);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StalenessChecker {
    thresholds: StalenessThresholds,
}

impl StalenessChecker {
    pub fn new(thresholds: StalenessThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> StalenessThresholds {
        self.thresholds
    }

    /// Level for a whole number of elapsed days (`None` = never synced).
    pub fn classify(&self, days_since_sync: Option<i64>) -> StalenessLevel {
        let Some(days) = days_since_sync else {
            return StalenessLevel::NeverSynced;
        };
        let t = &self.thresholds;
        if days <= t.fresh_days {
            StalenessLevel::Fresh
        } else if days <= t.aging_days {
            StalenessLevel::Aging
        } else if days <= t.stale_days {
            StalenessLevel::Stale
        } else {
            StalenessLevel::VeryStale
        }
    }

    pub fn check(&self, document: &Document) -> StalenessResult {
        self.check_at(document, Utc::now())
    }

    /// `check` with an explicit clock.
    pub fn check_at(&self, document: &Document, now: DateTime<Utc>) -> StalenessResult {
        let days = document
            .last_synced_at
            .map(|at| now.signed_duration_since(at).num_days());
        let level = self.classify(days);
        StalenessResult {
            document_id: document.id,
            level,
            last_synced_at: document.last_synced_at,
            days_since_sync: days,
            needs_review: level.needs_review(),
            priority: level.priority(),
            age: document.last_synced_at.map(|at| format_age(at, now)),
        }
    }

    pub fn check_all(&self, documents: &[Document]) -> StalenessReport {
        let now = Utc::now();
        let mut report = StalenessReport::default();
        for doc in documents {
            report.record(self.check_at(doc, now));
        }
        report
    }

    pub fn check_project(
        &self,
        documents: &dyn DocumentStore,
        project_id: ProjectId,
    ) -> Result<StalenessReport, SyncError> {
        let mut report = self.check_all(&documents.list_by_project(project_id)?);
        report.project_id = Some(project_id);
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Age formatting
// ---------------------------------------------------------------------------

/// Compact age of `timestamp` relative to now.
pub fn format_datetime_age(timestamp: DateTime<Utc>) -> String {
    format_age(timestamp, Utc::now())
}

/// Compact age between two instants; future timestamps read as `0s`.
pub fn format_age(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(timestamp).num_seconds().max(0) as u64;
    format_seconds(age)
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}
