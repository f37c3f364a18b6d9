//! Drift detection: has a document fallen behind its source specifications?
//!
//! Status precedence (first match wins):
//! 1. `MissingHash` (no `sync_hash`, or no source specs recorded)
//! 2. `Orphaned` (none of the referenced specs still exist)
//! 3. `Drifted` (fingerprint of existing specs differs from `sync_hash`)
//! 4. `Stale` (last sync older than the threshold, or sync time unknown)
//! 5. `InSync`

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use docsync_core::{
    Document, DocumentId, DocumentStore, ProjectId, Specification, SpecificationId,
    SpecificationStore,
};

use crate::{fingerprint, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftStatus {
    InSync,
    Drifted,
    Stale,
    MissingHash,
    Orphaned,
}

impl DriftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftStatus::InSync => "in_sync",
            DriftStatus::Drifted => "drifted",
            DriftStatus::Stale => "stale",
            DriftStatus::MissingHash => "missing_hash",
            DriftStatus::Orphaned => "orphaned",
        }
    }
}

impl fmt::Display for DriftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only drift report for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftResult {
    pub document_id: DocumentId,
    pub status: DriftStatus,
    /// Hash recorded at the last sync.
    pub stored_hash: Option<String>,
    /// Fingerprint of the specs that exist right now (absent when not computed).
    pub current_hash: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub days_since_sync: Option<i64>,
    /// Referenced spec ids the store no longer knows.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_spec_ids: Vec<SpecificationId>,
    pub message: String,
}

impl DriftResult {
    /// Drifted, stale and orphaned documents are candidates for a project sync.
    pub fn needs_regeneration(&self) -> bool {
        matches!(
            self.status,
            DriftStatus::Drifted | DriftStatus::Stale | DriftStatus::Orphaned
        )
    }
}

/// Specs a document refers to, split into those found and those missing.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSpecs {
    /// In the document's reference order; the first one is the primary source.
    pub found: Vec<Specification>,
    pub missing: Vec<SpecificationId>,
}

impl ResolvedSpecs {
    pub fn primary(&self) -> Option<&Specification> {
        self.found.first()
    }

    pub fn fingerprint(&self) -> String {
        fingerprint::spec_fingerprint(&self.found)
    }
}

/// Compares a document's `sync_hash` against its specifications.
pub struct DriftDetector<'a> {
    specs: &'a dyn SpecificationStore,
}

impl<'a> DriftDetector<'a> {
    pub fn new(specs: &'a dyn SpecificationStore) -> Self {
        Self { specs }
    }

    /// Look up every spec the document references.
    pub fn resolve_specs(&self, ids: &[SpecificationId]) -> Result<ResolvedSpecs, SyncError> {
        let mut resolved = ResolvedSpecs::default();
        for id in ids {
            match self.specs.get(*id)? {
                Some(spec) => resolved.found.push(spec),
                None => resolved.missing.push(*id),
            }
        }
        Ok(resolved)
    }

    pub fn check(
        &self,
        document: &Document,
        staleness_threshold_days: i64,
    ) -> Result<DriftResult, SyncError> {
        self.check_at(document, staleness_threshold_days, Utc::now())
    }

    /// `check` with an explicit clock.
    pub fn check_at(
        &self,
        document: &Document,
        staleness_threshold_days: i64,
        now: DateTime<Utc>,
    ) -> Result<DriftResult, SyncError> {
        let days_since_sync = document
            .last_synced_at
            .map(|at| now.signed_duration_since(at).num_days());
        let mut result = DriftResult {
            document_id: document.id,
            status: DriftStatus::MissingHash,
            stored_hash: document.sync_hash.clone(),
            current_hash: None,
            last_synced_at: document.last_synced_at,
            days_since_sync,
            missing_spec_ids: Vec::new(),
            message: String::new(),
        };

        let Some(stored) = document.sync_hash.as_deref() else {
            result.message = "no sync hash recorded".to_string();
            return Ok(result);
        };
        if document.based_on_spec_ids.is_empty() {
            result.message = "no source specifications recorded".to_string();
            return Ok(result);
        }

        let resolved = self.resolve_specs(&document.based_on_spec_ids)?;
        result.missing_spec_ids = resolved.missing.clone();
        if resolved.found.is_empty() {
            result.status = DriftStatus::Orphaned;
            result.message = format!(
                "all {} source specification(s) were deleted",
                resolved.missing.len()
            );
            return Ok(result);
        }

        let current = resolved.fingerprint();
        result.current_hash = Some(current.clone());
        if current != stored {
            result.status = DriftStatus::Drifted;
            result.message = format!("specifications changed ({stored} -> {current})");
            return Ok(result);
        }

        match document.last_synced_at {
            None => {
                result.status = DriftStatus::Stale;
                result.message = "last sync time unknown".to_string();
            }
            Some(at) if past_threshold(now.signed_duration_since(at), staleness_threshold_days) => {
                result.status = DriftStatus::Stale;
                result.message = format!(
                    "last synced {} day(s) ago (threshold {staleness_threshold_days})",
                    days_since_sync.unwrap_or_default()
                );
            }
            Some(_) => {
                result.status = DriftStatus::InSync;
                result.message = "in sync".to_string();
            }
        }
        Ok(result)
    }

    /// Drift report for every document of a project.
    pub fn check_project(
        &self,
        documents: &dyn DocumentStore,
        project_id: ProjectId,
        staleness_threshold_days: i64,
    ) -> Result<Vec<DriftResult>, SyncError> {
        let now = Utc::now();
        let results = documents
            .list_by_project(project_id)?
            .iter()
            .map(|doc| self.check_at(doc, staleness_threshold_days, now))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(
            "project {project_id}: {} document(s), {} need regeneration",
            results.len(),
            results.iter().filter(|r| r.needs_regeneration()).count()
        );
        Ok(results)
    }
}

/// `elapsed > threshold_days`. A threshold too large for a `Duration` is
/// never reached.
fn past_threshold(elapsed: Duration, threshold_days: i64) -> bool {
    Duration::try_days(threshold_days).is_some_and(|limit| elapsed > limit)
}
