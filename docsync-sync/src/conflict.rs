//! Manual-edit detection against the last AI-generated baseline.

use std::fmt;

use serde::{Deserialize, Serialize};

use docsync_core::{Document, DocumentId, DocumentStore};

use crate::{fingerprint, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    NoConflict,
    ManualEditDetected,
}

impl fmt::Display for ConflictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictStatus::NoConflict => "no_conflict",
            ConflictStatus::ManualEditDetected => "manual_edit_detected",
        })
    }
}

/// How to reconcile current content with newly generated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    KeepManual,
    KeepAi,
    ThreeWayMerge,
    ManualReview,
}

impl ResolutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::KeepManual => "keep_manual",
            ResolutionStrategy::KeepAi => "keep_ai",
            ResolutionStrategy::ThreeWayMerge => "three_way_merge",
            ResolutionStrategy::ManualReview => "manual_review",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictResult {
    pub document_id: DocumentId,
    pub status: ConflictStatus,
    pub has_manual_edits: bool,
    pub baseline_hash: Option<String>,
    pub current_hash: String,
    pub recommended: ResolutionStrategy,
    pub message: String,
}

/// Stateless; compares `content_hash(content)` with the baseline hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector;

impl ConflictDetector {
    /// Decision order:
    /// 1. no baseline → `NoConflict`, recommend `ManualReview`
    /// 2. `manual_override` → `ManualEditDetected`, recommend `KeepManual`
    /// 3. hash mismatch → `ManualEditDetected`, recommend `ThreeWayMerge`
    /// 4. otherwise → `NoConflict`, recommend `KeepAi`
    pub fn detect(&self, document: &Document) -> ConflictResult {
        let current_hash = fingerprint::content_hash(&document.content);
        let baseline_hash = document.ai_baseline.as_ref().map(|b| b.hash.clone());

        let (status, recommended, message) = match baseline_hash.as_deref() {
            None => (
                ConflictStatus::NoConflict,
                ResolutionStrategy::ManualReview,
                "no AI baseline recorded".to_string(),
            ),
            Some(_) if document.manual_override => (
                ConflictStatus::ManualEditDetected,
                ResolutionStrategy::KeepManual,
                "manual override flag set".to_string(),
            ),
            Some(baseline) if baseline != current_hash => (
                ConflictStatus::ManualEditDetected,
                ResolutionStrategy::ThreeWayMerge,
                format!("content changed since generation ({baseline} -> {current_hash})"),
            ),
            Some(_) => (
                ConflictStatus::NoConflict,
                ResolutionStrategy::KeepAi,
                "content matches AI baseline".to_string(),
            ),
        };

        ConflictResult {
            document_id: document.id,
            status,
            has_manual_edits: status == ConflictStatus::ManualEditDetected,
            baseline_hash,
            current_hash,
            recommended,
            message,
        }
    }

    /// Load a document and run [`detect`](Self::detect).
    pub fn check(
        &self,
        documents: &dyn DocumentStore,
        id: DocumentId,
    ) -> Result<ConflictResult, SyncError> {
        let document = documents
            .get(id)?
            .ok_or(SyncError::DocumentNotFound { id })?;
        Ok(self.detect(&document))
    }
}
