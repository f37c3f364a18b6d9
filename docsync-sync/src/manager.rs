//! Sync orchestration.
//!
//! [`SyncManager::sync_document`] flow:
//!
//! 1. Load the document (missing → [`SyncError::DocumentNotFound`]).
//! 2. Drift check. `InSync` → success with [`SyncStrategy::Skip`].
//! 3. `dry_run` → report the drift, touch nothing.
//! 4. Branch on the requested strategy. Only `Regenerate` writes, and only
//!    after the generator, conflict check and merge have all finished in
//!    memory. Content, `sync_hash`, baseline and timestamps go to the store
//!    in one `update` call.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use docsync_core::{
    AiBaseline, Config, Document, DocumentId, DocumentStore, GeneratedBy, ProjectId,
    SpecificationStore,
};

use crate::{
    conflict::{ConflictDetector, ConflictStatus, ResolutionStrategy},
    drift::{DriftDetector, DriftResult, DriftStatus},
    fingerprint::content_hash,
    generator::{generate_bounded, CancelSignal, ContentGenerator, GenerationContext},
    resolver::{ConflictResolver, MergeResult},
    SyncError,
};

/// What to do with a document that is not in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStrategy {
    Skip,
    Manual,
    Regenerate,
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncStrategy::Skip => "skip",
            SyncStrategy::Manual => "manual",
            SyncStrategy::Regenerate => "regenerate",
        })
    }
}

/// Outcome of syncing one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub document_id: DocumentId,
    pub success: bool,
    pub strategy: SyncStrategy,
    /// Drift as observed before any action.
    pub drift: DriftResult,
    pub dry_run: bool,
    /// True only when the store was written.
    pub updated: bool,
    pub needs_review: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_hash: Option<String>,
}

impl SyncResult {
    fn new(drift: DriftResult, strategy: SyncStrategy, dry_run: bool) -> Self {
        Self {
            document_id: drift.document_id,
            success: true,
            strategy,
            drift,
            dry_run,
            updated: false,
            needs_review: false,
            message: String::new(),
            error: None,
            conflicts: Vec::new(),
            model: None,
            generation_ms: None,
            sync_hash: None,
        }
    }

    fn done(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    fn failed(mut self, error: impl Into<String>) -> Self {
        let error = error.into();
        self.success = false;
        self.message = error.clone();
        self.error = Some(error);
        self
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Holds no per-call state; the stores are the source of truth.
pub struct SyncManager {
    documents: Arc<dyn DocumentStore>,
    specs: Arc<dyn SpecificationStore>,
    generator: Option<Arc<dyn ContentGenerator>>,
    config: Config,
    cancel: CancelSignal,
}

impl SyncManager {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        specs: Arc<dyn SpecificationStore>,
        config: Config,
    ) -> Self {
        Self {
            documents,
            specs,
            generator: None,
            config,
            cancel: CancelSignal::never(),
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn ContentGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// In-flight and future generator calls stop once `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    fn drift_detector(&self) -> DriftDetector<'_> {
        DriftDetector::new(self.specs.as_ref())
    }

    fn load(&self, id: DocumentId) -> Result<Document, SyncError> {
        self.documents
            .get(id)?
            .ok_or(SyncError::DocumentNotFound { id })
    }

    pub async fn sync_document(
        &self,
        id: DocumentId,
        strategy: SyncStrategy,
        dry_run: bool,
    ) -> Result<SyncResult, SyncError> {
        let document = self.load(id)?;
        let drift = self
            .drift_detector()
            .check(&document, self.config.drift.staleness_threshold_days)?;
        self.apply(document, drift, strategy, dry_run).await
    }

    /// Sync every document of a project that needs regeneration (drifted,
    /// stale or orphaned), at most `sync.max_concurrent` at a time. In-sync
    /// documents are never touched. Results come back in completion order.
    pub async fn sync_project(
        &self,
        project_id: ProjectId,
        strategy: SyncStrategy,
        dry_run: bool,
    ) -> Result<Vec<SyncResult>, SyncError> {
        let threshold = self.config.drift.staleness_threshold_days;
        let detector = self.drift_detector();

        let mut candidates = Vec::new();
        for document in self.documents.list_by_project(project_id)? {
            let drift = detector.check(&document, threshold)?;
            if drift.needs_regeneration() {
                candidates.push((document, drift));
            } else {
                tracing::debug!("document {}: {}, not a candidate", document.id, drift.status);
            }
        }
        tracing::info!(
            "project {project_id}: {} document(s) to sync with strategy {strategy}",
            candidates.len()
        );

        let limit = self.config.sync.max_concurrent.max(1);
        stream::iter(candidates)
            .map(|(document, drift)| self.apply(document, drift, strategy, dry_run))
            .buffer_unordered(limit)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect()
    }

    async fn apply(
        &self,
        document: Document,
        drift: DriftResult,
        strategy: SyncStrategy,
        dry_run: bool,
    ) -> Result<SyncResult, SyncError> {
        if drift.status == DriftStatus::InSync {
            return Ok(SyncResult::new(drift, SyncStrategy::Skip, dry_run).done("in sync"));
        }
        if dry_run {
            let message = format!("[dry-run] {}: {}", drift.status, drift.message);
            return Ok(SyncResult::new(drift, strategy, true).done(message));
        }

        match strategy {
            SyncStrategy::Skip => {
                tracing::debug!("document {}: skipped ({})", document.id, drift.status);
                Ok(SyncResult::new(drift, strategy, false).done("skipped"))
            }
            SyncStrategy::Manual => {
                let mut result = SyncResult::new(drift, strategy, false).done("flagged for manual review");
                result.needs_review = true;
                Ok(result)
            }
            SyncStrategy::Regenerate => self.regenerate(document, drift).await,
        }
    }

    async fn regenerate(&self, document: Document, drift: DriftResult) -> Result<SyncResult, SyncError> {
        let result = SyncResult::new(drift, SyncStrategy::Regenerate, false);

        if document.generated_by != GeneratedBy::Ai {
            return Ok(result.failed("document is manually authored; requires manual update"));
        }
        let Some(generator) = self.generator.as_deref() else {
            return Ok(result.failed("no content generator configured; requires manual update"));
        };
        if document.manual_override {
            let mut result = result.failed("manual override; requires manual update");
            result.needs_review = true;
            return Ok(result);
        }

        let specs = self.drift_detector().resolve_specs(&document.based_on_spec_ids)?;
        let Some(primary) = specs.primary() else {
            return Ok(result.failed("no source specification available"));
        };

        let context = GenerationContext {
            document_id: document.id,
            doc_type: document.doc_type.clone(),
            title: document.title.clone(),
            specification: primary.clone(),
        };
        let timeout = Duration::from_secs(self.config.sync.generation_timeout_secs);
        let (generated, elapsed) =
            match generate_bounded(generator, &context, timeout, &self.cancel).await {
                Ok(ok) => ok,
                Err(err) => {
                    tracing::warn!("document {}: generation failed: {err}", document.id);
                    return Ok(result.failed(err.to_string()));
                }
            };
        let mut result = result;
        result.model = Some(generated.model.clone());
        result.generation_ms = Some(elapsed.as_millis() as u64);

        // Never overwrite edits made since the last generation.
        let conflict = ConflictDetector.detect(&document);
        let content = if conflict.status == ConflictStatus::ManualEditDetected {
            match ConflictResolver.resolve(&document, &generated.content, ResolutionStrategy::ThreeWayMerge) {
                Ok(merge) if merge.success => merge.merged_content,
                Ok(merge) => return Ok(conflicted(result, merge)),
                Err(SyncError::Validation(msg)) => {
                    let mut result = result.failed(format!("manual edits detected: {msg}"));
                    result.needs_review = true;
                    return Ok(result);
                }
                Err(err) => return Err(err),
            }
        } else {
            generated.content.clone()
        };

        let now = Utc::now();
        let sync_hash = specs.fingerprint();
        let mut updated = document;
        updated.content = content;
        updated.sync_hash = Some(sync_hash.clone());
        updated.ai_baseline = Some(AiBaseline {
            hash: content_hash(&generated.content),
            content: Some(generated.content),
        });
        updated.last_synced_at = Some(now);
        updated.updated_at = now;
        self.documents.update(&updated)?;

        tracing::info!(
            "regenerated document {} with {} in {}ms",
            updated.id,
            generated.model,
            elapsed.as_millis()
        );
        result.updated = true;
        result.sync_hash = Some(sync_hash);
        Ok(result.done(format!("regenerated with {}", generated.model)))
    }

    /// Apply a resolution strategy to `new_ai_content` against the stored
    /// document. With `apply` and a successful merge, the merged content is
    /// written and `new_ai_content` becomes the new AI baseline; the manual
    /// override flag is cleared unless the strategy keeps manual content.
    pub fn resolve_conflict(
        &self,
        id: DocumentId,
        new_ai_content: &str,
        strategy: ResolutionStrategy,
        apply: bool,
    ) -> Result<MergeResult, SyncError> {
        let document = self.load(id)?;
        let merge = ConflictResolver.resolve(&document, new_ai_content, strategy)?;
        if !apply || !merge.success {
            return Ok(merge);
        }

        let mut updated = document;
        updated.content = merge.merged_content.clone();
        updated.ai_baseline = Some(AiBaseline {
            hash: content_hash(new_ai_content),
            content: Some(new_ai_content.to_string()),
        });
        if strategy != ResolutionStrategy::KeepManual {
            updated.manual_override = false;
        }
        updated.updated_at = Utc::now();
        self.documents.update(&updated)?;
        tracing::info!("resolved document {} with {strategy}", updated.id);
        Ok(merge)
    }
}

fn conflicted(result: SyncResult, merge: MergeResult) -> SyncResult {
    tracing::warn!(
        "document {}: {} merge conflict(s), not written",
        result.document_id,
        merge.conflicts.len()
    );
    let mut result = result.failed(format!(
        "{} merge conflict(s); requires manual review",
        merge.conflicts.len()
    ));
    result.needs_review = true;
    result.conflicts = merge.conflicts;
    result
}
