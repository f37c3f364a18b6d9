use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use docsync_core::{
    AiBaseline, Config, Document, DocumentId, DocumentStore, FileStore, GeneratedBy, ProjectId,
    Specification, SpecificationId,
};
use docsync_sync::{
    cancel_pair,
    fingerprint::{content_hash, spec_fingerprint},
    ContentGenerator, DriftDetector, DriftStatus, GeneratedContent, GenerationContext,
    GenerationError, ResolutionStrategy, SyncManager, SyncStrategy,
};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test generators
// ---------------------------------------------------------------------------

/// Returns fixed content and records every context it was given.
struct Scripted {
    content: String,
    seen: Mutex<Vec<GenerationContext>>,
}

impl Scripted {
    fn new(content: &str) -> Arc<Self> {
        Arc::new(Self {
            content: content.to_string(),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().expect("lock").len()
    }
}

#[async_trait]
impl ContentGenerator for Scripted {
    async fn generate(
        &self,
        context: &GenerationContext,
    ) -> Result<GeneratedContent, GenerationError> {
        self.seen.lock().expect("lock").push(context.clone());
        Ok(GeneratedContent {
            content: self.content.clone(),
            model: "scripted-v1".to_string(),
        })
    }
}

struct Failing;

#[async_trait]
impl ContentGenerator for Failing {
    async fn generate(&self, _: &GenerationContext) -> Result<GeneratedContent, GenerationError> {
        Err(GenerationError::Failed("upstream unavailable".to_string()))
    }
}

/// Sleeps, tracking how many calls overlap.
#[derive(Default)]
struct Sleepy {
    delay: Duration,
    running: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl ContentGenerator for Sleepy {
    async fn generate(
        &self,
        context: &GenerationContext,
    ) -> Result<GeneratedContent, GenerationError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(GeneratedContent {
            content: format!("# Doc {}", context.document_id),
            model: "sleepy".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const GENERATED_BEFORE: &str = "# Overview\n\nold body";

fn setup() -> (TempDir, Arc<FileStore>) {
    let home = TempDir::new().expect("home");
    let store = Arc::new(FileStore::at(home.path()));
    store
        .put_spec(&Specification::new(SpecificationId(1), "2.0", "current spec"))
        .expect("spec 1");
    (home, store)
}

/// AI-generated doc whose recorded hash predates spec 1 v2.0.
fn drifted_doc(id: i64, project: i64) -> Document {
    let mut doc = Document::new(DocumentId(id), ProjectId(project), "architecture", GENERATED_BEFORE);
    doc.title = "Overview".to_string();
    doc.based_on_spec_ids = vec![SpecificationId(1)];
    doc.sync_hash = Some(spec_fingerprint(&[Specification::new(
        SpecificationId(1),
        "1.0",
        "old spec",
    )]));
    doc.ai_baseline = Some(AiBaseline {
        hash: content_hash(GENERATED_BEFORE),
        content: Some(GENERATED_BEFORE.to_string()),
    });
    doc.last_synced_at = Some(Utc::now() - chrono::Duration::days(2));
    doc
}

fn in_sync_doc(id: i64, project: i64) -> Document {
    let mut doc = drifted_doc(id, project);
    doc.sync_hash = Some(spec_fingerprint(&[Specification::new(
        SpecificationId(1),
        "2.0",
        "current spec",
    )]));
    doc
}

fn seed(store: &FileStore, doc: &Document) {
    store.update(doc).expect("seed document");
}

fn reload(store: &FileStore, id: i64) -> Document {
    DocumentStore::get(store, DocumentId(id))
        .expect("get")
        .expect("document present")
}

fn manager(store: &Arc<FileStore>, config: Config) -> SyncManager {
    SyncManager::new(store.clone(), store.clone(), config)
}

// ---------------------------------------------------------------------------
// sync_document
// ---------------------------------------------------------------------------

#[tokio::test]
async fn regenerate_writes_content_hash_baseline_and_timestamp() {
    let (_home, store) = setup();
    seed(&store, &drifted_doc(1, 1));
    let generator = Scripted::new("# Overview\n\nnew body");

    let result = manager(&store, Config::default())
        .with_generator(generator.clone())
        .sync_document(DocumentId(1), SyncStrategy::Regenerate, false)
        .await
        .expect("sync");

    assert!(result.success, "{}", result.message);
    assert!(result.updated);
    assert_eq!(result.drift.status, DriftStatus::Drifted);
    assert_eq!(result.model.as_deref(), Some("scripted-v1"));
    assert!(result.generation_ms.is_some());

    let doc = reload(&store, 1);
    assert_eq!(doc.content, "# Overview\n\nnew body");
    assert_eq!(doc.sync_hash, result.sync_hash);
    let baseline = doc.ai_baseline.clone().expect("baseline");
    assert_eq!(baseline.hash, content_hash("# Overview\n\nnew body"));
    assert_eq!(baseline.content.as_deref(), Some("# Overview\n\nnew body"));
    assert!(doc.last_synced_at.expect("synced") > Utc::now() - chrono::Duration::minutes(1));

    let drift = DriftDetector::new(store.as_ref()).check(&doc, 30).expect("check");
    assert_eq!(drift.status, DriftStatus::InSync);

    let seen = generator.seen.lock().expect("lock");
    assert_eq!(seen[0].doc_type, "architecture");
    assert_eq!(seen[0].title, "Overview");
    assert_eq!(seen[0].specification.id, SpecificationId(1));
}

#[tokio::test]
async fn primary_spec_is_first_that_still_exists() {
    let (_home, store) = setup();
    store
        .put_spec(&Specification::new(SpecificationId(5), "1.0", "five"))
        .expect("spec 5");
    let mut doc = drifted_doc(1, 1);
    doc.based_on_spec_ids = vec![SpecificationId(99), SpecificationId(5), SpecificationId(1)];
    seed(&store, &doc);
    let generator = Scripted::new("fresh");

    manager(&store, Config::default())
        .with_generator(generator.clone())
        .sync_document(DocumentId(1), SyncStrategy::Regenerate, false)
        .await
        .expect("sync");

    let seen = generator.seen.lock().expect("lock");
    assert_eq!(seen[0].specification.id, SpecificationId(5));
}

#[tokio::test]
async fn in_sync_document_is_skipped() {
    let (_home, store) = setup();
    let doc = in_sync_doc(1, 1);
    seed(&store, &doc);
    let generator = Scripted::new("unused");

    let result = manager(&store, Config::default())
        .with_generator(generator.clone())
        .sync_document(DocumentId(1), SyncStrategy::Regenerate, false)
        .await
        .expect("sync");

    assert!(result.success);
    assert_eq!(result.strategy, SyncStrategy::Skip);
    assert!(!result.updated);
    assert_eq!(generator.calls(), 0);
    assert_eq!(reload(&store, 1), doc);
}

#[tokio::test]
async fn dry_run_reports_drift_without_writing() {
    let (_home, store) = setup();
    let doc = drifted_doc(1, 1);
    seed(&store, &doc);
    let generator = Scripted::new("unused");

    let result = manager(&store, Config::default())
        .with_generator(generator.clone())
        .sync_document(DocumentId(1), SyncStrategy::Regenerate, true)
        .await
        .expect("sync");

    assert!(result.dry_run);
    assert_eq!(result.drift.status, DriftStatus::Drifted);
    assert!(result.message.contains("drifted"));
    assert_eq!(generator.calls(), 0);
    assert_eq!(reload(&store, 1), doc);
}

#[tokio::test]
async fn generator_failure_leaves_document_untouched() {
    let (_home, store) = setup();
    let doc = drifted_doc(1, 1);
    seed(&store, &doc);

    let result = manager(&store, Config::default())
        .with_generator(Arc::new(Failing))
        .sync_document(DocumentId(1), SyncStrategy::Regenerate, false)
        .await
        .expect("sync");

    assert!(!result.success);
    assert!(result.error.as_deref().unwrap_or_default().contains("upstream unavailable"));
    assert_eq!(reload(&store, 1), doc);
}

#[tokio::test(start_paused = true)]
async fn timeout_leaves_document_untouched() {
    let (_home, store) = setup();
    let doc = drifted_doc(1, 1);
    seed(&store, &doc);
    let mut config = Config::default();
    config.sync.generation_timeout_secs = 2;
    let generator = Arc::new(Sleepy {
        delay: Duration::from_secs(60),
        ..Sleepy::default()
    });

    let result = manager(&store, config)
        .with_generator(generator)
        .sync_document(DocumentId(1), SyncStrategy::Regenerate, false)
        .await
        .expect("sync");

    assert!(!result.success);
    assert!(result.error.as_deref().unwrap_or_default().contains("timed out after 2s"));
    assert_eq!(reload(&store, 1), doc);
}

#[tokio::test]
async fn cancelled_generation_leaves_document_untouched() {
    let (_home, store) = setup();
    let doc = drifted_doc(1, 1);
    seed(&store, &doc);
    let (handle, signal) = cancel_pair();
    let generator = Scripted::new("never written");
    handle.cancel();

    let result = manager(&store, Config::default())
        .with_generator(generator.clone())
        .with_cancel(signal)
        .sync_document(DocumentId(1), SyncStrategy::Regenerate, false)
        .await
        .expect("sync");

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("generation cancelled"));
    assert_eq!(generator.calls(), 0);
    assert_eq!(reload(&store, 1), doc);
}

#[tokio::test]
async fn manually_authored_document_requires_manual_update() {
    let (_home, store) = setup();
    let mut doc = drifted_doc(1, 1);
    doc.generated_by = GeneratedBy::Manual;
    seed(&store, &doc);

    let result = manager(&store, Config::default())
        .with_generator(Scripted::new("unused"))
        .sync_document(DocumentId(1), SyncStrategy::Regenerate, false)
        .await
        .expect("sync");

    assert!(!result.success);
    assert!(result.message.contains("requires manual update"));
    assert_eq!(reload(&store, 1), doc);
}

#[tokio::test]
async fn manual_override_is_never_overwritten() {
    let (_home, store) = setup();
    let mut doc = drifted_doc(1, 1);
    doc.manual_override = true;
    seed(&store, &doc);
    let generator = Scripted::new("unused");

    let result = manager(&store, Config::default())
        .with_generator(generator.clone())
        .sync_document(DocumentId(1), SyncStrategy::Regenerate, false)
        .await
        .expect("sync");

    assert!(!result.success);
    assert!(result.needs_review);
    assert!(result.message.contains("manual override"));
    assert_eq!(generator.calls(), 0);
    assert_eq!(reload(&store, 1), doc);
}

#[tokio::test]
async fn manual_edits_merge_with_regenerated_content() {
    let (_home, store) = setup();
    let mut doc = drifted_doc(1, 1);
    let baseline = "# Overview\n\nintro\n\nnotes";
    doc.ai_baseline = Some(AiBaseline {
        hash: content_hash(baseline),
        content: Some(baseline.to_string()),
    });
    doc.content = "# Overview\n\nintro\n\nnotes plus my edits".to_string();
    seed(&store, &doc);

    let result = manager(&store, Config::default())
        .with_generator(Scripted::new("# Overview\n\nintro rewritten\n\nnotes"))
        .sync_document(DocumentId(1), SyncStrategy::Regenerate, false)
        .await
        .expect("sync");

    assert!(result.success, "{}", result.message);
    let stored = reload(&store, 1);
    assert_eq!(stored.content, "# Overview\nintro rewritten\nnotes plus my edits");
    assert_eq!(
        stored.baseline_content(),
        Some("# Overview\n\nintro rewritten\n\nnotes")
    );
}

#[tokio::test]
async fn conflicting_edits_are_reported_not_written() {
    let (_home, store) = setup();
    let mut doc = drifted_doc(1, 1);
    doc.content = "# Overview\n\nmy rewrite".to_string();
    seed(&store, &doc);

    let result = manager(&store, Config::default())
        .with_generator(Scripted::new("# Overview\n\nai rewrite"))
        .sync_document(DocumentId(1), SyncStrategy::Regenerate, false)
        .await
        .expect("sync");

    assert!(!result.success);
    assert!(result.needs_review);
    assert_eq!(result.conflicts.len(), 1);
    assert_eq!(reload(&store, 1), doc);
}

#[tokio::test]
async fn orphaned_document_cannot_regenerate() {
    let (_home, store) = setup();
    let mut doc = drifted_doc(1, 1);
    doc.based_on_spec_ids = vec![SpecificationId(404)];
    seed(&store, &doc);

    let result = manager(&store, Config::default())
        .with_generator(Scripted::new("unused"))
        .sync_document(DocumentId(1), SyncStrategy::Regenerate, false)
        .await
        .expect("sync");

    assert_eq!(result.drift.status, DriftStatus::Orphaned);
    assert!(!result.success);
    assert!(result.message.contains("no source specification"));
}

// ---------------------------------------------------------------------------
// sync_project
// ---------------------------------------------------------------------------

#[tokio::test]
async fn project_sync_only_touches_candidates() {
    let (_home, store) = setup();
    seed(&store, &in_sync_doc(1, 7));
    seed(&store, &drifted_doc(2, 7));
    let mut no_hash = drifted_doc(3, 7);
    no_hash.sync_hash = None;
    seed(&store, &no_hash);
    seed(&store, &drifted_doc(4, 8));
    let generator = Scripted::new("# Regenerated");

    let results = manager(&store, Config::default())
        .with_generator(generator.clone())
        .sync_project(ProjectId(7), SyncStrategy::Regenerate, false)
        .await
        .expect("sync project");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document_id, DocumentId(2));
    assert_eq!(generator.calls(), 1);
    assert_eq!(reload(&store, 2).content, "# Regenerated");
    assert_eq!(reload(&store, 4).content, GENERATED_BEFORE);
}

#[tokio::test(start_paused = true)]
async fn project_sync_bounds_concurrency() {
    let (_home, store) = setup();
    for id in 1..=6 {
        seed(&store, &drifted_doc(id, 1));
    }
    let mut config = Config::default();
    config.sync.max_concurrent = 2;
    let generator = Arc::new(Sleepy {
        delay: Duration::from_secs(1),
        ..Sleepy::default()
    });

    let results = manager(&store, config)
        .with_generator(generator.clone())
        .sync_project(ProjectId(1), SyncStrategy::Regenerate, false)
        .await
        .expect("sync project");

    assert_eq!(results.len(), 6);
    assert!(results.iter().all(|r| r.success));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 6);
    assert!(generator.peak.load(Ordering::SeqCst) <= 2);
}

// ---------------------------------------------------------------------------
// resolve_conflict
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resolve_conflict_apply_writes_and_clears_override() {
    let (_home, store) = setup();
    let mut doc = drifted_doc(1, 1);
    doc.manual_override = true;
    seed(&store, &doc);

    let merge = manager(&store, Config::default())
        .resolve_conflict(DocumentId(1), "# Overview\n\nai text", ResolutionStrategy::KeepAi, true)
        .expect("resolve");

    assert!(merge.success);
    let stored = reload(&store, 1);
    assert_eq!(stored.content, "# Overview\n\nai text");
    assert!(!stored.manual_override);
    assert_eq!(stored.baseline_content(), Some("# Overview\n\nai text"));
}

#[tokio::test]
async fn resolve_conflict_keep_manual_keeps_override() {
    let (_home, store) = setup();
    let mut doc = drifted_doc(1, 1);
    doc.manual_override = true;
    seed(&store, &doc);

    manager(&store, Config::default())
        .resolve_conflict(DocumentId(1), "new ai", ResolutionStrategy::KeepManual, true)
        .expect("resolve");

    let stored = reload(&store, 1);
    assert_eq!(stored.content, GENERATED_BEFORE);
    assert!(stored.manual_override);
    assert_eq!(stored.baseline_content(), Some("new ai"));
}

#[tokio::test]
async fn resolve_conflict_preview_does_not_write() {
    let (_home, store) = setup();
    let doc = drifted_doc(1, 1);
    seed(&store, &doc);

    let merge = manager(&store, Config::default())
        .resolve_conflict(DocumentId(1), "# Overview\n\nai", ResolutionStrategy::ThreeWayMerge, false)
        .expect("resolve");

    assert!(merge.success);
    assert_eq!(merge.merged_content, "# Overview\nai");
    assert_eq!(reload(&store, 1), doc);
}
