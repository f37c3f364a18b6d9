//! Shared sync entrypoint used by the CLI.

use crate::manager::{SyncManager, SyncResult, SyncStrategy};
use crate::SyncError;
use docsync_core::{DocumentId, ProjectId};

/// Scope for a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncScope {
    /// One document, whatever its drift status.
    Document(DocumentId),
    /// Every document of a project that needs regeneration.
    Project(ProjectId),
}

/// Run the sync pipeline for a scope.
pub async fn run(
    manager: &SyncManager,
    scope: SyncScope,
    strategy: SyncStrategy,
    dry_run: bool,
) -> Result<Vec<SyncResult>, SyncError> {
    match scope {
        SyncScope::Document(id) => Ok(vec![manager.sync_document(id, strategy, dry_run).await?]),
        SyncScope::Project(id) => manager.sync_project(id, strategy, dry_run).await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use docsync_core::{Config, Document, DocumentStore, MemoryStore};

    use super::*;

    #[tokio::test]
    async fn empty_project_returns_empty_vec() {
        let store = Arc::new(MemoryStore::new());
        let manager = SyncManager::new(store.clone(), store, Config::default());
        let result = run(&manager, SyncScope::Project(ProjectId(1)), SyncStrategy::Skip, true)
            .await
            .expect("run");
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn single_document_returns_single_result() {
        let store = Arc::new(MemoryStore::new());
        store
            .update(&Document::new(DocumentId(3), ProjectId(1), "api", "text"))
            .expect("seed");
        let manager = SyncManager::new(store.clone(), store, Config::default());
        let result = run(&manager, SyncScope::Document(DocumentId(3)), SyncStrategy::Skip, true)
            .await
            .expect("run");
        assert_eq!(result.len(), 1);
        assert!(result[0].dry_run);
    }

    #[tokio::test]
    async fn project_scope_skips_documents_without_hash() {
        let store = Arc::new(MemoryStore::new());
        store
            .update(&Document::new(DocumentId(4), ProjectId(2), "api", "text"))
            .expect("seed");
        let manager = SyncManager::new(store.clone(), store, Config::default());
        // MissingHash is not a regeneration candidate.
        let result = run(&manager, SyncScope::Project(ProjectId(2)), SyncStrategy::Regenerate, false)
            .await
            .expect("run");
        assert!(result.is_empty());
    }
}
