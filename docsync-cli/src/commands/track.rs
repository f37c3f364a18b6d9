//! `docsync track` and `docsync edit`: put documents into the store.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;

use docsync_core::{
    AiBaseline, Document, DocumentId, DocumentStore, GeneratedBy, ProjectId, SpecificationId,
};
use docsync_sync::{fingerprint::content_hash, DriftDetector};

use super::{load_document, open_workspace, read_file};

/// Arguments for `docsync track`.
#[derive(Args, Debug)]
pub struct TrackArgs {
    pub id: i64,

    #[arg(long)]
    pub project: i64,

    /// Document kind ("architecture", "api", ...).
    #[arg(long = "type")]
    pub doc_type: String,

    /// File holding the current document content.
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    #[arg(long)]
    pub title: Option<String>,

    /// Source specification id; repeat for several.
    #[arg(long = "spec")]
    pub specs: Vec<i64>,

    /// Record the content as freshly generated from the current specifications.
    #[arg(long)]
    pub synced: bool,

    /// The document is hand-written; regeneration never touches it.
    #[arg(long, conflicts_with = "synced")]
    pub manual: bool,
}

impl TrackArgs {
    pub fn run(self) -> Result<()> {
        let ws = open_workspace()?;
        let id = DocumentId(self.id);
        let existing = DocumentStore::get(ws.store.as_ref(), id)
            .with_context(|| format!("failed to read document {id}"))?;

        let mut doc = Document::new(id, ProjectId(self.project), self.doc_type, read_file(&self.file)?);
        if let Some(previous) = existing {
            if previous.project_id != doc.project_id {
                bail!(
                    "document {id} is already tracked in project {}",
                    previous.project_id
                );
            }
            doc.created_at = previous.created_at;
        }
        doc.title = self.title.unwrap_or_default();
        doc.based_on_spec_ids = self.specs.into_iter().map(SpecificationId).collect();
        if self.manual {
            doc.generated_by = GeneratedBy::Manual;
        }

        if self.synced {
            let specs = DriftDetector::new(ws.store.as_ref())
                .resolve_specs(&doc.based_on_spec_ids)
                .context("failed to resolve specifications")?;
            if !specs.missing.is_empty() {
                tracing::warn!("document {id}: missing specifications {:?}", specs.missing);
            }
            doc.sync_hash = Some(specs.fingerprint());
            doc.ai_baseline = Some(AiBaseline {
                hash: content_hash(&doc.content),
                content: Some(doc.content.clone()),
            });
            doc.last_synced_at = Some(doc.updated_at);
        }

        ws.store
            .update(&doc)
            .with_context(|| format!("failed to save document {id}"))?;
        let state = if self.synced { "synced" } else { "unsynced" };
        println!("✓ Document {id} tracked in project {} ({state})", doc.project_id);
        Ok(())
    }
}

/// Arguments for `docsync edit`.
#[derive(Args, Debug)]
pub struct EditArgs {
    pub id: i64,

    /// File holding the edited content.
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    /// Protect the edit from regeneration until resolved.
    #[arg(long = "override")]
    pub manual_override: bool,
}

impl EditArgs {
    pub fn run(self) -> Result<()> {
        let ws = open_workspace()?;
        let mut doc = load_document(&ws.store, self.id)?;
        let now = Utc::now();
        doc.content = read_file(&self.file)?;
        doc.last_manual_edit_at = Some(now);
        doc.updated_at = now;
        doc.manual_override |= self.manual_override;

        ws.store
            .update(&doc)
            .with_context(|| format!("failed to save document {}", doc.id))?;
        let note = if doc.manual_override { " (manual override)" } else { "" };
        println!("✓ Document {} updated{note}", doc.id);
        Ok(())
    }
}
