//! `docsync sync`: regenerate drifted documents.

use anyhow::{bail, Context, Result};
use clap::Args;

use docsync_core::{DocumentId, ProjectId};
use docsync_sync::{
    cancel_pair,
    pipeline::{self, SyncScope},
    SyncResult,
};

use super::{open_workspace, print_json, runtime};
use crate::SyncStrategyArg;

/// Arguments for `docsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Document id to sync (omit when using `--project`).
    pub id: Option<i64>,

    /// Sync every drifted, stale or orphaned document of a project.
    #[arg(long, conflicts_with = "id")]
    pub project: Option<i64>,

    /// skip, manual or regenerate.
    #[arg(long, default_value = "regenerate")]
    pub strategy: SyncStrategyArg,

    /// Report what would happen without generating or writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let scope = match (self.id, self.project) {
            (Some(id), _) => SyncScope::Document(DocumentId(id)),
            (None, Some(project)) => SyncScope::Project(ProjectId(project)),
            (None, None) => bail!("provide a document id or use --project"),
        };

        let ws = open_workspace()?;
        let (cancel, signal) = cancel_pair();
        let manager = ws.manager().with_cancel(signal);
        if !manager.has_generator() && !self.dry_run {
            tracing::warn!("no generator.command configured; regenerate will only flag documents");
        }

        let rt = runtime()?;
        rt.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted; cancelling in-flight generation");
                cancel.cancel();
            }
        });
        let results = rt
            .block_on(pipeline::run(&manager, scope, self.strategy.0, self.dry_run))
            .with_context(|| match scope {
                SyncScope::Document(id) => format!("sync failed for document {id}"),
                SyncScope::Project(id) => format!("sync failed for project {id}"),
            })?;

        if self.json {
            return print_json(&results);
        }
        if results.is_empty() {
            println!("✓ nothing to sync");
            return Ok(());
        }
        for result in &results {
            print_result(result);
        }
        Ok(())
    }
}

fn print_result(result: &SyncResult) {
    let mark = if result.success { "✓" } else { "✗" };
    let review = if result.needs_review { " (needs review)" } else { "" };
    println!("{mark} document {}: {}{review}", result.document_id, result.message);
    for conflict in &result.conflicts {
        println!("  !  {conflict}");
    }
}
