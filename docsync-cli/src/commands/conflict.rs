//! `docsync conflict` and `docsync resolve`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use docsync_core::DocumentId;
use docsync_sync::{ConflictDetector, ConflictStatus, MergeResult};

use super::{open_workspace, print_json, read_file};
use crate::ResolutionArg;

/// Arguments for `docsync conflict`.
#[derive(Args, Debug)]
pub struct ConflictArgs {
    pub id: i64,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl ConflictArgs {
    pub fn run(self) -> Result<()> {
        let ws = open_workspace()?;
        let result = ConflictDetector
            .check(ws.store.as_ref(), DocumentId(self.id))
            .with_context(|| format!("conflict check failed for document {}", self.id))?;
        if self.json {
            return print_json(&result);
        }

        let label = match result.status {
            ConflictStatus::NoConflict => "no conflict".green(),
            ConflictStatus::ManualEditDetected => "manual edits detected".yellow(),
        };
        println!("document {}: {}", result.document_id, label.bold());
        println!("  {}", result.message);
        println!("  recommended: {}", result.recommended);
        Ok(())
    }
}

/// Arguments for `docsync resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    pub id: i64,

    /// File with the new AI-generated content.
    #[arg(long)]
    pub ai_file: PathBuf,

    /// keep-manual, keep-ai, three-way-merge or manual-review.
    #[arg(long, default_value = "three-way-merge")]
    pub strategy: ResolutionArg,

    /// Write the result back when the resolution succeeds.
    #[arg(long)]
    pub apply: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl ResolveArgs {
    pub fn run(self) -> Result<()> {
        let ws = open_workspace()?;
        let ai_content = read_file(&self.ai_file)?;
        let merge = ws
            .manager()
            .resolve_conflict(DocumentId(self.id), &ai_content, self.strategy.0, self.apply)
            .with_context(|| format!("resolve failed for document {}", self.id))?;

        if self.json {
            return print_json(&merge);
        }
        print_merge(self.id, &merge, self.apply);
        Ok(())
    }
}

fn print_merge(id: i64, merge: &MergeResult, apply: bool) {
    let prefix = if apply { "" } else { "[dry-run] " };
    if merge.success {
        let action = if apply { "resolved" } else { "would resolve" };
        println!("{prefix}✓ document {id} {action} with {}", merge.strategy);
    } else if merge.needs_review && merge.conflicts.is_empty() {
        println!("{prefix}✗ document {id} left for manual review");
    } else {
        println!(
            "{prefix}✗ document {id}: {} conflict(s); nothing written",
            merge.conflicts.len()
        );
    }
    println!(
        "  merged {}, manual kept {}, ai kept {}, conflicted {}",
        merge.sections_merged, merge.manual_kept, merge.ai_kept, merge.sections_conflicted
    );
    for conflict in &merge.conflicts {
        println!("  !  {conflict}");
    }
    if !apply && merge.success {
        println!("Re-run with --apply to write the result.");
    }
}
