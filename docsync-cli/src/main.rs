//! docsync: keep generated documentation in step with its specifications.
//!
//! # Usage
//!
//! ```text
//! docsync spec put <id> --version <v> --file <path> [--title <t>]
//! docsync spec show <id>
//! docsync spec list [--json]
//! docsync track <id> --project <pid> --type <doc-type> --file <path> --spec <id>... [--synced] [--manual]
//! docsync edit <id> --file <path> [--override]
//! docsync status [--project <pid>] [--json]
//! docsync sync <id> [--strategy skip|manual|regenerate] [--dry-run] [--json]
//! docsync sync --project <pid> [--strategy ...] [--dry-run] [--json]
//! docsync diff <old> <new> [--unified] [--json]
//! docsync conflict <id> [--json]
//! docsync resolve <id> --ai-file <path> [--strategy ...] [--apply] [--json]
//! ```
//!
//! Logs go to stderr; `RUST_LOG=debug` for more detail.

mod commands;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    conflict::{ConflictArgs, ResolveArgs},
    diff::DiffArgs,
    spec::SpecCommand,
    status::StatusArgs,
    sync::SyncArgs,
    track::{EditArgs, TrackArgs},
};
use docsync_sync::{ResolutionStrategy, SyncStrategy};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "docsync",
    version,
    about = "Detect drift between documents and specifications, and sync without losing manual edits",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage source specifications.
    Spec {
        #[command(subcommand)]
        command: SpecCommand,
    },

    /// Register a document from a file.
    Track(TrackArgs),

    /// Replace a document's content with a manual edit.
    Edit(EditArgs),

    /// Show drift and staleness across tracked documents.
    Status(StatusArgs),

    /// Sync one document, or every drifted document in a project.
    Sync(SyncArgs),

    /// Section-level diff of two markdown files.
    Diff(DiffArgs),

    /// Check a document for manual edits since the last generation.
    Conflict(ConflictArgs),

    /// Resolve a document against new AI content.
    Resolve(ResolveArgs),
}

// ---------------------------------------------------------------------------
// Shared strategy arguments: parsed from CLI strings, convert to engine types
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `SyncStrategy` from CLI args.
#[derive(Debug, Clone, Copy)]
pub struct SyncStrategyArg(pub SyncStrategy);

impl Default for SyncStrategyArg {
    fn default() -> Self {
        Self(SyncStrategy::Regenerate)
    }
}

impl FromStr for SyncStrategyArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self(SyncStrategy::Skip)),
            "manual" => Ok(Self(SyncStrategy::Manual)),
            "regenerate" => Ok(Self(SyncStrategy::Regenerate)),
            other => Err(format!(
                "unknown sync strategy '{other}'; expected: skip, manual, regenerate"
            )),
        }
    }
}

impl fmt::Display for SyncStrategyArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Thin wrapper so clap can parse `ResolutionStrategy` from CLI args.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionArg(pub ResolutionStrategy);

impl Default for ResolutionArg {
    fn default() -> Self {
        Self(ResolutionStrategy::ThreeWayMerge)
    }
}

impl FromStr for ResolutionArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "keep_manual" => Ok(Self(ResolutionStrategy::KeepManual)),
            "keep_ai" => Ok(Self(ResolutionStrategy::KeepAi)),
            "three_way_merge" | "merge" => Ok(Self(ResolutionStrategy::ThreeWayMerge)),
            "manual_review" => Ok(Self(ResolutionStrategy::ManualReview)),
            other => Err(format!(
                "unknown resolution strategy '{other}'; expected: keep-manual, keep-ai, three-way-merge, manual-review"
            )),
        }
    }
}

impl fmt::Display for ResolutionArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Spec { command } => commands::spec::run(command),
        Commands::Track(args) => args.run(),
        Commands::Edit(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Conflict(args) => args.run(),
        Commands::Resolve(args) => args.run(),
    }
}

/// stderr so that `--json` output on stdout stays machine-readable.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_args_parse_case_insensitively() {
        assert_eq!("Regenerate".parse::<SyncStrategyArg>().map(|s| s.0), Ok(SyncStrategy::Regenerate));
        assert_eq!(
            "keep-ai".parse::<ResolutionArg>().map(|s| s.0),
            Ok(ResolutionStrategy::KeepAi)
        );
        assert_eq!(
            "three_way_merge".parse::<ResolutionArg>().map(|s| s.0),
            Ok(ResolutionStrategy::ThreeWayMerge)
        );
        assert!("overwrite".parse::<SyncStrategyArg>().is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
