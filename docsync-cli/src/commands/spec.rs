//! `docsync spec put|show|list`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tabled::{settings::Style, Table, Tabled};

use docsync_core::{Specification, SpecificationId, SpecificationStore};
use docsync_sync::fingerprint::content_hash;

use super::{open_workspace, print_json, read_file};

/// Manage source specifications.
#[derive(Subcommand, Debug)]
pub enum SpecCommand {
    /// Create or replace a specification from a file.
    Put(PutArgs),

    /// Print a specification's content.
    Show {
        id: i64,
    },

    /// List all specifications.
    List {
        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct PutArgs {
    pub id: i64,

    /// Version label; part of the drift fingerprint.
    #[arg(long = "version", short = 'v')]
    pub version: String,

    /// File holding the specification content.
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Tabled)]
struct SpecRow {
    #[tabled(rename = "id")]
    id: i64,
    #[tabled(rename = "version")]
    version: String,
    #[tabled(rename = "title")]
    title: String,
    #[tabled(rename = "content hash")]
    hash: String,
}

pub fn run(cmd: SpecCommand) -> Result<()> {
    match cmd {
        SpecCommand::Put(args) => put(args),
        SpecCommand::Show { id } => show(id),
        SpecCommand::List { json } => list(json),
    }
}

fn put(args: PutArgs) -> Result<()> {
    let ws = open_workspace()?;
    let mut spec = Specification::new(SpecificationId(args.id), args.version, read_file(&args.file)?);
    spec.title = args.title;
    ws.store
        .put_spec(&spec)
        .with_context(|| format!("failed to save specification {}", spec.id))?;
    println!("✓ Specification {} saved (version {})", spec.id, spec.version);
    Ok(())
}

fn show(id: i64) -> Result<()> {
    let ws = open_workspace()?;
    let spec = SpecificationStore::get(ws.store.as_ref(), SpecificationId(id))
        .with_context(|| format!("failed to read specification {id}"))?
        .with_context(|| format!("specification {id} not found"))?;
    print!("{}", spec.content);
    if !spec.content.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn list(json: bool) -> Result<()> {
    let ws = open_workspace()?;
    let specs = ws.store.list_specs().context("failed to list specifications")?;
    if json {
        return print_json(&specs);
    }
    if specs.is_empty() {
        println!("No specifications stored.");
        println!("Run: docsync spec put <id> --version <v> --file <path>");
        return Ok(());
    }

    let rows: Vec<SpecRow> = specs
        .iter()
        .map(|s| SpecRow {
            id: s.id.0,
            version: s.version.clone(),
            title: s.title.clone().unwrap_or_default(),
            hash: content_hash(&s.content),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}
