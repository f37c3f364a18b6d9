//! `docsync diff <old> <new>`: section-level diff of two markdown files.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use docsync_sync::{
    diff::{diff_content, render_unified},
    ChangeType, SectionChange,
};

use super::{print_json, read_file};

/// Arguments for `docsync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    pub old: PathBuf,
    pub new: PathBuf,

    /// Print a line-level unified diff instead of the section listing.
    #[arg(long, conflicts_with = "json")]
    pub unified: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let old = read_file(&self.old)?;
        let new = read_file(&self.new)?;

        if self.unified {
            let rendered = render_unified(
                &old,
                &new,
                &format!("a/{}", self.old.display()),
                &format!("b/{}", self.new.display()),
            );
            if rendered.is_empty() {
                println!("No differences.");
                return Ok(());
            }
            print!("{rendered}");
            if !rendered.ends_with('\n') {
                println!();
            }
            return Ok(());
        }

        let result = diff_content(&old, &new);
        if self.json {
            return print_json(&result);
        }
        if !result.has_changes() {
            println!("No differences ({} sections unchanged).", result.unchanged.len());
            return Ok(());
        }

        for change in result.removed.iter().chain(&result.modified).chain(&result.added) {
            print_change(change);
        }
        println!("{}", result.summary());
        Ok(())
    }
}

fn print_change(change: &SectionChange) {
    let (mark, lines) = match change.change_type {
        ChangeType::Added => ("+".green().bold(), change.new_lines),
        ChangeType::Removed => ("-".red().bold(), change.old_lines),
        ChangeType::Modified => ("~".yellow().bold(), change.new_lines),
        ChangeType::Unchanged => (" ".normal(), change.new_lines),
    };
    let at = lines
        .map(|(start, end)| format!(" (lines {start}-{end})"))
        .unwrap_or_default();
    println!(
        "{mark} {}{at}  +{} -{}",
        change.section_name,
        change.additions(),
        change.deletions()
    );
}
