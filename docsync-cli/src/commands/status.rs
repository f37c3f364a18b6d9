//! `docsync status`: drift and staleness visibility.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use docsync_core::{Document, DocumentStore, ProjectId};
use docsync_sync::{DriftDetector, DriftStatus, StalenessChecker, StalenessLevel, StalenessReport};

use super::{open_workspace, print_json, Workspace};

/// Arguments for `docsync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Filter to a single project id.
    #[arg(long)]
    pub project: Option<i64>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let ws = open_workspace()?;
        let mut projects = ws.store.list_projects().context("failed to list projects")?;
        if let Some(filter) = self.project {
            projects.retain(|p| p.0 == filter);
        }

        let report = build_report(&ws, &projects)?;
        if self.json {
            return print_json(&report);
        }
        print_table(&report);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    summary: StatusSummary,
    projects: Vec<ProjectStatus>,
}

#[derive(Debug, Serialize)]
struct StatusSummary {
    projects: usize,
    documents: usize,
    needs_sync: usize,
    needs_review: usize,
}

#[derive(Debug, Serialize)]
struct ProjectStatus {
    project_id: ProjectId,
    staleness: StalenessCounts,
    documents: Vec<DocumentStatus>,
}

#[derive(Debug, Serialize)]
struct StalenessCounts {
    fresh: usize,
    aging: usize,
    stale: usize,
    very_stale: usize,
    never_synced: usize,
}

impl From<&StalenessReport> for StalenessCounts {
    fn from(r: &StalenessReport) -> Self {
        Self {
            fresh: r.fresh,
            aging: r.aging,
            stale: r.stale,
            very_stale: r.very_stale,
            never_synced: r.never_synced,
        }
    }
}

#[derive(Debug, Serialize)]
struct DocumentStatus {
    id: i64,
    title: String,
    doc_type: String,
    drift: DriftStatus,
    staleness: StalenessLevel,
    detail: String,
    last_sync_age: String,
    manual_override: bool,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "id")]
    id: i64,
    #[tabled(rename = "document")]
    document: String,
    #[tabled(rename = "drift")]
    drift: String,
    #[tabled(rename = "staleness")]
    staleness: String,
    #[tabled(rename = "detail")]
    detail: String,
    #[tabled(rename = "last sync")]
    last_sync: String,
}

fn build_report(ws: &Workspace, projects: &[ProjectId]) -> Result<StatusReport> {
    let detector = DriftDetector::new(ws.store.as_ref());
    let checker = StalenessChecker::new(ws.config.staleness);
    let threshold = ws.config.drift.staleness_threshold_days;

    let mut rows = Vec::new();
    let (mut documents, mut needs_sync, mut needs_review) = (0, 0, 0);
    for &project_id in projects {
        let docs = ws
            .store
            .list_by_project(project_id)
            .with_context(|| format!("failed to load documents for project {project_id}"))?;
        let staleness = checker.check_all(&docs);

        let mut statuses = Vec::with_capacity(docs.len());
        for (doc, stale) in docs.iter().zip(&staleness.results) {
            let drift = detector
                .check(doc, threshold)
                .with_context(|| format!("drift check failed for document {}", doc.id))?;
            if drift.needs_regeneration() {
                needs_sync += 1;
            }
            statuses.push(DocumentStatus {
                id: doc.id.0,
                title: display_title(doc),
                doc_type: doc.doc_type.clone(),
                drift: drift.status,
                staleness: stale.level,
                detail: drift.message,
                last_sync_age: stale.age.clone().unwrap_or_else(|| "never".to_string()),
                manual_override: doc.manual_override,
            });
        }

        documents += docs.len();
        needs_review += staleness.needs_review();
        rows.push(ProjectStatus {
            project_id,
            staleness: StalenessCounts::from(&staleness),
            documents: statuses,
        });
    }

    Ok(StatusReport {
        summary: StatusSummary {
            projects: rows.len(),
            documents,
            needs_sync,
            needs_review,
        },
        projects: rows,
    })
}

fn display_title(doc: &Document) -> String {
    if doc.title.is_empty() {
        doc.doc_type.clone()
    } else {
        doc.title.clone()
    }
}

fn print_table(report: &StatusReport) {
    println!(
        "docsync v{} | {} projects | {} documents | {} need sync",
        env!("CARGO_PKG_VERSION"),
        report.summary.projects,
        report.summary.documents,
        report.summary.needs_sync,
    );

    if report.projects.is_empty() {
        println!("No documents tracked.");
        return;
    }

    let separator = "■".repeat(67).bright_black().to_string();
    println!("{separator}");
    println!(
        "Indicators: {} IN SYNC  {} DRIFTED  {} STALE  {} MISSING HASH  {} ORPHANED",
        drift_indicator(DriftStatus::InSync),
        drift_indicator(DriftStatus::Drifted),
        drift_indicator(DriftStatus::Stale),
        drift_indicator(DriftStatus::MissingHash),
        drift_indicator(DriftStatus::Orphaned),
    );
    println!("{separator}");

    for project in &report.projects {
        let s = &project.staleness;
        println!(
            "{}  {} fresh, {} aging, {} stale, {} very stale, {} never synced",
            format!("PROJECT {}", project.project_id).bold(),
            s.fresh,
            s.aging,
            s.stale,
            s.very_stale,
            s.never_synced,
        );
        let rows: Vec<StatusTableRow> = project
            .documents
            .iter()
            .map(|d| StatusTableRow {
                id: d.id,
                document: if d.manual_override {
                    format!("{} (override)", d.title)
                } else {
                    d.title.clone()
                },
                drift: format!("{} {}", drift_indicator(d.drift), drift_label(d.drift)),
                staleness: d.staleness.to_string(),
                detail: d.detail.clone(),
                last_sync: d.last_sync_age.clone(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        println!("{separator}");
    }

    if report.summary.needs_sync > 0 {
        println!("Run 'docsync sync --project <id>' to update drifted documents.");
    }
}

fn drift_label(status: DriftStatus) -> &'static str {
    match status {
        DriftStatus::InSync => "IN SYNC",
        DriftStatus::Drifted => "DRIFTED",
        DriftStatus::Stale => "STALE",
        DriftStatus::MissingHash => "MISSING HASH",
        DriftStatus::Orphaned => "ORPHANED",
    }
}

fn drift_indicator(status: DriftStatus) -> String {
    match status {
        DriftStatus::InSync => "■".green().bold().to_string(),
        DriftStatus::Drifted => "■".red().bold().to_string(),
        DriftStatus::Stale => "■".yellow().bold().to_string(),
        DriftStatus::MissingHash => "■".bright_black().bold().to_string(),
        DriftStatus::Orphaned => "■".magenta().bold().to_string(),
    }
}
