//! Subcommand implementations and the helpers they share.

pub mod conflict;
pub mod diff;
pub mod spec;
pub mod status;
pub mod sync;
pub mod track;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use docsync_core::{config, Config, Document, DocumentId, DocumentStore, FileStore};
use docsync_sync::{CommandGenerator, SyncManager};

/// Home-rooted store plus loaded configuration.
pub(crate) struct Workspace {
    pub store: Arc<FileStore>,
    pub config: Config,
}

pub(crate) fn open_workspace() -> Result<Workspace> {
    let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
    let config = config::load_at(&home)
        .with_context(|| format!("failed to load {}", config::config_path_at(&home).display()))?;
    tracing::debug!("docsync home: {}", home.display());
    Ok(Workspace {
        store: Arc::new(FileStore::at(&home)),
        config,
    })
}

impl Workspace {
    /// Sync manager over the file store, with the configured generator
    /// command when there is one.
    pub fn manager(&self) -> SyncManager {
        let manager = SyncManager::new(self.store.clone(), self.store.clone(), self.config.clone());
        match CommandGenerator::from_config(&self.config.generator) {
            Some(generator) => {
                tracing::debug!("content generator: {}", generator.program());
                manager.with_generator(Arc::new(generator))
            }
            None => manager,
        }
    }
}

pub(crate) fn load_document(store: &FileStore, id: i64) -> Result<Document> {
    DocumentStore::get(store, DocumentId(id))
        .with_context(|| format!("failed to read document {id}"))?
        .with_context(|| format!("document {id} not found; track it with `docsync track` first"))
}

pub(crate) fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize JSON output")?
    );
    Ok(())
}

/// Multi-threaded runtime for the async sync engine.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")
}
