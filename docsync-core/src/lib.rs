//! docsync core library: domain types, store contracts, persistence, config.
//!
//! Public API surface:
//! - [`types`]: id newtypes, [`Document`], [`Specification`]
//! - [`error`]: [`StoreError`]
//! - [`store`]: [`DocumentStore`] / [`SpecificationStore`] plus the
//!   YAML-backed [`FileStore`] and the in-memory [`MemoryStore`]
//! - [`config`]: [`Config`] loaded from `~/.docsync/config.yaml`

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::{Config, StalenessThresholds};
pub use error::StoreError;
pub use store::{DocumentStore, FileStore, MemoryStore, SpecificationStore};
pub use types::{
    AiBaseline, Document, DocumentId, GeneratedBy, ProjectId, Specification, SpecificationId,
};
