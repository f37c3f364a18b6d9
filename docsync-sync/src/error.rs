//! Error types for docsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use docsync_core::{DocumentId, SpecificationId, StoreError};

/// All errors that can arise from sync operations.
///
/// A merge that finds conflicts is not an error; it is reported through
/// [`crate::resolver::MergeResult`]. Generator failures are recorded on the
/// [`crate::manager::SyncResult`] rather than raised.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the document or specification store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("document {id} not found")]
    DocumentNotFound { id: DocumentId },

    #[error("specification {id} not found")]
    SpecificationNotFound { id: SpecificationId },

    /// The request cannot be honoured as asked (e.g. a three-way merge without
    /// a stored baseline). Callers should fall back to manual review.
    #[error("validation error: {0}")]
    Validation(String),
}

/// Failures of the external content generator.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("generation cancelled")]
    Cancelled,

    #[error("generator failed: {0}")]
    Failed(String),

    /// An I/O error, with annotated program for context.
    #[error("I/O error running {program}: {source}")]
    Io {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (generation context).
    #[error("generation context JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`GenerationError::Io`].
pub(crate) fn io_err(program: impl Into<PathBuf>, source: std::io::Error) -> GenerationError {
    GenerationError::Io {
        program: program.into(),
        source,
    }
}
