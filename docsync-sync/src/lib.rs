//! # docsync-sync
//!
//! Document synchronization and conflict resolution engine.
//!
//! Leaves first:
//! - [`parser`] splits markdown into typed [`Section`]s
//! - [`diff`] aligns two section lists into a [`DiffResult`]
//! - [`fingerprint`] hashes content and specification sets
//! - [`drift`] compares a document's `sync_hash` with its specifications
//! - [`staleness`] grades time since the last sync
//! - [`conflict`] detects manual edits against the AI baseline
//! - [`resolver`] applies a [`ResolutionStrategy`], including a three-way merge
//! - [`generator`] is the seam to the external content generator
//! - [`manager`] orchestrates all of the above; [`pipeline`] is its entrypoint

pub mod conflict;
pub mod diff;
pub mod drift;
pub mod error;
pub mod fingerprint;
pub mod generator;
pub mod manager;
pub mod parser;
pub mod pipeline;
pub mod resolver;
pub mod staleness;

pub use conflict::{ConflictDetector, ConflictResult, ConflictStatus, ResolutionStrategy};
pub use diff::{ChangeType, DiffResult, SectionChange, SpecChange};
pub use drift::{DriftDetector, DriftResult, DriftStatus};
pub use error::{GenerationError, SyncError};
pub use generator::{
    cancel_pair, CancelHandle, CancelSignal, CommandGenerator, ContentGenerator,
    GeneratedContent, GenerationContext,
};
pub use manager::{SyncManager, SyncResult, SyncStrategy};
pub use parser::{Section, SectionType};
pub use resolver::{ConflictResolver, MergeDecision, MergeResult};
pub use staleness::{Priority, StalenessChecker, StalenessLevel, StalenessReport, StalenessResult};
