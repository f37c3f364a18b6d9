//! Domain types for documents and the specifications they are derived from.
//!
//! Ids are integer newtypes so that specification ordering (which feeds the
//! drift fingerprint) is numeric, never lexicographic.
//! All types are serializable/deserializable via serde + serde_yaml.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

id_newtype!(
    /// Identifier of a generated (or hand-written) document.
    DocumentId
);
id_newtype!(
    /// Identifier of a source specification.
    SpecificationId
);
id_newtype!(
    /// Identifier of the project a document belongs to.
    ProjectId
);

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Who produced the current document content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GeneratedBy {
    #[default]
    Ai,
    Manual,
}

impl fmt::Display for GeneratedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratedBy::Ai => write!(f, "ai"),
            GeneratedBy::Manual => write!(f, "manual"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// Snapshot of the last AI-generated version of a document.
///
/// `Option<AiBaseline>` on [`Document`] separates "never recorded" from a
/// recorded baseline; `content: Some(String::new())` is a real, empty
/// baseline. Older stores may carry the hash alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiBaseline {
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// A source specification. Only `id`, `version` and `content` feed the
/// drift fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specification {
    pub id: SpecificationId,
    pub version: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Specification {
    pub fn new(id: SpecificationId, version: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            version: version.into(),
            content: content.into(),
            title: None,
        }
    }
}

/// A document kept in sync with one or more specifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub project_id: ProjectId,
    /// Kind of document ("architecture", "api", ...); selects the generator prompt.
    pub doc_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Fingerprint of the source specifications as of the last successful sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_baseline: Option<AiBaseline>,
    #[serde(default)]
    pub manual_override: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_manual_edit_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Ordered; the first specification that still exists is the primary source.
    #[serde(default)]
    pub based_on_spec_ids: Vec<SpecificationId>,
    #[serde(default)]
    pub generated_by: GeneratedBy,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// A fresh, never-synced document.
    pub fn new(
        id: DocumentId,
        project_id: ProjectId,
        doc_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            project_id,
            doc_type: doc_type.into(),
            title: String::new(),
            content: content.into(),
            sync_hash: None,
            ai_baseline: None,
            manual_override: false,
            last_manual_edit_at: None,
            last_synced_at: None,
            based_on_spec_ids: Vec::new(),
            generated_by: GeneratedBy::Ai,
            created_at: now,
            updated_at: now,
        }
    }

    /// Baseline content, when one was recorded with its content.
    pub fn baseline_content(&self) -> Option<&str> {
        self.ai_baseline.as_ref().and_then(|b| b.content.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
