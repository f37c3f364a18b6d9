//! Structural section diff plus a plain unified text rendering.
//!
//! [`diff`] aligns two section sequences with an LCS opcode matcher keyed on
//! section content; position and identity never take part in matching.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use similar::{capture_diff_slices, Algorithm, DiffTag, TextDiff};

use docsync_core::{Specification, SpecificationId};

use crate::parser::{self, Section, SectionType};

/// Words of content shown in a derived section name.
const NAME_WORDS: usize = 5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
    Unchanged,
}

/// One diff entry. Line counts are derived from content, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionChange {
    pub change_type: ChangeType,
    pub section_name: String,
    pub section_type: SectionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_lines: Option<(usize, usize)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_lines: Option<(usize, usize)>,
}

impl SectionChange {
    fn added(new: &Section) -> Self {
        Self {
            change_type: ChangeType::Added,
            section_name: section_name(new),
            section_type: new.section_type,
            old_content: None,
            new_content: Some(new.content.clone()),
            old_lines: None,
            new_lines: Some((new.line_start, new.line_end)),
        }
    }

    fn removed(old: &Section) -> Self {
        Self {
            change_type: ChangeType::Removed,
            section_name: section_name(old),
            section_type: old.section_type,
            old_content: Some(old.content.clone()),
            new_content: None,
            old_lines: Some((old.line_start, old.line_end)),
            new_lines: None,
        }
    }

    fn paired(change_type: ChangeType, old: &Section, new: &Section) -> Self {
        Self {
            change_type,
            section_name: section_name(new),
            section_type: new.section_type,
            old_content: Some(old.content.clone()),
            new_content: Some(new.content.clone()),
            old_lines: Some((old.line_start, old.line_end)),
            new_lines: Some((new.line_start, new.line_end)),
        }
    }

    pub fn additions(&self) -> usize {
        let old = line_count(self.old_content.as_deref());
        let new = line_count(self.new_content.as_deref());
        match self.change_type {
            ChangeType::Added => new,
            ChangeType::Modified => new.saturating_sub(old),
            ChangeType::Removed | ChangeType::Unchanged => 0,
        }
    }

    pub fn deletions(&self) -> usize {
        let old = line_count(self.old_content.as_deref());
        let new = line_count(self.new_content.as_deref());
        match self.change_type {
            ChangeType::Removed => old,
            ChangeType::Modified => old.saturating_sub(new),
            ChangeType::Added | ChangeType::Unchanged => 0,
        }
    }
}

/// Specification edit that explains part of a document diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecChange {
    pub spec_id: SpecificationId,
    pub change_type: ChangeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_version: Option<String>,
}

/// Partitioned diff entries. Totals are always recomputed from the lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    pub added: Vec<SectionChange>,
    pub removed: Vec<SectionChange>,
    pub modified: Vec<SectionChange>,
    pub unchanged: Vec<SectionChange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spec_changes: Vec<SpecChange>,
}

impl DiffResult {
    pub fn with_spec_changes(mut self, spec_changes: Vec<SpecChange>) -> Self {
        self.spec_changes = spec_changes;
        self
    }

    pub fn total_additions(&self) -> usize {
        self.changed().map(SectionChange::additions).sum()
    }

    pub fn total_deletions(&self) -> usize {
        self.changed().map(SectionChange::deletions).sum()
    }

    pub fn total_modifications(&self) -> usize {
        self.modified.len()
    }

    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty())
    }

    /// One-line summary, e.g. `1 added, 0 removed, 2 modified, 4 unchanged (+3 -1 lines)`.
    pub fn summary(&self) -> String {
        format!(
            "{} added, {} removed, {} modified, {} unchanged (+{} -{} lines)",
            self.added.len(),
            self.removed.len(),
            self.modified.len(),
            self.unchanged.len(),
            self.total_additions(),
            self.total_deletions(),
        )
    }

    fn changed(&self) -> impl Iterator<Item = &SectionChange> {
        self.added
            .iter()
            .chain(self.removed.iter())
            .chain(self.modified.iter())
    }

    fn push(&mut self, change: SectionChange) {
        match change.change_type {
            ChangeType::Added => self.added.push(change),
            ChangeType::Removed => self.removed.push(change),
            ChangeType::Modified => self.modified.push(change),
            ChangeType::Unchanged => self.unchanged.push(change),
        }
    }
}

// ---------------------------------------------------------------------------
// Section diff
// ---------------------------------------------------------------------------

/// Align `old` against `new` and classify every section.
pub fn diff(old: &[Section], new: &[Section]) -> DiffResult {
    let old_keys: Vec<&str> = old.iter().map(|s| s.content.as_str()).collect();
    let new_keys: Vec<&str> = new.iter().map(|s| s.content.as_str()).collect();

    let mut result = DiffResult::default();
    for op in capture_diff_slices(Algorithm::Lcs, &old_keys, &new_keys) {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => {
                for (o, n) in old_range.zip(new_range) {
                    result.push(SectionChange::paired(ChangeType::Unchanged, &old[o], &new[n]));
                }
            }
            DiffTag::Delete => {
                for o in old_range {
                    result.push(SectionChange::removed(&old[o]));
                }
            }
            DiffTag::Insert => {
                for n in new_range {
                    result.push(SectionChange::added(&new[n]));
                }
            }
            DiffTag::Replace => {
                let paired = old_range.len().min(new_range.len());
                for (o, n) in old_range.clone().zip(new_range.clone()) {
                    result.push(SectionChange::paired(ChangeType::Modified, &old[o], &new[n]));
                }
                for o in old_range.skip(paired) {
                    result.push(SectionChange::removed(&old[o]));
                }
                for n in new_range.skip(paired) {
                    result.push(SectionChange::added(&new[n]));
                }
            }
        }
    }
    result
}

/// Parse both documents and diff their sections.
pub fn diff_content(old: &str, new: &str) -> DiffResult {
    diff(&parser::parse(old), &parser::parse(new))
}

/// Display name of a section.
pub fn section_name(section: &Section) -> String {
    match section.section_type {
        SectionType::Header => section
            .header_text
            .clone()
            .unwrap_or_else(|| section.content.trim().to_string()),
        SectionType::CodeBlock => {
            format!("Code Block ({})", section.language.as_deref().unwrap_or("code"))
        }
        other => {
            let mut words = section.content.split_whitespace();
            let preview: Vec<&str> = words.by_ref().take(NAME_WORDS).collect();
            let ellipsis = if words.next().is_some() { "..." } else { "" };
            format!("{}: {}{}", other.display_name(), preview.join(" "), ellipsis)
        }
    }
}

fn line_count(content: Option<&str>) -> usize {
    content.map_or(0, |c| c.lines().count())
}

// ---------------------------------------------------------------------------
// Specification attribution
// ---------------------------------------------------------------------------

/// Compare two snapshots of a document's source specifications by id.
///
/// A spec is Modified when its version or content changed. Output is sorted
/// by spec id; unchanged specs are omitted.
pub fn attribute_spec_changes(old: &[Specification], new: &[Specification]) -> Vec<SpecChange> {
    let old_by_id: BTreeMap<SpecificationId, &Specification> =
        old.iter().map(|s| (s.id, s)).collect();
    let new_by_id: BTreeMap<SpecificationId, &Specification> =
        new.iter().map(|s| (s.id, s)).collect();

    let mut ids: Vec<SpecificationId> = old_by_id.keys().chain(new_by_id.keys()).copied().collect();
    ids.sort();
    ids.dedup();

    ids.into_iter()
        .filter_map(|id| {
            let before = old_by_id.get(&id);
            let after = new_by_id.get(&id);
            let change_type = match (before, after) {
                (None, Some(_)) => ChangeType::Added,
                (Some(_), None) => ChangeType::Removed,
                (Some(b), Some(a)) if b.version != a.version || b.content != a.content => {
                    ChangeType::Modified
                }
                _ => return None,
            };
            Some(SpecChange {
                spec_id: id,
                change_type,
                old_version: before.map(|s| s.version.clone()),
                new_version: after.map(|s| s.version.clone()),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

/// Unified line diff of two documents with three lines of context.
/// Empty when the inputs are identical.
pub fn render_unified(old: &str, new: &str, old_label: &str, new_label: &str) -> String {
    if old == new {
        return String::new();
    }
    TextDiff::from_lines(old, new)
        .unified_diff()
        .header(old_label, new_label)
        .context_radius(3)
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
