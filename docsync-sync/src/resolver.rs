//! Conflict resolution, including the positional three-way merge.
//!
//! The merge walks baseline, manual (current) and new-AI sections by
//! position, not by content. A section inserted near the top of one side
//! shifts every later comparison and can surface spurious conflicts; callers
//! get `merged_content` regardless so they can render a redline.

use serde::{Deserialize, Serialize};

use docsync_core::Document;

use crate::{
    conflict::ResolutionStrategy,
    diff::section_name,
    fingerprint::content_hash,
    parser::{self, Section},
    SyncError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    pub success: bool,
    pub needs_review: bool,
    pub strategy: ResolutionStrategy,
    /// Always populated, even when conflicts remain.
    pub merged_content: String,
    pub conflicts: Vec<String>,
    pub sections_merged: usize,
    pub sections_conflicted: usize,
    pub manual_kept: usize,
    pub ai_kept: usize,
}

impl MergeResult {
    fn trivial(strategy: ResolutionStrategy, content: &str) -> Self {
        Self {
            success: true,
            needs_review: false,
            strategy,
            merged_content: content.to_string(),
            conflicts: Vec::new(),
            sections_merged: 0,
            sections_conflicted: 0,
            manual_kept: 0,
            ai_kept: 0,
        }
    }

    /// Sum of the four position counters.
    pub fn sections_emitted(&self) -> usize {
        self.sections_merged + self.sections_conflicted + self.manual_kept + self.ai_kept
    }
}

/// Outcome at one merge position, given which sides have a section there
/// and how their hashes compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// Gone from both manual and AI.
    Drop,
    /// Only the AI side has a section here.
    AiAddition,
    /// AI removed a section the manual side left untouched. Kept, flagged.
    RemovedByAi,
    /// Only the manual side has a section here, and it differs from baseline.
    ManualAddition,
    /// Manual and AI agree.
    Agree,
    /// Only AI changed the baseline.
    AiChanged,
    /// Only manual changed the baseline.
    ManualChanged,
    /// Both changed the baseline differently. Manual is kept, flagged.
    Conflict,
}

impl MergeDecision {
    /// Decide from the content hashes at one position (`None` = no section).
    pub fn decide(base: Option<&str>, manual: Option<&str>, ai: Option<&str>) -> Self {
        match (base, manual, ai) {
            (_, None, None) => MergeDecision::Drop,
            (_, None, Some(_)) => MergeDecision::AiAddition,
            (Some(b), Some(m), None) if b == m => MergeDecision::RemovedByAi,
            (_, Some(_), None) => MergeDecision::ManualAddition,
            (_, Some(m), Some(a)) if m == a => MergeDecision::Agree,
            (Some(b), Some(m), Some(_)) if b == m => MergeDecision::AiChanged,
            (Some(b), Some(_), Some(a)) if b == a => MergeDecision::ManualChanged,
            (_, Some(_), Some(_)) => MergeDecision::Conflict,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictResolver;

impl ConflictResolver {
    /// Apply `strategy` to `document`'s current content and `new_ai_content`.
    ///
    /// `ThreeWayMerge` needs a stored baseline with content; without one this
    /// returns [`SyncError::Validation`] and the caller should fall back to
    /// manual review.
    pub fn resolve(
        &self,
        document: &Document,
        new_ai_content: &str,
        strategy: ResolutionStrategy,
    ) -> Result<MergeResult, SyncError> {
        let result = match strategy {
            ResolutionStrategy::KeepManual => MergeResult::trivial(strategy, &document.content),
            ResolutionStrategy::KeepAi => MergeResult::trivial(strategy, new_ai_content),
            ResolutionStrategy::ManualReview => MergeResult {
                success: false,
                needs_review: true,
                ..MergeResult::trivial(strategy, &document.content)
            },
            ResolutionStrategy::ThreeWayMerge => {
                let baseline = document.baseline_content().ok_or_else(|| {
                    SyncError::Validation(format!(
                        "document {}: three-way merge requires a stored AI baseline; use manual review",
                        document.id
                    ))
                })?;
                three_way_merge(baseline, &document.content, new_ai_content)
            }
        };
        tracing::debug!(
            "document {}: {} -> success={} conflicts={}",
            document.id,
            strategy,
            result.success,
            result.conflicts.len()
        );
        Ok(result)
    }
}

/// Positional three-way merge of baseline, manual and AI content.
pub fn three_way_merge(baseline: &str, manual: &str, ai: &str) -> MergeResult {
    let base = parser::parse(baseline);
    let mine = parser::parse(manual);
    let theirs = parser::parse(ai);
    let positions = base.len().max(mine.len()).max(theirs.len());

    let mut result = MergeResult::trivial(ResolutionStrategy::ThreeWayMerge, "");
    let mut emitted: Vec<&str> = Vec::with_capacity(positions);

    for p in 0..positions {
        let b = base.get(p);
        let m = mine.get(p);
        let a = theirs.get(p);
        let (hb, hm, ha) = (hash_of(b), hash_of(m), hash_of(a));

        let decision = MergeDecision::decide(hb.as_deref(), hm.as_deref(), ha.as_deref());
        let chosen = match decision {
            MergeDecision::Drop => None,
            MergeDecision::AiAddition | MergeDecision::AiChanged => {
                result.ai_kept += 1;
                a
            }
            MergeDecision::ManualAddition | MergeDecision::ManualChanged => {
                result.manual_kept += 1;
                m
            }
            MergeDecision::Agree => {
                result.sections_merged += 1;
                m
            }
            MergeDecision::RemovedByAi | MergeDecision::Conflict => {
                let reason = if decision == MergeDecision::RemovedByAi {
                    "removed by AI but unchanged in manual version"
                } else {
                    "changed in both manual and AI versions"
                };
                let name = m.map(section_name).unwrap_or_default();
                result.sections_conflicted += 1;
                result
                    .conflicts
                    .push(format!("section {} ({name}): {reason}", p + 1));
                m
            }
        };
        if let Some(section) = chosen {
            emitted.push(&section.content);
        }
    }

    result.merged_content = emitted.join("\n");
    result.success = result.conflicts.is_empty();
    result.needs_review = !result.success;
    result
}

fn hash_of(section: Option<&Section>) -> Option<String> {
    section.map(|s| content_hash(&s.content))
}
