use serde::{Deserialize, Serialize};

use crate::model::ConflictMode;

/// Settings threaded explicitly into a merge
///
/// Every field has a default, so a partial configuration file is valid.
///
/// ```toml
/// default_conflict_mode = "keep_src"
/// run_hooks = false
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Resolution assigned to a newly detected conflict
    pub default_conflict_mode: ConflictMode,
    /// Mode used by the merge when a facet kind has no resolution at all
    pub unspecified_conflict_mode: ConflictMode,
    /// Run post-merge hooks on merged facets
    pub run_hooks: bool,
    /// Rewrite references into the source hierarchy after the merge
    pub fix_references: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            default_conflict_mode: ConflictMode::ModifyDest,
            unspecified_conflict_mode: ConflictMode::KeepBoth,
            run_hooks: true,
            fix_references: true,
        }
    }
}
