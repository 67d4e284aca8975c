//! End-to-end pipeline: merge, then hooks, then reference fixup

use std::time::Instant;

use graft_core_types::RequestContext;
use tracing::info;

use crate::config::MergeConfig;
use crate::errors::{GraftError, Result};
use crate::fixup::{fix_references, FixupReport};
use crate::hooks::{collect_hooks, invoke_hooks, HookDiscovery, HookReport};
use crate::merge::merge_additions;
use crate::model::{AdditionTree, RemapTable};
use crate::ops::TreeEdit;
use crate::{log_op_end, log_op_error, log_op_start};

#[derive(Debug, Clone, Default)]
pub struct ReplaceOutcome {
    pub remap: RemapTable,
    pub hooks: HookReport,
    pub fixup: FixupReport,
}

/// Merge `tree` into the document and repair references
///
/// The tree is consumed; rebuild it with
/// [`find_additions`](crate::align::find_additions) for another merge.
/// Conflict resolutions are taken from the tree as-is, so callers that want
/// detected conflicts to default to `config.default_conflict_mode` should
/// call [`AdditionTree::refresh_conflicts`] first.
///
/// # Errors
///
/// Any merge error. Hook failures and unfixed references are reported in
/// the outcome instead.
pub fn replace<D: TreeEdit>(
    doc: &mut D,
    tree: AdditionTree,
    config: &MergeConfig,
    hooks: &dyn HookDiscovery,
) -> Result<ReplaceOutcome> {
    let ctx = RequestContext::new();
    let start = Instant::now();
    log_op_start!("replace", request_id = %ctx.request_id);

    match run(doc, tree, config, hooks) {
        Ok(outcome) => {
            log_op_end!(
                "replace",
                duration_ms = start.elapsed().as_millis() as u64,
                request_id = %ctx.request_id,
                remap_len = outcome.remap.len(),
                fixed = outcome.fixup.fixed.len(),
                unfixed = outcome.fixup.unfixed.len()
            );
            Ok(outcome)
        }
        Err(err) => {
            log_op_error!(
                "replace",
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            Err(err)
        }
    }
}

fn run<D: TreeEdit>(
    doc: &mut D,
    tree: AdditionTree,
    config: &MergeConfig,
    hooks: &dyn HookDiscovery,
) -> Result<ReplaceOutcome> {
    let root = tree.get(tree.root())?;
    let source_root = root.owner();
    let root_target = root.remap_target().ok_or(GraftError::RootTargetMissing)?;

    let merged = merge_additions(doc, tree, config)?;

    let hook_report = if config.run_hooks {
        let pending = collect_hooks(hooks, &*doc, &merged.merged_facets)?;
        invoke_hooks(doc, pending)
    } else {
        info!(merged_facets = merged.merged_facets.len(), "hooks disabled");
        HookReport::default()
    };

    let fixup = if config.fix_references {
        fix_references(doc, root_target, source_root, &merged.remap)?
    } else {
        FixupReport::default()
    };

    Ok(ReplaceOutcome {
        remap: merged.remap,
        hooks: hook_report,
        fixup,
    })
}
