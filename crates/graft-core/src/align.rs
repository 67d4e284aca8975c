//! Alignment engine
//!
//! Diffs a baseline hierarchy against a modified one and reports what the
//! modified side added. Assumes the modified tree was derived from the
//! baseline by inserting or deleting facets and whole subtrees only; renamed
//! or reordered survivors produce an incorrect (but well-formed) result.
//!
//! Siblings sharing a name are matched in order, so inserted or removed
//! duplicates must come after all surviving duplicates.

use std::time::Instant;

use crate::errors::Result;
use crate::model::{AdditionNodeId, AdditionTree, AdditionTreeNode, FacetId, FacetKind, NodeId};
use crate::ops::TreeView;
use crate::{log_op_end, log_op_start};

/// Build the addition tree for `modified_root` relative to `baseline_root`
///
/// The two roots may live in different views (e.g. a baseline materialized
/// from a template) or in the same one.
///
/// # Errors
///
/// Propagates lookup failures from either view.
pub fn find_additions(
    baseline: &dyn TreeView,
    baseline_root: NodeId,
    modified: &dyn TreeView,
    modified_root: NodeId,
) -> Result<AdditionTree> {
    let start = Instant::now();
    log_op_start!("find_additions");

    let mut tree = AdditionTree::with_root(modified_root, modified.node_name(modified_root)?);
    let root = tree.root();
    align_pair(&mut tree, root, baseline, baseline_root, modified, modified_root)?;

    log_op_end!(
        "find_additions",
        duration_ms = start.elapsed().as_millis() as u64,
        additions = tree.addition_count()
    );
    Ok(tree)
}

/// Fill in `id` (already standing for `modified_node`) from one node pair
fn align_pair(
    tree: &mut AdditionTree,
    id: AdditionNodeId,
    baseline: &dyn TreeView,
    baseline_node: NodeId,
    modified: &dyn TreeView,
    modified_node: NodeId,
) -> Result<()> {
    let mut has_additions = false;

    let added = excess_facets(baseline, baseline_node, modified, modified_node)?;
    if !added.is_empty() {
        has_additions = true;
        let name = modified.node_name(modified_node)?;
        tree.push(id, AdditionTreeNode::facet_group(modified_node, name, added))?;
    }

    let base_children = baseline.children(baseline_node)?;
    let mod_children = modified.children(modified_node)?;
    let mut b = 0;
    let mut m = 0;
    while m < mod_children.len() {
        if b >= base_children.len() {
            // Baseline exhausted: everything left is new
            for child in &mod_children[m..] {
                has_additions = true;
                push_subtree(tree, id, modified, *child)?;
            }
            break;
        }

        let base_name = baseline.node_name(base_children[b])?;
        if base_name == modified.node_name(mod_children[m])? {
            let child = mod_children[m];
            let child_id = tree.push(
                id,
                AdditionTreeNode::carried(child, modified.node_name(child)?),
            )?;
            align_pair(tree, child_id, baseline, base_children[b], modified, child)?;
            has_additions |= tree.get(child_id)?.has_additions();
            b += 1;
            m += 1;
            continue;
        }

        let mut next_match = None;
        for (offset, candidate) in mod_children[m + 1..].iter().enumerate() {
            if modified.node_name(*candidate)? == base_name {
                next_match = Some(m + 1 + offset);
                break;
            }
        }
        match next_match {
            Some(found) => {
                // Everything skipped over is an insertion
                for child in &mod_children[m..found] {
                    has_additions = true;
                    push_subtree(tree, id, modified, *child)?;
                }
                m = found;
            }
            // Baseline child was deleted
            None => b += 1,
        }
    }

    tree.get_mut(id)?.has_additions = has_additions;
    Ok(())
}

fn push_subtree(
    tree: &mut AdditionTree,
    parent: AdditionNodeId,
    modified: &dyn TreeView,
    node: NodeId,
) -> Result<AdditionNodeId> {
    tree.push(parent, AdditionTreeNode::subtree(node, modified.node_name(node)?))
}

/// Trailing facets per kind beyond the baseline's count, kinds in first-seen order
fn excess_facets(
    baseline: &dyn TreeView,
    baseline_node: NodeId,
    modified: &dyn TreeView,
    modified_node: NodeId,
) -> Result<Vec<FacetId>> {
    let mut seen: Vec<&FacetKind> = Vec::new();
    let mut added = Vec::new();
    for facet in modified.facets(modified_node)? {
        let kind = modified.facet_kind(*facet)?;
        if seen.contains(&kind) {
            continue;
        }
        seen.push(kind);

        let in_modified = modified.facets_of_kind(modified_node, kind)?;
        let in_baseline = baseline.facets_of_kind(baseline_node, kind)?.len();
        if in_modified.len() > in_baseline {
            added.extend_from_slice(&in_modified[in_baseline..]);
        }
    }
    Ok(added)
}
