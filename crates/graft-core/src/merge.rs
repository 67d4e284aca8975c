//! Merge engine
//!
//! Walks a consumed [`AdditionTree`] and applies its additions to the
//! destination: facet groups are copied onto their targets under the chosen
//! conflict mode, whole subtrees are duplicated and attached. Every identity
//! touched is recorded in a [`RemapTable`] for reference fixup.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use tracing::debug;

use crate::config::MergeConfig;
use crate::errors::{GraftError, Result};
use crate::model::{
    AdditionKind, AdditionTree, AdditionTreeNode, ConflictMode, FacetId, FacetKind, NodeId,
    RemapTable,
};
use crate::ops::TreeEdit;
use crate::{log_op_end, log_op_start};

/// A destination facet created or overwritten by the merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedFacet {
    pub facet: FacetId,
    /// Modified-tree node the facet's data came from
    pub original_node: NodeId,
}

#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub remap: RemapTable,
    /// Hook candidates in merge order
    pub merged_facets: Vec<MergedFacet>,
    /// Roots of the duplicated subtrees, as attached in the destination
    pub attached_subtrees: Vec<NodeId>,
    /// Facets copied out of facet groups (subtree facets not counted)
    pub copied_facets: usize,
}

/// Apply every addition in `tree` to its remap target
///
/// Additions without a target are skipped. Nothing is mutated unless the
/// root has a target and every addition target lies within it. A failure
/// after that point aborts the merge without undoing nodes already merged.
///
/// # Errors
///
/// * `RootTargetMissing` / `TargetOutsideRoot` - preflight failed
/// * `DuplicateMismatch` - a duplicated subtree does not line up with its original
/// * any tree-provider error raised by a mutation
pub fn merge_additions(
    doc: &mut dyn TreeEdit,
    mut tree: AdditionTree,
    config: &MergeConfig,
) -> Result<MergeOutcome> {
    let start = Instant::now();
    log_op_start!("merge_additions", additions = tree.addition_count());

    preflight(doc, &tree)?;

    let mut outcome = MergeOutcome::default();
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        merge_node(doc, tree.get_mut(id)?, config, &mut outcome)?;

        let node = tree.get(id)?;
        if node.has_additions() {
            // Reversed so siblings pop in source order
            stack.extend(node.children().iter().rev());
        }
    }

    log_op_end!(
        "merge_additions",
        duration_ms = start.elapsed().as_millis() as u64,
        remap_len = outcome.remap.len(),
        merged_facets = outcome.merged_facets.len()
    );
    Ok(outcome)
}

fn preflight(doc: &dyn TreeEdit, tree: &AdditionTree) -> Result<()> {
    let root_target = tree
        .get(tree.root())?
        .remap_target()
        .ok_or(GraftError::RootTargetMissing)?;
    doc.node_name(root_target)?;

    for (_, node) in tree.iter() {
        let Some(target) = node.remap_target() else {
            continue;
        };
        if node.is_addition() && !doc.is_within(target, root_target)? {
            return Err(GraftError::TargetOutsideRoot {
                addition: node.name().to_string(),
                target: doc.node_path(target)?,
                root: doc.node_path(root_target)?,
            });
        }
    }
    Ok(())
}

fn merge_node(
    doc: &mut dyn TreeEdit,
    node: &mut AdditionTreeNode,
    config: &MergeConfig,
    outcome: &mut MergeOutcome,
) -> Result<()> {
    let Some(target) = node.remap_target else {
        if node.is_addition() {
            debug!(node = %node.owner, name = %node.name, "addition has no target, skipped");
        }
        return Ok(());
    };

    match &node.kind {
        AdditionKind::Carried => {
            outcome.remap.insert(node.owner, target);
        }
        AdditionKind::FacetGroup { facets } => {
            copy_facets(
                doc,
                node.owner,
                facets,
                target,
                &mut node.conflict_resolutions,
                config,
                outcome,
            )?;
        }
        AdditionKind::Subtree => {
            let duplicate = doc.duplicate_subtree(node.owner)?;
            doc.reparent(duplicate, target)?;
            record_lockstep(doc, node.owner, duplicate, outcome)?;
            outcome.attached_subtrees.push(duplicate);
        }
    }
    Ok(())
}

fn copy_facets(
    doc: &mut dyn TreeEdit,
    owner: NodeId,
    facets: &[FacetId],
    target: NodeId,
    resolutions: &mut BTreeMap<FacetKind, ConflictMode>,
    config: &MergeConfig,
    outcome: &mut MergeOutcome,
) -> Result<()> {
    // Existing target facets per kind, and how many ModifyDest has consumed
    let mut reusable: HashMap<FacetKind, (Vec<FacetId>, usize)> = HashMap::new();

    for &source in facets {
        let kind = doc.facet_kind(source)?.clone();
        let mode = resolutions
            .get(&kind)
            .copied()
            .unwrap_or(config.unspecified_conflict_mode);
        outcome.remap.record_policy(owner, &kind, mode);

        let chosen = match mode {
            ConflictMode::KeepBoth => Some(doc.add_facet(target, &kind)?),
            ConflictMode::KeepDest => None,
            ConflictMode::KeepSrc => {
                for existing in doc.facets_of_kind(target, &kind)? {
                    doc.destroy_facet(existing)?;
                }
                // Further facets of this kind append instead of destroying again
                resolutions.insert(kind.clone(), ConflictMode::KeepBoth);
                Some(doc.add_facet(target, &kind)?)
            }
            ConflictMode::ModifyDest => {
                let (existing, used) = match reusable.entry(kind.clone()) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => entry.insert((doc.facets_of_kind(target, &kind)?, 0)),
                };
                let facet = match existing.get(*used) {
                    Some(facet) => *facet,
                    None => doc.add_facet(target, &kind)?,
                };
                *used += 1;
                Some(facet)
            }
        };

        if let Some(destination) = chosen {
            doc.copy_facet_value(source, destination)?;
            outcome.remap.insert(source, destination);
            outcome.merged_facets.push(MergedFacet {
                facet: destination,
                original_node: owner,
            });
            outcome.copied_facets += 1;
        }
    }
    Ok(())
}

/// Walk original and duplicate together, mapping every node and facet
fn record_lockstep(
    doc: &dyn TreeEdit,
    original: NodeId,
    duplicate: NodeId,
    outcome: &mut MergeOutcome,
) -> Result<()> {
    let mismatch = |position: NodeId, reason: String| -> Result<GraftError> {
        Ok(GraftError::DuplicateMismatch {
            original: original.to_string(),
            position: doc.node_path(position)?,
            reason,
        })
    };

    let mut stack = vec![(original, duplicate)];
    while let Some((orig, dup)) = stack.pop() {
        outcome.remap.insert(orig, dup);

        let orig_facets = doc.facets(orig)?;
        let dup_facets = doc.facets(dup)?;
        if orig_facets.len() != dup_facets.len() {
            return Err(mismatch(
                dup,
                format!(
                    "{} facets on the original, {} on the duplicate",
                    orig_facets.len(),
                    dup_facets.len()
                ),
            )?);
        }
        for (&o, &d) in orig_facets.iter().zip(dup_facets) {
            let (orig_kind, dup_kind) = (doc.facet_kind(o)?, doc.facet_kind(d)?);
            if orig_kind != dup_kind {
                return Err(mismatch(
                    dup,
                    format!("facet kind {} on the original, {} on the duplicate", orig_kind, dup_kind),
                )?);
            }
            outcome.remap.insert(o, d);
            outcome.merged_facets.push(MergedFacet {
                facet: d,
                original_node: orig,
            });
        }

        let orig_children = doc.children(orig)?;
        let dup_children = doc.children(dup)?;
        if orig_children.len() != dup_children.len() {
            return Err(mismatch(
                dup,
                format!(
                    "{} children on the original, {} on the duplicate",
                    orig_children.len(),
                    dup_children.len()
                ),
            )?);
        }
        for (&o, &d) in orig_children.iter().zip(dup_children).rev() {
            stack.push((o, d));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::find_additions;
    use crate::model::ObjectRef;
    use crate::ops::{Document, ReferenceField, TreeView};
    use serde_json::{json, Value};

    /// Modified root gets `n` extra Light facets; destination has `m` Lights
    fn light_fixture(n: usize, m: usize) -> (Document, AdditionTree, NodeId) {
        let mut doc = Document::new();
        let base = doc.create_root("Root").unwrap();
        let modi = doc.create_root("Root").unwrap();
        for i in 0..n {
            doc.attach_facet(modi, "Light", json!({"src": i})).unwrap();
        }
        let dest = doc.create_root("Dest").unwrap();
        for i in 0..m {
            doc.attach_facet(dest, "Light", json!({"dest": i})).unwrap();
        }
        let mut tree = find_additions(&doc, base, &doc, modi).unwrap();
        let root = tree.root();
        tree.set_remap_target(root, dest, &doc).unwrap();
        (doc, tree, dest)
    }

    fn light_values(doc: &Document, node: NodeId) -> Vec<serde_json::Value> {
        doc.facets_of_kind(node, &FacetKind::from("Light"))
            .unwrap()
            .iter()
            .map(|f| doc.facet_value(*f).unwrap().clone())
            .collect()
    }

    fn group_of(tree: &AdditionTree) -> crate::model::AdditionNodeId {
        tree.iter()
            .find(|(_, n)| n.facets().is_some())
            .map(|(id, _)| id)
            .unwrap()
    }

    #[test]
    fn test_missing_root_target_fails_before_mutation() {
        let mut doc = Document::new();
        let base = doc.create_root("Root").unwrap();
        let modi = doc.create_root("Root").unwrap();
        doc.create_child(modi, "New").unwrap();
        let tree = find_additions(&doc, base, &doc, modi).unwrap();
        let before = doc.node_count();

        let result = merge_additions(&mut doc, tree, &MergeConfig::default());

        assert!(matches!(result, Err(GraftError::RootTargetMissing)));
        assert_eq!(doc.node_count(), before);
    }

    #[test]
    fn test_target_outside_root_fails_before_mutation() {
        let (mut doc, mut tree, _) = light_fixture(1, 0);
        let elsewhere = doc.create_root("Elsewhere").unwrap();
        let group = group_of(&tree);
        tree.set_remap_target(group, elsewhere, &doc).unwrap();
        let before = doc.facet_count();

        let result = merge_additions(&mut doc, tree, &MergeConfig::default());

        assert!(matches!(result, Err(GraftError::TargetOutsideRoot { .. })));
        assert_eq!(doc.facet_count(), before);
    }

    #[test]
    fn test_keep_both_appends() {
        let (mut doc, tree, dest) = light_fixture(1, 1);
        let outcome = merge_additions(&mut doc, tree, &MergeConfig::default()).unwrap();

        assert_eq!(
            light_values(&doc, dest),
            vec![json!({"dest": 0}), json!({"src": 0})]
        );
        assert_eq!(outcome.copied_facets, 1);
        assert_eq!(outcome.merged_facets.len(), 1);
    }

    #[test]
    fn test_modify_dest_overwrites_then_appends() {
        let (mut doc, mut tree, dest) = light_fixture(3, 2);
        let group = group_of(&tree);
        tree.set_conflict_resolution(group, "Light", ConflictMode::ModifyDest)
            .unwrap();
        let existing = doc.facets(dest).unwrap().to_vec();

        let outcome = merge_additions(&mut doc, tree, &MergeConfig::default()).unwrap();

        assert_eq!(
            light_values(&doc, dest),
            vec![json!({"src": 0}), json!({"src": 1}), json!({"src": 2})]
        );
        // First two reused in place
        assert_eq!(&doc.facets(dest).unwrap()[..2], &existing[..]);
        assert_eq!(outcome.remap.len(), 4); // root + 3 facets
    }

    #[test]
    fn test_modify_dest_leaves_surplus_destination_facets() {
        let (mut doc, mut tree, dest) = light_fixture(1, 3);
        let group = group_of(&tree);
        tree.set_conflict_resolution(group, "Light", ConflictMode::ModifyDest)
            .unwrap();

        merge_additions(&mut doc, tree, &MergeConfig::default()).unwrap();

        assert_eq!(
            light_values(&doc, dest),
            vec![json!({"src": 0}), json!({"dest": 1}), json!({"dest": 2})]
        );
    }

    #[test]
    fn test_keep_src_destroys_once_then_appends() {
        let (mut doc, mut tree, dest) = light_fixture(2, 2);
        let group = group_of(&tree);
        tree.set_conflict_resolution(group, "Light", ConflictMode::KeepSrc)
            .unwrap();
        let modi = tree.get(group).unwrap().owner();

        let outcome = merge_additions(&mut doc, tree, &MergeConfig::default()).unwrap();

        assert_eq!(
            light_values(&doc, dest),
            vec![json!({"src": 0}), json!({"src": 1})]
        );
        assert_eq!(
            outcome.remap.policy(modi, &FacetKind::from("Light")),
            Some(ConflictMode::KeepSrc)
        );
    }

    #[test]
    fn test_keep_dest_leaves_target_and_remap_untouched() {
        let (mut doc, mut tree, dest) = light_fixture(2, 1);
        let group = group_of(&tree);
        tree.set_conflict_resolution(group, "Light", ConflictMode::KeepDest)
            .unwrap();
        let sources = tree.get(group).unwrap().facets().unwrap().to_vec();

        let outcome = merge_additions(&mut doc, tree, &MergeConfig::default()).unwrap();

        assert_eq!(light_values(&doc, dest), vec![json!({"dest": 0})]);
        assert!(sources.iter().all(|f| !outcome.remap.contains(*f)));
        assert!(outcome.merged_facets.is_empty());
    }

    #[test]
    fn test_unspecified_mode_comes_from_config() {
        let (mut doc, tree, dest) = light_fixture(1, 1);
        let config = MergeConfig {
            unspecified_conflict_mode: ConflictMode::KeepSrc,
            ..MergeConfig::default()
        };

        merge_additions(&mut doc, tree, &config).unwrap();

        assert_eq!(light_values(&doc, dest), vec![json!({"src": 0})]);
    }

    #[test]
    fn test_subtree_duplicated_and_mapped_in_lockstep() {
        let mut doc = Document::new();
        let base = doc.create_root("Root").unwrap();
        let modi = doc.create_root("Root").unwrap();
        let c = doc.create_child(modi, "C").unwrap();
        let mesh = doc.attach_facet(c, "Mesh", json!("m")).unwrap();
        let c1 = doc.create_child(c, "C1").unwrap();
        let tag = doc.attach_facet(c1, "Tag", json!("t")).unwrap();
        let dest = doc.create_root("Dest").unwrap();

        let mut tree = find_additions(&doc, base, &doc, modi).unwrap();
        let root = tree.root();
        tree.set_remap_target(root, dest, &doc).unwrap();

        let outcome = merge_additions(&mut doc, tree, &MergeConfig::default()).unwrap();

        let dup = outcome.attached_subtrees[0];
        assert_eq!(doc.parent(dup).unwrap(), Some(dest));
        assert_eq!(outcome.remap.node(c), Some(dup));
        let dup_c1 = outcome.remap.node(c1).unwrap();
        assert_eq!(doc.node_path(dup_c1).unwrap(), "Dest/C/C1");
        assert_eq!(
            outcome.remap.get(mesh).and_then(|r| r.as_facet()),
            doc.facets(dup).unwrap().first().copied()
        );

        let tagged: Vec<(FacetKind, NodeId)> = outcome
            .merged_facets
            .iter()
            .map(|m| (doc.facet_kind(m.facet).unwrap().clone(), m.original_node))
            .collect();
        assert_eq!(
            tagged,
            vec![(FacetKind::from("Mesh"), c), (FacetKind::from("Tag"), c1)]
        );
        assert!(outcome.remap.contains(tag));
        // Source subtree untouched
        assert_eq!(doc.parent(c).unwrap(), Some(modi));
    }

    #[test]
    fn test_untargeted_addition_is_skipped() {
        let mut doc = Document::new();
        let base = doc.create_root("Root").unwrap();
        let modi = doc.create_root("Root").unwrap();
        doc.create_child(modi, "A").unwrap();
        let ma = doc.create_child(modi, "Missing").unwrap();
        doc.create_child(ma, "New").unwrap();
        doc.create_child(modi, "Other").unwrap();
        doc.create_child(base, "Missing").unwrap();
        let dest = doc.create_root("Dest").unwrap();

        let mut tree = find_additions(&doc, base, &doc, modi).unwrap();
        let root = tree.root();
        tree.set_remap_target(root, dest, &doc).unwrap();

        let outcome = merge_additions(&mut doc, tree, &MergeConfig::default()).unwrap();

        // A and Other attached at Dest; New has no target under Dest/Missing
        let names: Vec<&str> = doc
            .children(dest)
            .unwrap()
            .iter()
            .map(|n| doc.node_name(*n).unwrap())
            .collect();
        assert_eq!(names, vec!["A", "Other"]);
        assert_eq!(outcome.attached_subtrees.len(), 2);
    }

    enum Flaw {
        /// Move the copy's first facet to the end
        FacetOrder,
        /// Give the copy an extra child
        ExtraChild,
    }

    /// Provider whose subtree copies do not line up with their originals
    struct Misduplicating {
        inner: Document,
        flaw: Flaw,
    }

    impl TreeView for Misduplicating {
        fn node_name(&self, node: NodeId) -> Result<&str> {
            self.inner.node_name(node)
        }
        fn children(&self, node: NodeId) -> Result<&[NodeId]> {
            self.inner.children(node)
        }
        fn parent(&self, node: NodeId) -> Result<Option<NodeId>> {
            self.inner.parent(node)
        }
        fn facets(&self, node: NodeId) -> Result<&[FacetId]> {
            self.inner.facets(node)
        }
        fn facet_kind(&self, facet: FacetId) -> Result<&FacetKind> {
            self.inner.facet_kind(facet)
        }
        fn facet_owner(&self, facet: FacetId) -> Result<NodeId> {
            self.inner.facet_owner(facet)
        }
        fn facet_value(&self, facet: FacetId) -> Result<&Value> {
            self.inner.facet_value(facet)
        }
        fn reference_fields(&self, facet: FacetId) -> Result<Vec<ReferenceField>> {
            self.inner.reference_fields(facet)
        }
        fn contains(&self, object: ObjectRef) -> bool {
            self.inner.contains(object)
        }
    }

    impl TreeEdit for Misduplicating {
        fn add_facet(&mut self, node: NodeId, kind: &FacetKind) -> Result<FacetId> {
            self.inner.add_facet(node, kind)
        }
        fn destroy_facet(&mut self, facet: FacetId) -> Result<()> {
            self.inner.destroy_facet(facet)
        }
        fn copy_facet_value(&mut self, src: FacetId, dst: FacetId) -> Result<()> {
            self.inner.copy_facet_value(src, dst)
        }
        fn set_facet_value(&mut self, facet: FacetId, value: Value) -> Result<()> {
            self.inner.set_facet_value(facet, value)
        }
        fn set_reference(
            &mut self,
            facet: FacetId,
            path: &str,
            target: Option<ObjectRef>,
        ) -> Result<()> {
            self.inner.set_reference(facet, path, target)
        }
        fn duplicate_subtree(&mut self, node: NodeId) -> Result<NodeId> {
            let copy = self.inner.duplicate_subtree(node)?;
            match self.flaw {
                Flaw::FacetOrder => {
                    let first = self.inner.facets(copy)?[0];
                    let kind = self.inner.facet_kind(first)?.clone();
                    let value = self.inner.facet_value(first)?.clone();
                    self.inner.destroy_facet(first)?;
                    let moved = self.inner.add_facet(copy, &kind)?;
                    self.inner.set_facet_value(moved, value)?;
                }
                Flaw::ExtraChild => {
                    self.inner.create_child(copy, "Extra")?;
                }
            }
            Ok(copy)
        }
        fn reparent(&mut self, node: NodeId, new_parent: NodeId) -> Result<()> {
            self.inner.reparent(node, new_parent)
        }
    }

    /// Modified root gains subtrees C (Mesh, Light) and then D
    fn two_subtrees(flaw: Flaw) -> (Misduplicating, AdditionTree, NodeId) {
        let mut doc = Document::new();
        let base = doc.create_root("Root").unwrap();
        let modi = doc.create_root("Root").unwrap();
        let c = doc.create_child(modi, "C").unwrap();
        doc.attach_facet(c, "Mesh", json!("m")).unwrap();
        doc.attach_facet(c, "Light", json!("l")).unwrap();
        let d = doc.create_child(modi, "D").unwrap();
        doc.attach_facet(d, "Tag", json!("t")).unwrap();
        let dest = doc.create_root("Dest").unwrap();

        let mut tree = find_additions(&doc, base, &doc, modi).unwrap();
        let root = tree.root();
        tree.set_remap_target(root, dest, &doc).unwrap();
        (Misduplicating { inner: doc, flaw }, tree, dest)
    }

    fn child_names(doc: &dyn TreeView, node: NodeId) -> Vec<String> {
        doc.children(node)
            .unwrap()
            .iter()
            .map(|n| doc.node_name(*n).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_reordered_duplicate_facets_abort_merge() {
        let (mut doc, tree, dest) = two_subtrees(Flaw::FacetOrder);

        let result = merge_additions(&mut doc, tree, &MergeConfig::default());

        match result {
            Err(GraftError::DuplicateMismatch { position, reason, .. }) => {
                assert_eq!(position, "Dest/C");
                assert_eq!(reason, "facet kind Mesh on the original, Light on the duplicate");
            }
            other => panic!("expected DuplicateMismatch, got {:?}", other),
        }
        // C was attached before the check; D never reached
        assert_eq!(child_names(&doc, dest), vec!["C"]);
    }

    #[test]
    fn test_duplicate_with_extra_child_aborts_merge() {
        let (mut doc, tree, dest) = two_subtrees(Flaw::ExtraChild);

        let result = merge_additions(&mut doc, tree, &MergeConfig::default());

        match result {
            Err(GraftError::DuplicateMismatch { position, reason, .. }) => {
                assert_eq!(position, "Dest/C");
                assert_eq!(reason, "0 children on the original, 1 on the duplicate");
            }
            other => panic!("expected DuplicateMismatch, got {:?}", other),
        }
        assert_eq!(child_names(&doc, dest), vec!["C"]);
    }
}
