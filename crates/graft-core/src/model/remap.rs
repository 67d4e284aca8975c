use std::collections::BTreeMap;

use super::conflict::ConflictMode;
use super::handle::{FacetKind, NodeId, ObjectRef};

/// Original → new identity correspondence built by one merge
///
/// Keys are objects of the modified (source) hierarchy; values are the
/// destination objects that were matched, created, or overwritten for them.
/// The conflict policy applied per (original node, facet kind) is kept
/// alongside so reference fixup can honour `KeepDest` exclusions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemapTable {
    entries: BTreeMap<ObjectRef, ObjectRef>,
    policies: BTreeMap<(NodeId, FacetKind), ConflictMode>,
}

impl RemapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `original` now corresponds to `new`
    ///
    /// A later insert for the same original replaces the earlier one.
    pub fn insert(&mut self, original: impl Into<ObjectRef>, new: impl Into<ObjectRef>) {
        self.entries.insert(original.into(), new.into());
    }

    pub fn get(&self, original: impl Into<ObjectRef>) -> Option<ObjectRef> {
        self.entries.get(&original.into()).copied()
    }

    pub fn contains(&self, original: impl Into<ObjectRef>) -> bool {
        self.entries.contains_key(&original.into())
    }

    /// Mapped destination node for an original node, if it was mapped to a node
    pub fn node(&self, original: NodeId) -> Option<NodeId> {
        self.get(original).and_then(|r| r.as_node())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectRef, &ObjectRef)> {
        self.entries.iter()
    }

    /// Remember the policy first applied to facets of `kind` from `node`
    pub(crate) fn record_policy(&mut self, node: NodeId, kind: &FacetKind, mode: ConflictMode) {
        self.policies.entry((node, kind.clone())).or_insert(mode);
    }

    /// Policy applied during the merge to facets of `kind` owned by `node`
    pub fn policy(&self, node: NodeId, kind: &FacetKind) -> Option<ConflictMode> {
        self.policies.get(&(node, kind.clone())).copied()
    }
}
