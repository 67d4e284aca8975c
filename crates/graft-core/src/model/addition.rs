use std::collections::{BTreeMap, BTreeSet};

use super::conflict::ConflictMode;
use super::handle::{FacetId, FacetKind, NodeId};
use crate::errors::{GraftError, Result};
use crate::ops::TreeView;

/// Index of a node in an [`AdditionTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AdditionNodeId(usize);

impl AdditionNodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// What an addition tree node stands for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdditionKind {
    /// Existing node kept for structure; may hold additions further down
    Carried,
    /// Whole node (with its subtree) absent from the baseline
    Subtree,
    /// Facets appended to an existing node, in source order
    FacetGroup { facets: Vec<FacetId> },
}

/// One node of the alignment output
#[derive(Debug, Clone)]
pub struct AdditionTreeNode {
    pub(crate) source: Option<NodeId>,
    pub(crate) owner: NodeId,
    pub(crate) name: String,
    pub(crate) kind: AdditionKind,
    pub(crate) has_additions: bool,
    pub(crate) parent: Option<AdditionNodeId>,
    pub(crate) children: Vec<AdditionNodeId>,
    pub(crate) remap_target: Option<NodeId>,
    pub(crate) remap_target_is_guess: bool,
    pub(crate) conflict_resolutions: BTreeMap<FacetKind, ConflictMode>,
    pub(crate) conflicts: BTreeSet<FacetKind>,
}

impl AdditionTreeNode {
    pub(crate) fn carried(source: NodeId, name: impl Into<String>) -> Self {
        Self::build(Some(source), source, name.into(), AdditionKind::Carried)
    }

    pub(crate) fn subtree(source: NodeId, name: impl Into<String>) -> Self {
        let mut node = Self::build(Some(source), source, name.into(), AdditionKind::Subtree);
        node.has_additions = true;
        node
    }

    pub(crate) fn facet_group(owner: NodeId, name: impl Into<String>, facets: Vec<FacetId>) -> Self {
        let mut node = Self::build(None, owner, name.into(), AdditionKind::FacetGroup { facets });
        node.has_additions = true;
        node
    }

    fn build(source: Option<NodeId>, owner: NodeId, name: String, kind: AdditionKind) -> Self {
        Self {
            source,
            owner,
            name,
            kind,
            has_additions: false,
            parent: None,
            children: Vec::new(),
            remap_target: None,
            remap_target_is_guess: true,
            conflict_resolutions: BTreeMap::new(),
            conflicts: BTreeSet::new(),
        }
    }

    /// Modified-tree node this stands for; `None` for a facet group
    pub fn source(&self) -> Option<NodeId> {
        self.source
    }

    /// Modified-tree node owning the facets (or the node itself)
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Name of the modified-tree node, captured during alignment
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &AdditionKind {
        &self.kind
    }

    pub fn is_addition(&self) -> bool {
        !matches!(self.kind, AdditionKind::Carried)
    }

    pub fn has_additions(&self) -> bool {
        self.has_additions
    }

    /// Added facets, for a facet group
    pub fn facets(&self) -> Option<&[FacetId]> {
        match &self.kind {
            AdditionKind::FacetGroup { facets } => Some(facets),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<AdditionNodeId> {
        self.parent
    }

    pub fn children(&self) -> &[AdditionNodeId] {
        &self.children
    }

    pub fn remap_target(&self) -> Option<NodeId> {
        self.remap_target
    }

    /// False once the target was pinned explicitly
    pub fn remap_target_is_guess(&self) -> bool {
        self.remap_target_is_guess
    }

    pub fn conflict_resolutions(&self) -> &BTreeMap<FacetKind, ConflictMode> {
        &self.conflict_resolutions
    }

    /// Facet kinds present both in this facet group and on its target
    pub fn conflicts(&self) -> &BTreeSet<FacetKind> {
        &self.conflicts
    }
}

/// Problem found by [`AdditionTree::validate_targets`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStatus {
    /// The root has no destination; nothing can be merged
    RootUnassigned,
    /// Addition target lies outside the root target's subtree
    OutsideRootTarget,
    /// Addition has no target and will not be copied
    Unassigned,
}

impl TargetStatus {
    /// Errors block the merge; `Unassigned` is only a warning
    pub fn is_error(&self) -> bool {
        !matches!(self, TargetStatus::Unassigned)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetIssue {
    pub node: AdditionNodeId,
    pub status: TargetStatus,
}

/// Additions found between a baseline and a modified hierarchy
///
/// Arena of [`AdditionTreeNode`]s; index 0 is always the root, which stands
/// for the modified root node and is never a facet group. The tree is rebuilt
/// per (baseline, modified) pair and consumed by a merge.
#[derive(Debug, Clone)]
pub struct AdditionTree {
    nodes: Vec<AdditionTreeNode>,
}

impl AdditionTree {
    pub(crate) fn with_root(source: NodeId, name: impl Into<String>) -> Self {
        Self {
            nodes: vec![AdditionTreeNode::carried(source, name)],
        }
    }

    pub(crate) fn push(&mut self, parent: AdditionNodeId, mut node: AdditionTreeNode) -> Result<AdditionNodeId> {
        let id = AdditionNodeId(self.nodes.len());
        node.parent = Some(parent);
        self.get_mut(parent)?.children.push(id);
        self.nodes.push(node);
        Ok(id)
    }

    pub fn root(&self) -> AdditionNodeId {
        AdditionNodeId(0)
    }

    /// # Errors
    ///
    /// Returns `AdditionNodeNotFound` for an id from another tree.
    pub fn get(&self, id: AdditionNodeId) -> Result<&AdditionTreeNode> {
        self.nodes
            .get(id.0)
            .ok_or(GraftError::AdditionNodeNotFound { index: id.0 })
    }

    pub(crate) fn get_mut(&mut self, id: AdditionNodeId) -> Result<&mut AdditionTreeNode> {
        self.nodes
            .get_mut(id.0)
            .ok_or(GraftError::AdditionNodeNotFound { index: id.0 })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in pre-order
    pub fn iter(&self) -> impl Iterator<Item = (AdditionNodeId, &AdditionTreeNode)> + '_ {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(node) = self.nodes.get(id.0) {
                stack.extend(node.children.iter().rev());
            }
        }
        order.into_iter().map(move |id| (id, &self.nodes[id.0]))
    }

    /// Number of subtree and facet-group additions
    pub fn addition_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_addition()).count()
    }

    /// First node (pre-order) standing for `source`
    pub fn find_by_source(&self, source: NodeId) -> Option<AdditionNodeId> {
        self.iter()
            .find(|(_, node)| node.source == Some(source))
            .map(|(id, _)| id)
    }

    /// Facet group holding the facets added to `owner`, if any
    pub fn find_facet_group(&self, owner: NodeId) -> Option<AdditionNodeId> {
        self.iter()
            .find(|(_, node)| node.owner == owner && node.facets().is_some())
            .map(|(id, _)| id)
    }

    /// Choose how facets of `kind` in this group meet the target's facets
    pub fn set_conflict_resolution(
        &mut self,
        id: AdditionNodeId,
        kind: impl Into<FacetKind>,
        mode: ConflictMode,
    ) -> Result<()> {
        self.get_mut(id)?.conflict_resolutions.insert(kind.into(), mode);
        Ok(())
    }

    /// Recompute conflicts for every node against its current target
    ///
    /// New conflicts get `default_mode`; resolutions whose conflict vanished
    /// are dropped. Returns whether any resolution was added or removed.
    ///
    /// # Errors
    ///
    /// Propagates lookup failures for stale source facets or targets.
    pub fn refresh_conflicts(&mut self, view: &dyn TreeView, default_mode: ConflictMode) -> Result<bool> {
        let mut changed = false;
        for node in &mut self.nodes {
            let mut conflicts = BTreeSet::new();
            if let (AdditionKind::FacetGroup { facets }, Some(target)) = (&node.kind, node.remap_target) {
                for facet in facets {
                    let kind = view.facet_kind(*facet)?;
                    if !view.facets_of_kind(target, kind)?.is_empty() {
                        conflicts.insert(kind.clone());
                    }
                }
            }
            for kind in &conflicts {
                if !node.conflict_resolutions.contains_key(kind) {
                    node.conflict_resolutions.insert(kind.clone(), default_mode);
                    changed = true;
                }
            }
            let before = node.conflict_resolutions.len();
            node.conflict_resolutions.retain(|kind, _| conflicts.contains(kind));
            changed |= node.conflict_resolutions.len() != before;
            node.conflicts = conflicts;
        }
        Ok(changed)
    }

    /// Report unusable targets before a merge is attempted
    ///
    /// # Errors
    ///
    /// Propagates lookup failures for stale targets.
    pub fn validate_targets(&self, view: &dyn TreeView) -> Result<Vec<TargetIssue>> {
        let root = self.root();
        let Some(root_target) = self.get(root)?.remap_target else {
            return Ok(vec![TargetIssue {
                node: root,
                status: TargetStatus::RootUnassigned,
            }]);
        };

        let mut issues = Vec::new();
        for (id, node) in self.iter() {
            if !node.is_addition() {
                continue;
            }
            match node.remap_target {
                None => issues.push(TargetIssue {
                    node: id,
                    status: TargetStatus::Unassigned,
                }),
                Some(target) if !view.is_within(target, root_target)? => issues.push(TargetIssue {
                    node: id,
                    status: TargetStatus::OutsideRootTarget,
                }),
                Some(_) => {}
            }
        }
        Ok(issues)
    }

    /// Indented text listing, one line per node
    ///
    /// ```text
    /// Root -> Dest
    ///   A -> Dest/A
    ///     + facets [Light] -> Dest/A  {Light: modify_dest}
    ///   + C -> Dest
    /// ```
    ///
    /// Guessed targets are suffixed with `?`.
    pub fn render(&self, view: &dyn TreeView) -> Result<String> {
        let mut out = String::new();
        let mut stack = vec![(self.root(), 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let node = self.get(id)?;
            let marker = if node.is_addition() { "+ " } else { "" };
            let label = match &node.kind {
                AdditionKind::FacetGroup { facets } => {
                    let kinds = facets
                        .iter()
                        .map(|f| view.facet_kind(*f).map(|k| k.to_string()))
                        .collect::<Result<Vec<_>>>()?;
                    format!("facets [{}]", kinds.join(", "))
                }
                _ => node.name.clone(),
            };
            let target = match node.remap_target {
                Some(t) => {
                    let guess = if node.remap_target_is_guess { "?" } else { "" };
                    format!("{}{}", view.node_path(t)?, guess)
                }
                None => "(none)".to_string(),
            };
            out.push_str(&format!("{}{}{} -> {}", "  ".repeat(depth), marker, label, target));
            if !node.conflict_resolutions.is_empty() {
                let modes: Vec<String> = node
                    .conflict_resolutions
                    .iter()
                    .map(|(k, m)| format!("{}: {}", k, m))
                    .collect();
                out.push_str(&format!("  {{{}}}", modes.join(", ")));
            }
            out.push('\n');
            for child in node.children.iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
        Ok(out)
    }
}
