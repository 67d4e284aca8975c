//! Tree provider seams
//!
//! The engines only ever talk to a hierarchy through these two traits.
//! [`Document`](super::Document) is the in-crate implementation; hosts with
//! their own storage implement the primitives and inherit the helpers.

use std::collections::HashSet;

use serde_json::Value;

use crate::errors::{GraftError, Result};
use crate::model::{FacetId, FacetKind, NodeId, ObjectRef};

/// One reference field of a facet as seen by field reflection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceField {
    /// Field path within the facet, e.g. `target` or `slots.0`
    pub path: String,
    /// Current referent; `None` for an empty field
    pub target: Option<ObjectRef>,
}

/// Read access to a hierarchy
pub trait TreeView {
    /// Name of a node. Sibling names are not guaranteed unique.
    fn node_name(&self, node: NodeId) -> Result<&str>;

    /// Ordered children of a node
    fn children(&self, node: NodeId) -> Result<&[NodeId]>;

    fn parent(&self, node: NodeId) -> Result<Option<NodeId>>;

    /// Ordered facets attached to a node
    fn facets(&self, node: NodeId) -> Result<&[FacetId]>;

    fn facet_kind(&self, facet: FacetId) -> Result<&FacetKind>;

    fn facet_owner(&self, facet: FacetId) -> Result<NodeId>;

    /// Opaque value payload of a facet
    fn facet_value(&self, facet: FacetId) -> Result<&Value>;

    /// Reference fields of a facet in declaration order
    fn reference_fields(&self, facet: FacetId) -> Result<Vec<ReferenceField>>;

    /// Whether a handle currently resolves
    fn contains(&self, object: ObjectRef) -> bool;

    /// Facets of one kind on a node, in attachment order
    fn facets_of_kind(&self, node: NodeId, kind: &FacetKind) -> Result<Vec<FacetId>> {
        let mut out = Vec::new();
        for facet in self.facets(node)? {
            if self.facet_kind(*facet)? == kind {
                out.push(*facet);
            }
        }
        Ok(out)
    }

    /// First child carrying `name`
    fn find_child(&self, node: NodeId, name: &str) -> Result<Option<NodeId>> {
        for child in self.children(node)? {
            if self.node_name(*child)? == name {
                return Ok(Some(*child));
            }
        }
        Ok(None)
    }

    /// `root` and all its descendants in pre-order
    fn descendants(&self, root: NodeId) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            out.push(node);
            for child in self.children(node)?.iter().rev() {
                stack.push(*child);
            }
        }
        Ok(out)
    }

    /// True when `node` is `ancestor` or lies beneath it
    fn is_within(&self, node: NodeId, ancestor: NodeId) -> Result<bool> {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return Ok(true);
            }
            current = self.parent(id)?;
        }
        Ok(false)
    }

    /// Slash-separated name path from the tree root, e.g. `Root/Body/Arm`
    fn node_path(&self, node: NodeId) -> Result<String> {
        let mut names = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            names.push(self.node_name(id)?.to_string());
            current = self.parent(id)?;
        }
        names.reverse();
        Ok(names.join("/"))
    }

    /// Resolve a path relative to `root`; the first segment must be the root's name
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` when any segment has no matching child.
    fn resolve_path(&self, root: NodeId, path: &str) -> Result<NodeId> {
        let not_found = || GraftError::PathNotFound {
            path: path.to_string(),
        };
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        match segments.next() {
            Some(first) if first == self.node_name(root)? => {}
            _ => return Err(not_found()),
        }
        let mut current = root;
        for segment in segments {
            current = self.find_child(current, segment)?.ok_or_else(not_found)?;
        }
        Ok(current)
    }

    /// Every node and facet of the subtree at `root`
    fn collect_hierarchy(&self, root: NodeId) -> Result<HashSet<ObjectRef>> {
        let mut set = HashSet::new();
        for node in self.descendants(root)? {
            set.insert(ObjectRef::Node(node));
            for facet in self.facets(node)? {
                set.insert(ObjectRef::Facet(*facet));
            }
        }
        Ok(set)
    }
}

/// Mutation primitives
///
/// Every mutation is fallible; a failure aborts the merge that issued it.
pub trait TreeEdit: TreeView {
    /// Append a new, empty facet of `kind` to `node`
    fn add_facet(&mut self, node: NodeId, kind: &FacetKind) -> Result<FacetId>;

    fn destroy_facet(&mut self, facet: FacetId) -> Result<()>;

    /// Copy value payload and reference fields of `src` onto `dst` verbatim
    fn copy_facet_value(&mut self, src: FacetId, dst: FacetId) -> Result<()>;

    fn set_facet_value(&mut self, facet: FacetId, value: Value) -> Result<()>;

    /// Rewrite an existing reference field
    fn set_reference(&mut self, facet: FacetId, path: &str, target: Option<ObjectRef>)
        -> Result<()>;

    /// Detached copy of the subtree at `node`, preserving child and facet order
    fn duplicate_subtree(&mut self, node: NodeId) -> Result<NodeId>;

    /// Move `node` (and its subtree) to the end of `new_parent`'s children
    fn reparent(&mut self, node: NodeId, new_parent: NodeId) -> Result<()>;
}
