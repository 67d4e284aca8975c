use std::collections::BTreeMap;

use serde_json::Value;

use super::provider::{ReferenceField, TreeEdit, TreeView};
use crate::errors::{GraftError, Result};
use crate::model::{FacetId, FacetKind, NodeId, ObjectRef};

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Generational arena
///
/// Freed slots are reused with a bumped generation so handles to the old
/// occupant stop resolving.
#[derive(Debug, Clone)]
struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<T> Arena<T> {
    fn insert(&mut self, value: T) -> (u32, u32) {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return (index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        (index, 0)
    }

    fn get(&self, index: u32, generation: u32) -> Option<&T> {
        self.slots
            .get(index as usize)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.as_ref())
    }

    fn get_mut(&mut self, index: u32, generation: u32) -> Option<&mut T> {
        self.slots
            .get_mut(index as usize)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.as_mut())
    }

    fn remove(&mut self, index: u32, generation: u32) -> Option<T> {
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.len -= 1;
        Some(value)
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    facets: Vec<FacetId>,
}

#[derive(Debug, Clone)]
struct FacetData {
    kind: FacetKind,
    owner: NodeId,
    value: Value,
    references: BTreeMap<String, Option<ObjectRef>>,
}

/// In-memory arena holding one or more hierarchies
///
/// Not thread-safe; designed for a single pass driven by one caller.
/// References may point anywhere in the same document, which is why a
/// modified hierarchy and its merge destination should share one.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Arena<NodeData>,
    facets: Arena<FacetData>,
    roots: Vec<NodeId>,
}

impl Document {
    /// Create a new empty Document
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new top-level tree
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` if `name` is empty or whitespace-only.
    pub fn create_root(&mut self, name: impl Into<String>) -> Result<NodeId> {
        let name = validate_name(name.into())?;
        let id = self.insert_node(name, None);
        self.roots.push(id);
        Ok(id)
    }

    /// Append a child node under `parent`
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` for a blank name and `NodeNotFound` for a stale parent.
    pub fn create_child(&mut self, parent: NodeId, name: impl Into<String>) -> Result<NodeId> {
        let name = validate_name(name.into())?;
        self.node(parent)?;
        let id = self.insert_node(name, Some(parent));
        self.node_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Append a facet carrying `value` to `node`
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if `node` does not resolve.
    pub fn attach_facet(
        &mut self,
        node: NodeId,
        kind: impl Into<FacetKind>,
        value: Value,
    ) -> Result<FacetId> {
        let kind = kind.into();
        let facet = self.add_facet(node, &kind)?;
        self.facet_mut(facet)?.value = value;
        Ok(facet)
    }

    /// Declare (or overwrite) a reference field on a facet
    ///
    /// Unlike [`TreeEdit::set_reference`] this may introduce a new field path.
    ///
    /// # Errors
    ///
    /// Returns `FacetNotFound` if `facet` does not resolve.
    pub fn declare_reference(
        &mut self,
        facet: FacetId,
        path: impl Into<String>,
        target: Option<ObjectRef>,
    ) -> Result<()> {
        self.facet_mut(facet)?.references.insert(path.into(), target);
        Ok(())
    }

    /// Current referent of one field, if the field exists
    pub fn reference(&self, facet: FacetId, path: &str) -> Result<Option<ObjectRef>> {
        let data = self.facet(facet)?;
        data.references
            .get(path)
            .copied()
            .ok_or_else(|| GraftError::ReferenceFieldNotFound {
                facet: facet.to_string(),
                path: path.to_string(),
            })
    }

    /// Top-level trees in creation order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// First top-level tree named `name`
    pub fn root_named(&self, name: &str) -> Option<NodeId> {
        self.roots
            .iter()
            .copied()
            .find(|id| self.node(*id).map(|n| n.name == name).unwrap_or(false))
    }

    /// Live node count, including detached duplicates
    pub fn node_count(&self) -> usize {
        self.nodes.len
    }

    /// Live facet count
    pub fn facet_count(&self) -> usize {
        self.facets.len
    }

    fn insert_node(&mut self, name: String, parent: Option<NodeId>) -> NodeId {
        let (index, generation) = self.nodes.insert(NodeData {
            name,
            parent,
            children: Vec::new(),
            facets: Vec::new(),
        });
        NodeId::new(index, generation)
    }

    fn node(&self, id: NodeId) -> Result<&NodeData> {
        self.nodes
            .get(id.index(), id.generation())
            .ok_or_else(|| GraftError::NodeNotFound {
                node: id.to_string(),
            })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
        self.nodes
            .get_mut(id.index(), id.generation())
            .ok_or_else(|| GraftError::NodeNotFound {
                node: id.to_string(),
            })
    }

    fn facet(&self, id: FacetId) -> Result<&FacetData> {
        self.facets
            .get(id.index(), id.generation())
            .ok_or_else(|| GraftError::FacetNotFound {
                facet: id.to_string(),
            })
    }

    fn facet_mut(&mut self, id: FacetId) -> Result<&mut FacetData> {
        self.facets
            .get_mut(id.index(), id.generation())
            .ok_or_else(|| GraftError::FacetNotFound {
                facet: id.to_string(),
            })
    }

    /// Detach `node` from its parent, or from the root list
    fn detach(&mut self, node: NodeId) -> Result<()> {
        match self.node(node)?.parent {
            Some(parent) => self.node_mut(parent)?.children.retain(|c| *c != node),
            None => self.roots.retain(|r| *r != node),
        }
        self.node_mut(node)?.parent = None;
        Ok(())
    }
}

fn validate_name(name: String) -> Result<String> {
    if name.trim().is_empty() {
        return Err(GraftError::InvalidName {
            reason: "Node name cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(name)
}

impl TreeView for Document {
    fn node_name(&self, node: NodeId) -> Result<&str> {
        Ok(&self.node(node)?.name)
    }

    fn children(&self, node: NodeId) -> Result<&[NodeId]> {
        Ok(&self.node(node)?.children)
    }

    fn parent(&self, node: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(node)?.parent)
    }

    fn facets(&self, node: NodeId) -> Result<&[FacetId]> {
        Ok(&self.node(node)?.facets)
    }

    fn facet_kind(&self, facet: FacetId) -> Result<&FacetKind> {
        Ok(&self.facet(facet)?.kind)
    }

    fn facet_owner(&self, facet: FacetId) -> Result<NodeId> {
        Ok(self.facet(facet)?.owner)
    }

    fn facet_value(&self, facet: FacetId) -> Result<&Value> {
        Ok(&self.facet(facet)?.value)
    }

    fn reference_fields(&self, facet: FacetId) -> Result<Vec<ReferenceField>> {
        Ok(self
            .facet(facet)?
            .references
            .iter()
            .map(|(path, target)| ReferenceField {
                path: path.clone(),
                target: *target,
            })
            .collect())
    }

    fn contains(&self, object: ObjectRef) -> bool {
        match object {
            ObjectRef::Node(id) => self.node(id).is_ok(),
            ObjectRef::Facet(id) => self.facet(id).is_ok(),
        }
    }
}

impl TreeEdit for Document {
    fn add_facet(&mut self, node: NodeId, kind: &FacetKind) -> Result<FacetId> {
        self.node(node)?;
        let (index, generation) = self.facets.insert(FacetData {
            kind: kind.clone(),
            owner: node,
            value: Value::Null,
            references: BTreeMap::new(),
        });
        let id = FacetId::new(index, generation);
        self.node_mut(node)?.facets.push(id);
        Ok(id)
    }

    fn destroy_facet(&mut self, facet: FacetId) -> Result<()> {
        let owner = self.facet(facet)?.owner;
        self.node_mut(owner)?.facets.retain(|f| *f != facet);
        self.facets.remove(facet.index(), facet.generation());
        Ok(())
    }

    fn copy_facet_value(&mut self, src: FacetId, dst: FacetId) -> Result<()> {
        let source = self.facet(src)?.clone();
        let target = self.facet_mut(dst)?;
        if source.kind != target.kind {
            return Err(GraftError::FacetKindMismatch {
                src: src.to_string(),
                src_kind: source.kind.to_string(),
                dst: dst.to_string(),
                dst_kind: target.kind.to_string(),
            });
        }
        target.value = source.value;
        target.references = source.references;
        Ok(())
    }

    fn set_facet_value(&mut self, facet: FacetId, value: Value) -> Result<()> {
        self.facet_mut(facet)?.value = value;
        Ok(())
    }

    fn set_reference(
        &mut self,
        facet: FacetId,
        path: &str,
        target: Option<ObjectRef>,
    ) -> Result<()> {
        let field = self
            .facet_mut(facet)?
            .references
            .get_mut(path)
            .ok_or_else(|| GraftError::ReferenceFieldNotFound {
                facet: facet.to_string(),
                path: path.to_string(),
            })?;
        *field = target;
        Ok(())
    }

    fn duplicate_subtree(&mut self, node: NodeId) -> Result<NodeId> {
        let name = self.node(node)?.name.clone();
        let copy = self.insert_node(name, None);

        let mut stack = vec![(node, copy)];
        while let Some((original, duplicate)) = stack.pop() {
            for facet in self.node(original)?.facets.clone() {
                let data = self.facet(facet)?.clone();
                let (index, generation) = self.facets.insert(FacetData {
                    owner: duplicate,
                    ..data
                });
                self.node_mut(duplicate)?
                    .facets
                    .push(FacetId::new(index, generation));
            }
            for child in self.node(original)?.children.clone() {
                let child_name = self.node(child)?.name.clone();
                let child_copy = self.insert_node(child_name, Some(duplicate));
                self.node_mut(duplicate)?.children.push(child_copy);
                stack.push((child, child_copy));
            }
        }
        Ok(copy)
    }

    fn reparent(&mut self, node: NodeId, new_parent: NodeId) -> Result<()> {
        self.node(node)?;
        if self.is_within(new_parent, node)? {
            return Err(GraftError::IllegalReparent {
                reason: format!("{} is within the subtree of {}", new_parent, node),
            });
        }
        self.detach(node)?;
        self.node_mut(new_parent)?.children.push(node);
        self.node_mut(node)?.parent = Some(new_parent);
        Ok(())
    }
}
