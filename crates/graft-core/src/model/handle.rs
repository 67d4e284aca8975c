use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a node in a [`Document`](crate::ops::Document)
///
/// Generational index: a handle whose slot has been freed and reused no
/// longer resolves, so stale handles are detected instead of aliasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index in the node arena
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node:{}.{}", self.index, self.generation)
    }
}

/// Handle to a facet in a [`Document`](crate::ops::Document)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FacetId {
    index: u32,
    generation: u32,
}

impl FacetId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index in the facet arena
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for FacetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "facet:{}.{}", self.index, self.generation)
    }
}

/// Anything a reference field can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectRef {
    Node(NodeId),
    Facet(FacetId),
}

impl ObjectRef {
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            ObjectRef::Node(id) => Some(*id),
            ObjectRef::Facet(_) => None,
        }
    }

    pub fn as_facet(&self) -> Option<FacetId> {
        match self {
            ObjectRef::Facet(id) => Some(*id),
            ObjectRef::Node(_) => None,
        }
    }
}

impl From<NodeId> for ObjectRef {
    fn from(id: NodeId) -> Self {
        ObjectRef::Node(id)
    }
}

impl From<FacetId> for ObjectRef {
    fn from(id: FacetId) -> Self {
        ObjectRef::Facet(id)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::Node(id) => id.fmt(f),
            ObjectRef::Facet(id) => id.fmt(f),
        }
    }
}

/// The type of a facet
///
/// Facets of the same kind are interchangeable for value cloning, and the
/// kind is the unit conflicts and hooks are keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacetKind(String);

impl FacetKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FacetKind {
    fn from(kind: &str) -> Self {
        Self(kind.to_string())
    }
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
