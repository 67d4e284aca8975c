//! Export hierarchies back to Document Format v0

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use graft_core::{NodeId, ObjectRef, TreeView};

use crate::document::format_v0::{DocumentV0, FacetV0, NodeV0, RefV0};
use crate::errors::{io_error, yaml_error, Result};

/// Export one tree
pub fn export_tree(view: &dyn TreeView, root: NodeId) -> Result<DocumentV0> {
    export_trees(view, &[root])
}

/// Export several trees into one document
///
/// Only referenced nodes and facets get keys, numbered in pre-order
/// (`n1`, `f2`, ...), so exporting the same hierarchy twice yields identical
/// output. References to objects outside the exported trees are written as
/// unset fields.
pub fn export_trees(view: &dyn TreeView, roots: &[NodeId]) -> Result<DocumentV0> {
    let mut order: Vec<ObjectRef> = Vec::new();
    for root in roots {
        for node in view.descendants(*root)? {
            order.push(ObjectRef::Node(node));
            order.extend(view.facets(node)?.iter().map(|f| ObjectRef::Facet(*f)));
        }
    }
    let exported: HashSet<ObjectRef> = order.iter().copied().collect();

    let mut referenced = HashSet::new();
    for object in &order {
        if let ObjectRef::Facet(facet) = object {
            for field in view.reference_fields(*facet)? {
                if let Some(target) = field.target {
                    referenced.insert(target);
                }
            }
        }
    }

    let mut keys: HashMap<ObjectRef, String> = HashMap::new();
    for (position, object) in order.iter().enumerate() {
        if referenced.contains(object) {
            let key = match object {
                ObjectRef::Node(_) => format!("n{}", position + 1),
                ObjectRef::Facet(_) => format!("f{}", position + 1),
            };
            keys.insert(*object, key);
        }
    }

    let mut dropped = 0usize;
    let mut trees = Vec::with_capacity(roots.len());
    for root in roots {
        trees.push(export_node(view, *root, &keys, &exported, &mut dropped)?);
    }
    if dropped > 0 {
        tracing::warn!(
            dropped,
            "References leaving the exported trees were written as unset"
        );
    }

    Ok(DocumentV0 {
        schema_version: 0,
        trees,
    })
}

fn export_node(
    view: &dyn TreeView,
    node: NodeId,
    keys: &HashMap<ObjectRef, String>,
    exported: &HashSet<ObjectRef>,
    dropped: &mut usize,
) -> Result<NodeV0> {
    let mut facets = Vec::new();
    for facet in view.facets(node)? {
        let mut refs = BTreeMap::new();
        for field in view.reference_fields(*facet)? {
            let text = match field.target {
                Some(target) if exported.contains(&target) => keys.get(&target).map(|key| {
                    let reference = match target {
                        ObjectRef::Node(_) => RefV0::Node(key.as_str()),
                        ObjectRef::Facet(_) => RefV0::Facet(key.as_str()),
                    };
                    reference.to_string()
                }),
                Some(_) => {
                    *dropped += 1;
                    None
                }
                None => None,
            };
            refs.insert(field.path, text);
        }
        facets.push(FacetV0 {
            key: keys.get(&ObjectRef::Facet(*facet)).cloned(),
            kind: view.facet_kind(*facet)?.to_string(),
            value: view.facet_value(*facet)?.clone(),
            refs,
        });
    }

    let mut children = Vec::new();
    for child in view.children(node)? {
        children.push(export_node(view, *child, keys, exported, dropped)?);
    }

    Ok(NodeV0 {
        key: keys.get(&ObjectRef::Node(node)).cloned(),
        name: view.node_name(node)?.to_string(),
        facets,
        children,
    })
}

/// Serialize to YAML text
pub fn to_yaml_string(doc: &DocumentV0) -> Result<String> {
    serde_yaml::to_string(doc).map_err(|e| yaml_error("document_serialize", e))
}

/// Serialize and write a document file
pub fn write_document_file(path: &Path, doc: &DocumentV0) -> Result<()> {
    let yaml = to_yaml_string(doc)?;
    fs::write(path, &yaml).map_err(|e| io_error("document_write", e))?;
    tracing::debug!(
        path = %path.display(),
        size_bytes = yaml.len(),
        "Wrote document"
    );
    Ok(())
}
