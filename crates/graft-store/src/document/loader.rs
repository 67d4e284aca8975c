//! Materialize a parsed document into an arena [`Document`]

use std::collections::BTreeMap;
use std::path::Path;

use graft_core::{Document, FacetId, NodeId, ObjectRef};

use crate::document::format_v0::{DocumentV0, NodeV0, RefV0};
use crate::document::parser::{parse_document_file, parse_document_str, validate_document};
use crate::errors::{document_validation, tree_not_found, Result};

/// A document materialized in memory
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub document: Document,
    /// Top-level trees by name
    pub roots: BTreeMap<String, NodeId>,
    /// Every keyed node and facet
    pub keys: BTreeMap<String, ObjectRef>,
}

impl LoadedDocument {
    /// Root of the tree named `name`
    pub fn root(&self, name: &str) -> Result<NodeId> {
        self.roots
            .get(name)
            .copied()
            .ok_or_else(|| tree_not_found(name))
    }
}

/// Load and materialize a document file
pub fn load_document_file(path: &Path) -> Result<LoadedDocument> {
    let parsed = parse_document_file(path)?;
    let loaded = materialize(&parsed)?;
    tracing::debug!(
        path = %path.display(),
        trees = loaded.roots.len(),
        nodes = loaded.document.node_count(),
        "Loaded document"
    );
    Ok(loaded)
}

/// Load and materialize a document from a string
pub fn load_document_str(content: &str) -> Result<LoadedDocument> {
    let parsed = parse_document_str(content)?;
    materialize(&parsed)
}

/// Build a fresh [`Document`] from an already parsed document
///
/// Runs validation again, so hand-built values are safe to pass.
pub fn materialize(parsed: &DocumentV0) -> Result<LoadedDocument> {
    validate_document(parsed)?;

    let mut document = Document::new();
    let mut roots = BTreeMap::new();
    let mut keys = BTreeMap::new();
    // (facet, definition) pairs whose references are declared once all keys exist
    let mut pending: Vec<(FacetId, &BTreeMap<String, Option<String>>)> = Vec::new();

    for tree in &parsed.trees {
        let root = document.create_root(tree.name.as_str())?;
        roots.insert(tree.name.clone(), root);

        let mut stack: Vec<(NodeId, &NodeV0)> = vec![(root, tree)];
        while let Some((node, def)) = stack.pop() {
            if let Some(key) = &def.key {
                keys.insert(key.clone(), ObjectRef::Node(node));
            }
            for facet_def in &def.facets {
                let facet =
                    document.attach_facet(node, facet_def.kind.as_str(), facet_def.value.clone())?;
                if let Some(key) = &facet_def.key {
                    keys.insert(key.clone(), ObjectRef::Facet(facet));
                }
                if !facet_def.refs.is_empty() {
                    pending.push((facet, &facet_def.refs));
                }
            }
            // Children are created in order; only their expansion is deferred
            let mut created = Vec::with_capacity(def.children.len());
            for child_def in &def.children {
                let child = document.create_child(node, child_def.name.as_str())?;
                created.push((child, child_def));
            }
            stack.extend(created.into_iter().rev());
        }
    }

    for (facet, refs) in pending {
        for (path, target) in refs {
            let resolved = match target {
                Some(text) => Some(resolve(&keys, text)?),
                None => None,
            };
            document.declare_reference(facet, path.as_str(), resolved)?;
        }
    }

    Ok(LoadedDocument {
        document,
        roots,
        keys,
    })
}

fn resolve(keys: &BTreeMap<String, ObjectRef>, text: &str) -> Result<ObjectRef> {
    let reference = RefV0::parse(text)
        .ok_or_else(|| document_validation(&format!("Malformed reference '{}'", text)))?;
    keys.get(reference.key())
        .copied()
        .ok_or_else(|| document_validation(&format!("Reference {} does not resolve", reference)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_core::{FacetKind, TreeView};

    const SCENE: &str = r#"
schema_version: 0
trees:
  - key: root
    name: Root
    facets:
      - key: root-mesh
        kind: Mesh
        value: { asset: root }
    children:
      - name: A
        children:
          - name: A1
      - name: B
        facets:
          - kind: Follow
            refs: { target: node:root, mesh: facet:root-mesh, spare: ~ }
  - name: Other
"#;

    #[test]
    fn test_materialize_preserves_order_and_names() {
        let loaded = load_document_str(SCENE).unwrap();
        let doc = &loaded.document;
        let root = loaded.root("Root").unwrap();

        let names: Vec<&str> = doc
            .children(root)
            .unwrap()
            .iter()
            .map(|c| doc.node_name(*c).unwrap())
            .collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(doc.node_count(), 5);
        assert_eq!(doc.roots().len(), 2);
        let a1 = doc.resolve_path(root, "Root/A/A1").unwrap();
        assert_eq!(doc.node_path(a1).unwrap(), "Root/A/A1");
    }

    #[test]
    fn test_references_resolve_to_handles() {
        let loaded = load_document_str(SCENE).unwrap();
        let doc = &loaded.document;
        let root = loaded.root("Root").unwrap();
        let b = doc.resolve_path(root, "Root/B").unwrap();
        let follow = doc.facets_of_kind(b, &FacetKind::from("Follow")).unwrap()[0];

        assert_eq!(doc.reference(follow, "target").unwrap(), Some(root.into()));
        assert_eq!(
            doc.reference(follow, "mesh").unwrap(),
            Some(loaded.keys["root-mesh"])
        );
        assert_eq!(doc.reference(follow, "spare").unwrap(), None);
    }

    #[test]
    fn test_missing_tree_lookup() {
        let loaded = load_document_str(SCENE).unwrap();
        let err = loaded.root("Nope").unwrap_err();
        assert_eq!(err.code(), "ERR_NOT_FOUND");
    }
}
