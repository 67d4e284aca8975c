use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::errors::Result;
use crate::model::{NodeId, ObjectRef};
use crate::ops::TreeView;

/// SHA-256 (hex) of a subtree's canonical JSON form
///
/// Covers names, child order, facet kinds and order, values, and
/// references. References are rendered as name paths (`Root/A` or
/// `Root/A#Light[1]`) so the digest does not depend on arena handles.
///
/// # Errors
///
/// Propagates lookup failures from `view`.
pub fn subtree_digest(view: &dyn TreeView, root: NodeId) -> Result<String> {
    let canonical = canonical_node(view, root)?;
    let bytes = serde_json::to_vec(&canonical)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

fn canonical_node(view: &dyn TreeView, node: NodeId) -> Result<Value> {
    let mut facets = Vec::new();
    for facet in view.facets(node)? {
        let mut refs = Map::new();
        for field in view.reference_fields(*facet)? {
            let rendered = match field.target {
                Some(target) => Value::String(render_ref(view, target)?),
                None => Value::Null,
            };
            refs.insert(field.path, rendered);
        }
        facets.push(json!({
            "kind": view.facet_kind(*facet)?.as_str(),
            "value": view.facet_value(*facet)?,
            "refs": refs,
        }));
    }

    let mut children = Vec::new();
    for child in view.children(node)? {
        children.push(canonical_node(view, *child)?);
    }

    Ok(json!({
        "name": view.node_name(node)?,
        "facets": facets,
        "children": children,
    }))
}

/// Path rendering of a referent; dangling handles render as `<missing>`
pub(crate) fn render_ref(view: &dyn TreeView, target: ObjectRef) -> Result<String> {
    if !view.contains(target) {
        return Ok("<missing>".to_string());
    }
    match target {
        ObjectRef::Node(node) => view.node_path(node),
        ObjectRef::Facet(facet) => {
            let owner = view.facet_owner(facet)?;
            let kind = view.facet_kind(facet)?;
            let index = view
                .facets_of_kind(owner, kind)?
                .iter()
                .position(|f| *f == facet)
                .unwrap_or(0);
            Ok(format!("{}#{}[{}]", view.node_path(owner)?, kind, index))
        }
    }
}
