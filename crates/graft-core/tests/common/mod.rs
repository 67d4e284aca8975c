use graft_core::{
    find_additions, AdditionTree, Document, FacetId, FacetKind, NodeId, TreeView,
};
use serde_json::json;

/// Handles of the three-hierarchy scenario built by [`scenario`]
#[allow(dead_code)]
pub struct Scenario {
    pub doc: Document,
    pub baseline: NodeId,
    pub modified: NodeId,
    pub destination: NodeId,
    /// Modified `A`, which gains one `Spin` facet
    pub mod_a: NodeId,
    /// Modified `C`, the new subtree
    pub mod_c: NodeId,
    pub spin: FacetId,
    pub dest_a: NodeId,
    pub dest_b: NodeId,
}

/// Baseline `Root{A, B}`, modified `Root{A(+Spin), B, C}`, destination `Root'{A', B'}`
///
/// All three live in one document so references can cross between them.
/// `A` and `B` carry a `Mesh` facet everywhere; the destination's copies
/// carry different values to mark local customization.
#[allow(dead_code)]
pub fn scenario() -> Scenario {
    let mut doc = Document::new();

    let baseline = doc.create_root("Root").unwrap();
    for name in ["A", "B"] {
        let n = doc.create_child(baseline, name).unwrap();
        doc.attach_facet(n, "Mesh", json!({"asset": name})).unwrap();
    }

    let modified = doc.create_root("Root").unwrap();
    let mod_a = doc.create_child(modified, "A").unwrap();
    doc.attach_facet(mod_a, "Mesh", json!({"asset": "A"})).unwrap();
    let spin = doc.attach_facet(mod_a, "Spin", json!({"rpm": 30})).unwrap();
    let mod_b = doc.create_child(modified, "B").unwrap();
    doc.attach_facet(mod_b, "Mesh", json!({"asset": "B"})).unwrap();
    let mod_c = doc.create_child(modified, "C").unwrap();
    doc.attach_facet(mod_c, "Mesh", json!({"asset": "C"})).unwrap();

    let destination = doc.create_root("Root'").unwrap();
    let dest_a = doc.create_child(destination, "A").unwrap();
    doc.attach_facet(dest_a, "Mesh", json!({"asset": "A", "tint": "red"}))
        .unwrap();
    let dest_b = doc.create_child(destination, "B").unwrap();
    doc.attach_facet(dest_b, "Mesh", json!({"asset": "B", "tint": "blue"}))
        .unwrap();

    Scenario {
        doc,
        baseline,
        modified,
        destination,
        mod_a,
        mod_c,
        spin,
        dest_a,
        dest_b,
    }
}

/// Align the scenario and pin the root to the destination
#[allow(dead_code)]
pub fn aligned(s: &Scenario) -> AdditionTree {
    let mut tree = find_additions(&s.doc, s.baseline, &s.doc, s.modified).unwrap();
    let root = tree.root();
    tree.set_remap_target(root, s.destination, &s.doc).unwrap();
    tree
}

/// Names of a node's children, in order
#[allow(dead_code)]
pub fn child_names(view: &dyn TreeView, node: NodeId) -> Vec<String> {
    view.children(node)
        .unwrap()
        .iter()
        .map(|c| view.node_name(*c).unwrap().to_string())
        .collect()
}

/// Kinds of a node's facets, in order
#[allow(dead_code)]
pub fn facet_kinds(view: &dyn TreeView, node: NodeId) -> Vec<String> {
    view.facets(node)
        .unwrap()
        .iter()
        .map(|f| view.facet_kind(*f).unwrap().to_string())
        .collect()
}

/// Values of a node's facets of one kind, in order
#[allow(dead_code)]
pub fn values_of(view: &dyn TreeView, node: NodeId, kind: &str) -> Vec<serde_json::Value> {
    view.facets_of_kind(node, &FacetKind::from(kind))
        .unwrap()
        .iter()
        .map(|f| view.facet_value(*f).unwrap().clone())
        .collect()
}
