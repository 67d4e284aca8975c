#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::collections::BTreeSet;

use graft_core::{find_additions, AdditionKind, Document, FacetId, NodeId};
use proptest::prelude::*;
use serde_json::json;

use common::{scenario, Scenario};

const KINDS: [&str; 3] = ["Mesh", "Light", "Tag"];

/// Random tree shape: facet kinds (indices into KINDS) and children
#[derive(Debug, Clone)]
struct Shape {
    facets: Vec<usize>,
    children: Vec<Shape>,
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    let leaf = prop::collection::vec(0..KINDS.len(), 0..3).prop_map(|facets| Shape {
        facets,
        children: Vec::new(),
    });
    leaf.prop_recursive(3, 24, 4, |inner| {
        (
            prop::collection::vec(0..KINDS.len(), 0..3),
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(facets, children)| Shape { facets, children })
    })
}

/// Tiny deterministic generator so insertions follow the proptest seed
struct Lcg(u64);

impl Lcg {
    fn below(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound.max(1)
    }
}

/// Build `shape` as a new tree; children are named `c0`, `c1`, ...
fn build(doc: &mut Document, parent: Option<NodeId>, name: &str, shape: &Shape) -> NodeId {
    let node = match parent {
        Some(p) => doc.create_child(p, name).unwrap(),
        None => doc.create_root(name).unwrap(),
    };
    for kind in &shape.facets {
        doc.attach_facet(node, KINDS[*kind], json!(null)).unwrap();
    }
    for (i, child) in shape.children.iter().enumerate() {
        build(doc, Some(node), &format!("c{}", i), child);
    }
    node
}

#[derive(Default)]
struct Inserted {
    subtrees: BTreeSet<NodeId>,
    facets: BTreeSet<FacetId>,
}

/// Build `shape` again, inserting new subtrees and trailing facets at random
fn build_with_insertions(
    doc: &mut Document,
    parent: Option<NodeId>,
    name: &str,
    shape: &Shape,
    rng: &mut Lcg,
    counter: &mut usize,
    inserted: &mut Inserted,
) -> NodeId {
    let node = match parent {
        Some(p) => doc.create_child(p, name).unwrap(),
        None => doc.create_root(name).unwrap(),
    };
    for kind in &shape.facets {
        doc.attach_facet(node, KINDS[*kind], json!(null)).unwrap();
    }
    for _ in 0..rng.below(3) {
        let facet = doc
            .attach_facet(node, KINDS[rng.below(KINDS.len())], json!("added"))
            .unwrap();
        inserted.facets.insert(facet);
    }

    for (i, child) in shape.children.iter().enumerate() {
        insert_new(doc, node, rng, counter, inserted);
        build_with_insertions(
            doc,
            Some(node),
            &format!("c{}", i),
            child,
            rng,
            counter,
            inserted,
        );
    }
    insert_new(doc, node, rng, counter, inserted);
    node
}

/// Zero or one new child, named so it never matches a baseline child
fn insert_new(doc: &mut Document, parent: NodeId, rng: &mut Lcg, counter: &mut usize, inserted: &mut Inserted) {
    for _ in 0..rng.below(2) {
        *counter += 1;
        let new = doc.create_child(parent, format!("new{}", counter)).unwrap();
        doc.attach_facet(new, "Tag", json!("inside new")).unwrap();
        inserted.subtrees.insert(new);
    }
}

/// Build `shape` dropping every child whose position hits the generator
fn build_with_deletions(doc: &mut Document, parent: Option<NodeId>, name: &str, shape: &Shape, rng: &mut Lcg) -> NodeId {
    let node = match parent {
        Some(p) => doc.create_child(p, name).unwrap(),
        None => doc.create_root(name).unwrap(),
    };
    for kind in &shape.facets {
        doc.attach_facet(node, KINDS[*kind], json!(null)).unwrap();
    }
    for (i, child) in shape.children.iter().enumerate() {
        if rng.below(3) == 0 {
            continue;
        }
        build_with_deletions(doc, Some(node), &format!("c{}", i), child, rng);
    }
    node
}

proptest! {
    #[test]
    fn prop_identical_trees_report_nothing(shape in shape_strategy()) {
        let mut doc = Document::new();
        let baseline = build(&mut doc, None, "Root", &shape);
        let modified = build(&mut doc, None, "Root", &shape);

        let tree = find_additions(&doc, baseline, &doc, modified).unwrap();

        prop_assert_eq!(tree.addition_count(), 0);
        prop_assert!(tree.iter().all(|(_, n)| !n.has_additions()));
    }

    #[test]
    fn prop_pure_insertions_are_recovered_exactly(shape in shape_strategy(), seed in any::<u64>()) {
        let mut doc = Document::new();
        let baseline = build(&mut doc, None, "Root", &shape);
        let mut inserted = Inserted::default();
        let mut counter = 0;
        let modified = build_with_insertions(
            &mut doc,
            None,
            "Root",
            &shape,
            &mut Lcg(seed),
            &mut counter,
            &mut inserted,
        );

        let tree = find_additions(&doc, baseline, &doc, modified).unwrap();

        let mut subtrees = BTreeSet::new();
        let mut facets = BTreeSet::new();
        for (_, node) in tree.iter() {
            match node.kind() {
                AdditionKind::Subtree => {
                    subtrees.insert(node.source().unwrap());
                }
                AdditionKind::FacetGroup { facets: group } => {
                    facets.extend(group.iter().copied());
                }
                AdditionKind::Carried => {}
            }
        }
        prop_assert_eq!(subtrees, inserted.subtrees.clone());
        prop_assert_eq!(facets, inserted.facets.clone());

        let anything = !inserted.subtrees.is_empty() || !inserted.facets.is_empty();
        prop_assert_eq!(tree.get(tree.root()).unwrap().has_additions(), anything);
    }

    #[test]
    fn prop_deletions_never_produce_additions(shape in shape_strategy(), seed in any::<u64>()) {
        let mut doc = Document::new();
        let baseline = build(&mut doc, None, "Root", &shape);
        let modified = build_with_deletions(&mut doc, None, "Root", &shape, &mut Lcg(seed));

        let tree = find_additions(&doc, baseline, &doc, modified).unwrap();

        prop_assert_eq!(tree.addition_count(), 0);
    }
}

#[test]
fn test_scenario_reports_subtree_and_facet_group() {
    let Scenario {
        doc,
        baseline,
        modified,
        mod_a,
        mod_c,
        spin,
        ..
    } = scenario();

    let tree = find_additions(&doc, baseline, &doc, modified).unwrap();
    let root = tree.get(tree.root()).unwrap();

    assert!(root.has_additions());
    assert_eq!(tree.addition_count(), 2);

    let a = tree.get(root.children()[0]).unwrap();
    assert_eq!(a.source(), Some(mod_a));
    assert!(!a.is_addition());
    let group = tree.get(a.children()[0]).unwrap();
    assert_eq!(group.facets(), Some(&[spin][..]));

    let b = tree.get(root.children()[1]).unwrap();
    assert!(!b.has_additions());

    let c = tree.get(root.children()[2]).unwrap();
    assert_eq!(c.kind(), &AdditionKind::Subtree);
    assert_eq!(c.source(), Some(mod_c));
    assert!(c.children().is_empty());
}

#[test]
fn test_baseline_from_separate_document() {
    let mut template = Document::new();
    let t_root = template.create_root("Rig").unwrap();
    template.create_child(t_root, "Arm").unwrap();

    let mut doc = Document::new();
    let root = doc.create_root("Rig").unwrap();
    doc.create_child(root, "Arm").unwrap();
    doc.create_child(root, "Leg").unwrap();

    let tree = find_additions(&template, t_root, &doc, root).unwrap();

    assert_eq!(tree.addition_count(), 1);
    let (_, leg) = tree.iter().last().unwrap();
    assert_eq!(leg.name(), "Leg");
}

#[test]
fn test_duplicate_named_siblings_appended_after_survivors() {
    let mut doc = Document::new();
    let baseline = doc.create_root("Root").unwrap();
    doc.create_child(baseline, "Wheel").unwrap();
    doc.create_child(baseline, "Wheel").unwrap();

    let modified = doc.create_root("Root").unwrap();
    doc.create_child(modified, "Wheel").unwrap();
    doc.create_child(modified, "Wheel").unwrap();
    let third = doc.create_child(modified, "Wheel").unwrap();

    let tree = find_additions(&doc, baseline, &doc, modified).unwrap();

    let added: Vec<NodeId> = tree
        .iter()
        .filter(|(_, n)| n.is_addition())
        .filter_map(|(_, n)| n.source())
        .collect();
    assert_eq!(added, vec![third]);
}
