//! Reference fixup
//!
//! After a merge, reference fields in the destination may still point into
//! the modified (source) hierarchy: copied facets carry their references
//! verbatim. This pass rewrites them through the [`RemapTable`].

use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

use tracing::warn;

use crate::errors::Result;
use crate::model::{ConflictMode, FacetId, FacetKind, NodeId, ObjectRef, RemapTable};
use crate::ops::TreeEdit;
use crate::{log_op_end, log_op_start};

/// One inspected reference field that pointed into the source hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixupEntry {
    /// Destination node owning the facet
    pub node: NodeId,
    pub node_name: String,
    pub facet: FacetId,
    pub facet_kind: FacetKind,
    pub field_path: String,
    /// Source object the field referenced
    pub referenced: ObjectRef,
    /// New referent, for fixed entries
    pub resolved: Option<ObjectRef>,
}

impl fmt::Display for FixupEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}.{}", self.node_name, self.facet_kind, self.field_path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixupReport {
    pub fixed: Vec<FixupEntry>,
    pub unfixed: Vec<FixupEntry>,
}

impl FixupReport {
    /// True when no reference was left pointing into the source
    pub fn is_clean(&self) -> bool {
        self.unfixed.is_empty()
    }
}

/// Rewrite references from `destination_root`'s subtree into `source_root`'s
///
/// Resolution per field:
/// 1. an exact remap entry for the referenced object;
/// 2. for a facet whose owner was mapped, the same-index facet of the same
///    kind on the mapped node, unless that kind was merged with `KeepDest`;
/// 3. otherwise the field is left alone and reported unfixed.
///
/// # Errors
///
/// Propagates tree-provider failures; unresolved fields are not errors.
pub fn fix_references(
    doc: &mut dyn TreeEdit,
    destination_root: NodeId,
    source_root: NodeId,
    remap: &RemapTable,
) -> Result<FixupReport> {
    let start = Instant::now();
    log_op_start!("fix_references", remap_len = remap.len());

    // Captured before any rewrite
    let source: HashSet<ObjectRef> = doc.collect_hierarchy(source_root)?;

    let mut report = FixupReport::default();
    for node in doc.descendants(destination_root)? {
        for facet in doc.facets(node)?.to_vec() {
            for field in doc.reference_fields(facet)? {
                let Some(referenced) = field.target else {
                    continue;
                };
                if !source.contains(&referenced) {
                    continue;
                }

                let resolved = resolve(&*doc, referenced, remap)?;
                if let Some(new) = resolved {
                    doc.set_reference(facet, &field.path, Some(new))?;
                }
                let entry = FixupEntry {
                    node,
                    node_name: doc.node_name(node)?.to_string(),
                    facet,
                    facet_kind: doc.facet_kind(facet)?.clone(),
                    field_path: field.path,
                    referenced,
                    resolved,
                };
                if entry.resolved.is_some() {
                    report.fixed.push(entry);
                } else {
                    warn!(
                        node = %entry.node_name,
                        facet_kind = %entry.facet_kind,
                        field_path = %entry.field_path,
                        referenced = %entry.referenced,
                        "reference into source hierarchy could not be fixed"
                    );
                    report.unfixed.push(entry);
                }
            }
        }
    }

    log_op_end!(
        "fix_references",
        duration_ms = start.elapsed().as_millis() as u64,
        fixed = report.fixed.len(),
        unfixed = report.unfixed.len()
    );
    Ok(report)
}

fn resolve(doc: &dyn TreeEdit, referenced: ObjectRef, remap: &RemapTable) -> Result<Option<ObjectRef>> {
    if let Some(mapped) = remap.get(referenced) {
        // A later KeepSrc pass may have destroyed the mapped facet
        return Ok(doc.contains(mapped).then_some(mapped));
    }

    let ObjectRef::Facet(facet) = referenced else {
        return Ok(None);
    };
    let owner = doc.facet_owner(facet)?;
    let Some(mapped_owner) = remap.node(owner) else {
        return Ok(None);
    };
    let kind = doc.facet_kind(facet)?;
    if remap.policy(owner, kind) == Some(ConflictMode::KeepDest) {
        return Ok(None);
    }

    let position = doc
        .facets_of_kind(owner, kind)?
        .iter()
        .position(|f| *f == facet);
    let counterpart = match position {
        Some(index) => doc.facets_of_kind(mapped_owner, kind)?.get(index).copied(),
        None => None,
    };
    Ok(counterpart.map(ObjectRef::Facet))
}
