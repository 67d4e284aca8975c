//! Post-merge hooks
//!
//! Facet kinds declare "run after merge" callbacks through a
//! [`HookDiscovery`] implementation. After a merge, hooks of every merged
//! facet run once in ascending priority order; the first failure stops the
//! rest. Pre-existing destination facets that the merge did not touch never
//! fire hooks.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};

use crate::errors::{ExError, ExErrorKind, Result};
use crate::merge::MergedFacet;
use crate::model::{FacetId, FacetKind, NodeId};
use crate::ops::{TreeEdit, TreeView};

/// Error type a hook may return
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// A hook body; receives the document and the facet it runs on
pub type HookFn = Arc<dyn Fn(&mut dyn TreeEdit, &HookCall) -> std::result::Result<(), HookError> + Send + Sync>;

/// Arguments a hook declares it wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HookSignature {
    /// Only the facet it runs on
    #[default]
    NoArgs,
    /// Also the modified-tree node the facet was copied from
    OriginalNode,
}

/// Invocation context handed to a hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookCall {
    pub facet: FacetId,
    /// Set only for [`HookSignature::OriginalNode`] hooks
    pub original_node: Option<NodeId>,
}

/// One declared hook of a facet kind
#[derive(Clone)]
pub struct HookDef {
    pub name: String,
    /// Lower runs first
    pub priority: i32,
    pub signature: HookSignature,
    callable: HookFn,
}

impl HookDef {
    /// Declare a hook with priority 0
    pub fn new<F>(name: impl Into<String>, signature: HookSignature, callable: F) -> Self
    where
        F: Fn(&mut dyn TreeEdit, &HookCall) -> std::result::Result<(), HookError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            priority: 0,
            signature,
            callable: Arc::new(callable),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl fmt::Debug for HookDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDef")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Source of hook declarations per facet kind
pub trait HookDiscovery {
    /// Hooks declared by `kind`, in declaration order
    fn hooks_for(&self, kind: &FacetKind) -> &[HookDef];
}

/// Map-backed [`HookDiscovery`]
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<FacetKind, Vec<HookDef>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: impl Into<FacetKind>, hook: HookDef) {
        self.hooks.entry(kind.into()).or_default().push(hook);
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.values().all(Vec::is_empty)
    }
}

impl HookDiscovery for HookRegistry {
    fn hooks_for(&self, kind: &FacetKind) -> &[HookDef] {
        self.hooks.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A hook bound to the facet it will run on
#[derive(Debug, Clone)]
pub struct PendingHook {
    pub facet: FacetId,
    pub kind: FacetKind,
    pub original_node: NodeId,
    pub hook: HookDef,
}

impl PendingHook {
    fn label(&self) -> String {
        format!("{}.{}", self.kind, self.hook.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    pub facet: FacetId,
    pub kind: FacetKind,
    pub hook: String,
    pub message: String,
}

impl fmt::Display for HookFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} failed on {}: {}", self.kind, self.hook, self.facet, self.message)
    }
}

impl From<&HookFailure> for ExError {
    fn from(failure: &HookFailure) -> Self {
        ExError::new(ExErrorKind::HookFailed)
            .with_op("invoke_hooks")
            .with_entity_id(format!("{}.{}", failure.kind, failure.hook))
            .with_message(format!("failed on {}: {}", failure.facet, failure.message))
    }
}

/// What happened during hook invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookReport {
    /// `Kind.hook` labels, in invocation order
    pub invoked: Vec<String>,
    pub failure: Option<HookFailure>,
    /// Hooks not run because of the failure
    pub skipped: usize,
}

/// Gather hooks for the merged facets, ordered by ascending priority
///
/// Ties keep merge order. Facets destroyed later in the same merge are
/// ignored.
///
/// # Errors
///
/// Propagates lookup failures from `view`.
pub fn collect_hooks(
    registry: &dyn HookDiscovery,
    view: &dyn TreeView,
    merged: &[MergedFacet],
) -> Result<Vec<PendingHook>> {
    let mut pending = Vec::new();
    for m in merged {
        if !view.contains(m.facet.into()) {
            debug!(facet = %m.facet, "merged facet no longer exists, hooks skipped");
            continue;
        }
        let kind = view.facet_kind(m.facet)?;
        for hook in registry.hooks_for(kind) {
            pending.push(PendingHook {
                facet: m.facet,
                kind: kind.clone(),
                original_node: m.original_node,
                hook: hook.clone(),
            });
        }
    }
    pending.sort_by_key(|p| p.hook.priority);
    Ok(pending)
}

/// Run `pending` in order, stopping at the first failure
///
/// A failure is logged and reported, never returned as an error: the merge
/// that produced the facets is already committed.
pub fn invoke_hooks(doc: &mut dyn TreeEdit, pending: Vec<PendingHook>) -> HookReport {
    let mut report = HookReport::default();
    let total = pending.len();

    for (position, p) in pending.into_iter().enumerate() {
        let call = HookCall {
            facet: p.facet,
            original_node: match p.hook.signature {
                HookSignature::NoArgs => None,
                HookSignature::OriginalNode => Some(p.original_node),
            },
        };
        match (p.hook.callable)(&mut *doc, &call) {
            Ok(()) => {
                debug!(hook = %p.label(), facet = %p.facet, priority = p.hook.priority, "hook invoked");
                report.invoked.push(p.label());
            }
            Err(err) => {
                let failure = HookFailure {
                    facet: p.facet,
                    kind: p.kind,
                    hook: p.hook.name,
                    message: err.to_string(),
                };
                let ex_err = ExError::from(&failure);
                error!(
                    facet_kind = %failure.kind,
                    hook = %failure.hook,
                    facet = %failure.facet,
                    err.kind = ?ex_err.kind(),
                    err.code = ex_err.code(),
                    error = %err,
                    "post-merge hook failed, remaining hooks skipped"
                );
                report.failure = Some(failure);
                report.skipped = total - position - 1;
                break;
            }
        }
    }
    report
}
