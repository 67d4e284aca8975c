//! graft core - propagate structural additions between hierarchies
//!
//! Given a baseline hierarchy, a modified copy of it, and an independently
//! evolved destination, this crate:
//! - aligns baseline and modified to find added facets and subtrees ([`align`])
//! - proposes destination attach points by name ([`guess`])
//! - merges the additions under per-kind conflict modes ([`merge`])
//! - runs post-merge hooks on merged facets ([`hooks`])
//! - rewrites references that still point into the modified hierarchy ([`fixup`])
//!
//! Engines talk to hierarchies only through [`TreeView`] and [`TreeEdit`];
//! [`Document`] is the in-crate arena implementation.

pub mod align;
pub mod config;
pub mod digest;
pub mod errors;
pub mod fixup;
pub mod guess;
pub mod hooks;
pub mod logging_facility;
pub mod merge;
pub mod model;
pub mod ops;
pub mod replace;

// Logging macros resolve schema constants through this path
pub use graft_core_types;

// Re-export commonly used types
pub use align::find_additions;
pub use config::MergeConfig;
pub use digest::subtree_digest;
pub use errors::{ExError, ExErrorKind, GraftError, Result};
pub use fixup::{fix_references, FixupEntry, FixupReport};
pub use hooks::{
    collect_hooks, invoke_hooks, HookCall, HookDef, HookDiscovery, HookRegistry, HookReport,
    HookSignature,
};
pub use merge::{merge_additions, MergeOutcome, MergedFacet};
pub use model::{
    AdditionKind, AdditionNodeId, AdditionTree, AdditionTreeNode, ConflictMode, FacetId,
    FacetKind, NodeId, ObjectRef, RemapTable, TargetIssue, TargetStatus,
};
pub use ops::{Document, TreeEdit, TreeView};
pub use replace::{replace, ReplaceOutcome};
