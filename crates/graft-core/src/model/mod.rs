pub mod addition;
pub mod conflict;
pub mod handle;
pub mod remap;

pub use addition::{AdditionKind, AdditionNodeId, AdditionTree, AdditionTreeNode, TargetIssue, TargetStatus};
pub use conflict::ConflictMode;
pub use handle::{FacetId, FacetKind, NodeId, ObjectRef};
pub use remap::RemapTable;
