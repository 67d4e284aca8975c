//! Hierarchy documents
//!
//! Provides:
//! - Document Format v0 schema
//! - YAML parser with validation
//! - Loader materializing a document into an arena `Document`
//! - Writer exporting trees back to the format

pub mod format_v0;
pub mod loader;
pub mod parser;
pub mod writer;

pub use format_v0::{DocumentV0, FacetV0, NodeV0, RefV0};
pub use loader::{load_document_file, load_document_str, materialize, LoadedDocument};
pub use parser::{parse_document_file, parse_document_str, validate_document};
pub use writer::{export_tree, export_trees, to_yaml_string, write_document_file};
