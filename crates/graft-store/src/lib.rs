//! graft store - hierarchy documents on disk
//!
//! Provides:
//! - Document Format v0 (YAML) schema, parser and validation
//! - Materialization into a graft-core `Document`, e.g. for a baseline
//!   template kept in its own file
//! - Export of merged trees back to the format

pub mod document;
pub mod errors;

// Re-export key types
pub use document::{
    export_tree, export_trees, load_document_file, load_document_str, write_document_file,
    DocumentV0, LoadedDocument,
};
pub use errors::Result;
