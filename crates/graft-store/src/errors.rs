//! Error handling for graft-store
//!
//! Wraps graft-core ExError with store-specific helpers

use graft_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a document validation error
pub fn document_validation(reason: &str) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("document_parse")
        .with_message(reason.to_string())
}

/// Create a YAML (de)serialization error
pub fn yaml_error(operation: &str, err: serde_yaml::Error) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op(operation.to_string())
        .with_message(format!("YAML error: {}", err))
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Create a lookup error for a tree name missing from a loaded document
pub fn tree_not_found(name: &str) -> ExError {
    ExError::new(ExErrorKind::NotFound)
        .with_op("tree_lookup")
        .with_entity_id(name.to_string())
        .with_message(format!("No tree named '{}'", name))
}
