pub mod document;
pub mod provider;

pub use document::Document;
pub use provider::{ReferenceField, TreeEdit, TreeView};
