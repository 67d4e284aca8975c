//! Document parser with validation
//!
//! Parses YAML and validates schema version, names, key uniqueness, and
//! referential integrity

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::document::format_v0::{DocumentV0, NodeV0, RefV0};
use crate::errors::{document_validation, io_error, Result};

/// Parse a document file from a path
pub fn parse_document_file(path: &Path) -> Result<DocumentV0> {
    let content = fs::read_to_string(path).map_err(|e| io_error("document_read", e))?;
    parse_document_str(&content)
}

/// Parse a document from a string
pub fn parse_document_str(content: &str) -> Result<DocumentV0> {
    let doc: DocumentV0 = serde_yaml::from_str(content)
        .map_err(|e| document_validation(&format!("YAML parse error: {}", e)))?;

    validate_document(&doc)?;

    Ok(doc)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    Node,
    Facet,
}

/// Validate a parsed document
pub fn validate_document(doc: &DocumentV0) -> Result<()> {
    if doc.schema_version != 0 {
        return Err(document_validation(&format!(
            "Unsupported schema_version: {}. Expected 0",
            doc.schema_version
        )));
    }

    let mut tree_names = HashSet::new();
    for tree in &doc.trees {
        if !tree_names.insert(tree.name.as_str()) {
            return Err(document_validation(&format!(
                "Duplicate tree name: {}",
                tree.name
            )));
        }
    }

    // Keys share one namespace across nodes and facets
    let mut keys: HashMap<&str, KeyKind> = HashMap::new();
    let mut stack: Vec<&NodeV0> = doc.trees.iter().collect();
    while let Some(node) = stack.pop() {
        if node.name.trim().is_empty() {
            return Err(document_validation("Node name cannot be empty"));
        }
        if let Some(key) = &node.key {
            claim_key(&mut keys, key, KeyKind::Node)?;
        }
        for facet in &node.facets {
            if facet.kind.trim().is_empty() {
                return Err(document_validation(&format!(
                    "Facet kind cannot be empty (node {})",
                    node.name
                )));
            }
            if let Some(key) = &facet.key {
                claim_key(&mut keys, key, KeyKind::Facet)?;
            }
        }
        stack.extend(node.children.iter());
    }

    let mut stack: Vec<&NodeV0> = doc.trees.iter().collect();
    while let Some(node) = stack.pop() {
        for facet in &node.facets {
            for (path, target) in &facet.refs {
                let Some(text) = target else {
                    continue;
                };
                let reference = RefV0::parse(text).ok_or_else(|| {
                    document_validation(&format!(
                        "Malformed reference '{}' at {}.{} (expected node:<key> or facet:<key>)",
                        text, facet.kind, path
                    ))
                })?;
                let expected = match reference {
                    RefV0::Node(_) => KeyKind::Node,
                    RefV0::Facet(_) => KeyKind::Facet,
                };
                match keys.get(reference.key()) {
                    Some(kind) if *kind == expected => {}
                    Some(_) => {
                        return Err(document_validation(&format!(
                            "Reference {} at {}.{} names a key of the wrong kind",
                            reference, facet.kind, path
                        )))
                    }
                    None => {
                        return Err(document_validation(&format!(
                            "Reference {} at {}.{} does not resolve",
                            reference, facet.kind, path
                        )))
                    }
                }
            }
        }
        stack.extend(node.children.iter());
    }

    Ok(())
}

fn claim_key<'a>(keys: &mut HashMap<&'a str, KeyKind>, key: &'a str, kind: KeyKind) -> Result<()> {
    if key.is_empty() {
        return Err(document_validation("Keys cannot be empty"));
    }
    if keys.insert(key, kind).is_some() {
        return Err(document_validation(&format!("Duplicate key: {}", key)));
    }
    Ok(())
}
