//! Document Format v0 schema
//!
//! Defines the YAML structure for hierarchy documents

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level document file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentV0 {
    /// Schema version (must be 0 for this format)
    pub schema_version: u32,

    /// Top-level trees, addressed by name
    #[serde(default)]
    pub trees: Vec<NodeV0>,
}

/// Node definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeV0 {
    /// Document-unique key; only needed when something references the node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<FacetV0>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeV0>,
}

/// Facet definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetV0 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Facet kind, e.g. `Mesh`
    pub kind: String,

    /// Opaque payload
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,

    /// Reference fields by path; `~` declares an unset field
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub refs: BTreeMap<String, Option<String>>,
}

/// A parsed `node:<key>` / `facet:<key>` reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefV0<'a> {
    Node(&'a str),
    Facet(&'a str),
}

impl<'a> RefV0<'a> {
    /// Parse reference text; `None` for anything without a known prefix or key
    pub fn parse(text: &'a str) -> Option<Self> {
        let (prefix, key) = text.split_once(':')?;
        if key.is_empty() {
            return None;
        }
        match prefix {
            "node" => Some(RefV0::Node(key)),
            "facet" => Some(RefV0::Facet(key)),
            _ => None,
        }
    }

    pub fn key(&self) -> &'a str {
        match self {
            RefV0::Node(key) | RefV0::Facet(key) => key,
        }
    }
}

impl fmt::Display for RefV0<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefV0::Node(key) => write!(f, "node:{}", key),
            RefV0::Facet(key) => write!(f, "facet:{}", key),
        }
    }
}
