// Integration tests for document parsing and validation

use std::path::PathBuf;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

#[test]
fn test_parse_scene() {
    let path = fixtures_dir().join("scene.yaml");

    let result = graft_store::document::parse_document_file(&path);

    assert!(result.is_ok(), "Should parse scene: {:?}", result.err());
    let doc = result.unwrap();
    assert_eq!(doc.schema_version, 0);
    let names: Vec<&str> = doc.trees.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Baseline", "Modified", "Destination"]);
    assert_eq!(doc.trees[1].children[0].key.as_deref(), Some("mod-arm"));
}

#[test]
fn test_reject_invalid_schema_version() {
    let path = fixtures_dir().join("invalid_schema_version.yaml");

    let err = graft_store::document::parse_document_file(&path).unwrap_err();

    assert_eq!(err.code(), "ERR_INVALID_INPUT");
    assert!(
        err.to_string().contains("schema_version"),
        "Error should mention schema_version"
    );
}

#[test]
fn test_reject_dangling_reference() {
    let path = fixtures_dir().join("invalid_dangling_ref.yaml");

    let err = graft_store::document::parse_document_file(&path).unwrap_err();

    assert!(err.to_string().contains("node:missing"));
    assert!(err.to_string().contains("does not resolve"));
}

#[test]
fn test_reject_duplicate_key() {
    let path = fixtures_dir().join("invalid_duplicate_key.yaml");

    let err = graft_store::document::parse_document_file(&path).unwrap_err();

    assert!(err.to_string().contains("Duplicate key: twin"));
}

#[test]
fn test_missing_file_is_io_error() {
    let path = fixtures_dir().join("does_not_exist.yaml");

    let err = graft_store::load_document_file(&path).unwrap_err();

    assert_eq!(err.code(), "ERR_IO");
    assert_eq!(err.op(), Some("document_read"));
}

#[test]
fn test_yaml_syntax_error_is_rejected() {
    let err = graft_store::load_document_str("schema_version: [0").unwrap_err();

    assert!(err.to_string().contains("YAML parse error"));
}
