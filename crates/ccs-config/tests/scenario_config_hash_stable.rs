//! Config hash stability across key order and layering.

use ccs_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
upstream:
  base_url: "http://www.coinchoose.com"
  path: "api.php"
  base: "BTC"
pacing:
  min_interval_ms: 2000
db:
  url_env: "CCS_DATABASE_URL"
"#;

const BASE_YAML_REORDERED: &str = r#"
db:
  url_env: "CCS_DATABASE_URL"
pacing:
  min_interval_ms: 2000
upstream:
  base: "BTC"
  path: "api.php"
  base_url: "http://www.coinchoose.com"
"#;

const OVERLAY_YAML: &str = r#"
pacing:
  min_interval_ms: 5000
archive:
  enabled: false
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash.len(), 64);
}

#[test]
fn key_order_does_not_change_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_changes_hash_and_typed_values() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_ne!(base.config_hash, merged.config_hash);

    let cfg = merged.scrape_config().unwrap();
    assert_eq!(cfg.pacing.min_interval_ms, 5000);
    assert!(!cfg.archive.enabled);
    assert_eq!(cfg.upstream.base, "BTC");
}

#[test]
fn files_load_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let over = dir.path().join("local.yaml");
    std::fs::write(&base, BASE_YAML).unwrap();
    std::fs::write(&over, OVERLAY_YAML).unwrap();

    let from_files = ccs_config::load_layered_yaml(&[
        base.to_str().unwrap(),
        over.to_str().unwrap(),
    ])
    .unwrap();
    let from_strings = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(from_files.config_hash, from_strings.config_hash);
}

#[test]
fn missing_file_is_an_error_naming_the_path() {
    let err = ccs_config::load_layered_yaml(&["/nonexistent/ccs.yaml"]).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/ccs.yaml"));
}
