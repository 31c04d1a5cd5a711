use std::collections::BTreeMap;

use blackbook_fs::lock::lock_path_for;
use blackbook_fs::{ConfigFormat, ConfigStore, Error};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde::Deserialize;
use serde_json::{Value, json};
use tempfile::tempdir;

#[derive(Debug, PartialEq, Deserialize)]
struct Settings {
    source_repo: String,
    tools: BTreeMap<String, bool>,
}

fn sample() -> Settings {
    Settings {
        source_repo: "~/dotfiles".into(),
        tools: BTreeMap::from([("claude".into(), true), ("cursor".into(), false)]),
    }
}

#[rstest]
#[case("config.yaml", "source_repo: ~/dotfiles\ntools:\n  claude: true\n  cursor: false\n")]
#[case("config.yml", "source_repo: ~/dotfiles\ntools: {claude: true, cursor: false}\n")]
#[case("config.toml", "source_repo = \"~/dotfiles\"\n\n[tools]\nclaude = true\ncursor = false\n")]
#[case("config.json", r#"{"source_repo": "~/dotfiles", "tools": {"claude": true, "cursor": false}}"#)]
fn loads_every_format(#[case] name: &str, #[case] content: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();

    let loaded: Settings = ConfigStore::new().load(&path).unwrap();

    assert_eq!(loaded, sample());
    assert!(!lock_path_for(&path).exists());
}

#[test]
fn yaml_loads_as_generic_value() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "settings:\n  drift_policy: auto\nfiles: []\n").unwrap();

    let value: Value = ConfigStore::new().load(&path).unwrap();
    assert_eq!(value, json!({"settings": {"drift_policy": "auto"}, "files": []}));
}

#[test]
fn malformed_toml_reports_format_and_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "settings = [unclosed").unwrap();

    let err = ConfigStore::new().load::<Value>(&path).unwrap_err();
    match err {
        Error::ConfigParse { path: p, format, .. } => {
            assert_eq!(p, path);
            assert_eq!(format, "TOML");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn format_detection_is_case_insensitive() {
    assert_eq!(
        ConfigFormat::from_path(std::path::Path::new("CONFIG.YAML")).unwrap(),
        ConfigFormat::Yaml
    );
}
