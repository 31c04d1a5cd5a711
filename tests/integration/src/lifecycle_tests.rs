//! End-to-end lifecycle: config layers -> status -> sync -> drift -> resolve

use blackbook_core::sync::ScriptedPrompt;
use blackbook_core::{
    ConfigResolver, ConflictAction, DriftKind, ManifestStore, SyncEngine, SyncOptions, SyncStatus,
};
use blackbook_test_utils::TestEnv;
use pretty_assertions::assert_eq;
use std::fs;

fn engine(env: &TestEnv) -> SyncEngine {
    let config = ConfigResolver::new(env.config_dir()).resolve().unwrap();
    SyncEngine::from_config(config).unwrap()
}

fn statuses(engine: &SyncEngine) -> Vec<(String, String, SyncStatus, Option<DriftKind>)> {
    engine
        .status()
        .unwrap()
        .into_iter()
        .flat_map(|file| {
            file.instances
                .into_iter()
                .map(move |i| (file.name.clone(), i.instance_name().to_string(), i.status(), i.drift_kind()))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// A TOML primary layer with a YAML machine override adding an instance.
#[test]
fn toml_primary_with_yaml_override_across_instances() {
    let env = TestEnv::new();
    env.write_source("CLAUDE.md", "# rules\n");
    env.write_source("agents/reviewer.md", "review\n");
    env.write_source("agents/nested/planner.md", "plan\n");

    fs::write(
        env.config_dir().join("config.toml"),
        format!(
            r#"# primary
[settings]
source_repo = "{source}"
cache_dir = "{cache}"

[tools.claude]
instances = [{{ id = "personal", config_dir = "{home}/.claude" }}]

[[files]]
name = "CLAUDE.md"
source = "CLAUDE.md"
target = "CLAUDE.md"

[[files]]
name = "agents"
source = "agents"
target = "agents"
"#,
            source = env.source().display(),
            cache = env.cache_dir().display(),
            home = env.home().display()
        ),
    )
    .unwrap();
    env.write_local_config(
        "\
tools:
  claude:
    instances:
      - id: work
        config_dir: '{home}/.claude-work'
",
    );

    let engine = engine(&env);
    // Instance lists merge by `id`; new ids are appended
    let instances: Vec<String> = engine.config().instances().iter().map(|i| i.key()).collect();
    assert_eq!(instances, vec!["claude:personal", "claude:work"]);

    let report = engine.sync(&SyncOptions::default()).unwrap();
    assert!(report.success, "{:?}", report.errors);
    assert_eq!(report.actions.len(), 4);

    for dir in [".claude", ".claude-work"] {
        env.assert_content(&env.home().join(dir).join("CLAUDE.md"), "# rules\n");
        env.assert_content(&env.home().join(dir).join("agents/nested/planner.md"), "plan\n");
    }
    assert!(statuses(&engine).iter().all(|(_, _, s, _)| *s == SyncStatus::Ok));
}

/// Directory drift in one instance only, resolved per instance.
#[test]
fn directory_drift_is_tracked_per_instance() {
    let env = TestEnv::new();
    env.write_source("agents/a.md", "a\n");
    env.write_config(
        "\
tools:
  claude:
    instances:
      - id: personal
        config_dir: '{home}/.claude'
      - id: work
        config_dir: '{home}/.claude-work'
files:
  - name: agents
    source: agents
    target: agents
",
    );
    let engine = engine(&env);
    engine.sync(&SyncOptions::default()).unwrap();

    // An extra file in one target is drift, never ignored
    env.write_home(".claude-work/agents/local-only.md", "mine\n");

    assert_eq!(
        statuses(&engine),
        vec![
            ("agents".to_string(), "claude:personal".to_string(), SyncStatus::Ok, None),
            (
                "agents".to_string(),
                "claude:work".to_string(),
                SyncStatus::Drifted,
                Some(DriftKind::TargetChanged)
            ),
        ]
    );

    let mut prompt = ScriptedPrompt::new([ConflictAction::ForceForward]);
    let report = engine.resolve(&mut prompt, &SyncOptions::default()).unwrap();
    assert_eq!(prompt.presented().len(), 1);
    assert_eq!(prompt.presented()[0].instance, "claude:work");
    assert!(prompt.presented()[0].diff.as_deref().unwrap().contains("Only in target: local-only.md"));
    assert!(report.success);

    env.assert_file_not_exists(&env.home().join(".claude-work/agents/local-only.md"));
    assert!(statuses(&engine).iter().all(|(_, _, s, _)| *s == SyncStatus::Ok));
}

/// Removing an asset from config leaves its manifest items alone until
/// uninstalled; re-adding it finds the old baseline.
#[test]
fn baselines_survive_config_round_trips() {
    let env = TestEnv::new();
    env.write_source("a.md", "v1\n");
    let with_asset = "\
tools:
  claude:
    instances:
      - id: default
        config_dir: '{home}/.claude'
files:
  - name: a
    source: a.md
    target: a.md
";
    env.write_config(with_asset);
    engine(&env).sync(&SyncOptions::default()).unwrap();

    env.write_config("tools:\n  claude:\n    instances:\n      - id: default\n        config_dir: '{home}/.claude'\n");
    assert!(engine(&env).status().unwrap().is_empty());
    let manifest = ManifestStore::new(&env.cache_dir()).load().unwrap();
    assert!(manifest.get("claude:default", "file:a").is_some());

    env.write_source("a.md", "v2\n");
    env.write_config(with_asset);
    assert_eq!(
        statuses(&engine(&env)),
        vec![(
            "a".to_string(),
            "claude:default".to_string(),
            SyncStatus::Drifted,
            Some(DriftKind::SourceChanged)
        )]
    );
}
