//! Crash safety and cross-writer exclusion for persisted state

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use blackbook_core::{ConfigResolver, ManifestStore, SyncEngine, SyncOptions};
use blackbook_fs::{LockGuard, LockPolicy, io, lock::lock_path_for};
use blackbook_test_utils::TestEnv;

fn config_with(env: &TestEnv, names: &[&str]) {
    let mut body = String::from(
        "tools:\n  claude:\n    instances:\n      - id: default\n        config_dir: '{home}/.claude'\nfiles:\n",
    );
    for name in names {
        env.write_source(name, name);
        body.push_str(&format!("  - name: {name}\n    source: {name}\n    target: {name}\n"));
    }
    env.write_config(&body);
}

#[test]
fn interrupted_manifest_write_keeps_previous_manifest() {
    let env = TestEnv::new();
    config_with(&env, &["a.md"]);
    let config = ConfigResolver::new(env.config_dir()).resolve().unwrap();
    SyncEngine::from_config(config).unwrap().sync(&SyncOptions::default()).unwrap();
    let before = env.read(&env.manifest_path());

    // A write that never reaches its rename
    let staged = io::stage(&env.manifest_path(), b"{ half").unwrap();
    drop(staged);

    assert_eq!(env.read(&env.manifest_path()), before);
    assert!(ManifestStore::new(&env.cache_dir()).load().is_ok());
}

#[test]
fn engines_racing_on_one_manifest_lose_nothing() {
    let env = TestEnv::new();
    let names: Vec<String> = (0..6).map(|i| format!("file-{i}.md")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    config_with(&env, &refs);

    let config = ConfigResolver::new(env.config_dir()).resolve().unwrap();
    let policy = LockPolicy {
        attempts: 200,
        backoff_step: Duration::from_millis(1),
        ..LockPolicy::default()
    };
    let barrier = Arc::new(Barrier::new(names.len()));

    let handles: Vec<_> = names
        .iter()
        .map(|name| {
            // Each writer only knows about its own asset
            let mut config = config.clone();
            config.files.retain(|f| &f.name == name);
            let store = ManifestStore::new(&env.cache_dir()).with_lock_policy(policy);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let engine = SyncEngine::new(config, store);
                barrier.wait();
                engine.sync(&SyncOptions::default()).unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().success);
    }

    let manifest = ManifestStore::new(&env.cache_dir()).load().unwrap();
    assert_eq!(manifest.tools["claude:default"].items.len(), names.len());
}

#[test]
fn held_lock_times_out_the_sync() {
    let env = TestEnv::new();
    config_with(&env, &["a.md"]);
    let config = ConfigResolver::new(env.config_dir()).resolve().unwrap();
    let policy = LockPolicy {
        attempts: 2,
        backoff_step: Duration::from_millis(1),
        ..LockPolicy::default()
    };
    let store = ManifestStore::new(&env.cache_dir()).with_lock_policy(policy);
    let _held = LockGuard::acquire(store.path()).unwrap();
    assert!(lock_path_for(store.path()).exists());

    let err = SyncEngine::new(config, store)
        .sync(&SyncOptions::default())
        .unwrap_err();
    assert!(err.to_string().contains("Timed out acquiring lock"), "{err}");
    env.assert_file_not_exists(&env.home().join(".claude/a.md"));
}
