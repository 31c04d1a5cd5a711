//! Manifest persistence under concurrent writers

use std::sync::Arc;
use std::thread;

use blackbook_core::{AssetKind, InstalledItem, ManifestStore};
use blackbook_fs::LockPolicy;
use chrono::Utc;
use std::time::Duration;
use tempfile::TempDir;

fn item(name: &str) -> InstalledItem {
    InstalledItem {
        kind: AssetKind::File,
        name: name.into(),
        source: format!("/src/{name}"),
        target: format!("/home/t/.claude/{name}"),
        source_fingerprint: "sha256:00".into(),
        target_fingerprint: "sha256:00".into(),
        installed_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn concurrent_updates_are_never_lost() {
    let dir = TempDir::new().unwrap();
    let policy = LockPolicy {
        attempts: 200,
        backoff_step: Duration::from_millis(1),
        ..LockPolicy::default()
    };
    let store = Arc::new(ManifestStore::new(dir.path()).with_lock_policy(policy));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for j in 0..5 {
                    let name = format!("item-{i}-{j}");
                    store
                        .update(|m| {
                            m.record("claude:default", &format!("file:{name}"), item(&name));
                            Ok(())
                        })
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let manifest = store.load().unwrap();
    assert_eq!(manifest.tools["claude:default"].items.len(), 40);
}

#[test]
fn saved_manifest_round_trips() {
    let dir = TempDir::new().unwrap();
    let store = ManifestStore::new(dir.path());

    store
        .update(|m| {
            m.record("cursor:default", "file:rules", item("rules"));
            Ok(())
        })
        .unwrap();

    let loaded = store.load().unwrap();
    assert_eq!(loaded.get("cursor:default", "file:rules").unwrap().name, "rules");
    assert!(!dir.path().join("manifest.json.lock").exists());
}
