//! Cross-crate scenarios: sync a tree, build comparison manifests for both
//! sides, damage the remote copy and repair it.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use shasync_core::reconcile::compare;
use shasync_core::{
    ManifestStore, MismatchLog, ReconcileMode, ReconcileTarget, Reconciler, SyncConfig, SyncEngine,
};
use shasync_fs::Sha256Checksum;
use shasync_test_utils::{ScriptedTransfer, TestTree};
use tempfile::TempDir;

struct World {
    tree: TestTree,
    remote: TempDir,
    state: TempDir,
    config: SyncConfig,
}

impl World {
    fn new() -> Self {
        let tree = TestTree::new()
            .file("2023/a.txt", "alpha")
            .file("2023/b.txt", "beta")
            .file("2023/deep/c.txt", "gamma")
            .file("2024/d.txt", "delta");
        let remote = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();

        let mut config = SyncConfig::default();
        config.state.manifest_dir = state.path().to_path_buf();
        config.state.mismatch_log = state.path().join("mismatches.json");

        Self {
            tree,
            remote,
            state,
            config,
        }
    }

    fn transfer(&self) -> ScriptedTransfer {
        ScriptedTransfer::new().mirror_into(self.remote.path())
    }

    fn local_manifest(&self) -> std::path::PathBuf {
        self.state.path().join("output-local-2023.json")
    }

    fn remote_manifest(&self) -> std::path::PathBuf {
        self.state.path().join("output-remote-2023.json")
    }

    fn generate_both(&self) {
        let reconciler = Reconciler::new(&self.config, &Sha256Checksum);
        reconciler
            .generate(&self.tree.path("2023"), &self.local_manifest())
            .unwrap();
        reconciler
            .generate(&self.remote.path().join("2023"), &self.remote_manifest())
            .unwrap();
    }

    fn target(&self) -> ReconcileTarget {
        ReconcileTarget {
            local_root: self.tree.path("2023"),
            remote_prefix: "2023".to_string(),
        }
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn test_synced_tree_compares_clean() {
    let world = World::new();
    let transfer = world.transfer();
    SyncEngine::new(&world.config, &transfer, &Sha256Checksum)
        .sync_all(world.tree.root())
        .unwrap();

    assert_eq!(read(&world.remote.path().join("2023/deep/c.txt")), "gamma");
    world.generate_both();

    let store = ManifestStore::new();
    let local = store.load(&world.local_manifest()).unwrap();
    let remote = store.load(&world.remote_manifest()).unwrap();
    assert!(compare(&local, &remote).unwrap().is_clean());

    // The sync manifest records the same digests under work-dir keys
    let synced = store.load(&world.state.path().join("sync-2023.json")).unwrap();
    for (key, digest) in local.iter() {
        assert_eq!(synced.get(&format!("/2023{key}")), Some(digest));
    }
}

#[test]
fn test_damaged_remote_file_is_found_and_repaired() {
    let world = World::new();
    let transfer = world.transfer();
    SyncEngine::new(&world.config, &transfer, &Sha256Checksum)
        .sync_all(world.tree.root())
        .unwrap();

    fs::write(world.remote.path().join("2023/b.txt"), "bitrot").unwrap();
    world.generate_both();

    let report = Reconciler::new(&world.config, &Sha256Checksum)
        .run(
            &world.local_manifest(),
            &world.remote_manifest(),
            &world.target(),
            ReconcileMode::ReportOnly,
        )
        .unwrap();
    assert_eq!(report.comparison.mismatch_paths(), ["/b.txt"]);

    let log = MismatchLog::load(&world.config.state.mismatch_log).unwrap();
    assert_eq!(log.paths(), ["/b.txt"]);

    let repair = world.transfer();
    let report = Reconciler::new(&world.config, &Sha256Checksum)
        .with_transfer(&repair)
        .run(
            &world.local_manifest(),
            &world.remote_manifest(),
            &world.target(),
            ReconcileMode::Both,
        )
        .unwrap();

    assert_eq!(report.resynced, ["/b.txt"]);
    assert!(report.rechecked.iter().all(|r| r.matches));
    assert_eq!(read(&world.remote.path().join("2023/b.txt")), "beta");

    let store = ManifestStore::new();
    let local = store.load(&world.local_manifest()).unwrap();
    let remote = store.load(&world.remote_manifest()).unwrap();
    assert!(compare(&local, &remote).unwrap().is_clean());
}

#[test]
fn test_targeted_recheck_from_mismatch_log() {
    let world = World::new();
    let transfer = world.transfer();
    SyncEngine::new(&world.config, &transfer, &Sha256Checksum)
        .sync_all(world.tree.root())
        .unwrap();

    fs::write(world.remote.path().join("2023/a.txt"), "bitrot").unwrap();
    world.generate_both();
    Reconciler::new(&world.config, &Sha256Checksum)
        .run(
            &world.local_manifest(),
            &world.remote_manifest(),
            &world.target(),
            ReconcileMode::ReportOnly,
        )
        .unwrap();

    // Someone fixes the remote file by hand, then re-checks only what was logged
    fs::copy(world.tree.path("2023/a.txt"), world.remote.path().join("2023/a.txt")).unwrap();
    let log = MismatchLog::load(&world.config.state.mismatch_log).unwrap();
    Reconciler::new(&world.config, &Sha256Checksum)
        .recheck(&world.remote.path().join("2023"), &world.remote_manifest(), log.paths())
        .unwrap();

    let store = ManifestStore::new();
    let local = store.load(&world.local_manifest()).unwrap();
    let remote = store.load(&world.remote_manifest()).unwrap();
    assert!(compare(&local, &remote).unwrap().is_clean());
}

#[test]
fn test_resumed_sync_after_crash_matches_uninterrupted_sync() {
    let world = World::new();
    let transfer = world.transfer();
    let engine = SyncEngine::new(&world.config, &transfer, &Sha256Checksum);
    engine.sync_all(world.tree.root()).unwrap();
    let uninterrupted = read(&world.state.path().join("sync-2023.json"));

    // Simulate a crash halfway: keep the header and first entry, tear the second
    let manifest_path = world.state.path().join("sync-2023.json");
    let store = ManifestStore::new();
    let full = store.load(&manifest_path).unwrap();
    let first = full.iter().next().unwrap();
    fs::write(
        &manifest_path,
        format!("{{\n  {}: {},\n  \"/2023/b", serde_json::json!(first.0), serde_json::json!(first.1)),
    )
    .unwrap();

    let resumed = world.transfer();
    let report = SyncEngine::new(&world.config, &resumed, &Sha256Checksum)
        .sync_root(world.tree.root(), "2023")
        .unwrap();

    assert_eq!(report.skipped, 1);
    assert_eq!(read(&manifest_path), uninterrupted);
}
