//! Integration tests for the shasync CLI binary.
//!
//! These tests exercise the compiled binary using assert_cmd. Nothing here
//! needs a reachable SSH host: only local commands and the report-only
//! comparison are run end to end.

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;
use shasync_fs::checksum::compute_content_checksum;

/// Get a Command for the shasync binary, isolated from the caller's config
fn shasync_cmd(dir: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("shasync"));
    cmd.current_dir(dir.path()).env_remove("SHASYNC_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn write_pair(dir: &assert_fs::TempDir, local: &str, remote: &str) {
    dir.child("output-local-2023.json").write_str(local).unwrap();
    dir.child("output-remote-2023.json").write_str(remote).unwrap();
}

// ============================================================================
// Help
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let dir = assert_fs::TempDir::new().unwrap();
    shasync_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("init-compare"))
        .stdout(predicate::str::contains("compare"));
}

#[test]
fn test_unknown_mode_is_rejected_by_parser() {
    let dir = assert_fs::TempDir::new().unwrap();
    shasync_cmd(&dir)
        .args(["compare", "a.json", "b.json", "--mode", "sideways"])
        .assert()
        .failure();
}

// ============================================================================
// init-compare
// ============================================================================

#[test]
fn test_init_compare_writes_side_manifest() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("2023/a.txt").write_str("alpha").unwrap();
    dir.child("2023/sub/b.txt").write_str("beta").unwrap();
    dir.child("2023/.DS_Store").write_str("junk").unwrap();

    shasync_cmd(&dir)
        .args(["init-compare", "local", "2023"])
        .assert()
        .success()
        .stdout(predicate::str::contains("output-local-2023.json"));

    let manifest = dir.child("output-local-2023.json");
    manifest.assert(predicate::path::exists());
    manifest.assert(predicate::str::contains("\"/a.txt\""));
    manifest.assert(predicate::str::contains(compute_content_checksum(b"beta")));
    manifest.assert(predicate::str::contains(".DS_Store").not());
}

#[test]
fn test_init_compare_recheck_with_mismatch_list() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("2023/a.txt").write_str("alpha").unwrap();
    dir.child("2023/b.txt").write_str("beta").unwrap();
    shasync_cmd(&dir)
        .args(["init-compare", "remote", "2023"])
        .assert()
        .success();

    dir.child("2023/b.txt").write_str("fixed").unwrap();
    dir.child("list.json").write_str("[\"/b.txt\"]").unwrap();
    shasync_cmd(&dir)
        .args(["init-compare", "remote", "2023", "list.json"])
        .assert()
        .success();

    dir.child("output-remote-2023.json")
        .assert(predicate::str::contains(compute_content_checksum(b"fixed")));
}

#[test]
fn test_init_compare_unknown_path_fails() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("2023/a.txt").write_str("alpha").unwrap();
    shasync_cmd(&dir)
        .args(["init-compare", "local", "2023"])
        .assert()
        .success();

    dir.child("list.json").write_str("[\"/nope.txt\"]").unwrap();
    shasync_cmd(&dir)
        .args(["init-compare", "local", "2023", "list.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("/nope.txt"));
}

#[test]
fn test_init_compare_missing_dir_fails() {
    let dir = assert_fs::TempDir::new().unwrap();
    shasync_cmd(&dir)
        .args(["init-compare", "local", "absent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

// ============================================================================
// compare
// ============================================================================

#[test]
fn test_compare_reports_mismatch_and_writes_log() {
    let dir = assert_fs::TempDir::new().unwrap();
    write_pair(
        &dir,
        r#"{"/a.txt": "d1", "/b.txt": "d2"}"#,
        r#"{"/a.txt": "d1", "/b.txt": "dX"}"#,
    );

    shasync_cmd(&dir)
        .args(["compare", "output-local-2023.json", "output-remote-2023.json", "--mode", "report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("MISMATCH"))
        .stdout(predicate::str::contains("/b.txt"));

    let log = dir.child("mismatches.json");
    log.assert(predicate::str::contains("/b.txt"));
    log.assert(predicate::str::contains("/a.txt").not());
}

#[test]
fn test_compare_clean_writes_nothing() {
    let dir = assert_fs::TempDir::new().unwrap();
    let manifest = r#"{"/a.txt": "d1"}"#;
    write_pair(&dir, manifest, manifest);

    shasync_cmd(&dir)
        .args(["compare", "output-local-2023.json", "output-remote-2023.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Manifests match"));

    dir.child("mismatches.json").assert(predicate::path::missing());
}

#[test]
fn test_compare_entry_count_mismatch_fails() {
    let dir = assert_fs::TempDir::new().unwrap();
    write_pair(
        &dir,
        r#"{"/a": "1", "/b": "2", "/c": "3"}"#,
        r#"{"/a": "1", "/b": "2"}"#,
    );

    shasync_cmd(&dir)
        .args(["compare", "output-local-2023.json", "output-remote-2023.json", "--mode", "report"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Remote is missing some entries. Local: 3, remote: 2",
        ));
}

#[test]
fn test_compare_json_output() {
    let dir = assert_fs::TempDir::new().unwrap();
    write_pair(
        &dir,
        r#"{"/a.txt": "d1", "/b.txt": "d2"}"#,
        r#"{"/a.txt": "d1", "/c.txt": "d2"}"#,
    );

    let output = shasync_cmd(&dir)
        .args([
            "compare",
            "output-local-2023.json",
            "output-remote-2023.json",
            "--mode",
            "report",
            "--json",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["comparison"]["missing"], serde_json::json!(["/b.txt"]));
    assert_eq!(report["comparison"]["mismatches"], serde_json::json!([]));
    assert_eq!(report["mismatch_log"], serde_json::Value::Null);
}

#[test]
fn test_compare_resync_without_remote_config_fails() {
    let dir = assert_fs::TempDir::new().unwrap();
    write_pair(&dir, r#"{"/a.txt": "d1"}"#, r#"{"/a.txt": "d2"}"#);

    shasync_cmd(&dir)
        .args(["compare", "output-local-2023.json", "output-remote-2023.json", "--mode", "resync"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("[remote]"));
}

// ============================================================================
// sync / config
// ============================================================================

#[test]
fn test_sync_without_remote_config_fails() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("work/2023/a.txt").write_str("alpha").unwrap();

    shasync_cmd(&dir)
        .args(["sync", "work"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sync needs a [remote] section"));
}

#[test]
fn test_explicit_missing_config_fails() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("2023/a.txt").write_str("alpha").unwrap();

    shasync_cmd(&dir)
        .args(["--config", "nope.toml", "init-compare", "local", "2023"])
        .assert()
        .failure();
}

#[test]
fn test_config_redirects_state_files() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("2023/a.txt").write_str("alpha").unwrap();
    dir.child("state").create_dir_all().unwrap();
    dir.child("shasync.toml")
        .write_str("[state]\nmanifest_dir = \"state\"\n")
        .unwrap();

    shasync_cmd(&dir)
        .args(["init-compare", "local", "2023"])
        .assert()
        .success();

    dir.child("state/output-local-2023.json").assert(predicate::path::exists());
}
