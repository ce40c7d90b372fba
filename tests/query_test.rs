mod common;

use common::Layout;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn release_queries_read_committed_history() {
    let tmp = tempdir().expect("tempdir");
    let layout = Layout::new(tmp.path());
    layout.write_release("agent_20240101_000000_release.json", "agent", "release", &["h1"]);
    layout.write_release("agent_20240102_000000_promote.json", "agent", "promote", &["h1"]);
    layout.command().arg("watch").arg("--once").assert().success();

    let out = layout
        .command()
        .arg("--json")
        .arg("releases")
        .arg("--binary")
        .arg("agent")
        .arg("--limit")
        .arg("1")
        .output()
        .expect("run releases");
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json report");
    assert_eq!(report["ok"], true);
    assert_eq!(report["data"]["snapshot"]["last_action"], "promote");
    let history = report["data"]["history"].as_array().expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["timestamp"], "2024-01-02T00:00:00.000000Z");
}

#[test]
fn playbook_listing_and_unknown_name() {
    let tmp = tempdir().expect("tempdir");
    let layout = Layout::new(tmp.path());
    layout.write_playbook("site_playbook.json", "site", "ok");
    layout.command().arg("watch").arg("--once").assert().success();

    layout
        .command()
        .arg("playbooks")
        .assert()
        .success()
        .stdout(predicate::str::contains("site status=ok"));

    layout
        .command()
        .arg("playbooks")
        .arg("--name")
        .arg("absent")
        .assert()
        .failure()
        .stdout(predicate::str::contains("no run recorded"));
}

#[test]
fn queries_before_first_run_report_missing_store() {
    let tmp = tempdir().expect("tempdir");
    let layout = Layout::new(tmp.path());
    layout
        .command()
        .arg("releases")
        .assert()
        .failure()
        .stdout(predicate::str::contains("store not found"));
}

#[test]
fn status_shows_counts_and_health_without_daemon() {
    let tmp = tempdir().expect("tempdir");
    let layout = Layout::new(tmp.path());
    layout.write_playbook("site_playbook.json", "site", "ok");
    layout.command().arg("watch").arg("--once").assert().success();

    layout
        .command()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("store.playbook_history=1"));

    layout
        .command()
        .arg("health")
        .assert()
        .success()
        .stdout(predicate::str::contains("daemon.lock=not_found"));

    layout
        .command()
        .arg("stop")
        .assert()
        .success()
        .stdout(predicate::str::contains("already stopped"));
}
