mod common;

use common::Layout;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn explicit_ingest_is_ledger_gated() {
    let tmp = tempdir().expect("tempdir");
    let layout = Layout::new(tmp.path());
    let file = layout.write_release("gateway_20240301_120000_rollback.json", "gateway", "rollback", &["h9"]);

    layout
        .command()
        .arg("ingest")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("ingested").and(predicate::str::contains("entity=gateway")));

    layout
        .command()
        .arg("ingest")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("duplicate"));

    assert_eq!(layout.count("release_history"), 1);
}

#[test]
fn changed_content_at_same_path_is_new_history() {
    let tmp = tempdir().expect("tempdir");
    let layout = Layout::new(tmp.path());
    let file = layout.write_playbook("deploy_playbook.json", "deploy", "failed");
    layout.command().arg("ingest").arg(&file).assert().success();

    layout.write_playbook("deploy_playbook.json", "deploy", "ok");
    layout.command().arg("ingest").arg(&file).assert().success();

    assert_eq!(layout.count("playbook_history"), 2);
    assert_eq!(layout.count("playbooks"), 1);
    assert_eq!(layout.count("file_hashes"), 2);
}

#[test]
fn undated_release_fails_with_timestamp_code() {
    let tmp = tempdir().expect("tempdir");
    let layout = Layout::new(tmp.path());
    let file = layout.release_dir.join("agent_release.json");
    fs::write(&file, r#"{"binary_name":"agent","action":"release"}"#).expect("write");

    layout
        .command()
        .arg("ingest")
        .arg(&file)
        .assert()
        .failure()
        .stdout(predicate::str::contains("E_TIMESTAMP"));
    assert_eq!(layout.count("file_hashes"), 0);
}
