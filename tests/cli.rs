use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const GRAPH: &str = r#"{
  "modules": [
    { "identifier": "./src/main.js", "size": 100, "dependencies": ["./src/a.js"] },
    { "identifier": "./src/a.js", "size": 50,
      "blocks": [{ "chunkName": "lazy", "dependencies": ["./src/lazy.js"] }] },
    { "identifier": "./src/lazy.js", "size": 25 }
  ],
  "entries": [{ "name": "main", "import": "./src/main.js" }]
}"#;

fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("graph.json"), GRAPH).unwrap();
    dir
}

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("component-chunks").unwrap();
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn build_prints_summary_and_writes_stats() {
    let dir = workspace();

    cli()
        .current_dir(dir.path())
        .args(["build", "--graph", "graph.json", "--out", "stats.json", "--chunk-ids", "named"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Sealed 2 chunk(s)"))
        .stderr(predicate::str::contains("entrypoint main = main"));

    let stats: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("stats.json")).unwrap()).unwrap();
    assert_eq!(stats["entrypoints"]["main"]["chunks"][0], "main");
    assert_eq!(stats["chunks"].as_array().unwrap().len(), 2);
    assert_eq!(stats["modules"].as_array().unwrap().len(), 3);
}

#[test]
fn build_reads_config_and_writes_records() {
    let dir = workspace();
    fs::write(
        dir.path().join("component.toml"),
        r#"
[optimization]
module_ids = "natural"
runtime_chunk = "single"

[output]
hash_digest_length = 8
records = "records.json"
"#,
    )
    .unwrap();

    cli()
        .current_dir(dir.path())
        .args(["build", "--graph", "graph.json", "--out", "stats.json"])
        .assert()
        .success();

    let records: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("records.json")).unwrap()).unwrap();
    assert_eq!(records["modules"]["./src/main.js"], 0);
    assert!(records["chunks"].get("runtime").is_some());

    let stats: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("stats.json")).unwrap()).unwrap();
    assert_eq!(stats["hash"].as_str().unwrap().len(), 8);
}

#[test]
fn build_rejects_bad_policy() {
    let dir = workspace();
    cli()
        .current_dir(dir.path())
        .args(["build", "--graph", "graph.json", "--module-ids", "random"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown id policy"));
}

#[test]
fn build_reports_missing_graph() {
    let dir = tempfile::tempdir().unwrap();
    cli()
        .current_dir(dir.path())
        .args(["build", "--graph", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read module graph"));
}

#[test]
fn init_writes_config_once() {
    let dir = tempfile::tempdir().unwrap();

    cli().current_dir(dir.path()).arg("init").assert().success();
    let content = fs::read_to_string(dir.path().join("component.toml")).unwrap();
    assert!(content.contains("[optimization.split_chunks]"));

    cli()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    cli().current_dir(dir.path()).args(["init", "--force"]).assert().success();
}
