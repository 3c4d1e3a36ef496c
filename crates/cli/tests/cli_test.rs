//! CLI integration tests.

#![allow(deprecated)] // Command::cargo_bin deprecated for custom build-dir; still works for default

use assert_cmd::Command;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};

/// Command with config lookups confined to `home`.
fn cli(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("representative-creation").unwrap();
    cmd.env("HOME", home).env("XDG_CONFIG_HOME", home.join(".config"));
    cmd
}

fn write_document(dir: &Path, child_type: &str) -> PathBuf {
    let doc = serde_json::json!({
        "physical": {
            "pages": [
                {"id": "PHYS_0001", "metadata": [{"type": "physPageNumber", "value": "1"}]},
                {"id": "PHYS_0002", "metadata": [{"type": "physPageNumber", "value": "2"}]},
                {"id": "PHYS_0003", "metadata": [{"type": "physPageNumber", "value": "3"}]}
            ]
        },
        "logical": {
            "type": "Monograph",
            "children": [
                {"type": "Cover", "pages": ["PHYS_0001"]},
                {"type": child_type, "pages": ["PHYS_0003", "PHYS_0002"]}
            ]
        }
    });
    let path = dir.join("meta.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();
    path
}

fn write_steps(dir: &Path) -> PathBuf {
    let steps = serde_json::json!([
        {"id": 1, "process_id": 9, "title": "Scanning", "order": 1, "status": "done"},
        {"id": 2, "process_id": 9, "title": "Structure", "order": 2, "status": "done"},
        {"id": 3, "process_id": 9, "title": "RepresentativeCreation", "order": 3, "status": "in_work"},
        {"id": 4, "process_id": 9, "title": "Export", "order": 4, "status": "locked"}
    ]);
    let path = dir.join("steps.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&steps).unwrap()).unwrap();
    path
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

fn stdout_of(out: &assert_cmd::assert::Assert) -> String {
    String::from_utf8(out.get_output().stdout.clone()).unwrap()
}

#[test]
fn help_prints_and_exits_success() {
    Command::cargo_bin("representative-creation")
        .unwrap()
        .arg("--help")
        .assert()
        .success();
}

#[test]
fn run_assigns_title_page_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_document(dir.path(), "TitlePage");

    let out = cli(dir.path()).args(["run", doc.to_str().unwrap()]).assert().success();
    assert!(stdout_of(&out).contains("Assigned representative page 3"));

    let json = read_json(&doc);
    assert_eq!(json["physical"]["metadata"][0]["type"], "_representative");
    assert_eq!(json["physical"]["metadata"][0]["value"], "3");

    let out = cli(dir.path()).args(["run", doc.to_str().unwrap()]).assert().success();
    assert!(stdout_of(&out).contains("already set: 3"));
    assert_eq!(read_json(&doc)["physical"]["metadata"].as_array().unwrap().len(), 1);
}

#[test]
fn run_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_document(dir.path(), "TitlePage");
    let out = cli(dir.path())
        .args(["run", doc.to_str().unwrap(), "--json", "--dry-run"])
        .assert()
        .success();
    let report: serde_json::Value = serde_json::from_str(&stdout_of(&out)).expect("run --json should output valid JSON");
    assert_eq!(report["outcome"], "assigned");
    assert_eq!(report["entry"]["value"], "3");
    assert_eq!(report["result"], "finished");
    assert_eq!(report["saved"], false);
    assert!(read_json(&doc)["physical"].get("metadata").is_none());
}

#[test]
fn run_with_custom_element() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_document(dir.path(), "TitlePage");
    cli(dir.path())
        .args(["run", doc.to_str().unwrap(), "--element", "Cover"])
        .assert()
        .success();
    assert_eq!(read_json(&doc)["physical"]["metadata"][0]["value"], "1");
}

#[test]
fn missing_element_writes_audit_entry() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_document(dir.path(), "Chapter");
    let audit = dir.path().join("audit.jsonl");
    cli(dir.path())
        .args([
            "run",
            doc.to_str().unwrap(),
            "--process-id",
            "9",
            "--audit-log",
            audit.to_str().unwrap(),
            "--error-message",
            "No title page found",
        ])
        .assert()
        .success();

    let text = std::fs::read_to_string(&audit).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1);
    let entry: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(entry["content"], "No title page found");
    assert_eq!(entry["log_type"], "error");
    assert_eq!(entry["process_id"], 9);
}

#[test]
fn fallback_reopens_earlier_step_and_fails_run() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_document(dir.path(), "Chapter");
    let steps = write_steps(dir.path());
    let out = cli(dir.path())
        .args([
            "run",
            doc.to_str().unwrap(),
            "--steps",
            steps.to_str().unwrap(),
            "--fallback-step",
            "Structure",
        ])
        .assert()
        .failure();
    let stderr = String::from_utf8(out.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("rolled back to 'Structure'"));

    let steps = read_json(&steps);
    let status = |title: &str| {
        steps
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["title"] == title)
            .map(|s| (s["status"].clone(), s["correction"].clone()))
            .unwrap()
    };
    assert_eq!(status("RepresentativeCreation"), (serde_json::json!("locked"), serde_json::json!(true)));
    assert_eq!(status("Structure"), (serde_json::json!("open"), serde_json::json!(true)));
    assert_eq!(status("Scanning").0, "done");
    assert_eq!(status("Export").0, "locked");
}

#[test]
fn unknown_fallback_step_fails_run() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_document(dir.path(), "Chapter");
    let steps = write_steps(dir.path());
    let before = std::fs::read(&steps).unwrap();
    cli(dir.path())
        .args([
            "run",
            doc.to_str().unwrap(),
            "--steps",
            steps.to_str().unwrap(),
            "--fallback-step",
            "Export",
        ])
        .assert()
        .failure();
    assert_eq!(std::fs::read(&steps).unwrap(), before);
}

#[test]
fn unknown_metadata_type_in_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_document(dir.path(), "TitlePage");
    let config = dir.path().join("custom.toml");
    std::fs::write(&config, "[schema]\nmetadata_types = [\"physPageNumber\"]\n").unwrap();
    let out = cli(dir.path())
        .args(["run", doc.to_str().unwrap(), "--config", config.to_str().unwrap()])
        .assert()
        .failure();
    let stderr = String::from_utf8(out.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("_representative"));
}

#[test]
fn run_nonexistent_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    cli(dir.path())
        .args(["run", "/nonexistent/meta.json"])
        .assert()
        .failure();
}

#[test]
fn inspect_reports_representative() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_document(dir.path(), "TitlePage");
    cli(dir.path()).args(["run", doc.to_str().unwrap()]).assert().success();

    let out = cli(dir.path())
        .args(["inspect", doc.to_str().unwrap(), "--json"])
        .assert()
        .success();
    let info: serde_json::Value = serde_json::from_str(&stdout_of(&out)).unwrap();
    assert_eq!(info["representative"], 3);
    assert_eq!(info["page"], "PHYS_0003");
    assert_eq!(info["pages"], 3);
}

#[test]
fn config_show_json_valid() {
    let dir = tempfile::tempdir().unwrap();
    let out = cli(dir.path())
        .args(["config", "show", "--json"])
        .assert()
        .success();
    let cfg: serde_json::Value = serde_json::from_str(&stdout_of(&out)).expect("config show --json should output valid JSON");
    assert_eq!(cfg["resolver"]["structural_element"], "TitlePage");
}

#[test]
fn config_set_then_show() {
    let dir = tempfile::tempdir().unwrap();
    cli(dir.path())
        .args(["config", "set", "resolver.fallback_step", "Structure"])
        .assert()
        .success();
    let out = cli(dir.path())
        .args(["config", "show", "--json"])
        .assert()
        .success();
    let cfg: serde_json::Value = serde_json::from_str(&stdout_of(&out)).unwrap();
    assert_eq!(cfg["resolver"]["fallback_step"], "Structure");

    cli(dir.path())
        .args(["config", "set", "resolver.bogus", "x"])
        .assert()
        .failure();
}

#[test]
fn config_set_refuses_to_overwrite_broken_file() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_dir = dir.path().join(".config").join("representative-creation");
    std::fs::create_dir_all(&cfg_dir).unwrap();
    let path = cfg_dir.join("config.toml");
    let broken = "[resolver\nerror_message = \"hand edited\"\n";
    std::fs::write(&path, broken).unwrap();

    cli(dir.path())
        .args(["config", "set", "resolver.fallback_step", "Structure"])
        .assert()
        .failure();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), broken);
}
