use std::error::Error;
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::tempdir;

const WORKSPACE: &str = r#"{
  "notebooks": [{
    "id": "nb1",
    "title": "Work",
    "lastModifiedAt": "2025-01-20T10:00:00Z",
    "sections": [{
      "id": "s1",
      "title": "Meetings",
      "lastModifiedAt": "2025-01-20T10:00:00Z",
      "pages": [
        {"id": "p1", "title": "Kickoff", "lastModifiedAt": "2025-01-20T10:00:00Z",
         "content": "First meeting"},
        {"id": "p2", "title": "Retro", "lastModifiedAt": "2025-01-20T10:00:00Z",
         "content": "Went well"}
      ]
    }]
  }]
}"#;

fn nbexport(config: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("nbexport")?;
    cmd.arg("--config").arg(config).env_remove("RUST_LOG");
    Ok(cmd)
}

fn export_json(config: &Path, source: &Path, output: &Path) -> Result<Value, Box<dyn Error>> {
    let assert = nbexport(config)?
        .arg("--json")
        .arg("export")
        .arg(source)
        .arg("--output")
        .arg(output)
        .assert()
        .success();
    Ok(serde_json::from_slice(&assert.get_output().stdout)?)
}

#[test]
fn export_then_rerun_skips_unchanged_pages() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let config = dir.path().join("config.json");
    let source = dir.path().join("workspace.json");
    let output = dir.path().join("out");
    fs::write(&source, WORKSPACE)?;

    let first = export_json(&config, &source, &output)?;
    assert_eq!(first["totals"]["pagesNew"], 2);
    assert_eq!(first["totals"]["pagesOnError"], 0);

    let page = output.join("Work").join("Meetings").join("Kickoff.md");
    assert!(fs::read_to_string(&page)?.contains("First meeting"));
    assert!(output.join("Work").join(".nbexport-manifest.json").exists());

    let second = export_json(&config, &source, &output)?;
    assert_eq!(second["totals"]["pagesNew"], 0);
    assert_eq!(second["totals"]["pagesUpdated"], 0);
    assert_eq!(second["totals"]["pagesSkipped"], 2);
    assert_eq!(second["totals"]["sectionsSkipped"], 1);

    Ok(())
}

#[test]
fn status_reports_pending_pages() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let config = dir.path().join("config.json");
    let source = dir.path().join("workspace.json");
    let output = dir.path().join("out");
    fs::write(&source, WORKSPACE)?;

    let assert = nbexport(&config)?
        .arg("--json")
        .arg("status")
        .arg(&source)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();
    let status: Value = serde_json::from_slice(&assert.get_output().stdout)?;

    let notebook = &status["notebooks"][0];
    assert_eq!(notebook["notebookTitle"], "Work");
    assert_eq!(notebook["hasManifest"], false);
    assert_eq!(notebook["pages"]["new"], 2);
    assert!(!output.exists());

    Ok(())
}

#[test]
fn unknown_notebook_fails_with_hint() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let config = dir.path().join("config.json");
    let source = dir.path().join("workspace.json");
    fs::write(&source, WORKSPACE)?;

    nbexport(&config)?
        .arg("export")
        .arg(&source)
        .arg("--notebook")
        .arg("Home")
        .current_dir(dir.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Available notebooks: Work"));

    Ok(())
}

#[test]
fn missing_source_is_reported_as_json() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let config = dir.path().join("config.json");

    nbexport(&config)?
        .arg("--json")
        .arg("export")
        .arg(dir.path().join("nope.json"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("SOURCE_NOT_FOUND"));

    Ok(())
}

#[test]
fn version_json_reports_manifest_version() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let assert = nbexport(&dir.path().join("config.json"))?
        .args(["version", "--json"])
        .assert()
        .success();
    let version: Value = serde_json::from_slice(&assert.get_output().stdout)?;

    assert_eq!(version["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(version["manifestVersion"], "2.0");

    Ok(())
}
