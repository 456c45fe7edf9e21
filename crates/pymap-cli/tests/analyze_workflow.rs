//! End-to-end CLI tests over temp-directory fixtures.
//!
//! Each test builds an isolated project tree, runs the binary against it,
//! and inspects the exit code plus the written artifact.

#![allow(deprecated)] // cargo_bin is deprecated in assert_cmd but replacement not yet stable

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

type TestResult<T = ()> = std::result::Result<T, Box<dyn std::error::Error>>;

fn write(root: &Path, rel: &str, source: &str) -> TestResult {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap())?;
    std::fs::write(path, source)?;
    Ok(())
}

fn pymap() -> Command {
    Command::cargo_bin("pymap").expect("binary should build")
}

/// A small two-package project used by most tests.
fn sample_project(root: &Path) -> TestResult {
    write(
        root,
        "project/services/auth.py",
        r#"
from utils.logging import Logger


class AuthService:
    def __init__(self):
        self.logger = Logger()

    def login(self, user):
        self.logger.info("login")
        return user
"#,
    )?;
    write(
        root,
        "project/utils/logging.py",
        r#"
class Logger:
    def info(self, message):
        print(message)
"#,
    )?;
    write(
        root,
        "project/api.py",
        r#"
from services.auth import AuthService


@app.route("/login", methods=["POST"])
def login_endpoint():
    return AuthService().login("u")
"#,
    )?;
    Ok(())
}

#[test]
fn analyzes_project_and_writes_artifact() -> TestResult {
    let temp = TempDir::new()?;
    sample_project(temp.path())?;
    let project = temp.path().join("project");
    let output = temp.path().join("out/analysis.json");

    pymap()
        .arg("--scan-root")
        .arg(&project)
        .arg("--focus-root")
        .arg(&project)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Analyzed 3 files"));

    let artifact: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output)?)?;

    let files = artifact["files"].as_object().unwrap();
    assert_eq!(files.len(), 3);

    // Endpoint classification survives to the artifact
    let api = files
        .iter()
        .find(|(k, _)| k.ends_with("api.py"))
        .map(|(_, v)| v)
        .unwrap();
    assert_eq!(api["login_endpoint"]["is_api_endpoint"], true);

    // The instance-attribute chain resolves to Logger's file
    let auth = files
        .iter()
        .find(|(k, _)| k.ends_with("auth.py"))
        .map(|(_, v)| v)
        .unwrap();
    let login_uses = &auth["AuthService"]["methods"]["login"]["used_functions"];
    assert_eq!(login_uses["Logger"]["file"], "from utils.logging");
    assert_eq!(login_uses["Logger"]["methods"][0], "info");

    // file_meta carries module names
    let meta = artifact["file_meta"].as_object().unwrap();
    let auth_meta = meta
        .iter()
        .find(|(k, _)| k.ends_with("auth.py"))
        .map(|(_, v)| v)
        .unwrap();
    assert_eq!(auth_meta["module"], "services.auth");
    assert_eq!(auth_meta["is_router"], false);

    Ok(())
}

#[test]
fn focus_root_limits_rendered_files() -> TestResult {
    let temp = TempDir::new()?;
    sample_project(temp.path())?;
    let project = temp.path().join("project");
    let focus = project.join("services");
    let output = temp.path().join("analysis.json");

    pymap()
        .arg("--scan-root")
        .arg(&project)
        .arg("--focus-root")
        .arg(&focus)
        .arg("--output")
        .arg(&output)
        .arg("--quiet")
        .assert()
        .success();

    let artifact: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output)?)?;
    let files = artifact["files"].as_object().unwrap();
    assert_eq!(files.len(), 1);
    assert!(files.keys().all(|k| k.contains("services")));

    Ok(())
}

#[test]
fn focus_outside_scan_aborts_without_output() -> TestResult {
    let temp = TempDir::new()?;
    sample_project(temp.path())?;
    let project = temp.path().join("project");
    let elsewhere = temp.path().join("elsewhere");
    std::fs::create_dir_all(&elsewhere)?;
    let output = temp.path().join("analysis.json");

    pymap()
        .arg("--scan-root")
        .arg(&project)
        .arg("--focus-root")
        .arg(&elsewhere)
        .arg("--output")
        .arg(&output)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("is not inside scan root"));

    assert!(!output.exists());
    Ok(())
}

#[test]
fn missing_scan_root_aborts() -> TestResult {
    let temp = TempDir::new()?;
    let missing = temp.path().join("does-not-exist");

    pymap()
        .arg("--scan-root")
        .arg(&missing)
        .arg("--focus-root")
        .arg(temp.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Scan root does not exist"));

    Ok(())
}

#[test]
fn broken_file_is_skipped_not_fatal() -> TestResult {
    let temp = TempDir::new()?;
    write(temp.path(), "project/good.py", "def fine():\n    pass\n")?;
    write(temp.path(), "project/bad.py", "def broken(:\n    ((((\n")?;
    let project = temp.path().join("project");
    let output = temp.path().join("analysis.json");

    pymap()
        .arg("--scan-root")
        .arg(&project)
        .arg("--focus-root")
        .arg(&project)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("(1 skipped)"));

    let artifact: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output)?)?;
    let files = artifact["files"].as_object().unwrap();
    assert_eq!(files.len(), 1);
    assert!(files.keys().next().unwrap().ends_with("good.py"));

    Ok(())
}

#[test]
fn quiet_suppresses_summary() -> TestResult {
    let temp = TempDir::new()?;
    write(temp.path(), "project/app.py", "def run():\n    pass\n")?;
    let project = temp.path().join("project");
    let output = temp.path().join("analysis.json");

    pymap()
        .arg("--scan-root")
        .arg(&project)
        .arg("--focus-root")
        .arg(&project)
        .arg("--output")
        .arg(&output)
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    Ok(())
}

#[test]
fn json_summary_format() -> TestResult {
    let temp = TempDir::new()?;
    write(temp.path(), "project/app.py", "def run():\n    pass\n")?;
    let project = temp.path().join("project");
    let output = temp.path().join("analysis.json");

    let assert = pymap()
        .arg("--scan-root")
        .arg(&project)
        .arg("--focus-root")
        .arg(&project)
        .arg("--output")
        .arg(&output)
        .arg("--format")
        .arg("json")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    let summary: serde_json::Value = serde_json::from_str(&stdout)?;
    assert_eq!(summary["files"], 1);
    assert_eq!(summary["definitions"], 1);

    Ok(())
}
