// tests/cli.rs

//! Smoke tests for the pkgmeta binary.

mod common;

use common::{mock_repo, recipe_dir};
use std::process::Command;

fn pkgmeta() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pkgmeta"))
}

#[test]
fn test_deptype_command() {
    let output = pkgmeta().args(["deptype", "run", "build"]).output().unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "(build, run)");

    let output = pkgmeta().args(["deptype", "bogus"]).output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_show_json() {
    let repo = mock_repo();
    let output = pkgmeta()
        .arg("show")
        .arg(repo.path())
        .args(["mpich", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["name"], "mpich");
    assert!(json["versions"]["3.0.4"].is_object());
    assert!(json["dependencies"]["autoconf"].is_object());
}

#[test]
fn test_check_reports_failures() {
    let repo = mock_repo();
    let output = pkgmeta().arg("check").arg(repo.path()).output().unwrap();
    assert!(output.status.success());

    let broken = recipe_dir(&[(
        "self.toml",
        "[package]\nname = \"loop\"\n[[depends_on]]\nspec = \"loop\"\n",
    )]);
    let output = pkgmeta().arg("check").arg(broken.path()).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("FAILED  loop"));
}

#[test]
fn test_spec_command_anchors_on_owner() {
    let output = pkgmeta()
        .args(["spec", "@1.2:", "--owner", "zlib"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "zlib@1.2:");
}

#[test]
fn test_deptype_defaults_and_all() {
    let output = pkgmeta().arg("deptype").output().unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "(build, link)");

    let output = pkgmeta().args(["deptype", "all"]).output().unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "(build, link, run)");
}

#[test]
fn test_config_file_in_working_directory() {
    let dir = recipe_dir(&[(
        "pkgmeta.toml",
        "[directives]\ndefault_deptypes = [\"run\"]\n",
    )]);
    let output = pkgmeta()
        .current_dir(dir.path())
        .arg("deptype")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "(run)");

    let output = pkgmeta()
        .current_dir(dir.path())
        .args(["--config", "missing.toml", "deptype"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
