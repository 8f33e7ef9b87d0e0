//! Integration tests for `initramfs-builder list`

mod common;

use assert_fs::prelude::*;
use common::{has_tool, TestProject};
use predicates::prelude::*;

#[test]
fn test_list_built_archive() {
    let project = TestProject::with_inputs();
    assert!(project.build("initramfs.cpio", &[]).status.success());

    let output = project.run(&["list", "initramfs.cpio"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);

    let listing = predicate::str::contains("crw-rw-rw-")
        .and(predicate::str::contains("./dev/urandom"))
        .and(predicate::str::contains("drwxr-xr-x"))
        .and(predicate::str::contains("./lib64/libc.so.6"))
        .and(predicate::str::contains("./init"))
        .and(predicate::str::contains("TRAILER!!!").not());
    assert!(listing.eval(&stdout), "unexpected listing:\n{stdout}");
}

#[test]
fn test_list_json() {
    let project = TestProject::with_inputs();
    assert!(project.build("initramfs.cpio", &[]).status.success());

    let output = project.run(&["--json", "list", "initramfs.cpio"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = json["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 6);
    assert_eq!(entries[0]["name"], "./dev/urandom");
    assert_eq!(entries[5]["name"], "./init");
    assert!(entries[5].get("data").is_none());
}

#[test]
fn test_list_gzip_archive() {
    if !has_tool("gzip") {
        return;
    }
    let project = TestProject::with_inputs();
    assert!(project.build("initramfs.cpio.gz", &[]).status.success());

    let output = project.run(&["list", "initramfs.cpio.gz"]);
    assert!(output.status.success());
    assert!(predicate::str::contains("./bin/sh").eval(&String::from_utf8_lossy(&output.stdout)));
}

#[test]
fn test_list_rejects_garbage() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("not-an-archive.cpio");
    file.write_str(&"not cpio ".repeat(20)).unwrap();
    file.assert(predicate::path::exists());

    let project = TestProject::new();
    let output = project.run(&["list", &file.path().to_string_lossy()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(predicate::str::contains("Bad magic").eval(&stderr), "stderr: {stderr}");
}

#[test]
fn test_list_missing_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    let missing = temp.child("missing.cpio");
    missing.assert(predicate::path::missing());

    let project = TestProject::new();
    let output = project.run(&["list", &missing.path().to_string_lossy()]);
    assert!(!output.status.success());
}
