//! Integration tests for `initramfs-builder build`

mod common;

use common::{has_tool, TestProject, INIT_SCRIPT};
use initramfs_builder::core::inspect::{read_archive, ArchiveEntry};

fn entries(bytes: &[u8]) -> Vec<ArchiveEntry> {
    read_archive(bytes).expect("output should be a valid newc archive")
}

fn names(entries: &[ArchiveEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

#[test]
fn test_build_raw_cpio() {
    let project = TestProject::with_inputs();
    let output = project.build("initramfs.cpio", &["--format", "raw"]);
    assert!(
        output.status.success(),
        "build failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let bytes = project.read_bytes("initramfs.cpio");
    let entries = entries(&bytes);
    assert_eq!(
        names(&entries),
        [
            "./dev/urandom",
            "./bin",
            "./lib64",
            "./bin/sh",
            "./lib64/libc.so.6",
            "./init",
            "TRAILER!!!"
        ]
    );

    let init = &entries[5];
    assert_eq!(init.data, INIT_SCRIPT.as_bytes());
    assert_eq!(init.permissions(), 0o755);
    assert_eq!(entries[4].permissions(), 0o777);
    assert!(entries[0].is_char_device());
    assert!(entries[1].is_dir());
}

#[test]
fn test_build_infers_raw_from_extension() {
    let project = TestProject::with_inputs();
    let output = project.build("root.cpio", &[]);
    assert!(output.status.success());
    let bytes = project.read_bytes("root.cpio");
    assert!(bytes.starts_with(b"070701"));
}

#[test]
fn test_build_is_reproducible() {
    let project = TestProject::with_inputs();
    assert!(project.build("a.cpio", &["--mtime", "0"]).status.success());
    assert!(project.build("b.cpio", &["--mtime", "0"]).status.success());
    assert_eq!(project.read_bytes("a.cpio"), project.read_bytes("b.cpio"));
}

#[test]
fn test_source_date_epoch_sets_mtime() {
    let project = TestProject::with_inputs();
    let output = project
        .command()
        .env("SOURCE_DATE_EPOCH", "1700000000")
        .args([
            "build",
            "--init",
            &project.arg("inputs/init"),
            "--output",
            "initramfs.cpio",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let bytes = project.read_bytes("initramfs.cpio");
    assert!(entries(&bytes)
        .iter()
        .filter(|e| !e.is_trailer())
        .all(|e| e.mtime == 1_700_000_000));
}

#[test]
fn test_lib_mode_override() {
    let project = TestProject::with_inputs();
    let output = project.build("initramfs.cpio", &["--lib-mode", "0644"]);
    assert!(output.status.success());
    let bytes = project.read_bytes("initramfs.cpio");
    let lib = entries(&bytes)
        .into_iter()
        .find(|e| e.name == "./lib64/libc.so.6")
        .unwrap();
    assert_eq!(lib.permissions(), 0o644);
}

#[test]
fn test_invalid_lib_mode_fails() {
    let project = TestProject::with_inputs();
    let output = project.build("initramfs.cpio", &["--lib-mode", "999"]);
    assert!(!output.status.success());
    assert!(!project.file_exists("initramfs.cpio"));
}

#[test]
fn test_missing_input_fails_without_artifact() {
    let project = TestProject::with_inputs();
    project.create_dir("staging");
    let output = project.run(&[
        "build",
        "--bins",
        &project.arg("inputs/sh"),
        &project.arg("inputs/missing"),
        "--init",
        &project.arg("inputs/init"),
        "--output",
        "initramfs.cpio",
        "--staging-dir",
        &project.arg("staging"),
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Input not found"), "stderr: {stderr}");
    assert!(stderr.contains("missing"));
    assert!(!project.file_exists("initramfs.cpio"));
    assert!(project.list_dir("staging").is_empty());
}

#[test]
fn test_missing_init_argument_fails() {
    let project = TestProject::with_inputs();
    let output = project.run(&["build", "--output", "initramfs.cpio"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("init"), "stderr: {stderr}");
}

#[test]
fn test_duplicate_basename_fails() {
    let project = TestProject::with_inputs();
    project.create_executable("other/sh", "#!/bin/sh\n");
    let output = project.run(&[
        "build",
        "--bins",
        &project.arg("inputs/sh"),
        &project.arg("other/sh"),
        "--init",
        &project.arg("inputs/init"),
        "--output",
        "initramfs.cpio",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Duplicate destination"), "stderr: {stderr}");
    assert!(!project.file_exists("initramfs.cpio"));
}

#[test]
fn test_json_report() {
    let project = TestProject::with_inputs();
    let output = project.build("initramfs.cpio", &["--json"]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["report"]["format"], "raw");
    assert_eq!(json["report"]["entries"], 6);
    let size = std::fs::metadata(project.path().join("initramfs.cpio"))
        .unwrap()
        .len();
    assert_eq!(json["report"]["size"], size);
    assert_eq!(json["report"]["sha256"].as_str().unwrap().len(), 64);
}

#[test]
fn test_json_error() {
    let project = TestProject::new();
    let output = project.run(&["--json", "build", "--init", "/nonexistent/init"]);
    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(json["status"], "error");
}

#[test]
fn test_quiet_prints_nothing() {
    let project = TestProject::with_inputs();
    let output = project.build("initramfs.cpio", &["--quiet"]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_config_file() {
    let project = TestProject::with_inputs();
    project.create_file(
        "initramfs.toml",
        r#"
[inputs]
bins = ["inputs/sh"]
init = "inputs/init"

[output]
path = "from-config.cpio"

[archive]
mtime = 42
"#,
    );

    let output = project.run(&["build"]);
    assert!(
        output.status.success(),
        "build failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let bytes = project.read_bytes("from-config.cpio");
    let entries = entries(&bytes);
    assert!(names(&entries).contains(&"./bin/sh"));
    assert!(!names(&entries).contains(&"./lib64/libc.so.6"));
    assert!(entries.iter().filter(|e| !e.is_trailer()).all(|e| e.mtime == 42));
}

#[test]
fn test_invalid_config_file() {
    let project = TestProject::with_inputs();
    project.create_file("broken.toml", "[inputs\n");
    let output = project.run(&["build", "--config", "broken.toml"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("broken.toml"), "stderr: {stderr}");
}

#[test]
fn test_build_gzip() {
    if !has_tool("gzip") {
        return;
    }
    let project = TestProject::with_inputs();
    let output = project.build("initramfs.cpio.gz", &[]);
    assert!(output.status.success());
    let bytes = project.read_bytes("initramfs.cpio.gz");
    assert!(bytes.starts_with(&[0x1f, 0x8b]));
}

#[test]
fn test_compress_flag_forces_gzip() {
    if !has_tool("gzip") {
        return;
    }
    let project = TestProject::with_inputs();
    let output = project.build("initramfs.img", &["--compress"]);
    assert!(output.status.success());
    assert!(project.read_bytes("initramfs.img").starts_with(&[0x1f, 0x8b]));
}

#[test]
fn test_failing_compressor_leaves_no_artifact() {
    if !has_tool("false") {
        return;
    }
    let project = TestProject::with_inputs();
    project.create_dir("out");
    project.create_dir("staging");
    let output = project
        .command()
        .env("INITRAMFS_GZIP", "false")
        .args([
            "build",
            "--init",
            &project.arg("inputs/init"),
            "--output",
            "out/initramfs.cpio.gz",
            "--staging-dir",
            &project.arg("staging"),
        ])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("External tool"), "stderr: {stderr}");
    assert!(project.list_dir("out").is_empty());
    assert!(project.list_dir("staging").is_empty());
}

#[test]
fn test_failing_formatter_leaves_no_artifact() {
    if !has_tool("false") {
        return;
    }
    let project = TestProject::with_inputs();
    project.create_dir("out");
    project.create_dir("staging");
    let output = project
        .command()
        .env("INITRAMFS_MKE2FS", "false")
        .args([
            "build",
            "--init",
            &project.arg("inputs/init"),
            "--output",
            "out/root.ext4",
            "--staging-dir",
            &project.arg("staging"),
        ])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("External tool"), "stderr: {stderr}");
    assert!(project.list_dir("out").is_empty());
    assert!(project.list_dir("staging").is_empty());
}

#[test]
fn test_build_ext4() {
    if !has_tool("mke2fs") {
        return;
    }
    let project = TestProject::with_inputs();
    project.create_file(
        "initramfs.toml",
        r#"
[ext4]
size = "8M"
label = "initrd"
reserved_percent = 0
"#,
    );
    let output = project.build("root.ext4", &[]);
    assert!(
        output.status.success(),
        "build failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(std::fs::metadata(project.path().join("root.ext4")).unwrap().len() > 0);
}
