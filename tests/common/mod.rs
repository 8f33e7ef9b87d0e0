//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Contents of the sample init script
pub const INIT_SCRIPT: &str = "#!/bin/sh\nmount -t proc proc /proc\nexec /bin/sh\n";

/// Test project context
///
/// Creates a temporary directory holding build inputs and provides
/// utilities for running the binary against it.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Project with a shell, a library and an init script under `inputs/`
    pub fn with_inputs() -> Self {
        let project = Self::new();
        project.create_executable("inputs/sh", "#!/bin/sh\necho sh\n");
        project.create_file("inputs/libc.so.6", "\x7fELF fake libc");
        project.create_executable("inputs/init", INIT_SCRIPT);
        project
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Absolute path of a project file, as a string argument
    pub fn arg(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create an executable file in the test project
    pub fn create_executable(&self, name: &str, content: &str) {
        self.create_file(name, content);
        let path = self.dir.path().join(name);
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to chmod file");
    }

    /// Create a directory in the test project
    pub fn create_dir(&self, name: &str) {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(path).expect("Failed to create directory");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a binary file from the test project
    pub fn read_bytes(&self, name: &str) -> Vec<u8> {
        std::fs::read(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Names of the entries in a project directory
    pub fn list_dir(&self, name: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path().join(name))
            .expect("Failed to read directory")
            .map(|e| e.expect("Failed to read entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Command for the binary, running in the project directory
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_initramfs-builder"));
        cmd.current_dir(self.dir.path());
        cmd.env_remove("SOURCE_DATE_EPOCH");
        cmd.env_remove("RUST_LOG");
        cmd.env_remove("INITRAMFS_GZIP");
        cmd.env_remove("INITRAMFS_MKE2FS");
        cmd
    }

    /// Run the binary with `args`
    pub fn run(&self, args: &[&str]) -> Output {
        self.command()
            .args(args)
            .output()
            .expect("Failed to execute initramfs-builder")
    }

    /// Build from the sample inputs into `output`, with extra `args`
    pub fn build(&self, output: &str, args: &[&str]) -> Output {
        let (sh, libc, init) = (
            self.arg("inputs/sh"),
            self.arg("inputs/libc.so.6"),
            self.arg("inputs/init"),
        );
        let mut full = vec![
            "build",
            "--bins",
            sh.as_str(),
            "--libs",
            libc.as_str(),
            "--init",
            init.as_str(),
            "--output",
            output,
        ];
        full.extend_from_slice(args);
        self.run(&full)
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `tool` is on PATH; prints a skip notice when it is not
pub fn has_tool(tool: &str) -> bool {
    let found = which::which(tool).is_ok();
    if !found {
        eprintln!("{tool} not installed, skipping");
    }
    found
}
