//! Filesystem operations
//!
//! Handles file and directory operations for the staging tree.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::error::BuildError;

fn staging_err(path: &Path, action: &'static str, e: &std::io::Error) -> BuildError {
    BuildError::StagingIo {
        path: path.to_path_buf(),
        action,
        error: e.to_string(),
    }
}

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), BuildError> {
    fs::create_dir_all(path).map_err(|e| staging_err(path, "create directory", &e))
}

/// Copy file contents byte-for-byte, creating parent directories
pub fn copy_file(source: &Path, dest: &Path) -> Result<u64, BuildError> {
    if let Some(parent) = dest.parent() {
        create_dir_all(parent)?;
    }
    fs::copy(source, dest).map_err(|e| staging_err(dest, "copy", &e))
}

/// Set the permission bits of `path`
pub fn set_mode(path: &Path, mode: u32) -> Result<(), BuildError> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| staging_err(path, "chmod", &e))
}
