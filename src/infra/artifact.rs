//! Atomic artifact output
//!
//! The artifact is produced in a temporary file next to the requested path
//! and renamed into place only once it is complete. Dropping an uncommitted
//! writer deletes the temporary file, so a failed build never leaves a
//! partial artifact behind.

use std::fs::{File, Permissions};
use std::io::{self, Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::error::BuildError;

/// Mode of the committed artifact
const ARTIFACT_MODE: u32 = 0o644;

/// A committed artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactInfo {
    /// Final location
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Hex SHA-256 of the contents
    pub sha256: String,
}

/// Pending artifact backed by a temporary file in the target directory
#[derive(Debug)]
pub struct ArtifactWriter {
    target: PathBuf,
    temp: NamedTempFile,
}

impl ArtifactWriter {
    /// Prepare a temporary file beside `target`
    pub fn create(target: &Path) -> Result<Self, BuildError> {
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| artifact_err(target, "output path has no file name"))?;

        let temp = tempfile::Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| artifact_err(target, e))?;
        tracing::debug!(
            "Writing {} via {}",
            target.display(),
            temp.path().display()
        );

        Ok(Self {
            target: target.to_path_buf(),
            temp,
        })
    }

    /// Path of the temporary file, for tools that write the artifact themselves
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Write the artifact contents
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<(), BuildError> {
        self.temp
            .write_all(bytes)
            .map_err(|e| artifact_err(&self.target, e))
    }

    /// Move the finished artifact to its final path
    pub fn commit(self) -> Result<ArtifactInfo, BuildError> {
        let Self { target, temp } = self;
        let file = temp.as_file();
        // temp files are created 0600
        file.set_permissions(Permissions::from_mode(ARTIFACT_MODE))
            .and_then(|()| file.sync_all())
            .map_err(|e| artifact_err(&target, e))?;
        temp.persist(&target)
            .map_err(|e| artifact_err(&target, e.error))?;

        let size = std::fs::metadata(&target)
            .map_err(|e| artifact_err(&target, e))?
            .len();
        let sha256 = sha256_file(&target).map_err(|e| artifact_err(&target, e))?;
        Ok(ArtifactInfo {
            path: target,
            size,
            sha256,
        })
    }
}

/// Hex SHA-256 of a file's contents
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn artifact_err(path: &Path, error: impl ToString) -> BuildError {
    BuildError::ArtifactIo {
        path: path.to_path_buf(),
        error: error.to_string(),
    }
}
