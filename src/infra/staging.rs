//! Staging tree
//!
//! A per-build temporary directory mirroring the image root. The tree is
//! uniquely named and owned by a single build; dropping the guard removes it.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::defaults::STAGING_PREFIX;
use crate::core::manifest::{EntryKind, Manifest, ManifestEntry};
use crate::error::BuildError;
use crate::infra::filesystem;

/// Files and bytes currently staged
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StagingStats {
    /// Regular files under the root
    pub files: usize,
    /// Directories under the root, excluding the root itself
    pub dirs: usize,
    /// Total size of regular files
    pub bytes: u64,
}

/// Exclusively owned temporary root filesystem tree
#[derive(Debug)]
pub struct StagingTree {
    dir: Option<TempDir>,
    root: PathBuf,
}

impl StagingTree {
    /// Allocate a fresh tree in the system temp directory
    pub fn create() -> Result<Self, BuildError> {
        Self::allocate(tempfile::Builder::new().prefix(STAGING_PREFIX).tempdir(), None)
    }

    /// Allocate a fresh tree under `parent`
    pub fn create_in(parent: &Path) -> Result<Self, BuildError> {
        Self::allocate(
            tempfile::Builder::new()
                .prefix(STAGING_PREFIX)
                .tempdir_in(parent),
            Some(parent),
        )
    }

    fn allocate(dir: std::io::Result<TempDir>, parent: Option<&Path>) -> Result<Self, BuildError> {
        let dir = dir.map_err(|e| BuildError::StagingIo {
            path: parent.map_or_else(std::env::temp_dir, Path::to_path_buf),
            action: "allocate staging directory in",
            error: e.to_string(),
        })?;
        let root = dir.path().to_path_buf();
        tracing::debug!("Allocated staging tree {}", root.display());
        Ok(Self {
            dir: Some(dir),
            root,
        })
    }

    /// Root of the tree
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk location of a manifest entry
    pub fn path_of(&self, entry: &ManifestEntry) -> PathBuf {
        self.root.join(entry.relative_path())
    }

    /// Realize every manifest entry under the root
    ///
    /// Directory modes are applied after all files are in place so that a
    /// read-only directory mode does not block staging its contents. Device
    /// node references only get their parent directory.
    pub fn materialize(&self, manifest: &Manifest) -> Result<(), BuildError> {
        let mut dirs = Vec::new();

        for entry in manifest {
            let path = self.path_of(entry);
            match entry.kind {
                EntryKind::Directory => {
                    filesystem::create_dir_all(&path)?;
                    dirs.push((path, entry.mode));
                }
                EntryKind::RegularFile => {
                    let Some(source) = entry.source_path.as_deref() else {
                        return Err(BuildError::StagingIo {
                            path,
                            action: "copy",
                            error: "entry has no source path".to_string(),
                        });
                    };
                    let copied = filesystem::copy_file(source, &path)?;
                    filesystem::set_mode(&path, entry.mode)?;
                    tracing::debug!(
                        "Staged {} -> {} ({copied} bytes, mode {:04o})",
                        source.display(),
                        entry.dest_path,
                        entry.mode
                    );
                }
                EntryKind::DeviceNode => {
                    if let Some(parent) = path.parent() {
                        filesystem::create_dir_all(parent)?;
                    }
                    tracing::debug!("Device node {} is a reference only", entry.dest_path);
                }
            }
        }

        for (path, mode) in dirs.iter().rev() {
            filesystem::set_mode(path, *mode)?;
        }

        Ok(())
    }

    /// Count what is currently staged
    pub fn stats(&self) -> StagingStats {
        let mut stats = StagingStats::default();
        for entry in walkdir::WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_map(Result::ok)
        {
            let file_type = entry.file_type();
            if file_type.is_dir() {
                stats.dirs += 1;
            } else if file_type.is_file() {
                stats.files += 1;
                stats.bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }
        stats
    }

    /// Remove the tree, reporting failure as a cleanup warning
    pub fn close(mut self) -> Result<(), BuildError> {
        match self.dir.take() {
            Some(dir) => dir.close().map_err(|e| BuildError::CleanupWarning {
                path: self.root.clone(),
                error: e.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl Drop for StagingTree {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            tracing::debug!("Removing staging tree {}", self.root.display());
            if let Err(e) = dir.close() {
                tracing::warn!("Failed to remove staging tree {}: {e}", self.root.display());
            }
        }
    }
}
