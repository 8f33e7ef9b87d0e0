//! Manifest resolution
//!
//! Turns the caller's binaries, libraries and init program into the ordered
//! list of entries that ends up in the image. Entry order is the archive
//! order: directories come before anything nested under them.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::defaults;
use crate::config::layout::{BIN_DIR, DEVICE_NODE_PATH, INIT_PATH, LIB_DIR};
use crate::error::BuildError;

/// What kind of filesystem object an entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Regular file copied from a source path
    RegularFile,
    /// Directory created in the staging tree
    Directory,
    /// Device node reference, never created on disk
    DeviceNode,
}

/// One entry of the image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    /// Host file to copy, absent for directories and device nodes
    pub source_path: Option<PathBuf>,
    /// Destination relative to the image root, e.g. `./bin/sh`
    pub dest_path: String,
    /// Permission bits (no file type bits)
    pub mode: u32,
    /// Entry kind
    pub kind: EntryKind,
}

impl ManifestEntry {
    /// A regular file copied from `source`
    pub fn file(source: impl Into<PathBuf>, dest: impl Into<String>, mode: u32) -> Self {
        Self {
            source_path: Some(source.into()),
            dest_path: dest.into(),
            mode,
            kind: EntryKind::RegularFile,
        }
    }

    /// A directory
    pub fn directory(dest: impl Into<String>, mode: u32) -> Self {
        Self {
            source_path: None,
            dest_path: dest.into(),
            mode,
            kind: EntryKind::Directory,
        }
    }

    /// A device node reference
    pub fn device(dest: impl Into<String>, mode: u32) -> Self {
        Self {
            source_path: None,
            dest_path: dest.into(),
            mode,
            kind: EntryKind::DeviceNode,
        }
    }

    /// Destination with the leading `./` removed, for joining onto a root
    pub fn relative_path(&self) -> &Path {
        Path::new(self.dest_path.trim_start_matches("./"))
    }

    /// Whether `self` is nested below the directory `dir`
    pub fn is_under(&self, dir: &str) -> bool {
        self.dest_path
            .strip_prefix(dir)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Permission bits applied per entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModePolicy {
    /// Executables under `/bin`
    pub bin: u32,
    /// Libraries under `/lib64`
    pub lib: u32,
    /// The `/init` program
    pub init: u32,
    /// Directories
    pub dir: u32,
    /// The device node reference
    pub device: u32,
}

impl Default for ModePolicy {
    fn default() -> Self {
        Self {
            bin: defaults::BIN_MODE,
            lib: defaults::LIB_MODE,
            init: defaults::INIT_MODE,
            dir: defaults::DIR_MODE,
            device: defaults::DEVICE_MODE,
        }
    }
}

/// Ordered, immutable list of image entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build a manifest from already-resolved entries
    ///
    /// Destinations must be unique. Sources are not checked here; use
    /// [`ManifestBuilder`] for caller input.
    pub fn from_entries(entries: Vec<ManifestEntry>) -> Result<Self, BuildError> {
        let mut seen: HashMap<&str, &ManifestEntry> = HashMap::new();
        for entry in &entries {
            if let Some(previous) = seen.insert(&entry.dest_path, entry) {
                return Err(BuildError::DuplicateDestination {
                    dest: entry.dest_path.clone(),
                    first: previous.source_path.clone().unwrap_or_default(),
                    second: entry.source_path.clone().unwrap_or_default(),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Entries in archive order
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Iterate entries in archive order
    pub fn iter(&self) -> std::slice::Iter<'_, ManifestEntry> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the entry with destination `dest`
    pub fn position(&self, dest: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.dest_path == dest)
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a ManifestEntry;
    type IntoIter = std::slice::Iter<'a, ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Resolves caller input into a [`Manifest`]
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    init: PathBuf,
    bins: Vec<PathBuf>,
    libs: Vec<PathBuf>,
    modes: ModePolicy,
}

impl ManifestBuilder {
    /// Start a manifest around the mandatory init program
    pub fn new(init: impl Into<PathBuf>) -> Self {
        Self {
            init: init.into(),
            bins: Vec::new(),
            libs: Vec::new(),
            modes: ModePolicy::default(),
        }
    }

    /// Set the executables staged under `/bin`
    #[must_use]
    pub fn bins<I, P>(mut self, bins: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.bins = bins.into_iter().map(Into::into).collect();
        self
    }

    /// Set the libraries staged under `/lib64`
    #[must_use]
    pub fn libs<I, P>(mut self, libs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.libs = libs.into_iter().map(Into::into).collect();
        self
    }

    /// Override the mode policy
    #[must_use]
    pub fn modes(mut self, modes: ModePolicy) -> Self {
        self.modes = modes;
        self
    }

    /// Validate every source and produce the ordered manifest
    pub fn build(self) -> Result<Manifest, BuildError> {
        let modes = self.modes;
        let mut entries = Vec::with_capacity(self.bins.len() + self.libs.len() + 4);

        entries.push(ManifestEntry::device(DEVICE_NODE_PATH, modes.device));
        entries.push(ManifestEntry::directory(BIN_DIR, modes.dir));
        entries.push(ManifestEntry::directory(LIB_DIR, modes.dir));

        for bin in self.bins {
            check_source(&bin)?;
            let dest = format!("{BIN_DIR}/{}", basename(&bin)?);
            entries.push(ManifestEntry::file(bin, dest, modes.bin));
        }

        for lib in self.libs {
            check_source(&lib)?;
            let dest = format!("{LIB_DIR}/{}", basename(&lib)?);
            entries.push(ManifestEntry::file(lib, dest, modes.lib));
        }

        check_source(&self.init)?;
        entries.push(ManifestEntry::file(self.init, INIT_PATH, modes.init));

        let manifest = Manifest::from_entries(entries)?;
        tracing::debug!("Resolved manifest with {} entries", manifest.len());
        Ok(manifest)
    }
}

/// Ensure `path` is an existing, readable regular file
fn check_source(path: &Path) -> Result<(), BuildError> {
    let metadata = std::fs::metadata(path).map_err(|e| not_found(path, &e))?;
    if !metadata.is_file() {
        return Err(BuildError::InvalidInput {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }
    File::open(path).map_err(|e| not_found(path, &e))?;
    Ok(())
}

fn not_found(path: &Path, error: &io::Error) -> BuildError {
    BuildError::InputNotFound {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}

fn basename(path: &Path) -> Result<&str, BuildError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| BuildError::InvalidInput {
            path: path.to_path_buf(),
            reason: "no UTF-8 file name".to_string(),
        })
}
