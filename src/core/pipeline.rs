//! Build pipeline
//!
//! Resolves the manifest, stages it in a private temporary tree, produces
//! the requested artifact and removes the tree. The staging tree is removed
//! on every exit path, and the artifact only appears once it is complete.

use std::path::PathBuf;

use serde::Serialize;

use crate::core::compress::gzip_best;
use crate::core::cpio::{self, ArchiveOptions};
use crate::core::format::OutputFormat;
use crate::core::image::Ext4Options;
use crate::core::manifest::{Manifest, ManifestBuilder, ModePolicy};
use crate::error::BuildError;
use crate::infra::artifact::{ArtifactInfo, ArtifactWriter};
use crate::infra::staging::StagingTree;
use crate::infra::tools::{run_tool, Tool};

/// Everything one build needs
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Executables staged under `/bin`
    pub bins: Vec<PathBuf>,
    /// Libraries staged under `/lib64`
    pub libs: Vec<PathBuf>,
    /// Program staged as `/init`
    pub init: PathBuf,
    /// Artifact path
    pub output: PathBuf,
    /// Artifact format
    pub format: OutputFormat,
    /// Permission policy
    pub modes: ModePolicy,
    /// cpio header policy
    pub archive: ArchiveOptions,
    /// mke2fs parameters, used for [`OutputFormat::Ext4Image`]
    pub ext4: Ext4Options,
    /// Directory to allocate the staging tree in; system temp dir if unset
    pub staging_parent: Option<PathBuf>,
}

impl BuildRequest {
    /// Request with default policies
    pub fn new(init: impl Into<PathBuf>, output: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            bins: Vec::new(),
            libs: Vec::new(),
            init: init.into(),
            output: output.into(),
            format,
            modes: ModePolicy::default(),
            archive: ArchiveOptions::default(),
            ext4: Ext4Options::default(),
            staging_parent: None,
        }
    }
}

/// Outcome of a successful build
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub output: PathBuf,
    pub format: OutputFormat,
    /// Manifest entries, excluding the cpio trailer
    pub entries: usize,
    pub size: u64,
    pub sha256: String,
    /// Non-fatal problems, such as a staging tree that could not be removed
    pub warnings: Vec<String>,
}

/// Run a complete build
pub fn build(request: &BuildRequest) -> Result<BuildReport, BuildError> {
    build_with(request, |_| {})
}

/// Build, calling `before_cleanup` once the artifact is committed
fn build_with(
    request: &BuildRequest,
    before_cleanup: impl FnOnce(&StagingTree),
) -> Result<BuildReport, BuildError> {
    if request.format == OutputFormat::Ext4Image {
        request.ext4.validate().map_err(BuildError::InvalidOptions)?;
    }

    let manifest = ManifestBuilder::new(&request.init)
        .bins(&request.bins)
        .libs(&request.libs)
        .modes(request.modes)
        .build()?;
    tracing::info!("Resolved {} manifest entries", manifest.len());

    let tree = match &request.staging_parent {
        Some(parent) => StagingTree::create_in(parent)?,
        None => StagingTree::create()?,
    };
    // `tree` is removed by its Drop impl if anything below fails
    tree.materialize(&manifest)?;
    let stats = tree.stats();
    tracing::info!(
        "Staged {} files in {} directories ({} bytes) at {}",
        stats.files,
        stats.dirs,
        stats.bytes,
        tree.root().display()
    );

    let artifact = produce(request, &tree, &manifest)?;
    tracing::info!(
        "Wrote {} ({} bytes, sha256 {})",
        artifact.path.display(),
        artifact.size,
        artifact.sha256
    );

    before_cleanup(&tree);
    let mut warnings = Vec::new();
    if let Err(e) = tree.close() {
        tracing::warn!("{e}");
        warnings.push(e.to_string());
    }

    Ok(BuildReport {
        output: artifact.path,
        format: request.format,
        entries: manifest.len(),
        size: artifact.size,
        sha256: artifact.sha256,
        warnings,
    })
}

/// Serialize or format the staged tree into the output artifact
fn produce(
    request: &BuildRequest,
    tree: &StagingTree,
    manifest: &Manifest,
) -> Result<ArtifactInfo, BuildError> {
    match request.format {
        OutputFormat::RawCpio => {
            let archive = cpio::to_bytes(tree, manifest, &request.archive)?;
            let mut writer = ArtifactWriter::create(&request.output)?;
            writer.write_all(&archive)?;
            writer.commit()
        }
        OutputFormat::GzipCpio => {
            let archive = cpio::to_bytes(tree, manifest, &request.archive)?;
            let (compressed, _) = gzip_best(&archive)?;
            let mut writer = ArtifactWriter::create(&request.output)?;
            writer.write_all(&compressed)?;
            writer.commit()
        }
        OutputFormat::Ext4Image => {
            let writer = ArtifactWriter::create(&request.output)?;
            let args = request.ext4.mke2fs_args(tree.root(), writer.temp_path());
            run_tool(Tool::Mke2fs, &args, None)?;
            writer.commit()
        }
    }
}
