//! Build command implementation
//!
//! Implements `initramfs-builder build`: merges the configuration file with
//! command-line flags and runs the build pipeline.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::cli::output::{
    create_spinner, format_size, is_json, print_detail, print_success, print_warning,
};
use crate::core::config::{BuildConfig, Overrides};
use crate::core::format::OutputFormat;
use crate::core::pipeline;

/// Build options
#[derive(Debug, Default)]
pub struct BuildOptions {
    /// Executables for /bin
    pub bins: Vec<PathBuf>,
    /// Libraries for /lib64
    pub libs: Vec<PathBuf>,
    /// The /init program
    pub init: Option<PathBuf>,
    /// Artifact path
    pub output: Option<PathBuf>,
    /// Explicit artifact format
    pub format: Option<OutputFormat>,
    /// Force gzip for cpio output
    pub compress: bool,
    /// Configuration file
    pub config: Option<PathBuf>,
    /// Library mode override
    pub lib_mode: Option<String>,
    /// Fixed entry mtime
    pub mtime: Option<u32>,
    /// `SOURCE_DATE_EPOCH` from the environment
    pub source_date_epoch: Option<u32>,
    /// Staging tree parent directory
    pub staging_dir: Option<PathBuf>,
}

/// Execute the build command
pub fn execute(project_dir: &Path, options: BuildOptions) -> Result<()> {
    let config_path = options
        .config
        .clone()
        .or_else(|| BuildConfig::discover(project_dir));
    let config = match &config_path {
        Some(path) => BuildConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => BuildConfig::default(),
    };

    let overrides = Overrides {
        bins: options.bins,
        libs: options.libs,
        init: options.init,
        output: options.output,
        format: options.format,
        compress: options.compress,
        lib_mode: options.lib_mode,
        mtime: options.mtime,
        source_date_epoch: options.source_date_epoch,
    };
    let mut request = config
        .into_request(overrides)
        .context("Invalid build configuration")?;
    request.staging_parent = options.staging_dir;

    tracing::info!(
        "Building {} ({}) from {} binaries and {} libraries",
        request.output.display(),
        request.format,
        request.bins.len(),
        request.libs.len()
    );

    let spinner = create_spinner(&format!("Building {}...", request.output.display()));
    let result = pipeline::build(&request);
    spinner.finish_and_clear();
    let report = result.with_context(|| format!("Failed to build {}", request.output.display()))?;

    for warning in &report.warnings {
        print_warning(warning);
    }

    if is_json() {
        let json_result = serde_json::json!({
            "status": "success",
            "report": report,
        });
        println!("{}", serde_json::to_string_pretty(&json_result)?);
        return Ok(());
    }

    print_success(&format!(
        "Built {} ({})",
        report.output.display(),
        format_size(report.size)
    ));
    print_detail(&format!("Format: {}", report.format));
    print_detail(&format!("Entries: {}", report.entries));
    print_detail(&format!("SHA-256: {}", report.sha256));

    Ok(())
}
