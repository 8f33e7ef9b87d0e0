//! Build configuration file (initramfs.toml)
//!
//! Every setting can come from the file, the command line, or the
//! built-in defaults, with the command line taking precedence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::defaults;
use crate::core::cpio::ArchiveOptions;
use crate::core::format::{self, OutputFormat};
use crate::core::image::Ext4Options;
use crate::core::manifest::ModePolicy;
use crate::core::pipeline::BuildRequest;
use crate::error::ConfigError;

/// Contents of `initramfs.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Files to stage
    #[serde(default)]
    pub inputs: InputsConfig,

    /// Artifact location and format
    #[serde(default)]
    pub output: OutputConfig,

    /// Permission overrides
    #[serde(default)]
    pub modes: ModesConfig,

    /// cpio header policy
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// ext4 image parameters
    #[serde(default)]
    pub ext4: Ext4Options,
}

/// `[inputs]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InputsConfig {
    /// Executables staged under `/bin`
    #[serde(default)]
    pub bins: Vec<PathBuf>,

    /// Libraries staged under `/lib64`
    #[serde(default)]
    pub libs: Vec<PathBuf>,

    /// Program staged as `/init`
    #[serde(default)]
    pub init: Option<PathBuf>,
}

/// `[output]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Artifact path
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Explicit format; inferred from the path when absent
    #[serde(default)]
    pub format: Option<OutputFormat>,
}

/// `[modes]` table, octal strings such as `"0755"`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModesConfig {
    #[serde(default)]
    pub bin: Option<String>,
    #[serde(default)]
    pub lib: Option<String>,
    #[serde(default)]
    pub init: Option<String>,
    #[serde(default)]
    pub dir: Option<String>,
}

/// `[archive]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Fixed mtime for every entry
    #[serde(default)]
    pub mtime: Option<u32>,

    /// Use `SOURCE_DATE_EPOCH` when `mtime` is unset
    #[serde(default = "default_true")]
    pub source_date_epoch: bool,

    /// Owner written into every header
    #[serde(default)]
    pub uid: u32,

    /// Group written into every header
    #[serde(default)]
    pub gid: u32,

    /// Keep the staged files' owner instead of `uid`/`gid`
    #[serde(default)]
    pub preserve_owner: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            mtime: None,
            source_date_epoch: true,
            uid: 0,
            gid: 0,
            preserve_owner: false,
        }
    }
}

/// Command-line values that override the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bins: Vec<PathBuf>,
    pub libs: Vec<PathBuf>,
    pub init: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub compress: bool,
    pub lib_mode: Option<String>,
    pub mtime: Option<u32>,
    pub source_date_epoch: Option<u32>,
}

impl BuildConfig {
    /// Parse a config document
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a config file; relative input paths resolve against its directory
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        let mut config = Self::from_toml(&content, path)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Locate `initramfs.toml` in `dir`
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        let candidate = dir.join(defaults::CONFIG_FILE_NAME);
        candidate.is_file().then_some(candidate)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.inputs.bins.iter_mut().for_each(join);
        self.inputs.libs.iter_mut().for_each(join);
        self.inputs.init.iter_mut().for_each(join);
        self.output.path.iter_mut().for_each(join);
    }

    /// Merge with command-line overrides into a validated build request
    ///
    /// Non-empty `bins`/`libs` on the command line replace the file's lists.
    pub fn into_request(self, overrides: Overrides) -> Result<BuildRequest, ConfigError> {
        let init = overrides
            .init
            .or(self.inputs.init)
            .ok_or_else(|| ConfigError::MissingField {
                field: "init".to_string(),
            })?;
        let bins = if overrides.bins.is_empty() {
            self.inputs.bins
        } else {
            overrides.bins
        };
        let libs = if overrides.libs.is_empty() {
            self.inputs.libs
        } else {
            overrides.libs
        };

        let output = overrides
            .output
            .or(self.output.path)
            .unwrap_or_else(|| PathBuf::from(defaults::DEFAULT_OUTPUT));
        let format = format::resolve(
            overrides.format.or(self.output.format),
            overrides.compress,
            &output,
        );

        let modes = self.modes.resolve(overrides.lib_mode.as_deref())?;

        let fixed_mtime = overrides.mtime.or(self.archive.mtime).or(
            if self.archive.source_date_epoch {
                overrides.source_date_epoch
            } else {
                None
            },
        );
        let (fixed_uid, fixed_gid) = if self.archive.preserve_owner {
            (None, None)
        } else {
            (Some(self.archive.uid), Some(self.archive.gid))
        };
        let archive = ArchiveOptions {
            fixed_mtime,
            fixed_uid,
            fixed_gid,
            ..ArchiveOptions::default()
        };

        self.ext4.validate()?;

        Ok(BuildRequest {
            bins,
            libs,
            init,
            output,
            format,
            modes,
            archive,
            ext4: self.ext4,
            staging_parent: None,
        })
    }
}

impl ModesConfig {
    /// Apply overrides on top of the default policy
    fn resolve(&self, lib_override: Option<&str>) -> Result<ModePolicy, ConfigError> {
        let mut policy = ModePolicy::default();
        if let Some(v) = &self.bin {
            policy.bin = parse_mode("modes.bin", v)?;
        }
        if let Some(v) = lib_override.or(self.lib.as_deref()) {
            policy.lib = parse_mode("modes.lib", v)?;
        }
        if let Some(v) = &self.init {
            policy.init = parse_mode("modes.init", v)?;
        }
        if let Some(v) = &self.dir {
            policy.dir = parse_mode("modes.dir", v)?;
        }
        Ok(policy)
    }
}

/// Parse an octal permission string (`0755`, `755` or `0o755`)
pub fn parse_mode(field: &str, value: &str) -> Result<u32, ConfigError> {
    let digits = value.trim();
    let digits = digits.strip_prefix("0o").unwrap_or(digits);
    let invalid = || ConfigError::InvalidMode {
        field: field.to_string(),
        value: value.to_string(),
    };
    if digits.is_empty() || !digits.bytes().all(|b| matches!(b, b'0'..=b'7')) {
        return Err(invalid());
    }
    let mode = u32::from_str_radix(digits, 8).map_err(|_| invalid())?;
    if mode > defaults::MAX_MODE {
        return Err(invalid());
    }
    Ok(mode)
}
