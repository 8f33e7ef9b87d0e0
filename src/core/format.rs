//! Output format selection

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Final artifact produced by a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Uncompressed newc cpio stream
    #[serde(rename = "raw", alias = "cpio")]
    RawCpio,
    /// newc cpio stream compressed with `gzip --best`
    #[serde(rename = "gzip", alias = "gz")]
    GzipCpio,
    /// ext4 filesystem image built by `mke2fs`
    #[serde(rename = "ext4")]
    Ext4Image,
}

impl OutputFormat {
    /// Guess the format from the output file extension
    ///
    /// Only the final extension is consulted, so a directory such as
    /// `images.ext4/` does not select an ext4 image.
    pub fn infer(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("ext4") => Self::Ext4Image,
            Some("gz") => Self::GzipCpio,
            _ => Self::RawCpio,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RawCpio => write!(f, "raw"),
            Self::GzipCpio => write!(f, "gzip"),
            Self::Ext4Image => write!(f, "ext4"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" | "cpio" => Ok(Self::RawCpio),
            "gzip" | "gz" | "cpio.gz" => Ok(Self::GzipCpio),
            "ext4" => Ok(Self::Ext4Image),
            _ => Err(ConfigError::UnknownFormat {
                value: s.to_string(),
            }),
        }
    }
}

/// Pick the output format from, in priority order, an explicit selector,
/// the `--compress` flag, and the output file extension
pub fn resolve(explicit: Option<OutputFormat>, compress: bool, output: &Path) -> OutputFormat {
    if let Some(format) = explicit {
        return format;
    }
    match OutputFormat::infer(output) {
        OutputFormat::RawCpio if compress => OutputFormat::GzipCpio,
        inferred => inferred,
    }
}
