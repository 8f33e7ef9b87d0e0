//! ext4 image options
//!
//! The image is produced by `mke2fs -d`, which copies a directory tree into
//! a freshly formatted filesystem. No cpio stream is involved.

use std::ffi::OsString;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::defaults;
use crate::error::ConfigError;

/// Parameters passed to `mke2fs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ext4Options {
    /// Nominal image size as understood by mke2fs (e.g. `500M`)
    pub size: String,
    /// Filesystem label
    pub label: String,
    /// Percentage of blocks reserved for the superuser
    pub reserved_percent: u8,
}

impl Default for Ext4Options {
    fn default() -> Self {
        Self {
            size: defaults::EXT4_IMAGE_SIZE.to_string(),
            label: defaults::EXT4_LABEL.to_string(),
            reserved_percent: defaults::EXT4_RESERVED_PERCENT,
        }
    }
}

impl Ext4Options {
    /// Reject values mke2fs would refuse
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.label.len() > defaults::EXT4_LABEL_MAX {
            return Err(ConfigError::InvalidValue {
                field: "ext4.label".to_string(),
                message: format!(
                    "'{}' is longer than {} bytes",
                    self.label,
                    defaults::EXT4_LABEL_MAX
                ),
            });
        }
        if self.reserved_percent > 50 {
            return Err(ConfigError::InvalidValue {
                field: "ext4.reserved_percent".to_string(),
                message: format!("{} exceeds 50", self.reserved_percent),
            });
        }
        let valid_size = self
            .size
            .strip_suffix(['K', 'M', 'G', 'T', 'k', 'm', 'g', 't'])
            .unwrap_or(&self.size);
        if valid_size.is_empty() || !valid_size.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::InvalidValue {
                field: "ext4.size".to_string(),
                message: format!("'{}' is not a size like 500M", self.size),
            });
        }
        Ok(())
    }

    /// Arguments for `mke2fs` formatting `target` from `root`
    ///
    /// `-N 0` lets mke2fs pick the inode count for the content and `-F`
    /// allows formatting a regular file without prompting.
    pub fn mke2fs_args(&self, root: &Path, target: &Path) -> Vec<OsString> {
        vec![
            "-F".into(),
            "-L".into(),
            self.label.clone().into(),
            "-N".into(),
            "0".into(),
            "-d".into(),
            root.as_os_str().to_owned(),
            "-m".into(),
            self.reserved_percent.to_string().into(),
            "-t".into(),
            "ext4".into(),
            target.as_os_str().to_owned(),
            self.size.clone().into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = Ext4Options::default().mke2fs_args(Path::new("/tmp/stage"), Path::new("root.ext4"));
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "-F", "-L", "root", "-N", "0", "-d", "/tmp/stage", "-m", "5", "-t", "ext4",
                "root.ext4", "500M"
            ]
        );
    }

    #[test]
    fn test_validate() {
        assert!(Ext4Options::default().validate().is_ok());

        let long_label = Ext4Options {
            label: "a-label-that-is-too-long".to_string(),
            ..Ext4Options::default()
        };
        assert!(long_label.validate().is_err());

        let reserved = Ext4Options {
            reserved_percent: 60,
            ..Ext4Options::default()
        };
        assert!(reserved.validate().is_err());

        for bad in ["", "M", "5x", "-1M"] {
            let size = Ext4Options {
                size: bad.to_string(),
                ..Ext4Options::default()
            };
            assert!(size.validate().is_err(), "{bad} should be rejected");
        }
        let plain = Ext4Options {
            size: "524288".to_string(),
            ..Ext4Options::default()
        };
        assert!(plain.validate().is_ok());
    }
}
