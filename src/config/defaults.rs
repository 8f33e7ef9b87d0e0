//! Default configuration values

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "initramfs.toml";

/// Default output file name
pub const DEFAULT_OUTPUT: &str = "initramfs.cpio.gz";

/// Mode applied to staged executables
pub const BIN_MODE: u32 = 0o755;

/// Mode applied to staged libraries
///
/// World-writable; override with `--lib-mode` or `[modes] lib`.
pub const LIB_MODE: u32 = 0o777;

/// Mode applied to the staged init program
pub const INIT_MODE: u32 = 0o755;

/// Mode of the staged directories
pub const DIR_MODE: u32 = 0o755;

/// Permission bits of the device node reference
pub const DEVICE_MODE: u32 = 0o666;

/// Largest accepted permission value
pub const MAX_MODE: u32 = 0o7777;

/// Nominal ext4 image size
pub const EXT4_IMAGE_SIZE: &str = "500M";

/// ext4 filesystem label
pub const EXT4_LABEL: &str = "root";

/// ext4 reserved-block percentage
pub const EXT4_RESERVED_PERCENT: u8 = 5;

/// Longest label `mke2fs` accepts
pub const EXT4_LABEL_MAX: usize = 16;

/// Prefix of the per-build staging directory
pub const STAGING_PREFIX: &str = "initramfs-";
