//! Target root filesystem layout

/// Staged directory for executables
pub const BIN_DIR: &str = "./bin";

/// Staged directory for shared libraries
pub const LIB_DIR: &str = "./lib64";

/// Destination of the init program
pub const INIT_PATH: &str = "./init";

/// Implicit device node reference
pub const DEVICE_NODE_PATH: &str = "./dev/urandom";

/// Device numbers of `/dev/urandom` on Linux
pub const DEVICE_NODE_MAJOR: u32 = 1;
pub const DEVICE_NODE_MINOR: u32 = 9;
