//! Error types for initramfs-builder
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Build pipeline errors
///
/// Every variant except [`BuildError::CleanupWarning`] aborts the build.
#[derive(Error, Debug)]
pub enum BuildError {
    /// A listed source path does not exist or is unreadable
    #[error("Input not found: '{path}': {reason}")]
    InputNotFound { path: PathBuf, reason: String },

    /// A listed source path cannot be used as an input
    #[error("Invalid input '{path}': {reason}")]
    InvalidInput { path: PathBuf, reason: String },

    /// Two inputs resolve to the same destination
    #[error("Duplicate destination '{dest}': '{first}' and '{second}' share a basename")]
    DuplicateDestination {
        dest: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Copy, chmod or mkdir failure while materializing the staging tree
    #[error("Staging failed to {action} '{path}': {error}")]
    StagingIo {
        path: PathBuf,
        action: &'static str,
        error: String,
    },

    /// A value does not fit its newc header field
    #[error("Cannot archive '{path}': {field} {value} does not fit the newc header")]
    SerializationOverflow {
        path: String,
        field: &'static str,
        value: u64,
    },

    /// Output options rejected before any work starts
    #[error("Invalid build options: {0}")]
    InvalidOptions(#[source] ConfigError),

    /// External tool could not be launched or exited non-zero
    #[error("External tool '{tool}' failed: {reason}")]
    ExternalToolFailure { tool: String, reason: String },

    /// Output artifact could not be written
    #[error("Failed to write artifact '{path}': {error}")]
    ArtifactIo { path: PathBuf, error: String },

    /// Staging tree removal failed (non-fatal)
    #[error("Failed to remove staging tree '{path}': {error}")]
    CleanupWarning { path: PathBuf, error: String },
}

/// Configuration file errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("Failed to read config '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Failed to parse the config file
    #[error("Failed to parse config '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Invalid permission mode string
    #[error("Invalid mode '{value}' for '{field}': expected octal permission bits (e.g. 0755)")]
    InvalidMode { field: String, value: String },

    /// Unknown output format
    #[error("Unknown output format '{value}': must be one of raw, gzip, ext4")]
    UnknownFormat { value: String },

    /// Value outside its permitted range
    #[error("Config value '{field}' is invalid: {message}")]
    InvalidValue { field: String, message: String },

    /// Required field missing from both file and command line
    #[error("Missing required setting '{field}'")]
    MissingField { field: String },
}

/// Archive decoding errors
#[derive(Error, Debug)]
pub enum InspectError {
    /// Archive ended in the middle of an entry
    #[error("Archive truncated at offset {offset}")]
    Truncated { offset: usize },

    /// Header does not start with the newc magic
    #[error("Bad magic at offset {offset}: expected 070701, found '{found}'")]
    BadMagic { offset: usize, found: String },

    /// Header field is not valid hexadecimal
    #[error("Bad {field} field at offset {offset}: '{value}'")]
    BadField {
        offset: usize,
        field: &'static str,
        value: String,
    },

    /// Entry name is not NUL terminated or not UTF-8
    #[error("Bad entry name at offset {offset}")]
    BadName { offset: usize },

    /// No trailer entry before end of input
    #[error("Archive has no TRAILER!!! entry")]
    MissingTrailer,

    /// Decompression failed
    #[error("Decompression failed: {0}")]
    Decompress(#[from] BuildError),
}

/// Top-level initramfs-builder error type
#[derive(Error, Debug)]
pub enum InitramfsError {
    /// Build error
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Config error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Inspect error
    #[error("Inspect error: {0}")]
    Inspect(#[from] InspectError),

    /// IO error
    #[error("IO error: {source}")]
    Io { source: std::io::Error },
}
