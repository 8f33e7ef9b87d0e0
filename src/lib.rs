//! initramfs-builder - minimal initramfs construction
//!
//! Stages a set of executables, shared libraries and an init program into
//! a temporary root tree and packs it as a newc cpio archive (optionally
//! gzip-compressed) or formats it into an ext4 image.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Manifest, serialization and build pipeline
//! - [`infra`] - Infrastructure layer (filesystem, staging, processes)
//! - [`config`] - Constants and fixed image layout
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
