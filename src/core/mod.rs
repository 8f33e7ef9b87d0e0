//! Core business logic module
//!
//! # Submodules
//!
//! - [`manifest`] - Resolving inputs into ordered image entries
//! - [`format`] - Output format selection
//! - [`cpio`] - newc archive encoder
//! - [`inspect`] - newc archive reader
//! - [`compress`] - gzip compression of the archive
//! - [`image`] - ext4 image options
//! - [`config`] - `initramfs.toml` loading and CLI overrides
//! - [`pipeline`] - Build orchestration
//! - [`doctor`] - External tool checks

pub mod compress;
pub mod config;
pub mod cpio;
pub mod doctor;
pub mod format;
pub mod image;
pub mod inspect;
pub mod manifest;
pub mod pipeline;
