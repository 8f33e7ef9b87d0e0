//! List command implementation
//!
//! Implements `initramfs-builder list` to show the contents of an archive.

use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::output::{is_json, print_info};
use crate::core::inspect::load_archive;

/// Execute the list command
pub fn execute(archive: &Path) -> Result<()> {
    let entries = load_archive(archive)
        .with_context(|| format!("Failed to list {}", archive.display()))?;
    let entries: Vec<_> = entries.into_iter().filter(|e| !e.is_trailer()).collect();

    if is_json() {
        let json_result = serde_json::json!({
            "archive": archive,
            "entries": entries,
        });
        println!("{}", serde_json::to_string_pretty(&json_result)?);
        return Ok(());
    }

    for entry in &entries {
        let size = if entry.is_char_device() {
            format!("{}, {}", entry.rdev_major, entry.rdev_minor)
        } else {
            entry.filesize.to_string()
        };
        println!("{} {:>10} {}", entry.mode_string(), size, entry.name);
    }
    print_info(&format!("{} entries", entries.len()));

    Ok(())
}
