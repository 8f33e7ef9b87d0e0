//! initramfs-builder CLI
//!
//! Entry point for the initramfs-builder command-line application.

use anyhow::Result;
use clap::Parser;

use initramfs_builder::cli::output::{display_error, OutputSettings};
use initramfs_builder::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let output_settings = OutputSettings::new(cli.quiet, cli.json, cli.verbose);

    // RUST_LOG wins over -v
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(output_settings.log_level().into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    output_settings.apply_global();

    match cli.run() {
        Ok(()) => Ok(()),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
