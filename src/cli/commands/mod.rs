//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod doctor;
pub mod list;

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;

use crate::core::format::OutputFormat;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build an initramfs from binaries, libraries and an init program
    Build {
        /// Executables to place in /bin
        #[arg(long, num_args = 1.., value_name = "PATH")]
        bins: Vec<PathBuf>,

        /// Shared libraries to place in /lib64
        #[arg(long, num_args = 1.., value_name = "PATH")]
        libs: Vec<PathBuf>,

        /// Program to place at /init
        #[arg(long, value_name = "PATH")]
        init: Option<PathBuf>,

        /// Artifact path [default: initramfs.cpio.gz]
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Artifact format (raw, gzip, ext4); inferred from the output name if omitted
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Compress the cpio archive with gzip
        #[arg(long)]
        compress: bool,

        /// Configuration file [default: ./initramfs.toml if present]
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Permission bits for libraries, in octal
        #[arg(long, value_name = "OCTAL")]
        lib_mode: Option<String>,

        /// Fixed modification time for every archive entry
        #[arg(long, value_name = "SECS")]
        mtime: Option<u32>,

        /// Reproducible-build timestamp, used when no mtime is set
        #[arg(long, env = "SOURCE_DATE_EPOCH", hide = true)]
        source_date_epoch: Option<u32>,

        /// Directory to create the staging tree in
        #[arg(long, value_name = "DIR")]
        staging_dir: Option<PathBuf>,
    },

    /// List the entries of a cpio or gzip-compressed cpio archive
    List {
        /// Archive to read
        archive: PathBuf,
    },

    /// Check that required external tools are installed
    Doctor,
}

impl Commands {
    /// Execute the command
    pub fn run(self) -> Result<()> {
        match self {
            Self::Build {
                bins,
                libs,
                init,
                output,
                format,
                compress,
                config,
                lib_mode,
                mtime,
                source_date_epoch,
                staging_dir,
            } => {
                let current_dir = std::env::current_dir()?;
                let options = build::BuildOptions {
                    bins,
                    libs,
                    init,
                    output,
                    format,
                    compress,
                    config,
                    lib_mode,
                    mtime,
                    source_date_epoch,
                    staging_dir,
                };
                build::execute(&current_dir, options)
            }
            Self::List { archive } => list::execute(&archive),
            Self::Doctor => doctor::execute(),
        }
    }
}
