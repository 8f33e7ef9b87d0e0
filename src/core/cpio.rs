//! newc cpio serializer
//!
//! Writes the staged tree as an SVR4 "new ASCII" cpio stream, the format
//! the Linux kernel unpacks for initramfs images. Entries are emitted in
//! manifest order, never sorted.
//!
//! Layout of one entry:
//!
//! ```text
//! 070701 + 13 x %08X fields   110 bytes
//! name + NUL                  padded so header+name ends 4-byte aligned
//! data                        padded to a 4-byte boundary
//! ```

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};

use crate::config::layout::{DEVICE_NODE_MAJOR, DEVICE_NODE_MINOR};
use crate::core::manifest::{EntryKind, Manifest, ManifestEntry};
use crate::error::BuildError;
use crate::infra::staging::StagingTree;

macro_rules! newc_hdr_fmt {
    () => {
        concat!(
            "{magic}{ino:08X}{mode:08X}{uid:08X}{gid:08X}{nlink:08X}",
            "{mtime:08X}{filesize:08X}{major:08X}{minor:08X}{rmajor:08X}",
            "{rminor:08X}{namesize:08X}{chksum:08X}"
        )
    };
}

/// newc magic
pub const NEWC_MAGIC: &str = "070701";
/// Fixed header length
pub const NEWC_HDR_LEN: usize = 110;
/// Name of the end-of-archive entry
pub const TRAILER_NAME: &str = "TRAILER!!!";
/// The kernel ignores entries whose namesize exceeds this
pub const PATH_MAX: usize = 4096;

// format: octal posix mode bits
pub const S_IFMT: u32 = 0o170_000;
pub const S_IFDIR: u32 = 0o040_000;
pub const S_IFCHR: u32 = 0o020_000;
pub const S_IFREG: u32 = 0o100_000;

/// Host device the device node entry describes
const HOST_DEVICE: &str = "/dev/urandom";

/// Header field policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// First inode number; increments per entry
    pub initial_ino: u32,
    /// mtime for every entry instead of the staged file's
    pub fixed_mtime: Option<u32>,
    /// Owner for every entry instead of the staged file's
    pub fixed_uid: Option<u32>,
    /// Group for every entry instead of the staged file's
    pub fixed_gid: Option<u32>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            initial_ino: 0,
            fixed_mtime: None,
            fixed_uid: Some(0),
            fixed_gid: Some(0),
        }
    }
}

/// One decoded or to-be-encoded header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NewcHeader {
    pub ino: u32,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub mtime: u32,
    pub filesize: u32,
    pub dev_major: u32,
    pub dev_minor: u32,
    pub rdev_major: u32,
    pub rdev_minor: u32,
    pub namesize: u32,
    pub check: u32,
}

impl NewcHeader {
    /// Write the 110-byte ASCII header
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        write!(
            writer,
            newc_hdr_fmt!(),
            magic = NEWC_MAGIC,
            ino = self.ino,
            mode = self.mode,
            uid = self.uid,
            gid = self.gid,
            nlink = self.nlink,
            mtime = self.mtime,
            filesize = self.filesize,
            major = self.dev_major,
            minor = self.dev_minor,
            rmajor = self.rdev_major,
            rminor = self.rdev_minor,
            namesize = self.namesize,
            chksum = self.check
        )
    }
}

/// Result of serializing a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Entries written, including the trailer
    pub entries: usize,
    /// Total stream length in bytes
    pub bytes: u64,
}

/// Number of zero bytes needed to align `off` to `alignment`
pub fn padlen(off: u64, alignment: u64) -> u64 {
    (alignment - (off & (alignment - 1))) % alignment
}

/// Serialize `manifest` from `tree` into `writer`
pub fn serialize<W: Write>(
    tree: &StagingTree,
    manifest: &Manifest,
    options: &ArchiveOptions,
    writer: W,
) -> Result<ArchiveSummary, BuildError> {
    let mut archive = NewcWriter::new(writer, options);
    for entry in manifest {
        archive.append(tree, entry)?;
    }
    archive.finish()
}

/// Serialize into an in-memory buffer
pub fn to_bytes(
    tree: &StagingTree,
    manifest: &Manifest,
    options: &ArchiveOptions,
) -> Result<Vec<u8>, BuildError> {
    let mut buf = Vec::new();
    let summary = serialize(tree, manifest, options, &mut buf)?;
    tracing::debug!(
        "Serialized {} cpio entries ({} bytes)",
        summary.entries,
        summary.bytes
    );
    Ok(buf)
}

/// Streaming newc encoder
struct NewcWriter<'a, W: Write> {
    writer: W,
    options: &'a ArchiveOptions,
    off: u64,
    ino: u32,
    entries: usize,
}

impl<'a, W: Write> NewcWriter<'a, W> {
    fn new(writer: W, options: &'a ArchiveOptions) -> Self {
        Self {
            writer,
            options,
            off: 0,
            ino: options.initial_ino,
            entries: 0,
        }
    }

    fn append(&mut self, tree: &StagingTree, entry: &ManifestEntry) -> Result<(), BuildError> {
        let name = entry.dest_path.as_str();
        let namesize = fit(name, "namesize", name.len() as u64 + 1)?;
        if namesize as usize > PATH_MAX {
            return Err(overflow(name, "namesize", u64::from(namesize)));
        }

        match entry.kind {
            EntryKind::DeviceNode => {
                let (rdev_major, rdev_minor) = host_device_numbers(Path::new(HOST_DEVICE));
                let header = NewcHeader {
                    mode: S_IFCHR | entry.mode,
                    uid: self.options.fixed_uid.unwrap_or(0),
                    gid: self.options.fixed_gid.unwrap_or(0),
                    nlink: 1,
                    mtime: self.options.fixed_mtime.unwrap_or(0),
                    rdev_major,
                    rdev_minor,
                    namesize,
                    ..NewcHeader::default()
                };
                self.write_header(header, name)
            }
            EntryKind::Directory => {
                let path = tree.path_of(entry);
                let md = stat(&path)?;
                let header = NewcHeader {
                    mode: md.mode(),
                    nlink: 2,
                    namesize,
                    ..self.owned_header(name, &md)?
                };
                self.write_header(header, name)
            }
            EntryKind::RegularFile => {
                let path = tree.path_of(entry);
                let md = stat(&path)?;
                let filesize = fit(name, "filesize", md.len())?;
                let header = NewcHeader {
                    mode: md.mode(),
                    nlink: 1,
                    filesize,
                    namesize,
                    ..self.owned_header(name, &md)?
                };
                let mut file = File::open(&path).map_err(|e| read_err(&path, &e))?;
                self.write_header(header, name)?;
                self.write_data(&path, &mut file, u64::from(filesize))
            }
        }
    }

    /// uid, gid and mtime from the staged file unless overridden
    fn owned_header(&self, name: &str, md: &fs::Metadata) -> Result<NewcHeader, BuildError> {
        let mtime = match self.options.fixed_mtime {
            Some(t) => t,
            // negative or past 2106
            None => u32::try_from(md.mtime())
                .map_err(|_| overflow(name, "mtime", md.mtime().unsigned_abs()))?,
        };
        Ok(NewcHeader {
            uid: self.options.fixed_uid.unwrap_or_else(|| md.uid()),
            gid: self.options.fixed_gid.unwrap_or_else(|| md.gid()),
            mtime,
            ..NewcHeader::default()
        })
    }

    fn write_header(&mut self, mut header: NewcHeader, name: &str) -> Result<(), BuildError> {
        header.ino = self.ino;
        self.ino = self.ino.wrapping_add(1);
        self.emit_header(&header, name)
    }

    fn emit_header(&mut self, header: &NewcHeader, name: &str) -> Result<(), BuildError> {
        header.write_to(&mut self.writer).map_err(write_err)?;
        self.off += NEWC_HDR_LEN as u64;

        self.writer.write_all(name.as_bytes()).map_err(write_err)?;
        self.off += name.len() as u64;

        // NUL terminator plus alignment
        let pad = 1 + padlen(self.off + 1, 4);
        self.write_zeros(pad)?;
        self.entries += 1;
        Ok(())
    }

    fn write_data(&mut self, path: &Path, file: &mut File, len: u64) -> Result<(), BuildError> {
        if len == 0 {
            return Ok(());
        }
        let mut buf = [0u8; 8192];
        let mut copied = 0u64;
        loop {
            let n = match file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(read_err(path, &e)),
            };
            self.writer.write_all(&buf[..n]).map_err(write_err)?;
            copied += n as u64;
        }
        if copied != len {
            return Err(BuildError::StagingIo {
                path: path.to_path_buf(),
                action: "read",
                error: format!("copied {copied} bytes, expected {len}"),
            });
        }
        self.off += len;
        self.write_zeros(padlen(self.off, 4))
    }

    fn write_zeros(&mut self, n: u64) -> Result<(), BuildError> {
        const ZEROS: [u8; 4] = [0; 4];
        let mut left = n;
        while left > 0 {
            let chunk = left.min(ZEROS.len() as u64);
            #[allow(clippy::cast_possible_truncation)]
            self.writer
                .write_all(&ZEROS[..chunk as usize])
                .map_err(write_err)?;
            left -= chunk;
        }
        self.off += n;
        Ok(())
    }

    fn finish(mut self) -> Result<ArchiveSummary, BuildError> {
        let trailer = NewcHeader {
            nlink: 1,
            namesize: TRAILER_NAME.len() as u32 + 1,
            ..NewcHeader::default()
        };
        self.emit_header(&trailer, TRAILER_NAME)?;
        self.writer.flush().map_err(write_err)?;
        Ok(ArchiveSummary {
            entries: self.entries,
            bytes: self.off,
        })
    }
}

/// Major and minor numbers of the host device at `path`
///
/// Falls back to the well-known `/dev/urandom` numbers when the host node
/// is missing or is not a character device.
fn host_device_numbers(path: &Path) -> (u32, u32) {
    match fs::metadata(path) {
        Ok(md) if md.file_type().is_char_device() => {
            // glibc dev_t: MMMM Mmmm mmmM MMmm
            let rd = md.rdev();
            #[allow(clippy::cast_possible_truncation)]
            let major = (((rd >> 32) & 0xffff_f000) | ((rd >> 8) & 0x0000_0fff)) as u32;
            #[allow(clippy::cast_possible_truncation)]
            let minor = (((rd >> 12) & 0xffff_ff00) | (rd & 0x0000_00ff)) as u32;
            (major, minor)
        }
        _ => (DEVICE_NODE_MAJOR, DEVICE_NODE_MINOR),
    }
}

fn stat(path: &Path) -> Result<fs::Metadata, BuildError> {
    fs::symlink_metadata(path).map_err(|e| read_err(path, &e))
}

fn fit(name: &str, field: &'static str, value: u64) -> Result<u32, BuildError> {
    u32::try_from(value).map_err(|_| overflow(name, field, value))
}

fn overflow(name: &str, field: &'static str, value: u64) -> BuildError {
    BuildError::SerializationOverflow {
        path: name.to_string(),
        field,
        value,
    }
}

fn read_err(path: &Path, e: &io::Error) -> BuildError {
    BuildError::StagingIo {
        path: path.to_path_buf(),
        action: "read",
        error: e.to_string(),
    }
}

#[allow(clippy::needless_pass_by_value)]
fn write_err(e: io::Error) -> BuildError {
    BuildError::ArtifactIo {
        path: PathBuf::from("<cpio stream>"),
        error: e.to_string(),
    }
}
