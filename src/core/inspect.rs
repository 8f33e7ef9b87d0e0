//! newc cpio reader
//!
//! Decodes archives produced by [`crate::core::cpio`] (or any newc writer)
//! for listing and verification.

use std::path::Path;

use serde::Serialize;

use crate::core::cpio::{
    padlen, NewcHeader, NEWC_HDR_LEN, NEWC_MAGIC, S_IFCHR, S_IFDIR, S_IFMT, S_IFREG, TRAILER_NAME,
};
use crate::error::{InitramfsError, InspectError};
use crate::infra::tools::{self, Tool};

/// gzip stream magic
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A decoded archive entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    pub ino: u32,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub mtime: u32,
    pub filesize: u32,
    pub rdev_major: u32,
    pub rdev_minor: u32,
    pub namesize: u32,
    pub name: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl ArchiveEntry {
    fn new(header: &NewcHeader, name: String, data: Vec<u8>) -> Self {
        Self {
            ino: header.ino,
            mode: header.mode,
            uid: header.uid,
            gid: header.gid,
            nlink: header.nlink,
            mtime: header.mtime,
            filesize: header.filesize,
            rdev_major: header.rdev_major,
            rdev_minor: header.rdev_minor,
            namesize: header.namesize,
            name,
            data,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    pub fn is_file(&self) -> bool {
        self.mode & S_IFMT == S_IFREG
    }

    pub fn is_char_device(&self) -> bool {
        self.mode & S_IFMT == S_IFCHR
    }

    pub fn is_trailer(&self) -> bool {
        self.name == TRAILER_NAME
    }

    /// Permission bits without the file type
    pub fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }

    /// `ls -l` style type and permission string
    pub fn mode_string(&self) -> String {
        let kind = match self.mode & S_IFMT {
            S_IFDIR => 'd',
            S_IFCHR => 'c',
            S_IFREG => '-',
            _ => '?',
        };
        let mut out = String::with_capacity(10);
        out.push(kind);
        for shift in [6, 3, 0] {
            let bits = (self.mode >> shift) & 0o7;
            out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
            out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
            out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
        }
        out
    }
}

/// Decode every entry up to and including the trailer
pub fn read_archive(bytes: &[u8]) -> Result<Vec<ArchiveEntry>, InspectError> {
    let mut entries = Vec::new();
    let mut off = 0usize;

    loop {
        if off >= bytes.len() {
            return Err(InspectError::MissingTrailer);
        }
        let header = parse_header(bytes, off)?;
        let name_start = off + NEWC_HDR_LEN;
        let name_end = name_start + header.namesize as usize;
        let raw_name = bytes
            .get(name_start..name_end)
            .ok_or(InspectError::Truncated { offset: name_start })?;
        let name = match raw_name.split_last() {
            Some((&0, name)) => std::str::from_utf8(name)
                .map_err(|_| InspectError::BadName { offset: name_start })?
                .trim_end_matches('\0')
                .to_string(),
            _ => return Err(InspectError::BadName { offset: name_start }),
        };

        let data_start = name_end + padlen(name_end as u64, 4) as usize;
        let data_end = data_start + header.filesize as usize;
        let data = bytes
            .get(data_start..data_end)
            .ok_or(InspectError::Truncated { offset: data_start })?
            .to_vec();
        off = data_end + padlen(data_end as u64, 4) as usize;

        let entry = ArchiveEntry::new(&header, name, data);
        let done = entry.is_trailer();
        entries.push(entry);
        if done {
            return Ok(entries);
        }
    }
}

/// Read an archive file, decompressing it if needed, and decode it
pub fn load_archive(path: &Path) -> Result<Vec<ArchiveEntry>, InitramfsError> {
    let bytes = std::fs::read(path).map_err(|source| InitramfsError::Io { source })?;
    let bytes = decompress_if_needed(bytes)?;
    Ok(read_archive(&bytes)?)
}

/// Decompress gzip input through the external tool; pass cpio through
pub fn decompress_if_needed(bytes: Vec<u8>) -> Result<Vec<u8>, InspectError> {
    if bytes.starts_with(&GZIP_MAGIC) {
        tracing::debug!("Input is gzip compressed, decompressing");
        Ok(tools::run_tool(Tool::Gzip, &["-dc"], Some(bytes.as_slice()))?)
    } else {
        Ok(bytes)
    }
}

fn parse_header(bytes: &[u8], off: usize) -> Result<NewcHeader, InspectError> {
    let raw = bytes
        .get(off..off + NEWC_HDR_LEN)
        .ok_or(InspectError::Truncated { offset: off })?;
    if &raw[..6] != NEWC_MAGIC.as_bytes() {
        return Err(InspectError::BadMagic {
            offset: off,
            found: String::from_utf8_lossy(&raw[..6]).into_owned(),
        });
    }

    let field = |idx: usize, name: &'static str| -> Result<u32, InspectError> {
        let start = 6 + idx * 8;
        let text = &raw[start..start + 8];
        std::str::from_utf8(text)
            .ok()
            .and_then(|s| u32::from_str_radix(s, 16).ok())
            .ok_or_else(|| InspectError::BadField {
                offset: off + start,
                field: name,
                value: String::from_utf8_lossy(text).into_owned(),
            })
    };

    Ok(NewcHeader {
        ino: field(0, "ino")?,
        mode: field(1, "mode")?,
        uid: field(2, "uid")?,
        gid: field(3, "gid")?,
        nlink: field(4, "nlink")?,
        mtime: field(5, "mtime")?,
        filesize: field(6, "filesize")?,
        dev_major: field(7, "devmajor")?,
        dev_minor: field(8, "devminor")?,
        rdev_major: field(9, "rdevmajor")?,
        rdev_minor: field(10, "rdevminor")?,
        namesize: field(11, "namesize")?,
        check: field(12, "check")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hand-assembled archive: one file "a" containing "xy", then the trailer
    fn tiny_archive() -> Vec<u8> {
        let mut out = Vec::new();
        NewcHeader {
            ino: 1,
            mode: S_IFREG | 0o644,
            nlink: 1,
            filesize: 2,
            namesize: 2,
            ..NewcHeader::default()
        }
        .write_to(&mut out)
        .unwrap();
        out.extend_from_slice(b"a\0");
        out.extend_from_slice(b"xy\0\0");
        NewcHeader {
            nlink: 1,
            namesize: 11,
            ..NewcHeader::default()
        }
        .write_to(&mut out)
        .unwrap();
        out.extend_from_slice(b"TRAILER!!!\0\0\0\0");
        out
    }

    #[test]
    fn test_read_tiny_archive() {
        let entries = read_archive(&tiny_archive()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a");
        assert_eq!(entries[0].data, b"xy");
        assert!(entries[0].is_file());
        assert_eq!(entries[0].permissions(), 0o644);
        assert_eq!(entries[0].mode_string(), "-rw-r--r--");
        assert!(entries[1].is_trailer());
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = tiny_archive();
        bytes[5] = b'7';
        assert!(matches!(
            read_archive(&bytes),
            Err(InspectError::BadMagic { offset: 0, .. })
        ));
    }

    #[test]
    fn test_bad_field() {
        let mut bytes = tiny_archive();
        bytes[6] = b'G';
        assert!(matches!(
            read_archive(&bytes),
            Err(InspectError::BadField { field: "ino", .. })
        ));
    }

    #[test]
    fn test_truncated() {
        let bytes = tiny_archive();
        assert!(matches!(
            read_archive(&bytes[..113]),
            Err(InspectError::Truncated { .. })
        ));
    }

    #[test]
    fn test_missing_trailer() {
        let bytes = tiny_archive();
        assert!(matches!(
            read_archive(&bytes[..116]),
            Err(InspectError::MissingTrailer)
        ));
    }

    #[test]
    fn test_plain_input_passes_through() {
        let bytes = tiny_archive();
        assert_eq!(decompress_if_needed(bytes.clone()).unwrap(), bytes);
    }

    #[test]
    fn test_mode_string_directory() {
        let entry = ArchiveEntry::new(
            &NewcHeader {
                mode: S_IFDIR | 0o755,
                ..NewcHeader::default()
            },
            "./bin".to_string(),
            Vec::new(),
        );
        assert!(entry.is_dir());
        assert_eq!(entry.mode_string(), "drwxr-xr-x");
    }

    #[test]
    fn test_load_archive() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tiny.cpio");
        std::fs::write(&path, tiny_archive()).unwrap();
        assert_eq!(load_archive(&path).unwrap().len(), 2);

        let missing = load_archive(&dir.path().join("missing.cpio")).unwrap_err();
        assert!(matches!(missing, InitramfsError::Io { .. }));
    }
}
