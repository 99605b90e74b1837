//! Binary layout of the persisted build cache.
//!
//! ```text
//! magic      4 bytes  "LSMC"
//! version    u32      FORMAT_VERSION
//! skeleton   16 bytes fingerprint of the skeleton template
//! pages      u32 count, then count × string
//! resources  u32 count, then count × record
//!
//! record     string path, 16-byte fingerprint, u32 count, count × string page
//! string     u32 byte length, then UTF-8 bytes
//! ```
//!
//! All integers are little-endian. [`encode`] and [`decode`] are symmetric;
//! anything [`decode`] cannot read comes back as a [`FormatError`], which the
//! checker treats as "no usable cache" rather than a failure.

use super::fingerprint::{FINGERPRINT_LEN, Fingerprint};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

pub const MAGIC: &[u8; 4] = b"LSMC";

/// Bump to invalidate every existing cache file when the layout changes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormatError {
    #[error("not a build cache file (bad magic tag)")]
    BadMagic,
    #[error("unsupported cache format version {0}")]
    UnsupportedVersion(u32),
    #[error("cache file truncated at byte {0}")]
    Truncated(usize),
    #[error("cache file contains a non UTF-8 path at byte {0}")]
    InvalidUtf8(usize),
    #[error("cache file has {0} unexpected trailing bytes")]
    TrailingBytes(usize),
}

/// One tracked input resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub fingerprint: Fingerprint,
    /// Output pages rendered using this resource.
    pub dependent_pages: BTreeSet<String>,
}

/// Everything the checker persists between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub skeleton: Fingerprint,
    pub registered_pages: BTreeSet<String>,
    pub resources: BTreeMap<String, ResourceEntry>,
}

pub fn encode(snapshot: &Snapshot) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(snapshot.skeleton.as_bytes());

    write_u32(&mut out, snapshot.registered_pages.len());
    for page in &snapshot.registered_pages {
        write_str(&mut out, page);
    }

    write_u32(&mut out, snapshot.resources.len());
    for (path, entry) in &snapshot.resources {
        write_str(&mut out, path);
        out.extend_from_slice(entry.fingerprint.as_bytes());
        write_u32(&mut out, entry.dependent_pages.len());
        for page in &entry.dependent_pages {
            write_str(&mut out, page);
        }
    }
    out
}

pub fn decode(bytes: &[u8]) -> Result<Snapshot, FormatError> {
    let mut reader = Reader { bytes, pos: 0 };

    if reader.take(MAGIC.len()).map_err(|_| FormatError::BadMagic)? != MAGIC {
        return Err(FormatError::BadMagic);
    }
    let version = reader.u32()?;
    if version != FORMAT_VERSION {
        return Err(FormatError::UnsupportedVersion(version));
    }
    let skeleton = reader.fingerprint()?;

    let page_count = reader.u32()?;
    let mut registered_pages = BTreeSet::new();
    for _ in 0..page_count {
        registered_pages.insert(reader.string()?);
    }

    let resource_count = reader.u32()?;
    let mut resources = BTreeMap::new();
    for _ in 0..resource_count {
        let path = reader.string()?;
        let fingerprint = reader.fingerprint()?;
        let dependent_count = reader.u32()?;
        let mut dependent_pages = BTreeSet::new();
        for _ in 0..dependent_count {
            dependent_pages.insert(reader.string()?);
        }
        resources.insert(
            path,
            ResourceEntry {
                fingerprint,
                dependent_pages,
            },
        );
    }

    let remaining = bytes.len() - reader.pos;
    if remaining > 0 {
        return Err(FormatError::TrailingBytes(remaining));
    }

    Ok(Snapshot {
        skeleton,
        registered_pages,
        resources,
    })
}

fn write_u32(out: &mut Vec<u8>, value: usize) {
    // Collections larger than u32::MAX entries cannot be built from a file tree.
    out.extend_from_slice(&(value as u32).to_le_bytes());
}

fn write_str(out: &mut Vec<u8>, value: &str) {
    write_u32(out, value.len());
    out.extend_from_slice(value.as_bytes());
}

/// Bounds-checked cursor over the encoded bytes.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], FormatError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(FormatError::Truncated(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, FormatError> {
        let raw = self.take(4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn fingerprint(&mut self) -> Result<Fingerprint, FormatError> {
        let raw = self.take(FINGERPRINT_LEN)?;
        let mut bytes = [0u8; FINGERPRINT_LEN];
        bytes.copy_from_slice(raw);
        Ok(Fingerprint::from_bytes(bytes))
    }

    fn string(&mut self) -> Result<String, FormatError> {
        let len = self.u32()? as usize;
        let start = self.pos;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| FormatError::InvalidUtf8(start))
    }
}
