//! Content fingerprints.
//!
//! A [`Fingerprint`] is the first 16 bytes of the SHA-256 digest of some
//! content. Content-based rather than mtime-based so it survives
//! `git checkout` and copies that reset modification times.

use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::Path;

/// Width of a fingerprint in bytes.
pub const FINGERPRINT_LEN: usize = 16;

/// Fixed-width digest of a resource's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Fingerprint arbitrary bytes.
    pub fn of(content: impl AsRef<[u8]>) -> Self {
        let digest = Sha256::digest(content.as_ref());
        let mut bytes = [0u8; FINGERPRINT_LEN];
        bytes.copy_from_slice(&digest[..FINGERPRINT_LEN]);
        Self(bytes)
    }

    /// Fingerprint the current contents of a file.
    pub fn of_file(path: &Path) -> io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::of(bytes))
    }

    pub fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn fingerprint_deterministic() {
        assert_eq!(Fingerprint::of("hello"), Fingerprint::of("hello"));
    }

    #[test]
    fn fingerprint_changes_with_content() {
        assert_ne!(Fingerprint::of("version 1"), Fingerprint::of("version 2"));
    }

    #[test]
    fn fingerprint_is_sha256_prefix() {
        // SHA-256("abc") = ba7816bf8f01cfea414140de5dae2223...
        let fp = Fingerprint::of("abc");
        assert_eq!(fp.to_string(), "ba7816bf8f01cfea414140de5dae2223");
        assert_eq!(fp.to_string().len(), FINGERPRINT_LEN * 2);
    }

    #[test]
    fn text_and_bytes_agree() {
        assert_eq!(Fingerprint::of("zażółć"), Fingerprint::of("zażółć".as_bytes()));
    }

    #[test]
    fn of_file_matches_of_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.json");
        fs::write(&path, br#"{"title":"Hi"}"#).unwrap();
        assert_eq!(
            Fingerprint::of_file(&path).unwrap(),
            Fingerprint::of(br#"{"title":"Hi"}"#)
        );
    }

    #[test]
    fn of_file_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = Fingerprint::of_file(&tmp.path().join("gone")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
