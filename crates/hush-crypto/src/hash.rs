//! SHA-256 / RIPEMD-160 hashing and checksum maps.
//!
//! Provides:
//! - One-shot digests
//! - Incremental checksumming for streamed content
//! - A `Write` adaptor that checksums bytes as they pass through
//! - Checksum maps keyed by algorithm name (`"sha256"`, `"ripemd160"`)

use std::collections::BTreeMap;
use std::io::{self, Write};

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::constant_time::ct_eq;

/// Checksum map key for SHA-256.
pub const SHA256: &str = "sha256";

/// Checksum map key for RIPEMD-160.
pub const RIPEMD160: &str = "ripemd160";

/// Algorithm name to lowercase hex digest.
pub type Checksums = BTreeMap<String, String>;

/// Compute the SHA-256 digest of `data`.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Compute the RIPEMD-160 digest of `data`.
#[must_use]
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(data).into()
}

/// Compute the standard checksum map over `data`.
#[must_use]
pub fn checksums(data: &[u8]) -> Checksums {
    let mut hasher = ChecksumHasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Verify `data` against a checksum map.
///
/// Every algorithm this crate knows must match. Unknown algorithm names are
/// skipped, but at least one known algorithm has to be present.
#[must_use]
pub fn verify_checksums(data: &[u8], expected: &Checksums) -> bool {
    let actual = checksums(data);
    let mut checked = 0;

    for (name, digest) in &actual {
        if let Some(want) = expected.get(name) {
            if !ct_eq(digest.as_bytes(), want.to_ascii_lowercase().as_bytes()) {
                return false;
            }
            checked += 1;
        }
    }

    checked > 0
}

/// Incremental SHA-256 + RIPEMD-160 hasher.
#[derive(Clone, Default)]
pub struct ChecksumHasher {
    sha256: Sha256,
    ripemd160: Ripemd160,
    total_len: u64,
}

impl ChecksumHasher {
    /// Create a new hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with more data.
    pub fn update(&mut self, data: &[u8]) {
        self.sha256.update(data);
        self.ripemd160.update(data);
        self.total_len += data.len() as u64;
    }

    /// Get total bytes hashed so far.
    #[must_use]
    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    /// Finalize into a checksum map.
    #[must_use]
    pub fn finalize(self) -> Checksums {
        let mut map = Checksums::new();
        map.insert(SHA256.to_string(), hex::encode(self.sha256.finalize()));
        map.insert(RIPEMD160.to_string(), hex::encode(self.ripemd160.finalize()));
        map
    }
}

/// Writer that checksums everything written through it.
pub struct ChecksumWriter<W: Write> {
    inner: W,
    hasher: ChecksumHasher,
}

impl<W: Write> ChecksumWriter<W> {
    /// Wrap `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: ChecksumHasher::new(),
        }
    }

    /// Bytes written so far.
    #[must_use]
    pub fn total_len(&self) -> u64 {
        self.hasher.total_len()
    }

    /// Return the inner writer and the checksums of everything written.
    pub fn finish(self) -> (W, Checksums) {
        (self.inner, self.hasher.finalize())
    }
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_ripemd160_known_vector() {
        assert_eq!(
            hex::encode(ripemd160(b"abc")),
            "8eb208f7e05d987a9b044a8e98c6b087f15a0bfc"
        );
    }

    #[test]
    fn test_checksums_has_both_algorithms() {
        let sums = checksums(b"hello world");
        assert_eq!(sums.len(), 2);
        assert_eq!(sums[SHA256], hex::encode(sha256(b"hello world")));
        assert_eq!(sums[RIPEMD160], hex::encode(ripemd160(b"hello world")));
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut hasher = ChecksumHasher::new();
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(hasher.total_len(), 11);
        assert_eq!(hasher.finalize(), checksums(b"hello world"));
    }

    #[test]
    fn test_verify_checksums() {
        let sums = checksums(b"payload");
        assert!(verify_checksums(b"payload", &sums));
        assert!(!verify_checksums(b"payloaD", &sums));
    }

    #[test]
    fn test_verify_accepts_uppercase_hex() {
        let mut sums = checksums(b"payload");
        for digest in sums.values_mut() {
            *digest = digest.to_uppercase();
        }
        assert!(verify_checksums(b"payload", &sums));
    }

    #[test]
    fn test_verify_requires_known_algorithm() {
        let mut sums = Checksums::new();
        sums.insert("md5".to_string(), "00".to_string());
        assert!(!verify_checksums(b"payload", &sums));
        assert!(!verify_checksums(b"payload", &Checksums::new()));
    }

    #[test]
    fn test_verify_one_wrong_digest_fails() {
        let mut sums = checksums(b"payload");
        sums.insert(RIPEMD160.to_string(), hex::encode([0u8; 20]));
        assert!(!verify_checksums(b"payload", &sums));
    }

    #[test]
    fn test_checksum_writer() {
        let mut writer = ChecksumWriter::new(Vec::new());
        writer.write_all(b"streamed ").unwrap();
        writer.write_all(b"bytes").unwrap();
        assert_eq!(writer.total_len(), 14);

        let (inner, sums) = writer.finish();
        assert_eq!(inner, b"streamed bytes");
        assert_eq!(sums, checksums(b"streamed bytes"));
    }
}
