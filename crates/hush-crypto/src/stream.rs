//! AES-256-CFB streaming transforms.
//!
//! Message parts are too large to hold in memory twice, so they are encrypted
//! with a self-synchronising stream mode behind `Read`/`Write` adaptors. CFB
//! gives no integrity; parts are authenticated separately by checksums
//! carried in the encrypted catalog.

use std::io::{self, Read, Write};

use aes::Aes256;
use cfb_mode::cipher::KeyIvInit;
use cfb_mode::{BufDecryptor, BufEncryptor};
use rand_core::{CryptoRng, RngCore};
use zeroize::ZeroizeOnDrop;

use crate::CryptoError;
use crate::random::fill_random;

/// AES-256 key size.
pub const KEY_SIZE: usize = 32;

/// CFB IV size (one AES block).
pub const IV_SIZE: usize = 16;

/// Buffer size used by the reader adaptors.
const CHUNK_SIZE: usize = 8 * 1024;

/// Key and IV for one stream.
#[derive(Clone, ZeroizeOnDrop)]
pub struct StreamKey {
    key: [u8; KEY_SIZE],
    iv: [u8; IV_SIZE],
}

impl StreamKey {
    /// Create from raw parts.
    #[must_use]
    pub fn new(key: [u8; KEY_SIZE], iv: [u8; IV_SIZE]) -> Self {
        Self { key, iv }
    }

    /// Create from slices, validating both lengths.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] or [`CryptoError::InvalidIvLength`].
    pub fn from_slices(key: &[u8], iv: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_SIZE] = key.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: key.len(),
        })?;
        let iv: [u8; IV_SIZE] = iv.try_into().map_err(|_| CryptoError::InvalidIvLength {
            expected: IV_SIZE,
            actual: iv.len(),
        })?;
        Ok(Self { key, iv })
    }

    /// Draw a fresh key and IV.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EntropySourceFailure`] if the source fails.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, CryptoError> {
        let mut key = Self::new([0u8; KEY_SIZE], [0u8; IV_SIZE]);
        fill_random(rng, &mut key.key)?;
        fill_random(rng, &mut key.iv)?;
        Ok(key)
    }

    /// Raw key bytes.
    #[must_use]
    pub fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    /// Raw IV bytes.
    #[must_use]
    pub fn iv(&self) -> &[u8; IV_SIZE] {
        &self.iv
    }

    fn encryptor(&self) -> BufEncryptor<Aes256> {
        BufEncryptor::new((&self.key).into(), (&self.iv).into())
    }

    fn decryptor(&self) -> BufDecryptor<Aes256> {
        BufDecryptor::new((&self.key).into(), (&self.iv).into())
    }

    /// Encrypt a whole buffer.
    #[must_use]
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut out = plaintext.to_vec();
        self.encryptor().encrypt(&mut out);
        out
    }

    /// Decrypt a whole buffer.
    #[must_use]
    pub fn decrypt(&self, ciphertext: &[u8]) -> Vec<u8> {
        let mut out = ciphertext.to_vec();
        self.decryptor().decrypt(&mut out);
        out
    }
}

impl std::fmt::Debug for StreamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StreamKey([REDACTED])")
    }
}

/// Writer that encrypts everything written through it.
pub struct EncryptWriter<W: Write> {
    inner: W,
    cipher: BufEncryptor<Aes256>,
    buf: Vec<u8>,
}

impl<W: Write> EncryptWriter<W> {
    /// Wrap `inner`.
    pub fn new(key: &StreamKey, inner: W) -> Self {
        Self {
            inner,
            cipher: key.encryptor(),
            buf: Vec::new(),
        }
    }

    /// Flush and return the inner writer.
    ///
    /// # Errors
    ///
    /// Returns any error from flushing the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for EncryptWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        // The keystream must advance only over bytes the inner writer accepted.
        self.buf.clear();
        self.buf.extend_from_slice(data);
        self.cipher.encrypt(&mut self.buf);
        self.inner.write_all(&self.buf)?;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Reader that yields the encryption of its inner reader.
pub struct EncryptReader<R: Read> {
    inner: R,
    cipher: BufEncryptor<Aes256>,
}

impl<R: Read> EncryptReader<R> {
    /// Wrap `inner`.
    pub fn new(key: &StreamKey, inner: R) -> Self {
        Self {
            inner,
            cipher: key.encryptor(),
        }
    }
}

impl<R: Read> Read for EncryptReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let len = out.len().min(CHUNK_SIZE);
        let n = self.inner.read(&mut out[..len])?;
        self.cipher.encrypt(&mut out[..n]);
        Ok(n)
    }
}

/// Reader that yields the decryption of its inner reader.
pub struct DecryptReader<R: Read> {
    inner: R,
    cipher: BufDecryptor<Aes256>,
}

impl<R: Read> DecryptReader<R> {
    /// Wrap `inner`.
    pub fn new(key: &StreamKey, inner: R) -> Self {
        Self {
            inner,
            cipher: key.decryptor(),
        }
    }

    /// Return the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for DecryptReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let len = out.len().min(CHUNK_SIZE);
        let n = self.inner.read(&mut out[..len])?;
        self.cipher.decrypt(&mut out[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn key() -> StreamKey {
        StreamKey::generate(&mut StdRng::seed_from_u64(0xcfb)).unwrap()
    }

    #[test]
    fn test_buffer_roundtrip() {
        let key = key();
        let ciphertext = key.encrypt(b"attack at dawn");
        assert_eq!(ciphertext.len(), 14);
        assert_ne!(ciphertext, b"attack at dawn");
        assert_eq!(key.decrypt(&ciphertext), b"attack at dawn");
    }

    #[test]
    fn test_writer_matches_buffer_with_odd_chunks() {
        let key = key();
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 7 % 251) as u8).collect();

        let mut writer = EncryptWriter::new(&key, Vec::new());
        for chunk in data.chunks(37) {
            writer.write_all(chunk).unwrap();
        }
        let streamed = writer.finish().unwrap();

        assert_eq!(streamed, key.encrypt(&data));
    }

    #[test]
    fn test_reader_roundtrip() {
        let key = key();
        let data = vec![0x5au8; 20_000];

        let mut ciphertext = Vec::new();
        EncryptReader::new(&key, &data[..])
            .read_to_end(&mut ciphertext)
            .unwrap();
        assert_eq!(ciphertext, key.encrypt(&data));

        let mut plaintext = Vec::new();
        DecryptReader::new(&key, &ciphertext[..])
            .read_to_end(&mut plaintext)
            .unwrap();
        assert_eq!(plaintext, data);
    }

    #[test]
    fn test_empty_stream() {
        let key = key();
        let mut out = Vec::new();
        DecryptReader::new(&key, &[][..]).read_to_end(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_wrong_iv_length() {
        assert!(matches!(
            StreamKey::from_slices(&[0u8; 32], &[0u8; 12]),
            Err(CryptoError::InvalidIvLength {
                expected: 16,
                actual: 12
            })
        ));
        assert!(matches!(
            StreamKey::from_slices(&[0u8; 16], &[0u8; 16]),
            Err(CryptoError::InvalidKeyLength { .. })
        ));
    }

    #[test]
    fn test_wrong_key_garbles() {
        let key = key();
        let other = StreamKey::new([9u8; 32], *key.iv());
        let ciphertext = key.encrypt(b"plaintext bytes");
        assert_ne!(other.decrypt(&ciphertext), b"plaintext bytes");
    }
}
