//! AES-256-GCM authenticated encryption.
//!
//! Provides:
//! - 256-bit keys (zeroized on drop)
//! - 96-bit random nonces
//! - 128-bit authentication tags
//! - Self-contained sealed boxes: `nonce || ciphertext || tag`
//! - A JSON convenience layer for structured payloads
//!
//! ## Usage
//!
//! ```ignore
//! use hush_crypto::aead::AeadKey;
//! use rand_core::OsRng;
//!
//! let key = AeadKey::generate(&mut OsRng)?;
//! let sealed = key.seal(&mut OsRng, b"secret")?;
//! assert_eq!(&*key.open(&sealed)?, b"secret");
//! ```

use aes_gcm::Aes256Gcm;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use rand_core::{CryptoRng, RngCore};
use serde::Serialize;
use serde::de::DeserializeOwned;
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::CryptoError;
use crate::random::fill_random;

/// Authentication tag size (16 bytes / 128 bits).
pub const TAG_SIZE: usize = 16;

/// AES-GCM nonce size (12 bytes / 96 bits).
pub const NONCE_SIZE: usize = 12;

/// AEAD key size (32 bytes / 256 bits).
pub const KEY_SIZE: usize = 32;

/// Smallest well-formed sealed box (empty plaintext).
pub const SEALED_OVERHEAD: usize = NONCE_SIZE + TAG_SIZE;

/// AES-GCM nonce (12 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Create a nonce from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create a nonce from a slice.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; NONCE_SIZE] = slice.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Generate a random nonce.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EntropySourceFailure`] if the source fails.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, CryptoError> {
        let mut bytes = [0u8; NONCE_SIZE];
        fill_random(rng, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Get raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// AEAD encryption key (32 bytes).
///
/// Key is zeroized on drop.
#[derive(Clone, ZeroizeOnDrop)]
pub struct AeadKey([u8; KEY_SIZE]);

impl AeadKey {
    /// Create a key from raw bytes.
    #[must_use]
    pub fn new(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from slice.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] if slice length is not 32 bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; KEY_SIZE] = slice.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: slice.len(),
        })?;
        Ok(Self(bytes))
    }

    /// Generate a random key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EntropySourceFailure`] if the source fails.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, CryptoError> {
        let mut bytes = [0u8; KEY_SIZE];
        fill_random(rng, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Get raw key bytes.
    ///
    /// # Security
    ///
    /// Handle with extreme care - this exposes the raw key material.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new((&self.0).into())
    }

    /// Encrypt plaintext with associated data.
    ///
    /// Returns ciphertext with appended authentication tag (`plaintext.len()` + 16 bytes).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EncryptionFailed`] if AEAD encryption fails.
    pub fn encrypt(&self, nonce: &Nonce, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.cipher()
            .encrypt((&nonce.0).into(), Payload { msg: plaintext, aad })
            .map_err(|_| CryptoError::EncryptionFailed)
    }

    /// Decrypt ciphertext with associated data.
    ///
    /// Input must include the authentication tag at the end.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::AuthenticationFailed`] on authentication failure.
    pub fn decrypt(
        &self,
        nonce: &Nonce,
        ciphertext_and_tag: &[u8],
        aad: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if ciphertext_and_tag.len() < TAG_SIZE {
            return Err(CryptoError::AuthenticationFailed);
        }
        self.cipher()
            .decrypt(
                (&nonce.0).into(),
                Payload {
                    msg: ciphertext_and_tag,
                    aad,
                },
            )
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::AuthenticationFailed)
    }

    /// Encrypt under a fresh random nonce: `nonce || ciphertext || tag`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EntropySourceFailure`] if no nonce can be drawn.
    pub fn seal<R: RngCore + CryptoRng>(&self, rng: &mut R, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce = Nonce::generate(rng)?;
        let ciphertext = self.encrypt(&nonce, plaintext, &[])?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(nonce.as_bytes());
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Open a box produced by [`AeadKey::seal`].
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::AuthenticationFailed`] for truncated input, a
    /// wrong key, or any modification.
    pub fn open(&self, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if sealed.len() < SEALED_OVERHEAD {
            return Err(CryptoError::AuthenticationFailed);
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce).ok_or(CryptoError::AuthenticationFailed)?;
        self.decrypt(&nonce, ciphertext, &[])
    }

    /// Serialize `value` as JSON and seal it.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Serialization`] if `value` cannot be encoded.
    pub fn seal_json<R, T>(&self, rng: &mut R, value: &T) -> Result<Vec<u8>, CryptoError>
    where
        R: RngCore + CryptoRng,
        T: Serialize + ?Sized,
    {
        let json = Zeroizing::new(
            serde_json::to_vec(value).map_err(|e| CryptoError::Serialization(e.to_string()))?,
        );
        self.seal(rng, &json)
    }

    /// Open a box and parse its JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::AuthenticationFailed`] if the box does not open and
    /// [`CryptoError::Serialization`] if the payload is not the expected JSON.
    pub fn open_json<T: DeserializeOwned>(&self, sealed: &[u8]) -> Result<T, CryptoError> {
        let json = self.open(sealed)?;
        serde_json::from_slice(&json).map_err(|e| CryptoError::Serialization(e.to_string()))
    }
}

impl std::fmt::Debug for AeadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AeadKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde::Deserialize;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0xae5)
    }

    #[test]
    fn test_aead_roundtrip() {
        let key = AeadKey::new([0x42u8; 32]);
        let nonce = Nonce::from_bytes([0u8; 12]);

        let ciphertext = key.encrypt(&nonce, b"Hello, World!", b"header").unwrap();
        assert_eq!(ciphertext.len(), 13 + TAG_SIZE);

        let plaintext = key.decrypt(&nonce, &ciphertext, b"header").unwrap();
        assert_eq!(&*plaintext, b"Hello, World!");
    }

    #[test]
    fn test_seal_layout() {
        let key = AeadKey::generate(&mut rng()).unwrap();
        let sealed = key.seal(&mut rng(), b"abc").unwrap();
        assert_eq!(sealed.len(), NONCE_SIZE + 3 + TAG_SIZE);

        let nonce = Nonce::from_slice(&sealed[..NONCE_SIZE]).unwrap();
        let inner = key.decrypt(&nonce, &sealed[NONCE_SIZE..], &[]).unwrap();
        assert_eq!(&*inner, b"abc");
    }

    #[test]
    fn test_seal_empty_plaintext() {
        let key = AeadKey::generate(&mut rng()).unwrap();
        let sealed = key.seal(&mut rng(), b"").unwrap();
        assert_eq!(sealed.len(), SEALED_OVERHEAD);
        assert!(key.open(&sealed).unwrap().is_empty());
    }

    #[test]
    fn test_seal_uses_fresh_nonces() {
        let key = AeadKey::generate(&mut rng()).unwrap();
        let mut rng = rng();
        let a = key.seal(&mut rng, b"same").unwrap();
        let b = key.seal(&mut rng, b"same").unwrap();
        assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_aead_tamper_detection() {
        let key = AeadKey::generate(&mut rng()).unwrap();
        let sealed = key.seal(&mut rng(), b"Secret message").unwrap();

        for i in [0, NONCE_SIZE, sealed.len() - 1] {
            let mut tampered = sealed.clone();
            tampered[i] ^= 0x01;
            assert!(matches!(
                key.open(&tampered),
                Err(CryptoError::AuthenticationFailed)
            ));
        }
    }

    #[test]
    fn test_aead_wrong_key_fails() {
        let key = AeadKey::new([1u8; 32]);
        let other = AeadKey::new([2u8; 32]);
        let sealed = key.seal(&mut rng(), b"secret").unwrap();
        assert!(matches!(
            other.open(&sealed),
            Err(CryptoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_aead_wrong_aad_fails() {
        let key = AeadKey::new([0x42u8; 32]);
        let nonce = Nonce::from_bytes([7u8; 12]);
        let ciphertext = key.encrypt(&nonce, b"secret", b"correct aad").unwrap();
        assert!(key.decrypt(&nonce, &ciphertext, b"wrong aad").is_err());
    }

    #[test]
    fn test_truncated_input_fails() {
        let key = AeadKey::new([0x42u8; 32]);
        for len in [0, 1, NONCE_SIZE, SEALED_OVERHEAD - 1] {
            assert!(matches!(
                key.open(&vec![0u8; len]),
                Err(CryptoError::AuthenticationFailed)
            ));
        }
    }

    #[test]
    fn test_key_from_slice() {
        assert!(AeadKey::from_slice(&[0u8; 32]).is_ok());
        assert!(matches!(
            AeadKey::from_slice(&[0u8; 16]),
            Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            })
        ));
    }

    #[test]
    fn test_nonce_from_slice() {
        assert!(Nonce::from_slice(&[0u8; 12]).is_some());
        assert!(Nonce::from_slice(&[0u8; 24]).is_none());
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        subject: String,
        lines: Vec<String>,
    }

    #[test]
    fn test_json_roundtrip() {
        let key = AeadKey::generate(&mut rng()).unwrap();
        let note = Note {
            subject: "hi".to_string(),
            lines: vec!["one".to_string(), "two".to_string()],
        };
        let sealed = key.seal_json(&mut rng(), &note).unwrap();
        let opened: Note = key.open_json(&sealed).unwrap();
        assert_eq!(opened, note);
    }

    #[test]
    fn test_json_wrong_shape_is_serialization_error() {
        let key = AeadKey::generate(&mut rng()).unwrap();
        let sealed = key.seal(&mut rng(), b"[1,2,3]").unwrap();
        assert!(matches!(
            key.open_json::<Note>(&sealed),
            Err(CryptoError::Serialization(_))
        ));
    }

    #[test]
    fn test_broken_rng_cannot_seal() {
        use crate::random::tests::BrokenRng;

        let key = AeadKey::new([0u8; 32]);
        assert!(matches!(
            key.seal(&mut BrokenRng, b"x"),
            Err(CryptoError::EntropySourceFailure)
        ));
        assert!(matches!(
            AeadKey::generate(&mut BrokenRng),
            Err(CryptoError::EntropySourceFailure)
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = AeadKey::new([0x42u8; 32]);
        assert_eq!(format!("{key:?}"), "AeadKey([REDACTED])");
    }
}
